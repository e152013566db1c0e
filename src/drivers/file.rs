//! File source and destination drivers.

use crate::drivers::capability::{
    DestinationCapable, FileCapable, OptionalCapable, ReaderCapable, SourceCapable,
    WriterCapable,
};
use crate::drivers::common::{
    DestinationOptions, FileOptions, ReaderOptions, SourceOptions, WriterOptions,
};
use crate::host::{LogPipe, PipeContext};
use crate::options::compose::{
    destination_options, file_options, optional_option, reader_options, source_options,
    writer_options,
};
use crate::options::OptionSchema;

/// Follows a file.
#[derive(Debug, Clone)]
pub struct FileSourceDriver {
    pub path: String,
    pub reader: ReaderOptions,
    pub source: SourceOptions,
    pub optional: bool,
    initialized: bool,
}

impl FileSourceDriver {
    pub fn new(path: String) -> Self {
        Self {
            path,
            reader: ReaderOptions::default(),
            source: SourceOptions::default(),
            optional: false,
            initialized: false,
        }
    }

    pub fn schema() -> OptionSchema<Self> {
        reader_options::<Self>()
            .concat(source_options())
            .concat(optional_option())
    }
}

impl LogPipe for FileSourceDriver {
    fn init(&mut self, ctx: &PipeContext) -> bool {
        if self.path.is_empty() {
            tracing::error!("FileSource {}: no file name", ctx.node);
            return false;
        }
        if self.reader.follow_freq < 0 {
            tracing::error!(
                "FileSource {}: follow_freq must not be negative, got {}",
                ctx.node,
                self.reader.follow_freq
            );
            return false;
        }
        tracing::debug!("FileSource {}: following \"{}\"", ctx.node, self.path);
        self.initialized = true;
        true
    }

    fn deinit(&mut self) -> bool {
        std::mem::replace(&mut self.initialized, false)
    }
}

impl ReaderCapable for FileSourceDriver {
    fn reader_options(&mut self) -> &mut ReaderOptions {
        &mut self.reader
    }
}

impl SourceCapable for FileSourceDriver {
    fn source_options(&mut self) -> &mut SourceOptions {
        &mut self.source
    }
}

impl OptionalCapable for FileSourceDriver {
    fn optional(&mut self) -> &mut bool {
        &mut self.optional
    }
}

/// Appends to a file.
#[derive(Debug, Clone)]
pub struct FileDestinationDriver {
    pub path: String,
    pub destination: DestinationOptions,
    pub writer: WriterOptions,
    pub file: FileOptions,
    initialized: bool,
}

impl FileDestinationDriver {
    pub fn new(path: String) -> Self {
        Self {
            path,
            destination: DestinationOptions::default(),
            writer: WriterOptions::default(),
            file: FileOptions::default(),
            initialized: false,
        }
    }

    pub fn schema() -> OptionSchema<Self> {
        destination_options::<Self>()
            .concat(writer_options())
            .concat(file_options())
    }
}

impl LogPipe for FileDestinationDriver {
    fn init(&mut self, ctx: &PipeContext) -> bool {
        if self.path.is_empty() {
            tracing::error!("FileDestination {}: no file name", ctx.node);
            return false;
        }
        if self.file.file_perm > 0o7777 || self.file.dir_perm > 0o7777 {
            tracing::error!(
                "FileDestination {}: invalid permissions file_perm={:o} dir_perm={:o}",
                ctx.node,
                self.file.file_perm,
                self.file.dir_perm
            );
            return false;
        }
        tracing::debug!("FileDestination {}: writing \"{}\"", ctx.node, self.path);
        self.initialized = true;
        true
    }

    fn deinit(&mut self) -> bool {
        std::mem::replace(&mut self.initialized, false)
    }
}

impl DestinationCapable for FileDestinationDriver {
    fn destination_options(&mut self) -> &mut DestinationOptions {
        &mut self.destination
    }
}

impl WriterCapable for FileDestinationDriver {
    fn writer_options(&mut self) -> &mut WriterOptions {
        &mut self.writer
    }
}

impl FileCapable for FileDestinationDriver {
    fn file_options(&mut self) -> &mut FileOptions {
        &mut self.file
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Projector;
    use rhai::{Dynamic, Map};

    #[test]
    fn test_file_destination_schema_order() {
        let names = FileDestinationDriver::schema().names();
        assert_eq!(
            names,
            vec![
                "log_fifo_size",
                "throttle",
                "flush_lines",
                "flush_timeout",
                "mark_freq",
                "suppress",
                "template",
                "ts_format",
                "create_dirs",
                "file_perm",
                "dir_perm",
            ]
        );
    }

    #[test]
    fn test_file_source_projection() {
        let mut table = Map::new();
        table.insert("follow_freq".into(), Dynamic::from(250_i64));
        table.insert("program_override".into(), Dynamic::from("kernel"));
        table.insert("optional".into(), Dynamic::TRUE);

        let mut driver = FileSourceDriver::new("/var/log/messages".to_string());
        let report = Projector::default()
            .project("FileSource", &FileSourceDriver::schema(), &table, &mut driver)
            .unwrap();
        assert!(report.is_clean());
        assert_eq!(driver.reader.follow_freq, 250);
        assert_eq!(driver.source.program_override, "kernel");
        assert!(driver.optional);
    }
}
