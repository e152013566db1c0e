//! Pipeline drivers constructible from configuration scripts.
//!
//! Two-layer design:
//! - **Capability traits** ([`capability`]) say which configuration concerns
//!   a driver has; the composition functions in [`crate::options::compose`]
//!   are generic over them.
//! - **`Driver` enum** wraps every concrete driver so the host drives them
//!   through one `LogPipe` implementation without dynamic dispatch.

pub mod args;
pub mod capability;
pub mod common;
pub mod file;
pub mod kind;
pub mod socket;

pub use args::ScriptArgs;
pub use file::{FileDestinationDriver, FileSourceDriver};
pub use kind::{DriverKind, SocketFamily};
pub use socket::{SocketDestinationDriver, SocketSourceDriver};

use crate::error::ConstructionError;
use crate::host::{LogPipe, NodeId, PipeContext};
use crate::registry::BuildContext;
use crate::script_source::ScriptSource;
use std::fmt;

pub enum Driver {
    SocketSource(SocketSourceDriver),
    SocketDestination(SocketDestinationDriver),
    FileSource(FileSourceDriver),
    FileDestination(FileDestinationDriver),
    ScriptSource(ScriptSource),
}

impl Driver {
    pub fn kind(&self) -> DriverKind {
        match self {
            Driver::SocketSource(d) => d.kind(),
            Driver::SocketDestination(d) => d.kind(),
            Driver::FileSource(_) => DriverKind::FileSource,
            Driver::FileDestination(_) => DriverKind::FileDestination,
            Driver::ScriptSource(_) => DriverKind::ScriptSource,
        }
    }

    /// Whether the host may skip this node when it fails to start.
    pub fn is_optional(&self) -> bool {
        match self {
            Driver::SocketSource(d) => d.optional,
            Driver::FileSource(d) => d.optional,
            _ => false,
        }
    }

    /// One-line human readable summary.
    pub fn describe(&self) -> String {
        match self {
            Driver::SocketSource(d) => d.describe(),
            Driver::SocketDestination(d) => d.describe(),
            Driver::FileSource(d) => format!("FileSource(\"{}\")", d.path),
            Driver::FileDestination(d) => format!("FileDestination(\"{}\")", d.path),
            Driver::ScriptSource(d) => format!("ScriptSource(emitted={})", d.emitted()),
        }
    }

    pub fn as_socket_source(&self) -> Option<&SocketSourceDriver> {
        match self {
            Driver::SocketSource(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_socket_destination(&self) -> Option<&SocketDestinationDriver> {
        match self {
            Driver::SocketDestination(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_file_source(&self) -> Option<&FileSourceDriver> {
        match self {
            Driver::FileSource(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_file_destination(&self) -> Option<&FileDestinationDriver> {
        match self {
            Driver::FileDestination(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_script_source(&self) -> Option<&ScriptSource> {
        match self {
            Driver::ScriptSource(d) => Some(d),
            _ => None,
        }
    }
}

impl LogPipe for Driver {
    fn init(&mut self, ctx: &PipeContext) -> bool {
        match self {
            Driver::SocketSource(d) => d.init(ctx),
            Driver::SocketDestination(d) => d.init(ctx),
            Driver::FileSource(d) => d.init(ctx),
            Driver::FileDestination(d) => d.init(ctx),
            Driver::ScriptSource(d) => d.init(ctx),
        }
    }

    fn deinit(&mut self) -> bool {
        match self {
            Driver::SocketSource(d) => d.deinit(),
            Driver::SocketDestination(d) => d.deinit(),
            Driver::FileSource(d) => d.deinit(),
            Driver::FileDestination(d) => d.deinit(),
            Driver::ScriptSource(d) => d.deinit(),
        }
    }
}

impl fmt::Debug for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// Opaque value a configuration script gets back from a constructor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverHandle {
    pub id: NodeId,
    pub kind: DriverKind,
}

impl fmt::Display for DriverHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.kind, self.id.0)
    }
}

/// Build one built-in driver from its constructor arguments.
pub fn construct(
    kind: DriverKind,
    args: &ScriptArgs,
    ctx: &mut BuildContext,
) -> Result<Driver, ConstructionError> {
    let name = kind.constructor_name();
    match kind {
        DriverKind::UnixStreamSource | DriverKind::UnixDgramSource => {
            args.expect_at_most(2)?;
            let path = args.required_string(1, "socket path")?;
            let mut driver = SocketSourceDriver::new(kind, Some(path));
            ctx.project(name, &SocketSourceDriver::schema(kind), args.options(2)?, &mut driver)?;
            Ok(Driver::SocketSource(driver))
        }
        DriverKind::TcpSource | DriverKind::UdpSource | DriverKind::SyslogSource => {
            args.expect_at_most(1)?;
            let mut driver = SocketSourceDriver::new(kind, None);
            ctx.project(name, &SocketSourceDriver::schema(kind), args.options(1)?, &mut driver)?;
            Ok(Driver::SocketSource(driver))
        }
        DriverKind::UnixStreamDestination | DriverKind::UnixDgramDestination => {
            args.expect_at_most(2)?;
            let path = args.required_string(1, "socket path")?;
            let mut driver = SocketDestinationDriver::new(kind, path);
            ctx.project(name, &SocketDestinationDriver::schema(kind), args.options(2)?, &mut driver)?;
            Ok(Driver::SocketDestination(driver))
        }
        DriverKind::TcpDestination | DriverKind::UdpDestination | DriverKind::SyslogDestination => {
            args.expect_at_most(2)?;
            let host = args.required_string(1, "host")?;
            let mut driver = SocketDestinationDriver::new(kind, host);
            ctx.project(name, &SocketDestinationDriver::schema(kind), args.options(2)?, &mut driver)?;
            Ok(Driver::SocketDestination(driver))
        }
        DriverKind::FileSource => {
            args.expect_at_most(2)?;
            let path = args.required_string(1, "file name")?;
            let mut driver = FileSourceDriver::new(path);
            ctx.project(name, &FileSourceDriver::schema(), args.options(2)?, &mut driver)?;
            Ok(Driver::FileSource(driver))
        }
        DriverKind::FileDestination => {
            args.expect_at_most(2)?;
            let path = args.required_string(1, "file name")?;
            let mut driver = FileDestinationDriver::new(path);
            ctx.project(name, &FileDestinationDriver::schema(), args.options(2)?, &mut driver)?;
            Ok(Driver::FileDestination(driver))
        }
        DriverKind::ScriptSource => {
            args.expect_at_most(2)?;
            let code = args.required_string(1, "script code")?;
            let mut driver = ScriptSource::new(&code)?.with_stop_timeout(ctx.stop_timeout);
            ctx.project(name, &ScriptSource::schema(), args.options(2)?, &mut driver)?;
            Ok(Driver::ScriptSource(driver))
        }
    }
}
