//! Socket drivers: unix, TCP, UDP and syslog-protocol sources and
//! destinations.
//!
//! One struct per direction covers every socket family. The kind picks the
//! schema, so a unix source never learns inet options even though the
//! struct has room for them.

use crate::drivers::capability::{
    DestinationCapable, InetDestinationAddressCapable, InetSocketCapable,
    InetSourceAddressCapable, KeepAliveCapable, OptionalCapable, ReaderCapable, SocketCapable,
    SpoofSourceCapable, StreamSourceCapable, TransportCapable, WriterCapable,
};
use crate::drivers::common::{
    DestinationOptions, InetSocketOptions, ReaderOptions, SocketOptions, Transport,
    WriterOptions,
};
use crate::drivers::kind::{DriverKind, SocketFamily};
use crate::host::{LogPipe, PipeContext};
use crate::options::compose::{
    destination_options, inet_destination_address_options, inet_socket_options,
    inet_source_address_options, keep_alive_option, optional_option, reader_options,
    socket_options, spoof_source_option, stream_source_options, transport_option,
    writer_options,
};
use crate::options::OptionSchema;

const DEFAULT_MAX_CONNECTIONS: u32 = 10;

fn check_port(port: &str) -> Result<(), String> {
    port.parse::<u16>()
        .map(|_| ())
        .map_err(|_| format!("'{}' is not a valid port", port))
}

/// A listening socket.
#[derive(Debug, Clone)]
pub struct SocketSourceDriver {
    kind: DriverKind,
    /// Socket path for unix sources.
    pub path: Option<String>,
    pub local_ip: Option<String>,
    pub local_port: Option<String>,
    pub inet: InetSocketOptions,
    pub reader: ReaderOptions,
    pub keep_alive: bool,
    pub max_connections: u32,
    pub transport: Option<Transport>,
    pub optional: bool,
    initialized: bool,
}

impl SocketSourceDriver {
    pub fn new(kind: DriverKind, path: Option<String>) -> Self {
        debug_assert!(kind.is_source() && kind.socket_family().is_some());
        Self {
            kind,
            path,
            local_ip: None,
            local_port: None,
            inet: InetSocketOptions::default(),
            reader: ReaderOptions::default(),
            keep_alive: true,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            transport: kind.default_transport(),
            optional: false,
            initialized: false,
        }
    }

    pub fn kind(&self) -> DriverKind {
        self.kind
    }

    /// Composed option schema of a socket source kind.
    pub fn schema(kind: DriverKind) -> OptionSchema<Self> {
        match kind {
            DriverKind::UnixStreamSource | DriverKind::UnixDgramSource => socket_options::<Self>()
                .concat(reader_options())
                .concat(stream_source_options())
                .concat(optional_option()),
            DriverKind::UdpSource => Self::udp_schema(),
            DriverKind::TcpSource => Self::tcp_schema(),
            DriverKind::SyslogSource => Self::tcp_schema().concat(transport_option()),
            _ => OptionSchema::new(),
        }
    }

    fn udp_schema() -> OptionSchema<Self> {
        inet_source_address_options::<Self>()
            .concat(reader_options())
            .concat(inet_socket_options())
    }

    fn tcp_schema() -> OptionSchema<Self> {
        Self::udp_schema().concat(stream_source_options())
    }

    /// Port the source listens on, falling back to the transport default.
    pub fn effective_port(&self) -> Option<String> {
        if let Some(port) = &self.local_port {
            return Some(port.clone());
        }
        let transport = self.transport?;
        self.kind.default_port(transport).map(str::to_string)
    }

    fn validate(&self) -> Result<(), String> {
        match self.kind.socket_family() {
            Some(SocketFamily::UnixStream) | Some(SocketFamily::UnixDgram) => {
                match self.path.as_deref() {
                    Some(p) if !p.is_empty() => Ok(()),
                    _ => Err("no socket path".to_string()),
                }
            }
            _ => match self.effective_port() {
                Some(port) => check_port(&port),
                None => Err("no port".to_string()),
            },
        }
    }

    pub fn describe(&self) -> String {
        match &self.path {
            Some(path) => format!("{}(\"{}\")", self.kind, path),
            None => format!(
                "{}({}:{}, transport={})",
                self.kind,
                self.local_ip.as_deref().unwrap_or("0.0.0.0"),
                self.effective_port().unwrap_or_default(),
                self.transport.map(|t| t.as_str()).unwrap_or("-"),
            ),
        }
    }
}

impl LogPipe for SocketSourceDriver {
    fn init(&mut self, ctx: &PipeContext) -> bool {
        if let Err(reason) = self.validate() {
            tracing::error!("{} {}: {}", self.kind, ctx.node, reason);
            return false;
        }
        tracing::debug!("{} {}: initialized as {}", self.kind, ctx.node, self.describe());
        self.initialized = true;
        true
    }

    fn deinit(&mut self) -> bool {
        std::mem::replace(&mut self.initialized, false)
    }
}

impl SocketCapable for SocketSourceDriver {
    fn socket_options(&mut self) -> &mut SocketOptions {
        &mut self.inet.socket
    }
}

impl InetSocketCapable for SocketSourceDriver {
    fn inet_options(&mut self) -> &mut InetSocketOptions {
        &mut self.inet
    }
}

impl ReaderCapable for SocketSourceDriver {
    fn reader_options(&mut self) -> &mut ReaderOptions {
        &mut self.reader
    }
}

impl StreamSourceCapable for SocketSourceDriver {
    fn set_keep_alive(&mut self, keep_alive: bool) {
        self.keep_alive = keep_alive;
    }

    fn set_max_connections(&mut self, max_connections: u32) {
        self.max_connections = max_connections;
    }
}

impl TransportCapable for SocketSourceDriver {
    fn set_transport(&mut self, transport: Transport) {
        self.transport = Some(transport);
    }
}

impl OptionalCapable for SocketSourceDriver {
    fn optional(&mut self) -> &mut bool {
        &mut self.optional
    }
}

impl InetSourceAddressCapable for SocketSourceDriver {
    fn set_local_ip(&mut self, ip: String) {
        self.local_ip = Some(ip);
    }

    fn set_local_port(&mut self, port: String) {
        self.local_port = Some(port);
    }
}

/// A connecting socket.
#[derive(Debug, Clone)]
pub struct SocketDestinationDriver {
    kind: DriverKind,
    /// Socket path for unix destinations, remote host otherwise.
    pub target: String,
    pub local_ip: Option<String>,
    pub local_port: Option<String>,
    pub dest_port: Option<String>,
    pub inet: InetSocketOptions,
    pub writer: WriterOptions,
    pub destination: DestinationOptions,
    pub keep_alive: bool,
    pub spoof_source: bool,
    pub transport: Option<Transport>,
    initialized: bool,
}

impl SocketDestinationDriver {
    pub fn new(kind: DriverKind, target: String) -> Self {
        debug_assert!(kind.is_destination() && kind.socket_family().is_some());
        Self {
            kind,
            target,
            local_ip: None,
            local_port: None,
            dest_port: None,
            inet: InetSocketOptions::default(),
            writer: WriterOptions::default(),
            destination: DestinationOptions::default(),
            keep_alive: true,
            spoof_source: false,
            transport: kind.default_transport(),
            initialized: false,
        }
    }

    pub fn kind(&self) -> DriverKind {
        self.kind
    }

    /// Composed option schema of a socket destination kind.
    pub fn schema(kind: DriverKind) -> OptionSchema<Self> {
        match kind {
            DriverKind::UnixStreamDestination | DriverKind::UnixDgramDestination => {
                destination_options::<Self>()
                    .concat(writer_options())
                    .concat(socket_options())
                    .concat(keep_alive_option())
            }
            DriverKind::TcpDestination => Self::network_schema(),
            DriverKind::UdpDestination => Self::network_schema().concat(spoof_source_option()),
            DriverKind::SyslogDestination => inet_destination_address_options::<Self>()
                .concat(transport_option())
                .concat(writer_options())
                .concat(destination_options())
                .concat(inet_socket_options())
                .concat(keep_alive_option()),
            _ => OptionSchema::new(),
        }
    }

    fn network_schema() -> OptionSchema<Self> {
        inet_destination_address_options::<Self>()
            .concat(inet_socket_options())
            .concat(writer_options())
            .concat(destination_options())
            .concat(keep_alive_option())
    }

    /// Destination port as configured.
    pub fn dest_port(&self) -> Option<&str> {
        self.dest_port.as_deref()
    }

    /// Destination port, falling back to the transport default.
    pub fn effective_port(&self) -> Option<String> {
        if let Some(port) = &self.dest_port {
            return Some(port.clone());
        }
        let transport = self.transport?;
        self.kind.default_port(transport).map(str::to_string)
    }

    fn validate(&self) -> Result<(), String> {
        if self.target.is_empty() {
            return Err("no target".to_string());
        }
        if self.kind.socket_family() == Some(SocketFamily::Inet) {
            match self.effective_port() {
                Some(port) => check_port(&port)?,
                None => return Err("no port".to_string()),
            }
        }
        Ok(())
    }

    pub fn describe(&self) -> String {
        match self.kind.socket_family() {
            Some(SocketFamily::Inet) => format!(
                "{}({}:{}, transport={})",
                self.kind,
                self.target,
                self.effective_port().unwrap_or_default(),
                self.transport.map(|t| t.as_str()).unwrap_or("-"),
            ),
            _ => format!("{}(\"{}\")", self.kind, self.target),
        }
    }
}

impl LogPipe for SocketDestinationDriver {
    fn init(&mut self, ctx: &PipeContext) -> bool {
        if let Err(reason) = self.validate() {
            tracing::error!("{} {}: {}", self.kind, ctx.node, reason);
            return false;
        }
        tracing::debug!("{} {}: initialized as {}", self.kind, ctx.node, self.describe());
        self.initialized = true;
        true
    }

    fn deinit(&mut self) -> bool {
        std::mem::replace(&mut self.initialized, false)
    }
}

impl SocketCapable for SocketDestinationDriver {
    fn socket_options(&mut self) -> &mut SocketOptions {
        &mut self.inet.socket
    }
}

impl InetSocketCapable for SocketDestinationDriver {
    fn inet_options(&mut self) -> &mut InetSocketOptions {
        &mut self.inet
    }
}

impl WriterCapable for SocketDestinationDriver {
    fn writer_options(&mut self) -> &mut WriterOptions {
        &mut self.writer
    }
}

impl DestinationCapable for SocketDestinationDriver {
    fn destination_options(&mut self) -> &mut DestinationOptions {
        &mut self.destination
    }
}

impl KeepAliveCapable for SocketDestinationDriver {
    fn set_keep_alive(&mut self, keep_alive: bool) {
        self.keep_alive = keep_alive;
    }
}

impl TransportCapable for SocketDestinationDriver {
    fn set_transport(&mut self, transport: Transport) {
        self.transport = Some(transport);
    }
}

impl InetDestinationAddressCapable for SocketDestinationDriver {
    fn set_local_ip(&mut self, ip: String) {
        self.local_ip = Some(ip);
    }

    fn set_local_port(&mut self, port: String) {
        self.local_port = Some(port);
    }

    fn set_dest_port(&mut self, port: String) {
        self.dest_port = Some(port);
    }
}

impl SpoofSourceCapable for SocketDestinationDriver {
    fn set_spoof_source(&mut self, spoof: bool) {
        self.spoof_source = spoof;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{OptionKind, Projector};
    use rhai::{Dynamic, Map};

    fn project_dest(kind: DriverKind, table: &Map) -> SocketDestinationDriver {
        let mut driver = SocketDestinationDriver::new(kind, "loghost".to_string());
        Projector::default()
            .project(
                kind.constructor_name(),
                &SocketDestinationDriver::schema(kind),
                table,
                &mut driver,
            )
            .unwrap();
        driver
    }

    #[test]
    fn test_schema_is_deterministic_per_kind() {
        for kind in DriverKind::all() {
            if kind.socket_family().is_none() {
                continue;
            }
            if kind.is_source() {
                assert_eq!(
                    SocketSourceDriver::schema(*kind).signature(),
                    SocketSourceDriver::schema(*kind).signature()
                );
            } else {
                assert_eq!(
                    SocketDestinationDriver::schema(*kind).names(),
                    SocketDestinationDriver::schema(*kind).names()
                );
            }
        }
    }

    #[test]
    fn test_unix_source_has_no_inet_options() {
        let schema = SocketSourceDriver::schema(DriverKind::UnixStreamSource);
        assert!(schema.contains("so_rcvbuf"));
        assert!(schema.contains("optional"));
        assert!(!schema.contains("ip_ttl"));
        assert!(!schema.contains("localport"));
    }

    #[test]
    fn test_syslog_source_extends_tcp_source() {
        let tcp = SocketSourceDriver::schema(DriverKind::TcpSource).names();
        let syslog = SocketSourceDriver::schema(DriverKind::SyslogSource).names();
        assert_eq!(&syslog[..tcp.len()], &tcp[..]);
        assert_eq!(syslog.last(), Some(&"transport"));
    }

    #[test]
    fn test_udp_destination_only_adds_spoof_source() {
        let tcp = SocketDestinationDriver::schema(DriverKind::TcpDestination).signature();
        let udp = SocketDestinationDriver::schema(DriverKind::UdpDestination).signature();
        assert_eq!(udp.len(), tcp.len() + 1);
        assert_eq!(udp.last(), Some(&("spoof_source", OptionKind::Setter)));
    }

    #[test]
    fn test_destination_port_alias() {
        let mut table = Map::new();
        table.insert("destport".into(), Dynamic::from(6514_i64));
        let driver = project_dest(DriverKind::TcpDestination, &table);
        assert_eq!(driver.dest_port(), Some("6514"));
    }

    #[test]
    fn test_source_ip_and_port_aliases() {
        let mut table = Map::new();
        table.insert("ip".into(), Dynamic::from("127.0.0.1"));
        table.insert("port".into(), Dynamic::from(1514_i64));
        let mut driver = SocketSourceDriver::new(DriverKind::UdpSource, None);
        Projector::default()
            .project(
                "UdpSource",
                &SocketSourceDriver::schema(DriverKind::UdpSource),
                &table,
                &mut driver,
            )
            .unwrap();
        assert_eq!(driver.local_ip.as_deref(), Some("127.0.0.1"));
        assert_eq!(driver.effective_port().as_deref(), Some("1514"));
    }

    #[test]
    fn test_syslog_source_port_follows_transport() {
        let mut table = Map::new();
        table.insert("transport".into(), Dynamic::from("tls"));
        let mut driver = SocketSourceDriver::new(DriverKind::SyslogSource, None);
        assert_eq!(driver.effective_port().as_deref(), Some("601"));
        Projector::default()
            .project(
                "SyslogSource",
                &SocketSourceDriver::schema(DriverKind::SyslogSource),
                &table,
                &mut driver,
            )
            .unwrap();
        assert_eq!(driver.effective_port().as_deref(), Some("6514"));
    }

    #[test]
    fn test_unix_destination_schema_order() {
        let names = SocketDestinationDriver::schema(DriverKind::UnixDgramDestination).names();
        assert_eq!(names.first(), Some(&"log_fifo_size"));
        assert_eq!(names.last(), Some(&"keep_alive"));
    }
}
