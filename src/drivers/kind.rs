//! Driver kinds known to the built-in registry.

use crate::drivers::common::Transport;
use serde::{Deserialize, Serialize};

/// Every driver a configuration script can construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DriverKind {
    // Local sockets
    UnixStreamSource,
    UnixDgramSource,
    UnixStreamDestination,
    UnixDgramDestination,

    // Network sockets
    TcpSource,
    UdpSource,
    SyslogSource,
    TcpDestination,
    UdpDestination,
    SyslogDestination,

    // Files
    FileSource,
    FileDestination,

    /// Runs user script code as an event producer.
    ScriptSource,
}

/// Socket family of a socket driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketFamily {
    UnixStream,
    UnixDgram,
    Inet,
}

impl DriverKind {
    /// Name of the script-visible constructor.
    pub fn constructor_name(&self) -> &'static str {
        match self {
            DriverKind::UnixStreamSource => "UnixStreamSource",
            DriverKind::UnixDgramSource => "UnixDgramSource",
            DriverKind::UnixStreamDestination => "UnixStreamDestination",
            DriverKind::UnixDgramDestination => "UnixDgramDestination",
            DriverKind::TcpSource => "TcpSource",
            DriverKind::UdpSource => "UdpSource",
            DriverKind::SyslogSource => "SyslogSource",
            DriverKind::TcpDestination => "TcpDestination",
            DriverKind::UdpDestination => "UdpDestination",
            DriverKind::SyslogDestination => "SyslogDestination",
            DriverKind::FileSource => "FileSource",
            DriverKind::FileDestination => "FileDestination",
            DriverKind::ScriptSource => "ScriptSource",
        }
    }

    pub fn from_constructor_name(name: &str) -> Option<DriverKind> {
        Self::all()
            .iter()
            .copied()
            .find(|k| k.constructor_name() == name)
    }

    pub fn all() -> &'static [DriverKind] {
        &[
            DriverKind::UnixStreamSource,
            DriverKind::UnixDgramSource,
            DriverKind::UnixStreamDestination,
            DriverKind::UnixDgramDestination,
            DriverKind::TcpSource,
            DriverKind::UdpSource,
            DriverKind::SyslogSource,
            DriverKind::TcpDestination,
            DriverKind::UdpDestination,
            DriverKind::SyslogDestination,
            DriverKind::FileSource,
            DriverKind::FileDestination,
            DriverKind::ScriptSource,
        ]
    }

    pub fn is_source(&self) -> bool {
        matches!(
            self,
            DriverKind::UnixStreamSource
                | DriverKind::UnixDgramSource
                | DriverKind::TcpSource
                | DriverKind::UdpSource
                | DriverKind::SyslogSource
                | DriverKind::FileSource
                | DriverKind::ScriptSource
        )
    }

    pub fn is_destination(&self) -> bool {
        !self.is_source()
    }

    /// Socket family, for socket drivers only.
    pub fn socket_family(&self) -> Option<SocketFamily> {
        match self {
            DriverKind::UnixStreamSource | DriverKind::UnixStreamDestination => {
                Some(SocketFamily::UnixStream)
            }
            DriverKind::UnixDgramSource | DriverKind::UnixDgramDestination => {
                Some(SocketFamily::UnixDgram)
            }
            DriverKind::TcpSource
            | DriverKind::UdpSource
            | DriverKind::SyslogSource
            | DriverKind::TcpDestination
            | DriverKind::UdpDestination
            | DriverKind::SyslogDestination => Some(SocketFamily::Inet),
            DriverKind::FileSource | DriverKind::FileDestination | DriverKind::ScriptSource => {
                None
            }
        }
    }

    /// Transport a network driver starts with.
    pub fn default_transport(&self) -> Option<Transport> {
        match self {
            DriverKind::UdpSource | DriverKind::UdpDestination => Some(Transport::Udp),
            DriverKind::TcpSource
            | DriverKind::TcpDestination
            | DriverKind::SyslogSource
            | DriverKind::SyslogDestination => Some(Transport::Tcp),
            _ => None,
        }
    }

    /// Port used when the configuration names none.
    pub fn default_port(&self, transport: Transport) -> Option<&'static str> {
        match self {
            DriverKind::SyslogSource | DriverKind::SyslogDestination => Some(match transport {
                Transport::Udp => "514",
                Transport::Tcp => "601",
                Transport::Tls => "6514",
            }),
            DriverKind::TcpSource
            | DriverKind::UdpSource
            | DriverKind::TcpDestination
            | DriverKind::UdpDestination => Some("514"),
            _ => None,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            DriverKind::UnixStreamSource => "Accepts messages on a unix stream socket.",
            DriverKind::UnixDgramSource => "Receives messages on a unix datagram socket.",
            DriverKind::UnixStreamDestination => "Writes messages to a unix stream socket.",
            DriverKind::UnixDgramDestination => "Sends messages to a unix datagram socket.",
            DriverKind::TcpSource => "Accepts BSD-syslog messages over TCP.",
            DriverKind::UdpSource => "Receives BSD-syslog messages over UDP.",
            DriverKind::SyslogSource => {
                "Receives IETF-syslog messages over the selected transport.\n\
                 Defaults to TCP on port 601."
            }
            DriverKind::TcpDestination => "Sends messages to a remote host over TCP.",
            DriverKind::UdpDestination => {
                "Sends messages to a remote host over UDP.\n\
                 Supports spoofing the source address."
            }
            DriverKind::SyslogDestination => {
                "Sends IETF-syslog messages over the selected transport."
            }
            DriverKind::FileSource => "Follows a file and reads new lines from it.",
            DriverKind::FileDestination => "Appends messages to a file.",
            DriverKind::ScriptSource => {
                "Runs `thread_func(source)` on a worker thread.\n\
                 The script emits events with `post(source, payload)`."
            }
        }
    }
}

impl std::fmt::Display for DriverKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.constructor_name())
    }
}
