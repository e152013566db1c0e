//! Option groups shared across driver kinds.
//!
//! Each struct here is one configuration concern (socket tuning, reader
//! buffering, writer behaviour, ...) embedded by every driver that has the
//! matching capability. Defaults are the values a driver starts with before
//! any table is projected onto it.

use crate::options::ValueError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Generic socket tuning, valid for every socket family.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SocketOptions {
    /// SO_SNDBUF in bytes; 0 keeps the kernel default
    pub so_sndbuf: i32,
    /// SO_RCVBUF in bytes; 0 keeps the kernel default
    pub so_rcvbuf: i32,
    pub so_broadcast: bool,
    pub so_keepalive: bool,
}

/// IP socket tuning on top of [`SocketOptions`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InetSocketOptions {
    pub socket: SocketOptions,
    pub ip_ttl: i32,
    pub ip_tos: i32,
    pub tcp_keepalive_time: i32,
    pub tcp_keepalive_intvl: i32,
    pub tcp_keepalive_probes: i32,
}

/// Reader-side buffering for sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaderOptions {
    pub log_msg_size: i32,
    pub log_fetch_limit: i32,
    /// Polling interval for followed files, in milliseconds
    pub follow_freq: i64,
    pub check_hostname: bool,
    pub log_iw_size: i32,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            log_msg_size: 65536,
            log_fetch_limit: 10,
            follow_freq: 1000,
            check_hostname: false,
            log_iw_size: 100,
        }
    }
}

/// Timestamp rendering used by writers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TsFormat {
    #[default]
    Rfc3164,
    Rfc3339,
    Unix,
}

impl FromStr for TsFormat {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rfc3164" | "bsd" => Ok(TsFormat::Rfc3164),
            "rfc3339" | "iso" => Ok(TsFormat::Rfc3339),
            "unix" | "utc" => Ok(TsFormat::Unix),
            other => Err(ValueError::Invalid(format!(
                "unknown timestamp format '{}' (expected rfc3164, bsd, rfc3339, iso or unix)",
                other
            ))),
        }
    }
}

/// Writer-side behaviour for destinations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriterOptions {
    pub flush_lines: i32,
    /// Milliseconds
    pub flush_timeout: i64,
    /// Seconds between MARK messages; 0 disables them
    pub mark_freq: i32,
    pub suppress: i32,
    /// Output template; empty means the built-in format
    pub template: String,
    pub ts_format: TsFormat,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            flush_lines: 0,
            flush_timeout: 10_000,
            mark_freq: 1200,
            suppress: 0,
            template: String::new(),
            ts_format: TsFormat::default(),
        }
    }
}

/// Options every destination carries regardless of its transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationOptions {
    pub log_fifo_size: i32,
    /// Messages per second; 0 means unlimited
    pub throttle: i32,
}

impl Default for DestinationOptions {
    fn default() -> Self {
        Self {
            log_fifo_size: 10_000,
            throttle: 0,
        }
    }
}

/// Options every source carries.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SourceOptions {
    pub program_override: String,
    pub host_override: String,
}

/// File creation behaviour for file destinations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileOptions {
    pub create_dirs: bool,
    pub file_perm: u32,
    pub dir_perm: u32,
}

impl Default for FileOptions {
    fn default() -> Self {
        Self {
            create_dirs: false,
            file_perm: 0o600,
            dir_perm: 0o700,
        }
    }
}

/// Transport protocol of a network driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transport {
    Udp,
    Tcp,
    Tls,
}

impl Transport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transport::Udp => "udp",
            Transport::Tcp => "tcp",
            Transport::Tls => "tls",
        }
    }
}

impl FromStr for Transport {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "udp" => Ok(Transport::Udp),
            "tcp" => Ok(Transport::Tcp),
            "tls" => Ok(Transport::Tls),
            other => Err(ValueError::Invalid(format!(
                "unknown transport '{}' (expected udp, tcp or tls)",
                other
            ))),
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
