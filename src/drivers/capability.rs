//! Capability traits of the driver hierarchy.
//!
//! A driver implements one trait per concern it supports. The composition
//! functions in [`crate::options::compose`] are generic over these traits,
//! so the same "socket tuning" descriptors serve unix and inet drivers,
//! sources and destinations alike.

use crate::drivers::common::{
    DestinationOptions, FileOptions, InetSocketOptions, ReaderOptions, SocketOptions,
    SourceOptions, Transport, WriterOptions,
};

pub trait SocketCapable {
    fn socket_options(&mut self) -> &mut SocketOptions;
}

pub trait InetSocketCapable: SocketCapable {
    fn inet_options(&mut self) -> &mut InetSocketOptions;
}

pub trait ReaderCapable {
    fn reader_options(&mut self) -> &mut ReaderOptions;
}

pub trait WriterCapable {
    fn writer_options(&mut self) -> &mut WriterOptions;
}

pub trait DestinationCapable {
    fn destination_options(&mut self) -> &mut DestinationOptions;
}

pub trait SourceCapable {
    fn source_options(&mut self) -> &mut SourceOptions;
}

pub trait FileCapable {
    fn file_options(&mut self) -> &mut FileOptions;
}

/// Listening stream sockets.
pub trait StreamSourceCapable {
    fn set_keep_alive(&mut self, keep_alive: bool);
    fn set_max_connections(&mut self, max_connections: u32);
}

/// Connected destinations that can keep their connection across reloads.
pub trait KeepAliveCapable {
    fn set_keep_alive(&mut self, keep_alive: bool);
}

pub trait TransportCapable {
    fn set_transport(&mut self, transport: Transport);
}

/// Drivers whose failure to start is tolerated.
pub trait OptionalCapable {
    fn optional(&mut self) -> &mut bool;
}

/// Network sources: where to listen.
pub trait InetSourceAddressCapable {
    fn set_local_ip(&mut self, ip: String);
    fn set_local_port(&mut self, port: String);
}

/// Network destinations: where to bind and where to send.
pub trait InetDestinationAddressCapable {
    fn set_local_ip(&mut self, ip: String);
    fn set_local_port(&mut self, port: String);
    fn set_dest_port(&mut self, port: String);
}

pub trait SpoofSourceCapable {
    fn set_spoof_source(&mut self, spoof: bool);
}
