//! Schema composition.
//!
//! Each function here returns the descriptors of exactly one configuration
//! concern, generic over the capability trait that concern needs. Driver
//! kinds build their full schema by concatenating these in a fixed order;
//! on a name collision the later concern wins.
//!
//! All functions are pure: calling one twice yields the same descriptor
//! sequence.

use crate::drivers::capability::{
    DestinationCapable, FileCapable, InetDestinationAddressCapable, InetSocketCapable,
    InetSourceAddressCapable, KeepAliveCapable, OptionalCapable, ReaderCapable, SocketCapable,
    SourceCapable, SpoofSourceCapable, StreamSourceCapable, TransportCapable, WriterCapable,
};
use crate::drivers::common::{Transport, TsFormat};
use crate::options::descriptor::{to_bool, to_int, to_string, OptionDescriptor, OptionSchema};
use crate::options::error::ValueError;
use rhai::Dynamic;

fn to_u32(value: &Dynamic) -> Result<u32, ValueError> {
    let n = to_int(value)?;
    u32::try_from(n).map_err(|_| ValueError::OutOfRange {
        value: n,
        target: "u32",
    })
}

/// so_sndbuf, so_rcvbuf, so_broadcast, so_keepalive
pub fn socket_options<D: SocketCapable + 'static>() -> OptionSchema<D> {
    OptionSchema::new()
        .with(OptionDescriptor::int("so_sndbuf", |d: &mut D| {
            &mut d.socket_options().so_sndbuf
        }))
        .with(OptionDescriptor::int("so_rcvbuf", |d: &mut D| {
            &mut d.socket_options().so_rcvbuf
        }))
        .with(OptionDescriptor::boolean("so_broadcast", |d: &mut D| {
            &mut d.socket_options().so_broadcast
        }))
        .with(OptionDescriptor::boolean("so_keepalive", |d: &mut D| {
            &mut d.socket_options().so_keepalive
        }))
}

/// Socket tuning plus IP-level options.
pub fn inet_socket_options<D: InetSocketCapable + 'static>() -> OptionSchema<D> {
    socket_options::<D>()
        .with(OptionDescriptor::int("ip_ttl", |d: &mut D| {
            &mut d.inet_options().ip_ttl
        }))
        .with(OptionDescriptor::int("ip_tos", |d: &mut D| {
            &mut d.inet_options().ip_tos
        }))
        .with(OptionDescriptor::int("tcp_keepalive_time", |d: &mut D| {
            &mut d.inet_options().tcp_keepalive_time
        }))
        .with(OptionDescriptor::int("tcp_keepalive_interval", |d: &mut D| {
            &mut d.inet_options().tcp_keepalive_intvl
        }))
        .with(OptionDescriptor::int("tcp_keepalive_probes", |d: &mut D| {
            &mut d.inet_options().tcp_keepalive_probes
        }))
}

pub fn reader_options<D: ReaderCapable + 'static>() -> OptionSchema<D> {
    OptionSchema::new()
        .with(OptionDescriptor::int("log_msg_size", |d: &mut D| {
            &mut d.reader_options().log_msg_size
        }))
        .with(OptionDescriptor::int("log_fetch_limit", |d: &mut D| {
            &mut d.reader_options().log_fetch_limit
        }))
        .with(OptionDescriptor::int("follow_freq", |d: &mut D| {
            &mut d.reader_options().follow_freq
        }))
        .with(OptionDescriptor::boolean("check_hostname", |d: &mut D| {
            &mut d.reader_options().check_hostname
        }))
        .with(OptionDescriptor::int("log_iw_size", |d: &mut D| {
            &mut d.reader_options().log_iw_size
        }))
}

pub fn writer_options<D: WriterCapable + 'static>() -> OptionSchema<D> {
    OptionSchema::new()
        .with(OptionDescriptor::int("flush_lines", |d: &mut D| {
            &mut d.writer_options().flush_lines
        }))
        .with(OptionDescriptor::int("flush_timeout", |d: &mut D| {
            &mut d.writer_options().flush_timeout
        }))
        .with(OptionDescriptor::int("mark_freq", |d: &mut D| {
            &mut d.writer_options().mark_freq
        }))
        .with(OptionDescriptor::int("suppress", |d: &mut D| {
            &mut d.writer_options().suppress
        }))
        .with(OptionDescriptor::string("template", |d: &mut D| {
            &mut d.writer_options().template
        }))
        .with(OptionDescriptor::setter("ts_format", |d: &mut D, v: &Dynamic| {
            let format: TsFormat = to_string(v)?.parse()?;
            d.writer_options().ts_format = format;
            Ok(())
        }))
}

pub fn destination_options<D: DestinationCapable + 'static>() -> OptionSchema<D> {
    OptionSchema::new()
        .with(OptionDescriptor::int("log_fifo_size", |d: &mut D| {
            &mut d.destination_options().log_fifo_size
        }))
        .with(OptionDescriptor::int("throttle", |d: &mut D| {
            &mut d.destination_options().throttle
        }))
}

pub fn source_options<D: SourceCapable + 'static>() -> OptionSchema<D> {
    OptionSchema::new()
        .with(OptionDescriptor::string("program_override", |d: &mut D| {
            &mut d.source_options().program_override
        }))
        .with(OptionDescriptor::string("host_override", |d: &mut D| {
            &mut d.source_options().host_override
        }))
}

/// keep_alive, max_connections for listening stream sockets.
pub fn stream_source_options<D: StreamSourceCapable + 'static>() -> OptionSchema<D> {
    OptionSchema::new()
        .with(OptionDescriptor::setter("keep_alive", |d: &mut D, v: &Dynamic| {
            d.set_keep_alive(to_bool(v)?);
            Ok(())
        }))
        .with(OptionDescriptor::setter(
            "max_connections",
            |d: &mut D, v: &Dynamic| {
                d.set_max_connections(to_u32(v)?);
                Ok(())
            },
        ))
}

/// Destination-side keep_alive.
pub fn keep_alive_option<D: KeepAliveCapable + 'static>() -> OptionSchema<D> {
    OptionSchema::new().with(OptionDescriptor::setter(
        "keep_alive",
        |d: &mut D, v: &Dynamic| {
            d.set_keep_alive(to_bool(v)?);
            Ok(())
        },
    ))
}

pub fn transport_option<D: TransportCapable + 'static>() -> OptionSchema<D> {
    OptionSchema::new().with(OptionDescriptor::setter(
        "transport",
        |d: &mut D, v: &Dynamic| {
            let transport: Transport = to_string(v)?.parse()?;
            d.set_transport(transport);
            Ok(())
        },
    ))
}

pub fn optional_option<D: OptionalCapable + 'static>() -> OptionSchema<D> {
    OptionSchema::new().with(OptionDescriptor::boolean("optional", |d: &mut D| {
        d.optional()
    }))
}

/// localip/ip and localport/port for listening network sockets.
pub fn inet_source_address_options<D: InetSourceAddressCapable + 'static>() -> OptionSchema<D> {
    let localip = OptionDescriptor::setter("localip", |d: &mut D, v: &Dynamic| {
        d.set_local_ip(to_string(v)?);
        Ok(())
    });
    let localport = OptionDescriptor::setter("localport", |d: &mut D, v: &Dynamic| {
        d.set_local_port(to_string(v)?);
        Ok(())
    });
    OptionSchema::new()
        .with(localip.alias("ip"))
        .with(localip)
        .with(localport.alias("port"))
        .with(localport)
}

/// localip, localport and port/destport for network destinations.
pub fn inet_destination_address_options<D: InetDestinationAddressCapable + 'static>(
) -> OptionSchema<D> {
    let destport = OptionDescriptor::setter("port", |d: &mut D, v: &Dynamic| {
        d.set_dest_port(to_string(v)?);
        Ok(())
    });
    OptionSchema::new()
        .with(OptionDescriptor::setter("localip", |d: &mut D, v: &Dynamic| {
            d.set_local_ip(to_string(v)?);
            Ok(())
        }))
        .with(OptionDescriptor::setter(
            "localport",
            |d: &mut D, v: &Dynamic| {
                d.set_local_port(to_string(v)?);
                Ok(())
            },
        ))
        .with(destport.alias("destport"))
        .with(destport)
}

pub fn spoof_source_option<D: SpoofSourceCapable + 'static>() -> OptionSchema<D> {
    OptionSchema::new().with(OptionDescriptor::setter(
        "spoof_source",
        |d: &mut D, v: &Dynamic| {
            d.set_spoof_source(to_bool(v)?);
            Ok(())
        },
    ))
}

pub fn file_options<D: FileCapable + 'static>() -> OptionSchema<D> {
    OptionSchema::new()
        .with(OptionDescriptor::boolean("create_dirs", |d: &mut D| {
            &mut d.file_options().create_dirs
        }))
        .with(OptionDescriptor::int("file_perm", |d: &mut D| {
            &mut d.file_options().file_perm
        }))
        .with(OptionDescriptor::int("dir_perm", |d: &mut D| {
            &mut d.file_options().dir_perm
        }))
}
