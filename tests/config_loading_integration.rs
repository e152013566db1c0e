//! Integration tests for configuration scripts
//!
//! These tests run whole Rhai configuration scripts through the loader:
//! - Constructor calls and the handles they return
//! - Option projection onto socket and file drivers
//! - Construction and option failures

mod common;

use common::{load, loader, strict_loader};
use logscript::drivers::{Driver, DriverKind};
use logscript::error::{ConstructionError, LogScriptError};
use logscript::registry::DriverRegistry;
use logscript::ConfigLoader;
use std::io::Write;
use std::sync::Arc;

#[test]
fn test_tcp_destination_options() {
    let loaded = load(
        r#"
        TcpDestination("h", #{ port: "514", keep_alive: true, so_sndbuf: 65536 });
        "#,
    );
    assert_eq!(loaded.nodes.len(), 1);
    assert!(loaded.config_errors.is_empty());

    let dest = loaded.nodes[0].as_socket_destination().unwrap();
    assert_eq!(dest.kind(), DriverKind::TcpDestination);
    assert_eq!(dest.target, "h");
    assert_eq!(dest.dest_port(), Some("514"));
    assert!(dest.keep_alive);
    assert_eq!(dest.inet.socket.so_sndbuf, 65536);
    assert_eq!(dest.inet.ip_ttl, 0);
}

#[test]
fn test_keep_alive_can_be_disabled() {
    let loaded = load(
        r#"
        TcpDestination("h", #{ keep_alive: false });
        UnixStreamDestination("/run/log.sock", #{ keep_alive: false });
        TcpDestination("h");
        "#,
    );
    assert!(!loaded.nodes[0].as_socket_destination().unwrap().keep_alive);
    assert!(!loaded.nodes[1].as_socket_destination().unwrap().keep_alive);
    assert!(loaded.nodes[2].as_socket_destination().unwrap().keep_alive);
}

#[test]
fn test_destport_alias_and_defaults() {
    let loaded = load(
        r#"
        UdpDestination("collector", #{ destport: "5140", spoof_source: true });
        SyslogDestination("relay", #{ transport: "tls" });
        "#,
    );
    let udp = loaded.nodes[0].as_socket_destination().unwrap();
    assert_eq!(udp.dest_port(), Some("5140"));
    assert!(udp.spoof_source);

    let syslog = loaded.nodes[1].as_socket_destination().unwrap();
    assert_eq!(syslog.dest_port(), None);
    assert_eq!(syslog.effective_port().as_deref(), Some("6514"));
}

#[test]
fn test_handles_follow_construction_order() {
    let loaded = load(
        r#"
        let a = UnixStreamSource("/dev/log");
        let b = FileDestination("/var/log/messages", #{ create_dirs: true });
        if a.id != 0 || b.id != 1 { throw "unexpected ids"; }
        if b.kind != "FileDestination" { throw "unexpected kind"; }
        "#,
    );
    assert_eq!(loaded.nodes.len(), 2);
    assert!(matches!(loaded.nodes[0], Driver::SocketSource(_)));
    let file = loaded.nodes[1].as_file_destination().unwrap();
    assert!(file.file.create_dirs);
}

#[test]
fn test_option_errors_are_collected() {
    let loaded = load(
        r#"
        TcpSource(#{ port: "601", max_connections: "many", keep_alive: false });
        "#,
    );
    assert_eq!(loaded.nodes.len(), 1);
    assert_eq!(loaded.config_errors.len(), 1);
    assert_eq!(loaded.config_errors[0].key, "max_connections");

    let source = loaded.nodes[0].as_socket_source().unwrap();
    assert_eq!(source.effective_port().as_deref(), Some("601"));
    assert!(!source.keep_alive);
    assert_eq!(source.max_connections, 10);
}

#[test]
fn test_fail_fast_aborts_load() {
    let err = strict_loader()
        .load_str(r#"TcpSource(#{ max_connections: "many" });"#)
        .unwrap_err();
    assert!(matches!(
        err,
        LogScriptError::Construction(ConstructionError::Config(_))
    ));
}

#[test]
fn test_unknown_keys_reported_in_warn_mode() {
    let loaded = strict_loader()
        .load_str(r#"FileSource("/var/log/app.log", #{ follow_freq: 500, folow_freq: 1 });"#)
        .unwrap();
    assert_eq!(
        loaded.unknown_keys,
        vec![("FileSource".to_string(), "folow_freq".to_string())]
    );
    let source = loaded.nodes[0].as_file_source().unwrap();
    assert_eq!(source.reader.follow_freq, 500);
}

#[test]
fn test_missing_argument_fails_even_when_caught() {
    let err = loader()
        .load_str(
            r#"
            try {
                TcpDestination();
            } catch (e) {
                print(`ignored: ${e}`);
            }
            FileDestination("/tmp/out.log");
            "#,
        )
        .unwrap_err();
    assert!(matches!(
        err,
        LogScriptError::Construction(ConstructionError::MissingArgument { position: 1, .. })
    ));
}

#[test]
fn test_bad_script_source_fails_load() {
    let err = loader()
        .load_str(r#"ScriptSource("fn main() { }");"#)
        .unwrap_err();
    assert!(matches!(
        err,
        LogScriptError::Construction(ConstructionError::MissingEntryPoint { .. })
    ));

    let err = loader()
        .load_str(r#"ScriptSource("fn thread_func(s) { post(s, ");"#)
        .unwrap_err();
    assert!(matches!(
        err,
        LogScriptError::Construction(ConstructionError::ScriptCompile(_))
    ));
}

#[test]
fn test_config_script_error_is_reported() {
    let err = loader().load_str("let x = ;").unwrap_err();
    assert!(err.to_string().starts_with("Configuration script failed"));
    match err {
        LogScriptError::WithContext { source, .. } => {
            assert!(matches!(*source, LogScriptError::Script(_)))
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_custom_factory_replaces_builtin() {
    let mut registry = DriverRegistry::with_builtin_drivers();
    registry.register("TcpDestination", |args, ctx| {
        let mut driver =
            logscript::drivers::SocketDestinationDriver::new(DriverKind::TcpDestination, "pinned".into());
        let schema = logscript::drivers::SocketDestinationDriver::schema(DriverKind::TcpDestination);
        ctx.project("TcpDestination", &schema, args.options(2)?, &mut driver)?;
        Ok(Driver::SocketDestination(driver))
    });
    registry.register("Discard", |_args, _ctx| {
        Ok(Driver::FileDestination(logscript::drivers::FileDestinationDriver::new(
            "/dev/null".into(),
        )))
    });

    let loaded = ConfigLoader::new(Arc::new(registry))
        .load_str(r#"TcpDestination("ignored", #{ port: "7000" }); Discard();"#)
        .unwrap();
    let dest = loaded.nodes[0].as_socket_destination().unwrap();
    assert_eq!(dest.target, "pinned");
    assert_eq!(dest.dest_port(), Some("7000"));
    assert_eq!(loaded.nodes[1].as_file_destination().unwrap().path, "/dev/null");
}

#[test]
fn test_load_file_reads_script() {
    let mut file = tempfile::Builder::new().suffix(".rhai").tempfile().unwrap();
    writeln!(file, r#"SyslogSource(#{{ transport: "tcp", ip: "127.0.0.1" }});"#).unwrap();

    let loaded = loader().load_file(file.path()).unwrap();
    let source = loaded.nodes[0].as_socket_source().unwrap();
    assert_eq!(source.local_ip.as_deref(), Some("127.0.0.1"));
    assert_eq!(source.effective_port().as_deref(), Some("601"));
}

#[test]
fn test_load_missing_file_has_context() {
    let err = loader().load_file("/nonexistent/logscript.rhai").unwrap_err();
    assert!(err.to_string().contains("Failed to read configuration"));
}
