//! Integration tests for script sources
//!
//! These tests validate the complete script source workflow:
//! - Construction from a configuration script
//! - Deferred start on the main loop and delivery through the host
//! - Shutdown of finished, sleeping and spinning scripts

mod common;

use common::{collect_messages, payloads, start_host, wait_for_stops};
use logscript::host::{ExitReason, HostSignal, LogPipe, NodeId, PipelineHost};
use logscript::script_source::{Phase, ScriptSource};
use logscript::Driver;
use std::time::{Duration, Instant};

fn script_source(host: &PipelineHost, id: u32) -> &ScriptSource {
    host.node(NodeId(id))
        .and_then(Driver::as_script_source)
        .expect("script source node")
}

#[test]
fn test_posts_arrive_in_order_with_producer() {
    let mut host = start_host(
        r#"
        FileDestination("/tmp/unused.log");
        ScriptSource(`
            fn thread_func(source) {
                post(source, "a");
                post(source, "b");
                post(source, "c");
            }
        `);
        "#,
    );

    // Nothing runs before the main loop picks up the deferred start.
    assert_eq!(script_source(&host, 1).phase(), Phase::Initialized);
    assert!(host.drain_messages().is_empty());

    let messages = collect_messages(&host, 3);
    assert_eq!(payloads(&messages), vec!["a", "b", "c"]);
    assert!(messages.iter().all(|m| m.producer == Some(NodeId(1))));

    let signals = wait_for_stops(&host, 1);
    assert!(signals.iter().any(|s| matches!(
        s,
        HostSignal::SourceStopped { node: NodeId(1), reason: ExitReason::Returned }
    )));
    assert_eq!(script_source(&host, 1).emitted(), 3);
    assert!(host.deinit_all());
}

#[test]
fn test_script_sees_its_own_name() {
    let host = start_host(
        r#"
        ScriptSource(`
            fn thread_func(source) {
                post(source, source.name);
                post(source, source.id + 40);
            }
        `);
        "#,
    );
    let messages = collect_messages(&host, 2);
    assert_eq!(payloads(&messages), vec!["ScriptSource#0", "40"]);
}

#[test]
fn test_two_sources_are_tagged_separately() {
    let host = start_host(
        r#"
        ScriptSource(`fn thread_func(s) { for i in 0..5 { post(s, "left"); } }`);
        ScriptSource(`fn thread_func(s) { for i in 0..5 { post(s, "right"); } }`);
        "#,
    );
    let messages = collect_messages(&host, 10);
    assert_eq!(messages.len(), 10);
    for message in &messages {
        let expected = if message.payload == "left" { NodeId(0) } else { NodeId(1) };
        assert_eq!(message.producer, Some(expected));
    }
}

#[test]
fn test_runtime_error_stops_worker() {
    let host = start_host(
        r#"
        ScriptSource(`
            fn thread_func(source) {
                post(source, "before");
                throw "boom";
                post(source, "after");
            }
        `);
        "#,
    );
    let signals = wait_for_stops(&host, 1);
    let failed = signals.iter().any(|s| matches!(
        s,
        HostSignal::SourceStopped { reason: ExitReason::Failed(_), .. }
    ));
    assert!(failed, "expected a failure signal, got {:?}", signals);
    assert_eq!(payloads(&host.drain_messages()), vec!["before"]);
}

#[test]
fn test_deinit_interrupts_busy_loop() {
    let mut host = start_host(
        r#"
        ScriptSource(`
            fn thread_func(source) {
                let n = 0;
                loop { n += 1; }
            }
        `);
        "#,
    );
    host.main_loop().run_pending();
    assert_eq!(script_source(&host, 0).phase(), Phase::Running);
    std::thread::sleep(Duration::from_millis(50));

    let started = Instant::now();
    assert!(host.deinit_all());
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(host.threads().live(), 0);

    let signals = host.main_loop().drain_signals();
    assert!(signals.iter().any(|s| matches!(
        s,
        HostSignal::SourceStopped { reason: ExitReason::Cancelled, .. }
    )));
}

#[test]
fn test_deinit_wakes_sleeping_script() {
    let mut host = start_host(
        r#"
        ScriptSource(`
            fn thread_func(source) {
                while !is_cancelled() {
                    post(source, "tick");
                    sleep(60000);
                }
            }
        `);
        "#,
    );
    let messages = collect_messages(&host, 1);
    assert_eq!(payloads(&messages), vec!["tick"]);

    let started = Instant::now();
    assert!(host.deinit_all());
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[test]
fn test_deinit_before_start_never_runs_script() {
    let mut host = start_host(
        r#"ScriptSource(`fn thread_func(s) { post(s, "never"); }`);"#,
    );
    assert!(host.deinit_all());
    assert_eq!(host.main_loop().run_pending(), 1);

    assert_eq!(script_source(&host, 0).phase(), Phase::Deinitialized);
    assert!(host.drain_messages().is_empty());
    assert_eq!(host.threads().live(), 0);
}

#[test]
fn test_second_deinit_is_rejected() {
    let mut host = PipelineHost::default();
    let source = ScriptSource::new("fn thread_func(s) { }").unwrap();
    let id = host.register(Driver::ScriptSource(source));
    host.init_all().unwrap();
    host.main_loop().run_pending();
    wait_for_stops(&host, 1);

    let node = host.node_mut(id).unwrap();
    assert!(node.deinit());
    assert!(!node.deinit());
}
