use std::sync::Arc;

use jolt_agent::acceptor::{self, ACCEPTOR_THREAD_NAME};
use jolt_agent::client::Frame;
use jolt_agent::{AgentOptions, Attach, EntryGuard};
use jolt_host::LoadedClass;
use pretty_assertions::assert_eq;

use crate::harness::{
    agent_host, connect, context, host_with, instrument, send_raw, trace_artifact,
    RecordingRewriter, MARKER,
};

#[test]
fn remote_client_is_onboarded_and_acknowledged() {
    let host = host_with(&["app/A", "app/B"]);
    let rewriter = Arc::new(RecordingRewriter::default());
    let ctx = Arc::new(context(&host, &rewriter, AgentOptions::default()));
    let handle = acceptor::start(ctx, 0).unwrap();
    assert_eq!(handle.thread().name(), Some(ACCEPTOR_THREAD_NAME));

    let (_session, ack) = instrument(handle.local_addr(), &trace_artifact("traces/R", &["app.B"]));
    assert_eq!(ack, Frame::Okay);
    assert_eq!(host.transformer_count(), 1);
    assert_eq!(host.class_bytes("app/B").unwrap(), vec![0, MARKER]);
    assert_eq!(host.class_bytes("app/A").unwrap(), vec![0]);
}

#[test]
fn bad_requests_get_an_error_frame_and_the_loop_keeps_serving() {
    let host = host_with(&["app/A"]);
    let rewriter = Arc::new(RecordingRewriter::default());
    let ctx = Arc::new(context(&host, &rewriter, AgentOptions::default()));
    let handle = acceptor::start(ctx, 0).unwrap();

    let (_first, ack) = instrument(handle.local_addr(), b"definitely not a class file");
    match ack {
        Frame::Error(message) => assert!(message.contains("malformed trace artifact"), "{message}"),
        other => panic!("expected an error frame, got {other:?}"),
    }

    let mut wrong_kind = connect(handle.local_addr());
    Frame::Okay.write_to(&mut wrong_kind).unwrap();
    assert!(matches!(
        Frame::read_from(&mut wrong_kind).unwrap(),
        Frame::Error(_)
    ));

    // A peer that hangs up mid-frame is dropped without an answer.
    let mut truncated = connect(handle.local_addr());
    send_raw(&mut truncated, &[1, 0, 0, 0, 9, 0xCA]);
    drop(truncated);

    assert_eq!(host.transformer_count(), 0);
    let (_second, ack) = instrument(handle.local_addr(), &trace_artifact("traces/R", &["app.A"]));
    assert_eq!(ack, Frame::Okay);
    assert_eq!(host.transformer_count(), 1);
}

#[test]
fn onboarding_failures_are_reported_to_the_peer() {
    let host = host_with(&["app/A"]);
    host.set_retransform_supported(false);
    let rewriter = Arc::new(RecordingRewriter::default());
    let ctx = Arc::new(context(&host, &rewriter, AgentOptions::default()));
    let handle = acceptor::start(ctx, 0).unwrap();

    let (_session, ack) = instrument(handle.local_addr(), &trace_artifact("traces/R", &["app.A"]));
    match ack {
        Frame::Error(message) => assert!(message.contains("not supported"), "{message}"),
        other => panic!("expected an error frame, got {other:?}"),
    }
}

#[test]
fn panicking_client_is_reported_and_the_loop_keeps_serving() {
    let host = host_with(&["app/A", "app/Bad"]);
    let rewriter = Arc::new(RecordingRewriter::panicking_on("app/Bad"));
    let ctx = Arc::new(context(&host, &rewriter, AgentOptions::default()));
    let handle = acceptor::start(ctx, 0).unwrap();

    let (_bad, ack) = instrument(handle.local_addr(), &trace_artifact("traces/Bad", &["app.Bad"]));
    match ack {
        Frame::Error(message) => assert!(message.contains("rewriter blew up"), "{message}"),
        other => panic!("expected an error frame, got {other:?}"),
    }

    let (_good, ack) = instrument(handle.local_addr(), &trace_artifact("traces/Good", &["app.A"]));
    assert_eq!(ack, Frame::Okay);
    assert_eq!(host.class_bytes("app/A").unwrap(), vec![0, MARKER]);
}

#[test]
fn clients_are_onboarded_one_after_another() {
    let host = host_with(&["app/A"]);
    let rewriter = Arc::new(RecordingRewriter::default());
    let ctx = Arc::new(context(&host, &rewriter, AgentOptions::default()));
    let handle = acceptor::start(ctx, 0).unwrap();

    // The first peer connects but does not send anything yet; the second peer
    // must wait until the first one has been served.
    let mut first = connect(handle.local_addr());
    let second_addr = handle.local_addr();
    let second = std::thread::spawn(move || {
        let (_stream, ack) = instrument(second_addr, &trace_artifact("traces/Second", &["app.A"]));
        ack
    });
    std::thread::sleep(std::time::Duration::from_millis(100));
    assert_eq!(host.transformer_count(), 0);

    Frame::Instrument(trace_artifact("traces/First", &["app.A"]))
        .write_to(&mut first)
        .unwrap();
    assert_eq!(Frame::read_from(&mut first).unwrap(), Frame::Okay);
    assert_eq!(second.join().unwrap(), Frame::Okay);

    let traces: Vec<_> = rewriter.rewrites().into_iter().map(|r| r.trace).collect();
    assert_eq!(traces, vec!["traces/First", "traces/Second"]);
    assert_eq!(host.transformer_count(), 2);
}

#[test]
fn attach_starts_the_acceptor_unless_disabled() {
    let host = host_with(&["app/A"]);
    let rewriter = Arc::new(RecordingRewriter::default());

    let handle = match EntryGuard::new().attach("port=0", agent_host(&host, &rewriter)) {
        Attach::Initialized(handle) => handle,
        other => panic!("expected initialization, got {other:?}"),
    };
    let addr = handle.acceptor().unwrap().local_addr();
    assert_ne!(addr.port(), 0);

    let (_session, ack) = instrument(addr, &trace_artifact("traces/R", &["app.A"]));
    assert_eq!(ack, Frame::Okay);
    assert_eq!(host.class_bytes("app/A").unwrap(), vec![0, MARKER]);

    // Classes loaded after onboarding go through the remote session too.
    let loaded = host.load_class(LoadedClass::new("app/A"), vec![7]);
    assert_eq!(loaded, vec![7, MARKER]);
}
