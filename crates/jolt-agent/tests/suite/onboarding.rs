use std::sync::{Arc, Mutex};

use jolt_agent::{onboard, AgentError, AgentOptions, Client, FileClient, Onboarding};
use jolt_host::{
    ClassFileTransformer, HostCall, HostError, Instrumentation, LoadedClass, TransformError,
    TransformRequest,
};
use pretty_assertions::assert_eq;

use crate::harness::{context, host_with, trace_artifact, write_trace, RecordingRewriter, MARKER};

/// Client double that logs every coordinator interaction.
struct ScriptedClient {
    hooks: bool,
    accepts: Vec<&'static str>,
    events: Mutex<Vec<String>>,
}

impl ScriptedClient {
    fn new(hooks: bool, accepts: &[&'static str]) -> Arc<Self> {
        Arc::new(Self {
            hooks,
            accepts: accepts.to_vec(),
            events: Mutex::new(Vec::new()),
        })
    }

    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl ClassFileTransformer for ScriptedClient {
    fn transform(&self, request: &TransformRequest<'_>) -> Result<Option<Vec<u8>>, TransformError> {
        let kind = if request.is_retransform() { "retransform" } else { "load" };
        self.events
            .lock()
            .unwrap()
            .push(format!("{kind} {}", request.class_name));
        Ok(None)
    }
}

impl Client for ScriptedClient {
    fn wants_transformer(&self) -> bool {
        self.hooks
    }

    fn is_candidate(&self, class: &LoadedClass) -> bool {
        self.accepts.contains(&class.name.as_str())
    }

    fn skip_retransforms(&self) {
        self.events.lock().unwrap().push("skip".to_string());
    }
}

fn retransform_calls(calls: &[HostCall]) -> Vec<Vec<String>> {
    calls
        .iter()
        .filter_map(|call| match call {
            HostCall::Retransform(classes) => Some(classes.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn transformer_is_installed_before_retransformation_then_epoch_flips() {
    let host = host_with(&["app/A", "app/B", "app/C"]);
    let client = ScriptedClient::new(true, &["app/A", "app/C"]);

    let outcome = onboard(&*host, client.clone()).unwrap();
    assert_eq!(
        outcome,
        Onboarding::Installed {
            candidates: vec![LoadedClass::new("app/A"), LoadedClass::new("app/C")],
        }
    );

    let calls = host.calls();
    let add = calls
        .iter()
        .position(|c| *c == HostCall::AddTransformer { can_retransform: true })
        .unwrap();
    let retransform = calls
        .iter()
        .position(|c| matches!(c, HostCall::Retransform(_)))
        .unwrap();
    assert!(add < retransform, "calls: {calls:?}");
    assert_eq!(
        retransform_calls(&calls),
        vec![vec!["app/A".to_string(), "app/C".to_string()]]
    );

    assert_eq!(
        client.events(),
        vec!["retransform app/A", "retransform app/C", "skip"]
    );
}

#[test]
fn unmodifiable_classes_are_never_candidates() {
    let host = host_with(&["java/lang/Object", "app/A"]);
    host.set_modifiable("java/lang/Object", false);
    let client = ScriptedClient::new(true, &["java/lang/Object", "app/A"]);

    let outcome = onboard(&*host, client).unwrap();
    assert_eq!(
        outcome,
        Onboarding::Installed {
            candidates: vec![LoadedClass::new("app/A")],
        }
    );
    assert_eq!(retransform_calls(&host.calls()), vec![vec!["app/A".to_string()]]);
}

#[test]
fn client_without_hooks_is_not_installed() {
    let host = host_with(&["app/A"]);
    let client = ScriptedClient::new(false, &["app/A"]);

    assert_eq!(onboard(&*host, client.clone()).unwrap(), Onboarding::NotNeeded);
    assert!(host.calls().is_empty());
    assert_eq!(host.transformer_count(), 0);
    assert!(client.events().is_empty());
}

#[test]
fn empty_candidate_set_installs_without_retransforming_or_closing_the_epoch() {
    let host = host_with(&["app/A"]);
    let client = ScriptedClient::new(true, &[]);

    let outcome = onboard(&*host, client.clone()).unwrap();
    assert_eq!(outcome, Onboarding::Installed { candidates: Vec::new() });
    assert_eq!(host.transformer_count(), 1);
    assert!(retransform_calls(&host.calls()).is_empty());
    assert!(client.events().is_empty());
}

#[test]
fn host_rejection_propagates_and_leaves_epoch_open() {
    let host = host_with(&["app/A"]);
    host.set_retransform_supported(false);
    let client = ScriptedClient::new(true, &["app/A"]);

    let err = onboard(&*host, client.clone()).unwrap_err();
    assert!(matches!(
        err,
        AgentError::Host(HostError::RetransformUnsupported)
    ));
    assert_eq!(host.transformer_count(), 1);
    assert!(!client.events().contains(&"skip".to_string()));
}

#[test]
fn later_retransforms_do_not_reinstrument() {
    let dir = tempfile::tempdir().unwrap();
    let host = host_with(&["app/Worker", "app/Other"]);
    let rewriter = Arc::new(RecordingRewriter::default());
    let ctx = context(&host, &rewriter, AgentOptions::default());
    let path = write_trace(
        dir.path(),
        "WorkerTrace.class",
        &trace_artifact("traces/WorkerTrace", &["app.Worker"]),
        Some(""),
    );

    let client = Arc::new(FileClient::open(&ctx, &path).unwrap());
    onboard(&*host, client).unwrap();
    assert_eq!(host.class_bytes("app/Worker").unwrap(), vec![0, MARKER]);
    assert_eq!(host.class_bytes("app/Other").unwrap(), vec![0]);

    // A retransform requested by someone else replays the chain; the
    // onboarded session must leave the class alone.
    host.retransform(&[LoadedClass::new("app/Worker")]).unwrap();
    assert_eq!(host.class_bytes("app/Worker").unwrap(), vec![0, MARKER]);
    assert_eq!(rewriter.rewritten_classes(), vec!["app/Worker"]);

    // Fresh loads still go through the session.
    let loaded = host.load_class(LoadedClass::new("app/Worker$1"), vec![1]);
    assert_eq!(loaded, vec![1]);
    let loaded = host.load_class(LoadedClass::new("app/Worker"), vec![2]);
    assert_eq!(loaded, vec![2, MARKER]);
}

#[test]
fn retransformed_classes_are_dumped_under_the_trace_directory() {
    let dir = tempfile::tempdir().unwrap();
    let dumps = dir.path().join("dumps");
    let host = host_with(&["app/net/Worker"]);
    let rewriter = Arc::new(RecordingRewriter::default());
    let options = AgentOptions {
        dump_classes: true,
        dump_dir: dumps.clone(),
        ..AgentOptions::default()
    };
    let ctx = context(&host, &rewriter, options);
    let path = write_trace(
        dir.path(),
        "T.class",
        &trace_artifact("traces/T", &["/app\\.net\\..*/"]),
        Some(""),
    );

    onboard(&*host, Arc::new(FileClient::open(&ctx, &path).unwrap())).unwrap();
    let dumped = std::fs::read(dumps.join("traces.T/app/net/Worker.class")).unwrap();
    assert_eq!(dumped, vec![0, MARKER]);
}
