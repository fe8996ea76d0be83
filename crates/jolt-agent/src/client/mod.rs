//! Tracing sessions.
//!
//! Every session, whatever its source, is a [`Client`]: a host transformer
//! that also answers the onboarding questions the coordinator asks. The
//! shared behaviour lives in [`TraceSession`]; the variants only differ in
//! how the trace artifact reaches the agent.

mod file;
mod remote;
mod session;

use jolt_host::{ClassFileTransformer, LoadedClass};

pub(crate) use file::has_artifact_suffix;
pub use file::{settings_path, FileClient, TraceSettings, SETTINGS_SUFFIX};
pub use remote::{Frame, RemoteClient, MAX_FRAME_LEN};
pub use session::TraceSession;

pub trait Client: ClassFileTransformer {
    /// False when the trace has no hook points at all.
    fn wants_transformer(&self) -> bool;

    /// Whether an already-loaded class matches any hook point.
    fn is_candidate(&self, class: &LoadedClass) -> bool;

    /// Ends the initial retransformation pass. Later retransformation
    /// callbacks leave classes untouched.
    fn skip_retransforms(&self);
}
