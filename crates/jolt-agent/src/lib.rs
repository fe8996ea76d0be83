//! The Jolt in-process instrumentation agent.
//!
//! Attaching the agent to a host runtime parses the attach argument string,
//! installs logging, optionally onboards a precompiled trace from disk and
//! then serves trace clients over TCP. Each client is onboarded with the same
//! install-then-retransform protocol (see [`coordinator`]).
//!
//! The host runtime and the bytecode rewriter are external collaborators,
//! reached through [`jolt_host::Instrumentation`] and [`ClassRewriter`].

#![forbid(unsafe_code)]

pub mod acceptor;
pub mod client;
pub mod context;
pub mod coordinator;
pub mod dump;
pub mod entry;
pub mod error;
pub mod logging;
pub mod options;
pub mod rewrite;
pub mod scope;
pub mod trace;

pub use acceptor::AcceptorHandle;
pub use client::{Client, FileClient, RemoteClient, TraceSession};
pub use context::{AgentContext, AgentHost};
pub use coordinator::{onboard, Onboarding};
pub use dump::ClassDumper;
pub use entry::{AgentHandle, Attach, EntryGuard};
pub use error::{AgentError, Result};
pub use options::{AgentArgs, AgentOptions};
pub use rewrite::{ClassRewriter, PassThroughRewriter, RewriteRequest};
pub use scope::{in_agent_code, AgentScope};
pub use trace::TraceProgram;

static AGENT: EntryGuard = EntryGuard::new();

/// Process-wide attach entry point.
///
/// Only the first call initializes the agent. `help` prints usage and exits
/// the process.
pub fn attach(args: &str, host: AgentHost) -> Attach {
    match AGENT.attach(args, host) {
        Attach::HelpRequested => std::process::exit(0),
        other => other,
    }
}
