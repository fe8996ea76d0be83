use std::io;
use std::path::PathBuf;

use jolt_host::HostError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AgentError>;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("trace script {} is not a precompiled .class file", path.display())]
    ScriptNotCompiled { path: PathBuf },

    #[error("trace script {} does not exist", path.display())]
    ScriptNotFound { path: PathBuf },

    #[error("trace settings file {} is missing", path.display())]
    MissingSettings { path: PathBuf },

    #[error("malformed trace settings {}: {source}", path.display())]
    Settings {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("malformed trace artifact: {0}")]
    Artifact(#[from] jolt_classfile::Error),

    #[error("class {class} is not a trace (missing @Trace annotation)")]
    NotATrace { class: String },

    #[error("invalid hook pattern in trace {trace}: {source}")]
    Pattern {
        trace: String,
        source: jolt_probes::ProbeError,
    },

    #[error("client protocol error: {0}")]
    Protocol(String),

    #[error("failed to extend class search path with {}: {source}", path.display())]
    Classpath { path: PathBuf, source: HostError },

    #[error("failed to listen on port {port}: {source}")]
    Listener { port: u16, source: io::Error },

    #[error(transparent)]
    Host(#[from] HostError),

    #[error(transparent)]
    Io(#[from] io::Error),
}
