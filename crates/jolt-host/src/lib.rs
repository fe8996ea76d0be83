//! Host instrumentation facility for Jolt.
//!
//! The managed runtime Jolt attaches to (class enumeration, modifiability
//! checks, retransformation and class search path splicing) is foreign to
//! this workspace. `jolt-agent` only ever talks to it through the
//! [`Instrumentation`] trait, so the agent can be driven by a real runtime
//! binding or by [`MockInstrumentation`] in tests.

mod mock;

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

pub use mock::{HostCall, MockInstrumentation};

/// A class the host has already loaded.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LoadedClass {
    /// Internal form, e.g. `java/net/Socket`.
    pub name: String,
    pub super_name: Option<String>,
    pub interfaces: Vec<String>,
}

impl LoadedClass {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            super_name: None,
            interfaces: Vec::new(),
        }
    }

    pub fn with_super(mut self, super_name: impl Into<String>) -> Self {
        self.super_name = Some(super_name.into());
        self
    }

    pub fn with_interface(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    /// Direct supertypes: the superclass (if any) followed by interfaces.
    pub fn supertypes(&self) -> impl Iterator<Item = &str> {
        self.super_name
            .as_deref()
            .into_iter()
            .chain(self.interfaces.iter().map(String::as_str))
    }
}

impl fmt::Display for LoadedClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// One (re)definition callback delivered to a transformer.
#[derive(Debug, Clone, Copy)]
pub struct TransformRequest<'a> {
    /// Internal name of the class being defined.
    pub class_name: &'a str,
    /// Set when the host replays hooks against an already-loaded class.
    pub class_being_redefined: Option<&'a LoadedClass>,
    /// Current class bytes (already passed through earlier transformers).
    pub bytes: &'a [u8],
}

impl TransformRequest<'_> {
    pub fn is_retransform(&self) -> bool {
        self.class_being_redefined.is_some()
    }
}

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("failed to rewrite {class}: {message}")]
    Rewrite { class: String, message: String },
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// A persistent hook invoked by the host on every class (re)definition.
///
/// `Ok(None)` leaves the class bytes unchanged. Errors are reported back to
/// the host, which logs them and keeps the bytes it passed in.
pub trait ClassFileTransformer: Send + Sync {
    fn transform(&self, request: &TransformRequest<'_>) -> Result<Option<Vec<u8>>, TransformError>;
}

#[derive(Debug, Error)]
pub enum HostError {
    /// The host cannot retransform classes at all.
    #[error("class retransformation is not supported by this host")]
    RetransformUnsupported,
    /// This specific class cannot be retransformed.
    #[error("class {class} is not modifiable")]
    UnmodifiableClass { class: String },
    #[error("invalid archive {}: {reason}", path.display())]
    InvalidArchive { path: PathBuf, reason: String },
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("{0}")]
    Other(String),
}

/// The host runtime's instrumentation facility.
pub trait Instrumentation: Send + Sync {
    fn all_loaded_classes(&self) -> Vec<LoadedClass>;

    fn is_modifiable(&self, class: &LoadedClass) -> bool;

    /// Appends a transformer to the host's transformer chain. The chain is
    /// append-only: transformers are never removed.
    fn add_transformer(&self, transformer: Arc<dyn ClassFileTransformer>, can_retransform: bool);

    /// Replays every retransform-capable transformer against the current
    /// bytes of each class.
    fn retransform(&self, classes: &[LoadedClass]) -> Result<(), HostError>;

    fn append_boot_search(&self, archive: &Path) -> Result<(), HostError>;

    fn append_system_search(&self, archive: &Path) -> Result<(), HostError>;
}
