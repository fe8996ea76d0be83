//! Probe resolution for Jolt traces.
//!
//! A trace may name its hook points indirectly: a handler annotated with a
//! probe reference (`namespace` + local `name`) is bound to whatever methods
//! the namespace's probe descriptor lists under that name. This crate loads
//! descriptors, caches them per namespace and turns references into concrete
//! [`HookPoint`]s.

mod descriptor;
mod error;
mod pattern;
mod resolver;
mod store;

use serde::Deserialize;

pub use descriptor::{HookTemplate, ProbeDescriptor, ProbeTemplate};
pub use error::ProbeError;
pub use pattern::ClassPattern;
pub use resolver::ProbeResolver;
pub use store::{DescriptorStore, DirectoryStore, DESCRIPTOR_EXTENSION};

/// Where inside a target method a hook fires.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    #[default]
    Entry,
    Return,
    Error,
    Throw,
    Call,
    Sync,
}

impl Location {
    /// Parses the constant names used by trace annotations (`RETURN`, ...).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "entry" => Some(Location::Entry),
            "return" => Some(Location::Return),
            "error" => Some(Location::Error),
            "throw" => Some(Location::Throw),
            "call" => Some(Location::Call),
            "sync" => Some(Location::Sync),
            _ => None,
        }
    }
}

/// A symbolic reference from a trace handler to a named probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeRef {
    pub namespace: String,
    pub name: String,
    /// Handler method inside the trace that the resolved hooks call.
    pub target_name: String,
    pub target_descriptor: String,
}

/// A concrete hook: which method of which class to instrument, and which
/// trace handler to call from there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookPoint {
    /// Class pattern as written (`java.net.Socket`, `/java\.io\..*/`, `+java.lang.Runnable`).
    pub class: String,
    pub method: String,
    /// Method descriptor; empty matches every overload.
    pub method_type: String,
    pub location: Location,
    pub target_name: String,
    pub target_descriptor: String,
}
