use serde::Deserialize;

use crate::{HookPoint, Location, ProbeRef};

/// All probes published under one namespace. Loaded once, then shared
/// read-only through the resolver cache.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProbeDescriptor {
    #[serde(default)]
    pub namespace: String,
    #[serde(default, rename = "probe")]
    pub probes: Vec<ProbeTemplate>,
}

impl ProbeDescriptor {
    pub fn find_probe(&self, name: &str) -> Option<&ProbeTemplate> {
        self.probes.iter().find(|probe| probe.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProbeTemplate {
    pub name: String,
    #[serde(default, rename = "hook")]
    pub hooks: Vec<HookTemplate>,
}

/// A hook point without a bound handler.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HookTemplate {
    pub class: String,
    pub method: String,
    #[serde(default, rename = "type")]
    pub method_type: String,
    #[serde(default)]
    pub location: Location,
}

impl HookTemplate {
    /// Copies the template and binds it to the reference's handler. The
    /// template itself is left untouched since it lives in a shared cache.
    pub fn bind(&self, reference: &ProbeRef) -> HookPoint {
        HookPoint {
            class: self.class.clone(),
            method: self.method.clone(),
            method_type: self.method_type.clone(),
            location: self.location,
            target_name: reference.target_name.clone(),
            target_descriptor: reference.target_descriptor.clone(),
        }
    }
}
