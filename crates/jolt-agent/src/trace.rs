//! Decoding of precompiled trace artifacts.
//!
//! A trace is an ordinary class file whose class carries `@Trace` and whose
//! static handler methods carry `@OnMethod` (a direct hook) or `@OnProbe`
//! (a reference resolved through probe descriptors).

use std::sync::Arc;

use jolt_classfile::{Annotation, ClassFile, ClassMember};
use jolt_probes::{HookPoint, Location, ProbeRef};

use crate::error::{AgentError, Result};
use crate::logging::AGENT_TARGET;

pub const TRACE_ANNOTATION: &str = "jolt/annotations/Trace";
pub const ON_METHOD_ANNOTATION: &str = "jolt/annotations/OnMethod";
pub const ON_PROBE_ANNOTATION: &str = "jolt/annotations/OnProbe";

#[derive(Debug, Clone)]
pub struct TraceProgram {
    /// Internal name of the trace class.
    pub class_name: String,
    pub bytes: Arc<[u8]>,
    pub on_methods: Vec<HookPoint>,
    pub on_probes: Vec<ProbeRef>,
}

impl TraceProgram {
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let class = ClassFile::parse(bytes)?;
        if class.annotation(TRACE_ANNOTATION).is_none() {
            return Err(AgentError::NotATrace {
                class: class.this_class,
            });
        }

        let mut on_methods = Vec::new();
        let mut on_probes = Vec::new();
        for method in &class.methods {
            if let Some(ann) = method.annotation(ON_METHOD_ANNOTATION) {
                match on_method(method, ann) {
                    Some(hook) => on_methods.push(hook),
                    None => tracing::debug!(
                        target: AGENT_TARGET,
                        trace = %class.this_class,
                        handler = %method.name,
                        "@OnMethod without clazz/method, ignored"
                    ),
                }
            }
            if let Some(ann) = method.annotation(ON_PROBE_ANNOTATION) {
                match on_probe(method, ann) {
                    Some(reference) => on_probes.push(reference),
                    None => tracing::debug!(
                        target: AGENT_TARGET,
                        trace = %class.this_class,
                        handler = %method.name,
                        "@OnProbe without namespace/name, ignored"
                    ),
                }
            }
        }

        Ok(Self {
            class_name: class.this_class,
            bytes: Arc::from(bytes),
            on_methods,
            on_probes,
        })
    }
}

fn on_method(method: &ClassMember, ann: &Annotation) -> Option<HookPoint> {
    let location = ann
        .string_element("location")
        .and_then(Location::from_name)
        .unwrap_or_default();
    Some(HookPoint {
        class: ann.string_element("clazz")?.to_string(),
        method: ann.string_element("method")?.to_string(),
        method_type: ann.string_element("type").unwrap_or_default().to_string(),
        location,
        target_name: method.name.clone(),
        target_descriptor: method.descriptor.clone(),
    })
}

fn on_probe(method: &ClassMember, ann: &Annotation) -> Option<ProbeRef> {
    Some(ProbeRef {
        namespace: ann.string_element("namespace")?.to_string(),
        name: ann.string_element("name")?.to_string(),
        target_name: method.name.clone(),
        target_descriptor: method.descriptor.clone(),
    })
}
