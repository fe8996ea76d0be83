use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::{DescriptorStore, HookPoint, ProbeDescriptor, ProbeRef};

/// Resolves probe references through a per-namespace descriptor cache.
///
/// The cache is shared across every session in the process, so cached
/// descriptors are immutable: resolution always produces fresh copies.
pub struct ProbeResolver {
    store: Box<dyn DescriptorStore>,
    cache: RwLock<HashMap<String, Arc<ProbeDescriptor>>>,
}

impl ProbeResolver {
    pub fn new(store: impl DescriptorStore + 'static) -> Self {
        Self {
            store: Box::new(store),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the descriptor for `namespace`, loading it on a cache miss.
    ///
    /// Store failures are logged and reported as a miss. Misses are not
    /// cached.
    pub fn descriptor(&self, namespace: &str) -> Option<Arc<ProbeDescriptor>> {
        if let Some(descriptor) = self.cache.read().get(namespace) {
            return Some(Arc::clone(descriptor));
        }

        tracing::debug!(target: "jolt.probes", namespace, "loading probe descriptor");
        let loaded = match self.store.load(namespace) {
            Ok(Some(descriptor)) => descriptor,
            Ok(None) => {
                tracing::debug!(target: "jolt.probes", namespace, "no probe descriptor found");
                return None;
            }
            Err(err) => {
                tracing::debug!(
                    target: "jolt.probes",
                    namespace,
                    error = %err,
                    "failed to load probe descriptor"
                );
                return None;
            }
        };

        // Another thread may have loaded the same namespace meanwhile; keep
        // whichever landed first so every session shares one instance.
        let mut cache = self.cache.write();
        let entry = cache
            .entry(namespace.to_string())
            .or_insert_with(|| Arc::new(loaded));
        Some(Arc::clone(entry))
    }

    /// Maps references to hook points, in reference order and then template
    /// order. Unknown namespaces and probe names contribute nothing.
    pub fn resolve(&self, references: &[ProbeRef]) -> Vec<HookPoint> {
        let mut hooks = Vec::new();
        for reference in references {
            let Some(descriptor) = self.descriptor(&reference.namespace) else {
                continue;
            };
            let Some(probe) = descriptor.find_probe(&reference.name) else {
                tracing::debug!(
                    target: "jolt.probes",
                    namespace = %reference.namespace,
                    probe = %reference.name,
                    "no probe mappings"
                );
                continue;
            };
            hooks.extend(probe.hooks.iter().map(|template| template.bind(reference)));
        }
        hooks
    }

    pub fn cached_namespaces(&self) -> Vec<String> {
        let mut namespaces: Vec<_> = self.cache.read().keys().cloned().collect();
        namespaces.sort();
        namespaces
    }
}
