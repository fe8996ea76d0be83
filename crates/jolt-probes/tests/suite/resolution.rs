use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use jolt_probes::{
    DescriptorStore, HookTemplate, Location, ProbeDescriptor, ProbeError, ProbeRef,
    ProbeResolver, ProbeTemplate,
};

#[derive(Default)]
struct MemoryStore {
    descriptors: HashMap<String, ProbeDescriptor>,
    failing: Vec<String>,
    loads: Arc<AtomicUsize>,
}

impl DescriptorStore for MemoryStore {
    fn load(&self, namespace: &str) -> Result<Option<ProbeDescriptor>, ProbeError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self.failing.iter().any(|ns| ns == namespace) {
            return Err(ProbeError::Io {
                path: format!("{namespace}.toml").into(),
                source: std::io::Error::other("disk on fire"),
            });
        }
        Ok(self.descriptors.get(namespace).cloned())
    }
}

fn hook(class: &str, method: &str) -> HookTemplate {
    HookTemplate {
        class: class.to_string(),
        method: method.to_string(),
        method_type: String::new(),
        location: Location::Entry,
    }
}

fn socket_descriptor() -> ProbeDescriptor {
    ProbeDescriptor {
        namespace: "net".to_string(),
        probes: vec![
            ProbeTemplate {
                name: "connect".to_string(),
                hooks: vec![
                    hook("java.net.Socket", "connect"),
                    hook("+java.nio.channels.SocketChannel", "connect"),
                ],
            },
            ProbeTemplate {
                name: "accept".to_string(),
                hooks: vec![hook("java.net.ServerSocket", "accept")],
            },
        ],
    }
}

fn reference(namespace: &str, name: &str, target: &str) -> ProbeRef {
    ProbeRef {
        namespace: namespace.to_string(),
        name: name.to_string(),
        target_name: target.to_string(),
        target_descriptor: "()V".to_string(),
    }
}

fn resolver_with(store: MemoryStore) -> ProbeResolver {
    ProbeResolver::new(store)
}

#[test]
fn resolution_keeps_reference_then_template_order() {
    let mut store = MemoryStore::default();
    store.descriptors.insert("net".to_string(), socket_descriptor());
    let resolver = resolver_with(store);

    let hooks = resolver.resolve(&[
        reference("net", "accept", "onAccept"),
        reference("net", "connect", "onConnect"),
    ]);

    let summary: Vec<_> = hooks
        .iter()
        .map(|h| (h.class.as_str(), h.target_name.as_str()))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("java.net.ServerSocket", "onAccept"),
            ("java.net.Socket", "onConnect"),
            ("+java.nio.channels.SocketChannel", "onConnect"),
        ]
    );
}

#[test]
fn partial_resolution_is_not_an_error() {
    let mut store = MemoryStore::default();
    store.descriptors.insert("net".to_string(), socket_descriptor());
    store.failing.push("broken".to_string());
    let resolver = resolver_with(store);

    let hooks = resolver.resolve(&[
        reference("net", "connect", "a"),
        reference("missing", "connect", "b"),
        reference("net", "unknown", "c"),
        reference("broken", "connect", "d"),
    ]);

    assert_eq!(hooks.len(), 2);
    assert!(hooks.iter().all(|h| h.target_name == "a"));
}

#[test]
fn cached_templates_are_never_mutated() {
    let mut store = MemoryStore::default();
    store.descriptors.insert("net".to_string(), socket_descriptor());
    let resolver = resolver_with(store);

    let first = resolver.resolve(&[reference("net", "accept", "first")]);
    let second = resolver.resolve(&[reference("net", "accept", "second")]);
    assert_eq!(first[0].target_name, "first");
    assert_eq!(second[0].target_name, "second");

    let cached = resolver.descriptor("net").unwrap();
    assert_eq!(*cached, socket_descriptor());
}

#[test]
fn hits_are_cached_and_misses_are_retried() {
    let loads = Arc::new(AtomicUsize::new(0));
    let mut store = MemoryStore {
        loads: Arc::clone(&loads),
        ..MemoryStore::default()
    };
    store.descriptors.insert("net".to_string(), socket_descriptor());
    let resolver = resolver_with(store);

    resolver.resolve(&[reference("net", "accept", "x")]);
    resolver.resolve(&[reference("net", "connect", "y")]);
    assert_eq!(loads.load(Ordering::SeqCst), 1);

    resolver.resolve(&[reference("missing", "x", "z")]);
    resolver.resolve(&[reference("missing", "x", "z")]);
    assert_eq!(loads.load(Ordering::SeqCst), 3);
    assert_eq!(resolver.cached_namespaces(), vec!["net".to_string()]);
}
