use std::fs;

use jolt_probes::{DescriptorStore, DirectoryStore, ProbeError, ProbeRef, ProbeResolver};

const NET: &str = r#"
namespace = "net"

[[probe]]
name = "connect"

[[probe.hook]]
class = "java.net.Socket"
method = "connect"
"#;

#[test]
fn first_root_containing_the_namespace_wins() {
    let empty = tempfile::tempdir().unwrap();
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    fs::write(first.path().join("net.toml"), NET).unwrap();
    fs::write(
        second.path().join("net.toml"),
        NET.replace("java.net.Socket", "java.net.Other"),
    )
    .unwrap();

    let search_path = std::env::join_paths([empty.path(), first.path(), second.path()]).unwrap();
    let store = DirectoryStore::from_search_path(search_path.to_str().unwrap());
    assert_eq!(store.roots().len(), 3);

    let descriptor = store.load("net").unwrap().unwrap();
    assert_eq!(descriptor.probes[0].hooks[0].class, "java.net.Socket");
    assert!(store.load("io").unwrap().is_none());
}

#[test]
fn namespace_defaults_to_file_name_and_must_match_when_given() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("fs.toml"),
        "[[probe]]\nname = \"open\"\n",
    )
    .unwrap();
    fs::write(dir.path().join("other.toml"), NET).unwrap();

    let store = DirectoryStore::new(vec![dir.path().to_path_buf()]);
    assert_eq!(store.load("fs").unwrap().unwrap().namespace, "fs");
    assert!(matches!(
        store.load("other"),
        Err(ProbeError::NamespaceMismatch { .. })
    ));
}

#[test]
fn path_like_namespaces_are_unknown() {
    let dir = tempfile::tempdir().unwrap();
    let store = DirectoryStore::new(vec![dir.path().to_path_buf()]);
    assert!(store.load("../net").unwrap().is_none());
    assert!(store.load("").unwrap().is_none());
}

#[test]
fn malformed_descriptor_resolves_to_nothing() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("net.toml"), "[[probe]\nname=").unwrap();
    let store = DirectoryStore::new(vec![dir.path().to_path_buf()]);
    assert!(matches!(store.load("net"), Err(ProbeError::Parse { .. })));

    let resolver = ProbeResolver::new(store);
    let hooks = resolver.resolve(&[ProbeRef {
        namespace: "net".to_string(),
        name: "connect".to_string(),
        target_name: "onConnect".to_string(),
        target_descriptor: "()V".to_string(),
    }]);
    assert!(hooks.is_empty());
}
