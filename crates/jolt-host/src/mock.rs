use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::{ClassFileTransformer, HostError, Instrumentation, LoadedClass, TransformRequest};

/// A call observed by [`MockInstrumentation`], in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    AllLoadedClasses,
    IsModifiable(String),
    AddTransformer { can_retransform: bool },
    Retransform(Vec<String>),
    AppendBootSearch(PathBuf),
    AppendSystemSearch(PathBuf),
}

struct MockClass {
    class: LoadedClass,
    bytes: Vec<u8>,
    modifiable: bool,
}

struct Registered {
    transformer: Arc<dyn ClassFileTransformer>,
    can_retransform: bool,
}

struct State {
    classes: Vec<MockClass>,
    transformers: Vec<Registered>,
    calls: Vec<HostCall>,
    retransform_supported: bool,
    rejected_archives: BTreeSet<PathBuf>,
}

/// Deterministic, in-memory host that records every call it receives.
///
/// Transformers run synchronously on the calling thread, like a real JVM
/// delivering `retransformClasses` callbacks. The internal lock is never held
/// while a transformer runs.
pub struct MockInstrumentation {
    state: Mutex<State>,
}

impl Default for MockInstrumentation {
    fn default() -> Self {
        Self {
            state: Mutex::new(State {
                classes: Vec::new(),
                transformers: Vec::new(),
                calls: Vec::new(),
                retransform_supported: true,
                rejected_archives: BTreeSet::new(),
            }),
        }
    }
}

impl MockInstrumentation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an already-loaded class without running transformers.
    pub fn add_class(&self, class: LoadedClass, bytes: Vec<u8>) {
        self.state.lock().classes.push(MockClass {
            class,
            bytes,
            modifiable: true,
        });
    }

    pub fn set_modifiable(&self, name: &str, modifiable: bool) {
        let mut state = self.state.lock();
        for entry in state.classes.iter_mut().filter(|c| c.class.name == name) {
            entry.modifiable = modifiable;
        }
    }

    pub fn set_retransform_supported(&self, supported: bool) {
        self.state.lock().retransform_supported = supported;
    }

    /// Makes `append_*_search` fail for `path`.
    pub fn reject_archive(&self, path: impl Into<PathBuf>) {
        self.state.lock().rejected_archives.insert(path.into());
    }

    /// Simulates a fresh class load: every installed transformer sees the
    /// class with no `class_being_redefined`, then the class is registered.
    pub fn load_class(&self, class: LoadedClass, bytes: Vec<u8>) -> Vec<u8> {
        let transformers = self.transformers(false);
        let bytes = run_chain(&transformers, &class.name, None, bytes);
        self.add_class(class, bytes.clone());
        bytes
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.state.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    pub fn transformer_count(&self) -> usize {
        self.state.lock().transformers.len()
    }

    pub fn class_bytes(&self, name: &str) -> Option<Vec<u8>> {
        self.state
            .lock()
            .classes
            .iter()
            .find(|c| c.class.name == name)
            .map(|c| c.bytes.clone())
    }

    fn transformers(&self, retransform_only: bool) -> Vec<Arc<dyn ClassFileTransformer>> {
        self.state
            .lock()
            .transformers
            .iter()
            .filter(|t| !retransform_only || t.can_retransform)
            .map(|t| Arc::clone(&t.transformer))
            .collect()
    }

    fn append_search(&self, archive: &Path, call: HostCall) -> Result<(), HostError> {
        let mut state = self.state.lock();
        state.calls.push(call);
        if state.rejected_archives.contains(archive) {
            return Err(HostError::InvalidArchive {
                path: archive.to_path_buf(),
                reason: "rejected by host".to_string(),
            });
        }
        Ok(())
    }
}

fn run_chain(
    transformers: &[Arc<dyn ClassFileTransformer>],
    class_name: &str,
    redefined: Option<&LoadedClass>,
    mut bytes: Vec<u8>,
) -> Vec<u8> {
    for transformer in transformers {
        let request = TransformRequest {
            class_name,
            class_being_redefined: redefined,
            bytes: &bytes,
        };
        match transformer.transform(&request) {
            Ok(Some(rewritten)) => bytes = rewritten,
            Ok(None) => {}
            Err(err) => {
                tracing::debug!(
                    target: "jolt.host",
                    class = class_name,
                    error = %err,
                    "transformer failed; keeping previous bytes"
                );
            }
        }
    }
    bytes
}

impl Instrumentation for MockInstrumentation {
    fn all_loaded_classes(&self) -> Vec<LoadedClass> {
        let mut state = self.state.lock();
        state.calls.push(HostCall::AllLoadedClasses);
        state.classes.iter().map(|c| c.class.clone()).collect()
    }

    fn is_modifiable(&self, class: &LoadedClass) -> bool {
        let mut state = self.state.lock();
        state.calls.push(HostCall::IsModifiable(class.name.clone()));
        state
            .classes
            .iter()
            .find(|c| c.class.name == class.name)
            .is_some_and(|c| c.modifiable)
    }

    fn add_transformer(&self, transformer: Arc<dyn ClassFileTransformer>, can_retransform: bool) {
        let mut state = self.state.lock();
        state.calls.push(HostCall::AddTransformer { can_retransform });
        state.transformers.push(Registered {
            transformer,
            can_retransform,
        });
    }

    fn retransform(&self, classes: &[LoadedClass]) -> Result<(), HostError> {
        let pending = {
            let mut state = self.state.lock();
            state.calls.push(HostCall::Retransform(
                classes.iter().map(|c| c.name.clone()).collect(),
            ));
            if !state.retransform_supported {
                return Err(HostError::RetransformUnsupported);
            }

            // Like the JVM, validate the whole batch before touching any class.
            let mut pending = Vec::with_capacity(classes.len());
            for class in classes {
                match state.classes.iter().find(|c| c.class.name == class.name) {
                    Some(entry) if entry.modifiable => {
                        pending.push((entry.class.clone(), entry.bytes.clone()))
                    }
                    Some(_) => {
                        return Err(HostError::UnmodifiableClass {
                            class: class.name.clone(),
                        })
                    }
                    None => return Err(HostError::Other(format!("class {class} is not loaded"))),
                }
            }
            pending
        };

        let transformers = self.transformers(true);
        for (class, bytes) in pending {
            let bytes = run_chain(&transformers, &class.name, Some(&class), bytes);
            let mut state = self.state.lock();
            if let Some(entry) = state.classes.iter_mut().find(|c| c.class.name == class.name) {
                entry.bytes = bytes;
            }
        }
        Ok(())
    }

    fn append_boot_search(&self, archive: &Path) -> Result<(), HostError> {
        self.append_search(archive, HostCall::AppendBootSearch(archive.to_path_buf()))
    }

    fn append_system_search(&self, archive: &Path) -> Result<(), HostError> {
        self.append_search(archive, HostCall::AppendSystemSearch(archive.to_path_buf()))
    }
}
