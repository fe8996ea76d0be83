use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::{ProbeDescriptor, ProbeError};

pub const DESCRIPTOR_EXTENSION: &str = "toml";

/// External source of probe descriptors.
pub trait DescriptorStore: Send + Sync {
    /// `Ok(None)` when no descriptor exists for `namespace`.
    fn load(&self, namespace: &str) -> Result<Option<ProbeDescriptor>, ProbeError>;
}

/// Reads `<root>/<namespace>.toml`, trying each root in order.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    roots: Vec<PathBuf>,
}

impl DirectoryStore {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }

    /// Builds a store from a platform search path (`:`-separated on Unix,
    /// `;` on Windows). Empty entries are dropped.
    pub fn from_search_path(search_path: &str) -> Self {
        let roots = std::env::split_paths(search_path)
            .filter(|p| !p.as_os_str().is_empty())
            .collect();
        Self { roots }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    fn read(path: &Path, namespace: &str) -> Result<Option<ProbeDescriptor>, ProbeError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ProbeError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let mut descriptor: ProbeDescriptor =
            toml::from_str(&text).map_err(|source| ProbeError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        if descriptor.namespace.is_empty() {
            descriptor.namespace = namespace.to_string();
        } else if descriptor.namespace != namespace {
            return Err(ProbeError::NamespaceMismatch {
                path: path.to_path_buf(),
                expected: namespace.to_string(),
                found: descriptor.namespace,
            });
        }
        Ok(Some(descriptor))
    }
}

impl DescriptorStore for DirectoryStore {
    fn load(&self, namespace: &str) -> Result<Option<ProbeDescriptor>, ProbeError> {
        // Namespaces are dotted names; anything that could escape the root is
        // treated as unknown.
        if namespace.is_empty()
            || namespace.contains(['/', '\\'])
            || namespace.starts_with('.')
        {
            return Ok(None);
        }

        let file_name = format!("{namespace}.{DESCRIPTOR_EXTENSION}");
        for root in &self.roots {
            if let Some(descriptor) = Self::read(&root.join(&file_name), namespace)? {
                return Ok(Some(descriptor));
            }
        }
        Ok(None)
    }
}
