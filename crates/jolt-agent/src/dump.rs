use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use jolt_classfile::to_binary_name;

use crate::logging::AGENT_TARGET;
use crate::options::AgentOptions;

/// Best-effort writer for instrumented class bytes.
///
/// Layout: `<root>/<owner trace, dotted>/<target package dirs>/<Simple>.class`.
#[derive(Debug, Clone, Default)]
pub struct ClassDumper {
    root: Option<PathBuf>,
}

impl ClassDumper {
    pub fn disabled() -> Self {
        Self { root: None }
    }

    pub fn to_dir(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    pub fn from_options(options: &AgentOptions) -> Self {
        if options.dump_classes {
            Self::to_dir(&options.dump_dir)
        } else {
            Self::disabled()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.root.is_some()
    }

    /// Where `target` (internal name) instrumented by `owner` would be written.
    ///
    /// Empty, `.` and `..` segments are dropped so the result stays under the
    /// dump root. `None` when dumping is disabled or nothing is left to name
    /// the file.
    pub fn dump_path(&self, owner: &str, target: &str) -> Option<PathBuf> {
        let root = self.root.as_ref()?;
        let owner = to_binary_name(owner);
        if !is_plain_segment(&owner) {
            return None;
        }
        let segments: Vec<&str> = target.split('/').filter(|s| is_plain_segment(s)).collect();
        let (simple, packages) = segments.split_last()?;

        let mut path = root.join(owner);
        path.extend(packages);
        path.push(format!("{simple}.class"));
        Some(path)
    }

    /// Writes `bytes` when dumping is enabled. Failures are logged and
    /// otherwise ignored.
    pub fn maybe_dump(&self, owner: &str, target: &str, bytes: &[u8]) {
        let Some(path) = self.dump_path(owner, target) else {
            return;
        };
        match write_class(&path, bytes) {
            Ok(()) => tracing::debug!(
                target: AGENT_TARGET,
                path = %path.display(),
                "dumped instrumented class"
            ),
            Err(err) => tracing::debug!(
                target: AGENT_TARGET,
                path = %path.display(),
                error = %err,
                "failed to dump instrumented class"
            ),
        }
    }
}

fn is_plain_segment(segment: &str) -> bool {
    !matches!(segment, "" | "." | "..")
}

fn write_class(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, bytes)
}
