use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use jolt_host::{ClassFileTransformer, LoadedClass, TransformError, TransformRequest};
use serde::Deserialize;

use crate::client::{Client, TraceSession};
use crate::context::AgentContext;
use crate::error::{AgentError, Result};
use crate::logging::AGENT_TARGET;
use crate::options::ARTIFACT_SUFFIX;
use crate::trace::TraceProgram;

/// Suffix appended to an artifact path to locate its settings file.
pub const SETTINGS_SUFFIX: &str = ".jolt";

/// Per-trace settings stored next to a precompiled artifact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TraceSettings {
    /// Arguments made available to the trace's handlers.
    pub args: BTreeMap<String, String>,
    /// Where the trace's own output should go; unset means stdout.
    pub output: Option<PathBuf>,
    pub debug: bool,
}

impl TraceSettings {
    pub fn load(path: &Path) -> Result<Self> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(AgentError::MissingSettings {
                    path: path.to_path_buf(),
                })
            }
            Err(err) => return Err(err.into()),
        };
        toml::from_str(&text).map_err(|source| AgentError::Settings {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// A session whose trace was handed to the agent as a local file.
pub struct FileClient {
    path: PathBuf,
    settings: TraceSettings,
    session: TraceSession,
}

impl FileClient {
    pub fn open(ctx: &AgentContext, path: &Path) -> Result<Self> {
        if !has_artifact_suffix(path) {
            return Err(AgentError::ScriptNotCompiled {
                path: path.to_path_buf(),
            });
        }
        if !path.is_file() {
            return Err(AgentError::ScriptNotFound {
                path: path.to_path_buf(),
            });
        }

        let settings = TraceSettings::load(&settings_path(path))?;
        let bytes = fs::read(path)?;
        let program = TraceProgram::decode(&bytes)?;
        let session = TraceSession::new(ctx, program)?;

        tracing::debug!(
            target: AGENT_TARGET,
            path = %path.display(),
            trace = %session.program().class_name,
            trace_debug = settings.debug,
            "file client created"
        );

        Ok(Self {
            path: path.to_path_buf(),
            settings,
            session,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> &TraceSettings {
        &self.settings
    }

    pub fn session(&self) -> &TraceSession {
        &self.session
    }
}

pub(crate) fn has_artifact_suffix(path: &Path) -> bool {
    path.to_str()
        .is_some_and(|path| path.len() > ARTIFACT_SUFFIX.len() && path.ends_with(ARTIFACT_SUFFIX))
}

/// `Trace.class` -> `Trace.class.jolt`
pub fn settings_path(artifact: &Path) -> PathBuf {
    let mut name = OsString::from(artifact.as_os_str());
    name.push(SETTINGS_SUFFIX);
    PathBuf::from(name)
}

impl ClassFileTransformer for FileClient {
    fn transform(
        &self,
        request: &TransformRequest<'_>,
    ) -> std::result::Result<Option<Vec<u8>>, TransformError> {
        self.session.transform(request)
    }
}

impl Client for FileClient {
    fn wants_transformer(&self) -> bool {
        self.session.wants_transformer()
    }

    fn is_candidate(&self, class: &LoadedClass) -> bool {
        self.session.is_candidate(class)
    }

    fn skip_retransforms(&self) {
        self.session.skip_retransforms();
    }
}
