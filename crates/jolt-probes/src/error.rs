use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("failed to read probe descriptor {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("malformed probe descriptor {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("probe descriptor {} declares namespace {found}, expected {expected}", path.display())]
    NamespaceMismatch {
        path: PathBuf,
        expected: String,
        found: String,
    },

    #[error("invalid class pattern {pattern}: {source}")]
    Pattern {
        pattern: String,
        source: regex::Error,
    },
}
