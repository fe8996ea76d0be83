use jolt_host::TransformError;
use jolt_probes::HookPoint;

use crate::trace::TraceProgram;

/// Everything a rewriter needs to instrument one class.
#[derive(Debug, Clone, Copy)]
pub struct RewriteRequest<'a> {
    pub trace: &'a TraceProgram,
    /// Internal name of the class being (re)defined.
    pub class_name: &'a str,
    /// Hook points whose class pattern matched `class_name`. Never empty.
    pub hooks: &'a [HookPoint],
    pub bytes: &'a [u8],
}

/// The bytecode rewriting algorithm.
///
/// Implementations weave calls to the trace's handler methods into the
/// target class. `Ok(None)` means nothing was changed.
pub trait ClassRewriter: Send + Sync {
    fn rewrite(&self, request: &RewriteRequest<'_>) -> Result<Option<Vec<u8>>, TransformError>;
}

/// Rewriter that never changes anything; useful to dry-run hook matching.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassThroughRewriter;

impl ClassRewriter for PassThroughRewriter {
    fn rewrite(&self, _request: &RewriteRequest<'_>) -> Result<Option<Vec<u8>>, TransformError> {
        Ok(None)
    }
}
