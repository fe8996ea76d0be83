use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use jolt_classfile::ClassFile;
use jolt_host::{LoadedClass, TransformError, TransformRequest};
use jolt_probes::{ClassPattern, HookPoint};

use crate::context::AgentContext;
use crate::dump::ClassDumper;
use crate::error::{AgentError, Result};
use crate::logging::AGENT_TARGET;
use crate::rewrite::{ClassRewriter, RewriteRequest};
use crate::scope::in_agent_code;
use crate::trace::TraceProgram;

struct CompiledHook {
    hook: HookPoint,
    pattern: ClassPattern,
}

/// One installed trace: its hook points, their compiled class patterns and
/// the retransformation epoch.
pub struct TraceSession {
    program: TraceProgram,
    hooks: Vec<CompiledHook>,
    rewriter: Arc<dyn ClassRewriter>,
    dumper: ClassDumper,
    skip_retransforms: AtomicBool,
}

impl TraceSession {
    /// Collects the trace's direct hooks followed by its resolved probe
    /// references.
    pub fn new(ctx: &AgentContext, program: TraceProgram) -> Result<Self> {
        let resolved = ctx.probes().resolve(&program.on_probes);
        let hooks = program
            .on_methods
            .iter()
            .cloned()
            .chain(resolved)
            .map(|hook| {
                let pattern =
                    ClassPattern::parse(&hook.class).map_err(|source| AgentError::Pattern {
                        trace: program.class_name.clone(),
                        source,
                    })?;
                Ok(CompiledHook { hook, pattern })
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(
            target: AGENT_TARGET,
            trace = %program.class_name,
            hooks = hooks.len(),
            "trace session created"
        );

        Ok(Self {
            program,
            hooks,
            rewriter: Arc::clone(ctx.rewriter()),
            dumper: ctx.dumper().clone(),
            skip_retransforms: AtomicBool::new(false),
        })
    }

    pub fn program(&self) -> &TraceProgram {
        &self.program
    }

    pub fn hook_points(&self) -> impl Iterator<Item = &HookPoint> {
        self.hooks.iter().map(|compiled| &compiled.hook)
    }

    pub fn wants_transformer(&self) -> bool {
        !self.hooks.is_empty()
    }

    pub fn is_candidate(&self, class: &LoadedClass) -> bool {
        class.name != self.program.class_name
            && self
                .hooks
                .iter()
                .any(|compiled| compiled.pattern.matches(&class.name, class.supertypes()))
    }

    pub fn skip_retransforms(&self) {
        self.skip_retransforms.store(true, Ordering::Release);
    }

    pub fn retransforms_skipped(&self) -> bool {
        self.skip_retransforms.load(Ordering::Acquire)
    }

    pub fn transform(
        &self,
        request: &TransformRequest<'_>,
    ) -> std::result::Result<Option<Vec<u8>>, TransformError> {
        if request.is_retransform() && self.retransforms_skipped() {
            return Ok(None);
        }
        // Loads triggered by the agent itself are never instrumented.
        if !request.is_retransform() && in_agent_code() {
            return Ok(None);
        }
        if request.class_name == self.program.class_name {
            return Ok(None);
        }

        let hooks = self.matching_hooks(request);
        if hooks.is_empty() {
            return Ok(None);
        }

        let rewritten = self.rewriter.rewrite(&RewriteRequest {
            trace: &self.program,
            class_name: request.class_name,
            hooks: &hooks,
            bytes: request.bytes,
        })?;
        if let Some(bytes) = &rewritten {
            tracing::debug!(
                target: AGENT_TARGET,
                trace = %self.program.class_name,
                class = request.class_name,
                hooks = hooks.len(),
                "class instrumented"
            );
            self.dumper
                .maybe_dump(&self.program.class_name, request.class_name, bytes);
        }
        Ok(rewritten)
    }

    fn matching_hooks(&self, request: &TransformRequest<'_>) -> Vec<HookPoint> {
        let parsed;
        let supertypes: Vec<&str> = match request.class_being_redefined {
            Some(class) => class.supertypes().collect(),
            None if self.hooks.iter().any(|c| c.pattern.needs_supertypes()) => {
                parsed = ClassFile::parse(request.bytes).ok();
                parsed
                    .as_ref()
                    .map(|class| class.supertypes().collect())
                    .unwrap_or_default()
            }
            None => Vec::new(),
        };

        self.hooks
            .iter()
            .filter(|compiled| {
                compiled
                    .pattern
                    .matches(request.class_name, supertypes.iter().copied())
            })
            .map(|compiled| compiled.hook.clone())
            .collect()
    }
}
