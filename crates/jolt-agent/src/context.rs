use std::fmt;
use std::sync::Arc;

use jolt_host::Instrumentation;
use jolt_probes::{DirectoryStore, ProbeResolver};

use crate::dump::ClassDumper;
use crate::options::AgentOptions;
use crate::rewrite::ClassRewriter;

/// Handles supplied by whoever binds the agent to a host runtime.
#[derive(Clone)]
pub struct AgentHost {
    pub instrumentation: Arc<dyn Instrumentation>,
    pub rewriter: Arc<dyn ClassRewriter>,
}

impl AgentHost {
    pub fn new(
        instrumentation: Arc<dyn Instrumentation>,
        rewriter: Arc<dyn ClassRewriter>,
    ) -> Self {
        Self {
            instrumentation,
            rewriter,
        }
    }
}

/// Agent-wide state, built once during attach and shared read-only with
/// every client.
pub struct AgentContext {
    options: AgentOptions,
    host: AgentHost,
    probes: ProbeResolver,
    dumper: ClassDumper,
}

impl AgentContext {
    pub fn new(options: AgentOptions, host: AgentHost) -> Self {
        let probes = ProbeResolver::new(DirectoryStore::from_search_path(&options.probe_desc_path));
        let dumper = ClassDumper::from_options(&options);
        Self::with_parts(options, host, probes, dumper)
    }

    pub fn with_parts(
        options: AgentOptions,
        host: AgentHost,
        probes: ProbeResolver,
        dumper: ClassDumper,
    ) -> Self {
        Self {
            options,
            host,
            probes,
            dumper,
        }
    }

    pub fn options(&self) -> &AgentOptions {
        &self.options
    }

    pub fn instrumentation(&self) -> &dyn Instrumentation {
        self.host.instrumentation.as_ref()
    }

    pub fn rewriter(&self) -> &Arc<dyn ClassRewriter> {
        &self.host.rewriter
    }

    pub fn probes(&self) -> &ProbeResolver {
        &self.probes
    }

    pub fn dumper(&self) -> &ClassDumper {
        &self.dumper
    }
}

impl fmt::Debug for AgentContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentContext")
            .field("options", &self.options)
            .field("dumper", &self.dumper)
            .finish_non_exhaustive()
    }
}
