use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use jolt_host::{HostError, Instrumentation};
use parking_lot::Mutex;

use crate::acceptor::{self, AcceptorHandle};
use crate::client::{has_artifact_suffix, Client, FileClient};
use crate::context::{AgentContext, AgentHost};
use crate::coordinator::{onboard, Onboarding};
use crate::error::{AgentError, Result};
use crate::logging::{init_tracing, LoggingConfig, AGENT_TARGET};
use crate::options::{AgentArgs, AgentOptions, USAGE};
use crate::scope::AgentScope;

/// Outcome of an attach request.
#[derive(Debug)]
pub enum Attach {
    Initialized(AgentHandle),
    /// Class search paths could not be extended. The agent counts as attached
    /// but runs neither the startup script nor the acceptor.
    StartupFailed(AgentError),
    AlreadyAttached,
    HelpRequested,
}

/// What a successful attach brought up.
#[derive(Debug)]
pub struct AgentHandle {
    context: Arc<AgentContext>,
    script: Option<Onboarding>,
    acceptor: Option<AcceptorHandle>,
}

impl AgentHandle {
    pub fn context(&self) -> &Arc<AgentContext> {
        &self.context
    }

    /// Onboarding result of the `script=` trace, if one was installed.
    pub fn script(&self) -> Option<&Onboarding> {
        self.script.as_ref()
    }

    pub fn acceptor(&self) -> Option<&AcceptorHandle> {
        self.acceptor.as_ref()
    }
}

/// Makes agent initialization happen at most once.
///
/// Concurrent callers wait for the first one to finish initializing and then
/// observe [`Attach::AlreadyAttached`].
pub struct EntryGuard {
    attached: Mutex<bool>,
}

impl Default for EntryGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl EntryGuard {
    pub const fn new() -> Self {
        Self {
            attached: Mutex::new(false),
        }
    }

    pub fn is_attached(&self) -> bool {
        *self.attached.lock()
    }

    pub fn attach(&self, args: &str, host: AgentHost) -> Attach {
        let mut attached = self.attached.lock();
        if *attached {
            return Attach::AlreadyAttached;
        }
        *attached = true;

        let _scope = AgentScope::enter();
        start(args, host)
    }
}

fn start(args: &str, host: AgentHost) -> Attach {
    let args = AgentArgs::parse(args);
    init_tracing(&LoggingConfig::for_debug(args.flag("debug")));
    let options = AgentOptions::from_args(&args);
    tracing::debug!(target: AGENT_TARGET, ?options, "agent attaching");

    if options.help {
        println!("{USAGE}");
        return Attach::HelpRequested;
    }

    if let Err(err) = splice_class_paths(host.instrumentation.as_ref(), &options) {
        tracing::error!(target: AGENT_TARGET, error = %err, "agent startup aborted");
        return Attach::StartupFailed(err);
    }

    let context = Arc::new(AgentContext::new(options, host));
    let script = context
        .options()
        .script
        .clone()
        .and_then(|path| run_script(&context, &path));

    let acceptor = if context.options().no_server {
        None
    } else {
        let port = context.options().port;
        match acceptor::start(Arc::clone(&context), port) {
            Ok(handle) => Some(handle),
            Err(err) => {
                tracing::error!(target: AGENT_TARGET, port, error = %err, "acceptor not started");
                None
            }
        }
    };

    Attach::Initialized(AgentHandle {
        context,
        script,
        acceptor,
    })
}

/// Appends `bootClassPath` then `systemClassPath` archives to the host's
/// class search paths. Stops at the first failure.
fn splice_class_paths(host: &dyn Instrumentation, options: &AgentOptions) -> Result<()> {
    for path in archives(options.boot_class_path.as_deref()) {
        check_archive(&path)?;
        host.append_boot_search(&path)
            .map_err(|source| AgentError::Classpath { path: path.clone(), source })?;
        tracing::debug!(target: AGENT_TARGET, path = %path.display(), "appended to boot class path");
    }
    for path in archives(options.system_class_path.as_deref()) {
        check_archive(&path)?;
        host.append_system_search(&path)
            .map_err(|source| AgentError::Classpath { path: path.clone(), source })?;
        tracing::debug!(target: AGENT_TARGET, path = %path.display(), "appended to system class path");
    }
    Ok(())
}

fn archives(list: Option<&str>) -> Vec<PathBuf> {
    list.map(|list| {
        env::split_paths(list)
            .filter(|path| !path.as_os_str().is_empty())
            .collect()
    })
    .unwrap_or_default()
}

fn check_archive(path: &Path) -> Result<()> {
    if path.is_file() {
        return Ok(());
    }
    Err(AgentError::Classpath {
        path: path.to_path_buf(),
        source: HostError::InvalidArchive {
            path: path.to_path_buf(),
            reason: "no such file".to_string(),
        },
    })
}

fn run_script(ctx: &AgentContext, path: &Path) -> Option<Onboarding> {
    if !has_artifact_suffix(path) {
        tracing::debug!(
            target: AGENT_TARGET,
            path = %path.display(),
            "script is not a precompiled trace, ignored"
        );
        return None;
    }

    let outcome = FileClient::open(ctx, path).and_then(|client| {
        let client: Arc<dyn Client> = Arc::new(client);
        onboard(ctx.instrumentation(), client)
    });
    match outcome {
        Ok(onboarding) => Some(onboarding),
        Err(err) => {
            tracing::debug!(
                target: AGENT_TARGET,
                path = %path.display(),
                error = %err,
                "failed to install startup script"
            );
            None
        }
    }
}
