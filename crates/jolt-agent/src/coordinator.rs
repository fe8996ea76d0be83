//! Install-then-retransform onboarding of a new client.
//!
//! The order matters: the transformer is registered before the host is asked
//! to retransform, so a class loaded while the candidate list is being built
//! is still seen (as a fresh load) by the new transformer.

use std::sync::Arc;

use jolt_host::{ClassFileTransformer, Instrumentation, LoadedClass};

use crate::client::Client;
use crate::error::Result;
use crate::logging::AGENT_TARGET;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Onboarding {
    /// The client has no hook points; nothing was installed.
    NotNeeded,
    /// The client is in the host's transformer chain and `candidates` were
    /// retransformed.
    Installed { candidates: Vec<LoadedClass> },
}

/// Brings `client` live: future class loads go through it, and classes
/// already loaded that it cares about are retransformed once.
pub fn onboard(host: &dyn Instrumentation, client: Arc<dyn Client>) -> Result<Onboarding> {
    if !client.wants_transformer() {
        tracing::debug!(target: AGENT_TARGET, "client has no hook points, not installing");
        return Ok(Onboarding::NotNeeded);
    }

    let candidates: Vec<LoadedClass> = host
        .all_loaded_classes()
        .into_iter()
        .filter(|class| host.is_modifiable(class) && client.is_candidate(class))
        .collect();
    tracing::debug!(
        target: AGENT_TARGET,
        candidates = candidates.len(),
        "retransformation candidates collected"
    );

    let transformer: Arc<dyn ClassFileTransformer> = client.clone();
    host.add_transformer(transformer, true);

    if !candidates.is_empty() {
        host.retransform(&candidates)?;
        client.skip_retransforms();
    }

    tracing::debug!(
        target: AGENT_TARGET,
        retransformed = candidates.len(),
        "client onboarded"
    );
    Ok(Onboarding::Installed { candidates })
}
