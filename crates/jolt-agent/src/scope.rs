//! Per-thread "agent code is executing" marker.
//!
//! The host may call back into transformers for any class load, including
//! loads the agent itself triggers while it is starting up or onboarding a
//! client. Agent entry points hold an [`AgentScope`] so those callbacks can
//! tell they are running underneath agent code on the same thread.

use std::cell::Cell;
use std::marker::PhantomData;
use std::rc::Rc;

thread_local! {
    static AGENT_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Marks the current thread as running agent code until dropped.
///
/// Scopes nest. The guard is `!Send` because the marker is thread-local.
#[must_use = "the agent scope ends as soon as the guard is dropped"]
pub struct AgentScope {
    _not_send: PhantomData<Rc<()>>,
}

impl AgentScope {
    pub fn enter() -> Self {
        AGENT_DEPTH.with(|depth| depth.set(depth.get().saturating_add(1)));
        Self {
            _not_send: PhantomData,
        }
    }
}

impl Drop for AgentScope {
    fn drop(&mut self) {
        AGENT_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// True while any [`AgentScope`] is alive on the current thread.
pub fn in_agent_code() -> bool {
    AGENT_DEPTH.with(|depth| depth.get() > 0)
}
