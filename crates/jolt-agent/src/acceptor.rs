//! Accepts trace clients over TCP and onboards them one at a time.
//!
//! There is no cancellation: a client whose onboarding hangs blocks the loop,
//! and the acceptor thread runs until the process exits.

use std::any::Any;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

use crate::client::{Frame, RemoteClient};
use crate::context::AgentContext;
use crate::coordinator::onboard;
use crate::error::{AgentError, Result};
use crate::logging::AGENT_TARGET;
use crate::scope::AgentScope;

pub const ACCEPTOR_THREAD_NAME: &str = "jolt-acceptor";

/// A running acceptor. Dropping the handle detaches the thread.
#[derive(Debug)]
pub struct AcceptorHandle {
    local_addr: SocketAddr,
    thread: thread::JoinHandle<()>,
}

impl AcceptorHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn thread(&self) -> &thread::Thread {
        self.thread.thread()
    }
}

/// Binds `0.0.0.0:<port>` on the calling thread and serves clients on a
/// background thread.
pub fn start(ctx: Arc<AgentContext>, port: u16) -> Result<AcceptorHandle> {
    let listener = TcpListener::bind(("0.0.0.0", port))
        .map_err(|source| AgentError::Listener { port, source })?;
    let local_addr = listener.local_addr()?;
    tracing::debug!(target: AGENT_TARGET, %local_addr, "accepting trace clients");

    let thread = thread::Builder::new()
        .name(ACCEPTOR_THREAD_NAME.to_string())
        .spawn(move || serve(&ctx, listener))?;
    Ok(AcceptorHandle { local_addr, thread })
}

fn serve(ctx: &AgentContext, listener: TcpListener) {
    for stream in listener.incoming() {
        let _scope = AgentScope::enter();
        match stream {
            Ok(stream) => handle_client(ctx, stream),
            Err(err) => {
                tracing::debug!(target: AGENT_TARGET, error = %err, "failed to accept client");
            }
        }
    }
}

/// Onboards one peer. A panic while building or onboarding the client is
/// contained here so the loop keeps serving.
fn handle_client(ctx: &AgentContext, stream: TcpStream) {
    let peer = stream.peer_addr().ok();
    let reply = stream.try_clone().ok();
    let result = panic::catch_unwind(AssertUnwindSafe(|| onboard_client(ctx, stream, peer)));
    if let Err(payload) = result {
        let message = panic_message(payload.as_ref());
        tracing::debug!(
            target: AGENT_TARGET,
            peer = ?peer,
            panic = %message,
            "panic while onboarding client"
        );
        if let Some(mut reply) = reply {
            let _ = Frame::Error(format!("agent panicked: {message}")).write_to(&mut reply);
        }
    }
}

fn onboard_client(ctx: &AgentContext, stream: TcpStream, peer: Option<SocketAddr>) {
    let client = match RemoteClient::accept(ctx, stream) {
        Ok(client) => Arc::new(client),
        Err(err) => {
            tracing::debug!(target: AGENT_TARGET, peer = ?peer, error = %err, "rejected client");
            return;
        }
    };

    let outcome = onboard(ctx.instrumentation(), client.clone());
    if let Err(err) = &outcome {
        tracing::debug!(target: AGENT_TARGET, peer = ?peer, error = %err, "failed to onboard client");
    }
    if let Err(err) = client.acknowledge(&outcome) {
        tracing::debug!(
            target: AGENT_TARGET,
            peer = ?peer,
            error = %err,
            "failed to acknowledge client"
        );
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        return (*message).to_string();
    }
    payload
        .downcast_ref::<String>()
        .cloned()
        .unwrap_or_else(|| "non-string panic payload".to_string())
}
