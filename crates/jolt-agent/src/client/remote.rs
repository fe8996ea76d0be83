use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};

use jolt_host::{ClassFileTransformer, LoadedClass, TransformError, TransformRequest};
use parking_lot::Mutex;

use crate::client::{Client, TraceSession};
use crate::context::AgentContext;
use crate::error::{AgentError, Result};
use crate::logging::AGENT_TARGET;
use crate::trace::TraceProgram;

/// Upper bound on a single frame payload.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

const KIND_INSTRUMENT: u8 = 1;
const KIND_OKAY: u8 = 2;
const KIND_ERROR: u8 = 3;

/// Handshake frames: `[kind: u8][len: u32 BE][payload]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Peer -> agent: a precompiled trace artifact.
    Instrument(Vec<u8>),
    /// Agent -> peer: the trace is installed.
    Okay,
    /// Agent -> peer: onboarding failed, with a UTF-8 reason.
    Error(String),
}

impl Frame {
    pub fn read_from(reader: &mut impl Read) -> Result<Self> {
        let mut header = [0u8; 5];
        reader.read_exact(&mut header)?;
        let kind = header[0];
        let len = u32::from_be_bytes([header[1], header[2], header[3], header[4]]) as usize;
        if len > MAX_FRAME_LEN {
            return Err(AgentError::Protocol(format!(
                "frame length {len} exceeds maximum allowed ({MAX_FRAME_LEN} bytes)"
            )));
        }

        let mut payload = Vec::new();
        payload.try_reserve_exact(len).map_err(|_| {
            AgentError::Protocol(format!("unable to allocate frame buffer ({len} bytes)"))
        })?;
        payload.resize(len, 0);
        reader.read_exact(&mut payload)?;

        match kind {
            KIND_INSTRUMENT => Ok(Frame::Instrument(payload)),
            KIND_OKAY => Ok(Frame::Okay),
            KIND_ERROR => String::from_utf8(payload)
                .map(Frame::Error)
                .map_err(|_| AgentError::Protocol("error frame is not valid UTF-8".to_string())),
            other => Err(AgentError::Protocol(format!("unknown frame kind {other}"))),
        }
    }

    pub fn write_to(&self, writer: &mut impl Write) -> Result<()> {
        let (kind, payload): (u8, &[u8]) = match self {
            Frame::Instrument(bytes) => (KIND_INSTRUMENT, bytes.as_slice()),
            Frame::Okay => (KIND_OKAY, &[][..]),
            Frame::Error(message) => (KIND_ERROR, message.as_bytes()),
        };
        let len = u32::try_from(payload.len())
            .ok()
            .filter(|len| *len as usize <= MAX_FRAME_LEN)
            .ok_or_else(|| {
                AgentError::Protocol(format!("frame payload too large ({} bytes)", payload.len()))
            })?;

        let mut buf = Vec::with_capacity(5 + payload.len());
        buf.push(kind);
        buf.extend_from_slice(&len.to_be_bytes());
        buf.extend_from_slice(payload);
        writer.write_all(&buf)?;
        writer.flush()?;
        Ok(())
    }
}

/// A session requested by a peer over TCP.
///
/// The connection stays open for as long as the session lives.
pub struct RemoteClient {
    peer: Option<SocketAddr>,
    stream: Mutex<TcpStream>,
    session: TraceSession,
}

impl RemoteClient {
    /// Reads the peer's instrument request and builds the session.
    ///
    /// When the request cannot be turned into a session, the peer is sent an
    /// error frame (best effort) before the error is returned.
    pub fn accept(ctx: &AgentContext, mut stream: TcpStream) -> Result<Self> {
        let peer = stream.peer_addr().ok();
        match Self::read_session(ctx, &mut stream) {
            Ok(session) => {
                tracing::debug!(
                    target: AGENT_TARGET,
                    peer = ?peer,
                    trace = %session.program().class_name,
                    "remote client created"
                );
                Ok(Self {
                    peer,
                    stream: Mutex::new(stream),
                    session,
                })
            }
            Err(err) => {
                let _ = Frame::Error(err.to_string()).write_to(&mut stream);
                Err(err)
            }
        }
    }

    fn read_session(ctx: &AgentContext, stream: &mut TcpStream) -> Result<TraceSession> {
        let artifact = match Frame::read_from(stream)? {
            Frame::Instrument(artifact) => artifact,
            other => {
                return Err(AgentError::Protocol(format!(
                    "expected an instrument request, got {other:?}"
                )))
            }
        };
        let program = TraceProgram::decode(&artifact)?;
        TraceSession::new(ctx, program)
    }

    /// Tells the peer how onboarding went.
    pub fn acknowledge<T>(&self, outcome: &Result<T>) -> Result<()> {
        let frame = match outcome {
            Ok(_) => Frame::Okay,
            Err(err) => Frame::Error(err.to_string()),
        };
        let mut stream = self.stream.lock();
        frame.write_to(&mut *stream)
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    pub fn session(&self) -> &TraceSession {
        &self.session
    }
}

impl ClassFileTransformer for RemoteClient {
    fn transform(
        &self,
        request: &TransformRequest<'_>,
    ) -> std::result::Result<Option<Vec<u8>>, TransformError> {
        self.session.transform(request)
    }
}

impl Client for RemoteClient {
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
