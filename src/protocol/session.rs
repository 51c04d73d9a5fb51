//! # Session Handler
//!
//! Drives one accepted connection from hello to close.
//!
//! ```text
//! AwaitingHello ──hello──▶ Admitted ──OK──▶ Serving ──BYE / error──▶ Closed
//!       │                     (slot full)
//!       │                        └──────▶ Refused ──REFUSED──▶ Closed
//!       └──bad hello──▶ Closed
//! ```
//!
//! While serving, queries are handled strictly one at a time in arrival order.
//! Each answer is preceded by a simulated processing delay that only suspends
//! this session's task. The admission slot is held by an
//! [`AdmissionPermit`](crate::protocol::admission::AdmissionPermit) and given
//! back before the connection is closed, on every exit path.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info, instrument, warn};

use crate::config::{ServerConfig, MAX_FRAME_SIZE};
use crate::core::codec::FrameCodec;
use crate::core::serialization::{self, SerializationFormat};
use crate::error::{constants, ProtocolError, Result};
use crate::protocol::admission::AdmissionController;
use crate::protocol::catalog::Catalog;
use crate::protocol::message::{ControlMessage, ResultPayload, StatusMessage};
use crate::transport::connection::Connection;
use crate::utils::metrics::{Metrics, Timer};

/// Uniform range the simulated per-query latency is drawn from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryDelay {
    min: Duration,
    max: Duration,
}

impl QueryDelay {
    /// Inverted bounds are swapped rather than rejected
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    /// No simulated latency at all
    pub fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    /// Draw one delay. Bounds beyond `u64::MAX` microseconds saturate.
    pub fn sample(&self) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        let lo = u64::try_from(self.min.as_micros()).unwrap_or(u64::MAX);
        let hi = u64::try_from(self.max.as_micros()).unwrap_or(u64::MAX);
        Duration::from_micros(rand::rng().random_range(lo..=hi))
    }
}

/// Everything a session needs that outlives it
#[derive(Debug)]
pub struct SessionContext {
    pub catalog: Arc<Catalog>,
    pub admission: Arc<AdmissionController>,
    pub metrics: Arc<Metrics>,
    pub query_delay: QueryDelay,
    pub idle_timeout: Option<Duration>,
    pub max_frame_size: usize,
}

impl SessionContext {
    pub fn new(catalog: Catalog, max_clients: usize) -> Self {
        Self {
            catalog: Arc::new(catalog),
            admission: Arc::new(AdmissionController::new(max_clients)),
            metrics: Arc::new(Metrics::new()),
            query_delay: QueryDelay::none(),
            idle_timeout: None,
            max_frame_size: MAX_FRAME_SIZE,
        }
    }

    pub fn from_config(config: &ServerConfig, catalog: Catalog) -> Self {
        Self {
            query_delay: QueryDelay::new(config.query_delay_min, config.query_delay_max),
            idle_timeout: config.idle_timeout,
            max_frame_size: config.max_frame_size,
            ..Self::new(catalog, config.max_clients)
        }
    }

    pub fn with_query_delay(mut self, query_delay: QueryDelay) -> Self {
        self.query_delay = query_delay;
        self
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Option<Duration>) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    AwaitingHello,
    Admitted,
    Serving,
    Refused,
    Closed,
}

/// Per-connection state, owned exclusively by its session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionState {
    pub client_id: Option<i64>,
    pub phase: SessionPhase,
}

impl SessionState {
    fn new() -> Self {
        Self {
            client_id: None,
            phase: SessionPhase::AwaitingHello,
        }
    }
}

/// How a session ended
#[derive(Debug)]
pub enum SessionOutcome {
    /// The first frame was not a usable hello; no admission was attempted
    Rejected { error: ProtocolError },
    /// The server was full
    Refused { client_id: i64 },
    /// The client said goodbye
    Completed { client_id: i64, queries: u64 },
    /// An admitted session ended on an error
    Aborted {
        client_id: i64,
        queries: u64,
        error: ProtocolError,
    },
}

impl SessionOutcome {
    pub fn client_id(&self) -> Option<i64> {
        match self {
            SessionOutcome::Rejected { .. } => None,
            SessionOutcome::Refused { client_id }
            | SessionOutcome::Completed { client_id, .. }
            | SessionOutcome::Aborted { client_id, .. } => Some(*client_id),
        }
    }

    pub fn was_admitted(&self) -> bool {
        matches!(
            self,
            SessionOutcome::Completed { .. } | SessionOutcome::Aborted { .. }
        )
    }
}

struct Session<S> {
    conn: Connection<S>,
    ctx: Arc<SessionContext>,
    state: SessionState,
    queries: u64,
}

/// Run one session to completion over `stream`.
///
/// Never returns an error: every failure is local to this connection and is
/// reported through the returned [`SessionOutcome`].
#[instrument(skip(stream, peer, ctx), fields(peer = %peer))]
pub async fn run_session<S, P>(stream: S, peer: P, ctx: Arc<SessionContext>) -> SessionOutcome
where
    S: AsyncRead + AsyncWrite + Unpin,
    P: fmt::Display,
{
    let conn = Connection::with_codec(stream, FrameCodec::with_max_frame_size(ctx.max_frame_size))
        .with_read_timeout(ctx.idle_timeout);
    let mut session = Session {
        conn,
        ctx,
        state: SessionState::new(),
        queries: 0,
    };

    let client_id = match session.await_hello().await {
        Ok(client_id) => client_id,
        Err(error) => {
            session.record_failure(&error);
            warn!(error = %error, "Dropping connection without a valid hello");
            session.close().await;
            return SessionOutcome::Rejected { error };
        }
    };

    let Some(permit) = session.ctx.admission.admit() else {
        session.transition(SessionPhase::Refused);
        session.ctx.metrics.session_refused();
        if let Err(e) = session.conn.write_json(&StatusMessage::refused()).await {
            debug!(client_id, error = %e, "Could not deliver REFUSED");
        }
        info!(client_id, "Client refused - max clients reached");
        session.close().await;
        return SessionOutcome::Refused { client_id };
    };

    session.transition(SessionPhase::Admitted);
    session.ctx.metrics.session_admitted();
    let result = session.serve(client_id).await;
    drop(permit);

    let queries = session.queries;
    let outcome = match result {
        Ok(()) => SessionOutcome::Completed { client_id, queries },
        Err(error) => {
            session.record_failure(&error);
            warn!(client_id, error = %error, "Session aborted");
            SessionOutcome::Aborted {
                client_id,
                queries,
                error,
            }
        }
    };

    session.close().await;
    info!(client_id, queries, "Client disconnected");
    outcome
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    fn transition(&mut self, next: SessionPhase) {
        debug!(client_id = ?self.state.client_id, from = ?self.state.phase, to = ?next, "Session transition");
        self.state.phase = next;
    }

    async fn await_hello(&mut self) -> Result<i64> {
        let message = match self.conn.read_json::<ControlMessage>().await {
            Ok(message) => message,
            Err(ProtocolError::Decode(reason)) => {
                return Err(ProtocolError::InvalidHello(format!(
                    "{}: {reason}",
                    constants::ERR_EXPECTED_HELLO
                )))
            }
            Err(e) => return Err(e),
        };

        match message {
            ControlMessage::Hello { client_id } => {
                self.state.client_id = Some(client_id);
                Ok(client_id)
            }
            other => Err(ProtocolError::InvalidHello(format!(
                "{}, got {}",
                constants::ERR_EXPECTED_HELLO,
                other.kind()
            ))),
        }
    }

    async fn serve(&mut self, client_id: i64) -> Result<()> {
        self.conn.write_json(&StatusMessage::ok()).await?;
        self.transition(SessionPhase::Serving);
        info!(client_id, "Client connected");

        loop {
            match self.conn.read_json::<ControlMessage>().await? {
                ControlMessage::Bye => {
                    debug!(client_id, "Received BYE");
                    return Ok(());
                }
                ControlMessage::Query { class_name } => {
                    self.answer(client_id, &class_name).await?;
                    self.queries += 1;
                }
                ControlMessage::Hello { .. } => return Err(ProtocolError::UnexpectedMessage),
            }
        }
    }

    async fn answer(&mut self, client_id: i64, class_name: &str) -> Result<()> {
        let _timer = Timer::start("query");

        tokio::time::sleep(self.ctx.query_delay.sample()).await;
        let payload = self.ctx.catalog.resolve_query(class_name, &mut rand::rng());

        let bytes = serialization::encode(&payload, SerializationFormat::Bincode)?;
        let len = bytes.len() as u64;
        self.conn.write_frame(bytes).await?;
        self.ctx.metrics.frame_sent(len);

        match &payload {
            ResultPayload::Single(record) => {
                self.ctx.metrics.query_answered(true);
                info!(client_id, class = %class_name, record = %record, "Sent random record");
            }
            ResultPayload::Collection(records) => {
                self.ctx.metrics.query_answered(false);
                info!(client_id, class = %class_name, count = records.len(), "Sent collection");
            }
        }
        Ok(())
    }

    fn record_failure(&self, error: &ProtocolError) {
        if error.is_protocol_violation() {
            self.ctx.metrics.protocol_error();
        } else {
            self.ctx.metrics.connection_error();
        }
    }

    async fn close(mut self) {
        self.transition(SessionPhase::Closed);
        if let Err(e) = self.conn.close().await {
            debug!(error = %e, "Error while closing connection");
        }
    }
}
