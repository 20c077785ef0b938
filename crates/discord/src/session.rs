use std::{future::Future, sync::Arc};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::events::{ChatEnvelope, EventContext, EventDispatcher, HandlerResult, Reply};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport failed to connect: {0}")]
    Connect(String),
    #[error("transport read failed: {0}")]
    Receive(String),
    #[error("transport send failed: {0}")]
    Send(String),
    #[error("transport disconnect failed: {0}")]
    Disconnect(String),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("could not open chat session: {0}")]
    Open(#[source] TransportError),
    #[error("chat session failed: {0}")]
    Run(#[source] TransportError),
    #[error("could not close chat session: {0}")]
    Close(#[source] TransportError),
}

/// Inbound half of the chat connection.
#[async_trait]
pub trait GatewayTransport: Send + Sync {
    async fn connect(&self) -> Result<(), TransportError>;
    /// `Ok(None)` means the event stream has ended.
    async fn next_envelope(&self) -> Result<Option<ChatEnvelope>, TransportError>;
    async fn disconnect(&self) -> Result<(), TransportError>;
}

/// Outbound half: post plain text to a channel.
#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn send_text(&self, channel_id: &str, text: &str) -> Result<(), TransportError>;
}

/// A configured but not yet connected chat session.
pub struct Session {
    transport: Arc<dyn GatewayTransport>,
    sink: Arc<dyn MessageSink>,
}

impl Session {
    pub fn new(transport: Arc<dyn GatewayTransport>, sink: Arc<dyn MessageSink>) -> Self {
        Self { transport, sink }
    }

    pub async fn open(self) -> Result<OpenSession, SessionError> {
        info!(event_name = "system.session.opening", "opening chat session");
        self.transport.connect().await.map_err(SessionError::Open)?;
        info!(event_name = "system.session.opened", "chat session connected");

        Ok(OpenSession { transport: self.transport, sink: self.sink, closed: false })
    }

    /// Opens the session, serves events until the stream ends or `shutdown`
    /// resolves, then closes it. The session is closed on every exit path
    /// after a successful open.
    pub async fn run_until<F>(
        self,
        dispatcher: &EventDispatcher,
        shutdown: F,
    ) -> Result<(), SessionError>
    where
        F: Future<Output = ()>,
    {
        let mut session = self.open().await?;

        let outcome = tokio::select! {
            outcome = session.run(dispatcher) => outcome,
            () = shutdown => {
                info!(event_name = "system.session.shutdown_requested", "shutdown requested");
                Ok(())
            }
        };

        let closed = session.close().await;
        outcome.and(closed)
    }
}

/// Connected session. Call [`OpenSession::close`] when done; dropping it
/// unclosed schedules a best-effort disconnect.
pub struct OpenSession {
    transport: Arc<dyn GatewayTransport>,
    sink: Arc<dyn MessageSink>,
    closed: bool,
}

impl OpenSession {
    /// Pumps events through `dispatcher` until the transport stream ends.
    ///
    /// Events are handled one at a time. A reply that cannot be sent is logged
    /// and the loop keeps going.
    pub async fn run(&mut self, dispatcher: &EventDispatcher) -> Result<(), SessionError> {
        loop {
            let Some(envelope) = self.transport.next_envelope().await.map_err(SessionError::Run)?
            else {
                info!(event_name = "system.session.stream_closed", "chat event stream closed");
                return Ok(());
            };

            debug!(
                event_name = "ingress.discord.envelope_received",
                correlation_id = %envelope.event_id,
                event_type = ?envelope.event.event_type(),
                "received chat event"
            );

            let context = EventContext { correlation_id: envelope.event_id.clone() };
            if let HandlerResult::Responded(reply) = dispatcher.dispatch(&envelope, &context).await
            {
                self.deliver(&reply, &context).await;
            }
        }
    }

    async fn deliver(&self, reply: &Reply, ctx: &EventContext) {
        match self.sink.send_text(&reply.channel_id, &reply.text).await {
            Ok(()) => debug!(
                event_name = "egress.discord.reply_sent",
                correlation_id = %ctx.correlation_id,
                channel_id = %reply.channel_id,
                "reply sent"
            ),
            Err(error) => warn!(
                event_name = "egress.discord.reply_failed",
                correlation_id = %ctx.correlation_id,
                channel_id = %reply.channel_id,
                error = %error,
                "failed to send reply; continuing"
            ),
        }
    }

    pub async fn close(mut self) -> Result<(), SessionError> {
        self.closed = true;
        self.transport.disconnect().await.map_err(SessionError::Close)?;
        info!(event_name = "system.session.closed", "chat session closed");
        Ok(())
    }
}

impl Drop for OpenSession {
    fn drop(&mut self) {
        if self.closed {
            return;
        }

        warn!(event_name = "system.session.dropped_open", "chat session dropped without close");
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let transport = Arc::clone(&self.transport);
        runtime.spawn(async move {
            if let Err(error) = transport.disconnect().await {
                warn!(error = %error, "best-effort disconnect of dropped session failed");
            }
        });
    }
}
