//! Discord connection built on serenity, which owns the gateway protocol,
//! heartbeats and reconnects. Serenity's callbacks are funnelled into a
//! channel so the session can pull events one at a time.

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serenity::{
    client::{Client, Context, EventHandler as SerenityEventHandler},
    gateway::ShardManager,
    http::Http,
    model::{channel::Message, gateway::Ready, id::ChannelId},
    prelude::GatewayIntents,
};
use tokio::{
    sync::{mpsc, Mutex},
    task::{JoinError, JoinHandle},
};
use tracing::{error, info, warn};

use crate::{
    events::{ChatEnvelope, ChatEvent, MessageEvent, ReadyEvent, ReadySource},
    session::{GatewayTransport, MessageSink, TransportError},
};

const EVENT_BUFFER: usize = 64;

pub fn default_intents() -> GatewayIntents {
    GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT
}

pub struct SerenityGateway {
    token: SecretString,
    intents: GatewayIntents,
    events: Mutex<Option<mpsc::Receiver<ChatEnvelope>>>,
    connection: Mutex<Option<Connection>>,
}

struct Connection {
    http: Arc<Http>,
    shard_manager: Arc<ShardManager>,
    /// Taken by whichever of `next_envelope` or `disconnect` sees the client stop first.
    client_task: Option<JoinHandle<Result<(), String>>>,
}

impl SerenityGateway {
    pub fn new(token: SecretString) -> Self {
        Self::with_intents(token, default_intents())
    }

    pub fn with_intents(token: SecretString, intents: GatewayIntents) -> Self {
        Self { token, intents, events: Mutex::new(None), connection: Mutex::new(None) }
    }
}

#[async_trait]
impl GatewayTransport for SerenityGateway {
    async fn connect(&self) -> Result<(), TransportError> {
        let (sender, receiver) = mpsc::channel(EVENT_BUFFER);

        let mut client = Client::builder(self.token.expose_secret(), self.intents)
            .event_handler(ForwardingHandler { sender: sender.clone() })
            .await
            .map_err(|error| TransportError::Connect(error.to_string()))?;

        // A REST round trip rejects a bad token before any gateway traffic and
        // tells us who we are before the first message can arrive.
        let current_user = client
            .http
            .get_current_user()
            .await
            .map_err(|error| TransportError::Connect(format!("token rejected: {error}")))?;
        let identity = ChatEnvelope {
            event_id: format!("identity-{}", current_user.id),
            event: ChatEvent::Ready(ReadyEvent {
                bot_user_id: current_user.id.to_string(),
                bot_name: current_user.name.clone(),
                source: ReadySource::CurrentUser,
            }),
        };
        sender
            .send(identity)
            .await
            .map_err(|error| TransportError::Connect(format!("event channel closed: {error}")))?;
        drop(sender);

        let http = Arc::clone(&client.http);
        let shard_manager = Arc::clone(&client.shard_manager);
        let client_task = tokio::spawn(async move {
            client.start().await.map_err(|error| {
                error!(
                    event_name = "system.gateway.client_error",
                    error = %error,
                    "discord client stopped with an error"
                );
                error.to_string()
            })
        });

        *self.events.lock().await = Some(receiver);
        *self.connection.lock().await =
            Some(Connection { http, shard_manager, client_task: Some(client_task) });
        info!(event_name = "system.gateway.started", "discord client started");
        Ok(())
    }

    async fn next_envelope(&self) -> Result<Option<ChatEnvelope>, TransportError> {
        let received = {
            let mut events = self.events.lock().await;
            let receiver = events
                .as_mut()
                .ok_or_else(|| TransportError::Receive("gateway is not connected".to_owned()))?;
            receiver.recv().await
        };

        match received {
            Some(envelope) => Ok(Some(envelope)),
            // the channel only closes once the client task has dropped its handler
            None => {
                let task = self.connection.lock().await.as_mut().and_then(|c| c.client_task.take());
                match task {
                    Some(task) => client_exit(task.await).map(|()| None),
                    None => Ok(None),
                }
            }
        }
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        let Some(connection) = self.connection.lock().await.take() else {
            return Ok(());
        };

        connection.shard_manager.shutdown_all().await;
        if let Some(task) = connection.client_task {
            if let Err(error) = client_exit(task.await) {
                warn!(error = %error, "discord client task did not finish cleanly");
            }
        }
        info!(event_name = "system.gateway.stopped", "discord client stopped");
        Ok(())
    }
}

/// A client that stops on its own is a failed session, not a clean end of stream.
fn client_exit(outcome: Result<Result<(), String>, JoinError>) -> Result<(), TransportError> {
    match outcome {
        Ok(Ok(())) => Ok(()),
        Ok(Err(error)) => {
            Err(TransportError::Receive(format!("discord client stopped: {error}")))
        }
        Err(error) => Err(TransportError::Receive(format!("discord client task failed: {error}"))),
    }
}

#[async_trait]
impl MessageSink for SerenityGateway {
    async fn send_text(&self, channel_id: &str, text: &str) -> Result<(), TransportError> {
        let http = match self.connection.lock().await.as_ref() {
            Some(connection) => Arc::clone(&connection.http),
            None => return Err(TransportError::Send("gateway is not connected".to_owned())),
        };

        let channel_id = channel_id
            .parse::<u64>()
            .ok()
            .filter(|id| *id != 0)
            .map(ChannelId::new)
            .ok_or_else(|| TransportError::Send(format!("invalid channel id `{channel_id}`")))?;

        channel_id
            .say(&http, text)
            .await
            .map(|_| ())
            .map_err(|error| TransportError::Send(error.to_string()))
    }
}

struct ForwardingHandler {
    sender: mpsc::Sender<ChatEnvelope>,
}

impl ForwardingHandler {
    async fn forward(&self, envelope: ChatEnvelope) {
        if self.sender.send(envelope).await.is_err() {
            warn!(
                event_name = "ingress.discord.event_dropped",
                "event received after the session stopped listening"
            );
        }
    }
}

#[async_trait]
impl SerenityEventHandler for ForwardingHandler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        self.forward(ChatEnvelope {
            event_id: format!("ready-{}", ready.session_id),
            event: ChatEvent::Ready(ReadyEvent {
                bot_user_id: ready.user.id.to_string(),
                bot_name: ready.user.name.clone(),
                source: ReadySource::Gateway,
            }),
        })
        .await;
    }

    async fn message(&self, _ctx: Context, message: Message) {
        self.forward(message_envelope(&message)).await;
    }
}

fn message_envelope(message: &Message) -> ChatEnvelope {
    ChatEnvelope {
        event_id: message.id.to_string(),
        event: ChatEvent::MessageCreate(MessageEvent {
            channel_id: message.channel_id.to_string(),
            message_id: message.id.to_string(),
            author_id: message.author.id.to_string(),
            text: message.content.clone(),
        }),
    }
}
