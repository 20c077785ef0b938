use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
};

use async_trait::async_trait;
use pricebot_core::{
    command::extract_command_with_prefix,
    lookup::{render_reply, PriceApi, PriceLookupService},
};
use tracing::{debug, info};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatEnvelope {
    pub event_id: String,
    pub event: ChatEvent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChatEvent {
    Ready(ReadyEvent),
    MessageCreate(MessageEvent),
    Unsupported { event_type: String },
}

impl ChatEvent {
    pub fn event_type(&self) -> ChatEventType {
        match self {
            Self::Ready(_) => ChatEventType::Ready,
            Self::MessageCreate(_) => ChatEventType::MessageCreate,
            Self::Unsupported { .. } => ChatEventType::Unsupported,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChatEventType {
    Ready,
    MessageCreate,
    Unsupported,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReadyEvent {
    pub bot_user_id: String,
    pub bot_name: String,
    pub source: ReadySource,
}

/// Where the bot learned its identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadySource {
    /// Token check over REST, before the gateway connects.
    CurrentUser,
    /// The gateway's own ready event, repeated on every reconnect.
    Gateway,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageEvent {
    pub channel_id: String,
    pub message_id: String,
    pub author_id: String,
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reply {
    pub channel_id: String,
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerResult {
    Responded(Reply),
    Processed,
    Ignored,
}

/// The bot's own user id, learned from the ready event.
///
/// Shared between the ready handler, which writes it, and the command handler,
/// which uses it to drop the bot's own messages.
#[derive(Clone, Debug, Default)]
pub struct BotIdentity {
    user_id: Arc<RwLock<Option<String>>>,
}

impl BotIdentity {
    pub fn set(&self, user_id: impl Into<String>) {
        *self.user_id.write().unwrap_or_else(PoisonError::into_inner) = Some(user_id.into());
    }

    pub fn user_id(&self) -> Option<String> {
        self.user_id.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn is_self(&self, author_id: &str) -> bool {
        self.user_id.read().unwrap_or_else(PoisonError::into_inner).as_deref() == Some(author_id)
    }
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn event_type(&self) -> ChatEventType;
    async fn handle(&self, envelope: &ChatEnvelope, ctx: &EventContext) -> HandlerResult;
}

#[derive(Default)]
pub struct EventDispatcher {
    handlers: HashMap<ChatEventType, Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.handlers.insert(handler.event_type(), Arc::new(handler));
    }

    pub async fn dispatch(&self, envelope: &ChatEnvelope, ctx: &EventContext) -> HandlerResult {
        let Some(handler) = self.handlers.get(&envelope.event.event_type()) else {
            return HandlerResult::Ignored;
        };

        handler.handle(envelope, ctx).await
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

/// Registers the ready and price-command handlers sharing one [`BotIdentity`].
pub fn price_bot_dispatcher<A>(
    service: PriceLookupService<A>,
    identity: BotIdentity,
    command_prefix: char,
) -> EventDispatcher
where
    A: PriceApi + 'static,
{
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(ReadyHandler::new(identity.clone()));
    dispatcher.register(PriceCommandHandler::new(service, identity, command_prefix));
    dispatcher
}

pub struct ReadyHandler {
    identity: BotIdentity,
}

impl ReadyHandler {
    pub fn new(identity: BotIdentity) -> Self {
        Self { identity }
    }
}

#[async_trait]
impl EventHandler for ReadyHandler {
    fn event_type(&self) -> ChatEventType {
        ChatEventType::Ready
    }

    async fn handle(&self, envelope: &ChatEnvelope, ctx: &EventContext) -> HandlerResult {
        let ChatEvent::Ready(event) = &envelope.event else {
            return HandlerResult::Ignored;
        };

        self.identity.set(event.bot_user_id.clone());
        match event.source {
            ReadySource::CurrentUser => debug!(
                event_name = "ingress.discord.identity_resolved",
                correlation_id = %ctx.correlation_id,
                bot_user_id = %event.bot_user_id,
                "bot identity resolved"
            ),
            ReadySource::Gateway => info!(
                event_name = "ingress.discord.ready",
                correlation_id = %ctx.correlation_id,
                bot_user_id = %event.bot_user_id,
                "{} is connected!",
                event.bot_name
            ),
        }
        HandlerResult::Processed
    }
}

pub struct PriceCommandHandler<A> {
    service: PriceLookupService<A>,
    identity: BotIdentity,
    command_prefix: char,
}

impl<A> PriceCommandHandler<A>
where
    A: PriceApi,
{
    pub fn new(
        service: PriceLookupService<A>,
        identity: BotIdentity,
        command_prefix: char,
    ) -> Self {
        Self { service, identity, command_prefix }
    }
}

#[async_trait]
impl<A> EventHandler for PriceCommandHandler<A>
where
    A: PriceApi + 'static,
{
    fn event_type(&self) -> ChatEventType {
        ChatEventType::MessageCreate
    }

    async fn handle(&self, envelope: &ChatEnvelope, ctx: &EventContext) -> HandlerResult {
        let ChatEvent::MessageCreate(message) = &envelope.event else {
            return HandlerResult::Ignored;
        };

        let sender_is_self = self.identity.is_self(&message.author_id);
        let Some(item_name) =
            extract_command_with_prefix(&message.text, sender_is_self, self.command_prefix)
        else {
            debug!(
                event_name = "ingress.discord.message_ignored",
                correlation_id = %ctx.correlation_id,
                sender_is_self,
                "message is not a price command"
            );
            return HandlerResult::Ignored;
        };

        info!(
            event_name = "ingress.discord.price_command",
            correlation_id = %ctx.correlation_id,
            channel_id = %message.channel_id,
            author_id = %message.author_id,
            item_name,
            "price command received"
        );

        let result = self.service.lookup(item_name).await;
        HandlerResult::Responded(Reply {
            channel_id: message.channel_id.clone(),
            text: render_reply(&result),
        })
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use pricebot_core::{
        lookup::{PriceApi, PriceLookupService, QueryBody},
        UpstreamError,
    };

    use super::{
        price_bot_dispatcher, BotIdentity, ChatEnvelope, ChatEvent, EventContext,
        EventDispatcher, HandlerResult, MessageEvent, ReadyEvent, ReadySource, Reply,
    };

    struct StaticApi(Result<&'static str, UpstreamError>);

    #[async_trait]
    impl PriceApi for StaticApi {
        async fn post_query(&self, _body: &QueryBody) -> Result<String, UpstreamError> {
            self.0.clone().map(str::to_owned)
        }
    }

    const PRAPOR_BITCOIN: &str = r#"{"data":{"items":[{"traderPrices":[{"trader":{"name":"Prapor"},"price":5000,"currency":"RUB"}]}]}}"#;

    fn message(author_id: &str, text: &str) -> ChatEnvelope {
        ChatEnvelope {
            event_id: "msg-1".to_owned(),
            event: ChatEvent::MessageCreate(MessageEvent {
                channel_id: "C1".to_owned(),
                message_id: "msg-1".to_owned(),
                author_id: author_id.to_owned(),
                text: text.to_owned(),
            }),
        }
    }

    fn ready(bot_user_id: &str, source: ReadySource) -> ChatEnvelope {
        ChatEnvelope {
            event_id: "ready-1".to_owned(),
            event: ChatEvent::Ready(ReadyEvent {
                bot_user_id: bot_user_id.to_owned(),
                bot_name: "pricebot".to_owned(),
                source,
            }),
        }
    }

    fn dispatcher(api: StaticApi, identity: BotIdentity) -> EventDispatcher {
        price_bot_dispatcher(PriceLookupService::new(api), identity, '!')
    }

    #[tokio::test]
    async fn price_command_replies_in_originating_channel() {
        let dispatcher = dispatcher(StaticApi(Ok(PRAPOR_BITCOIN)), BotIdentity::default());

        let envelope = message("U1", "!bitcoin");
        let result = dispatcher.dispatch(&envelope, &EventContext::default()).await;

        assert_eq!(
            result,
            HandlerResult::Responded(Reply {
                channel_id: "C1".to_owned(),
                text: "Price of bitcoin:\nTrader: Prapor, Price: 5000 RUB".to_owned(),
            })
        );
    }

    #[tokio::test]
    async fn failed_lookup_replies_with_generic_message() {
        let dispatcher = dispatcher(
            StaticApi(Err(UpstreamError::Request("dns failure".to_owned()))),
            BotIdentity::default(),
        );

        let result = dispatcher.dispatch(&message("U1", "!ledx"), &EventContext::default()).await;

        let HandlerResult::Responded(reply) = result else {
            panic!("expected a reply");
        };
        assert_eq!(reply.text, "Error retrieving item price.");
    }

    #[tokio::test]
    async fn non_command_messages_are_ignored() {
        let dispatcher = dispatcher(StaticApi(Ok(PRAPOR_BITCOIN)), BotIdentity::default());

        for text in ["hello", "!", ""] {
            let result = dispatcher.dispatch(&message("U1", text), &EventContext::default()).await;
            assert_eq!(result, HandlerResult::Ignored, "`{text}` should be ignored");
        }
    }

    #[tokio::test]
    async fn ready_event_teaches_identity_and_suppresses_own_messages() {
        let identity = BotIdentity::default();
        let dispatcher = dispatcher(StaticApi(Ok(PRAPOR_BITCOIN)), identity.clone());

        let envelope = ready("B0T", ReadySource::Gateway);
        let ready_result = dispatcher.dispatch(&envelope, &EventContext::default()).await;
        assert_eq!(ready_result, HandlerResult::Processed);
        assert_eq!(identity.user_id().as_deref(), Some("B0T"));

        let own = dispatcher.dispatch(&message("B0T", "!bitcoin"), &EventContext::default()).await;
        assert_eq!(own, HandlerResult::Ignored);

        let other = dispatcher.dispatch(&message("U2", "!bitcoin"), &EventContext::default()).await;
        assert!(matches!(other, HandlerResult::Responded(_)));
    }

    #[tokio::test]
    async fn dispatcher_returns_ignored_when_no_handler_registered() {
        let dispatcher = EventDispatcher::new();
        let envelope = ChatEnvelope {
            event_id: "evt-unsupported".to_owned(),
            event: ChatEvent::Unsupported { event_type: "TYPING_START".to_owned() },
        };

        let result = dispatcher.dispatch(&envelope, &EventContext::default()).await;

        assert_eq!(result, HandlerResult::Ignored);
    }

    #[tokio::test]
    async fn identity_from_either_source_is_learned_and_updated() {
        let identity = BotIdentity::default();
        let dispatcher = dispatcher(StaticApi(Ok(PRAPOR_BITCOIN)), identity.clone());

        let early = ready("B0T", ReadySource::CurrentUser);
        assert_eq!(
            dispatcher.dispatch(&early, &EventContext::default()).await,
            HandlerResult::Processed
        );
        assert_eq!(identity.user_id().as_deref(), Some("B0T"));

        let later = ready("B0T-2", ReadySource::Gateway);
        dispatcher.dispatch(&later, &EventContext::default()).await;
        assert_eq!(identity.user_id().as_deref(), Some("B0T-2"));
    }

    #[test]
    fn price_bot_dispatcher_registers_both_callbacks() {
        let dispatcher = dispatcher(StaticApi(Ok(PRAPOR_BITCOIN)), BotIdentity::default());
        assert_eq!(dispatcher.handler_count(), 2);
    }

    #[test]
    fn unknown_identity_never_matches() {
        let identity = BotIdentity::default();
        assert!(!identity.is_self("U1"));
        identity.set("U1");
        assert!(identity.is_self("U1"));
        assert!(!identity.is_self("U2"));
    }
}
