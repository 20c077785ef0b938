//! Discord integration - the bot's chat session
//!
//! This crate connects the price lookup core to Discord:
//! - **Events** (`events`) - inbound event model, dispatcher, ready + price command handlers
//! - **Session** (`session`) - transport/sink traits and the open/run/close lifecycle
//! - **Gateway** (`gateway`) - serenity-backed transport and reply sink
//!
//! # Architecture
//!
//! ```text
//! serenity callbacks → mpsc → Session → EventDispatcher → PriceCommandHandler → price API
//!                                 ↓
//!                       MessageSink ← reply text
//! ```
//!
//! # Key Types
//!
//! - `Session` / `OpenSession` - scoped connection lifecycle
//! - `EventDispatcher` - routes events to registered handlers
//! - `BotIdentity` - the bot's own user id, used to ignore its own messages
//! - `SerenityGateway` - production `GatewayTransport` + `MessageSink`

pub mod events;
pub mod gateway;
pub mod session;
