//! Per-guild trial signup management.
//!
//! This crate is the core of a chat-community signup bot: an embedded
//! transactional store giving every guild an isolated settings record and
//! trial namespace, pure signup domain logic (capacity and overflow), a
//! four-tier command dispatch chain (debug, config, admin, user), and a
//! rate-limited delivery pipeline. The chat transport itself is a
//! collaborator: a host process feeds [`transport::InboundMessage`] values
//! into a [`handler::MessageHandler`] and provides a [`transport::Messenger`]
//! for replies.

pub mod delivery;
pub mod dispatch;
pub mod error;
pub mod format;
pub mod handler;
pub mod models;
pub mod response;
pub mod signup;
pub mod storage;
pub mod transport;

pub use error::{Result, SignupError};
pub use handler::{HandlerOptions, MessageHandler};
pub use storage::Store;
pub use transport::{InboundMessage, Messenger};
