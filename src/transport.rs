//! The transport collaborator contract. The gateway connection, message
//! decoding, and HTTP delivery live in the host process; this crate only
//! consumes normalized inbound events and an outbound send operation.

use async_trait::async_trait;

use crate::error::Result;

/// A normalized inbound chat message.
#[derive(Debug, Clone, Default)]
pub struct InboundMessage {
    /// Tenant id; empty when the message has no guild context.
    pub guild_id: String,
    /// Channel to reply to.
    pub channel_id: String,
    /// Channel display name, matched against configured channel settings.
    pub channel_name: String,
    pub author_id: String,
    /// The author's mention string; doubles as signup identity.
    pub author_mention: String,
    /// Display names of the roles the author holds.
    pub author_roles: Vec<String>,
    pub content: String,
}

impl InboundMessage {
    pub fn has_role(&self, role: &str) -> bool {
        self.author_roles
            .iter()
            .any(|r| r.eq_ignore_ascii_case(role))
    }
}

/// Outbound send operation provided by the host. One call per size-bounded
/// message.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_message(&self, channel: &str, content: &str) -> Result<()>;
}
