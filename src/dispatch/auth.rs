//! Channel and role authorization checks.

use crate::models::GuildSettings;
use crate::transport::InboundMessage;

/// Whether the caller may use config and admin commands.
///
/// An unset admin channel means anyone may configure; that is a deliberate
/// bootstrap choice so a fresh guild can set itself up. Otherwise the caller
/// must be in the admin channel and hold the admin role.
pub fn is_admin_authorized(msg: &InboundMessage, settings: &GuildSettings) -> bool {
    if settings.admin_channel.is_empty() {
        return true;
    }
    is_admin_channel(msg, &settings.admin_channel) && holds_role(msg, &settings.admin_role)
}

/// Whether the message was sent in the configured admin channel. False when
/// no admin channel is configured: channel-restricted operations stay
/// disabled until one is set.
pub fn is_admin_channel(msg: &InboundMessage, admin_channel: &str) -> bool {
    !admin_channel.is_empty() && msg.channel_name.eq_ignore_ascii_case(admin_channel)
}

/// Whether the message may drive signup and withdraw for a trial: either it
/// is in the trial's signup channel (unset means anywhere), or the caller is
/// admin-authorized in the admin channel.
pub fn is_signup_channel(
    msg: &InboundMessage,
    signup_channel: &str,
    settings: &GuildSettings,
) -> bool {
    if signup_channel.is_empty() || msg.channel_name.eq_ignore_ascii_case(signup_channel) {
        return true;
    }
    is_admin_channel(msg, &settings.admin_channel) && holds_role(msg, &settings.admin_role)
}

fn holds_role(msg: &InboundMessage, role: &str) -> bool {
    role.is_empty() || msg.has_role(role)
}
