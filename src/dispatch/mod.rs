//! Layered command dispatch.
//!
//! An inbound command is attempted against four privilege tiers in order:
//! debug, config, admin, user. A tier that produces a response, a deliberate
//! silence, or a real failure ends the chain; the sentinel outcomes
//! (`Unauthorized`, `UnknownCommand`, `NotACommand`) fall through to the next
//! tier. Exhausting every tier on sentinels yields overall silence, so
//! unrecognized and unauthorized callers learn nothing about which commands
//! exist.

mod admin;
mod auth;
mod config;
mod parser;
mod user;

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{Result, SignupError};
use crate::models::GuildSettings;
use crate::response::Response;
use crate::storage::Store;
use crate::transport::InboundMessage;

/// Debug commands are recognized by this fixed prefix regardless of the
/// guild's configured indicator, so they keep working even when the guild's
/// settings are misconfigured.
pub const DEBUG_PREFIX: &str = "!trials-debug";

/// The outcome of attempting one tier (and of the chain as a whole).
#[derive(Debug)]
pub enum Outcome {
    Respond(Response),
    /// Sentinel: the caller may not use this tier. Falls through.
    Unauthorized,
    /// Sentinel: the tier does not know this verb. Falls through.
    UnknownCommand,
    /// Sentinel: the text does not parse as a command here. Falls through.
    NotACommand,
    /// Handled, intentionally silent. Ends the chain.
    NoResponse,
    /// A real failure. Ends the chain.
    Fail(SignupError),
}

fn flatten(result: Result<Outcome>) -> Outcome {
    result.unwrap_or_else(Outcome::Fail)
}

pub struct DispatcherOptions {
    pub default_indicator: String,
    pub version: String,
    pub website: String,
}

impl Default for DispatcherOptions {
    fn default() -> Self {
        DispatcherOptions {
            default_indicator: "!".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            website: String::new(),
        }
    }
}

/// Routes inbound commands through the tier chain. Constructed once at
/// startup and shared; safe to use concurrently.
pub struct Dispatcher {
    store: Arc<Store>,
    default_indicator: String,
    version: String,
    website: String,
}

impl Dispatcher {
    pub fn new(store: Arc<Store>, opts: DispatcherOptions) -> Self {
        Dispatcher {
            store,
            default_indicator: opts.default_indicator,
            version: opts.version,
            website: opts.website,
        }
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// Resolve the command indicator for a guild, once per inbound message.
    /// Falls back to the process default with no guild context, on a failed
    /// settings lookup, or when no override is set.
    pub fn indicator_for(&self, guild_id: &str) -> String {
        if guild_id.is_empty() {
            return self.default_indicator.clone();
        }

        match self.guild_settings(guild_id) {
            Ok(settings) if !settings.control_sequence.is_empty() => settings.control_sequence,
            Ok(_) => self.default_indicator.clone(),
            Err(err) => {
                warn!(guild_id, error = %err, "could not resolve guild indicator");
                self.default_indicator.clone()
            }
        }
    }

    /// Read a guild's settings in a throwaway read-only transaction.
    pub(crate) fn guild_settings(&self, guild_id: &str) -> Result<GuildSettings> {
        let tx = self.store.guilds().transaction(false)?;
        Ok(tx.add_guild(guild_id)?.settings)
    }

    /// Settings lookup for the privileged tiers: a failure is logged and
    /// treated as default settings rather than aborting the chain.
    pub(crate) fn settings_or_default(&self, guild_id: &str) -> GuildSettings {
        match self.guild_settings(guild_id) {
            Ok(settings) => settings,
            Err(err) => {
                warn!(guild_id, error = %err, "could not retrieve guild settings");
                GuildSettings::default()
            }
        }
    }

    /// Run the tier chain for one inbound message.
    pub fn dispatch(&self, msg: &InboundMessage) -> Outcome {
        let content = msg.content.trim();
        if content.is_empty() {
            return Outcome::NotACommand;
        }

        let indicator = self.indicator_for(&msg.guild_id);
        if !content.starts_with(&indicator) && !content.starts_with(DEBUG_PREFIX) {
            debug!(guild_id = %msg.guild_id, "not a command");
            return Outcome::NotACommand;
        }

        let tiers: [(&str, fn(&Dispatcher, &InboundMessage, &str, &str) -> Outcome); 4] = [
            ("debug", config::handle_debug),
            ("config", config::handle),
            ("admin", admin::handle),
            ("user", user::handle),
        ];

        let mut last = Outcome::NotACommand;
        for (name, tier) in tiers {
            let outcome = tier(self, msg, content, &indicator);
            match outcome {
                Outcome::Unauthorized | Outcome::UnknownCommand | Outcome::NotACommand => {
                    debug!(tier = name, outcome = ?outcome, "falling through");
                    last = outcome;
                }
                other => return other,
            }
        }

        last
    }

    pub(crate) fn version(&self) -> &str {
        &self.version
    }

    pub(crate) fn website(&self) -> &str {
        &self.website
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TrialState;

    fn dispatcher() -> Dispatcher {
        let store = Arc::new(Store::temporary().unwrap());
        Dispatcher::new(store, DispatcherOptions::default())
    }

    fn msg(d_content: &str) -> InboundMessage {
        InboundMessage {
            guild_id: "g1".to_string(),
            channel_id: "c1".to_string(),
            channel_name: "general".to_string(),
            author_id: "u1".to_string(),
            author_mention: "@u1".to_string(),
            content: d_content.to_string(),
            ..Default::default()
        }
    }

    fn set_admin_channel(d: &Dispatcher, guild_id: &str, channel: &str, role: &str) {
        let mut tx = d.store().guilds().transaction(true).unwrap();
        let mut record = tx.add_guild(guild_id).unwrap();
        record.settings.admin_channel = channel.to_string();
        record.settings.admin_role = role.to_string();
        tx.save_guild(&record).unwrap();
        tx.commit().unwrap();
    }

    #[test]
    fn test_non_command_is_silent() {
        let d = dispatcher();
        assert!(matches!(
            d.dispatch(&msg("hello there")),
            Outcome::NotACommand
        ));
        assert!(matches!(d.dispatch(&msg("")), Outcome::NotACommand));
    }

    #[test]
    fn test_unknown_verb_exhausts_to_sentinel() {
        let d = dispatcher();
        assert!(matches!(
            d.dispatch(&msg("!frobnicate")),
            Outcome::UnknownCommand
        ));
    }

    #[test]
    fn test_admin_verb_falls_through_when_unauthorized() {
        let d = dispatcher();
        set_admin_channel(&d, "g1", "officers", "officer");

        // From a normal channel the config/admin tiers return Unauthorized,
        // and the user tier does not know the verb: net silence.
        assert!(matches!(
            d.dispatch(&msg("!admin add Raid1")),
            Outcome::Unauthorized | Outcome::UnknownCommand
        ));

        // No trial was created.
        let tx = d.store().trials("g1").transaction(false).unwrap();
        assert!(tx.trials().unwrap().is_empty());
    }

    #[test]
    fn test_admin_add_and_user_fallthrough() {
        let d = dispatcher();

        // Admin channel unset: anyone may configure.
        let outcome = d.dispatch(&msg("!admin add Raid1"));
        assert!(matches!(outcome, Outcome::Respond(_)));

        // A user verb passes the config and admin tiers untouched.
        let outcome = d.dispatch(&msg("!list"));
        match outcome {
            Outcome::Respond(r) => assert!(r.description.contains("Raid1")),
            other => panic!("expected response, got {:?}", other),
        }
    }

    #[test]
    fn test_no_response_short_circuits() {
        let d = dispatcher();

        let mut tx = d.store().trials("g1").transaction(true).unwrap();
        let mut trial = tx.add_trial("Raid1").unwrap();
        trial.signup_channel = "signups".to_string();
        trial.set_role_count("tank", 2, "");
        tx.save_trial(&trial).unwrap();
        tx.commit().unwrap();

        // Withdraw from the wrong channel: handled, intentionally silent.
        assert!(matches!(
            d.dispatch(&msg("!wd Raid1")),
            Outcome::NoResponse
        ));
    }

    #[test]
    fn test_indicator_override() {
        let d = dispatcher();

        let mut tx = d.store().guilds().transaction(true).unwrap();
        let mut record = tx.add_guild("g1").unwrap();
        record.settings.control_sequence = "?!".to_string();
        tx.save_guild(&record).unwrap();
        tx.commit().unwrap();

        assert_eq!(d.indicator_for("g1"), "?!");
        assert_eq!(d.indicator_for(""), "!");
        assert_eq!(d.indicator_for("other"), "!");

        assert!(matches!(
            d.dispatch(&msg("?!admin add Raid1")),
            Outcome::Respond(_)
        ));
        // The default indicator no longer matches for this guild.
        assert!(matches!(
            d.dispatch(&msg("!admin add Other")),
            Outcome::NotACommand
        ));
    }

    #[test]
    fn test_debug_prefix_ignores_indicator() {
        let d = dispatcher();

        let mut tx = d.store().guilds().transaction(true).unwrap();
        let mut record = tx.add_guild("g1").unwrap();
        record.settings.control_sequence = "?!".to_string();
        tx.save_guild(&record).unwrap();
        tx.commit().unwrap();

        let outcome = d.dispatch(&msg("!trials-debug version"));
        match outcome {
            Outcome::Respond(r) => assert!(r.description.contains(d.version())),
            other => panic!("expected response, got {:?}", other),
        }
    }

    #[test]
    fn test_debug_verb_must_match_exactly() {
        let d = dispatcher();

        // Shares the debug prefix but is a different verb: no tier may
        // claim it, and in particular it must not leak the settings block.
        assert!(matches!(
            d.dispatch(&msg("!trials-debugged list")),
            Outcome::UnknownCommand
        ));
    }

    #[test]
    fn test_failure_stops_the_chain() {
        let d = dispatcher();
        let outcome = d.dispatch(&msg("!admin delete"));
        // Missing argument is a validation failure, not a fallthrough;
        // admin delete additionally requires an admin channel, so with none
        // set this is unauthorized instead.
        assert!(matches!(
            outcome,
            Outcome::Unauthorized | Outcome::UnknownCommand
        ));

        let outcome = d.dispatch(&msg("!su MissingTrial tank"));
        match outcome {
            Outcome::Fail(SignupError::TrialNotExist { name }) => assert_eq!(name, "MissingTrial"),
            other => panic!("expected trial-not-exist, got {:?}", other),
        }
    }

    #[test]
    fn test_closed_trial_rejects_signup() {
        let d = dispatcher();

        let mut tx = d.store().trials("g1").transaction(true).unwrap();
        let mut trial = tx.add_trial("Raid1").unwrap();
        trial.set_role_count("tank", 2, "");
        trial.state = TrialState::Closed;
        tx.save_trial(&trial).unwrap();
        tx.commit().unwrap();

        assert!(matches!(
            d.dispatch(&msg("!su Raid1 tank")),
            Outcome::Fail(SignupError::Validation { .. })
        ));
    }
}
