//! Config tier: guild settings management, plus the fixed-prefix debug tier
//! which exposes the same actions even when a guild's indicator is broken.

use tracing::{debug, info};

use super::{auth, flatten, parser, Dispatcher, Outcome, DEBUG_PREFIX};
use crate::error::{Result, SignupError};
use crate::format::format_settings;
use crate::models::{GuildSettings, TrialState};
use crate::response::Response;
use crate::signup::parse_settings_args;
use crate::transport::InboundMessage;

const VERB: &str = "config-trials";

pub(super) fn handle(
    d: &Dispatcher,
    msg: &InboundMessage,
    content: &str,
    indicator: &str,
) -> Outcome {
    let settings = d.settings_or_default(&msg.guild_id);
    if !auth::is_admin_authorized(msg, &settings) {
        debug!(author_id = %msg.author_id, "non-admin trying to config");
        return Outcome::Unauthorized;
    }

    let Some(line) = parser::parse(content, indicator) else {
        return Outcome::NotACommand;
    };
    if line.verb != VERB {
        return Outcome::UnknownCommand;
    }

    dispatch_action(d, msg, &line.args)
}

/// The debug tier: same actions, hard-coded prefix, same authorization.
pub(super) fn handle_debug(
    d: &Dispatcher,
    msg: &InboundMessage,
    content: &str,
    _indicator: &str,
) -> Outcome {
    if !content.starts_with(DEBUG_PREFIX) {
        return Outcome::NotACommand;
    }

    let settings = d.settings_or_default(&msg.guild_id);
    if !auth::is_admin_authorized(msg, &settings) {
        debug!(author_id = %msg.author_id, "non-admin trying to debug");
        return Outcome::Unauthorized;
    }

    let Some(line) = parser::parse(content, "!") else {
        return Outcome::NotACommand;
    };
    // The prefix check above is loose; only the exact verb is the debug
    // command. "!trials-debugged" must fall through, not act.
    if line.verb != DEBUG_PREFIX[1..] {
        return Outcome::UnknownCommand;
    }

    dispatch_action(d, msg, &line.args)
}

fn dispatch_action(d: &Dispatcher, msg: &InboundMessage, args: &[String]) -> Outcome {
    let Some((action, rest)) = args.split_first() else {
        return Outcome::Respond(help(msg));
    };

    info!(command = %action, "handling config command");

    flatten(match action.as_str() {
        "list" => list(d, msg),
        "get" => get(d, msg, rest),
        "set" => set(d, msg, rest),
        "reset" => reset(d, msg),
        "version" => version(d, msg),
        "website" => website(d, msg),
        "stats" => stats(d, msg),
        _ => return Outcome::UnknownCommand,
    })
}

fn help(msg: &InboundMessage) -> Response {
    let mut r = Response::to_user(&msg.author_mention);
    r.description =
        "Available actions: list, get <setting>, set <setting>=<value> ..., reset, version, website, stats".to_string();
    r
}

fn list(d: &Dispatcher, msg: &InboundMessage) -> Result<Outcome> {
    let tx = d.store().guilds().transaction(false)?;
    let record = tx.add_guild(&msg.guild_id)?;

    let mut r = Response::to_user(&msg.author_mention);
    r.description = format_settings(&record.settings);
    Ok(Outcome::Respond(r))
}

fn get(d: &Dispatcher, msg: &InboundMessage, args: &[String]) -> Result<Outcome> {
    let name = match args {
        [name] => name,
        [] => return Err(SignupError::validation("missing setting name")),
        _ => return Err(SignupError::validation("too many arguments")),
    };

    let tx = d.store().guilds().transaction(false)?;
    let record = tx.add_guild(&msg.guild_id)?;
    let value = record.settings.get(name)?;

    let mut r = Response::to_user(&msg.author_mention);
    r.description = format!("```\n{}: '{}'\n```", name.to_lowercase(), value);
    Ok(Outcome::Respond(r))
}

fn set(d: &Dispatcher, msg: &InboundMessage, args: &[String]) -> Result<Outcome> {
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    let pairs = parse_settings_args(&args)?;
    if pairs.is_empty() {
        return Err(SignupError::validation("no settings to save"));
    }

    let mut tx = d.store().guilds().transaction(true)?;
    let mut record = tx.add_guild(&msg.guild_id)?;
    for (key, value) in &pairs {
        record.settings.set(key, value)?;
    }
    tx.save_guild(&record)?;
    tx.commit()?;

    info!(guild_id = %msg.guild_id, count = pairs.len(), "saved guild settings");

    let mut r = Response::to_user(&msg.author_mention);
    r.description = format_settings(&record.settings);
    Ok(Outcome::Respond(r))
}

fn reset(d: &Dispatcher, msg: &InboundMessage) -> Result<Outcome> {
    let mut tx = d.store().guilds().transaction(true)?;
    let mut record = tx.add_guild(&msg.guild_id)?;
    record.settings = GuildSettings::default();
    tx.save_guild(&record)?;
    tx.commit()?;

    let mut r = Response::to_user(&msg.author_mention);
    r.description = format_settings(&record.settings);
    Ok(Outcome::Respond(r))
}

fn version(d: &Dispatcher, msg: &InboundMessage) -> Result<Outcome> {
    let mut r = Response::to_user(&msg.author_mention);
    r.description = d.version().to_string();
    Ok(Outcome::Respond(r))
}

fn website(d: &Dispatcher, msg: &InboundMessage) -> Result<Outcome> {
    let mut r = Response::to_user(&msg.author_mention);
    r.description = d.website().to_string();
    Ok(Outcome::Respond(r))
}

/// Cross-guild aggregate: total guilds, events, open and closed counts.
fn stats(d: &Dispatcher, msg: &InboundMessage) -> Result<Outcome> {
    let guilds = {
        let tx = d.store().guilds().transaction(false)?;
        tx.all_guilds()?
    };

    let mut total = 0usize;
    let mut open = 0usize;
    let mut closed = 0usize;

    for guild_id in &guilds {
        let tx = d.store().trials(guild_id).transaction(false)?;
        for trial in tx.trials()? {
            total += 1;
            match trial.state {
                TrialState::Open => open += 1,
                TrialState::Closed => closed += 1,
            }
        }
    }

    let mut r = Response::to_user(&msg.author_mention);
    r.description = format!(
        "Total guilds: {}\nTotal events: {}\nCurrently open: {}\nCurrently closed: {}",
        guilds.len(),
        total,
        open,
        closed
    );
    Ok(Outcome::Respond(r))
}
