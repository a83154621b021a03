//! Admin tier: event lifecycle management, including the destructive
//! operations.

use tracing::{debug, info};

use super::{auth, flatten, parser, Dispatcher, Outcome};
use crate::error::{Result, SignupError};
use crate::format::{format_trial, format_trial_list};
use crate::models::{GuildSettings, Trial, TrialState};
use crate::response::Response;
use crate::signup::parse_roles;
use crate::transport::InboundMessage;

const VERB: &str = "admin";

pub(super) fn handle(
    d: &Dispatcher,
    msg: &InboundMessage,
    content: &str,
    indicator: &str,
) -> Outcome {
    let settings = d.settings_or_default(&msg.guild_id);
    if !auth::is_admin_authorized(msg, &settings) {
        debug!(author_id = %msg.author_id, "non-admin trying to admin");
        return Outcome::Unauthorized;
    }

    let Some(line) = parser::parse(content, indicator) else {
        return Outcome::NotACommand;
    };
    if line.verb != VERB {
        return Outcome::UnknownCommand;
    }

    let Some((action, rest)) = line.args.split_first() else {
        return Outcome::Respond(help(msg));
    };

    info!(command = %action, args = ?rest, "handling admin command");

    flatten(match action.as_str() {
        "list" => list(d, msg),
        "show" => show(d, msg, rest),
        "add" => add(d, msg, rest),
        "set" => set(d, msg, rest),
        "roles" => roles(d, msg, rest),
        "open" => set_state(d, msg, rest, TrialState::Open),
        "close" => set_state(d, msg, rest, TrialState::Closed),
        "delete" => delete(d, msg, rest, &settings),
        _ => return Outcome::UnknownCommand,
    })
}

fn help(msg: &InboundMessage) -> Response {
    let mut r = Response::to_user(&msg.author_mention);
    r.description = "Available actions: list, show <event>, add <event> [<setting>=<value> ...], set <event> <setting>=<value> ..., roles <event> <role>:<count>[:<emoji>],..., open <event>, close <event>, delete <event>".to_string();
    r
}

fn one_name(args: &[String]) -> Result<&str> {
    match args {
        [name] => Ok(name),
        [] => Err(SignupError::validation("need event name")),
        _ => Err(SignupError::validation("too many arguments")),
    }
}

/// Apply `key=value` trial settings. `roles=` takes the compact roles
/// grammar and replaces the whole role list.
fn apply_trial_settings(trial: &mut Trial, pairs: &[(String, String)]) -> Result<()> {
    for (key, value) in pairs {
        match key.as_str() {
            "description" => trial.description = value.clone(),
            "signupchannel" => trial.signup_channel = value.clone(),
            "announcechannel" => trial.announce_channel = value.clone(),
            "roles" => {
                let specs = parse_roles(value)?;
                trial.clear_role_counts();
                for spec in specs {
                    trial.set_role_count(&spec.role, spec.count, &spec.emoji);
                }
            }
            _ => {
                return Err(SignupError::validation(format!(
                    "'{}' is not an event setting",
                    key
                )))
            }
        }
    }
    Ok(())
}

fn list(d: &Dispatcher, msg: &InboundMessage) -> Result<Outcome> {
    let tx = d.store().trials(&msg.guild_id).transaction(false)?;
    let trials = tx.trials()?;

    let mut r = Response::to_user(&msg.author_mention);
    r.title = "*All Events*".to_string();
    r.description = format_trial_list(&trials, true);
    Ok(Outcome::Respond(r))
}

fn show(d: &Dispatcher, msg: &InboundMessage, args: &[String]) -> Result<Outcome> {
    let name = one_name(args)?;

    let tx = d.store().trials(&msg.guild_id).transaction(false)?;
    let trial = tx.get_trial(name)?;

    let mut r = format_trial(&trial, true);
    r.to = msg.author_mention.clone();
    Ok(Outcome::Respond(r))
}

fn add(d: &Dispatcher, msg: &InboundMessage, args: &[String]) -> Result<Outcome> {
    let Some((name, rest)) = args.split_first() else {
        return Err(SignupError::validation("need event name"));
    };
    let rest: Vec<&str> = rest.iter().map(String::as_str).collect();
    let pairs = crate::signup::parse_settings_args(&rest)?;

    let mut tx = d.store().trials(&msg.guild_id).transaction(true)?;
    let mut trial = tx.add_trial(name)?;
    apply_trial_settings(&mut trial, &pairs)?;
    tx.save_trial(&trial)?;
    tx.commit()?;

    info!(trial_name = %name, "event created");
    let mut r = Response::to_user(&msg.author_mention);
    r.description = format!("Created event \"{}\"", name);
    Ok(Outcome::Respond(r))
}

fn set(d: &Dispatcher, msg: &InboundMessage, args: &[String]) -> Result<Outcome> {
    let Some((name, rest)) = args.split_first() else {
        return Err(SignupError::validation("need event name"));
    };
    let rest: Vec<&str> = rest.iter().map(String::as_str).collect();
    let pairs = crate::signup::parse_settings_args(&rest)?;
    if pairs.is_empty() {
        return Err(SignupError::validation("no settings to save"));
    }

    let mut tx = d.store().trials(&msg.guild_id).transaction(true)?;
    let mut trial = tx.get_trial(name)?;
    apply_trial_settings(&mut trial, &pairs)?;
    tx.save_trial(&trial)?;
    tx.commit()?;

    let mut r = Response::to_user(&msg.author_mention);
    r.description = format!("Updated event \"{}\"", name);
    Ok(Outcome::Respond(r))
}

fn roles(d: &Dispatcher, msg: &InboundMessage, args: &[String]) -> Result<Outcome> {
    let Some((name, rest)) = args.split_first() else {
        return Err(SignupError::validation("need event name"));
    };
    let specs = parse_roles(&rest.join(" "))?;
    if specs.is_empty() {
        return Err(SignupError::validation("no roles specified"));
    }

    let mut tx = d.store().trials(&msg.guild_id).transaction(true)?;
    let mut trial = tx.get_trial(name)?;
    trial.clear_role_counts();
    for spec in specs {
        trial.set_role_count(&spec.role, spec.count, &spec.emoji);
    }
    tx.save_trial(&trial)?;
    tx.commit()?;

    let mut r = format_trial(&trial, true);
    r.to = msg.author_mention.clone();
    Ok(Outcome::Respond(r))
}

fn set_state(
    d: &Dispatcher,
    msg: &InboundMessage,
    args: &[String],
    state: TrialState,
) -> Result<Outcome> {
    let name = one_name(args)?;

    let mut tx = d.store().trials(&msg.guild_id).transaction(true)?;
    let mut trial = tx.get_trial(name)?;
    trial.state = state;
    tx.save_trial(&trial)?;
    tx.commit()?;

    let mut r = Response::to_user(&msg.author_mention);
    r.description = match state {
        TrialState::Open => format!("Opened event \"{}\"", name),
        TrialState::Closed => format!("Closed event \"{}\"", name),
    };
    Ok(Outcome::Respond(r))
}

/// Destructive, so gated harder than the rest of the tier: requires a
/// configured admin channel and the message to be in it.
fn delete(
    d: &Dispatcher,
    msg: &InboundMessage,
    args: &[String],
    settings: &GuildSettings,
) -> Result<Outcome> {
    if !auth::is_admin_channel(msg, &settings.admin_channel) {
        info!(admin_channel = %settings.admin_channel, "delete not in admin channel");
        return Ok(Outcome::Unauthorized);
    }

    let name = one_name(args)?;

    let mut tx = d.store().trials(&msg.guild_id).transaction(true)?;
    tx.delete_trial(name)?;
    tx.commit()?;

    info!(trial_name = %name, "event deleted");
    let mut r = Response::to_user(&msg.author_mention);
    r.description = format!("Deleted event \"{}\"", name);
    Ok(Outcome::Respond(r))
}
