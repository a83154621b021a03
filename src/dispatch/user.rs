//! User tier: the commands any caller may use.

use tracing::{debug, info};

use super::{auth, flatten, parser, Dispatcher, Outcome};
use crate::error::{Result, SignupError};
use crate::format::{format_trial, format_trial_list};
use crate::models::TrialState;
use crate::response::Response;
use crate::signup;
use crate::transport::InboundMessage;

pub(super) fn handle(
    d: &Dispatcher,
    msg: &InboundMessage,
    content: &str,
    indicator: &str,
) -> Outcome {
    let Some(line) = parser::parse(content, indicator) else {
        return Outcome::NotACommand;
    };

    flatten(match line.verb.as_str() {
        "list" => list(d, msg),
        "show" => show(d, msg, &line.args),
        "signup" | "su" => sign_up(d, msg, &line.args),
        "withdraw" | "wd" => withdraw(d, msg, &line.args),
        _ => return Outcome::UnknownCommand,
    })
}

fn list(d: &Dispatcher, msg: &InboundMessage) -> Result<Outcome> {
    info!(command = "list", "handling user command");

    let tx = d.store().trials(&msg.guild_id).transaction(false)?;
    let open: Vec<_> = tx
        .trials()?
        .into_iter()
        .filter(|t| t.state == TrialState::Open)
        .collect();

    let mut r = Response::to_user(&msg.author_mention);
    r.title = "*Available Events*".to_string();
    r.description = format_trial_list(&open, false);
    Ok(Outcome::Respond(r))
}

fn show(d: &Dispatcher, msg: &InboundMessage, args: &[String]) -> Result<Outcome> {
    let name = match args {
        [name] => name,
        [] => return Err(SignupError::validation("missing event name")),
        _ => return Err(SignupError::validation("too many arguments")),
    };

    info!(command = "show", trial_name = %name, "handling user command");

    let settings = d.guild_settings(&msg.guild_id)?;
    let tx = d.store().trials(&msg.guild_id).transaction(false)?;
    let trial = tx.get_trial(name)?;

    if !auth::is_signup_channel(msg, &trial.signup_channel, &settings) {
        debug!(signup_channel = %trial.signup_channel, "show not in signup channel");
        return Ok(Outcome::NoResponse);
    }

    let mut r = format_trial(&trial, false);
    r.to = msg.author_mention.clone();
    Ok(Outcome::Respond(r))
}

fn sign_up(d: &Dispatcher, msg: &InboundMessage, args: &[String]) -> Result<Outcome> {
    let (name, role) = match args {
        [name, role] => (name, role),
        [] => return Err(SignupError::validation("missing event name")),
        [_] => return Err(SignupError::validation("missing role name")),
        _ => return Err(SignupError::validation("too many arguments")),
    };

    info!(command = "signup", trial_name = %name, role = %role, "handling user command");

    let settings = d.guild_settings(&msg.guild_id)?;
    let mut tx = d.store().trials(&msg.guild_id).transaction(true)?;
    let mut trial = tx.get_trial(name)?;

    if !auth::is_signup_channel(msg, &trial.signup_channel, &settings) {
        debug!(signup_channel = %trial.signup_channel, "signup not in signup channel");
        return Ok(Outcome::NoResponse);
    }

    if trial.state != TrialState::Open {
        return Err(SignupError::validation("cannot sign up for a closed event"));
    }

    let overflow = signup::signup(&mut trial, &msg.author_mention, role)?;

    tx.save_trial(&trial)?;
    tx.commit()?;

    info!(trial_name = %name, role = %role, overflow, "signed up");

    let description = if overflow {
        format!(
            "Signed up as {} for {} (overflow: all known spots are taken)",
            role, trial.name
        )
    } else {
        format!("Signed up as {} for {}", role, trial.name)
    };

    if settings.show_after_signup == Some(true) {
        let mut r = format_trial(&trial, true);
        r.to = msg.author_mention.clone();
        r.description = format!("{}\n\n{}", description, r.description);
        return Ok(Outcome::Respond(r));
    }

    let mut r = Response::to_user(&msg.author_mention);
    r.description = description;
    Ok(Outcome::Respond(r))
}

fn withdraw(d: &Dispatcher, msg: &InboundMessage, args: &[String]) -> Result<Outcome> {
    let name = match args {
        [name] => name,
        [] => return Err(SignupError::validation("missing event name")),
        _ => return Err(SignupError::validation("too many arguments")),
    };

    info!(command = "withdraw", trial_name = %name, "handling user command");

    let settings = d.guild_settings(&msg.guild_id)?;
    let mut tx = d.store().trials(&msg.guild_id).transaction(true)?;
    let mut trial = tx.get_trial(name)?;

    if !auth::is_signup_channel(msg, &trial.signup_channel, &settings) {
        debug!(signup_channel = %trial.signup_channel, "withdraw not in signup channel");
        return Ok(Outcome::NoResponse);
    }

    if trial.state != TrialState::Open {
        return Err(SignupError::validation(
            "cannot withdraw from a closed event",
        ));
    }

    signup::withdraw(&mut trial, &msg.author_mention);

    tx.save_trial(&trial)?;
    tx.commit()?;

    info!(trial_name = %name, "withdrew");
    let description = format!("Withdrew from {}", trial.name);

    if settings.show_after_withdraw == Some(true) {
        let mut r = format_trial(&trial, true);
        r.to = msg.author_mention.clone();
        r.description = format!("{}\n\n{}", description, r.description);
        return Ok(Outcome::Respond(r));
    }

    let mut r = Response::to_user(&msg.author_mention);
    r.description = description;
    Ok(Outcome::Respond(r))
}
