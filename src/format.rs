//! User-facing formatting for trials and settings.

use crate::models::{GuildSettings, Trial};
use crate::response::{Field, Response};
use crate::signup::role_partition;

/// Format a trial for display: sorted role sections first, each listing
/// in-capacity names, then one "Overflow" section per role that has any.
pub fn format_trial(trial: &Trial, with_state: bool) -> Response {
    let mut r = Response::default();

    r.title = if with_state {
        format!("__{}__ ({})", trial.name, trial.state)
    } else {
        format!("__{}__", trial.name)
    };
    r.description = trial.description.clone();

    let mut overflow_fields = Vec::new();

    for rc in &trial.role_counts {
        let (active, overflow) = role_partition(&trial.signups, rc);

        r.fields.push(Field {
            name: format!("*{}* ({}/{})", rc.role, active.len(), rc.count),
            value: name_list(&active, &rc.emoji),
        });

        if !overflow.is_empty() {
            overflow_fields.push(Field {
                name: format!("*Overflow {}* ({})", rc.role, overflow.len()),
                value: name_list(&overflow, &rc.emoji),
            });
        }
    }

    r.fields.extend(overflow_fields);
    r
}

fn name_list(names: &[&str], emoji: &str) -> String {
    if names.is_empty() {
        return "(empty)".to_string();
    }
    names
        .iter()
        .map(|n| format!("{}{}", emoji, n))
        .collect::<Vec<_>>()
        .join("\n")
}

/// One line per trial, optionally with its open/closed state.
pub fn format_trial_list(trials: &[Trial], with_state: bool) -> String {
    if trials.is_empty() {
        return "(none yet)".to_string();
    }

    trials
        .iter()
        .map(|t| {
            if with_state {
                format!("{} ({})", t.name, t.state)
            } else {
                t.name.clone()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Pretty-print the full settings record as a code block.
pub fn format_settings(settings: &GuildSettings) -> String {
    format!(
        "```\ncontrolsequence: '{}'\nannouncechannel: '{}'\nadminchannel: '{}'\nadminrole: '{}'\nshowaftersignup: '{}'\nshowafterwithdraw: '{}'\n```",
        settings.control_sequence,
        settings.announce_channel,
        settings.admin_channel,
        settings.admin_role,
        settings.get("showaftersignup").unwrap_or_default(),
        settings.get("showafterwithdraw").unwrap_or_default(),
    )
}
