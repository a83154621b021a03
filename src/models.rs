// src/models.rs
use serde::{Deserialize, Serialize};

use crate::error::{Result, SignupError};

/// Per-guild configuration record. One per guild, keyed by the raw guild id.
///
/// All fields default so that records written by older versions of the bot
/// keep decoding after new settings are added.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuildSettings {
    /// Command indicator override; empty means "use the process default".
    pub control_sequence: String,
    pub announce_channel: String,
    pub admin_channel: String,
    pub admin_role: String,
    /// Tri-state: unset, on, off.
    pub show_after_signup: Option<bool>,
    pub show_after_withdraw: Option<bool>,
}

/// The fixed set of setting names accepted by `get`/`set`.
pub const KNOWN_SETTINGS: &[&str] = &[
    "controlsequence",
    "announcechannel",
    "adminchannel",
    "adminrole",
    "showaftersignup",
    "showafterwithdraw",
];

impl GuildSettings {
    /// Read a setting by name. Unknown names are an error, not an empty value.
    pub fn get(&self, name: &str) -> Result<String> {
        match name.to_lowercase().as_str() {
            "controlsequence" => Ok(self.control_sequence.clone()),
            "announcechannel" => Ok(self.announce_channel.clone()),
            "adminchannel" => Ok(self.admin_channel.clone()),
            "adminrole" => Ok(self.admin_role.clone()),
            "showaftersignup" => Ok(flag_string(self.show_after_signup)),
            "showafterwithdraw" => Ok(flag_string(self.show_after_withdraw)),
            _ => Err(SignupError::UnknownSetting {
                name: name.to_string(),
            }),
        }
    }

    pub fn set(&mut self, name: &str, value: &str) -> Result<()> {
        match name.to_lowercase().as_str() {
            "controlsequence" => self.control_sequence = value.to_string(),
            "announcechannel" => self.announce_channel = value.to_string(),
            "adminchannel" => self.admin_channel = value.to_string(),
            "adminrole" => self.admin_role = value.to_string(),
            "showaftersignup" => self.show_after_signup = parse_flag(value)?,
            "showafterwithdraw" => self.show_after_withdraw = parse_flag(value)?,
            _ => {
                return Err(SignupError::UnknownSetting {
                    name: name.to_string(),
                })
            }
        }
        Ok(())
    }
}

fn flag_string(flag: Option<bool>) -> String {
    match flag {
        Some(true) => "true".to_string(),
        Some(false) => "false".to_string(),
        None => String::new(),
    }
}

fn parse_flag(value: &str) -> Result<Option<bool>> {
    match value.to_lowercase().as_str() {
        "" => Ok(None),
        "true" => Ok(Some(true)),
        "false" => Ok(Some(false)),
        _ => Err(SignupError::validation(format!(
            "'{}' is not a valid value (expected true or false)",
            value
        ))),
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrialState {
    #[default]
    Open,
    Closed,
}

impl std::fmt::Display for TrialState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrialState::Open => write!(f, "open"),
            TrialState::Closed => write!(f, "closed"),
        }
    }
}

/// A named role slot with a capacity and an optional display emoji.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleCount {
    pub role: String,
    pub count: u64,
    pub emoji: String,
}

/// One user's claim on a role, in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrialSignup {
    pub name: String,
    pub role: String,
}

/// An event record. Many per guild, keyed by the lower-cased name; the stored
/// name keeps its display case.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Trial {
    pub name: String,
    pub description: String,
    pub signup_channel: String,
    pub announce_channel: String,
    pub state: TrialState,
    /// Kept sorted by lower-cased role name, free of case-insensitive
    /// duplicates. The order is a lookup and display invariant.
    pub role_counts: Vec<RoleCount>,
    /// Insertion order decides who is in capacity and who overflows.
    pub signups: Vec<TrialSignup>,
}

impl Trial {
    pub fn new(name: &str) -> Self {
        Trial {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Storage key: identity is case-insensitive.
    pub fn key(&self) -> String {
        self.name.to_lowercase()
    }

    /// Look up a role slot by name, case-insensitively.
    pub fn role_count(&self, role: &str) -> Option<&RoleCount> {
        let role = role.to_lowercase();
        self.role_counts
            .iter()
            .find(|rc| rc.role.to_lowercase() == role)
    }

    /// Insert or replace a role slot, keeping the sorted-order invariant.
    pub fn set_role_count(&mut self, role: &str, count: u64, emoji: &str) {
        let lower = role.to_lowercase();
        self.role_counts
            .retain(|rc| rc.role.to_lowercase() != lower);
        self.role_counts.push(RoleCount {
            role: role.to_string(),
            count,
            emoji: emoji.to_string(),
        });
        self.sort_role_counts();
    }

    pub fn clear_role_counts(&mut self) {
        self.role_counts.clear();
    }

    /// Restore the sorted-role invariant. Called after decoding so that
    /// records written by hand or by older versions still read back sorted.
    pub fn sort_role_counts(&mut self) {
        self.role_counts
            .sort_by_key(|rc| rc.role.to_lowercase());
    }

    /// Append a signup. Duplicate entries for the same user and role are
    /// allowed here; withdrawing first is the caller's job.
    pub fn add_signup(&mut self, name: &str, role: &str) {
        self.signups.push(TrialSignup {
            name: name.to_string(),
            role: role.to_string(),
        });
    }

    /// Remove every signup for this user, any role. Not an error if there
    /// were none.
    pub fn remove_signup(&mut self, name: &str) {
        let lower = name.to_lowercase();
        self.signups.retain(|s| s.name.to_lowercase() != lower);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_get_set_known_keys() {
        let mut s = GuildSettings::default();
        s.set("AdminChannel", "officers").unwrap();
        s.set("showafterwithdraw", "true").unwrap();

        assert_eq!(s.get("adminchannel").unwrap(), "officers");
        assert_eq!(s.get("ShowAfterWithdraw").unwrap(), "true");
        assert_eq!(s.get("showaftersignup").unwrap(), "");
    }

    #[test]
    fn test_settings_unknown_key() {
        let mut s = GuildSettings::default();
        assert!(matches!(
            s.get("nope"),
            Err(SignupError::UnknownSetting { .. })
        ));
        assert!(matches!(
            s.set("nope", "1"),
            Err(SignupError::UnknownSetting { .. })
        ));
    }

    #[test]
    fn test_settings_flag_validation() {
        let mut s = GuildSettings::default();
        assert!(s.set("showaftersignup", "yes").is_err());
        s.set("showaftersignup", "false").unwrap();
        assert_eq!(s.show_after_signup, Some(false));
        s.set("showaftersignup", "").unwrap();
        assert_eq!(s.show_after_signup, None);
    }

    #[test]
    fn test_role_counts_sorted_and_unique() {
        let mut t = Trial::new("Raid1");
        t.set_role_count("Zed", 2, "");
        t.set_role_count("Alpha", 1, "");
        t.set_role_count("zed", 3, "x");

        let roles: Vec<&str> = t.role_counts.iter().map(|rc| rc.role.as_str()).collect();
        assert_eq!(roles, vec!["Alpha", "zed"]);
        assert_eq!(t.role_count("ZED").unwrap().count, 3);
    }

    #[test]
    fn test_remove_signup_case_insensitive() {
        let mut t = Trial::new("Raid1");
        t.add_signup("@UserA", "tank");
        t.add_signup("@usera", "heal");
        t.add_signup("@UserB", "tank");

        t.remove_signup("@USERA");
        assert_eq!(t.signups.len(), 1);
        assert_eq!(t.signups[0].name, "@UserB");
    }

    #[test]
    fn test_trial_key_lowercases() {
        let t = Trial::new("Boss Run");
        assert_eq!(t.key(), "boss run");
        assert_eq!(t.name, "Boss Run");
    }
}
