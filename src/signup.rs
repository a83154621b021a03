//! Pure signup domain logic: overflow assignment, the `role:count[:emoji]`
//! grammar, and the `key=value` settings grammar. No I/O here.

use crate::error::{Result, SignupError};
use crate::models::{RoleCount, Trial, TrialSignup};

/// Sign a user up for a role on a trial.
///
/// Fails with `UnknownRole` (and does not touch the signup list) if the role
/// does not match any role slot case-insensitively. Returns whether the
/// signup landed in overflow. Re-signing up appends a duplicate entry; the
/// command layer keeps that behavior deliberately.
pub fn signup(trial: &mut Trial, user: &str, role: &str) -> Result<bool> {
    let capacity = match trial.role_count(role) {
        Some(rc) => rc.count,
        None => {
            return Err(SignupError::UnknownRole {
                role: role.to_string(),
            })
        }
    };

    trial.add_signup(user, role);

    let lower = role.to_lowercase();
    let taken = trial
        .signups
        .iter()
        .filter(|s| s.role.to_lowercase() == lower)
        .count() as u64;

    Ok(taken > capacity)
}

/// Remove every signup held by this user. A no-op if there were none.
pub fn withdraw(trial: &mut Trial, user: &str) {
    trial.remove_signup(user);
}

/// Partition one role's signups into in-capacity and overflow names, in
/// insertion order. Always recomputed from the signup list, never cached.
pub fn role_partition<'a>(
    signups: &'a [TrialSignup],
    rc: &RoleCount,
) -> (Vec<&'a str>, Vec<&'a str>) {
    let lower = rc.role.to_lowercase();
    let mut active = Vec::new();
    let mut overflow = Vec::new();

    for s in signups {
        if s.role.to_lowercase() != lower {
            continue;
        }
        if (active.len() as u64) < rc.count {
            active.push(s.name.as_str());
        } else {
            overflow.push(s.name.as_str());
        }
    }

    (active, overflow)
}

/// One parsed entry of a roles string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleSpec {
    pub role: String,
    pub count: u64,
    pub emoji: String,
}

/// Parse a comma-separated `role:count[:emoji]` list. Empty entries are
/// skipped; an entry missing its count is a parse error.
pub fn parse_roles(spec: &str) -> Result<Vec<RoleSpec>> {
    let mut out = Vec::new();

    for part in spec.trim().split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        let mut fields = part.splitn(3, ':');
        let role = fields.next().unwrap_or_default();
        let count = match fields.next() {
            Some(c) => c,
            None => return Err(SignupError::validation("could not parse roles")),
        };
        let emoji = fields.next().unwrap_or_default();

        let count: u64 = count
            .parse()
            .map_err(|_| SignupError::validation(format!("'{}' is not a valid count", count)))?;

        out.push(RoleSpec {
            role: role.to_string(),
            count,
            emoji: emoji.to_string(),
        });
    }

    Ok(out)
}

/// Parse space-separated `key=value` tokens. Keys are lower-cased; a token
/// without `=` is a parse error. Whether an empty list is acceptable is the
/// caller's concern.
pub fn parse_settings_args(args: &[&str]) -> Result<Vec<(String, String)>> {
    let mut pairs = Vec::new();

    for arg in args {
        if arg.is_empty() {
            continue;
        }
        match arg.split_once('=') {
            Some((key, value)) => pairs.push((key.to_lowercase(), value.to_string())),
            None => {
                return Err(SignupError::validation(format!(
                    "could not parse setting '{}'",
                    arg
                )))
            }
        }
    }

    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trial_with_tank(count: u64) -> Trial {
        let mut t = Trial::new("Raid1");
        t.set_role_count("tank", count, "");
        t
    }

    #[test]
    fn test_overflow_assignment() {
        let mut t = trial_with_tank(2);

        assert!(!signup(&mut t, "@A", "tank").unwrap());
        assert!(!signup(&mut t, "@B", "tank").unwrap());
        assert!(signup(&mut t, "@C", "tank").unwrap());

        let rc = t.role_count("tank").unwrap().clone();
        let (active, overflow) = role_partition(&t.signups, &rc);
        assert_eq!(active, vec!["@A", "@B"]);
        assert_eq!(overflow, vec!["@C"]);
    }

    #[test]
    fn test_overflow_recomputed_after_withdraw() {
        let mut t = trial_with_tank(2);
        signup(&mut t, "@A", "tank").unwrap();
        signup(&mut t, "@B", "tank").unwrap();
        signup(&mut t, "@C", "tank").unwrap();

        withdraw(&mut t, "@A");

        let rc = t.role_count("tank").unwrap().clone();
        let (active, overflow) = role_partition(&t.signups, &rc);
        assert_eq!(active, vec!["@B", "@C"]);
        assert!(overflow.is_empty());
    }

    #[test]
    fn test_unknown_role_does_not_mutate() {
        let mut t = trial_with_tank(2);
        let err = signup(&mut t, "@A", "healer").unwrap_err();
        assert!(matches!(err, SignupError::UnknownRole { .. }));
        assert!(t.signups.is_empty());
    }

    #[test]
    fn test_role_match_is_case_insensitive() {
        let mut t = trial_with_tank(1);
        assert!(!signup(&mut t, "@A", "Tank").unwrap());
        assert!(signup(&mut t, "@B", "TANK").unwrap());
    }

    #[test]
    fn test_parse_roles() {
        let specs = parse_roles(" tank:2:🛡️, heal:1 ,").unwrap();
        assert_eq!(
            specs,
            vec![
                RoleSpec {
                    role: "tank".to_string(),
                    count: 2,
                    emoji: "🛡️".to_string(),
                },
                RoleSpec {
                    role: "heal".to_string(),
                    count: 1,
                    emoji: String::new(),
                },
            ]
        );
    }

    #[test]
    fn test_parse_roles_missing_count() {
        assert!(parse_roles("tank").is_err());
        assert!(parse_roles("tank:x").is_err());
    }

    #[test]
    fn test_parse_settings_args() {
        let pairs = parse_settings_args(&["Foo=1", "bar=2"]).unwrap();
        assert_eq!(
            pairs,
            vec![
                ("foo".to_string(), "1".to_string()),
                ("bar".to_string(), "2".to_string()),
            ]
        );

        assert!(parse_settings_args(&["badtoken"]).is_err());
        assert!(parse_settings_args(&[]).unwrap().is_empty());
    }
}
