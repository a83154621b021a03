//! Command text parsing: an indicator prefix, a verb, then space-delimited
//! arguments.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub verb: String,
    pub args: Vec<String>,
}

/// Parse a command line against an indicator. `None` means the text is not a
/// command for this indicator at all.
pub fn parse(content: &str, indicator: &str) -> Option<CommandLine> {
    let rest = content.strip_prefix(indicator)?;
    let mut parts = rest.split_whitespace();
    let verb = parts.next()?.to_string();

    Some(CommandLine {
        verb,
        args: parts.map(str::to_string).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_verb_and_args() {
        let cl = parse("!signup Raid1 tank", "!").unwrap();
        assert_eq!(cl.verb, "signup");
        assert_eq!(cl.args, vec!["Raid1", "tank"]);
    }

    #[test]
    fn test_parse_multichar_indicator() {
        let cl = parse("?!list", "?!").unwrap();
        assert_eq!(cl.verb, "list");
        assert!(cl.args.is_empty());
    }

    #[test]
    fn test_not_a_command() {
        assert!(parse("hello there", "!").is_none());
        assert!(parse("!", "!").is_none());
        assert!(parse("!   ", "!").is_none());
    }
}
