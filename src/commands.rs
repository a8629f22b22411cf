//! Participant Commands
//!
//! Chat-style command parsing. One ordered table maps the command word
//! to its shape; argument problems answer with that command's usage
//! string instead of a generic error. Execution lives in the engine,
//! which owns the registry.

use crate::types::Credits;

/// A parsed participant command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Challenge the currently selected target.
    Duel { amount: Credits },
    /// Accept the duel the issuer was challenged to.
    AcceptDuel,
    /// Start a free-for-all in the issuer's zone.
    Ffa { amount: Credits },
    /// Accept the issuer's free-for-all membership.
    AcceptFfa,
    /// Walk away from whatever wager the issuer has.
    Cancel,
}

/// Why a line did not parse into a command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParseError {
    /// Recognized command, bad arguments; reply with its usage line.
    Usage(&'static str),
    /// Not one of ours.
    Unknown,
}

/// Shape of one command in the dispatch table.
struct CommandSpec {
    name: &'static str,
    usage: &'static str,
    takes_amount: bool,
    build: fn(Option<Credits>) -> Command,
}

const COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        name: "duel",
        usage: "Usage: /duel <amount>, e.g. /duel 5000",
        takes_amount: true,
        build: |amount| Command::Duel { amount: amount.unwrap_or(0) },
    },
    CommandSpec {
        name: "acceptduel",
        usage: "Usage: /acceptduel",
        takes_amount: false,
        build: |_| Command::AcceptDuel,
    },
    CommandSpec {
        name: "ffa",
        usage: "Usage: /ffa <amount>, e.g. /ffa 5000",
        takes_amount: true,
        build: |amount| Command::Ffa { amount: amount.unwrap_or(0) },
    },
    CommandSpec {
        name: "acceptffa",
        usage: "Usage: /acceptffa",
        takes_amount: false,
        build: |_| Command::AcceptFfa,
    },
    CommandSpec {
        name: "cancel",
        usage: "Usage: /cancel",
        takes_amount: false,
        build: |_| Command::Cancel,
    },
];

/// Parse one chat line. Lines must start with `/`; the command word is
/// matched case-insensitively, arguments split on whitespace.
pub fn parse(line: &str) -> Result<Command, ParseError> {
    let trimmed = line.trim();
    let Some(rest) = trimmed.strip_prefix('/') else {
        return Err(ParseError::Unknown);
    };

    let mut tokens = rest.split_whitespace();
    let word = tokens.next().unwrap_or("").to_ascii_lowercase();

    for spec in COMMANDS {
        if spec.name != word {
            continue;
        }
        if !spec.takes_amount {
            return Ok((spec.build)(None));
        }
        let amount = tokens
            .next()
            .and_then(|t| t.parse::<Credits>().ok())
            .ok_or(ParseError::Usage(spec.usage))?;
        return Ok((spec.build)(Some(amount)));
    }
    Err(ParseError::Unknown)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_five_commands_parse() {
        assert_eq!(parse("/duel 5000"), Ok(Command::Duel { amount: 5000 }));
        assert_eq!(parse("/acceptduel"), Ok(Command::AcceptDuel));
        assert_eq!(parse("/ffa 250"), Ok(Command::Ffa { amount: 250 }));
        assert_eq!(parse("/acceptffa"), Ok(Command::AcceptFfa));
        assert_eq!(parse("/cancel"), Ok(Command::Cancel));
    }

    #[test]
    fn amounts_must_be_numeric() {
        assert_eq!(
            parse("/duel"),
            Err(ParseError::Usage("Usage: /duel <amount>, e.g. /duel 5000"))
        );
        assert_eq!(
            parse("/duel lots"),
            Err(ParseError::Usage("Usage: /duel <amount>, e.g. /duel 5000"))
        );
        assert_eq!(
            parse("/ffa "),
            Err(ParseError::Usage("Usage: /ffa <amount>, e.g. /ffa 5000"))
        );
    }

    #[test]
    fn negative_amounts_parse_and_are_rejected_downstream() {
        // Validation of the value happens in the engine, not the parser.
        assert_eq!(parse("/duel -5"), Ok(Command::Duel { amount: -5 }));
    }

    #[test]
    fn unknown_or_unprefixed_lines_fall_through() {
        assert_eq!(parse("duel 5000"), Err(ParseError::Unknown));
        assert_eq!(parse("/bounty 100"), Err(ParseError::Unknown));
        assert_eq!(parse("hello there"), Err(ParseError::Unknown));
        assert_eq!(parse(""), Err(ParseError::Unknown));
    }

    #[test]
    fn command_word_is_case_insensitive_and_padded_lines_parse() {
        assert_eq!(parse("  /DUEL 10  "), Ok(Command::Duel { amount: 10 }));
        assert_eq!(parse("/AcceptFFA"), Ok(Command::AcceptFfa));
    }

    #[test]
    fn trailing_tokens_are_ignored() {
        assert_eq!(parse("/cancel now please"), Ok(Command::Cancel));
        assert_eq!(parse("/duel 100 credits"), Ok(Command::Duel { amount: 100 }));
    }
}
