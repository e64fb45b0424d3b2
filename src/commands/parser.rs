//! Command Line Parser
//!
//! Turns one line of user input into a typed [`Command`]. Each command has a
//! fixed set of positionals and `--options`; anything else is rejected up
//! front so the handler only ever sees well-formed arguments.
//!
//! ## Grammar
//!
//! ```text
//! SET <key> <value> [--ttl <seconds>] [--set true|false]
//! GET <key> [--field value|expires_at|raw_ttl] [--entry]
//! DEL <key>
//! TTL <key>
//! ALL
//! ```
//!
//! Options may appear anywhere after the command name, as `--opt value` or
//! `--opt=value`. Command names are case-insensitive.
//!
//! A SET value containing commas is split into a list, or into a set when
//! `--set true` is given. An unrecognised `--set` value is not fatal: the
//! value is stored as a list and a warning is returned alongside the command.

use crate::storage::{Field, UnknownField, Value};
use std::collections::{BTreeSet, HashMap, HashSet};
use thiserror::Error;

/// A parsed store command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Store `value` under `key`, optionally expiring after `ttl` seconds.
    /// The TTL is kept as text; the store decides whether it is valid.
    Set {
        key: String,
        value: Value,
        ttl: Option<String>,
    },
    /// Read one field of `key`, or the whole entry when `just_value` is false.
    Get {
        key: String,
        field: Field,
        just_value: bool,
    },
    /// Remove `key`
    Del { key: String },
    /// Report the TTL of `key`
    Ttl { key: String },
    /// List every live entry
    All,
}

impl Command {
    /// Returns the command name as typed by users.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Set { .. } => "SET",
            Command::Get { .. } => "GET",
            Command::Del { .. } => "DEL",
            Command::Ttl { .. } => "TTL",
            Command::All => "ALL",
        }
    }
}

/// A command together with any non-fatal warning raised while parsing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parsed {
    pub command: Command,
    pub warning: Option<String>,
}

impl From<Command> for Parsed {
    fn from(command: Command) -> Self {
        Self {
            command,
            warning: None,
        }
    }
}

/// Errors that can occur while parsing a command.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Nothing but whitespace was given
    #[error("empty command")]
    Empty,

    /// The first word is not a known command
    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    /// Required positionals are missing
    #[error("wrong number of arguments for '{0}' command")]
    WrongArity(&'static str),

    /// Unexpected positionals or unknown options
    #[error("illegal argument: {}", .0.join(" , "))]
    IllegalArgument(Vec<String>),

    /// An option that takes a value was given none
    #[error("option '--{0}' requires a value")]
    MissingOptionValue(String),

    /// `--field` named something that is not a field
    #[error(transparent)]
    UnknownField(#[from] UnknownField),
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, CommandError>;

/// Parses one line of input.
pub fn parse_line(line: &str) -> ParseResult<Parsed> {
    let words: Vec<&str> = line.split_whitespace().collect();
    parse_words(&words)
}

/// Parses a command that has already been split into words, such as the
/// process arguments.
pub fn parse_words<S: AsRef<str>>(words: &[S]) -> ParseResult<Parsed> {
    let words: Vec<&str> = words.iter().map(AsRef::as_ref).collect();
    let (name, args) = words.split_first().ok_or(CommandError::Empty)?;

    match name.to_ascii_uppercase().as_str() {
        "SET" => parse_set(args),
        "GET" => parse_get(args),
        "DEL" => {
            let [key] = scan(args, &[], &[])?.finish::<1>("DEL")?;
            Ok(Command::Del { key }.into())
        }
        "TTL" => {
            let [key] = scan(args, &[], &[])?.finish::<1>("TTL")?;
            Ok(Command::Ttl { key }.into())
        }
        "ALL" => {
            scan(args, &[], &[])?.finish::<0>("ALL")?;
            Ok(Command::All.into())
        }
        _ => Err(CommandError::UnknownCommand(name.to_string())),
    }
}

/// SET key value [--ttl seconds] [--set true|false]
fn parse_set(args: &[&str]) -> ParseResult<Parsed> {
    let mut scanned = scan(args, &["ttl", "set"], &[])?;
    let ttl = scanned.options.remove("ttl").map(str::to_string);
    let as_set = scanned.options.remove("set");
    let [key, raw_value] = scanned.finish::<2>("SET")?;

    let (value, warning) = shape_value(&raw_value, as_set);
    Ok(Parsed {
        command: Command::Set { key, value, ttl },
        warning,
    })
}

/// GET key [--field name] [--entry]
fn parse_get(args: &[&str]) -> ParseResult<Parsed> {
    let mut scanned = scan(args, &["field"], &["entry"])?;
    let field = match scanned.options.remove("field") {
        Some(name) => name.parse::<Field>()?,
        None => Field::Value,
    };
    let just_value = !scanned.flags.contains("entry");
    let [key] = scanned.finish::<1>("GET")?;

    Ok(Command::Get {
        key,
        field,
        just_value,
    }
    .into())
}

/// Turns the raw SET argument into a string, list or set.
fn shape_value(raw: &str, as_set: Option<&str>) -> (Value, Option<String>) {
    let parts: Vec<&str> = raw.split(',').collect();
    if parts.len() == 1 {
        return (Value::from(raw), None);
    }

    match as_set {
        Some("true") | Some("True") => {
            let set: BTreeSet<String> = parts.into_iter().map(str::to_string).collect();
            (Value::Set(set), None)
        }
        None | Some("false") | Some("False") => (Value::from(parts), None),
        Some(_) => (
            Value::from(parts),
            Some("wrong type for --set, --set must be boolean, --set ignored".to_string()),
        ),
    }
}

/// Arguments split into positionals, valued options and flags.
struct Scanned<'a> {
    positionals: Vec<&'a str>,
    options: HashMap<&'static str, &'a str>,
    flags: HashSet<&'static str>,
    illegal: Vec<String>,
}

impl Scanned<'_> {
    /// Checks that exactly `N` positionals were given and nothing illegal.
    fn finish<const N: usize>(self, command: &'static str) -> ParseResult<[String; N]> {
        if self.positionals.len() < N {
            return Err(CommandError::WrongArity(command));
        }

        let mut illegal: Vec<String> = self.positionals[N..]
            .iter()
            .map(|s| s.to_string())
            .collect();
        illegal.extend(self.illegal);
        if !illegal.is_empty() {
            return Err(CommandError::IllegalArgument(illegal));
        }

        Ok(std::array::from_fn(|i| self.positionals[i].to_string()))
    }
}

fn scan<'a>(
    args: &[&'a str],
    valued: &[&'static str],
    flags: &[&'static str],
) -> ParseResult<Scanned<'a>> {
    let mut scanned = Scanned {
        positionals: Vec::new(),
        options: HashMap::new(),
        flags: HashSet::new(),
        illegal: Vec::new(),
    };

    let mut iter = args.iter();
    while let Some(&arg) = iter.next() {
        let Some(option) = arg.strip_prefix("--").filter(|o| !o.is_empty()) else {
            scanned.positionals.push(arg);
            continue;
        };

        let (name, inline) = match option.split_once('=') {
            Some((name, value)) => (name, Some(value)),
            None => (option, None),
        };

        if let Some(&known) = valued.iter().find(|v| **v == name) {
            let value = match inline {
                Some(value) => value,
                None => *iter
                    .next()
                    .ok_or_else(|| CommandError::MissingOptionValue(known.to_string()))?,
            };
            scanned.options.insert(known, value);
        } else if let Some(&known) = flags.iter().find(|f| **f == name) {
            if inline.is_some() {
                scanned.illegal.push(arg.to_string());
            } else {
                scanned.flags.insert(known);
            }
        } else {
            scanned.illegal.push(arg.to_string());
        }
    }

    Ok(scanned)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(line: &str) -> Command {
        parse_line(line).unwrap().command
    }

    #[test]
    fn test_parse_set_string() {
        assert_eq!(
            command("SET name Ariz"),
            Command::Set {
                key: "name".to_string(),
                value: Value::from("Ariz"),
                ttl: None,
            }
        );
    }

    #[test]
    fn test_parse_set_with_ttl() {
        assert_eq!(
            command("set session abc --ttl 60"),
            Command::Set {
                key: "session".to_string(),
                value: Value::from("abc"),
                ttl: Some("60".to_string()),
            }
        );

        // Option before positionals, inline form
        assert_eq!(
            command("SET --ttl=5 k v"),
            Command::Set {
                key: "k".to_string(),
                value: Value::from("v"),
                ttl: Some("5".to_string()),
            }
        );
    }

    #[test]
    fn test_parse_set_keeps_invalid_ttl_text() {
        // Validation belongs to the store
        assert_eq!(
            command("SET k v --ttl abc"),
            Command::Set {
                key: "k".to_string(),
                value: Value::from("v"),
                ttl: Some("abc".to_string()),
            }
        );
    }

    #[test]
    fn test_parse_set_list_and_set() {
        assert_eq!(
            command("SET letters a,b,a"),
            Command::Set {
                key: "letters".to_string(),
                value: Value::from(vec!["a", "b", "a"]),
                ttl: None,
            }
        );

        let expected: BTreeSet<String> = ["a", "b"].iter().map(|s| s.to_string()).collect();
        assert_eq!(
            command("SET letters a,b,a --set true"),
            Command::Set {
                key: "letters".to_string(),
                value: Value::Set(expected),
                ttl: None,
            }
        );

        assert_eq!(
            command("SET letters a,b --set False"),
            Command::Set {
                key: "letters".to_string(),
                value: Value::from(vec!["a", "b"]),
                ttl: None,
            }
        );
    }

    #[test]
    fn test_parse_set_bad_set_flag_warns() {
        let parsed = parse_line("SET letters a,b --set maybe").unwrap();
        assert_eq!(
            parsed.command,
            Command::Set {
                key: "letters".to_string(),
                value: Value::from(vec!["a", "b"]),
                ttl: None,
            }
        );
        assert!(parsed.warning.unwrap().contains("--set ignored"));

        // Single values ignore --set entirely
        let parsed = parse_line("SET k v --set maybe").unwrap();
        assert_eq!(parsed.warning, None);
    }

    #[test]
    fn test_parse_get() {
        assert_eq!(
            command("GET name"),
            Command::Get {
                key: "name".to_string(),
                field: Field::Value,
                just_value: true,
            }
        );
        assert_eq!(
            command("get name --field tl"),
            Command::Get {
                key: "name".to_string(),
                field: Field::RawTtl,
                just_value: true,
            }
        );
        assert_eq!(
            command("GET name --entry"),
            Command::Get {
                key: "name".to_string(),
                field: Field::Value,
                just_value: false,
            }
        );
    }

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(command("DEL k"), Command::Del { key: "k".to_string() });
        assert_eq!(command("ttl k"), Command::Ttl { key: "k".to_string() });
        assert_eq!(command("ALL"), Command::All);
        assert_eq!(command("  all  "), Command::All);
    }

    #[test]
    fn test_parse_words() {
        let args = vec!["SET".to_string(), "k".to_string(), "v".to_string()];
        assert_eq!(
            parse_words(&args).unwrap().command,
            Command::Set {
                key: "k".to_string(),
                value: Value::from("v"),
                ttl: None,
            }
        );
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse_line("   "), Err(CommandError::Empty));
        assert_eq!(
            parse_line("FLY away"),
            Err(CommandError::UnknownCommand("FLY".to_string()))
        );
        assert_eq!(parse_line("SET k"), Err(CommandError::WrongArity("SET")));
        assert_eq!(parse_line("GET"), Err(CommandError::WrongArity("GET")));
        assert_eq!(
            parse_line("GET a b c"),
            Err(CommandError::IllegalArgument(vec![
                "b".to_string(),
                "c".to_string()
            ]))
        );
        assert_eq!(
            parse_line("DEL k --force"),
            Err(CommandError::IllegalArgument(vec!["--force".to_string()]))
        );
        assert_eq!(
            parse_line("SET k v --ttl"),
            Err(CommandError::MissingOptionValue("ttl".to_string()))
        );
        assert_eq!(
            parse_line("GET k --field colour"),
            Err(CommandError::UnknownField(UnknownField("colour".to_string())))
        );
        assert_eq!(
            parse_line("ALL extra"),
            Err(CommandError::IllegalArgument(vec!["extra".to_string()]))
        );
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            CommandError::IllegalArgument(vec!["a".to_string(), "b".to_string()]).to_string(),
            "illegal argument: a , b"
        );
        assert_eq!(
            CommandError::WrongArity("SET").to_string(),
            "wrong number of arguments for 'SET' command"
        );
    }

    #[test]
    fn test_command_name() {
        assert_eq!(command("del k").name(), "DEL");
        assert_eq!(command("ALL").name(), "ALL");
    }
}
