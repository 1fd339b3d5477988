//! Line Protocol Command Parser
//!
//! One client request is one `\n`-terminated line of whitespace-separated
//! tokens; the first token is the command name, matched case-insensitively.
//! This module turns such a line into a typed [`Command`], validating the
//! argument count and any integer arguments along the way, so the
//! dispatcher only ever executes well-formed requests.
//!
//! A deliberate exception: the `SET ... EX` millisecond count is carried as
//! the raw token. Its validation belongs to the store engine, because a bad
//! value there has a side effect (the key being set is deleted) that a pure
//! parser must not own.

use thiserror::Error;

/// Errors produced while turning a line into a [`Command`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Too few or too many arguments for the named command.
    #[error("wrong number of arguments for '{0}' command")]
    WrongArity(&'static str),

    /// An argument that must be an integer (LRANGE indices, EXPIRE
    /// seconds) did not parse as one.
    #[error("value is not an integer or out of range")]
    NotAnInteger,

    /// The first token named no known command.
    #[error("Unknown command '{0}'")]
    UnknownCommand(String),
}

/// A fully parsed client request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `SET key value [EX milliseconds]` — `expire_ms` stays raw, see the
    /// module docs.
    Set {
        key: String,
        value: String,
        expire_ms: Option<String>,
    },
    /// `GET key`
    Get { key: String },
    /// `DEL key [key ...]`
    Del { keys: Vec<String> },
    /// `LPUSH key value [value ...]`
    LPush { key: String, values: Vec<String> },
    /// `RPUSH key value [value ...]`
    RPush { key: String, values: Vec<String> },
    /// `LRANGE key start stop`
    LRange { key: String, start: i64, stop: i64 },
    /// `HSET key field value`
    HSet {
        key: String,
        field: String,
        value: String,
    },
    /// `HGET key field`
    HGet { key: String, field: String },
    /// `HDEL key field [field ...]`
    HDel { key: String, fields: Vec<String> },
    /// `TTL key`
    Ttl { key: String },
    /// `EXPIRE key seconds`
    Expire { key: String, seconds: i64 },
    /// `PING`
    Ping,
    /// `COMMAND` — lists the supported command names.
    Commands,
    /// `QUIT` — reply, then close the connection.
    Quit,
}

impl Command {
    /// Parses one protocol line.
    ///
    /// Returns `Ok(None)` for a blank line, which is a no-op with no
    /// response at all.
    pub fn parse(line: &str) -> Result<Option<Command>, ParseError> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let (name, args) = match tokens.split_first() {
            Some((name, args)) => (name.to_uppercase(), args),
            None => return Ok(None),
        };

        let command = match name.as_str() {
            "SET" => match args {
                [key, value] => Command::Set {
                    key: key.to_string(),
                    value: value.to_string(),
                    expire_ms: None,
                },
                [key, value, ex, ms] if ex.eq_ignore_ascii_case("EX") => Command::Set {
                    key: key.to_string(),
                    value: value.to_string(),
                    expire_ms: Some(ms.to_string()),
                },
                _ => return Err(ParseError::WrongArity("set")),
            },
            "GET" => match args {
                [key] => Command::Get {
                    key: key.to_string(),
                },
                _ => return Err(ParseError::WrongArity("get")),
            },
            "DEL" => {
                if args.is_empty() {
                    return Err(ParseError::WrongArity("del"));
                }
                Command::Del {
                    keys: owned(args),
                }
            }
            "LPUSH" => match args {
                [key, values @ ..] if !values.is_empty() => Command::LPush {
                    key: key.to_string(),
                    values: owned(values),
                },
                _ => return Err(ParseError::WrongArity("lpush")),
            },
            "RPUSH" => match args {
                [key, values @ ..] if !values.is_empty() => Command::RPush {
                    key: key.to_string(),
                    values: owned(values),
                },
                _ => return Err(ParseError::WrongArity("rpush")),
            },
            "LRANGE" => match args {
                [key, start, stop] => Command::LRange {
                    key: key.to_string(),
                    start: integer(start)?,
                    stop: integer(stop)?,
                },
                _ => return Err(ParseError::WrongArity("lrange")),
            },
            "HSET" => match args {
                [key, field, value] => Command::HSet {
                    key: key.to_string(),
                    field: field.to_string(),
                    value: value.to_string(),
                },
                _ => return Err(ParseError::WrongArity("hset")),
            },
            "HGET" => match args {
                [key, field] => Command::HGet {
                    key: key.to_string(),
                    field: field.to_string(),
                },
                _ => return Err(ParseError::WrongArity("hget")),
            },
            "HDEL" => match args {
                [key, fields @ ..] if !fields.is_empty() => Command::HDel {
                    key: key.to_string(),
                    fields: owned(fields),
                },
                _ => return Err(ParseError::WrongArity("hdel")),
            },
            "TTL" => match args {
                [key] => Command::Ttl {
                    key: key.to_string(),
                },
                _ => return Err(ParseError::WrongArity("ttl")),
            },
            "EXPIRE" => match args {
                [key, seconds] => Command::Expire {
                    key: key.to_string(),
                    seconds: integer(seconds)?,
                },
                _ => return Err(ParseError::WrongArity("expire")),
            },
            // PING, COMMAND and QUIT tolerate trailing tokens.
            "PING" => Command::Ping,
            "COMMAND" => Command::Commands,
            "QUIT" => Command::Quit,
            _ => return Err(ParseError::UnknownCommand(name)),
        };

        Ok(Some(command))
    }
}

fn owned(tokens: &[&str]) -> Vec<String> {
    tokens.iter().map(|t| t.to_string()).collect()
}

fn integer(token: &str) -> Result<i64, ParseError> {
    token.parse().map_err(|_| ParseError::NotAnInteger)
}
