//! Command Dispatcher
//!
//! One dispatched line goes through four steps: parse, validate arity,
//! execute under the store lock, render. Parse and arity failures are
//! answered without ever touching the lock; execution takes the single
//! store mutex for the full duration of the command, which serializes all
//! command traffic across every connection. That coarse lock is a
//! deliberate property of the system, not an implementation shortcut.
//!
//! A panic inside a command is caught here and reported to the client as
//! an internal error; the connection survives, and so does the store (a
//! poisoned lock is recovered, accepting whatever partial mutation the
//! failed command left behind).

use crate::protocol::{Command, Reply};
use crate::storage::Store;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::error;

/// The reply to the `COMMAND` command.
const COMMAND_LISTING: &str =
    "Commands: SET, GET, DEL, LPUSH, RPUSH, LRANGE, HSET, HGET, HDEL, TTL, EXPIRE, PING, COMMAND, QUIT";

/// What the connection handler should do with a dispatched line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Blank input line; nothing is written back.
    Silent,
    /// Write the reply and keep serving.
    Reply(Reply),
    /// Write the reply, then close the connection (`QUIT`).
    Close(Reply),
}

/// Maps request lines onto store operations.
///
/// Cheap to clone; every connection gets its own handle onto the one
/// shared store.
#[derive(Clone)]
pub struct Dispatcher {
    store: Arc<Mutex<Store>>,
}

impl Dispatcher {
    /// Creates a dispatcher over the shared store.
    pub fn new(store: Arc<Mutex<Store>>) -> Self {
        Self { store }
    }

    /// Handles one request line end to end.
    pub fn dispatch(&self, line: &str) -> Outcome {
        let command = match Command::parse(line) {
            Ok(Some(command)) => command,
            Ok(None) => return Outcome::Silent,
            Err(e) => return Outcome::Reply(Reply::from(e)),
        };

        if command == Command::Quit {
            return Outcome::Close(Reply::ok());
        }

        Outcome::Reply(self.execute(command))
    }

    /// Runs a parsed command under the store lock, converting a panic into
    /// an internal-error reply instead of tearing the connection down.
    fn execute(&self, command: Command) -> Reply {
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            let mut store = self
                .store
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            run(&mut store, command)
        }));

        match result {
            Ok(reply) => reply,
            Err(cause) => {
                let cause = panic_message(cause.as_ref());
                error!(cause, "command execution panicked");
                Reply::error(format!("Internal server error: {cause}"))
            }
        }
    }
}

/// Executes one command against the locked store and renders its result.
fn run(store: &mut Store, command: Command) -> Reply {
    match command {
        Command::Set {
            key,
            value,
            expire_ms,
        } => match store.set(&key, &value, expire_ms.as_deref()) {
            Ok(()) => Reply::ok(),
            Err(e) => e.into(),
        },
        Command::Get { key } => match store.get(&key) {
            Ok(Some(value)) => Reply::Simple(value),
            Ok(None) => Reply::Nil,
            Err(e) => e.into(),
        },
        Command::Del { keys } => Reply::Integer(store.del(&keys)),
        Command::LPush { key, values } => match store.lpush(&key, &values) {
            Ok(len) => Reply::Integer(len as i64),
            Err(e) => e.into(),
        },
        Command::RPush { key, values } => match store.rpush(&key, &values) {
            Ok(len) => Reply::Integer(len as i64),
            Err(e) => e.into(),
        },
        Command::LRange { key, start, stop } => match store.lrange(&key, start, stop) {
            Ok(items) => Reply::Multi(items),
            Err(e) => e.into(),
        },
        Command::HSet { key, field, value } => match store.hset(&key, &field, &value) {
            Ok(n) => Reply::Integer(n),
            Err(e) => e.into(),
        },
        Command::HGet { key, field } => match store.hget(&key, &field) {
            Ok(Some(value)) => Reply::Simple(value),
            Ok(None) => Reply::Nil,
            Err(e) => e.into(),
        },
        Command::HDel { key, fields } => match store.hdel(&key, &fields) {
            Ok(n) => Reply::Integer(n),
            Err(e) => e.into(),
        },
        Command::Ttl { key } => Reply::Integer(store.ttl(&key)),
        Command::Expire { key, seconds } => Reply::Integer(store.expire(&key, seconds)),
        Command::Ping => Reply::pong(),
        Command::Commands => Reply::Simple(COMMAND_LISTING.to_string()),
        // QUIT never reaches execution; answered in dispatch.
        Command::Quit => Reply::ok(),
    }
}

fn panic_message(cause: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = cause.downcast_ref::<&str>() {
        s
    } else if let Some(s) = cause.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}
