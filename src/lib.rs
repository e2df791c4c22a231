//! redlink is a synchronous Rust client for Redis-protocol servers.
//!
//! The crate speaks the classic five-shape reply protocol over a plain
//! stream connection and layers three things on top of the wire codec:
//! a bounded connection pool, a pooled request/response client with a
//! reconnect-once policy, and pinned-session modes for transactions,
//! pipelines and Pub/Sub.
//!
//! # Basic operation
//!
//! A [`Client`] is cheap to create (no I/O happens until the first
//! command), holds the connection pool, and is safe to share across
//! threads through `&self`:
//!
//! ```rust,no_run
//! fn run() -> redlink::RedisResult<()> {
//!     let client = redlink::Client::open("redis://127.0.0.1/")?;
//!     client.set("my_key", 42)?;
//!     let value: Option<Vec<u8>> = client.get("my_key")?;
//!     assert_eq!(value, Some(b"42".to_vec()));
//!     Ok(())
//! }
//! ```
//!
//! The connection string format is
//! `{redis|tcp|tcp4}://[:<password>@]<host>[:port][/<db>][?timeout=<dur>&maxidle=<n>]`,
//! where `timeout` bounds dialing (default 15s) and `maxidle` sizes the
//! pool (default 1).  `(host, port)` tuples and prebuilt
//! [`ConnectionInfo`] values are accepted as well.
//!
//! # Low-level commands
//!
//! Anything the server understands can be spelled with [`cmd`] and run
//! on a [`Connection`] or a [`Client`]:
//!
//! ```rust,no_run
//! # fn run() -> redlink::RedisResult<()> {
//! # let client = redlink::Client::open("redis://127.0.0.1/")?;
//! client.execute(redlink::cmd("SET").arg("counter").arg(42))?;
//! # Ok(()) }
//! ```
//!
//! Replies arrive as [`Value`], the exact tagged sum of the wire
//! grammar, and project into Rust types through [`FromRedisValue`];
//! the typed methods on [`Client`] and the [`Commands`] trait do that
//! projection for the whole command vocabulary.
//!
//! # Session modes
//!
//! Transactions, pipelines and subscriptions each pin one session for
//! the lifetime of a handle:
//!
//! ```rust,no_run
//! # fn run() -> redlink::RedisResult<()> {
//! # let client = redlink::Client::open("redis://127.0.0.1/")?;
//! // MULTI/EXEC with QUEUED validation
//! let mut tx = client.transaction()?;
//! tx.command(redlink::cmd("INCR").arg("a"))?;
//! tx.command(redlink::cmd("GET").arg("a"))?;
//! let replies = tx.exec()?;
//!
//! // fire-many / drain-many pipelining
//! let mut pipe = client.pipeline()?;
//! pipe.command(redlink::cmd("SET").arg("x").arg(1))?;
//! pipe.command(redlink::cmd("SET").arg("y").arg(2))?;
//! pipe.receive_all()?;
//!
//! // blocking Pub/Sub reception on a dedicated session
//! let mut subscriber = client.pub_sub()?;
//! subscriber.subscribe("events")?;
//! loop {
//!     match subscriber.receive()? {
//!         redlink::PubSubMessage::Message { payload, .. } => {
//!             println!("{}", String::from_utf8_lossy(&payload))
//!         }
//!         _ => {}
//!     }
//! }
//! # Ok(()) }
//! ```
//!
//! # Error handling
//!
//! Every fallible call returns [`RedisResult`].  Server-reported
//! errors, wire-protocol violations, I/O failures and client misuse are
//! told apart by [`ErrorKind`]; a dropped session is reported through
//! [`RedisError::is_connection_dropped`] and triggers the client's
//! single reconnect for plain commands only — never for pinned-session
//! modes.

#![deny(non_camel_case_types)]
#![warn(missing_docs)]

#[macro_use]
mod macros;

mod client;
mod cmd;
mod commands;
mod connection;
mod errors;
mod parser;
mod pipeline;
mod pool;
mod script;
mod transaction;
mod types;

pub use crate::client::Client;
pub use crate::cmd::{cmd, pack_command, Cmd};
pub use crate::commands::Commands;
pub use crate::connection::{
    connect, parse_redis_url, Connection, ConnectionAddr, ConnectionInfo, ConnectionLike,
    IntoConnectionInfo, PubSub, PubSubMessage, RedisConnectionInfo, DEFAULT_POOL_SIZE,
    DEFAULT_TIMEOUT,
};
pub use crate::errors::{ErrorKind, RedisError, RedisResult, ServerError};
pub use crate::parser::{parse_redis_value, Parser};
pub use crate::pipeline::Pipeline;
pub use crate::pool::{ConnectionPool, PooledConnection, Slot, MAX_POOL_SIZE};
pub use crate::script::{Script, ScriptInvocation};
pub use crate::transaction::Transaction;
pub use crate::types::{
    from_redis_value, BitOperation, ExistenceCheck, FromRedisValue, InsertPosition, RedisWrite,
    SetOptions, ShutdownMode, ToRedisArgs, Value,
};
