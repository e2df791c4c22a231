use log::debug;

use crate::cmd::Cmd;
use crate::connection::{connect, Connection, ConnectionInfo, ConnectionLike, IntoConnectionInfo, PubSub};
use crate::errors::RedisResult;
use crate::pipeline::Pipeline;
use crate::pool::{ConnectionPool, PooledConnection, Slot};
use crate::transaction::Transaction;
use crate::types::{from_redis_value, FromRedisValue, Value};

/// The client.
///
/// Holds the connection parameters and a bounded pool of sessions, and
/// is safe to share across threads through `&self`: every call takes a
/// session out of the pool for exactly its own duration.  Dialing is
/// lazy; opening the client does not touch the network.
///
/// ```rust,no_run
/// # fn run() -> redlink::RedisResult<()> {
/// let client = redlink::Client::open("redis://127.0.0.1/0?timeout=5s&maxidle=4")?;
/// client.set("the_key", "42")?;
/// let value: Option<Vec<u8>> = client.get("the_key")?;
/// # Ok(()) }
/// ```
pub struct Client {
    connection_info: ConnectionInfo,
    pool: ConnectionPool,
}

impl Client {
    /// Opens a client against the given connection parameters.  This
    /// validates the parameters but performs no I/O.
    pub fn open<T: IntoConnectionInfo>(params: T) -> RedisResult<Client> {
        let connection_info = params.into_connection_info()?;
        let pool = ConnectionPool::new(connection_info.pool_size);
        Ok(Client {
            connection_info,
            pool,
        })
    }

    /// The connection parameters this client was opened with.
    pub fn connection_info(&self) -> &ConnectionInfo {
        &self.connection_info
    }

    /// Dials a dedicated session outside the pool.  Useful for raw
    /// [`Cmd::query`] access and for tests; ordinary commands go
    /// through the pooled methods instead.
    pub fn get_connection(&self) -> RedisResult<Connection> {
        connect(&self.connection_info)
    }

    /// Takes a session out of the pool, dialing (and handshaking) a
    /// fresh one when the acquired slot is vacant.
    pub(crate) fn get_pooled_connection(&self) -> RedisResult<PooledConnection<'_>> {
        match self.pool.acquire()? {
            Slot::Idle(con) => Ok(PooledConnection::new(&self.pool, con)),
            Slot::Vacant => match connect(&self.connection_info) {
                Ok(con) => Ok(PooledConnection::new(&self.pool, con)),
                Err(err) => {
                    // Hand the vacancy back, otherwise a failed dial
                    // would shrink the pool forever.
                    self.pool.release(None);
                    Err(err)
                }
            },
        }
    }

    /// Runs one command on a pooled session and returns the raw reply.
    ///
    /// When the session dies under the command (the peer closed it
    /// while idle in the pool, or mid-command), a fresh session is
    /// dialed and the command is re-sent exactly once; any further
    /// failure propagates.
    pub fn execute(&self, cmd: &Cmd) -> RedisResult<Value> {
        self.execute_packed(&cmd.get_packed_command(), true)
    }

    /// Runs one command without the reconnect-once policy.  Blocking
    /// commands and `SHUTDOWN` use this: re-sending them after a
    /// half-finished attempt would change their meaning.
    pub(crate) fn execute_no_retry(&self, cmd: &Cmd) -> RedisResult<Value> {
        self.execute_packed(&cmd.get_packed_command(), false)
    }

    fn execute_packed(&self, packed: &[u8], retry_once: bool) -> RedisResult<Value> {
        let mut guard = self.get_pooled_connection()?;
        match guard.connection().req_packed_command(packed) {
            Ok(value) => Ok(value),
            Err(err) if retry_once && err.is_connection_dropped() => {
                debug!("session dropped mid-command, reconnecting once");
                guard.discard();
                let fresh = connect(&self.connection_info)?;
                guard.replace(fresh);
                guard.connection().req_packed_command(packed)
            }
            Err(err) => Err(err),
        }
    }

    /// Projects [`Client::execute`]'s reply into a typed result.  The
    /// typed command methods are generated on top of this.
    pub fn run<T: FromRedisValue>(&self, cmd: Cmd) -> RedisResult<T> {
        from_redis_value(self.execute(&cmd)?.extract_error()?)
    }

    pub(crate) fn run_no_retry<T: FromRedisValue>(&self, cmd: Cmd) -> RedisResult<T> {
        from_redis_value(self.execute_no_retry(&cmd)?.extract_error()?)
    }

    /// Starts a transaction on a pinned session.
    ///
    /// ```rust,no_run
    /// # fn run() -> redlink::RedisResult<()> {
    /// # let client = redlink::Client::open("redis://127.0.0.1/")?;
    /// let mut tx = client.transaction()?;
    /// tx.command(redlink::cmd("INCR").arg("counter"))?;
    /// tx.command(redlink::cmd("GET").arg("counter"))?;
    /// let replies = tx.exec()?;
    /// # Ok(()) }
    /// ```
    pub fn transaction(&self) -> RedisResult<Transaction<'_>> {
        Ok(Transaction::new(self.get_pooled_connection()?))
    }

    /// Starts a pipeline on a pinned session.
    pub fn pipeline(&self) -> RedisResult<Pipeline<'_>> {
        Ok(Pipeline::new(self.get_pooled_connection()?))
    }

    /// Dials a dedicated session and puts it into subscriber mode
    /// bookkeeping.  Subscribed sessions never come from the pool: once
    /// subscribed they cannot serve request/response traffic.
    pub fn pub_sub(&self) -> RedisResult<PubSub> {
        Ok(PubSub::new(self.get_connection()?))
    }

    /// Closes the pool.  Idle sessions are dropped immediately;
    /// checked-out sessions are dropped as their holders release them.
    /// Every later call fails with `ErrorKind::PoolClosed`.
    pub fn close(&self) {
        self.pool.close();
    }

    /// The number of idle sessions currently pooled.
    pub fn idle_connections(&self) -> usize {
        self.pool.idle_count()
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("addr", &self.connection_info.addr)
            .field("db", &self.connection_info.redis.db)
            .field("pool_size", &self.connection_info.pool_size)
            .finish()
    }
}

impl ConnectionLike for Client {
    fn req_packed_command(&mut self, cmd: &[u8]) -> RedisResult<Value> {
        self.execute_packed(cmd, true)
    }

    fn req_packed_commands(
        &mut self,
        cmd: &[u8],
        offset: usize,
        count: usize,
    ) -> RedisResult<Vec<Value>> {
        let mut guard = self.get_pooled_connection()?;
        guard.connection().req_packed_commands(cmd, offset, count)
    }

    fn check_connection(&mut self) -> bool {
        self.get_pooled_connection()
            .map(|mut guard| guard.connection().check_connection())
            .unwrap_or(false)
    }

    fn is_open(&self) -> bool {
        true
    }
}
