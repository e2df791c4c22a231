use crate::cmd::{cmd, Cmd};
use crate::connection::ConnectionLike;
use crate::errors::{ErrorKind, RedisResult};
use crate::pool::PooledConnection;
use crate::types::{ToRedisArgs, Value};

/// A MULTI/EXEC transaction over a pinned session.
///
/// The session is exclusively owned for the handle's lifetime and goes
/// back to the pool when the handle is dropped.  Commands queued with
/// [`Transaction::command`] are acknowledged by the server with a
/// `QUEUED` status and executed atomically by [`Transaction::exec`],
/// whose reply carries one element per queued command in send order
/// (individual elements may be [`Value::Error`]).
///
/// `WATCH` must precede the MULTI block on the wire, so the handle
/// opens the block lazily: [`Transaction::watch`] is legal until the
/// first queued command, after which the keys are armed and the block
/// is open.
///
/// ```rust,no_run
/// # fn run() -> redlink::RedisResult<()> {
/// # let client = redlink::Client::open("redis://127.0.0.1/")?;
/// let mut tx = client.transaction()?;
/// tx.watch("balance")?;
/// tx.command(redlink::cmd("DECRBY").arg("balance").arg(10))?;
/// tx.command(redlink::cmd("INCRBY").arg("spent").arg(10))?;
/// let replies = tx.exec()?;
/// if replies.is_empty() {
///     // the watched key changed under us; nothing was executed
/// }
/// # Ok(()) }
/// ```
pub struct Transaction<'a> {
    con: PooledConnection<'a>,
    queued: usize,
    multi_open: bool,
    finished: bool,
}

impl<'a> Transaction<'a> {
    pub(crate) fn new(con: PooledConnection<'a>) -> Transaction<'a> {
        Transaction {
            con,
            queued: 0,
            multi_open: false,
            finished: false,
        }
    }

    fn expect_status(&mut self, command: &Cmd, want: &str) -> RedisResult<()> {
        let reply = self
            .con
            .connection()
            .req_packed_command(&command.get_packed_command())?
            .extract_error()?;
        match reply {
            Value::Status(ref s) if s == want => Ok(()),
            other => fail!((
                ErrorKind::TransactionDesync,
                "unexpected transaction acknowledgment",
                format!("expected {want}, got {other:?}"),
            )),
        }
    }

    fn open_multi(&mut self) -> RedisResult<()> {
        if !self.multi_open {
            self.expect_status(&cmd("MULTI"), "OK")?;
            self.multi_open = true;
        }
        Ok(())
    }

    /// Marks keys for optimistic locking.  Only legal before the first
    /// queued command; the server refuses WATCH inside an open block.
    pub fn watch<K: ToRedisArgs>(&mut self, keys: K) -> RedisResult<()> {
        if self.multi_open {
            fail!((
                ErrorKind::ClientError,
                "WATCH is only allowed before the first queued command"
            ));
        }
        self.expect_status(cmd("WATCH").arg(keys), "OK")
    }

    /// Drops all watches armed on this session.
    pub fn unwatch(&mut self) -> RedisResult<()> {
        if self.multi_open {
            fail!((
                ErrorKind::ClientError,
                "UNWATCH is only allowed before the first queued command"
            ));
        }
        self.expect_status(&cmd("UNWATCH"), "OK")
    }

    /// Queues one command, validating the server's `QUEUED`
    /// acknowledgment.  A server error on queueing propagates; any
    /// other acknowledgment is a desync.
    pub fn command(&mut self, command: &Cmd) -> RedisResult<()> {
        self.open_multi()?;
        self.expect_status(command, "QUEUED")?;
        self.queued += 1;
        Ok(())
    }

    /// Number of commands the server has acknowledged as queued.
    pub fn queued_count(&self) -> usize {
        self.queued
    }

    /// Executes the queued commands atomically.
    ///
    /// Returns one reply per queued command in send order.  An empty
    /// vector means a watched key changed and the block was not run;
    /// with no commands queued the two cases coincide and are both
    /// harmless.  A reply whose length disagrees with the queued count
    /// is a [`ErrorKind::TransactionDesync`].
    pub fn exec(mut self) -> RedisResult<Vec<Value>> {
        self.open_multi()?;
        let reply = self
            .con
            .connection()
            .req_packed_command(&cmd("EXEC").get_packed_command())?;
        // EXEC ends the block win or lose; the session is clean again.
        self.finished = true;
        match reply.extract_error()? {
            // A tripped watch aborts the block: an ordered empty
            // result, not a protocol error.
            Value::Bulk(None) => Ok(vec![]),
            Value::Bulk(Some(replies)) if replies.len() == self.queued => Ok(replies),
            Value::Bulk(Some(replies)) => fail!((
                ErrorKind::TransactionDesync,
                "EXEC reply length disagrees with queued count",
                format!("queued {}, got {}", self.queued, replies.len()),
            )),
            other => fail!((
                ErrorKind::TransactionDesync,
                "EXEC did not return a multi bulk reply",
                format!("{other:?}"),
            )),
        }
    }

    /// Discards the queued commands and releases any watches.
    pub fn discard(mut self) -> RedisResult<()> {
        self.discard_inner()
    }

    fn discard_inner(&mut self) -> RedisResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        if self.multi_open {
            self.expect_status(&cmd("DISCARD"), "OK")
        } else if self.queued == 0 {
            // Nothing armed but possibly a watch; clear it so the
            // session re-pools clean.
            self.expect_status(&cmd("UNWATCH"), "OK")
        } else {
            Ok(())
        }
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if !self.finished && self.discard_inner().is_err() {
            // The session state is unknown; make sure the pool
            // replaces it instead of reusing it.
            self.con.discard();
        }
    }
}
