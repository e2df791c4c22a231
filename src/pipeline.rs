use crate::cmd::Cmd;
use crate::errors::{ErrorKind, RedisResult};
use crate::pool::PooledConnection;
use crate::types::Value;

/// A pipeline over a pinned session: fire many commands, drain many
/// replies later.
///
/// [`Pipeline::command`] writes one request without reading anything;
/// [`Pipeline::receive`] reads one reply.  The server guarantees reply
/// order equals send order, and the handle does no correlation beyond
/// counting.  Dropping the handle with unread replies closes the
/// session (its protocol position is unknown) instead of re-pooling it.
///
/// ```rust,no_run
/// # fn run() -> redlink::RedisResult<()> {
/// # let client = redlink::Client::open("redis://127.0.0.1/")?;
/// let mut pipe = client.pipeline()?;
/// pipe.command(redlink::cmd("SET").arg("a").arg(1))?;
/// pipe.command(redlink::cmd("SET").arg("b").arg(2))?;
/// pipe.command(redlink::cmd("MGET").arg(&["a", "b"]))?;
/// let replies = pipe.receive_all()?;
/// assert_eq!(replies.len(), 3);
/// # Ok(()) }
/// ```
pub struct Pipeline<'a> {
    con: PooledConnection<'a>,
    pending: usize,
}

impl<'a> Pipeline<'a> {
    pub(crate) fn new(con: PooledConnection<'a>) -> Pipeline<'a> {
        Pipeline { con, pending: 0 }
    }

    /// Sends one command without waiting for its reply.
    pub fn command(&mut self, command: &Cmd) -> RedisResult<()> {
        self.con
            .connection()
            .send_packed_command(&command.get_packed_command())?;
        self.pending += 1;
        Ok(())
    }

    /// Number of replies not yet drained.
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Reads the next reply, in send order.  Individual replies may be
    /// [`Value::Error`]; those are returned, not raised, so the drain
    /// never loses its position in the stream.
    pub fn receive(&mut self) -> RedisResult<Value> {
        if self.pending == 0 {
            fail!((
                ErrorKind::ClientError,
                "no pipelined command awaits a reply"
            ));
        }
        let reply = self.con.connection().recv_response()?;
        self.pending -= 1;
        Ok(reply)
    }

    /// Drains every outstanding reply, in send order.
    pub fn receive_all(&mut self) -> RedisResult<Vec<Value>> {
        let mut replies = Vec::with_capacity(self.pending);
        while self.pending > 0 {
            replies.push(self.receive()?);
        }
        Ok(replies)
    }

    /// Finishes the pipeline and returns the session to the pool.
    /// Equivalent to dropping the handle: with undrained replies the
    /// session is closed instead of re-pooled.
    pub fn close(self) {}
}

impl Drop for Pipeline<'_> {
    fn drop(&mut self) {
        if self.pending != 0 {
            self.con.discard();
        }
    }
}
