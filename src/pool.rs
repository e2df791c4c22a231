use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

use log::debug;

use crate::connection::{Connection, ConnectionLike};
use crate::errors::{ErrorKind, RedisResult};

/// Hard ceiling on pool capacity.
pub const MAX_POOL_SIZE: usize = 1024;

/// A bounded pool of reusable sessions.
///
/// Conceptually a fixed array of `capacity` slots where every slot is
/// either vacant (dial on demand) or holds an idle session.  At any
/// moment `vacant + idle + checked_out == capacity`.  `acquire` blocks
/// while all slots are checked out; `release` wakes one waiter.  The
/// pool never dials: a vacant permit tells the caller to dial and hand
/// the result back through `release`, which keeps dialing policy (and
/// the handshake) out of the shared structure.
pub struct ConnectionPool {
    inner: Mutex<PoolInner>,
    slot_freed: Condvar,
    capacity: usize,
}

struct PoolInner {
    idle: VecDeque<Connection>,
    vacant: usize,
    closed: bool,
}

/// What `acquire` hands out: an idle session, or a permit to dial one.
#[derive(Debug)]
pub enum Slot {
    /// A previously pooled session, still carrying its handshake state.
    Idle(Connection),
    /// An empty slot; the caller dials and hands the session back
    /// through [`ConnectionPool::release`].
    Vacant,
}

impl ConnectionPool {
    /// Creates a pool with the given capacity, clamped to
    /// `1..=MAX_POOL_SIZE`.
    pub fn new(capacity: usize) -> ConnectionPool {
        let capacity = capacity.clamp(1, MAX_POOL_SIZE);
        ConnectionPool {
            inner: Mutex::new(PoolInner {
                idle: VecDeque::with_capacity(capacity),
                vacant: capacity,
                closed: false,
            }),
            slot_freed: Condvar::new(),
            capacity,
        }
    }

    /// The fixed number of slots.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The number of idle sessions currently pooled.
    pub fn idle_count(&self) -> usize {
        self.inner.lock().expect("pool lock poisoned").idle.len()
    }

    /// Takes one slot, blocking while all are checked out.  Prefers an
    /// idle session over a vacant permit.
    pub fn acquire(&self) -> RedisResult<Slot> {
        let mut inner = self.inner.lock().expect("pool lock poisoned");
        loop {
            if inner.closed {
                fail!((ErrorKind::PoolClosed, "connection pool is closed"));
            }
            if let Some(con) = inner.idle.pop_front() {
                return Ok(Slot::Idle(con));
            }
            if inner.vacant > 0 {
                inner.vacant -= 1;
                return Ok(Slot::Vacant);
            }
            inner = self
                .slot_freed
                .wait(inner)
                .expect("pool lock poisoned");
        }
    }

    /// Returns a slot.  An open session goes back to the idle queue;
    /// `None` (or a poisoned session) becomes a vacancy so the next
    /// acquirer dials a fresh one.  Always wakes one waiter.
    pub fn release(&self, con: Option<Connection>) {
        let mut inner = self.inner.lock().expect("pool lock poisoned");
        match con {
            Some(con) if con.is_open() && !inner.closed => inner.idle.push_back(con),
            other => {
                if other.is_some() {
                    debug!("discarding dead session, slot returns vacant");
                }
                inner.vacant += 1;
            }
        }
        drop(inner);
        self.slot_freed.notify_one();
    }

    /// Closes the pool: drains and drops every idle session and wakes
    /// all waiters.  Subsequent acquires fail with `PoolClosed`.
    pub fn close(&self) {
        let mut inner = self.inner.lock().expect("pool lock poisoned");
        inner.closed = true;
        let drained = inner.idle.len();
        inner.idle.clear();
        drop(inner);
        if drained > 0 {
            debug!("pool closed, dropped {drained} idle sessions");
        }
        self.slot_freed.notify_all();
    }
}

/// RAII guard for one checked-out session.
///
/// Holds the session exclusively for the guard's lifetime and returns
/// it on drop: back to the idle queue while it is open, as a vacancy
/// once it saw EOF or was deliberately poisoned.
pub struct PooledConnection<'a> {
    pool: &'a ConnectionPool,
    con: Option<Connection>,
}

impl<'a> PooledConnection<'a> {
    pub(crate) fn new(pool: &'a ConnectionPool, con: Connection) -> PooledConnection<'a> {
        PooledConnection {
            pool,
            con: Some(con),
        }
    }

    /// The underlying session.
    pub fn connection(&mut self) -> &mut Connection {
        self.con.as_mut().expect("session already taken")
    }

    /// Swaps in a freshly dialed session, dropping the old one; its
    /// slot is accounted to the new session.
    pub(crate) fn replace(&mut self, con: Connection) {
        self.con = Some(con);
    }

    /// Drops the session now; the guard will release a vacancy.
    pub(crate) fn discard(&mut self) {
        self.con = None;
    }
}

impl Drop for PooledConnection<'_> {
    fn drop(&mut self) {
        self.pool.release(self.con.take());
    }
}

impl std::ops::Deref for PooledConnection<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        self.con.as_ref().expect("session already taken")
    }
}

impl std::ops::DerefMut for PooledConnection<'_> {
    fn deref_mut(&mut self) -> &mut Connection {
        self.con.as_mut().expect("session already taken")
    }
}
