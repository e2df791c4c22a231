use std::collections::HashMap;

use crate::client::Client;
use crate::cmd::{cmd, Cmd};
use crate::connection::ConnectionLike;
use crate::errors::{ErrorKind, RedisError, RedisResult};
use crate::types::{
    BitOperation, InsertPosition, SetOptions, ShutdownMode, ToRedisArgs, Value,
};

/// `CLIENT LIST` replies with LF-separated lines of space-separated
/// `key=value` fields; this turns them into one map per client.
fn parse_client_list(raw: &str) -> Vec<HashMap<String, String>> {
    raw.lines()
        .filter(|line| !line.is_empty())
        .map(|line| {
            line.split_whitespace()
                .filter_map(|field| {
                    field
                        .split_once('=')
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                })
                .collect()
        })
        .collect()
}

fn shutdown_reply(result: RedisResult<Value>) -> RedisResult<()> {
    match result {
        // The server closes the connection instead of replying; a
        // dropped session is the success path here.
        Err(err) if err.is_connection_dropped() => Ok(()),
        Err(err) => Err(err),
        Ok(reply) => match reply.extract_error()? {
            Value::Status(status) => fail!(RedisError::from((
                ErrorKind::ResponseError,
                "server refused to shut down",
                status,
            ))),
            other => fail!(RedisError::from((
                ErrorKind::ResponseError,
                "server refused to shut down",
                format!("{other:?}"),
            ))),
        },
    }
}

macro_rules! implement_commands {
    (
        $(
            $(#[$attr:meta])+
            fn $name:ident<$($tyargs:ident : $ty:ident),*>(
                $($argname:ident: $argty:ty),*) -> $ret:ty $body:block
        )*
    ) =>
    (
        impl Cmd {
            $(
                $(#[$attr])*
                pub fn $name<$($tyargs: $ty),*>($($argname: $argty),*) -> Cmd {
                    ::std::mem::replace($body, Cmd::new())
                }
            )*

            /// Removes and returns the head of the first non-empty list,
            /// blocking up to `timeout` seconds.
            pub fn blpop<K: ToRedisArgs>(keys: K, timeout: u64) -> Cmd {
                ::std::mem::replace(cmd("BLPOP").arg(keys).arg(timeout), Cmd::new())
            }

            /// Removes and returns the tail of the first non-empty list,
            /// blocking up to `timeout` seconds.
            pub fn brpop<K: ToRedisArgs>(keys: K, timeout: u64) -> Cmd {
                ::std::mem::replace(cmd("BRPOP").arg(keys).arg(timeout), Cmd::new())
            }

            /// Pops from `source` and pushes onto `destination`,
            /// blocking up to `timeout` seconds when `source` is empty.
            pub fn brpoplpush<S: ToRedisArgs, D: ToRedisArgs>(
                source: S,
                destination: D,
                timeout: u64,
            ) -> Cmd {
                ::std::mem::replace(
                    cmd("BRPOPLPUSH").arg(source).arg(destination).arg(timeout),
                    Cmd::new(),
                )
            }

            /// Asks the server to shut down, optionally forcing or
            /// skipping the final save.
            pub fn shutdown(mode: Option<ShutdownMode>) -> Cmd {
                ::std::mem::replace(cmd("SHUTDOWN").arg(mode), Cmd::new())
            }
        }

        /// The typed command vocabulary over any [`ConnectionLike`].
        ///
        /// Works directly on a [`Connection`](crate::Connection) and on
        /// anything that dereferences to one.  The same methods exist on
        /// [`Client`] in pooled, reconnecting form.
        ///
        /// ```rust,no_run
        /// # fn run() -> redlink::RedisResult<()> {
        /// use redlink::Commands;
        /// let client = redlink::Client::open("redis://127.0.0.1/")?;
        /// let mut con = client.get_connection()?;
        /// con.set("my_key", 42)?;
        /// assert_eq!(con.incr("my_key")?, 43);
        /// # Ok(()) }
        /// ```
        pub trait Commands: ConnectionLike + Sized {
            $(
                $(#[$attr])*
                #[inline]
                fn $name<$($tyargs: $ty),*>(&mut self $(, $argname: $argty)*) -> RedisResult<$ret> {
                    Cmd::$name($($argname),*).query(self)
                }
            )*

            /// Removes and returns the head of the first non-empty
            /// list, blocking up to `timeout` seconds.  `None` when the
            /// timeout expired; otherwise the popped `(key, element)`.
            fn blpop<K: ToRedisArgs>(
                &mut self,
                keys: K,
                timeout: u64,
            ) -> RedisResult<Option<(String, String)>> {
                Cmd::blpop(keys, timeout).query(self)
            }

            /// Removes and returns the tail of the first non-empty
            /// list, blocking up to `timeout` seconds.
            fn brpop<K: ToRedisArgs>(
                &mut self,
                keys: K,
                timeout: u64,
            ) -> RedisResult<Option<(String, String)>> {
                Cmd::brpop(keys, timeout).query(self)
            }

            /// Blocking RPOPLPUSH; `None` when the timeout expired.
            fn brpoplpush<S: ToRedisArgs, D: ToRedisArgs>(
                &mut self,
                source: S,
                destination: D,
                timeout: u64,
            ) -> RedisResult<Option<Vec<u8>>> {
                Cmd::brpoplpush(source, destination, timeout).query(self)
            }

            /// Returns one map of `key=value` properties per connected
            /// client.
            fn client_list(&mut self) -> RedisResult<Vec<HashMap<String, String>>> {
                let raw: String = cmd("CLIENT").arg("LIST").query(self)?;
                Ok(parse_client_list(&raw))
            }

            /// Asks the server to shut down.  The connection dropping
            /// without a reply is the success path; an ordinary reply
            /// means the server refused.
            fn shutdown(&mut self, mode: Option<ShutdownMode>) -> RedisResult<()> {
                shutdown_reply(
                    self.req_packed_command(&Cmd::shutdown(mode).get_packed_command()),
                )
            }
        }

        impl<T: ConnectionLike + Sized> Commands for T {}

        /// The same vocabulary in pooled form: every call checks a
        /// session out of the pool, reconnects once when the session
        /// died underneath it, and returns the session afterwards.
        impl Client {
            $(
                $(#[$attr])*
                #[inline]
                pub fn $name<$($tyargs: $ty),*>(&self $(, $argname: $argty)*) -> RedisResult<$ret> {
                    self.run(Cmd::$name($($argname),*))
                }
            )*
        }
    )
}

// Argument order and reply projections follow the server's command
// reference; variable argument lists flatten through `ToRedisArgs`.
implement_commands! {
    // ── connection ────────────────────────────────────────────────

    /// Returns the message.
    fn echo<V: ToRedisArgs>(message: V) -> String {
        cmd("ECHO").arg(message)
    }

    /// Checks that the server is alive; returns `PONG`.
    fn ping<>() -> String {
        &mut cmd("PING")
    }

    // ── keys ──────────────────────────────────────────────────────

    /// Removes the given keys; returns how many existed.
    fn del<K: ToRedisArgs>(keys: K) -> i64 {
        cmd("DEL").arg(keys)
    }

    /// Serializes the value at `key` into an opaque blob, `None` when
    /// the key does not exist.
    fn dump<K: ToRedisArgs>(key: K) -> Option<Vec<u8>> {
        cmd("DUMP").arg(key)
    }

    /// Returns whether `key` exists.
    fn exists<K: ToRedisArgs>(key: K) -> bool {
        cmd("EXISTS").arg(key)
    }

    /// Sets a timeout in seconds on `key`.
    fn expire<K: ToRedisArgs>(key: K, seconds: i64) -> bool {
        cmd("EXPIRE").arg(key).arg(seconds)
    }

    /// Sets an absolute expiration timestamp (unix seconds) on `key`.
    fn expireat<K: ToRedisArgs>(key: K, timestamp: i64) -> bool {
        cmd("EXPIREAT").arg(key).arg(timestamp)
    }

    /// Returns all keys matching the glob pattern.
    fn keys<P: ToRedisArgs>(pattern: P) -> Vec<String> {
        cmd("KEYS").arg(pattern)
    }

    /// Moves `key` into another database.
    fn move_key<K: ToRedisArgs>(key: K, db: i64) -> bool {
        cmd("MOVE").arg(key).arg(db)
    }

    /// Removes the timeout from `key`.
    fn persist<K: ToRedisArgs>(key: K) -> bool {
        cmd("PERSIST").arg(key)
    }

    /// Sets a timeout in milliseconds on `key`.
    fn pexpire<K: ToRedisArgs>(key: K, milliseconds: i64) -> bool {
        cmd("PEXPIRE").arg(key).arg(milliseconds)
    }

    /// Sets an absolute expiration timestamp (unix milliseconds).
    fn pexpireat<K: ToRedisArgs>(key: K, timestamp: i64) -> bool {
        cmd("PEXPIREAT").arg(key).arg(timestamp)
    }

    /// Remaining time to live in milliseconds (negative when absent or
    /// persistent).
    fn pttl<K: ToRedisArgs>(key: K) -> i64 {
        cmd("PTTL").arg(key)
    }

    /// Returns a random key, `None` when the database is empty.
    fn randomkey<>() -> Option<String> {
        &mut cmd("RANDOMKEY")
    }

    /// Renames `key`, overwriting the destination.
    fn rename<K: ToRedisArgs, N: ToRedisArgs>(key: K, newkey: N) -> () {
        cmd("RENAME").arg(key).arg(newkey)
    }

    /// Renames `key` unless the destination exists.
    fn renamenx<K: ToRedisArgs, N: ToRedisArgs>(key: K, newkey: N) -> bool {
        cmd("RENAMENX").arg(key).arg(newkey)
    }

    /// Recreates a key from a `DUMP` blob, with a TTL in milliseconds
    /// (0 for none).
    fn restore<K: ToRedisArgs, B: ToRedisArgs>(key: K, ttl: i64, serialized: B) -> () {
        cmd("RESTORE").arg(key).arg(ttl).arg(serialized)
    }

    /// Incrementally iterates the keyspace.  Returns the next cursor
    /// and a batch of keys; iteration ends when the cursor is 0.
    fn scan<P: ToRedisArgs>(cursor: u64, pattern: Option<P>, count: Option<u64>) -> (u64, Vec<String>) {
        cmd("SCAN")
            .arg(cursor)
            .arg(pattern.map(|p| ("MATCH", p)))
            .arg(count.map(|c| ("COUNT", c)))
    }

    /// Remaining time to live in seconds (negative when absent or
    /// persistent).
    fn ttl<K: ToRedisArgs>(key: K) -> i64 {
        cmd("TTL").arg(key)
    }

    /// Returns the storage type of `key` (`string`, `list`, ... or
    /// `none`).
    fn key_type<K: ToRedisArgs>(key: K) -> String {
        cmd("TYPE").arg(key)
    }

    // ── strings ───────────────────────────────────────────────────

    /// Appends to the string at `key`; returns the new length.
    fn append<K: ToRedisArgs, V: ToRedisArgs>(key: K, value: V) -> i64 {
        cmd("APPEND").arg(key).arg(value)
    }

    /// Counts the set bits in the whole string.
    fn bitcount<K: ToRedisArgs>(key: K) -> i64 {
        cmd("BITCOUNT").arg(key)
    }

    /// Counts the set bits within the byte range `[start, end]`.
    fn bitcount_range<K: ToRedisArgs>(key: K, start: i64, end: i64) -> i64 {
        cmd("BITCOUNT").arg(key).arg(start).arg(end)
    }

    /// Combines the source keys bitwise into `destkey`; returns the
    /// length of the result.
    fn bitop<D: ToRedisArgs, K: ToRedisArgs>(operation: BitOperation, destkey: D, srckeys: K) -> i64 {
        cmd("BITOP").arg(operation).arg(destkey).arg(srckeys)
    }

    /// Decrements the integer at `key` by one.
    fn decr<K: ToRedisArgs>(key: K) -> i64 {
        cmd("DECR").arg(key)
    }

    /// Decrements the integer at `key` by `decrement`.
    fn decrby<K: ToRedisArgs>(key: K, decrement: i64) -> i64 {
        cmd("DECRBY").arg(key).arg(decrement)
    }

    /// Returns the value of `key`, `None` when it does not exist.
    fn get<K: ToRedisArgs>(key: K) -> Option<Vec<u8>> {
        cmd("GET").arg(key)
    }

    /// Returns the bit at `offset`.
    fn getbit<K: ToRedisArgs>(key: K, offset: i64) -> i64 {
        cmd("GETBIT").arg(key).arg(offset)
    }

    /// Returns the substring between the inclusive offsets, which may
    /// be negative to count from the end.
    fn getrange<K: ToRedisArgs>(key: K, start: i64, end: i64) -> String {
        cmd("GETRANGE").arg(key).arg(start).arg(end)
    }

    /// Atomically replaces the value and returns the old one.
    fn getset<K: ToRedisArgs, V: ToRedisArgs>(key: K, value: V) -> Option<Vec<u8>> {
        cmd("GETSET").arg(key).arg(value)
    }

    /// Increments the integer at `key` by one.
    fn incr<K: ToRedisArgs>(key: K) -> i64 {
        cmd("INCR").arg(key)
    }

    /// Increments the integer at `key` by `increment`.
    fn incrby<K: ToRedisArgs>(key: K, increment: i64) -> i64 {
        cmd("INCRBY").arg(key).arg(increment)
    }

    /// Increments the float at `key`; returns the new value.
    fn incrbyfloat<K: ToRedisArgs>(key: K, increment: f64) -> f64 {
        cmd("INCRBYFLOAT").arg(key).arg(increment)
    }

    /// Returns the values of all keys, `None` per missing key.
    fn mget<K: ToRedisArgs>(keys: K) -> Vec<Option<Vec<u8>>> {
        cmd("MGET").arg(keys)
    }

    /// Sets all given key/value pairs at once.
    fn mset<K: ToRedisArgs, V: ToRedisArgs>(items: &[(K, V)]) -> () {
        cmd("MSET").arg(items)
    }

    /// Sets all given pairs unless any key already exists.
    fn msetnx<K: ToRedisArgs, V: ToRedisArgs>(items: &[(K, V)]) -> bool {
        cmd("MSETNX").arg(items)
    }

    /// `SETEX` with the expiry in milliseconds.
    fn psetex<K: ToRedisArgs, V: ToRedisArgs>(key: K, milliseconds: u64, value: V) -> () {
        cmd("PSETEX").arg(key).arg(milliseconds).arg(value)
    }

    /// Sets `key` to `value`, unconditionally and without expiry.
    fn set<K: ToRedisArgs, V: ToRedisArgs>(key: K, value: V) -> () {
        cmd("SET").arg(key).arg(value)
    }

    /// `SET` with expiry and existence options; `None` when an NX/XX
    /// condition was not met.
    fn set_options<K: ToRedisArgs, V: ToRedisArgs>(key: K, value: V, options: SetOptions) -> Option<String> {
        cmd("SET").arg(key).arg(value).arg(options)
    }

    /// Sets or clears one bit; returns the previous bit value.
    fn setbit<K: ToRedisArgs>(key: K, offset: i64, value: i64) -> i64 {
        cmd("SETBIT").arg(key).arg(offset).arg(value)
    }

    /// Sets `key` with an expiry in seconds.
    fn setex<K: ToRedisArgs, V: ToRedisArgs>(key: K, seconds: u64, value: V) -> () {
        cmd("SETEX").arg(key).arg(seconds).arg(value)
    }

    /// Sets `key` only if it does not exist.
    fn setnx<K: ToRedisArgs, V: ToRedisArgs>(key: K, value: V) -> bool {
        cmd("SETNX").arg(key).arg(value)
    }

    /// Overwrites part of the string starting at `offset`; returns the
    /// new length.
    fn setrange<K: ToRedisArgs, V: ToRedisArgs>(key: K, offset: i64, value: V) -> i64 {
        cmd("SETRANGE").arg(key).arg(offset).arg(value)
    }

    /// Returns the length of the string at `key`.
    fn strlen<K: ToRedisArgs>(key: K) -> i64 {
        cmd("STRLEN").arg(key)
    }

    // ── hashes ────────────────────────────────────────────────────

    /// Removes the given fields; returns how many existed.
    fn hdel<K: ToRedisArgs, F: ToRedisArgs>(key: K, fields: F) -> i64 {
        cmd("HDEL").arg(key).arg(fields)
    }

    /// Returns whether `field` exists in the hash.
    fn hexists<K: ToRedisArgs, F: ToRedisArgs>(key: K, field: F) -> bool {
        cmd("HEXISTS").arg(key).arg(field)
    }

    /// Returns the value of one hash field.
    fn hget<K: ToRedisArgs, F: ToRedisArgs>(key: K, field: F) -> Option<Vec<u8>> {
        cmd("HGET").arg(key).arg(field)
    }

    /// Returns every field and value of the hash.
    fn hgetall<K: ToRedisArgs>(key: K) -> HashMap<String, String> {
        cmd("HGETALL").arg(key)
    }

    /// Increments the integer in `field` by `increment`.
    fn hincrby<K: ToRedisArgs, F: ToRedisArgs>(key: K, field: F, increment: i64) -> i64 {
        cmd("HINCRBY").arg(key).arg(field).arg(increment)
    }

    /// Increments the float in `field`; returns the new value.
    fn hincrbyfloat<K: ToRedisArgs, F: ToRedisArgs>(key: K, field: F, increment: f64) -> f64 {
        cmd("HINCRBYFLOAT").arg(key).arg(field).arg(increment)
    }

    /// Returns all field names of the hash.
    fn hkeys<K: ToRedisArgs>(key: K) -> Vec<String> {
        cmd("HKEYS").arg(key)
    }

    /// Returns the number of fields in the hash.
    fn hlen<K: ToRedisArgs>(key: K) -> i64 {
        cmd("HLEN").arg(key)
    }

    /// Returns the values of the given fields, `None` per missing
    /// field.
    fn hmget<K: ToRedisArgs, F: ToRedisArgs>(key: K, fields: F) -> Vec<Option<Vec<u8>>> {
        cmd("HMGET").arg(key).arg(fields)
    }

    /// Sets several hash fields at once; `items` flattens to
    /// field/value pairs (a map or a slice of pairs).
    fn hmset<K: ToRedisArgs, I: ToRedisArgs>(key: K, items: I) -> () {
        cmd("HMSET").arg(key).arg(items)
    }

    /// Sets one hash field; true when the field was newly created.
    fn hset<K: ToRedisArgs, F: ToRedisArgs, V: ToRedisArgs>(key: K, field: F, value: V) -> bool {
        cmd("HSET").arg(key).arg(field).arg(value)
    }

    /// Sets one hash field only if it does not exist yet.
    fn hsetnx<K: ToRedisArgs, F: ToRedisArgs, V: ToRedisArgs>(key: K, field: F, value: V) -> bool {
        cmd("HSETNX").arg(key).arg(field).arg(value)
    }

    /// Returns all values of the hash.
    fn hvals<K: ToRedisArgs>(key: K) -> Vec<String> {
        cmd("HVALS").arg(key)
    }

    // ── lists ─────────────────────────────────────────────────────

    /// Returns the element at `index`, negative indexes counting from
    /// the tail.
    fn lindex<K: ToRedisArgs>(key: K, index: i64) -> Option<Vec<u8>> {
        cmd("LINDEX").arg(key).arg(index)
    }

    /// Inserts `value` next to `pivot`; returns the new length, or -1
    /// when the pivot was not found.
    fn linsert<K: ToRedisArgs, P: ToRedisArgs, V: ToRedisArgs>(key: K, position: InsertPosition, pivot: P, value: V) -> i64 {
        cmd("LINSERT").arg(key).arg(position).arg(pivot).arg(value)
    }

    /// Returns the length of the list.
    fn llen<K: ToRedisArgs>(key: K) -> i64 {
        cmd("LLEN").arg(key)
    }

    /// Removes and returns the head of the list.
    fn lpop<K: ToRedisArgs>(key: K) -> Option<Vec<u8>> {
        cmd("LPOP").arg(key)
    }

    /// Prepends the values; returns the new length.
    fn lpush<K: ToRedisArgs, V: ToRedisArgs>(key: K, values: V) -> i64 {
        cmd("LPUSH").arg(key).arg(values)
    }

    /// Prepends only when the list already exists.
    fn lpushx<K: ToRedisArgs, V: ToRedisArgs>(key: K, value: V) -> i64 {
        cmd("LPUSHX").arg(key).arg(value)
    }

    /// Returns the inclusive range `[start, stop]` of the list.
    fn lrange<K: ToRedisArgs>(key: K, start: i64, stop: i64) -> Vec<String> {
        cmd("LRANGE").arg(key).arg(start).arg(stop)
    }

    /// Removes occurrences of `value` (head-to-tail for positive
    /// `count`, tail-to-head for negative, all for zero).
    fn lrem<K: ToRedisArgs, V: ToRedisArgs>(key: K, count: i64, value: V) -> i64 {
        cmd("LREM").arg(key).arg(count).arg(value)
    }

    /// Replaces the element at `index`.
    fn lset<K: ToRedisArgs, V: ToRedisArgs>(key: K, index: i64, value: V) -> () {
        cmd("LSET").arg(key).arg(index).arg(value)
    }

    /// Trims the list to the inclusive range `[start, stop]`.
    fn ltrim<K: ToRedisArgs>(key: K, start: i64, stop: i64) -> () {
        cmd("LTRIM").arg(key).arg(start).arg(stop)
    }

    /// Removes and returns the tail of the list.
    fn rpop<K: ToRedisArgs>(key: K) -> Option<Vec<u8>> {
        cmd("RPOP").arg(key)
    }

    /// Atomically pops the tail of `source` and pushes it onto the
    /// head of `destination`.
    fn rpoplpush<S: ToRedisArgs, D: ToRedisArgs>(source: S, destination: D) -> Option<Vec<u8>> {
        cmd("RPOPLPUSH").arg(source).arg(destination)
    }

    /// Appends the values; returns the new length.
    fn rpush<K: ToRedisArgs, V: ToRedisArgs>(key: K, values: V) -> i64 {
        cmd("RPUSH").arg(key).arg(values)
    }

    /// Appends only when the list already exists.
    fn rpushx<K: ToRedisArgs, V: ToRedisArgs>(key: K, value: V) -> i64 {
        cmd("RPUSHX").arg(key).arg(value)
    }

    // ── sets ──────────────────────────────────────────────────────

    /// Adds the members; returns how many were new.
    fn sadd<K: ToRedisArgs, M: ToRedisArgs>(key: K, members: M) -> i64 {
        cmd("SADD").arg(key).arg(members)
    }

    /// Returns the cardinality of the set.
    fn scard<K: ToRedisArgs>(key: K) -> i64 {
        cmd("SCARD").arg(key)
    }

    /// Returns the difference between the first set and the rest.
    fn sdiff<K: ToRedisArgs>(keys: K) -> Vec<String> {
        cmd("SDIFF").arg(keys)
    }

    /// Stores the difference into `destination`; returns its size.
    fn sdiffstore<D: ToRedisArgs, K: ToRedisArgs>(destination: D, keys: K) -> i64 {
        cmd("SDIFFSTORE").arg(destination).arg(keys)
    }

    /// Returns the intersection of the sets.
    fn sinter<K: ToRedisArgs>(keys: K) -> Vec<String> {
        cmd("SINTER").arg(keys)
    }

    /// Stores the intersection into `destination`; returns its size.
    fn sinterstore<D: ToRedisArgs, K: ToRedisArgs>(destination: D, keys: K) -> i64 {
        cmd("SINTERSTORE").arg(destination).arg(keys)
    }

    /// Returns whether `member` is in the set.
    fn sismember<K: ToRedisArgs, M: ToRedisArgs>(key: K, member: M) -> bool {
        cmd("SISMEMBER").arg(key).arg(member)
    }

    /// Returns every member of the set.
    fn smembers<K: ToRedisArgs>(key: K) -> Vec<String> {
        cmd("SMEMBERS").arg(key)
    }

    /// Atomically moves `member` between sets.
    fn smove<S: ToRedisArgs, D: ToRedisArgs, M: ToRedisArgs>(source: S, destination: D, member: M) -> bool {
        cmd("SMOVE").arg(source).arg(destination).arg(member)
    }

    /// Removes and returns a random member.
    fn spop<K: ToRedisArgs>(key: K) -> Option<Vec<u8>> {
        cmd("SPOP").arg(key)
    }

    /// Returns a random member without removing it.
    fn srandmember<K: ToRedisArgs>(key: K) -> Option<Vec<u8>> {
        cmd("SRANDMEMBER").arg(key)
    }

    /// Returns `count` random members (repeats allowed when `count` is
    /// negative).
    fn srandmember_count<K: ToRedisArgs>(key: K, count: i64) -> Vec<String> {
        cmd("SRANDMEMBER").arg(key).arg(count)
    }

    /// Removes the members; returns how many were present.
    fn srem<K: ToRedisArgs, M: ToRedisArgs>(key: K, members: M) -> i64 {
        cmd("SREM").arg(key).arg(members)
    }

    /// Returns the union of the sets.
    fn sunion<K: ToRedisArgs>(keys: K) -> Vec<String> {
        cmd("SUNION").arg(keys)
    }

    /// Stores the union into `destination`; returns its size.
    fn sunionstore<D: ToRedisArgs, K: ToRedisArgs>(destination: D, keys: K) -> i64 {
        cmd("SUNIONSTORE").arg(destination).arg(keys)
    }

    // ── sorted sets ───────────────────────────────────────────────

    /// Adds the `(score, member)` pairs; returns how many members were
    /// new.
    fn zadd<K: ToRedisArgs, M: ToRedisArgs>(key: K, items: &[(f64, M)]) -> i64 {
        cmd("ZADD").arg(key).arg(items)
    }

    /// Returns the cardinality of the sorted set.
    fn zcard<K: ToRedisArgs>(key: K) -> i64 {
        cmd("ZCARD").arg(key)
    }

    /// Counts members with scores inside the range; `min`/`max` accept
    /// the score-range grammar (`-inf`, `(1.5`, ...).
    fn zcount<K: ToRedisArgs>(key: K, min: &str, max: &str) -> i64 {
        cmd("ZCOUNT").arg(key).arg(min).arg(max)
    }

    /// Increments a member's score; returns the new score.
    fn zincrby<K: ToRedisArgs, M: ToRedisArgs>(key: K, increment: f64, member: M) -> f64 {
        cmd("ZINCRBY").arg(key).arg(increment).arg(member)
    }

    /// Returns the members with ranks in `[start, stop]`, lowest score
    /// first.
    fn zrange<K: ToRedisArgs>(key: K, start: i64, stop: i64) -> Vec<String> {
        cmd("ZRANGE").arg(key).arg(start).arg(stop)
    }

    /// Like `zrange`, with each member followed by its score.
    fn zrange_withscores<K: ToRedisArgs>(key: K, start: i64, stop: i64) -> Vec<String> {
        cmd("ZRANGE").arg(key).arg(start).arg(stop).arg("WITHSCORES")
    }

    /// Returns members with scores inside the range, with an optional
    /// `(offset, count)` window.
    fn zrangebyscore<K: ToRedisArgs>(key: K, min: &str, max: &str, limit: Option<(i64, i64)>) -> Vec<String> {
        cmd("ZRANGEBYSCORE")
            .arg(key)
            .arg(min)
            .arg(max)
            .arg(limit.map(|(offset, count)| ("LIMIT", offset, count)))
    }

    /// Returns a member's ascending rank, `None` when absent.
    fn zrank<K: ToRedisArgs, M: ToRedisArgs>(key: K, member: M) -> Option<i64> {
        cmd("ZRANK").arg(key).arg(member)
    }

    /// Removes the members; returns how many were present.
    fn zrem<K: ToRedisArgs, M: ToRedisArgs>(key: K, members: M) -> i64 {
        cmd("ZREM").arg(key).arg(members)
    }

    /// Removes members with ranks inside `[start, stop]`.
    fn zremrangebyrank<K: ToRedisArgs>(key: K, start: i64, stop: i64) -> i64 {
        cmd("ZREMRANGEBYRANK").arg(key).arg(start).arg(stop)
    }

    /// Removes members with scores inside the range.
    fn zremrangebyscore<K: ToRedisArgs>(key: K, min: &str, max: &str) -> i64 {
        cmd("ZREMRANGEBYSCORE").arg(key).arg(min).arg(max)
    }

    /// Returns the members with ranks in `[start, stop]`, highest
    /// score first.
    fn zrevrange<K: ToRedisArgs>(key: K, start: i64, stop: i64) -> Vec<String> {
        cmd("ZREVRANGE").arg(key).arg(start).arg(stop)
    }

    /// Like `zrevrange`, with each member followed by its score.
    fn zrevrange_withscores<K: ToRedisArgs>(key: K, start: i64, stop: i64) -> Vec<String> {
        cmd("ZREVRANGE").arg(key).arg(start).arg(stop).arg("WITHSCORES")
    }

    /// Returns members with scores inside the range, highest first,
    /// with an optional `(offset, count)` window.
    fn zrevrangebyscore<K: ToRedisArgs>(key: K, max: &str, min: &str, limit: Option<(i64, i64)>) -> Vec<String> {
        cmd("ZREVRANGEBYSCORE")
            .arg(key)
            .arg(max)
            .arg(min)
            .arg(limit.map(|(offset, count)| ("LIMIT", offset, count)))
    }

    /// Returns a member's descending rank, `None` when absent.
    fn zrevrank<K: ToRedisArgs, M: ToRedisArgs>(key: K, member: M) -> Option<i64> {
        cmd("ZREVRANK").arg(key).arg(member)
    }

    /// Returns a member's score, `None` when absent.
    fn zscore<K: ToRedisArgs, M: ToRedisArgs>(key: K, member: M) -> Option<f64> {
        cmd("ZSCORE").arg(key).arg(member)
    }

    // ── hyperloglog ───────────────────────────────────────────────

    /// Adds the elements to the HyperLogLog; true when an internal
    /// register changed.
    fn pfadd<K: ToRedisArgs, E: ToRedisArgs>(key: K, elements: E) -> bool {
        cmd("PFADD").arg(key).arg(elements)
    }

    /// Returns the approximate cardinality of the union of the given
    /// HyperLogLogs.
    fn pfcount<K: ToRedisArgs>(keys: K) -> i64 {
        cmd("PFCOUNT").arg(keys)
    }

    /// Merges the source HyperLogLogs into `destkey`.
    fn pfmerge<D: ToRedisArgs, S: ToRedisArgs>(destkey: D, sourcekeys: S) -> () {
        cmd("PFMERGE").arg(destkey).arg(sourcekeys)
    }

    // ── pub/sub ───────────────────────────────────────────────────

    /// Publishes a message; returns the number of receiving
    /// subscribers.
    fn publish<C: ToRedisArgs, M: ToRedisArgs>(channel: C, message: M) -> i64 {
        cmd("PUBLISH").arg(channel).arg(message)
    }

    // ── scripting ─────────────────────────────────────────────────

    /// Evaluates a Lua script with the given keys and arguments; the
    /// reply shape depends on the script.
    fn eval<K: ToRedisArgs, A: ToRedisArgs>(script: &str, keys: &[K], args: &[A]) -> Value {
        cmd("EVAL").arg(script).arg(keys.len()).arg(keys).arg(args)
    }

    /// Evaluates a cached script by its SHA1 digest.
    fn evalsha<K: ToRedisArgs, A: ToRedisArgs>(sha1: &str, keys: &[K], args: &[A]) -> Value {
        cmd("EVALSHA").arg(sha1).arg(keys.len()).arg(keys).arg(args)
    }

    /// Reports, per digest, whether the script is cached.
    fn script_exists<S: ToRedisArgs>(sha1s: S) -> Vec<bool> {
        cmd("SCRIPT").arg("EXISTS").arg(sha1s)
    }

    /// Flushes the script cache.
    fn script_flush<>() -> () {
        cmd("SCRIPT").arg("FLUSH")
    }

    /// Kills the currently running script, if it has not written yet.
    fn script_kill<>() -> () {
        cmd("SCRIPT").arg("KILL")
    }

    /// Loads a script into the cache; returns its SHA1 digest.
    fn script_load<>(script: &str) -> String {
        cmd("SCRIPT").arg("LOAD").arg(script)
    }

    // ── server ────────────────────────────────────────────────────

    /// Starts an append-only-file rewrite in the background.
    fn bgrewriteaof<>() -> String {
        &mut cmd("BGREWRITEAOF")
    }

    /// Saves the dataset in the background.
    fn bgsave<>() -> String {
        &mut cmd("BGSAVE")
    }

    /// Returns the connection's name, `None` when unset.
    fn client_getname<>() -> Option<String> {
        cmd("CLIENT").arg("GETNAME")
    }

    /// Closes the server-side connection at `addr` (`ip:port`).
    fn client_kill<>(addr: &str) -> () {
        cmd("CLIENT").arg("KILL").arg(addr)
    }

    /// Names the current connection.
    fn client_setname<N: ToRedisArgs>(name: N) -> () {
        cmd("CLIENT").arg("SETNAME").arg(name)
    }

    /// Reads configuration parameters matching the glob pattern.
    fn config_get<>(parameter: &str) -> HashMap<String, String> {
        cmd("CONFIG").arg("GET").arg(parameter)
    }

    /// Resets the statistics reported by `INFO`.
    fn config_resetstat<>() -> () {
        cmd("CONFIG").arg("RESETSTAT")
    }

    /// Rewrites the configuration file with the running configuration.
    fn config_rewrite<>() -> () {
        cmd("CONFIG").arg("REWRITE")
    }

    /// Sets one configuration parameter at runtime.
    fn config_set<V: ToRedisArgs>(parameter: &str, value: V) -> () {
        cmd("CONFIG").arg("SET").arg(parameter).arg(value)
    }

    /// Returns the number of keys in the selected database.
    fn dbsize<>() -> i64 {
        &mut cmd("DBSIZE")
    }

    /// Removes every key in every database.
    fn flushall<>() -> () {
        &mut cmd("FLUSHALL")
    }

    /// Removes every key in the selected database.
    fn flushdb<>() -> () {
        &mut cmd("FLUSHDB")
    }

    /// Returns server information and statistics, optionally narrowed
    /// to one section.
    fn info<>(section: Option<&str>) -> String {
        cmd("INFO").arg(section)
    }

    /// Unix timestamp of the last successful save.
    fn lastsave<>() -> i64 {
        &mut cmd("LASTSAVE")
    }

    /// Synchronously saves the dataset to disk.
    fn save<>() -> () {
        &mut cmd("SAVE")
    }

    /// Changes replication settings (`SLAVEOF NO ONE` promotes to
    /// master).
    fn slaveof<>(host: &str, port: &str) -> () {
        cmd("SLAVEOF").arg(host).arg(port)
    }

    /// Returns the server clock as `(unix_seconds, microseconds)`.
    fn time<>() -> (u64, u64) {
        &mut cmd("TIME")
    }
}

/// Pooled counterparts of the commands that need special plumbing:
/// blocking list pops and `SHUTDOWN` must not be re-sent after an EOF
/// mid-attempt, and `CLIENT LIST` post-processes its reply.
impl Client {
    /// Removes and returns the head of the first non-empty list,
    /// blocking up to `timeout` seconds (0 blocks forever).  `None`
    /// when the timeout expired.  Never retried on EOF: the pop may
    /// have happened on the lost session.
    pub fn blpop<K: ToRedisArgs>(
        &self,
        keys: K,
        timeout: u64,
    ) -> RedisResult<Option<(String, String)>> {
        self.run_no_retry(Cmd::blpop(keys, timeout))
    }

    /// Removes and returns the tail of the first non-empty list,
    /// blocking up to `timeout` seconds.  Never retried on EOF.
    pub fn brpop<K: ToRedisArgs>(
        &self,
        keys: K,
        timeout: u64,
    ) -> RedisResult<Option<(String, String)>> {
        self.run_no_retry(Cmd::brpop(keys, timeout))
    }

    /// Blocking `RPOPLPUSH`; `None` when the timeout expired.  Never
    /// retried on EOF.
    pub fn brpoplpush<S: ToRedisArgs, D: ToRedisArgs>(
        &self,
        source: S,
        destination: D,
        timeout: u64,
    ) -> RedisResult<Option<Vec<u8>>> {
        self.run_no_retry(Cmd::brpoplpush(source, destination, timeout))
    }

    /// Returns one map of `key=value` properties per connected client.
    pub fn client_list(&self) -> RedisResult<Vec<HashMap<String, String>>> {
        let raw: String = {
            let mut command = cmd("CLIENT");
            command.arg("LIST");
            self.run(command)?
        };
        Ok(parse_client_list(&raw))
    }

    /// Asks the server to shut down.  The session dropping without a
    /// reply is the success path; an ordinary reply means the server
    /// refused and its status is surfaced as the error detail.
    pub fn shutdown(&self, mode: Option<ShutdownMode>) -> RedisResult<()> {
        shutdown_reply(self.execute_no_retry(&Cmd::shutdown(mode)))
    }

    /// Variant of [`Client::scan`] without pattern or count, as a
    /// convenience for full keyspace walks.
    pub fn scan_all_step(&self, cursor: u64) -> RedisResult<(u64, Vec<String>)> {
        self.scan::<&str>(cursor, None, None)
    }
}
