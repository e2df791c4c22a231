use sha1_smol::Sha1;

use crate::cmd::cmd;
use crate::connection::ConnectionLike;
use crate::errors::RedisResult;
use crate::types::{FromRedisValue, ToRedisArgs};

/// A Lua script with its SHA1 digest precomputed.
///
/// Invocation goes through `EVALSHA` first; when the server does not
/// have the script cached yet it is uploaded with `SCRIPT LOAD` and the
/// call is repeated, so the script body crosses the wire at most once
/// per server.  The object is immutable and can be shared freely.
///
/// ```rust,no_run
/// # let client = redlink::Client::open("redis://127.0.0.1/").unwrap();
/// # let mut con = client.get_connection().unwrap();
/// let script = redlink::Script::new(r"
///     return tonumber(ARGV[1]) + tonumber(ARGV[2]);
/// ");
/// let result: i64 = script.arg(1).arg(2).invoke(&mut con).unwrap();
/// assert_eq!(result, 3);
/// ```
#[derive(Debug, Clone)]
pub struct Script {
    code: String,
    hash: String,
}

impl Script {
    /// Creates a new script object from its source.
    pub fn new(code: &str) -> Script {
        let mut hash = Sha1::new();
        hash.update(code.as_bytes());
        Script {
            code: code.to_string(),
            hash: hash.digest().to_string(),
        }
    }

    /// The script's SHA1 digest in hexadecimal form.
    pub fn get_hash(&self) -> &str {
        &self.hash
    }

    /// Starts an invocation with one key filled in (`KEYS[1]`).
    #[inline]
    pub fn key<T: ToRedisArgs>(&self, key: T) -> ScriptInvocation<'_> {
        ScriptInvocation {
            script: self,
            args: vec![],
            keys: key.to_redis_args(),
        }
    }

    /// Starts an invocation with one argument filled in (`ARGV[1]`).
    #[inline]
    pub fn arg<T: ToRedisArgs>(&self, arg: T) -> ScriptInvocation<'_> {
        ScriptInvocation {
            script: self,
            args: arg.to_redis_args(),
            keys: vec![],
        }
    }

    /// Starts an empty invocation, for building keys and arguments in
    /// a loop.
    #[inline]
    pub fn prepare_invoke(&self) -> ScriptInvocation<'_> {
        ScriptInvocation {
            script: self,
            args: vec![],
            keys: vec![],
        }
    }

    /// Invokes the script without keys or arguments.
    #[inline]
    pub fn invoke<T: FromRedisValue>(&self, con: &mut dyn ConnectionLike) -> RedisResult<T> {
        self.prepare_invoke().invoke(con)
    }
}

/// A prepared script call: the keys and arguments collected for one
/// invocation of a [`Script`].
pub struct ScriptInvocation<'a> {
    script: &'a Script,
    args: Vec<Vec<u8>>,
    keys: Vec<Vec<u8>>,
}

impl<'a> ScriptInvocation<'a> {
    /// Adds a regular argument (`ARGV[i]`).
    #[inline]
    pub fn arg<T: ToRedisArgs>(&mut self, arg: T) -> &mut ScriptInvocation<'a> {
        arg.write_redis_args(&mut self.args);
        self
    }

    /// Adds a key argument (`KEYS[i]`).
    #[inline]
    pub fn key<T: ToRedisArgs>(&mut self, key: T) -> &mut ScriptInvocation<'a> {
        key.write_redis_args(&mut self.keys);
        self
    }

    /// Invokes the script, uploading it first if the server's cache
    /// does not know the digest yet.
    pub fn invoke<T: FromRedisValue>(&self, con: &mut dyn ConnectionLike) -> RedisResult<T> {
        let mut eval_cmd = cmd("EVALSHA");
        eval_cmd
            .arg(self.script.hash.as_bytes())
            .arg(self.keys.len());
        for key in &self.keys {
            eval_cmd.arg(&**key);
        }
        for arg in &self.args {
            eval_cmd.arg(&**arg);
        }

        match eval_cmd.query(con) {
            Err(err) if err.code() == Some("NOSCRIPT") => {
                let _: String = cmd("SCRIPT")
                    .arg("LOAD")
                    .arg(self.script.code.as_bytes())
                    .query(con)?;
                eval_cmd.query(con)
            }
            other => other,
        }
    }
}
