use crate::connection::ConnectionLike;
use crate::errors::RedisResult;
use crate::types::{from_redis_value, FromRedisValue, RedisWrite, ToRedisArgs};

/// A single command under construction.
///
/// Arguments are appended through [`ToRedisArgs`] and stored packed:
/// one contiguous data buffer plus the end offset of every argument.
/// Encoding to the request grammar then needs a single allocation and
/// produces one contiguous frame, so every command is a single write.
///
/// ```rust
/// redlink::cmd("SET").arg("my_key").arg(42);
/// ```
#[derive(Clone, Default)]
pub struct Cmd {
    data: Vec<u8>,
    // End offset of each argument within `data`.
    args: Vec<usize>,
}

fn decimal_width(mut v: usize) -> usize {
    let mut width = 1;
    while v >= 10 {
        v /= 10;
        width += 1;
    }
    width
}

// `$<len>\r\n<arg>\r\n`
#[inline]
fn arg_frame_len(len: usize) -> usize {
    1 + decimal_width(len) + 2 + len + 2
}

impl RedisWrite for Cmd {
    fn write_arg(&mut self, arg: &[u8]) {
        self.data.extend_from_slice(arg);
        self.args.push(self.data.len());
    }

    fn write_arg_fmt(&mut self, arg: impl std::fmt::Display) {
        use std::io::Write;
        write!(self.data, "{arg}").expect("writing to a Vec cannot fail");
        self.args.push(self.data.len());
    }
}

impl Cmd {
    /// Creates a new empty command.
    pub fn new() -> Cmd {
        Cmd::default()
    }

    /// Creates a new empty command with preallocated buffers.
    pub fn with_capacity(arg_count: usize, data_len: usize) -> Cmd {
        Cmd {
            data: Vec::with_capacity(data_len),
            args: Vec::with_capacity(arg_count),
        }
    }

    /// Appends an argument.  Anything implementing [`ToRedisArgs`] is
    /// accepted, so collections flatten and options vanish when `None`:
    ///
    /// ```rust
    /// redlink::cmd("DEL").arg(&["k1", "k2", "k3"]);
    /// redlink::cmd("SET").arg("key").arg(b"\x00binary\x00");
    /// ```
    #[inline]
    pub fn arg<T: ToRedisArgs>(&mut self, arg: T) -> &mut Cmd {
        arg.write_redis_args(self);
        self
    }

    /// Number of arguments, including the command verb.
    pub fn arg_count(&self) -> usize {
        self.args.len()
    }

    /// Returns an iterator over the raw argument slices.
    pub fn args_iter(&self) -> impl Iterator<Item = &[u8]> {
        let mut prev = 0;
        self.args.iter().map(move |&end| {
            let arg = &self.data[prev..end];
            prev = end;
            arg
        })
    }

    /// Encodes the command into one request frame.
    pub fn get_packed_command(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.write_packed_command(&mut out);
        out
    }

    /// Encodes the command into the given buffer, reserving the exact
    /// frame length up front.
    pub(crate) fn write_packed_command(&self, out: &mut Vec<u8>) {
        let frame_len = 1
            + decimal_width(self.args.len())
            + 2
            + self
                .args_iter()
                .map(|arg| arg_frame_len(arg.len()))
                .sum::<usize>();
        out.reserve(frame_len);

        let mut len_buf = itoa::Buffer::new();
        out.push(b'*');
        out.extend_from_slice(len_buf.format(self.args.len()).as_bytes());
        out.extend_from_slice(b"\r\n");
        for arg in self.args_iter() {
            out.push(b'$');
            out.extend_from_slice(len_buf.format(arg.len()).as_bytes());
            out.extend_from_slice(b"\r\n");
            out.extend_from_slice(arg);
            out.extend_from_slice(b"\r\n");
        }
    }

    /// Sends the command over the given connection and projects the
    /// reply.  This is the general way to run a hand-built command:
    ///
    /// ```rust,no_run
    /// # fn run() -> redlink::RedisResult<()> {
    /// # let client = redlink::Client::open("redis://127.0.0.1/")?;
    /// # let mut con = client.get_connection()?;
    /// let count: i64 = redlink::cmd("DBSIZE").query(&mut con)?;
    /// # Ok(()) }
    /// ```
    #[inline]
    pub fn query<T: FromRedisValue>(&self, con: &mut dyn ConnectionLike) -> RedisResult<T> {
        from_redis_value(con.req_packed_command(&self.get_packed_command())?.extract_error()?)
    }

    /// Runs the command and only reports success or failure, for
    /// callers that do not care about the reply payload.
    #[inline]
    pub fn exec(&self, con: &mut dyn ConnectionLike) -> RedisResult<()> {
        self.query::<()>(con)
    }
}

/// Shortcut for creating a command with the verb already appended.
///
/// ```rust
/// redlink::cmd("PING");
/// ```
pub fn cmd(name: &str) -> Cmd {
    let mut rv = Cmd::new();
    rv.arg(name);
    rv
}

/// Packs pre-rendered arguments into a request frame.
///
/// ```rust
/// # use redlink::ToRedisArgs;
/// let mut args = vec![];
/// args.extend("SET".to_redis_args());
/// args.extend("my_key".to_redis_args());
/// args.extend(42.to_redis_args());
/// let frame = redlink::pack_command(&args);
/// assert_eq!(frame, b"*3\r\n$3\r\nSET\r\n$6\r\nmy_key\r\n$2\r\n42\r\n".to_vec());
/// ```
pub fn pack_command(args: &[Vec<u8>]) -> Vec<u8> {
    let mut command = Cmd::with_capacity(args.len(), args.iter().map(|a| a.len()).sum());
    for chunk in args {
        command.write_arg(chunk);
    }
    command.get_packed_command()
}
