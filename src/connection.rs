use std::collections::HashSet;
use std::fmt;
use std::io::Write;
use std::net::{self, TcpStream, ToSocketAddrs};
#[cfg(unix)]
use std::os::unix::net::UnixStream;
#[cfg(unix)]
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use log::debug;

use crate::cmd::{cmd, Cmd};
use crate::errors::{ErrorKind, RedisError, RedisResult};
use crate::parser::Parser;
use crate::types::{from_redis_value, ToRedisArgs, Value};

static DEFAULT_PORT: u16 = 6379;

/// The default dial timeout when the connection string does not carry
/// a `timeout` parameter.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// The default pool size when the connection string does not carry a
/// `maxidle` parameter.
pub const DEFAULT_POOL_SIZE: usize = 1;

/// Defines the connection address.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectionAddr {
    /// A `(host, port)` pair reached over TCP.
    Tcp(String, u16),
    /// A path to a unix domain socket.
    #[cfg(unix)]
    Unix(PathBuf),
}

impl fmt::Display for ConnectionAddr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ConnectionAddr::Tcp(ref host, port) => write!(f, "{host}:{port}"),
            #[cfg(unix)]
            ConnectionAddr::Unix(ref path) => write!(f, "{}", path.display()),
        }
    }
}

/// Connection-independent information used to establish a session.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RedisConnectionInfo {
    /// The database number to select after dialing.  Usually `0`.
    pub db: i64,
    /// The authentication secret sent via `AUTH`, if any.
    pub password: Option<String>,
}

/// Everything the client needs to dial and run sessions.
#[derive(Clone, Debug)]
pub struct ConnectionInfo {
    /// The address to connect to.
    pub addr: ConnectionAddr,
    /// Database and authentication state carried per session.
    pub redis: RedisConnectionInfo,
    /// Dial timeout for fresh connections.
    pub timeout: Duration,
    /// Capacity of the client's connection pool.
    pub pool_size: usize,
}

impl FromStr for ConnectionInfo {
    type Err = RedisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.into_connection_info()
    }
}

/// Converts an object into a connection info struct, so `Client::open`
/// can accept URLs, `(host, port)` pairs and prebuilt infos alike.
pub trait IntoConnectionInfo {
    /// Performs the conversion.
    fn into_connection_info(self) -> RedisResult<ConnectionInfo>;
}

impl IntoConnectionInfo for ConnectionInfo {
    fn into_connection_info(self) -> RedisResult<ConnectionInfo> {
        Ok(self)
    }
}

/// URL format: `{redis|tcp|tcp4}://[:<password>@]<host>[:port][/<db>][?timeout=<dur>&maxidle=<n>]`
///
/// - Basic: `redis://127.0.0.1:6379`
/// - Password: `redis://:secret@127.0.0.1:6379`
/// - Database: `redis://127.0.0.1:6379/3`
/// - Pool and dial tuning: `redis://127.0.0.1/0?timeout=5s&maxidle=8`
impl<'a> IntoConnectionInfo for &'a str {
    fn into_connection_info(self) -> RedisResult<ConnectionInfo> {
        match parse_redis_url(self) {
            Some(u) => u.into_connection_info(),
            None => fail!((ErrorKind::InvalidClientConfig, "redis URL did not parse")),
        }
    }
}

impl IntoConnectionInfo for String {
    fn into_connection_info(self) -> RedisResult<ConnectionInfo> {
        self.as_str().into_connection_info()
    }
}

impl<T> IntoConnectionInfo for (T, u16)
where
    T: Into<String>,
{
    fn into_connection_info(self) -> RedisResult<ConnectionInfo> {
        Ok(ConnectionInfo {
            addr: ConnectionAddr::Tcp(self.0.into(), self.1),
            redis: RedisConnectionInfo::default(),
            timeout: DEFAULT_TIMEOUT,
            pool_size: DEFAULT_POOL_SIZE,
        })
    }
}

/// Parses a connection string into a URL, accepting only the schemes
/// this library can dial.
pub fn parse_redis_url(input: &str) -> Option<url::Url> {
    match url::Url::parse(input) {
        Ok(result) => match result.scheme() {
            "redis" | "tcp" | "tcp4" => Some(result),
            #[cfg(unix)]
            "unix" | "redis+unix" => Some(result),
            _ => None,
        },
        Err(_) => None,
    }
}

/// Parses a duration with a unit suffix: `500ms`, `15s`, `2m`, `1h`.
fn parse_duration(input: &str) -> Option<Duration> {
    let split = input.find(|c: char| !c.is_ascii_digit())?;
    let (digits, unit) = input.split_at(split);
    let n: u64 = digits.parse().ok()?;
    match unit {
        "ns" => Some(Duration::from_nanos(n)),
        "us" => Some(Duration::from_micros(n)),
        "ms" => Some(Duration::from_millis(n)),
        "s" => Some(Duration::from_secs(n)),
        "m" => Some(Duration::from_secs(n * 60)),
        "h" => Some(Duration::from_secs(n * 3600)),
        _ => None,
    }
}

fn url_to_tcp_connection_info(url: url::Url) -> RedisResult<ConnectionInfo> {
    let host = match url.host() {
        // `Host::to_string` would wrap IPv6 addresses in brackets,
        // which `ToSocketAddrs` then refuses; format each arm itself.
        Some(url::Host::Domain(domain)) => domain.to_string(),
        Some(url::Host::Ipv4(v4)) => v4.to_string(),
        Some(url::Host::Ipv6(v6)) => v6.to_string(),
        None => fail!((ErrorKind::InvalidClientConfig, "missing hostname")),
    };
    let port = url.port().unwrap_or(DEFAULT_PORT);

    let db = match url.path().trim_matches('/') {
        "" => 0,
        path => match path.parse::<i64>() {
            Ok(db) if db >= 0 => db,
            _ => fail!((ErrorKind::InvalidClientConfig, "invalid database number")),
        },
    };

    let password = match url.password() {
        Some(pw) => match percent_encoding::percent_decode(pw.as_bytes()).decode_utf8() {
            Ok(decoded) => Some(decoded.into_owned()),
            Err(_) => fail!((
                ErrorKind::InvalidClientConfig,
                "password is not valid UTF-8"
            )),
        },
        None => None,
    };

    let mut timeout = DEFAULT_TIMEOUT;
    let mut pool_size = DEFAULT_POOL_SIZE;
    for (key, value) in url.query_pairs() {
        match &*key {
            "timeout" => match parse_duration(&value) {
                Some(d) => timeout = d,
                None => fail!((
                    ErrorKind::InvalidClientConfig,
                    "timeout must be a duration with a unit suffix"
                )),
            },
            "maxidle" => match value.parse::<usize>() {
                Ok(n) => pool_size = n,
                Err(_) => fail!((ErrorKind::InvalidClientConfig, "invalid maxidle value")),
            },
            _ => {}
        }
    }

    Ok(ConnectionInfo {
        addr: ConnectionAddr::Tcp(host, port),
        redis: RedisConnectionInfo { db, password },
        timeout,
        pool_size,
    })
}

#[cfg(unix)]
fn url_to_unix_connection_info(url: url::Url) -> RedisResult<ConnectionInfo> {
    let query: std::collections::HashMap<_, _> = url.query_pairs().collect();
    Ok(ConnectionInfo {
        addr: ConnectionAddr::Unix(url.to_file_path().map_err(|_| -> RedisError {
            (ErrorKind::InvalidClientConfig, "missing path").into()
        })?),
        redis: RedisConnectionInfo {
            db: match query.get("db") {
                Some(db) => db.parse::<i64>().map_err(|_| -> RedisError {
                    (ErrorKind::InvalidClientConfig, "invalid database number").into()
                })?,
                None => 0,
            },
            password: query.get("pass").map(|password| password.to_string()),
        },
        timeout: match query.get("timeout") {
            Some(raw) => parse_duration(raw).ok_or_else(|| -> RedisError {
                (
                    ErrorKind::InvalidClientConfig,
                    "timeout must be a duration with a unit suffix",
                )
                    .into()
            })?,
            None => DEFAULT_TIMEOUT,
        },
        pool_size: match query.get("maxidle") {
            Some(raw) => raw.parse::<usize>().map_err(|_| -> RedisError {
                (ErrorKind::InvalidClientConfig, "invalid maxidle value").into()
            })?,
            None => DEFAULT_POOL_SIZE,
        },
    })
}

impl IntoConnectionInfo for url::Url {
    fn into_connection_info(self) -> RedisResult<ConnectionInfo> {
        match self.scheme() {
            "redis" | "tcp" | "tcp4" => url_to_tcp_connection_info(self),
            #[cfg(unix)]
            "unix" | "redis+unix" => url_to_unix_connection_info(self),
            _ => fail!((
                ErrorKind::InvalidClientConfig,
                "URL provided is not a redis URL"
            )),
        }
    }
}

// ── The wire-level session ─────────────────────────────────────────────

struct TcpConnection {
    reader: TcpStream,
    open: bool,
}

impl fmt::Debug for TcpConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TcpConnection")
            .field("reader", &self.reader)
            .field("open", &self.open)
            .finish()
    }
}

#[cfg(unix)]
struct UnixConnection {
    sock: UnixStream,
    open: bool,
}

#[cfg(unix)]
impl fmt::Debug for UnixConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnixConnection")
            .field("sock", &self.sock)
            .field("open", &self.open)
            .finish()
    }
}

enum ActualConnection {
    Tcp(TcpConnection),
    #[cfg(unix)]
    Unix(UnixConnection),
}

impl fmt::Debug for ActualConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActualConnection::Tcp(c) => f.debug_tuple("Tcp").field(c).finish(),
            #[cfg(unix)]
            ActualConnection::Unix(c) => f.debug_tuple("Unix").field(c).finish(),
        }
    }
}

fn connect_tcp(host: &str, port: u16, timeout: Duration) -> RedisResult<TcpStream> {
    let mut last_error = None;
    for addr in (host, port).to_socket_addrs()? {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => {
                stream.set_nodelay(true)?;
                return Ok(stream);
            }
            Err(e) => last_error = Some(e),
        }
    }
    match last_error {
        Some(e) => Err(e.into()),
        None => fail!((
            ErrorKind::InvalidClientConfig,
            "could not resolve to any addresses"
        )),
    }
}

impl ActualConnection {
    fn new(addr: &ConnectionAddr, timeout: Duration) -> RedisResult<ActualConnection> {
        Ok(match *addr {
            ConnectionAddr::Tcp(ref host, port) => ActualConnection::Tcp(TcpConnection {
                reader: connect_tcp(host, port, timeout)?,
                open: true,
            }),
            #[cfg(unix)]
            ConnectionAddr::Unix(ref path) => ActualConnection::Unix(UnixConnection {
                sock: UnixStream::connect(path)?,
                open: true,
            }),
        })
    }

    fn send_bytes(&mut self, bytes: &[u8]) -> RedisResult<()> {
        let result = match *self {
            ActualConnection::Tcp(ref mut connection) => connection
                .reader
                .write_all(bytes)
                .map_err(RedisError::from),
            #[cfg(unix)]
            ActualConnection::Unix(ref mut connection) => {
                connection.sock.write_all(bytes).map_err(RedisError::from)
            }
        };
        if let Err(e) = &result {
            if e.is_connection_dropped() {
                self.mark_closed();
            }
        }
        result
    }

    fn mark_closed(&mut self) {
        match *self {
            ActualConnection::Tcp(ref mut connection) => {
                let _ = connection.reader.shutdown(net::Shutdown::Both);
                connection.open = false;
            }
            #[cfg(unix)]
            ActualConnection::Unix(ref mut connection) => {
                let _ = connection.sock.shutdown(net::Shutdown::Both);
                connection.open = false;
            }
        }
    }

    fn set_write_timeout(&self, dur: Option<Duration>) -> RedisResult<()> {
        match *self {
            ActualConnection::Tcp(TcpConnection { ref reader, .. }) => {
                reader.set_write_timeout(dur)?;
            }
            #[cfg(unix)]
            ActualConnection::Unix(UnixConnection { ref sock, .. }) => {
                sock.set_write_timeout(dur)?;
            }
        }
        Ok(())
    }

    fn set_read_timeout(&self, dur: Option<Duration>) -> RedisResult<()> {
        match *self {
            ActualConnection::Tcp(TcpConnection { ref reader, .. }) => {
                reader.set_read_timeout(dur)?;
            }
            #[cfg(unix)]
            ActualConnection::Unix(UnixConnection { ref sock, .. }) => {
                sock.set_read_timeout(dur)?;
            }
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        match *self {
            ActualConnection::Tcp(TcpConnection { open, .. }) => open,
            #[cfg(unix)]
            ActualConnection::Unix(UnixConnection { open, .. }) => open,
        }
    }
}

/// One established session: the stream plus the buffered decoder state
/// over its read side.  Created by dialing, destroyed on EOF, explicit
/// close or pool shutdown.  A session never retries and never remembers
/// what was sent on it; whoever holds it owns it exclusively.
pub struct Connection {
    con: ActualConnection,
    parser: Parser,
    db: i64,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("con", &self.con)
            .field("db", &self.db)
            .finish()
    }
}

fn connect_auth(con: &mut Connection, password: &str) -> RedisResult<()> {
    let mut command = cmd("AUTH");
    command.arg(password);
    match command.query::<Value>(con) {
        Ok(Value::Status(ref s)) if s == "OK" => Ok(()),
        Ok(_) => fail!((
            ErrorKind::AuthenticationFailed,
            "server refused to authenticate"
        )),
        Err(err) => {
            if err.kind() == ErrorKind::ResponseError
                || err.kind() == ErrorKind::ExtensionError
            {
                fail!((
                    ErrorKind::AuthenticationFailed,
                    "password authentication failed",
                    err.to_string()
                ));
            }
            Err(err)
        }
    }
}

/// Dials a fresh session and performs the handshake: `AUTH` when a
/// secret is configured, then `SELECT` when the database index is
/// nonzero.  Reused sessions carry both and never re-handshake.
pub fn connect(connection_info: &ConnectionInfo) -> RedisResult<Connection> {
    let con = ActualConnection::new(&connection_info.addr, connection_info.timeout)?;
    setup_connection(con, &connection_info.redis)
}

fn setup_connection(
    con: ActualConnection,
    connection_info: &RedisConnectionInfo,
) -> RedisResult<Connection> {
    let mut rv = Connection {
        con,
        parser: Parser::new(),
        db: connection_info.db,
    };

    if let Some(ref password) = connection_info.password {
        connect_auth(&mut rv, password)?;
    }

    if connection_info.db != 0 {
        match cmd("SELECT")
            .arg(connection_info.db)
            .query::<Value>(&mut rv)
        {
            Ok(Value::Status(ref s)) if s == "OK" => {}
            _ => fail!((
                ErrorKind::ResponseError,
                "server refused to switch database"
            )),
        }
    }

    debug!("connection established (db {})", connection_info.db);
    Ok(rv)
}

/// The stateless request/response surface shared by sessions and the
/// handles built on top of them.
pub trait ConnectionLike {
    /// Sends an already packed command and reads its single reply.
    fn req_packed_command(&mut self, cmd: &[u8]) -> RedisResult<Value>;

    /// Sends an already packed batch of commands and reads
    /// `offset + count` replies, returning the last `count` of them.
    /// Replies that are server errors do not abort the drain; the
    /// stream is always left aligned on reply boundaries.
    fn req_packed_commands(
        &mut self,
        cmd: &[u8],
        offset: usize,
        count: usize,
    ) -> RedisResult<Vec<Value>>;

    /// Pings the server to check that the connection is still usable.
    fn check_connection(&mut self) -> bool;

    /// Returns false once the session saw EOF or a fatal I/O error.
    fn is_open(&self) -> bool;
}

impl Connection {
    /// Sends a packed command without reading a reply.  The low-level
    /// half of pipelining and subscriptions.
    pub fn send_packed_command(&mut self, cmd: &[u8]) -> RedisResult<()> {
        self.con.send_bytes(cmd)
    }

    /// Reads one reply.  The counterpart of `send_packed_command`.
    pub fn recv_response(&mut self) -> RedisResult<Value> {
        self.read_response()
    }

    /// Sets the write timeout for the connection.  `None` blocks
    /// indefinitely.
    pub fn set_write_timeout(&self, dur: Option<Duration>) -> RedisResult<()> {
        self.con.set_write_timeout(dur)
    }

    /// Sets the read timeout for the connection.  `None` blocks
    /// indefinitely.
    pub fn set_read_timeout(&self, dur: Option<Duration>) -> RedisResult<()> {
        self.con.set_read_timeout(dur)
    }

    /// The database index this session selected at handshake time.
    pub fn db(&self) -> i64 {
        self.db
    }

    fn read_response(&mut self) -> RedisResult<Value> {
        let result = match self.con {
            ActualConnection::Tcp(TcpConnection { ref mut reader, .. }) => {
                self.parser.parse_value(reader)
            }
            #[cfg(unix)]
            ActualConnection::Unix(UnixConnection { ref mut sock, .. }) => {
                self.parser.parse_value(sock)
            }
        };
        // A dropped stream poisons the session so the pool replaces it
        // with a vacant slot instead of re-pooling it.
        if let Err(e) = &result {
            if e.is_connection_dropped() {
                self.con.mark_closed();
            }
        }
        result
    }
}

impl ConnectionLike for Connection {
    fn req_packed_command(&mut self, cmd: &[u8]) -> RedisResult<Value> {
        self.con.send_bytes(cmd)?;
        self.read_response()
    }

    fn req_packed_commands(
        &mut self,
        cmd: &[u8],
        offset: usize,
        count: usize,
    ) -> RedisResult<Vec<Value>> {
        self.con.send_bytes(cmd)?;
        let mut rv = Vec::with_capacity(count);
        let mut first_err = None;
        for idx in 0..(offset + count) {
            // Server errors inside the batch must not abort the drain,
            // otherwise the stream loses reply alignment.
            match self.read_response() {
                Ok(item) => {
                    if idx >= offset {
                        rv.push(item);
                    }
                }
                Err(err) => {
                    if first_err.is_none() {
                        first_err = Some(err);
                    }
                }
            }
        }
        match first_err {
            Some(err) => Err(err),
            None => Ok(rv),
        }
    }

    fn check_connection(&mut self) -> bool {
        cmd("PING").query::<String>(self).is_ok()
    }

    fn is_open(&self) -> bool {
        self.con.is_open()
    }
}

impl<C, T> ConnectionLike for T
where
    C: ConnectionLike,
    T: std::ops::DerefMut<Target = C>,
{
    fn req_packed_command(&mut self, cmd: &[u8]) -> RedisResult<Value> {
        self.deref_mut().req_packed_command(cmd)
    }

    fn req_packed_commands(
        &mut self,
        cmd: &[u8],
        offset: usize,
        count: usize,
    ) -> RedisResult<Vec<Value>> {
        self.deref_mut().req_packed_commands(cmd, offset, count)
    }

    fn check_connection(&mut self) -> bool {
        self.deref_mut().check_connection()
    }

    fn is_open(&self) -> bool {
        self.deref().is_open()
    }
}

// ── Pub/Sub ────────────────────────────────────────────────────────────

/// One frame read from a subscribed session.
///
/// Subscription acknowledgments and published messages arrive on the
/// same stream; the variant tells them apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PubSubMessage {
    /// Acknowledges a `SUBSCRIBE`; carries the number of subscriptions
    /// this session now holds.
    Subscribe {
        /// The channel that was subscribed.
        channel: String,
        /// Remaining subscription count on this session.
        subscriptions: i64,
    },
    /// Acknowledges an `UNSUBSCRIBE`.
    Unsubscribe {
        /// The channel that was unsubscribed.
        channel: String,
        /// Remaining subscription count on this session.
        subscriptions: i64,
    },
    /// Acknowledges a `PSUBSCRIBE`.
    PSubscribe {
        /// The glob pattern that was subscribed.
        pattern: String,
        /// Remaining subscription count on this session.
        subscriptions: i64,
    },
    /// Acknowledges a `PUNSUBSCRIBE`.
    PUnsubscribe {
        /// The glob pattern that was unsubscribed.
        pattern: String,
        /// Remaining subscription count on this session.
        subscriptions: i64,
    },
    /// A message published to a channel this session subscribed to.
    Message {
        /// The originating channel.
        channel: String,
        /// The published payload.
        payload: Vec<u8>,
    },
    /// A message delivered through a pattern subscription.
    PMessage {
        /// The pattern that matched.
        pattern: String,
        /// The originating channel.
        channel: String,
        /// The published payload.
        payload: Vec<u8>,
    },
}

/// A subscribed session.
///
/// Holds a dedicated connection (a subscribed session cannot serve
/// ordinary traffic) and the sets of channels and patterns it believes
/// it is subscribed to, updated from the server's acknowledgment
/// frames.  `receive` blocks until the next frame; dropping the handle
/// closes the socket, which is the only way to abort a blocked read
/// short of a read timeout.
pub struct PubSub {
    con: Connection,
    channels: HashSet<String>,
    patterns: HashSet<String>,
}

impl PubSub {
    pub(crate) fn new(con: Connection) -> PubSub {
        PubSub {
            con,
            channels: HashSet::new(),
            patterns: HashSet::new(),
        }
    }

    fn send(&mut self, command: &Cmd) -> RedisResult<()> {
        self.con.send_packed_command(&command.get_packed_command())
    }

    /// Subscribes to one or more channels.  The acknowledgment arrives
    /// through [`PubSub::receive`].
    pub fn subscribe<T: ToRedisArgs>(&mut self, channels: T) -> RedisResult<()> {
        self.send(cmd("SUBSCRIBE").arg(channels))
    }

    /// Subscribes to one or more glob patterns.
    pub fn psubscribe<T: ToRedisArgs>(&mut self, patterns: T) -> RedisResult<()> {
        self.send(cmd("PSUBSCRIBE").arg(patterns))
    }

    /// Unsubscribes from the given channels.
    pub fn unsubscribe<T: ToRedisArgs>(&mut self, channels: T) -> RedisResult<()> {
        self.send(cmd("UNSUBSCRIBE").arg(channels))
    }

    /// Unsubscribes from every channel.
    pub fn unsubscribe_all(&mut self) -> RedisResult<()> {
        self.send(&cmd("UNSUBSCRIBE"))
    }

    /// Unsubscribes from the given patterns.
    pub fn punsubscribe<T: ToRedisArgs>(&mut self, patterns: T) -> RedisResult<()> {
        self.send(cmd("PUNSUBSCRIBE").arg(patterns))
    }

    /// Unsubscribes from every pattern.
    pub fn punsubscribe_all(&mut self) -> RedisResult<()> {
        self.send(&cmd("PUNSUBSCRIBE"))
    }

    /// The channels this session is currently subscribed to.
    pub fn channels(&self) -> &HashSet<String> {
        &self.channels
    }

    /// The patterns this session is currently subscribed to.
    pub fn patterns(&self) -> &HashSet<String> {
        &self.patterns
    }

    /// Sets the read timeout for `receive`.  `None` blocks forever.
    pub fn set_read_timeout(&self, dur: Option<Duration>) -> RedisResult<()> {
        self.con.set_read_timeout(dur)
    }

    /// Blocks until the next push frame and returns it, updating the
    /// subscription sets on acknowledgment frames.
    pub fn receive(&mut self) -> RedisResult<PubSubMessage> {
        let frame = self.con.recv_response()?.extract_error()?;
        let mut items = match frame {
            Value::Bulk(Some(items)) => items.into_iter(),
            v => fail!(RedisError::from((
                ErrorKind::PubSubProtocol,
                "push frame is not a multi bulk reply",
                format!("{v:?}"),
            ))),
        };
        let mut next = |what: &'static str| -> RedisResult<Value> {
            items.next().ok_or_else(|| {
                RedisError::from((
                    ErrorKind::PubSubProtocol,
                    "push frame is missing an element",
                    what.to_string(),
                ))
            })
        };

        let verb: String = from_redis_value(next("verb")?)?;
        match verb.as_str() {
            "subscribe" | "unsubscribe" => {
                let channel: String = from_redis_value(next("channel")?)?;
                let subscriptions: i64 = from_redis_value(next("count")?)?;
                if verb == "subscribe" {
                    self.channels.insert(channel.clone());
                    Ok(PubSubMessage::Subscribe {
                        channel,
                        subscriptions,
                    })
                } else {
                    self.channels.remove(&channel);
                    Ok(PubSubMessage::Unsubscribe {
                        channel,
                        subscriptions,
                    })
                }
            }
            "psubscribe" | "punsubscribe" => {
                let pattern: String = from_redis_value(next("pattern")?)?;
                let subscriptions: i64 = from_redis_value(next("count")?)?;
                if verb == "psubscribe" {
                    self.patterns.insert(pattern.clone());
                    Ok(PubSubMessage::PSubscribe {
                        pattern,
                        subscriptions,
                    })
                } else {
                    self.patterns.remove(&pattern);
                    Ok(PubSubMessage::PUnsubscribe {
                        pattern,
                        subscriptions,
                    })
                }
            }
            "message" => Ok(PubSubMessage::Message {
                channel: from_redis_value(next("channel")?)?,
                payload: from_redis_value(next("payload")?)?,
            }),
            "pmessage" => Ok(PubSubMessage::PMessage {
                pattern: from_redis_value(next("pattern")?)?,
                channel: from_redis_value(next("channel")?)?,
                payload: from_redis_value(next("payload")?)?,
            }),
            other => fail!(RedisError::from((
                ErrorKind::PubSubProtocol,
                "unknown push frame verb",
                other.to_string(),
            ))),
        }
    }
}
