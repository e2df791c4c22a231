use std::{error, fmt, io, str};

/// An enum of all error kinds.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The server signalled an error for the command just issued.
    ResponseError,
    /// The reply stream did not follow the wire protocol.
    ParseError,
    /// The AUTH handshake was rejected.
    AuthenticationFailed,
    /// A reply projection was applied to an incompatible reply tag.
    TypeError,
    /// A null bulk reply was projected into a non-nullable type.
    NullBulk,
    /// The parameters handed to the client were wrong.
    InvalidClientConfig,
    /// A byte-level send or receive failure.  A clean end of stream is
    /// an `IoError` whose source is `io::ErrorKind::UnexpectedEof`.
    IoError,
    /// An error raised on the client before anything hit the wire.
    ClientError,
    /// A server error code this library has no dedicated kind for.
    ExtensionError,
    /// The pool was closed; no further connections can be acquired.
    PoolClosed,
    /// The transaction handle and the server disagree about the number
    /// of queued commands.
    TransactionDesync,
    /// A push frame carried a verb outside the pub/sub vocabulary.
    PubSubProtocol,
}

/// An error line sent by the server, split into the leading code word
/// (`ERR`, `WRONGTYPE`, `NOSCRIPT`, ...) and the free-text remainder.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct ServerError {
    code: String,
    detail: Option<String>,
}

impl ServerError {
    /// Splits a raw `-`-prefixed reply line into code and detail.
    pub(crate) fn parse(line: &str) -> ServerError {
        let mut pieces = line.splitn(2, ' ');
        ServerError {
            code: pieces.next().unwrap_or("").to_string(),
            detail: pieces.next().map(|s| s.to_string()),
        }
    }

    /// The leading code word of the error line.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// The message following the code word, if any.
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.detail {
            Some(ref detail) => write!(f, "{}: {}", self.code, detail),
            None => f.write_str(&self.code),
        }
    }
}

impl error::Error for ServerError {}

/// Represents an error raised by this library.  For the most part you
/// should interact with it through the `Error` trait and the predicate
/// helpers rather than the struct itself.
pub struct RedisError {
    repr: ErrorRepr,
}

#[derive(Debug)]
enum ErrorRepr {
    WithDescription(ErrorKind, &'static str),
    WithDescriptionAndDetail(ErrorKind, &'static str, String),
    Server(ServerError),
    IoError(io::Error),
}

impl PartialEq for RedisError {
    fn eq(&self, other: &RedisError) -> bool {
        match (&self.repr, &other.repr) {
            (&ErrorRepr::WithDescription(kind_a, _), &ErrorRepr::WithDescription(kind_b, _)) => {
                kind_a == kind_b
            }
            (
                &ErrorRepr::WithDescriptionAndDetail(kind_a, _, _),
                &ErrorRepr::WithDescriptionAndDetail(kind_b, _, _),
            ) => kind_a == kind_b,
            (ErrorRepr::Server(a), ErrorRepr::Server(b)) => a == b,
            _ => false,
        }
    }
}

impl From<io::Error> for RedisError {
    fn from(err: io::Error) -> RedisError {
        RedisError {
            repr: ErrorRepr::IoError(err),
        }
    }
}

impl From<ServerError> for RedisError {
    fn from(err: ServerError) -> RedisError {
        RedisError {
            repr: ErrorRepr::Server(err),
        }
    }
}

impl From<str::Utf8Error> for RedisError {
    fn from(_: str::Utf8Error) -> RedisError {
        RedisError {
            repr: ErrorRepr::WithDescription(ErrorKind::TypeError, "invalid UTF-8"),
        }
    }
}

impl From<std::string::FromUtf8Error> for RedisError {
    fn from(_: std::string::FromUtf8Error) -> RedisError {
        RedisError {
            repr: ErrorRepr::WithDescription(ErrorKind::TypeError, "invalid UTF-8"),
        }
    }
}

impl From<(ErrorKind, &'static str)> for RedisError {
    fn from((kind, desc): (ErrorKind, &'static str)) -> RedisError {
        RedisError {
            repr: ErrorRepr::WithDescription(kind, desc),
        }
    }
}

impl From<(ErrorKind, &'static str, String)> for RedisError {
    fn from((kind, desc, detail): (ErrorKind, &'static str, String)) -> RedisError {
        RedisError {
            repr: ErrorRepr::WithDescriptionAndDetail(kind, desc, detail),
        }
    }
}

impl error::Error for RedisError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self.repr {
            ErrorRepr::IoError(ref err) => Some(err),
            ErrorRepr::Server(ref err) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for RedisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.repr {
            ErrorRepr::WithDescription(kind, desc) => {
                desc.fmt(f)?;
                f.write_str(" - ")?;
                fmt::Debug::fmt(&kind, f)
            }
            ErrorRepr::WithDescriptionAndDetail(kind, desc, ref detail) => {
                desc.fmt(f)?;
                f.write_str(" - ")?;
                fmt::Debug::fmt(&kind, f)?;
                f.write_str(": ")?;
                detail.fmt(f)
            }
            ErrorRepr::Server(ref err) => {
                f.write_str("server error - ")?;
                err.fmt(f)
            }
            ErrorRepr::IoError(ref err) => err.fmt(f),
        }
    }
}

impl fmt::Debug for RedisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl RedisError {
    /// Returns the kind of the error.
    pub fn kind(&self) -> ErrorKind {
        match self.repr {
            ErrorRepr::WithDescription(kind, _)
            | ErrorRepr::WithDescriptionAndDetail(kind, _, _) => kind,
            ErrorRepr::Server(ref err) => match err.code() {
                "ERR" | "WRONGTYPE" | "EXECABORT" | "NOSCRIPT" | "NOAUTH" | "BUSYKEY"
                | "LOADING" | "READONLY" | "MASTERDOWN" | "MISCONF" | "NOTBUSY" => {
                    ErrorKind::ResponseError
                }
                _ => ErrorKind::ExtensionError,
            },
            ErrorRepr::IoError(_) => ErrorKind::IoError,
        }
    }

    /// Returns the error detail, if any.
    pub fn detail(&self) -> Option<&str> {
        match self.repr {
            ErrorRepr::WithDescriptionAndDetail(_, _, ref detail) => Some(detail.as_str()),
            ErrorRepr::Server(ref err) => err.detail(),
            _ => None,
        }
    }

    /// Returns the raw server error code, if the error came from the
    /// server.
    pub fn code(&self) -> Option<&str> {
        match self.repr {
            ErrorRepr::Server(ref err) => Some(err.code()),
            _ => None,
        }
    }

    /// Returns the name of the error category for display purposes.
    pub fn category(&self) -> &str {
        match self.kind() {
            ErrorKind::ResponseError => "response error",
            ErrorKind::ParseError => "parse error",
            ErrorKind::AuthenticationFailed => "authentication failed",
            ErrorKind::TypeError => "type error",
            ErrorKind::NullBulk => "null bulk reply",
            ErrorKind::InvalidClientConfig => "invalid client config",
            ErrorKind::IoError => "I/O error",
            ErrorKind::ClientError => "client error",
            ErrorKind::ExtensionError => "extension error",
            ErrorKind::PoolClosed => "pool closed",
            ErrorKind::TransactionDesync => "transaction desync",
            ErrorKind::PubSubProtocol => "pub/sub protocol error",
        }
    }

    /// Indicates that this failure is an I/O failure.
    pub fn is_io_error(&self) -> bool {
        self.kind() == ErrorKind::IoError
    }

    pub(crate) fn as_io_error(&self) -> Option<&io::Error> {
        match self.repr {
            ErrorRepr::IoError(ref err) => Some(err),
            _ => None,
        }
    }

    /// Returns true if this error indicates that the connection was
    /// refused.  Mostly useful in tests probing for a live server.
    pub fn is_connection_refusal(&self) -> bool {
        self.as_io_error()
            .is_some_and(|err| err.kind() == io::ErrorKind::ConnectionRefused)
    }

    /// Returns true if the error was caused by an I/O timeout.
    pub fn is_timeout(&self) -> bool {
        self.as_io_error().is_some_and(|err| {
            matches!(
                err.kind(),
                io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
            )
        })
    }

    /// Returns true if the error was caused by the peer dropping the
    /// connection.  A clean end of stream shows up as `UnexpectedEof`
    /// on the read side and as `BrokenPipe` or `ConnectionReset` on the
    /// write side; all of them mean the session is gone.
    pub fn is_connection_dropped(&self) -> bool {
        self.as_io_error().is_some_and(|err| {
            matches!(
                err.kind(),
                io::ErrorKind::BrokenPipe
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::NotConnected
                    | io::ErrorKind::UnexpectedEof
            )
        })
    }
}

/// Library generic result type.
pub type RedisResult<T> = Result<T, RedisError>;
