use std::{
    io::{self, Read},
    str,
};

use crate::errors::{ErrorKind, RedisError, RedisResult, ServerError};
use crate::types::Value;

use combine::{
    any,
    error::StreamError,
    opaque,
    parser::{
        byte::crlf,
        byte::take_until_bytes,
        combinator::{any_send_sync_partial_state, AnySendSyncPartialState},
        range::{recognize, take},
    },
    stream::{PointerOffset, RangeStream, StreamErrorFor},
    ParseError, Parser as _,
};

/// Multi bulk replies nested deeper than this are rejected rather than
/// recursed into.
const MAX_RECURSE_DEPTH: usize = 100;

/// Bulk payloads are capped at 512 MiB by the protocol definition.
const MAX_BULK_LEN: i64 = 512 * 1024 * 1024;

fn value<'a, I>(
    depth: Option<usize>,
) -> impl combine::Parser<I, Output = Value, PartialState = AnySendSyncPartialState>
where
    I: RangeStream<Token = u8, Range = &'a [u8]>,
    I::Error: combine::ParseError<u8, &'a [u8], I::Position>,
{
    let depth = depth.unwrap_or(1);

    opaque!(any_send_sync_partial_state(
        any()
            .then_partial(move |&mut b| {
                if b == b'*' && depth > MAX_RECURSE_DEPTH {
                    combine::unexpected_any("nesting depth exceeded").left()
                } else {
                    combine::value(b).right()
                }
            })
            .then_partial(move |&mut b| {
                let line = || {
                    recognize(take_until_bytes(&b"\r\n"[..]).with(take(2).map(|_| ()))).and_then(
                        |line: &[u8]| {
                            str::from_utf8(&line[..line.len() - 2])
                                .map_err(StreamErrorFor::<I>::other)
                        },
                    )
                };

                let status = || line().map(|line| Value::Status(line.into()));

                let error = || line().map(|line| Value::Error(ServerError::parse(line)));

                let int = || {
                    line().and_then(|line| {
                        line.trim().parse::<i64>().map_err(|_| {
                            StreamErrorFor::<I>::message_static_message(
                                "expected integer, got garbage",
                            )
                        })
                    })
                };

                let data = || {
                    int()
                        .and_then(|len| {
                            if !(-1..=MAX_BULK_LEN).contains(&len) {
                                Err(StreamErrorFor::<I>::message_static_message(
                                    "invalid bulk length",
                                ))
                            } else {
                                Ok(len)
                            }
                        })
                        .then_partial(move |len| {
                            if *len < 0 {
                                combine::produce(|| Value::Data(None)).left()
                            } else {
                                take(*len as usize)
                                    .map(|bs: &[u8]| Value::Data(Some(bs.to_vec())))
                                    .skip(crlf())
                                    .right()
                            }
                        })
                };

                let multi = || {
                    int()
                        .and_then(|len| {
                            if len < -1 {
                                Err(StreamErrorFor::<I>::message_static_message(
                                    "invalid multi bulk length",
                                ))
                            } else {
                                Ok(len)
                            }
                        })
                        .then_partial(move |&mut len| {
                            if len < 0 {
                                combine::produce(|| Value::Bulk(None)).left()
                            } else {
                                let len = len as usize;
                                combine::count_min_max(len, len, value(Some(depth + 1)))
                                    .map(|values| Value::Bulk(Some(values)))
                                    .right()
                            }
                        })
                };

                combine::dispatch!(b;
                    b'+' => status(),
                    b'-' => error(),
                    b':' => int().map(Value::Int),
                    b'$' => data(),
                    b'*' => multi(),
                    b => combine::unexpected_any(combine::error::Token(b))
                )
            })
    ))
}

/// The streaming reply parser.
///
/// Keeps the resumable decoder state between calls, so one parser
/// instance is tied to one connection and decodes exactly one complete
/// reply per call, leaving the stream positioned at the start of the
/// next one.
pub struct Parser {
    decoder: combine::stream::decoder::Decoder<AnySendSyncPartialState, PointerOffset<[u8]>>,
}

impl Default for Parser {
    fn default() -> Self {
        Parser::new()
    }
}

impl Parser {
    /// Creates a new parser with empty buffer state.
    pub fn new() -> Parser {
        Parser {
            decoder: combine::stream::decoder::Decoder::new(),
        }
    }

    /// Parses one reply out of the reader, suspending on the reader's
    /// blocking semantics until enough bytes arrived.  A stream that
    /// ends mid-reply (or before one starts) yields an I/O error with
    /// `UnexpectedEof`, which callers use to detect a dropped session.
    pub fn parse_value<T: Read>(&mut self, mut reader: T) -> RedisResult<Value> {
        let mut decoder = &mut self.decoder;
        let result = combine::decode!(decoder, reader, value(None), |input, _| {
            combine::stream::easy::Stream::from(input)
        });
        match result {
            Err(err) => Err(match err {
                combine::stream::decoder::Error::Io { error, .. } => error.into(),
                combine::stream::decoder::Error::Parse(err) => {
                    if err.is_unexpected_end_of_input() {
                        RedisError::from(io::Error::from(io::ErrorKind::UnexpectedEof))
                    } else {
                        let err = err
                            .map_range(|range| format!("{range:?}"))
                            .map_position(|pos| pos.translate_position(decoder.buffer()))
                            .to_string();
                        RedisError::from((ErrorKind::ParseError, "parse error", err))
                    }
                }
            }),
            Ok(result) => Ok(result),
        }
    }
}

/// Parses a byte slice into a single reply value.
///
/// The straightforward entry point when the full reply is already in
/// memory; the connection machinery uses [`Parser`] directly.
pub fn parse_redis_value(bytes: &[u8]) -> RedisResult<Value> {
    let mut parser = Parser::new();
    parser.parse_value(bytes)
}
