//! An in-process mock server for the integration suites.
//!
//! Implements enough of the server side — request framing, a handful of
//! data commands, MULTI/EXEC with WATCH versioning, Pub/Sub fanout —
//! independently of the crate's own codec, so the tests exercise the
//! client against a second implementation of the protocol.  A few
//! `DEBUG` subcommands exist purely as test hooks: `QUIT` drops the
//! connection without replying, `KILLNEXT` drops whichever connection
//! sends the next command, `SLEEP <ms>` delays a reply, `CONNCOUNT`
//! reports how many connections were ever accepted.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

pub struct MockServer {
    addr: SocketAddr,
    state: Arc<ServerState>,
}

enum Entry {
    Str(Vec<u8>),
    List(VecDeque<Vec<u8>>),
    Hash(BTreeMap<String, Vec<u8>>),
    Set(BTreeSet<Vec<u8>>),
    ZSet(Vec<(f64, Vec<u8>)>),
}

struct SubEntry {
    writer: Arc<Mutex<TcpStream>>,
    channels: HashSet<String>,
    patterns: HashSet<String>,
}

struct ServerState {
    store: Mutex<HashMap<String, Entry>>,
    versions: Mutex<HashMap<String, u64>>,
    subscribers: Mutex<HashMap<usize, SubEntry>>,
    accepted: AtomicUsize,
    kill_next: AtomicBool,
    password: Option<String>,
}

struct ConnState {
    id: usize,
    authed: bool,
    queued: Option<Vec<Vec<Vec<u8>>>>,
    watches: HashMap<String, u64>,
}

// ── reply encoding ─────────────────────────────────────────────────────

fn status(s: &str) -> Vec<u8> {
    format!("+{s}\r\n").into_bytes()
}

fn error(msg: &str) -> Vec<u8> {
    format!("-{msg}\r\n").into_bytes()
}

fn int(i: i64) -> Vec<u8> {
    format!(":{i}\r\n").into_bytes()
}

fn bulk(data: &[u8]) -> Vec<u8> {
    let mut out = format!("${}\r\n", data.len()).into_bytes();
    out.extend_from_slice(data);
    out.extend_from_slice(b"\r\n");
    out
}

fn nil_bulk() -> Vec<u8> {
    b"$-1\r\n".to_vec()
}

fn multi(parts: Vec<Vec<u8>>) -> Vec<u8> {
    let mut out = format!("*{}\r\n", parts.len()).into_bytes();
    for part in parts {
        out.extend_from_slice(&part);
    }
    out
}

fn nil_multi() -> Vec<u8> {
    b"*-1\r\n".to_vec()
}

fn glob_match(p: &[u8], t: &[u8]) -> bool {
    match (p.first(), t.first()) {
        (None, None) => true,
        (Some(b'*'), _) => {
            glob_match(&p[1..], t) || (!t.is_empty() && glob_match(p, &t[1..]))
        }
        (Some(b'?'), Some(_)) => glob_match(&p[1..], &t[1..]),
        (Some(a), Some(b)) if a == b => glob_match(&p[1..], &t[1..]),
        _ => false,
    }
}

// ── request framing ────────────────────────────────────────────────────

fn read_line(reader: &mut BufReader<TcpStream>) -> io::Result<Option<String>> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end().to_string()))
}

fn read_command(reader: &mut BufReader<TcpStream>) -> io::Result<Option<Vec<Vec<u8>>>> {
    let header = match read_line(reader)? {
        Some(line) => line,
        None => return Ok(None),
    };
    let count: usize = header
        .strip_prefix('*')
        .and_then(|n| n.parse().ok())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "bad request header"))?;
    let mut args = Vec::with_capacity(count);
    for _ in 0..count {
        let len_line = read_line(reader)?
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "eof in request"))?;
        let len: usize = len_line
            .strip_prefix('$')
            .and_then(|n| n.parse().ok())
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "bad argument header"))?;
        let mut payload = vec![0u8; len + 2];
        reader.read_exact(&mut payload)?;
        payload.truncate(len);
        args.push(payload);
    }
    Ok(Some(args))
}

// ── server ─────────────────────────────────────────────────────────────

impl MockServer {
    pub fn start() -> MockServer {
        MockServer::with_password(None)
    }

    pub fn with_password(password: Option<&str>) -> MockServer {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock server");
        let addr = listener.local_addr().expect("local addr");
        let state = Arc::new(ServerState {
            store: Mutex::new(HashMap::new()),
            versions: Mutex::new(HashMap::new()),
            subscribers: Mutex::new(HashMap::new()),
            accepted: AtomicUsize::new(0),
            kill_next: AtomicBool::new(false),
            password: password.map(|p| p.to_string()),
        });

        let accept_state = Arc::clone(&state);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let stream = match stream {
                    Ok(s) => s,
                    Err(_) => break,
                };
                let id = accept_state.accepted.fetch_add(1, Ordering::SeqCst) + 1;
                let conn_state = Arc::clone(&accept_state);
                thread::spawn(move || {
                    let _ = serve_connection(conn_state, stream, id);
                });
            }
        });

        MockServer { addr, state }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn url(&self) -> String {
        format!("redis://{}/0?timeout=2s&maxidle=1", self.addr)
    }

    pub fn url_with(&self, suffix: &str) -> String {
        format!("redis://{}{}", self.addr, suffix)
    }

    pub fn client(&self) -> redlink::Client {
        redlink::Client::open(self.url()).expect("open client")
    }

    pub fn connections_accepted(&self) -> usize {
        self.state.accepted.load(Ordering::SeqCst)
    }
}

fn serve_connection(state: Arc<ServerState>, stream: TcpStream, id: usize) -> io::Result<()> {
    let writer = Arc::new(Mutex::new(stream.try_clone()?));
    let mut reader = BufReader::new(stream);
    let mut conn = ConnState {
        id,
        authed: false,
        queued: None,
        watches: HashMap::new(),
    };

    loop {
        let args = match read_command(&mut reader) {
            Ok(Some(args)) if !args.is_empty() => args,
            _ => break,
        };
        if state.kill_next.swap(false, Ordering::SeqCst) {
            break;
        }
        match dispatch(&state, &mut conn, &writer, args) {
            Ok(true) => continue,
            _ => break,
        }
    }

    state.subscribers.lock().unwrap().remove(&id);
    Ok(())
}

fn write_reply(writer: &Arc<Mutex<TcpStream>>, reply: &[u8]) -> io::Result<()> {
    writer.lock().unwrap().write_all(reply)
}

fn bump(state: &ServerState, key: &str) {
    *state
        .versions
        .lock()
        .unwrap()
        .entry(key.to_string())
        .or_insert(0) += 1;
}

fn version(state: &ServerState, key: &str) -> u64 {
    state
        .versions
        .lock()
        .unwrap()
        .get(key)
        .copied()
        .unwrap_or(0)
}

/// Returns `Ok(true)` to keep serving, `Ok(false)` to drop the
/// connection.
fn dispatch(
    state: &Arc<ServerState>,
    conn: &mut ConnState,
    writer: &Arc<Mutex<TcpStream>>,
    args: Vec<Vec<u8>>,
) -> io::Result<bool> {
    let verb = String::from_utf8_lossy(&args[0]).to_uppercase();

    if let Some(ref expected) = state.password {
        if !conn.authed && verb != "AUTH" {
            write_reply(writer, &error("NOAUTH Authentication required."))?;
            return Ok(true);
        }
        if verb == "AUTH" {
            let given = args.get(1).map(|a| String::from_utf8_lossy(a).to_string());
            let reply = if given.as_deref() == Some(expected.as_str()) {
                conn.authed = true;
                status("OK")
            } else {
                error("ERR invalid password")
            };
            write_reply(writer, &reply)?;
            return Ok(true);
        }
    } else if verb == "AUTH" {
        write_reply(
            writer,
            &error("ERR Client sent AUTH, but no password is set"),
        )?;
        return Ok(true);
    }

    // Test hooks and connection control first.
    match verb.as_str() {
        "DEBUG" => {
            let sub = args
                .get(1)
                .map(|a| String::from_utf8_lossy(a).to_uppercase())
                .unwrap_or_default();
            return match sub.as_str() {
                "QUIT" => Ok(false),
                "KILLNEXT" => {
                    state.kill_next.store(true, Ordering::SeqCst);
                    write_reply(writer, &status("OK"))?;
                    Ok(true)
                }
                "CONNCOUNT" => {
                    let count = state.accepted.load(Ordering::SeqCst) as i64;
                    write_reply(writer, &int(count))?;
                    Ok(true)
                }
                "SLEEP" => {
                    let ms: u64 = args
                        .get(2)
                        .and_then(|a| String::from_utf8_lossy(a).parse().ok())
                        .unwrap_or(0);
                    thread::sleep(Duration::from_millis(ms));
                    write_reply(writer, &status("OK"))?;
                    Ok(true)
                }
                _ => {
                    write_reply(writer, &error("ERR unknown DEBUG subcommand"))?;
                    Ok(true)
                }
            };
        }
        "SHUTDOWN" => return Ok(false),
        _ => {}
    }

    // Transaction control.
    match verb.as_str() {
        "MULTI" => {
            let reply = if conn.queued.is_some() {
                error("ERR MULTI calls can not be nested")
            } else {
                conn.queued = Some(vec![]);
                status("OK")
            };
            write_reply(writer, &reply)?;
            return Ok(true);
        }
        "WATCH" => {
            let reply = if conn.queued.is_some() {
                error("ERR WATCH inside MULTI is not allowed")
            } else {
                for key in &args[1..] {
                    let key = String::from_utf8_lossy(key).to_string();
                    let v = version(state, &key);
                    conn.watches.insert(key, v);
                }
                status("OK")
            };
            write_reply(writer, &reply)?;
            return Ok(true);
        }
        "UNWATCH" => {
            conn.watches.clear();
            write_reply(writer, &status("OK"))?;
            return Ok(true);
        }
        "DISCARD" => {
            let reply = if conn.queued.take().is_some() {
                conn.watches.clear();
                status("OK")
            } else {
                error("ERR DISCARD without MULTI")
            };
            write_reply(writer, &reply)?;
            return Ok(true);
        }
        "EXEC" => {
            let queued = match conn.queued.take() {
                Some(q) => q,
                None => {
                    write_reply(writer, &error("ERR EXEC without MULTI"))?;
                    return Ok(true);
                }
            };
            let tripped = conn
                .watches
                .iter()
                .any(|(key, seen)| version(state, key) != *seen);
            conn.watches.clear();
            let reply = if tripped {
                nil_multi()
            } else {
                multi(
                    queued
                        .into_iter()
                        .map(|queued_args| execute_data(state, &queued_args))
                        .collect(),
                )
            };
            write_reply(writer, &reply)?;
            return Ok(true);
        }
        _ => {}
    }

    if let Some(ref mut queued) = conn.queued {
        queued.push(args);
        write_reply(writer, &status("QUEUED"))?;
        return Ok(true);
    }

    // Pub/Sub.
    match verb.as_str() {
        "SUBSCRIBE" | "PSUBSCRIBE" | "UNSUBSCRIBE" | "PUNSUBSCRIBE" => {
            let mut subs = state.subscribers.lock().unwrap();
            let entry = subs.entry(conn.id).or_insert_with(|| SubEntry {
                writer: Arc::clone(writer),
                channels: HashSet::new(),
                patterns: HashSet::new(),
            });
            let names: Vec<String> = if args.len() > 1 {
                args[1..]
                    .iter()
                    .map(|a| String::from_utf8_lossy(a).to_string())
                    .collect()
            } else {
                // A bare (P)UNSUBSCRIBE means everything.
                match verb.as_str() {
                    "UNSUBSCRIBE" => entry.channels.iter().cloned().collect(),
                    _ => entry.patterns.iter().cloned().collect(),
                }
            };
            for name in names {
                let ack = match verb.as_str() {
                    "SUBSCRIBE" => {
                        entry.channels.insert(name.clone());
                        "subscribe"
                    }
                    "PSUBSCRIBE" => {
                        entry.patterns.insert(name.clone());
                        "psubscribe"
                    }
                    "UNSUBSCRIBE" => {
                        entry.channels.remove(&name);
                        "unsubscribe"
                    }
                    _ => {
                        entry.patterns.remove(&name);
                        "punsubscribe"
                    }
                };
                let count = (entry.channels.len() + entry.patterns.len()) as i64;
                let frame = multi(vec![bulk(ack.as_bytes()), bulk(name.as_bytes()), int(count)]);
                write_reply(&entry.writer, &frame)?;
            }
            return Ok(true);
        }
        "PUBLISH" => {
            let channel = String::from_utf8_lossy(&args[1]).to_string();
            let payload = args[2].clone();
            let mut receivers = 0;
            let subs = state.subscribers.lock().unwrap();
            for entry in subs.values() {
                if entry.channels.contains(&channel) {
                    let frame = multi(vec![
                        bulk(b"message"),
                        bulk(channel.as_bytes()),
                        bulk(&payload),
                    ]);
                    let _ = write_reply(&entry.writer, &frame);
                    receivers += 1;
                }
                for pattern in &entry.patterns {
                    if glob_match(pattern.as_bytes(), channel.as_bytes()) {
                        let frame = multi(vec![
                            bulk(b"pmessage"),
                            bulk(pattern.as_bytes()),
                            bulk(channel.as_bytes()),
                            bulk(&payload),
                        ]);
                        let _ = write_reply(&entry.writer, &frame);
                        receivers += 1;
                    }
                }
            }
            drop(subs);
            write_reply(writer, &int(receivers))?;
            return Ok(true);
        }
        _ => {}
    }

    // Blocking pops poll the store off-lock until the deadline.
    if verb == "BLPOP" || verb == "BRPOP" {
        let timeout: u64 = String::from_utf8_lossy(args.last().unwrap())
            .parse()
            .unwrap_or(0);
        let keys: Vec<String> = args[1..args.len() - 1]
            .iter()
            .map(|a| String::from_utf8_lossy(a).to_string())
            .collect();
        let deadline = Instant::now() + Duration::from_secs(timeout);
        loop {
            let mut frame = None;
            {
                let mut store = state.store.lock().unwrap();
                for key in &keys {
                    if let Some(Entry::List(list)) = store.get_mut(key.as_str()) {
                        let popped = if verb == "BLPOP" {
                            list.pop_front()
                        } else {
                            list.pop_back()
                        };
                        if let Some(element) = popped {
                            bump(state, key);
                            frame = Some(multi(vec![bulk(key.as_bytes()), bulk(&element)]));
                            break;
                        }
                    }
                }
            }
            if let Some(frame) = frame {
                write_reply(writer, &frame)?;
                return Ok(true);
            }
            if timeout > 0 && Instant::now() >= deadline {
                write_reply(writer, &nil_multi())?;
                return Ok(true);
            }
            thread::sleep(Duration::from_millis(5));
        }
    }

    let reply = execute_data(state, &args);
    write_reply(writer, &reply)?;
    Ok(true)
}

// ── data commands ──────────────────────────────────────────────────────

fn text(arg: &[u8]) -> String {
    String::from_utf8_lossy(arg).to_string()
}

fn parse_int(arg: &[u8]) -> Option<i64> {
    String::from_utf8_lossy(arg).parse().ok()
}

fn execute_data(state: &ServerState, args: &[Vec<u8>]) -> Vec<u8> {
    let verb = String::from_utf8_lossy(&args[0]).to_uppercase();
    let mut store = state.store.lock().unwrap();

    macro_rules! wrongtype {
        () => {
            return error("WRONGTYPE Operation against a key holding the wrong kind of value")
        };
    }

    match verb.as_str() {
        "PING" => status("PONG"),
        "ECHO" => bulk(&args[1]),
        "SELECT" => status("OK"),
        "QUIT" => status("OK"),

        "SET" => {
            let key = text(&args[1]);
            let mut must_exist = false;
            let mut must_not_exist = false;
            let mut i = 3;
            while i < args.len() {
                match String::from_utf8_lossy(&args[i]).to_uppercase().as_str() {
                    "EX" | "PX" => i += 2,
                    "NX" => {
                        must_not_exist = true;
                        i += 1;
                    }
                    "XX" => {
                        must_exist = true;
                        i += 1;
                    }
                    _ => return error("ERR syntax error"),
                }
            }
            let exists = store.contains_key(&key);
            if (must_exist && !exists) || (must_not_exist && exists) {
                return nil_bulk();
            }
            store.insert(key.clone(), Entry::Str(args[2].clone()));
            bump(state, &key);
            status("OK")
        }
        "GET" => match store.get(&text(&args[1])) {
            None => nil_bulk(),
            Some(Entry::Str(data)) => bulk(data),
            Some(_) => wrongtype!(),
        },
        "GETRANGE" => match store.get(&text(&args[1])) {
            None => bulk(b""),
            Some(Entry::Str(data)) => {
                let len = data.len() as i64;
                let norm = |i: i64| -> i64 {
                    if i < 0 {
                        (len + i).max(0)
                    } else {
                        i.min(len - 1)
                    }
                };
                if len == 0 {
                    return bulk(b"");
                }
                let (start, end) = (norm(parse_int(&args[2]).unwrap_or(0)),
                                    norm(parse_int(&args[3]).unwrap_or(-1)));
                if start > end {
                    bulk(b"")
                } else {
                    bulk(&data[start as usize..=(end as usize)])
                }
            }
            Some(_) => wrongtype!(),
        },
        "SETBIT" => {
            let key = text(&args[1]);
            let offset = parse_int(&args[2]).unwrap_or(0) as usize;
            let value = parse_int(&args[3]).unwrap_or(0);
            let data = match store
                .entry(key.clone())
                .or_insert_with(|| Entry::Str(vec![]))
            {
                Entry::Str(data) => data,
                _ => wrongtype!(),
            };
            let byte = offset / 8;
            let bit = 7 - (offset % 8);
            if data.len() <= byte {
                data.resize(byte + 1, 0);
            }
            let old = (data[byte] >> bit) & 1;
            if value != 0 {
                data[byte] |= 1 << bit;
            } else {
                data[byte] &= !(1 << bit);
            }
            bump(state, &key);
            int(old as i64)
        }
        "GETBIT" => match store.get(&text(&args[1])) {
            None => int(0),
            Some(Entry::Str(data)) => {
                let offset = parse_int(&args[2]).unwrap_or(0) as usize;
                let byte = offset / 8;
                let bit = 7 - (offset % 8);
                if data.len() <= byte {
                    int(0)
                } else {
                    int(((data[byte] >> bit) & 1) as i64)
                }
            }
            Some(_) => wrongtype!(),
        },
        "APPEND" => {
            let key = text(&args[1]);
            let data = match store
                .entry(key.clone())
                .or_insert_with(|| Entry::Str(vec![]))
            {
                Entry::Str(data) => data,
                _ => wrongtype!(),
            };
            data.extend_from_slice(&args[2]);
            let len = data.len() as i64;
            bump(state, &key);
            int(len)
        }
        "STRLEN" => match store.get(&text(&args[1])) {
            None => int(0),
            Some(Entry::Str(data)) => int(data.len() as i64),
            Some(_) => wrongtype!(),
        },
        "SETNX" => {
            let key = text(&args[1]);
            if store.contains_key(&key) {
                int(0)
            } else {
                store.insert(key.clone(), Entry::Str(args[2].clone()));
                bump(state, &key);
                int(1)
            }
        }
        "SETEX" | "PSETEX" => {
            let key = text(&args[1]);
            store.insert(key.clone(), Entry::Str(args[3].clone()));
            bump(state, &key);
            status("OK")
        }
        "MGET" => multi(
            args[1..]
                .iter()
                .map(|key| match store.get(&text(key)) {
                    Some(Entry::Str(data)) => bulk(data),
                    _ => nil_bulk(),
                })
                .collect(),
        ),
        "MSET" => {
            for pair in args[1..].chunks(2) {
                let key = text(&pair[0]);
                store.insert(key.clone(), Entry::Str(pair[1].clone()));
                bump(state, &key);
            }
            status("OK")
        }
        "INCR" | "DECR" | "INCRBY" | "DECRBY" => {
            let key = text(&args[1]);
            let delta = match verb.as_str() {
                "INCR" => 1,
                "DECR" => -1,
                "INCRBY" => match parse_int(&args[2]) {
                    Some(n) => n,
                    None => return error("ERR value is not an integer or out of range"),
                },
                _ => match parse_int(&args[2]) {
                    Some(n) => -n,
                    None => return error("ERR value is not an integer or out of range"),
                },
            };
            let current = match store.get(&key) {
                None => 0,
                Some(Entry::Str(data)) => match String::from_utf8_lossy(data).parse::<i64>() {
                    Ok(n) => n,
                    Err(_) => return error("ERR value is not an integer or out of range"),
                },
                Some(_) => wrongtype!(),
            };
            let next = current + delta;
            store.insert(key.clone(), Entry::Str(next.to_string().into_bytes()));
            bump(state, &key);
            int(next)
        }
        "INCRBYFLOAT" => {
            let key = text(&args[1]);
            let delta: f64 = match String::from_utf8_lossy(&args[2]).parse() {
                Ok(f) => f,
                Err(_) => return error("ERR value is not a valid float"),
            };
            let current: f64 = match store.get(&key) {
                None => 0.0,
                Some(Entry::Str(data)) => match String::from_utf8_lossy(data).parse() {
                    Ok(f) => f,
                    Err(_) => return error("ERR value is not a valid float"),
                },
                Some(_) => wrongtype!(),
            };
            let next = current + delta;
            let rendered = format!("{next}");
            store.insert(key.clone(), Entry::Str(rendered.clone().into_bytes()));
            bump(state, &key);
            bulk(rendered.as_bytes())
        }

        "DEL" => {
            let mut removed = 0;
            for key in &args[1..] {
                let key = text(key);
                if store.remove(&key).is_some() {
                    removed += 1;
                    bump(state, &key);
                }
            }
            int(removed)
        }
        "EXISTS" => {
            let found = args[1..]
                .iter()
                .filter(|key| store.contains_key(&text(key)))
                .count();
            int(found as i64)
        }
        "KEYS" => {
            let mut keys: Vec<&String> = store
                .keys()
                .filter(|key| glob_match(&args[1], key.as_bytes()))
                .collect();
            keys.sort();
            multi(keys.into_iter().map(|k| bulk(k.as_bytes())).collect())
        }
        "SCAN" => {
            let mut pattern: Vec<u8> = b"*".to_vec();
            let mut i = 2;
            while i + 1 < args.len() {
                if String::from_utf8_lossy(&args[i]).to_uppercase() == "MATCH" {
                    pattern = args[i + 1].clone();
                }
                i += 2;
            }
            let mut keys: Vec<&String> = store
                .keys()
                .filter(|key| glob_match(&pattern, key.as_bytes()))
                .collect();
            keys.sort();
            multi(vec![
                bulk(b"0"),
                multi(keys.into_iter().map(|k| bulk(k.as_bytes())).collect()),
            ])
        }
        "TYPE" => match store.get(&text(&args[1])) {
            None => status("none"),
            Some(Entry::Str(_)) => status("string"),
            Some(Entry::List(_)) => status("list"),
            Some(Entry::Hash(_)) => status("hash"),
            Some(Entry::Set(_)) => status("set"),
            Some(Entry::ZSet(_)) => status("zset"),
        },
        "TTL" | "PTTL" => {
            if store.contains_key(&text(&args[1])) {
                int(-1)
            } else {
                int(-2)
            }
        }
        "EXPIRE" | "PEXPIRE" | "PERSIST" => {
            if store.contains_key(&text(&args[1])) {
                int(1)
            } else {
                int(0)
            }
        }
        "RENAME" => {
            let from = text(&args[1]);
            let to = text(&args[2]);
            match store.remove(&from) {
                None => error("ERR no such key"),
                Some(entry) => {
                    store.insert(to.clone(), entry);
                    bump(state, &from);
                    bump(state, &to);
                    status("OK")
                }
            }
        }
        "DBSIZE" => int(store.len() as i64),
        "FLUSHDB" | "FLUSHALL" => {
            store.clear();
            status("OK")
        }

        "LPUSH" | "RPUSH" => {
            let key = text(&args[1]);
            let list = match store
                .entry(key.clone())
                .or_insert_with(|| Entry::List(VecDeque::new()))
            {
                Entry::List(list) => list,
                _ => wrongtype!(),
            };
            for value in &args[2..] {
                if verb == "LPUSH" {
                    list.push_front(value.clone());
                } else {
                    list.push_back(value.clone());
                }
            }
            let len = list.len() as i64;
            bump(state, &key);
            int(len)
        }
        "LPOP" | "RPOP" => {
            let key = text(&args[1]);
            match store.get_mut(&key) {
                None => nil_bulk(),
                Some(Entry::List(list)) => {
                    let popped = if verb == "LPOP" {
                        list.pop_front()
                    } else {
                        list.pop_back()
                    };
                    match popped {
                        Some(element) => {
                            bump(state, &key);
                            bulk(&element)
                        }
                        None => nil_bulk(),
                    }
                }
                Some(_) => wrongtype!(),
            }
        }
        "LLEN" => match store.get(&text(&args[1])) {
            None => int(0),
            Some(Entry::List(list)) => int(list.len() as i64),
            Some(_) => wrongtype!(),
        },
        "LRANGE" => match store.get(&text(&args[1])) {
            None => multi(vec![]),
            Some(Entry::List(list)) => {
                let len = list.len() as i64;
                let norm = |i: i64| if i < 0 { (len + i).max(0) } else { i };
                let start = norm(parse_int(&args[2]).unwrap_or(0));
                let stop = norm(parse_int(&args[3]).unwrap_or(-1)).min(len - 1);
                if len == 0 || start > stop {
                    multi(vec![])
                } else {
                    multi(
                        list.iter()
                            .skip(start as usize)
                            .take((stop - start + 1) as usize)
                            .map(|e| bulk(e))
                            .collect(),
                    )
                }
            }
            Some(_) => wrongtype!(),
        },
        "LINSERT" => {
            let key = text(&args[1]);
            let before = String::from_utf8_lossy(&args[2]).to_uppercase() == "BEFORE";
            match store.get_mut(&key) {
                None => int(0),
                Some(Entry::List(list)) => {
                    match list.iter().position(|e| *e == args[3]) {
                        None => int(-1),
                        Some(pos) => {
                            let at = if before { pos } else { pos + 1 };
                            list.insert(at, args[4].clone());
                            let len = list.len() as i64;
                            bump(state, &key);
                            int(len)
                        }
                    }
                }
                Some(_) => wrongtype!(),
            }
        }

        "HSET" | "HSETNX" => {
            let key = text(&args[1]);
            let field = text(&args[2]);
            let hash = match store
                .entry(key.clone())
                .or_insert_with(|| Entry::Hash(BTreeMap::new()))
            {
                Entry::Hash(hash) => hash,
                _ => wrongtype!(),
            };
            let existed = hash.contains_key(&field);
            if verb == "HSETNX" && existed {
                return int(0);
            }
            hash.insert(field, args[3].clone());
            bump(state, &key);
            int(if existed { 0 } else { 1 })
        }
        "HMSET" => {
            let key = text(&args[1]);
            let hash = match store
                .entry(key.clone())
                .or_insert_with(|| Entry::Hash(BTreeMap::new()))
            {
                Entry::Hash(hash) => hash,
                _ => wrongtype!(),
            };
            for pair in args[2..].chunks(2) {
                hash.insert(text(&pair[0]), pair[1].clone());
            }
            bump(state, &key);
            status("OK")
        }
        "HGET" => match store.get(&text(&args[1])) {
            None => nil_bulk(),
            Some(Entry::Hash(hash)) => match hash.get(&text(&args[2])) {
                Some(value) => bulk(value),
                None => nil_bulk(),
            },
            Some(_) => wrongtype!(),
        },
        "HGETALL" => match store.get(&text(&args[1])) {
            None => multi(vec![]),
            Some(Entry::Hash(hash)) => multi(
                hash.iter()
                    .flat_map(|(field, value)| vec![bulk(field.as_bytes()), bulk(value)])
                    .collect(),
            ),
            Some(_) => wrongtype!(),
        },
        "HMGET" => match store.get(&text(&args[1])) {
            None => multi(args[2..].iter().map(|_| nil_bulk()).collect()),
            Some(Entry::Hash(hash)) => multi(
                args[2..]
                    .iter()
                    .map(|field| match hash.get(&text(field)) {
                        Some(value) => bulk(value),
                        None => nil_bulk(),
                    })
                    .collect(),
            ),
            Some(_) => wrongtype!(),
        },
        "HDEL" => {
            let key = text(&args[1]);
            match store.get_mut(&key) {
                None => int(0),
                Some(Entry::Hash(hash)) => {
                    let removed = args[2..]
                        .iter()
                        .filter(|field| hash.remove(&text(field)).is_some())
                        .count();
                    bump(state, &key);
                    int(removed as i64)
                }
                Some(_) => wrongtype!(),
            }
        }
        "HLEN" => match store.get(&text(&args[1])) {
            None => int(0),
            Some(Entry::Hash(hash)) => int(hash.len() as i64),
            Some(_) => wrongtype!(),
        },

        "SADD" => {
            let key = text(&args[1]);
            let set = match store
                .entry(key.clone())
                .or_insert_with(|| Entry::Set(BTreeSet::new()))
            {
                Entry::Set(set) => set,
                _ => wrongtype!(),
            };
            let added = args[2..]
                .iter()
                .filter(|member| set.insert(member.to_vec()))
                .count();
            bump(state, &key);
            int(added as i64)
        }
        "SREM" => {
            let key = text(&args[1]);
            match store.get_mut(&key) {
                None => int(0),
                Some(Entry::Set(set)) => {
                    let removed = args[2..]
                        .iter()
                        .filter(|member| set.remove(member.as_slice()))
                        .count();
                    bump(state, &key);
                    int(removed as i64)
                }
                Some(_) => wrongtype!(),
            }
        }
        "SMEMBERS" => match store.get(&text(&args[1])) {
            None => multi(vec![]),
            Some(Entry::Set(set)) => multi(set.iter().map(|m| bulk(m)).collect()),
            Some(_) => wrongtype!(),
        },
        "SCARD" => match store.get(&text(&args[1])) {
            None => int(0),
            Some(Entry::Set(set)) => int(set.len() as i64),
            Some(_) => wrongtype!(),
        },
        "SISMEMBER" => match store.get(&text(&args[1])) {
            None => int(0),
            Some(Entry::Set(set)) => int(set.contains(args[2].as_slice()) as i64),
            Some(_) => wrongtype!(),
        },

        "ZADD" => {
            let key = text(&args[1]);
            let zset = match store
                .entry(key.clone())
                .or_insert_with(|| Entry::ZSet(vec![]))
            {
                Entry::ZSet(zset) => zset,
                _ => wrongtype!(),
            };
            let mut added = 0;
            for pair in args[2..].chunks(2) {
                let score: f64 = String::from_utf8_lossy(&pair[0]).parse().unwrap_or(0.0);
                let member = pair[1].clone();
                match zset.iter_mut().find(|(_, m)| *m == member) {
                    Some(slot) => slot.0 = score,
                    None => {
                        zset.push((score, member));
                        added += 1;
                    }
                }
            }
            zset.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap().then(a.1.cmp(&b.1)));
            bump(state, &key);
            int(added)
        }
        "ZSCORE" => match store.get(&text(&args[1])) {
            None => nil_bulk(),
            Some(Entry::ZSet(zset)) => match zset.iter().find(|(_, m)| *m == args[2]) {
                Some((score, _)) => bulk(format!("{score}").as_bytes()),
                None => nil_bulk(),
            },
            Some(_) => wrongtype!(),
        },
        "ZRANK" => match store.get(&text(&args[1])) {
            None => nil_bulk(),
            Some(Entry::ZSet(zset)) => match zset.iter().position(|(_, m)| *m == args[2]) {
                Some(rank) => int(rank as i64),
                None => nil_bulk(),
            },
            Some(_) => wrongtype!(),
        },
        "ZCARD" => match store.get(&text(&args[1])) {
            None => int(0),
            Some(Entry::ZSet(zset)) => int(zset.len() as i64),
            Some(_) => wrongtype!(),
        },
        "ZRANGE" => match store.get(&text(&args[1])) {
            None => multi(vec![]),
            Some(Entry::ZSet(zset)) => {
                let withscores = args
                    .last()
                    .map(|a| String::from_utf8_lossy(a).to_uppercase() == "WITHSCORES")
                    .unwrap_or(false);
                let len = zset.len() as i64;
                let norm = |i: i64| if i < 0 { (len + i).max(0) } else { i };
                let start = norm(parse_int(&args[2]).unwrap_or(0));
                let stop = norm(parse_int(&args[3]).unwrap_or(-1)).min(len - 1);
                if len == 0 || start > stop {
                    multi(vec![])
                } else {
                    let mut parts = vec![];
                    for (score, member) in zset
                        .iter()
                        .skip(start as usize)
                        .take((stop - start + 1) as usize)
                    {
                        parts.push(bulk(member));
                        if withscores {
                            parts.push(bulk(format!("{score}").as_bytes()));
                        }
                    }
                    multi(parts)
                }
            }
            Some(_) => wrongtype!(),
        },

        "TIME" => {
            let now = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default();
            multi(vec![
                bulk(now.as_secs().to_string().as_bytes()),
                bulk(now.subsec_micros().to_string().as_bytes()),
            ])
        }
        "CLIENT" => {
            let sub = String::from_utf8_lossy(&args[1]).to_uppercase();
            match sub.as_str() {
                "LIST" => {
                    let count = state.accepted.load(Ordering::SeqCst).max(1);
                    let mut lines = String::new();
                    for id in 1..=count {
                        lines.push_str(&format!(
                            "id={id} addr=127.0.0.1:{id} name= db=0 cmd=client\n"
                        ));
                    }
                    bulk(lines.as_bytes())
                }
                "SETNAME" => status("OK"),
                "GETNAME" => nil_bulk(),
                _ => error("ERR unknown CLIENT subcommand"),
            }
        }

        _ => error(&format!("ERR unknown command '{verb}'")),
    }
}
