//! Server Tests
//!
//! End-to-end tests over real TCP connections:
//! - The PING/SET/GET/EXISTS/DEL walkthrough
//! - Malformed payload resilience
//! - Disconnects, truncated and oversized frames
//! - Concurrent clients
//! - Client connection-state errors
//! - Listener shutdown

use std::io::Write;
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use serde_json::{json, Value};
use ssmp::protocol::{frame, Reply, Token};
use ssmp::{Client, Config, Engine, Server, ShutdownHandle, SsmpError, Store};

// =============================================================================
// Helper Functions
// =============================================================================

struct TestServer {
    addr: SocketAddr,
    store: Arc<Store>,
    handle: ShutdownHandle,
    join: Option<JoinHandle<ssmp::Result<()>>>,
}

impl TestServer {
    fn start() -> Self {
        Self::start_with(Config::builder().listen_addr("127.0.0.1:0").build())
    }

    fn start_with(config: Config) -> Self {
        let store = Arc::new(Store::new());
        let engine = Arc::new(Engine::new(Arc::clone(&store)));
        let server = Server::bind(config, engine).unwrap();
        let addr = server.local_addr();
        let handle = server.shutdown_handle();
        let join = server.spawn().unwrap();

        Self { addr, store, handle, join: Some(join) }
    }

    fn client(&self) -> Client {
        Client::open(self.addr.to_string()).unwrap()
    }

    fn raw(&self) -> TcpStream {
        TcpStream::connect(self.addr).unwrap()
    }

    fn stop(&mut self) -> ssmp::Result<()> {
        self.handle.shutdown();
        match self.join.take() {
            Some(join) => join.join().unwrap(),
            None => Ok(()),
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

fn send_raw(stream: &mut TcpStream, payload: &[u8]) {
    frame::write_frame(stream, payload).unwrap();
}

fn recv_json(stream: &mut TcpStream) -> Value {
    let payload = frame::read_frame(stream, 1024 * 1024).unwrap().expect("response frame");
    serde_json::from_slice(&payload).unwrap()
}

fn text(s: &str) -> Token {
    Token::text(s)
}

// =============================================================================
// End-to-End Tests
// =============================================================================

#[test]
fn test_end_to_end_scenario() {
    let server = TestServer::start();
    let mut client = server.client();

    assert_eq!(client.call(&["PING"]).unwrap(), Reply::Ok(vec![text("PONG")]));
    assert_eq!(client.call(&["SET", "user:1", "Alice"]).unwrap(), Reply::Ok(vec![]));
    assert_eq!(client.call(&["GET", "user:1"]).unwrap(), Reply::Ok(vec![text("Alice")]));
    assert_eq!(client.call(&["EXISTS", "user:1"]).unwrap(), Reply::Ok(vec![Token::Count(1)]));
    assert_eq!(client.call(&["DEL", "user:1"]).unwrap(), Reply::Ok(vec![Token::Count(1)]));
    assert_eq!(client.call(&["EXISTS", "user:1"]).unwrap(), Reply::Ok(vec![Token::Count(0)]));
    assert_eq!(client.call(&["GET", "user:1"]).unwrap(), Reply::Err("NOT_FOUND".to_string()));
}

#[test]
fn test_end_to_end_wire_bytes() {
    let server = TestServer::start();
    let mut stream = server.raw();

    let exchanges = [
        (json!(["PING"]), json!(["OK", "PONG"])),
        (json!(["SET", "user:1", "Alice"]), json!(["OK"])),
        (json!(["GET", "user:1"]), json!(["OK", "Alice"])),
        (json!(["EXISTS", "user:1"]), json!(["OK", 1])),
        (json!(["DEL", "user:1"]), json!(["OK", 1])),
        (json!(["EXISTS", "user:1"]), json!(["OK", 0])),
        (json!(["GET", "user:1"]), json!(["ERR", "NOT_FOUND"])),
    ];

    for (request, expected) in exchanges {
        send_raw(&mut stream, request.to_string().as_bytes());
        assert_eq!(recv_json(&mut stream), expected, "request {}", request);
    }
}

#[test]
fn test_typed_client_methods() {
    let server = TestServer::start();
    let mut client = server.client();

    client.ping().unwrap();
    client.set("k", "").unwrap();
    assert_eq!(client.get("k").unwrap(), Some(String::new()));
    assert_eq!(client.exists("k").unwrap(), 1);
    assert_eq!(client.delete("k").unwrap(), 1);
    assert_eq!(client.delete("k").unwrap(), 0);
    assert_eq!(client.get("k").unwrap(), None);
}

#[test]
fn test_control_characters_round_trip() {
    let server = TestServer::start();
    let mut client = server.client();
    let value = "line1\nline2\t\u{0}\u{1b}[0m \"quoted\" ünïcödé";

    client.set("ctl\r\n", value).unwrap();

    assert_eq!(client.get("ctl\r\n").unwrap(), Some(value.to_string()));
}

#[test]
fn test_unknown_command_over_the_wire() {
    let server = TestServer::start();
    let mut client = server.client();
    client.set("k", "v").unwrap();

    assert_eq!(
        client.call(&["FLUSHALL"]).unwrap(),
        Reply::Err("UNKNOWN_COMMAND".to_string())
    );
    assert_eq!(
        client.call(&["GET", "k", "extra"]).unwrap(),
        Reply::Err("UNKNOWN_COMMAND".to_string())
    );
    assert!(matches!(client.exists("k"), Ok(1)));
    assert_eq!(server.store.len(), 1);
}

#[test]
fn test_server_error_surfaces_on_typed_methods() {
    let server = TestServer::start();
    let mut client = server.client();

    // PING with an argument is an arity error
    match client.call(&["PING", "extra"]) {
        Ok(Reply::Err(reason)) => assert_eq!(reason, "UNKNOWN_COMMAND"),
        other => panic!("Expected UNKNOWN_COMMAND, got {:?}", other),
    }

    // Lowercase commands are accepted
    assert_eq!(client.call(&["ping"]).unwrap(), Reply::Ok(vec![text("PONG")]));
}

// =============================================================================
// Malformed Input Tests
// =============================================================================

#[test]
fn test_malformed_payload_keeps_connection_open() {
    let server = TestServer::start();
    let mut stream = server.raw();

    for bad in [&b"not json"[..], b"[]", b"{}", br#"[1,2]"#, b"", b"[\"\xFF\"]"] {
        send_raw(&mut stream, bad);
        assert_eq!(recv_json(&mut stream), json!(["ERR", "INVALID_PAYLOAD"]));
    }

    send_raw(&mut stream, br#"["PING"]"#);
    assert_eq!(recv_json(&mut stream), json!(["OK", "PONG"]));
    assert!(server.store.is_empty());
}

#[test]
fn test_clean_disconnect_between_requests() {
    let server = TestServer::start();

    {
        let mut stream = server.raw();
        send_raw(&mut stream, br#"["SET","a","1"]"#);
        assert_eq!(recv_json(&mut stream), json!(["OK"]));
    }

    let mut client = server.client();
    assert_eq!(client.get("a").unwrap(), Some("1".to_string()));
}

#[test]
fn test_truncated_payload_closes_connection() {
    let server = TestServer::start();
    let mut stream = server.raw();

    stream.write_all(&[0, 0, 0, 20]).unwrap();
    stream.write_all(br#"["SET""#).unwrap();
    stream.shutdown(Shutdown::Write).unwrap();

    // No response, just EOF
    assert!(matches!(frame::read_frame(&mut stream, 1024), Ok(None)));

    // Other connections are unaffected
    let mut client = server.client();
    client.ping().unwrap();
    assert!(server.store.is_empty());
}

#[test]
fn test_oversized_header_closes_connection() {
    let config = Config::builder()
        .listen_addr("127.0.0.1:0")
        .max_payload_size(64)
        .build();
    let server = TestServer::start_with(config);
    let mut stream = server.raw();

    stream.write_all(&65u32.to_be_bytes()).unwrap();

    assert!(matches!(frame::read_frame(&mut stream, 1024), Ok(None) | Err(_)));

    let mut client = server.client();
    client.ping().unwrap();
}

#[test]
fn test_payload_at_limit_is_accepted() {
    let config = Config::builder()
        .listen_addr("127.0.0.1:0")
        .max_payload_size(32)
        .build();
    let server = TestServer::start_with(config);
    let mut stream = server.raw();

    // ["SET","k","<value>"] padded to exactly 32 bytes
    let value = "x".repeat(32 - r#"["SET","k",""]"#.len());
    let payload = json!(["SET", "k", value]).to_string();
    assert_eq!(payload.len(), 32);

    send_raw(&mut stream, payload.as_bytes());
    assert_eq!(recv_json(&mut stream), json!(["OK"]));
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_clients_disjoint_keys() {
    let server = TestServer::start();
    let addr = server.addr.to_string();

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let addr = addr.clone();
            thread::spawn(move || {
                let mut client = Client::open(addr).unwrap();
                for i in 0..50 {
                    let key = format!("k{}", t);
                    let value = format!("v{}-{}", t, i);
                    client.set(&key, &value).unwrap();
                    assert_eq!(client.get(&key).unwrap(), Some(value));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let mut client = server.client();
    for t in 0..8 {
        assert_eq!(client.get(&format!("k{}", t)).unwrap(), Some(format!("v{}-49", t)));
    }
    assert_eq!(server.store.len(), 8);
}

#[test]
fn test_concurrent_clients_same_key() {
    let server = TestServer::start();
    let addr = server.addr.to_string();

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let addr = addr.clone();
            thread::spawn(move || {
                let mut client = Client::open(addr).unwrap();
                for i in 0..50 {
                    client.set("shared", &format!("writer-{}-{}", t, i)).unwrap();
                    assert!(client.get("shared").unwrap().is_some());
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let value = server.client().get("shared").unwrap().unwrap();
    let valid = (0..8).any(|t| (0..50).any(|i| value == format!("writer-{}-{}", t, i)));
    assert!(valid, "unexpected value {:?}", value);
}

// =============================================================================
// Client State Tests
// =============================================================================

#[test]
fn test_client_not_connected() {
    let mut client = Client::new("127.0.0.1:6380");

    assert!(!client.is_connected());
    assert!(matches!(client.call(&["PING"]), Err(SsmpError::NotConnected)));
    assert!(matches!(client.ping(), Err(SsmpError::NotConnected)));
}

#[test]
fn test_client_close_then_call() {
    let server = TestServer::start();
    let mut client = server.client();
    client.ping().unwrap();

    client.close();

    assert!(!client.is_connected());
    assert!(matches!(client.get("k"), Err(SsmpError::NotConnected)));

    client.connect().unwrap();
    client.ping().unwrap();
}

#[test]
fn test_client_reconnect_replaces_connection() {
    let server = TestServer::start();
    let mut client = server.client();
    client.set("k", "v").unwrap();

    client.connect().unwrap();

    assert!(client.is_connected());
    assert_eq!(client.get("k").unwrap(), Some("v".to_string()));
}

#[test]
fn test_client_empty_request_rejected_locally() {
    let server = TestServer::start();
    let mut client = server.client();
    let empty: [&str; 0] = [];

    assert!(matches!(client.call(&empty), Err(SsmpError::InvalidPayload(_))));

    // Nothing was sent, so the connection is still usable
    assert!(client.is_connected());
    client.ping().unwrap();
}

#[test]
fn test_client_peer_vanishes_mid_reply() {
    // A fake server that reads one request, sends half a frame, and hangs up
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let fake = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let _ = frame::read_frame(&mut stream, 1024).unwrap();
        stream.write_all(&[0, 0, 0, 13, b'[']).unwrap();
    });

    let mut client = Client::open(addr.to_string()).unwrap();
    let result = client.call(&["PING"]);
    fake.join().unwrap();

    assert!(matches!(result, Err(SsmpError::ConnectionClosed)), "got {:?}", result);
    assert!(!client.is_connected());
    assert!(matches!(client.ping(), Err(SsmpError::NotConnected)));
}

#[test]
fn test_client_peer_hangs_up_without_reply() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let fake = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let _ = frame::read_frame(&mut stream, 1024).unwrap();
    });

    let mut client = Client::open(addr.to_string()).unwrap();
    let result = client.call(&["PING"]);
    fake.join().unwrap();

    assert!(matches!(result, Err(SsmpError::ConnectionClosed)), "got {:?}", result);
    assert!(!client.is_connected());
}

#[test]
fn test_client_drops_connection_on_malformed_reply() {
    // A fake server that answers with a frame that is not JSON, then
    // keeps the socket open
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let fake = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let _ = frame::read_frame(&mut stream, 1024).unwrap();
        frame::write_frame(&mut stream, b"not json").unwrap();
        stream
    });

    let mut client = Client::open(addr.to_string()).unwrap();
    let result = client.call(&["PING"]);
    let _stream = fake.join().unwrap();

    assert!(result.is_err());
    assert!(!client.is_connected());
    assert!(matches!(client.ping(), Err(SsmpError::NotConnected)));
}

#[test]
fn test_client_oversized_reply_drops_connection() {
    let config = Config::builder()
        .listen_addr("127.0.0.1:0")
        .max_payload_size(1024 * 1024)
        .build();
    let server = TestServer::start_with(config);
    let value = "x".repeat(100);

    let mut client = Client::new(server.addr.to_string()).with_max_payload_size(64);
    client.connect().unwrap();
    client.set("big", &value).unwrap();

    // The reply frame is larger than the client accepts
    let result = client.get("big");
    assert!(matches!(result, Err(SsmpError::FrameTooLarge { .. })), "got {:?}", result);

    // The unread reply must not be parsed as the next frame
    assert!(!client.is_connected());
    assert!(matches!(client.ping(), Err(SsmpError::NotConnected)));

    client.connect().unwrap();
    client.ping().unwrap();
}

#[test]
fn test_client_max_payload_size_is_configurable() {
    let config = Config::builder()
        .listen_addr("127.0.0.1:0")
        .max_payload_size(1024 * 1024)
        .build();
    let server = TestServer::start_with(config);
    let value = "y".repeat(64 * 1024);

    assert_eq!(
        Client::new(server.addr.to_string()).max_payload_size(),
        ssmp::config::DEFAULT_MAX_PAYLOAD_SIZE
    );

    let mut small = Client::new(server.addr.to_string()).with_max_payload_size(1024);
    small.connect().unwrap();
    small.set("wide", &value).unwrap();
    assert!(matches!(small.get("wide"), Err(SsmpError::FrameTooLarge { .. })));

    let mut large = Client::new(server.addr.to_string()).with_max_payload_size(128 * 1024);
    assert_eq!(large.max_payload_size(), 128 * 1024);
    large.connect().unwrap();
    assert_eq!(large.get("wide").unwrap(), Some(value));
}

#[test]
fn test_client_connect_refused() {
    // Bind then drop to get a port with nothing listening
    let addr = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap();

    let mut client = Client::new(addr.to_string());
    assert!(matches!(client.connect(), Err(SsmpError::Io(_))));
    assert!(!client.is_connected());
}

// =============================================================================
// Shutdown Tests
// =============================================================================

#[test]
fn test_shutdown_stops_accepting() {
    let mut server = TestServer::start();
    let addr = server.addr;

    server.stop().unwrap();

    assert!(server.handle.is_shutdown());
    assert!(TcpStream::connect(addr).is_err());
}

#[test]
fn test_shutdown_leaves_active_connections_running() {
    let mut server = TestServer::start();
    let mut client = server.client();
    client.set("k", "v").unwrap();

    server.stop().unwrap();

    assert_eq!(client.get("k").unwrap(), Some("v".to_string()));
}

#[test]
fn test_bind_rejects_invalid_config() {
    let engine = Arc::new(Engine::new(Arc::new(Store::new())));
    let config = Config::builder().listen_addr("127.0.0.1:0").max_payload_size(0).build();

    assert!(matches!(Server::bind(config, engine), Err(SsmpError::Config(_))));
}
