//! Integration tests for cmdwire.
//!
//! Each test runs a real agent on a loopback port and talks to it either
//! through a [`Session`] or a raw TCP stream.

use std::path::Path;
use std::sync::Arc;

use cmdwire::codec::{decode_response, encode_request};
use cmdwire::error::HandlerError;
use cmdwire::handler::{CommandOutcome, ScreenCapture};
use cmdwire::protocol::{Command, Params, Status, SIZE_KEY};
use cmdwire::server::INVALID_COMMAND;
use cmdwire::{Connection, Server, ServerBuilder, Session, SessionConfig};
use serde_json::{json, Value};
use tempfile::tempdir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

async fn start_agent(builder: ServerBuilder) -> String {
    let server = builder.bind("127.0.0.1:0").await.unwrap();
    let addr = server.local_addr().unwrap().to_string();
    tokio::spawn(server.run());
    addr
}

async fn default_agent() -> String {
    start_agent(Server::builder()).await
}

fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Test DIR on a fixture directory.
#[tokio::test]
async fn test_dir_lists_dotted_entries() {
    let dir = tempdir().unwrap();
    for name in ["one.txt", "two.jpg", "three.tar.gz", "Makefile", ".hidden"] {
        std::fs::write(dir.path().join(name), b"x").unwrap();
    }
    let addr = default_agent().await;

    let mut session = Session::connect(&addr).await.unwrap();
    let reply = session.dir(&path_str(dir.path())).await;

    assert_eq!(reply.status, Status::Success);
    assert_eq!(reply.data["count"], json!(3));
    assert_eq!(reply.files().len(), 3);
    assert!(reply.files().iter().all(|f| !f.ends_with("Makefile")));

    session.exit().await;
}

/// Test DELETE of a path that does not exist.
#[tokio::test]
async fn test_delete_nonexistent() {
    let addr = default_agent().await;
    let mut session = Session::connect(&addr).await.unwrap();

    let reply = session.delete("/nonexistent").await;

    assert_eq!(reply.status, Status::Error);
    assert!(reply.message.contains("does not exist"));
    assert!(session.is_connected());
}

/// Test COPY followed by DELETE on the copy.
#[tokio::test]
async fn test_copy_then_delete() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("report.txt");
    let destination = dir.path().join("report.bak");
    std::fs::write(&source, b"quarterly numbers").unwrap();
    let addr = default_agent().await;
    let mut session = Session::connect(&addr).await.unwrap();

    let reply = session
        .copy(&path_str(&source), &path_str(&destination))
        .await;
    assert!(reply.is_success(), "{}", reply.message);
    assert_eq!(std::fs::read(&destination).unwrap(), b"quarterly numbers");

    let reply = session.delete(&path_str(&destination)).await;
    assert!(reply.is_success());
    assert!(!destination.exists());
    assert!(source.exists());
}

/// Test SEND_PHOTO: announced size and trailer match the file.
#[tokio::test]
async fn test_send_photo_trailer() {
    let dir = tempdir().unwrap();
    let image = dir.path().join("photo.jpg");
    let mut contents: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();
    contents.extend_from_slice(b"<END>");
    std::fs::write(&image, &contents).unwrap();
    let addr = default_agent().await;

    let mut session = Session::connect(&addr).await.unwrap();
    let reply = session.send_photo(&path_str(&image)).await;

    assert!(reply.is_success(), "{}", reply.message);
    assert_eq!(reply.data[SIZE_KEY], json!(contents.len()));
    assert_eq!(reply.binary.as_deref(), Some(&contents[..]));

    // The connection is still in sync after the trailer.
    let reply = session.delete("/nonexistent").await;
    assert!(reply.message.contains("does not exist"));
}

/// Test SEND_PHOTO on a missing file.
#[tokio::test]
async fn test_send_photo_missing_file() {
    let addr = default_agent().await;
    let mut session = Session::connect(&addr).await.unwrap();

    let reply = session.send_photo("/no/such/photo.jpg").await;

    assert_eq!(reply.status, Status::Error);
    assert!(reply.binary.is_none());
    assert!(reply.data.get(SIZE_KEY).is_none());
}

/// Test an unknown command keeps the connection open.
#[tokio::test]
async fn test_unknown_command_then_follow_up() {
    let addr = default_agent().await;
    let mut session = Session::connect(&addr).await.unwrap();

    let reply = session.request("REBOOT", Params::new()).await;
    assert_eq!(reply.status, Status::Error);
    assert_eq!(reply.message, INVALID_COMMAND);

    let reply = session.request("", Params::new()).await;
    assert_eq!(reply.message, INVALID_COMMAND);

    let dir = tempdir().unwrap();
    let reply = session.dir(&path_str(dir.path())).await;
    assert!(reply.is_success());
    assert_eq!(reply.data["count"], json!(0));
}

/// Test EXIT: Goodbye, then the agent closes the socket.
#[tokio::test]
async fn test_exit_then_eof() {
    let addr = default_agent().await;
    let stream = TcpStream::connect(&addr).await.unwrap();
    let mut conn = Connection::new(stream);

    let frame = encode_request("EXIT", Params::new()).unwrap();
    conn.write_frame(&frame).await.unwrap();

    let reply = conn.read_frame().await.unwrap().unwrap();
    let response = decode_response(reply.as_bytes()).unwrap();
    assert_eq!(response.status, Status::Success);
    assert_eq!(response.message, "Goodbye");

    assert!(conn.read_frame().await.unwrap().is_none());
}

/// Test a malformed frame: best-effort error, then close.
#[tokio::test]
async fn test_malformed_frame_closes() {
    let addr = default_agent().await;
    let mut stream = TcpStream::connect(&addr).await.unwrap();

    stream.write_all(b"{not json at all<END>").await.unwrap();

    let mut received = Vec::new();
    stream.read_to_end(&mut received).await.unwrap();

    let response = decode_response(&received).unwrap();
    assert_eq!(response.status, Status::Error);
    assert!(response.message.starts_with("Malformed message"));
}

/// Test a request split into single-byte writes.
#[tokio::test]
async fn test_byte_at_a_time_request() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("a.txt"), b"x").unwrap();
    let addr = default_agent().await;
    let mut stream = TcpStream::connect(&addr).await.unwrap();
    stream.set_nodelay(true).unwrap();

    let mut params = Params::new();
    params.insert("path".into(), Value::from(path_str(dir.path())));
    let first = encode_request("DIR", params).unwrap();
    let second = encode_request("EXIT", Params::new()).unwrap();

    for byte in first.iter().chain(second.iter()) {
        stream.write_all(&[*byte]).await.unwrap();
        stream.flush().await.unwrap();
    }

    let mut conn = Connection::new(stream);
    let dir_reply = conn.read_frame().await.unwrap().unwrap();
    let dir_reply = decode_response(dir_reply.as_bytes()).unwrap();
    assert_eq!(dir_reply.data["count"], json!(1));

    let exit_reply = conn.read_frame().await.unwrap().unwrap();
    assert_eq!(decode_response(exit_reply.as_bytes()).unwrap().message, "Goodbye");
    assert!(conn.read_frame().await.unwrap().is_none());
}

/// Test a disconnected session never touches the network.
#[tokio::test]
async fn test_disconnected_session() {
    let addr = default_agent().await;
    let mut session = Session::connect(&addr).await.unwrap();

    let reply = session.exit().await;
    assert_eq!(reply.message, "Goodbye");
    assert!(!session.is_connected());

    let reply = session.dir(".").await;
    assert_eq!(reply.status, Status::Error);
    assert_eq!(reply.message, "Not connected to server");

    let mut fresh = Session::new(SessionConfig::default());
    assert_eq!(fresh.send_photo("x.jpg").await.message, "Not connected to server");
}

/// Test TAKE_SCREENSHOT through a pluggable capture backend.
#[tokio::test]
async fn test_screenshot_with_custom_backend() {
    struct SolidCapture;

    impl ScreenCapture for SolidCapture {
        fn capture_to(&self, path: &Path) -> Result<(), HandlerError> {
            std::fs::write(path, [0xFF, 0xD8, 0xFF, 0xD9])
                .map_err(|e| HandlerError::io("write screenshot", e))
        }
    }

    let dir = tempdir().unwrap();
    let save_path = path_str(&dir.path().join("screen.jpg"));
    let addr = start_agent(Server::builder().screen_capture(Arc::new(SolidCapture))).await;
    let mut session = Session::connect(&addr).await.unwrap();

    let reply = session.take_screenshot(Some(&save_path)).await;
    assert!(reply.is_success(), "{}", reply.message);
    assert_eq!(reply.data["path"], json!(save_path));

    let reply = session.send_photo(&save_path).await;
    assert_eq!(reply.binary.as_deref(), Some(&[0xFF, 0xD8, 0xFF, 0xD9][..]));
}

/// Test a custom handler replacing a built-in one.
#[tokio::test]
async fn test_custom_handler() {
    let builder = Server::builder().handle(Command::Execute, |_: Value| async {
        Ok(CommandOutcome::error("EXECUTE is disabled"))
    });
    let addr = start_agent(builder).await;
    let mut session = Session::connect(&addr).await.unwrap();

    let reply = session.execute("/bin/sh").await;

    assert_eq!(reply.status, Status::Error);
    assert_eq!(reply.message, "EXECUTE is disabled");
}

/// Test several controllers served at once.
#[tokio::test]
async fn test_concurrent_sessions() {
    let addr = default_agent().await;

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let addr = addr.clone();
        tasks.push(tokio::spawn(async move {
            let mut session = Session::connect(&addr).await.unwrap();
            let mut replies = Vec::new();
            for _ in 0..5 {
                replies.push(session.delete("/nonexistent").await);
            }
            session.exit().await;
            replies
        }));
    }

    for task in tasks {
        let replies = task.await.unwrap();
        assert_eq!(replies.len(), 5);
        assert!(replies.iter().all(|r| r.status == Status::Error));
    }
}
