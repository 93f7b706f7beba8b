#![cfg(test)]

use core::time::Duration;
use css_schema::{FetchError, FetchOptions, HttpFetcher, SourceFetcher as _};
use std::io::Write as _;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::{NamedTempFile, tempdir};
use tokio::io::{AsyncReadExt as _, AsyncWriteExt as _};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::sleep;
use url::Url;

/// How the test server answers one connection.
#[derive(Clone, Copy)]
enum Reply {
    Respond(u16, &'static str),
    Hang,
}

fn init_logging() {
    let _ignored = env_logger::builder().is_test(true).try_init();
}

fn fetcher(timeout_ms: u64) -> HttpFetcher {
    HttpFetcher::new(FetchOptions {
        timeout: Duration::from_millis(timeout_ms),
        attempts: 3,
    })
}

async fn read_request(stream: &mut TcpStream) {
    let mut request = Vec::new();
    let mut chunk = [0_u8; 1024];
    while !request.windows(4).any(|window| window == b"\r\n\r\n") {
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(read) => request.extend_from_slice(chunk.get(..read).unwrap_or_default()),
        }
    }
}

async fn answer(mut stream: TcpStream, reply: Reply) {
    read_request(&mut stream).await;
    match reply {
        Reply::Respond(status, body) => {
            let response = format!(
                "HTTP/1.1 {status} Test\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _written = stream.write_all(response.as_bytes()).await;
            let _closed = stream.shutdown().await;
        }
        Reply::Hang => sleep(Duration::from_secs(30)).await,
    }
}

/// Serve `replies` in order, repeating the last one. Returns the stylesheet URL and a
/// counter of accepted connections.
async fn serve(replies: Vec<Reply>) -> Option<(Url, Arc<AtomicUsize>)> {
    let listener = TcpListener::bind("127.0.0.1:0").await.ok()?;
    let address = listener.local_addr().ok()?;
    let accepted = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&accepted);
    tokio::spawn(async move {
        while let Ok((stream, _peer)) = listener.accept().await {
            let index = counter.fetch_add(1, Ordering::SeqCst);
            let reply = replies
                .get(index)
                .or_else(|| replies.last())
                .copied()
                .unwrap_or(Reply::Hang);
            tokio::spawn(answer(stream, reply));
        }
    });
    let url = Url::parse(&format!("http://{address}/theme.css")).ok()?;
    Some((url, accepted))
}

#[tokio::test]
async fn ok_response_returns_the_body() {
    init_logging();
    let Some((url, accepted)) = serve(vec![Reply::Respond(200, ":root { --a: 1px; }")]).await
    else {
        return;
    };
    let body = fetcher(2000).fetch(&url).await;
    assert_eq!(body, Ok(String::from(":root { --a: 1px; }")));
    assert_eq!(accepted.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn error_status_is_retried_then_reported() {
    init_logging();
    let Some((url, accepted)) = serve(vec![Reply::Respond(500, "boom")]).await else {
        return;
    };
    let result = fetcher(2000).fetch(&url).await;
    assert_eq!(
        result,
        Err(FetchError::Status {
            url: url.clone(),
            status: 500
        })
    );
    assert_eq!(accepted.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn later_attempt_can_succeed() {
    init_logging();
    let replies = vec![
        Reply::Respond(503, ""),
        Reply::Respond(404, ""),
        Reply::Respond(200, "ok"),
    ];
    let Some((url, accepted)) = serve(replies).await else {
        return;
    };
    assert_eq!(fetcher(2000).fetch(&url).await, Ok(String::from("ok")));
    assert_eq!(accepted.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn other_success_statuses_still_fail() {
    init_logging();
    let Some((url, _accepted)) = serve(vec![Reply::Respond(204, "")]).await else {
        return;
    };
    let result = fetcher(2000).fetch(&url).await;
    assert!(matches!(result, Err(FetchError::Status { status: 204, .. })));
}

#[tokio::test]
async fn silent_server_times_out_each_attempt() {
    init_logging();
    let Some((url, accepted)) = serve(vec![Reply::Hang]).await else {
        return;
    };
    let result = fetcher(150).fetch(&url).await;
    assert_eq!(
        result,
        Err(FetchError::Timeout {
            url: url.clone(),
            timeout: Duration::from_millis(150)
        })
    );
    assert_eq!(accepted.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn refused_connection_is_a_network_error() {
    init_logging();
    let Ok(listener) = TcpListener::bind("127.0.0.1:0").await else {
        return;
    };
    let Ok(address) = listener.local_addr() else {
        return;
    };
    drop(listener);
    let Ok(url) = Url::parse(&format!("http://{address}/theme.css")) else {
        return;
    };
    let result = fetcher(2000).fetch(&url).await;
    assert!(matches!(result, Err(FetchError::Network { .. })));
}

#[tokio::test]
async fn file_urls_are_read_from_disk() {
    init_logging();
    let Ok(mut file) = NamedTempFile::new() else {
        return;
    };
    let Ok(()) = file.write_all(b".theme-dark { --a: #000; }") else {
        return;
    };
    let Ok(url) = Url::from_file_path(file.path()) else {
        return;
    };
    let body = fetcher(2000).fetch(&url).await;
    assert_eq!(body, Ok(String::from(".theme-dark { --a: #000; }")));
}

#[tokio::test]
async fn missing_file_is_a_network_error() {
    init_logging();
    let Ok(dir) = tempdir() else {
        return;
    };
    let Ok(url) = Url::from_file_path(dir.path().join("missing.css")) else {
        return;
    };
    let result = fetcher(2000).fetch(&url).await;
    assert!(matches!(result, Err(FetchError::Network { .. })));
}
