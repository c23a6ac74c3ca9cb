//! Minimal local HTTP responders for exercising the GraphQL client.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Read one request (headers plus `Content-Length` body) off the socket and
/// return its body.
async fn drain_request(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return String::new(),
            Ok(n) => n,
        };
        buf.extend_from_slice(&chunk[..n]);

        let Some(header_end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
            continue;
        };
        let headers = String::from_utf8_lossy(&buf[..header_end]).to_ascii_lowercase();
        let content_length = headers
            .lines()
            .find_map(|l| l.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(0);
        let body_start = header_end + 4;
        if buf.len() >= body_start + content_length {
            return String::from_utf8_lossy(&buf[body_start..body_start + content_length]).into_owned();
        }
    }
}

/// Serve a single JSON response with `status`, returning the URL to hit.
pub async fn serve_once(status: u16, body: String) -> String {
    serve(1, move |_| (status, body.clone())).await
}

/// Answer `connections` requests, each with whatever `respond` returns for
/// the request body.
pub async fn serve<F>(connections: usize, respond: F) -> String
where
    F: Fn(&str) -> (u16, String) + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let respond = std::sync::Arc::new(respond);

    tokio::spawn(async move {
        for _ in 0..connections {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };
            let respond = respond.clone();
            tokio::spawn(async move {
                let request = drain_request(&mut stream).await;
                let (status, body) = respond(&request);
                let response = format!(
                    "HTTP/1.1 {status} Status\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            });
        }
    });

    format!("http://{addr}/graphql")
}

/// Accept a connection and never answer it.
pub async fn serve_silent() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let Ok((mut stream, _)) = listener.accept().await else {
            return;
        };
        drain_request(&mut stream).await;
        tokio::time::sleep(std::time::Duration::from_secs(30)).await;
        drop(stream);
    });

    format!("http://{addr}/graphql")
}
