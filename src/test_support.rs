//! In-process HTTP stub for exercising the network stages without public endpoints.

use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::error::ExtractionFailure;
use crate::extract::{MediaResolver, ResolvedMedia};

/// Canned response served for every request
#[derive(Debug, Clone)]
pub struct StubResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
    pub declared_length: Option<u64>,
    pub delay: Option<Duration>,
    /// Send the body with `Transfer-Encoding: chunked` in pieces of this size
    pub chunk_size: Option<usize>,
}

impl StubResponse {
    pub fn ok(content_type: &str, body: Vec<u8>) -> Self {
        Self {
            status: 200,
            content_type: Some(content_type.to_string()),
            body,
            declared_length: None,
            delay: None,
            chunk_size: None,
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            content_type: None,
            body: Vec::new(),
            declared_length: None,
            delay: None,
            chunk_size: None,
        }
    }

    pub fn with_declared_length(mut self, len: u64) -> Self {
        self.declared_length = Some(len);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_chunks(mut self, size: usize) -> Self {
        self.chunk_size = Some(size.max(1));
        self
    }
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<String> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.clone())
    }
}

pub struct StubServer {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl StubServer {
    pub async fn start(response: StubResponse) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));

        let recorded = requests.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let response = response.clone();
                let recorded = recorded.clone();
                tokio::spawn(async move {
                    let _ = serve(stream, response, recorded).await;
                });
            }
        });

        Self { addr, requests }
    }

    pub fn origin(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.origin(), path)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// URL on a port nothing listens on
    pub fn unused_url(path: &str) -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{}{}", addr, path)
    }
}

async fn serve(
    mut stream: TcpStream,
    response: StubResponse,
    recorded: Arc<Mutex<Vec<RecordedRequest>>>,
) -> std::io::Result<()> {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        head.extend_from_slice(&buf[..n]);
    }

    let text = String::from_utf8_lossy(&head).to_string();
    let mut lines = text.split("\r\n");
    let mut request_line = lines.next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let path = request_line.next().unwrap_or_default().to_string();
    let headers = lines
        .filter_map(|l| l.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();
    recorded.lock().unwrap().push(RecordedRequest {
        method: method.clone(),
        path,
        headers,
    });

    if let Some(delay) = response.delay {
        tokio::time::sleep(delay).await;
    }

    let mut out = format!("HTTP/1.1 {} Stub\r\n", response.status);
    if let Some(ct) = &response.content_type {
        out.push_str(&format!("Content-Type: {}\r\n", ct));
    }
    match response.chunk_size {
        Some(_) => out.push_str("Transfer-Encoding: chunked\r\n"),
        None => {
            let length = response
                .declared_length
                .unwrap_or(response.body.len() as u64);
            out.push_str(&format!("Content-Length: {}\r\n", length));
        }
    }
    out.push_str("Connection: close\r\n\r\n");
    stream.write_all(out.as_bytes()).await?;

    if method != "HEAD" {
        match response.chunk_size {
            Some(size) => {
                for chunk in response.body.chunks(size) {
                    stream
                        .write_all(format!("{:x}\r\n", chunk.len()).as_bytes())
                        .await?;
                    stream.write_all(chunk).await?;
                    stream.write_all(b"\r\n").await?;
                    stream.flush().await?;
                }
                stream.write_all(b"0\r\n\r\n").await?;
            }
            None => stream.write_all(&response.body).await?,
        }
    }
    stream.flush().await?;
    stream.shutdown().await
}

/// Resolver with a fixed outcome that counts its calls
pub struct StubResolver {
    outcome: std::result::Result<ResolvedMedia, ExtractionFailure>,
    calls: AtomicUsize,
}

impl StubResolver {
    pub fn returning(media: ResolvedMedia) -> Self {
        Self {
            outcome: Ok(media),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(failure: ExtractionFailure) -> Self {
        Self {
            outcome: Err(failure),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaResolver for StubResolver {
    fn name(&self) -> &'static str {
        "stub"
    }

    async fn resolve(&self, _url: &str) -> std::result::Result<ResolvedMedia, ExtractionFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcome.clone()
    }
}
