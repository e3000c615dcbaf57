use std::io::{self, ErrorKind};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use http::header::{HeaderName, HeaderValue};
use http::HeaderMap;
use serde::Deserialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use proxygate::authentication::directory::{Client, RegistryDirectory};
use proxygate::engine::{AuthEngine, Decision};
use proxygate::log_utils::IdChain;
use proxygate::{challenge, log_id, settings};


const MAX_REQUEST_HEAD: usize = 16 * 1024;
const MAX_HEADERS_NUM: usize = 64;
const UPSTREAM_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct EndpointSettings {
    listen_address: SocketAddr,
    auth: settings::Settings,
    #[serde(default, rename = "client")]
    clients: Vec<Client>,
}

fn main() -> io::Result<()> {
    let matches = clap::Command::new("proxygate_endpoint")
        .about("Forward proxy with a Basic authentication gate")
        .arg(
            clap::Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Path to the TOML configuration file")
                .required(true),
        )
        .get_matches();

    let config_path = matches
        .get_one::<String>("config")
        .ok_or_else(|| io::Error::new(ErrorKind::InvalidInput, "Missing config path"))?;
    let raw = std::fs::read_to_string(config_path)?;
    let endpoint_settings: EndpointSettings = toml::from_str(&raw)
        .map_err(|e| io::Error::new(ErrorKind::InvalidInput, format!("Invalid config: {}", e)))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(endpoint_settings))
}

async fn run(endpoint_settings: EndpointSettings) -> io::Result<()> {
    let directory = Arc::new(RegistryDirectory::new(&endpoint_settings.clients));
    let engine = Arc::new(AuthEngine::new(endpoint_settings.auth, directory));

    let listener = TcpListener::bind(endpoint_settings.listen_address).await?;
    log::info!(
        "Listening on {} (realm '{}')",
        endpoint_settings.listen_address,
        engine.realm()
    );

    let connection_counter = AtomicU64::new(0);
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                log::info!("Shutting down");
                return Ok(());
            }
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(x) => x,
                    Err(e) => {
                        log::warn!("Accept failure: {}", e);
                        continue;
                    }
                };
                let log_id = IdChain::new(connection_counter.fetch_add(1, Ordering::Relaxed));
                let engine = engine.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(engine, stream, peer, &log_id).await {
                        log_id!(debug, log_id, "Connection failure: {}", e);
                    }
                });
            }
        }
    }
}

async fn handle_connection(
    engine: Arc<AuthEngine>,
    mut stream: TcpStream,
    peer: SocketAddr,
    log_id: &IdChain<u64>,
) -> io::Result<()> {
    let (head, tail) = match read_request_head(&mut stream).await? {
        Some(x) => x,
        None => return Ok(()),
    };
    log_id!(trace, log_id, "Received {} {} from {}", head.method, head.target, peer);

    match engine.authorize(peer, &head.headers, log_id).await {
        Decision::Challenge(response) => {
            stream.write_all(&challenge::encode(&response)).await?;
            stream.shutdown().await
        }
        Decision::Proceed => {
            if head.method != "CONNECT" {
                stream
                    .write_all(b"HTTP/1.1 400 Bad Request\r\nConnection: close\r\n\r\n")
                    .await?;
                return stream.shutdown().await;
            }
            tunnel(stream, &head.target, tail, log_id).await
        }
    }
}

struct RequestHead {
    method: String,
    target: String,
    headers: HeaderMap,
}

/// Read and parse one request head, returning any bytes received past it.
/// `None` means the connection closed before a complete request arrived.
async fn read_request_head(stream: &mut TcpStream) -> io::Result<Option<(RequestHead, BytesMut)>> {
    let mut buffer = BytesMut::with_capacity(4096);
    loop {
        let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS_NUM];
        let mut request = httparse::Request::new(&mut headers);
        match request
            .parse(&buffer)
            .map_err(|e| io::Error::new(ErrorKind::InvalidData, format!("Bad request: {}", e)))?
        {
            httparse::Status::Complete(head_len) => {
                let head = RequestHead {
                    method: request.method.unwrap_or_default().to_string(),
                    target: request.path.unwrap_or_default().to_string(),
                    headers: header_map(request.headers)?,
                };
                let tail = buffer.split_off(head_len);
                return Ok(Some((head, tail)));
            }
            httparse::Status::Partial => {
                if buffer.len() >= MAX_REQUEST_HEAD {
                    return Err(io::Error::new(
                        ErrorKind::InvalidData,
                        "Request head too large",
                    ));
                }
                if stream.read_buf(&mut buffer).await? == 0 {
                    return Ok(None);
                }
            }
        }
    }
}

fn header_map(parsed: &[httparse::Header<'_>]) -> io::Result<HeaderMap> {
    let mut headers = HeaderMap::with_capacity(parsed.len());
    for header in parsed {
        let name = HeaderName::from_bytes(header.name.as_bytes())
            .map_err(|e| io::Error::new(ErrorKind::InvalidData, format!("Bad header: {}", e)))?;
        let value = HeaderValue::from_bytes(header.value)
            .map_err(|e| io::Error::new(ErrorKind::InvalidData, format!("Bad header: {}", e)))?;
        headers.append(name, value);
    }
    Ok(headers)
}

async fn tunnel(
    mut client: TcpStream,
    target: &str,
    tail: BytesMut,
    log_id: &IdChain<u64>,
) -> io::Result<()> {
    let upstream = tokio::time::timeout(UPSTREAM_CONNECT_TIMEOUT, TcpStream::connect(target)).await;
    let mut upstream = match upstream {
        Ok(Ok(x)) => x,
        Ok(Err(e)) => {
            log_id!(debug, log_id, "Upstream connect to {} failed: {}", target, e);
            client
                .write_all(b"HTTP/1.1 502 Bad Gateway\r\nConnection: close\r\n\r\n")
                .await?;
            return client.shutdown().await;
        }
        Err(_) => {
            log_id!(debug, log_id, "Upstream connect to {} timed out", target);
            client
                .write_all(b"HTTP/1.1 504 Gateway Timeout\r\nConnection: close\r\n\r\n")
                .await?;
            return client.shutdown().await;
        }
    };

    client
        .write_all(b"HTTP/1.1 200 Connection Established\r\n\r\n")
        .await?;
    if !tail.is_empty() {
        upstream.write_all(&tail).await?;
    }

    let (sent, received) = tokio::io::copy_bidirectional(&mut client, &mut upstream).await?;
    log_id!(trace, log_id, "Tunnel to {} closed ({} sent, {} received)", target, sent, received);
    Ok(())
}
