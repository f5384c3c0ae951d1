//! In-process fake store speaking RESP2
//!
//! Accepts plain TCP or mutual-TLS connections, keeps GET/SET data in memory
//! and records every connection and command it sees.

#![allow(dead_code)]

use bytes::{Bytes, BytesMut};
use shortkv::protocol::{decode_frame, Frame};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Install a test subscriber once; honours `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Path of a PEM fixture
pub fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

/// Behaviour switches for a fake store
#[derive(Default)]
pub struct FakeStoreConfig {
    /// `CONFIG SET` parameter to reject
    pub reject_config: Option<&'static str>,
    /// Required `AUTH` password
    pub password: Option<String>,
    /// Serve mutual TLS with the fixture server certificate
    pub tls: bool,
}

/// What the fake store has observed
#[derive(Default)]
pub struct Observed {
    connections: AtomicUsize,
    disconnections: AtomicUsize,
    commands: Mutex<Vec<String>>,
    data: Mutex<HashMap<Bytes, Bytes>>,
    drop_next_reply: AtomicBool,
}

/// A running fake store
pub struct FakeStore {
    addr: SocketAddr,
    observed: Arc<Observed>,
    task: JoinHandle<()>,
}

impl FakeStore {
    /// Plain TCP store with no failures configured
    pub async fn start() -> Self {
        Self::start_with(FakeStoreConfig::default()).await
    }

    /// Store with the given behaviour
    pub async fn start_with(config: FakeStoreConfig) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let observed = Arc::new(Observed::default());
        let acceptor = config.tls.then(tls_acceptor);
        let config = Arc::new(config);

        let task = {
            let observed = observed.clone();
            tokio::spawn(async move {
                loop {
                    let Ok((sock, _)) = listener.accept().await else {
                        return;
                    };
                    observed.connections.fetch_add(1, Ordering::SeqCst);
                    let observed = observed.clone();
                    let config = config.clone();
                    let acceptor = acceptor.clone();
                    tokio::spawn(async move {
                        match acceptor {
                            Some(acceptor) => {
                                if let Ok(tls) = acceptor.accept(sock).await {
                                    serve(tls, &config, &observed).await;
                                }
                            }
                            None => serve(sock, &config, &observed).await,
                        }
                        observed.disconnections.fetch_add(1, Ordering::SeqCst);
                    });
                }
            })
        };

        Self {
            addr,
            observed,
            task,
        }
    }

    /// `127.0.0.1:<port>`
    pub fn addr(&self) -> String {
        self.addr.to_string()
    }

    /// `localhost:<port>`
    pub fn localhost_addr(&self) -> String {
        format!("localhost:{}", self.addr.port())
    }

    /// Connections accepted so far
    pub fn connections(&self) -> usize {
        self.observed.connections.load(Ordering::SeqCst)
    }

    /// Wait until every accepted connection has been closed by the client
    pub async fn wait_all_closed(&self) -> bool {
        for _ in 0..200 {
            let accepted = self.observed.connections.load(Ordering::SeqCst);
            if self.observed.disconnections.load(Ordering::SeqCst) == accepted {
                return true;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        false
    }

    /// Every command received, secrets included
    pub fn commands(&self) -> Vec<String> {
        self.observed.commands.lock().unwrap().clone()
    }

    /// `CONFIG` commands received
    pub fn admin_commands(&self) -> Vec<String> {
        self.commands()
            .into_iter()
            .filter(|c| c.starts_with("CONFIG"))
            .collect()
    }

    /// Close the connection that receives the next command, without replying
    pub fn drop_next_reply(&self) {
        self.observed.drop_next_reply.store(true, Ordering::SeqCst);
    }

    /// Stored value for `key`
    pub fn get(&self, key: &str) -> Option<String> {
        self.observed
            .data
            .lock()
            .unwrap()
            .get(key.as_bytes())
            .map(|v| String::from_utf8_lossy(v).into_owned())
    }
}

impl Drop for FakeStore {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn tls_acceptor() -> tokio_rustls::TlsAcceptor {
    let read = |name: &str| std::fs::read(fixture(name)).unwrap();

    let mut roots = rustls::RootCertStore::empty();
    for cert in rustls_pemfile::certs(&mut &read("ca.pem")[..]) {
        roots.add(cert.unwrap()).unwrap();
    }
    let verifier = rustls::server::WebPkiClientVerifier::builder(Arc::new(roots))
        .build()
        .unwrap();

    let chain = rustls_pemfile::certs(&mut &read("server.pem")[..])
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    let key = rustls_pemfile::private_key(&mut &read("server.key")[..])
        .unwrap()
        .unwrap();

    let config = rustls::ServerConfig::builder()
        .with_client_cert_verifier(verifier)
        .with_single_cert(chain, key)
        .unwrap();
    tokio_rustls::TlsAcceptor::from(Arc::new(config))
}

async fn serve<S>(mut sock: S, config: &FakeStoreConfig, observed: &Observed)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buf = BytesMut::with_capacity(1024);
    let mut authed = config.password.is_none();

    loop {
        let (frame, consumed) = match decode_frame(&buf) {
            Ok(decoded) => decoded,
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                match sock.read_buf(&mut buf).await {
                    Ok(0) | Err(_) => return,
                    Ok(_) => continue,
                }
            }
            Err(_) => return,
        };
        let _ = buf.split_to(consumed);

        let args: Vec<Bytes> = match frame {
            Frame::Array(Some(items)) => items
                .into_iter()
                .filter_map(|item| match item {
                    Frame::Bulk(Some(b)) => Some(b),
                    _ => None,
                })
                .collect(),
            _ => return,
        };
        if args.is_empty() {
            return;
        }

        let text: Vec<String> = args
            .iter()
            .map(|a| String::from_utf8_lossy(a).into_owned())
            .collect();
        observed.commands.lock().unwrap().push(text.join(" "));

        if observed.drop_next_reply.swap(false, Ordering::SeqCst) {
            return;
        }

        let name = text[0].to_uppercase();
        let reply: Vec<u8> = if name == "AUTH" {
            let given = text.last().cloned().unwrap_or_default();
            if config.password.as_deref() == Some(given.as_str()) {
                authed = true;
                b"+OK\r\n".to_vec()
            } else {
                b"-WRONGPASS invalid username-password pair\r\n".to_vec()
            }
        } else if !authed {
            b"-NOAUTH Authentication required.\r\n".to_vec()
        } else {
            match (name.as_str(), text.len()) {
                ("PING", _) => b"+PONG\r\n".to_vec(),
                ("CONFIG", 4) if text[1].eq_ignore_ascii_case("SET") => {
                    if config.reject_config == Some(text[2].as_str()) {
                        format!("-ERR CONFIG SET failed for '{}'\r\n", text[2]).into_bytes()
                    } else {
                        b"+OK\r\n".to_vec()
                    }
                }
                ("GET", 2) => match observed.data.lock().unwrap().get(&args[1]) {
                    Some(v) => {
                        let mut out = format!("${}\r\n", v.len()).into_bytes();
                        out.extend_from_slice(v);
                        out.extend_from_slice(b"\r\n");
                        out
                    }
                    None => b"$-1\r\n".to_vec(),
                },
                ("SET", 3) | ("SET", 4) => {
                    let nx = text.len() == 4 && text[3].eq_ignore_ascii_case("NX");
                    let mut data = observed.data.lock().unwrap();
                    if nx && data.contains_key(&args[1]) {
                        b"$-1\r\n".to_vec()
                    } else {
                        data.insert(args[1].clone(), args[2].clone());
                        b"+OK\r\n".to_vec()
                    }
                }
                _ => format!("-ERR unknown command '{}'\r\n", text[0]).into_bytes(),
            }
        };

        if sock.write_all(&reply).await.is_err() {
            return;
        }
    }
}
