//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use axum::middleware::{self, Next};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use hello_mesh::config::MeshConfig;
use hello_mesh::http::{build_router, HttpServer};
use hello_mesh::lifecycle::{shutdown, Shutdown};

/// Start a backend responder on an ephemeral port.
pub async fn spawn_api(config: MeshConfig, shutdown: &Shutdown) -> SocketAddr {
    let server = HttpServer::new(config).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });
    addr
}

/// Start a backend responder that counts the requests it serves.
pub async fn spawn_counting_api(shutdown: &Shutdown) -> (SocketAddr, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let router = build_router(&MeshConfig::default())
        .unwrap()
        .layer(middleware::from_fn(move |req: Request<Body>, next: Next| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                next.run(req).await
            }
        }));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router)
            .with_graceful_shutdown(shutdown::wait(rx))
            .await;
    });
    (addr, hits)
}

/// Start a raw backend that always answers with the given status.
pub async fn spawn_status_backend(status_line: &'static str, body: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                // Wait for the request so the reply is not unsolicited.
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status_line,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });
    addr
}

/// An address nothing listens on.
pub async fn unreachable_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Config whose client points at `url`, with short timeouts.
pub fn client_config(url: &str) -> MeshConfig {
    let mut config = MeshConfig::default();
    config.client.backend_url = url.to_string();
    config.timeouts.connect_secs = 2;
    config.timeouts.request_secs = 5;
    config
}
