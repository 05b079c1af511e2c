//! Shared helpers for integration tests: a throwaway collector endpoint and
//! a display that records what it was told.

#![allow(dead_code)]

use axum::{extract::State, http::StatusCode, routing::post, Form, Router};
use gesture_capture_agent::feedback::{DisplayEvent, StatusDisplay};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// Form submissions the collector has received, in arrival order.
#[derive(Clone, Default)]
pub struct Received(Arc<Mutex<Vec<HashMap<String, String>>>>);

impl Received {
    pub fn all(&self) -> Vec<HashMap<String, String>> {
        self.0.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.0.lock().unwrap().len()
    }

    /// Poll until `count` submissions arrived or the timeout passes.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            if self.len() >= count {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.len() >= count
    }
}

pub struct Collector {
    pub addr: SocketAddr,
    pub received: Received,
    shutdown: Option<oneshot::Sender<()>>,
}

impl Drop for Collector {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

async fn collect(
    State((received, status)): State<(Received, StatusCode)>,
    Form(fields): Form<HashMap<String, String>>,
) -> (StatusCode, &'static str) {
    received.0.lock().unwrap().push(fields);
    (status, "stored")
}

/// Start a collector on a random local port answering every POST /post
/// with `status`.
pub async fn start_collector(status: StatusCode) -> Collector {
    let received = Received::default();
    let app = Router::new()
        .route("/post", post(collect))
        .with_state((received.clone(), status));

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind collector");
    let addr = listener.local_addr().expect("Failed to read collector address");
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await;
    });

    Collector {
        addr,
        received,
        shutdown: Some(shutdown_tx),
    }
}

/// A port with nothing listening on it.
pub fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("Failed to bind");
    listener.local_addr().expect("Failed to read address").port()
}

#[derive(Clone, Default)]
pub struct RecordingDisplay(pub Arc<Mutex<Vec<DisplayEvent>>>);

impl RecordingDisplay {
    pub fn events(&self) -> Vec<DisplayEvent> {
        self.0.lock().unwrap().clone()
    }
}

impl StatusDisplay for RecordingDisplay {
    fn show(&self, event: DisplayEvent) {
        self.0.lock().unwrap().push(event);
    }
}
