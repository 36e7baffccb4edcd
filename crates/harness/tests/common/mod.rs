//! Common test utilities
#![allow(dead_code)] // Not every helper is used by every test binary

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use pagetest_harness::Internals;
use pagetest_server::{router, AppState};

/// Host capability double that records every call.
#[derive(Default)]
pub struct RecordingInternals {
    signals: Mutex<Vec<String>>,
    spoofs: Mutex<Vec<String>>,
}

impl RecordingInternals {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn signals(&self) -> Vec<String> {
        self.signals.lock().unwrap().clone()
    }

    pub fn spoofs(&self) -> Vec<String> {
        self.spoofs.lock().unwrap().clone()
    }
}

impl Internals for RecordingInternals {
    fn signal_test_is_done(&self, output: &str) {
        self.signals.lock().unwrap().push(output.to_string());
    }

    fn spoof_current_url(&self, url: &str) {
        self.spoofs.lock().unwrap().push(url.to_string());
    }
}

/// An in-process test server bound to an ephemeral port.
pub struct TestServerGuard {
    pub base_url: String,
    pub static_dir: tempfile::TempDir,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServerGuard {
    pub fn write_static(&self, name: &str, contents: &str) {
        std::fs::write(self.static_dir.path().join(name), contents).unwrap();
    }
}

impl Drop for TestServerGuard {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Spawn the real server router on 127.0.0.1:0 and return its base URL.
pub async fn spawn_test_server() -> TestServerGuard {
    let static_dir = tempfile::tempdir().unwrap();
    let app = router(AppState::new(), static_dir.path());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    TestServerGuard {
        base_url: format!("http://{addr}"),
        static_dir,
        handle,
    }
}
