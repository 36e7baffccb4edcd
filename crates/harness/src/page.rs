//! Test lifecycle controller
//!
//! A [`Page`] owns everything a text test needs to announce "I am done"
//! exactly once: the output sink, the one-shot completion guard, the
//! spoofed-URL restoration slot and the uncaught-error fallback. All of it
//! is lifecycle-scoped state behind one cheap-clone handle; there are no
//! process-wide globals.
//!
//! Ordering guarantee: document-ready handlers fire in registration order
//! and before `load`. The sink-creation handler is registered first, inside
//! the constructor, so the sink exists by the time any test body or error
//! handler runs.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::{oneshot, watch};
use tracing::{debug, warn};

use crate::dom::{Document, NodeId};
use crate::error::{HarnessError, Result};
use crate::http::TestServer;
use crate::internals::Internals;

/// Where async-test capability bundles point when nothing else is configured.
pub const DEFAULT_TEST_SERVER_URL: &str = "http://localhost:8000";

/// Page-level lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    AwaitingCompletion,
    Finalized,
}

type Handler = Box<dyn FnOnce(&Page) + Send>;

struct PageState {
    document: Document,
    url: String,
    output_sink: Option<NodeId>,
    ready_handlers: Vec<Handler>,
    load_handlers: Vec<Handler>,
    ready_fired: bool,
    load_fired: bool,
    /// The once-only guard shared by every registration/completion path.
    completion_claimed: bool,
    /// Hardened finalize: set on the first finish, later calls are no-ops.
    finalized: bool,
    original_url: Option<String>,
    frame_waiters: Vec<oneshot::Sender<()>>,
    phase: Phase,
}

/// Handle to a test page's lifecycle state. Clones share the same page.
pub struct Page {
    state: Arc<Mutex<PageState>>,
    internals: Arc<dyn Internals>,
    test_server_url: String,
    error_handler_active: Arc<AtomicBool>,
    finished_tx: Arc<watch::Sender<bool>>,
}

impl Clone for Page {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            internals: Arc::clone(&self.internals),
            test_server_url: self.test_server_url.clone(),
            error_handler_active: Arc::clone(&self.error_handler_active),
            finished_tx: Arc::clone(&self.finished_tx),
        }
    }
}

impl Page {
    /// New page with the default local test server base URL.
    pub fn new(internals: Arc<dyn Internals>) -> Self {
        Self::with_test_server(internals, DEFAULT_TEST_SERVER_URL)
    }

    /// New page whose async-test capability bundle targets `test_server_url`.
    pub fn with_test_server(internals: Arc<dyn Internals>, test_server_url: impl Into<String>) -> Self {
        let (finished_tx, _) = watch::channel(false);
        let page = Self {
            state: Arc::new(Mutex::new(PageState {
                document: Document::new(),
                url: "about:blank".to_string(),
                output_sink: None,
                ready_handlers: Vec::new(),
                load_handlers: Vec::new(),
                ready_fired: false,
                load_fired: false,
                completion_claimed: false,
                finalized: false,
                original_url: None,
                frame_waiters: Vec::new(),
                phase: Phase::Idle,
            })),
            internals,
            test_server_url: test_server_url.into(),
            error_handler_active: Arc::new(AtomicBool::new(true)),
            finished_tx: Arc::new(finished_tx),
        };
        // First ready handler: create the output sink. Everything registered
        // afterwards can rely on it existing.
        page.on_document_ready(Page::create_output_sink);
        page
    }

    fn state(&self) -> MutexGuard<'_, PageState> {
        self.state.lock().expect("page state poisoned")
    }

    fn create_output_sink(&self) {
        let mut state = self.state();
        let sink = state.document.create_element("pre");
        state.document.set_attribute(sink, "id", "out");
        let body = state.document.body();
        state.document.append_child(body, sink);
        state.output_sink = Some(sink);
    }

    fn claim_completion(&self) -> Result<()> {
        let mut state = self.state();
        if state.completion_claimed {
            return Err(HarnessError::TestAlreadyRegistered);
        }
        state.completion_claimed = true;
        Ok(())
    }

    // ── Registration entry points ───────────────────────────────────────

    /// Register a synchronous test body.
    ///
    /// The body runs at document-ready; the page finalizes when `load`
    /// fires. The once-only guard is claimed here, synchronously, so a
    /// second registration through any entry point fails at call time.
    pub fn sync_test<F>(&self, callback: F) -> Result<()>
    where
        F: FnOnce(&Page) -> anyhow::Result<()> + Send + 'static,
    {
        self.claim_completion()?;
        self.state().phase = Phase::AwaitingCompletion;
        self.on_document_ready(move |page| {
            if let Err(e) = callback(page) {
                page.report_uncaught_error(&e.to_string());
            }
        });
        self.on_load(Page::finish);
        Ok(())
    }

    /// Register an asynchronous test body.
    ///
    /// The body runs at document-ready and receives a completion handle
    /// plus the test-server capability bundle. The once-only guard is
    /// enforced when the completion handle is invoked, not here.
    pub fn async_test<F, Fut>(&self, callback: F)
    where
        F: FnOnce(TestCompletion, TestServer) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.state().phase = Phase::AwaitingCompletion;
        self.on_document_ready(move |page| {
            let done = TestCompletion { page: page.clone() };
            let server = TestServer::new(page.test_server_url.clone());
            let errors = page.clone();
            tokio::spawn(async move {
                if let Err(e) = callback(done, server).await {
                    errors.report_uncaught_error(&e.to_string());
                }
            });
        });
    }

    /// Register a future-producing test body.
    ///
    /// The body runs at document-ready; when its future resolves the guard
    /// is claimed and the page finalized. If the future never resolves the
    /// test never finishes — imposing a timeout is the host's job.
    pub fn promise_test<F, Fut>(&self, callback: F)
    where
        F: FnOnce(Page) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.state().phase = Phase::AwaitingCompletion;
        self.on_document_ready(move |page| {
            let page = page.clone();
            tokio::spawn(async move {
                match callback(page.clone()).await {
                    Ok(()) => match page.claim_completion() {
                        Ok(()) => page.finish(),
                        Err(e) => warn!("promise test resolved after completion: {e}"),
                    },
                    Err(e) => page.report_uncaught_error(&e.to_string()),
                }
            });
        });
    }

    // ── Event dispatch ──────────────────────────────────────────────────

    /// Register a document-ready handler. Runs immediately if ready
    /// already fired, otherwise in registration order at dispatch.
    pub fn on_document_ready<F>(&self, handler: F)
    where
        F: FnOnce(&Page) + Send + 'static,
    {
        let run_now = {
            let mut state = self.state();
            if state.ready_fired {
                true
            } else {
                state.ready_handlers.push(Box::new(handler));
                return;
            }
        };
        if run_now {
            handler(self);
        }
    }

    /// Register a `load` handler. Same immediate-run rule as ready.
    pub fn on_load<F>(&self, handler: F)
    where
        F: FnOnce(&Page) + Send + 'static,
    {
        let run_now = {
            let mut state = self.state();
            if state.load_fired {
                true
            } else {
                state.load_handlers.push(Box::new(handler));
                return;
            }
        };
        if run_now {
            handler(self);
        }
    }

    /// Fire document-ready: run queued handlers in registration order.
    pub fn dispatch_document_ready(&self) {
        let handlers = {
            let mut state = self.state();
            if state.ready_fired {
                return;
            }
            state.ready_fired = true;
            std::mem::take(&mut state.ready_handlers)
        };
        debug!(handlers = handlers.len(), "document-ready");
        for handler in handlers {
            handler(self);
        }
    }

    /// Fire `load`. Implies document-ready if that has not fired yet.
    pub fn dispatch_load(&self) {
        self.dispatch_document_ready();
        let handlers = {
            let mut state = self.state();
            if state.load_fired {
                return;
            }
            state.load_fired = true;
            std::mem::take(&mut state.load_handlers)
        };
        debug!(handlers = handlers.len(), "load");
        for handler in handlers {
            handler(self);
        }
    }

    /// Resolve every currently-queued animation frame waiter.
    pub fn tick_animation_frame(&self) {
        let waiters = std::mem::take(&mut self.state().frame_waiters);
        for waiter in waiters {
            let _ = waiter.send(());
        }
    }

    /// Drive the whole lifecycle: ready, load, then frame ticks until the
    /// page finalizes. Never returns for a test that never finishes.
    pub async fn run(&self) {
        self.dispatch_document_ready();
        self.dispatch_load();
        let rx = self.finished_tx.subscribe();
        while !*rx.borrow() {
            self.tick_animation_frame();
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }

    /// Wait until the page has finalized, without driving anything.
    pub async fn wait_finished(&self) {
        let mut rx = self.finished_tx.subscribe();
        while !*rx.borrow() {
            if rx.changed().await.is_err() {
                break;
            }
        }
    }

    // ── Output capture ──────────────────────────────────────────────────

    /// Append `text` plus a line separator to the output sink.
    pub fn println(&self, text: &str) -> Result<()> {
        let mut state = self.state();
        let sink = state.output_sink.ok_or(HarnessError::OutputSinkMissing)?;
        let line = state.document.create_text_node(&format!("{text}\n"));
        state.document.append_child(sink, line);
        Ok(())
    }

    /// Record a one-line description of an element: `<TAGNAME id="..." >`
    /// when an id is present, else `<TAGNAME >`.
    pub fn print_element(&self, node: NodeId) -> Result<()> {
        let description = {
            let state = self.state();
            let tag = state
                .document
                .tag_name(node)
                .ok_or(HarnessError::NotAnElement)?
                .to_ascii_uppercase();
            let mut out = format!("<{tag} ");
            if let Some(id) = state.document.attribute(node, "id") {
                if !id.is_empty() {
                    out.push_str(&format!("id=\"{id}\" "));
                }
            }
            out.push('>');
            out
        };
        self.println(&description)
    }

    /// Rendered text of the output sink so far (empty before ready).
    pub fn output_text(&self) -> String {
        let state = self.state();
        state
            .output_sink
            .map(|sink| state.document.text_content(sink))
            .unwrap_or_default()
    }

    pub fn output_sink(&self) -> Option<NodeId> {
        self.state().output_sink
    }

    /// Direct access to the page's document, for building elements.
    pub fn with_document<R>(&self, f: impl FnOnce(&mut Document) -> R) -> R {
        f(&mut self.state().document)
    }

    // ── URL spoofing ────────────────────────────────────────────────────

    pub fn url(&self) -> String {
        self.state().url.clone()
    }

    pub fn set_url(&self, url: impl Into<String>) {
        self.state().url = url.into();
    }

    /// Report `url` as the current location without navigating. The first
    /// call captures the real location so finalization can restore it;
    /// later calls never overwrite that capture.
    pub fn spoof_current_url(&self, url: &str) {
        {
            let mut state = self.state();
            if state.original_url.is_none() {
                state.original_url = Some(state.url.clone());
            }
            state.url = url.to_string();
        }
        self.internals.spoof_current_url(url);
    }

    // ── Deferred waits ──────────────────────────────────────────────────

    /// Future resolved on the next frame tick. Single-shot; request a
    /// fresh one for each frame.
    pub fn animation_frame(&self) -> impl Future<Output = ()> + Send {
        let (tx, rx) = oneshot::channel();
        self.state().frame_waiters.push(tx);
        async move {
            let _ = rx.await;
        }
    }

    // ── Completion ──────────────────────────────────────────────────────

    /// Restore the original URL if one was spoofed, then report the sink's
    /// text to the host. Idempotent: only the first call reports.
    fn finish(&self) {
        let (restore, output) = {
            let mut state = self.state();
            if state.finalized {
                warn!("finish() after page already finalized; ignoring");
                return;
            }
            state.finalized = true;
            state.phase = Phase::Finalized;
            let output = state
                .output_sink
                .map(|sink| state.document.text_content(sink))
                .unwrap_or_default();
            (state.original_url.clone(), output)
        };
        if let Some(url) = restore {
            self.internals.spoof_current_url(&url);
        }
        debug!(bytes = output.len(), "test is done");
        self.internals.signal_test_is_done(&output);
        let _ = self.finished_tx.send(true);
    }

    /// Uncaught-error fallback: record a diagnostic line and finalize,
    /// unless the observer was canceled.
    pub fn report_uncaught_error(&self, message: &str) {
        if !self.error_handler_active.load(Ordering::SeqCst) {
            return;
        }
        if let Err(e) = self.println(&format!("Uncaught Error In Test: {message}")) {
            warn!("could not record uncaught error: {e}");
        }
        self.finish();
    }

    /// Token that permanently deactivates the uncaught-error observer.
    pub fn error_handler_token(&self) -> ErrorHandlerToken {
        ErrorHandlerToken {
            active: Arc::clone(&self.error_handler_active),
        }
    }

    pub fn phase(&self) -> Phase {
        self.state().phase
    }

    pub fn finished(&self) -> bool {
        self.state().finalized
    }
}

/// Completion handle handed to asynchronous test bodies.
pub struct TestCompletion {
    page: Page,
}

impl TestCompletion {
    /// Declare the test finished. The second call through this guard is a
    /// protocol violation.
    pub fn finish(&self) -> Result<()> {
        self.page.claim_completion()?;
        self.page.finish();
        Ok(())
    }
}

/// Cancellation token for the uncaught-error observer. Canceling twice is
/// a no-op; manual completion is unaffected either way.
pub struct ErrorHandlerToken {
    active: Arc<AtomicBool>,
}

impl ErrorHandlerToken {
    pub fn cancel(&self) {
        self.active.store(false, Ordering::SeqCst);
    }
}

/// Future resolved after `ms` milliseconds of host-scheduled delay.
/// Single-shot.
pub async fn timeout(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}
