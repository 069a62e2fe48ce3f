//! Error notification side-channel.
//!
//! Two independent, append-only chains of failure observers — synchronous and
//! asynchronous — with a one-way seal latch. Until a registry is sealed,
//! nothing is dispatched and nothing is buffered; once sealed, further
//! additions are silently ignored and every failure [`DaxError`] construction
//! runs the synchronous chain in registration order before returning, then
//! hands the asynchronous chain to a background worker without blocking.
//!
//! [`ErrHandlerRegistry`] is an ordinary value that can be constructed and
//! wired explicitly; the process-wide registry consulted by
//! [`DaxError::new`](crate::DaxError::new) is a singleton over the same type,
//! reachable through the free functions at the bottom of this module.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::thread;

use chrono::{DateTime, Utc};
use crossbeam_channel::{unbounded, Sender};
use tracing::{debug, error};

use crate::error::DaxError;

/// A failure observer: receives the error and the moment it occurred.
pub type ErrHandler = Arc<dyn Fn(&DaxError, DateTime<Utc>) + Send + Sync>;

#[derive(Default)]
struct HandlerChains {
    sync: Vec<ErrHandler>,
    asynchronous: Vec<ErrHandler>,
}

/// Ordered chains of error handlers behind a one-way seal latch.
#[derive(Default)]
pub struct ErrHandlerRegistry {
    chains: Mutex<HandlerChains>,
    sealed: AtomicBool,
}

impl ErrHandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a synchronous handler. Ignored once the registry is sealed.
    pub fn add_sync_handler(
        &self,
        handler: impl Fn(&DaxError, DateTime<Utc>) + Send + Sync + 'static,
    ) {
        if self.is_sealed() {
            return;
        }
        self.lock_chains().sync.push(Arc::new(handler));
    }

    /// Appends an asynchronous handler. Ignored once the registry is sealed.
    pub fn add_async_handler(
        &self,
        handler: impl Fn(&DaxError, DateTime<Utc>) + Send + Sync + 'static,
    ) {
        if self.is_sealed() {
            return;
        }
        self.lock_chains().asynchronous.push(Arc::new(handler));
    }

    /// Seals the registry. Idempotent and permanent.
    pub fn seal(&self) {
        self.sealed.store(true, Ordering::Release);
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::Acquire)
    }

    pub fn sync_handler_count(&self) -> usize {
        self.lock_chains().sync.len()
    }

    pub fn async_handler_count(&self) -> usize {
        self.lock_chains().asynchronous.len()
    }

    /// Dispatches `err` to the registered handlers.
    ///
    /// No-op while unsealed (the event is dropped, not buffered). Once
    /// sealed, synchronous handlers run here, in registration order, on the
    /// caller's control flow; asynchronous handlers are enqueued to the
    /// dispatch worker and this call returns without waiting for them. A
    /// panicking synchronous handler propagates to the caller.
    pub fn notify(&self, err: &DaxError) {
        if !self.is_sealed() {
            return;
        }
        let occurred_at = Utc::now();
        // Handlers run without the chain lock held, so a handler that itself
        // constructs a DaxError cannot deadlock the registry.
        let (sync_handlers, async_handlers) = {
            let chains = self.lock_chains();
            (chains.sync.clone(), chains.asynchronous.clone())
        };
        for handler in &sync_handlers {
            handler(err, occurred_at);
        }
        if !async_handlers.is_empty() {
            let queue = dispatch_queue();
            for handler in async_handlers {
                let job = AsyncJob {
                    handler,
                    err: err.clone(),
                    occurred_at,
                };
                if queue.send(job).is_err() {
                    error!("asynchronous error-notification queue is closed; event dropped");
                }
            }
        }
    }

    fn lock_chains(&self) -> std::sync::MutexGuard<'_, HandlerChains> {
        self.chains.lock().unwrap_or_else(|e| e.into_inner())
    }
}

struct AsyncJob {
    handler: ErrHandler,
    err: DaxError,
    occurred_at: DateTime<Utc>,
}

static DISPATCH_QUEUE: OnceLock<Sender<AsyncJob>> = OnceLock::new();

/// A single worker thread drains the queue, so asynchronous handlers run
/// FIFO by submission even though no cross-handler ordering is promised.
fn dispatch_queue() -> &'static Sender<AsyncJob> {
    DISPATCH_QUEUE.get_or_init(|| {
        let (tx, rx) = unbounded::<AsyncJob>();
        let spawned = thread::Builder::new()
            .name("dax-err-notify".to_string())
            .spawn(move || {
                debug!("asynchronous error-notification worker started");
                for job in rx {
                    let outcome =
                        catch_unwind(AssertUnwindSafe(|| (job.handler)(&job.err, job.occurred_at)));
                    if outcome.is_err() {
                        // Keep draining: one bad handler must not kill
                        // dispatch for the rest of the process.
                        error!(
                            reason = job.err.reason_name(),
                            "asynchronous error handler panicked"
                        );
                    }
                }
            });
        if let Err(e) = spawned {
            error!(error = %e, "failed to spawn error-notification worker");
        }
        tx
    })
}

static ERR_HANDLERS: OnceLock<ErrHandlerRegistry> = OnceLock::new();

/// The process-wide handler registry consulted by every failure
/// [`DaxError`](crate::DaxError) construction.
pub fn err_handler_registry() -> &'static ErrHandlerRegistry {
    ERR_HANDLERS.get_or_init(ErrHandlerRegistry::new)
}

/// Appends a synchronous handler to the process-wide registry.
pub fn add_sync_err_handler(
    handler: impl Fn(&DaxError, DateTime<Utc>) + Send + Sync + 'static,
) {
    err_handler_registry().add_sync_handler(handler);
}

/// Appends an asynchronous handler to the process-wide registry.
pub fn add_async_err_handler(
    handler: impl Fn(&DaxError, DateTime<Utc>) + Send + Sync + 'static,
) {
    err_handler_registry().add_async_handler(handler);
}

/// Seals the process-wide registry, enabling dispatch and freezing the
/// handler chains. Idempotent and permanent.
pub fn seal_err_handlers() {
    err_handler_registry().seal();
}
