//! Asynchronous open bridge.
//!
//! An accepted open becomes an [`OpenRequest`]. Phase 1 ([`OpenRequest::execute`])
//! runs the blocking driver call on a [`WorkerPool`] thread and writes only into
//! the record. Phase 2 ([`OpenRequest::finish`]) runs back on the host thread,
//! builds the [`Device`] or the failure and settles the device slot. The record
//! holds a liveness reference on its context from acceptance until it is dropped,
//! so the native context handle cannot be released under a running worker.

use crate::connstring::ConnString;
use crate::context::{Shared, Slot};
use crate::device::Device;
use crate::driver::{Driver, NativeContext};
use crate::error::{ErrorKind, NfcError, Result};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::Ordering;
use crate::context::lock;
use std::sync::{Arc, Mutex, OnceLock};
use tokio::runtime::{Handle, Runtime};

/// Counted reference keeping a context and its native handle alive.
pub(crate) struct Liveness<D: Driver> {
    shared: Arc<Shared<D>>,
    native: Arc<NativeContext<D>>,
}

impl<D: Driver> Liveness<D> {
    pub(crate) fn acquire(shared: Arc<Shared<D>>, native: Arc<NativeContext<D>>) -> Self {
        shared.pending.fetch_add(1, Ordering::SeqCst);
        Self { shared, native }
    }
}

impl<D: Driver> Drop for Liveness<D> {
    fn drop(&mut self) {
        self.shared.pending.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Pending open operation record.
pub struct OpenRequest<D: Driver> {
    liveness: Liveness<D>,
    requested: ConnString,
    /// `None` when there is nothing the open may select.
    target: Option<ConnString>,
    outcome: Option<Result<D::Device>>,
    finished: bool,
}

impl<D: Driver> std::fmt::Debug for OpenRequest<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenRequest")
            .field("context_id", &self.liveness.shared.id)
            .field("requested", &self.requested)
            .field("target", &self.target)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

impl<D: Driver> OpenRequest<D> {
    pub(crate) fn new(
        liveness: Liveness<D>,
        requested: ConnString,
        target: Option<ConnString>,
    ) -> Self {
        Self {
            liveness,
            requested,
            target,
            outcome: None,
            finished: false,
        }
    }

    /// The connection string the caller asked for.
    pub fn connstring(&self) -> &ConnString {
        &self.requested
    }

    pub fn context_id(&self) -> u64 {
        self.liveness.shared.id
    }

    /// Phase 1: blocking native open. Worker thread only.
    pub fn execute(&mut self) {
        let outcome = match &self.target {
            Some(target) => {
                let native = &self.liveness.native;
                panic::catch_unwind(AssertUnwindSafe(|| native.open(target.as_str())))
                    .unwrap_or_else(|_| {
                        Err(NfcError::open_failure(target.as_str(), "driver panicked"))
                    })
            }
            None => Err(NfcError::open_failure(
                self.requested.as_str(),
                "no device configured and autoscan is disabled",
            )),
        };
        self.outcome = Some(outcome);
    }

    /// Phase 2: settle the outcome. Host thread only.
    ///
    /// The liveness reference is released when the record is dropped, after the
    /// caller has delivered the result.
    pub fn finish(&mut self) -> Result<Device<D>> {
        if self.finished {
            return Err(NfcError::state("open request already completed"));
        }
        self.finished = true;

        let shared = &self.liveness.shared;
        match self.outcome.take() {
            Some(Ok(handle)) => {
                let device = Device::new(shared, handle);
                shared.set_slot(Slot::Occupied);
                tracing::info!(
                    context = shared.id,
                    name = device.name(),
                    connstring = device.connstring(),
                    "NFC device opened"
                );
                Ok(device)
            }
            Some(Err(err)) => {
                shared.set_slot(Slot::Vacant);
                let err = match err.kind() {
                    ErrorKind::OpenFailure => err,
                    _ => NfcError::open_failure(self.requested.as_str(), err.to_string()),
                };
                tracing::warn!(context = shared.id, error = %err, "NFC open failed");
                Err(err)
            }
            None => {
                shared.set_slot(Slot::Vacant);
                Err(NfcError::open_failure(
                    self.requested.as_str(),
                    "open was never executed",
                ))
            }
        }
    }
}

impl<D: Driver> Drop for OpenRequest<D> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        tracing::debug!(
            context = self.liveness.shared.id,
            "discarding undelivered open request"
        );
        if let Some(Ok(handle)) = self.outcome.take() {
            self.liveness.shared.driver.close(handle);
        }
        self.liveness.shared.set_slot(Slot::Vacant);
    }
}

/// Cell carrying an executed record to a host that may never take it.
///
/// The host takes the record out of its copy. When delivery is refused the
/// sender takes it back from its own copy, so dropping it still settles the slot.
pub struct Handoff<D: Driver> {
    cell: Arc<Mutex<Option<OpenRequest<D>>>>,
}

impl<D: Driver> Handoff<D> {
    pub fn new(request: OpenRequest<D>) -> Self {
        Self {
            cell: Arc::new(Mutex::new(Some(request))),
        }
    }

    /// The record, if no copy of this handoff has taken it yet.
    pub fn take(&self) -> Option<OpenRequest<D>> {
        lock(&self.cell).take()
    }
}

impl<D: Driver> Clone for Handoff<D> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
        }
    }
}

/// Thread pool running phase 1 of opens.
///
/// Dropping the pool does not wait for running opens; their records are
/// discarded once the driver call returns.
pub struct WorkerPool {
    runtime: Option<Runtime>,
    handle: Handle,
}

static GLOBAL_POOL: OnceLock<WorkerPool> = OnceLock::new();

impl WorkerPool {
    pub fn new() -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("nfc-worker")
            .enable_time()
            .build()
            .map_err(|e| NfcError::resource(format!("failed to start worker pool: {}", e)))?;
        let handle = runtime.handle().clone();
        Ok(Self {
            runtime: Some(runtime),
            handle,
        })
    }

    /// Process-wide pool, started on first use.
    pub fn global() -> Result<&'static WorkerPool> {
        if let Some(pool) = GLOBAL_POOL.get() {
            return Ok(pool);
        }
        let _ = GLOBAL_POOL.set(WorkerPool::new()?);
        GLOBAL_POOL
            .get()
            .ok_or_else(|| NfcError::resource("worker pool unavailable"))
    }

    /// Run phase 1 of `request` on a worker, then hand the record to `deliver`
    /// on that same worker. `deliver` is responsible for getting it back onto
    /// the host thread.
    pub fn submit<D, F>(&self, request: OpenRequest<D>, deliver: F)
    where
        D: Driver,
        F: FnOnce(OpenRequest<D>) + Send + 'static,
    {
        tracing::debug!(
            context = request.context_id(),
            connstring = %request.connstring(),
            "submitting NFC open"
        );
        let mut request = request;
        self.handle.spawn_blocking(move || {
            request.execute();
            deliver(request);
        });
    }

    pub(crate) fn block_on<F: std::future::Future>(&self, future: F) -> F::Output {
        self.handle.block_on(future)
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}
