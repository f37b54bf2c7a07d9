//! NFC context: owner of the native context handle and of the single device slot.

use crate::bridge::{Liveness, OpenRequest};
use crate::config::ContextConfig;
use crate::connstring::ConnString;
use crate::device::Device;
use crate::driver::{Driver, NativeContext};
use crate::error::{NfcError, Result};
use crate::host::EventLoop;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Occupancy of a context's device slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Vacant,
    /// An open has been accepted and has not completed yet.
    Opening,
    Occupied,
}

pub(crate) struct Shared<D: Driver> {
    pub(crate) id: u64,
    pub(crate) driver: Arc<D>,
    default_device: Option<ConnString>,
    allow_autoscan: bool,
    native: Mutex<Option<Arc<NativeContext<D>>>>,
    slot: Mutex<Slot>,
    pub(crate) pending: AtomicUsize,
}

impl<D: Driver> Shared<D> {
    pub(crate) fn slot(&self) -> Slot {
        *lock(&self.slot)
    }

    pub(crate) fn set_slot(&self, slot: Slot) {
        *lock(&self.slot) = slot;
    }
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A hardware context and its at-most-one device.
///
/// The native context handle is released once the context has been closed or
/// dropped *and* every open it accepted has completed.
pub struct Context<D: Driver> {
    shared: Arc<Shared<D>>,
}

impl<D: Driver> Context<D> {
    pub fn new(driver: Arc<D>, config: ContextConfig) -> Result<Self> {
        let default_device = config.device_connstring()?;
        let native = NativeContext::init(driver.clone(), &config)?;
        let id = NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed);
        tracing::info!(context = id, version = driver.version(), "NFC context acquired");

        Ok(Self {
            shared: Arc::new(Shared {
                id,
                driver,
                default_device,
                allow_autoscan: config.allow_autoscan,
                native: Mutex::new(Some(Arc::new(native))),
                slot: Mutex::new(Slot::Vacant),
                pending: AtomicUsize::new(0),
            }),
        })
    }

    pub fn id(&self) -> u64 {
        self.shared.id
    }

    /// Open a device through `host`. `callback` runs exactly once on the host
    /// thread unless this call fails synchronously, in which case it never runs.
    pub fn open<F>(&self, host: &mut EventLoop<D>, connstring: &str, callback: F) -> Result<()>
    where
        F: FnOnce(Result<Device<D>>) + 'static,
    {
        host.open(self, connstring, callback)
    }

    /// Validate an open and claim the device slot.
    ///
    /// The returned record holds a liveness reference on this context until it
    /// is dropped; dropping it before [`OpenRequest::finish`] gives the slot back.
    pub fn begin_open(&self, connstring: &str) -> Result<OpenRequest<D>> {
        let native = lock(&self.shared.native)
            .clone()
            .ok_or_else(|| NfcError::state("NFC context dead"))?;
        let requested = ConnString::new(connstring)?;

        {
            let mut slot = lock(&self.shared.slot);
            if *slot != Slot::Vacant {
                return Err(NfcError::state("Only one NFC device can be opened"));
            }
            *slot = Slot::Opening;
        }

        let target = if !requested.is_auto() {
            Some(requested.clone())
        } else if let Some(device) = &self.shared.default_device {
            Some(device.clone())
        } else if self.shared.allow_autoscan {
            Some(ConnString::auto())
        } else {
            None
        };

        let liveness = Liveness::acquire(self.shared.clone(), native);
        Ok(OpenRequest::new(liveness, requested, target))
    }

    /// Tear the context down. Physical release waits for in-flight opens.
    pub fn close(&self) {
        if lock(&self.shared.native).take().is_some() {
            tracing::info!(
                context = self.shared.id,
                pending = self.pending_operations(),
                "NFC context closed"
            );
        }
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.shared.native).is_none()
    }

    pub fn slot(&self) -> Slot {
        self.shared.slot()
    }

    /// Whether a device is open or being opened.
    pub fn has_device(&self) -> bool {
        self.slot() != Slot::Vacant
    }

    /// Number of accepted opens that have not been discarded yet.
    pub fn pending_operations(&self) -> usize {
        self.shared.pending.load(Ordering::SeqCst)
    }

    pub fn driver(&self) -> &Arc<D> {
        &self.shared.driver
    }
}

impl<D: Driver> std::fmt::Debug for Context<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("id", &self.shared.id)
            .field("slot", &self.slot())
            .field("closed", &self.is_closed())
            .finish()
    }
}
