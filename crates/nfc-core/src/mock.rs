//! In-memory driver for tests and development without reader hardware.
//!
//! Readers are plain names; their connection strings are `mock:<name>`.
//!
//! ```
//! use nfc_core::mock::MockDriver;
//! use nfc_core::{Context, ContextConfig};
//! use std::sync::Arc;
//!
//! let driver = Arc::new(MockDriver::with_readers(&["ACS ACR122U 00 00"]));
//! let context = Context::new(driver.clone(), ContextConfig::default()).unwrap();
//! assert_eq!(driver.stats().inits, 1);
//! drop(context);
//! assert_eq!(driver.stats().exits, 1);
//! ```

use crate::config::ContextConfig;
use crate::connstring::{decode, Decoded};
use crate::context::lock;
use crate::driver::Driver;
use crate::error::{NfcError, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::ThreadId;

pub const MOCK_DRIVER_NAME: &str = "mock";

/// Call counters of a [`MockDriver`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MockStats {
    pub inits: usize,
    pub exits: usize,
    pub opens: usize,
    pub closes: usize,
}

#[derive(Debug)]
pub struct MockContext {
    _private: (),
}

#[derive(Debug)]
pub struct MockDevice {
    name: String,
}

/// Blocks opens until released.
#[derive(Debug, Clone, Default)]
pub struct Gate {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl Gate {
    pub fn release(&self) {
        let (open, cvar) = &*self.inner;
        *lock(open) = true;
        cvar.notify_all();
    }

    fn wait(&self) {
        let (open, cvar) = &*self.inner;
        let mut guard = lock(open);
        while !*guard {
            guard = cvar
                .wait(guard)
                .unwrap_or_else(std::sync::PoisonError::into_inner);
        }
    }
}

#[derive(Debug, Default)]
pub struct MockDriver {
    readers: Vec<String>,
    fail_init: bool,
    panic_on_open: bool,
    gate: Mutex<Option<Gate>>,
    inits: AtomicUsize,
    exits: AtomicUsize,
    opens: AtomicUsize,
    closes: AtomicUsize,
    open_threads: Mutex<Vec<ThreadId>>,
}

impl MockDriver {
    /// A driver with no readers attached.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_readers(readers: &[&str]) -> Self {
        Self {
            readers: readers.iter().map(|r| r.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn with_failing_init(mut self) -> Self {
        self.fail_init = true;
        self
    }

    pub fn with_panicking_open(mut self) -> Self {
        self.panic_on_open = true;
        self
    }

    /// Make every open block until the returned gate is released.
    pub fn hold_opens(&self) -> Gate {
        let gate = Gate::default();
        *lock(&self.gate) = Some(gate.clone());
        gate
    }

    pub fn stats(&self) -> MockStats {
        MockStats {
            inits: self.inits.load(Ordering::SeqCst),
            exits: self.exits.load(Ordering::SeqCst),
            opens: self.opens.load(Ordering::SeqCst),
            closes: self.closes.load(Ordering::SeqCst),
        }
    }

    /// Threads that executed `open`, in call order.
    pub fn open_threads(&self) -> Vec<ThreadId> {
        lock(&self.open_threads).clone()
    }

    fn select(&self, connstring: &str) -> Result<&String> {
        let first = || {
            self.readers
                .first()
                .ok_or_else(|| NfcError::open_failure(connstring, "no NFC device found"))
        };
        if connstring.is_empty() {
            return first();
        }
        match decode(connstring, MOCK_DRIVER_NAME, MOCK_DRIVER_NAME) {
            Decoded::Mismatch => Err(NfcError::open_failure(connstring, "unknown driver")),
            Decoded::DriverOnly => first(),
            Decoded::Device { param1, .. } => self
                .readers
                .iter()
                .find(|r| r.as_str() == param1)
                .ok_or_else(|| NfcError::open_failure(connstring, "no such reader")),
        }
    }
}

impl Driver for MockDriver {
    type Context = MockContext;
    type Device = MockDevice;

    fn init(&self, _config: &ContextConfig) -> Result<MockContext> {
        if self.fail_init {
            return Err(NfcError::resource("unable to allocate NFC context"));
        }
        self.inits.fetch_add(1, Ordering::SeqCst);
        Ok(MockContext { _private: () })
    }

    fn exit(&self, _context: MockContext) {
        self.exits.fetch_add(1, Ordering::SeqCst);
    }

    fn open(&self, _context: &MockContext, connstring: &str) -> Result<MockDevice> {
        lock(&self.open_threads).push(std::thread::current().id());
        let gate = lock(&self.gate).clone();
        if let Some(gate) = gate {
            gate.wait();
        }
        if self.panic_on_open {
            panic!("mock driver open panicked");
        }
        let name = self.select(connstring)?.clone();
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(MockDevice { name })
    }

    fn close(&self, _device: MockDevice) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }

    fn device_name(&self, device: &MockDevice) -> String {
        device.name.clone()
    }

    fn device_connstring(&self, device: &MockDevice) -> String {
        format!("{}:{}", MOCK_DRIVER_NAME, device.name)
    }

    fn version(&self) -> &'static str {
        concat!("mock-", env!("CARGO_PKG_VERSION"))
    }
}
