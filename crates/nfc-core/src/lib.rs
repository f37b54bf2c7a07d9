//! Core of the `nfc` bindings.
//!
//! A [`Context`] owns one native hardware context and at most one [`Device`].
//! Opening a device blocks for as long as the hardware takes to enumerate, so
//! [`Context::begin_open`] only validates and claims the device slot; the
//! returned [`OpenRequest`] runs the native open on a [`WorkerPool`] thread and
//! is settled back on the host thread with [`OpenRequest::finish`]. Node's event
//! loop is one such host; [`EventLoop`] is the Rust one.
//!
//! ```
//! use nfc_core::mock::MockDriver;
//! use nfc_core::{Context, ContextConfig, EventLoop};
//! use std::sync::Arc;
//!
//! let driver = Arc::new(MockDriver::with_readers(&["ACS ACR122U 00 00"]));
//! let context = Context::new(driver, ContextConfig::default()).unwrap();
//! let mut host = EventLoop::new().unwrap();
//!
//! context
//!     .open(&mut host, "", |result| {
//!         let device = result.unwrap();
//!         assert_eq!(device.name(), "ACS ACR122U 00 00");
//!     })
//!     .unwrap();
//! host.run_until_idle();
//! ```

pub mod bridge;
pub mod config;
pub mod connstring;
pub mod context;
pub mod device;
pub mod driver;
pub mod error;
pub mod host;
pub mod logging;
pub mod mock;
#[cfg(feature = "pcsc")]
pub mod pcsc;

pub use bridge::{Handoff, OpenRequest, WorkerPool};
pub use config::ContextConfig;
pub use connstring::{ConnString, MAX_CONNSTRING_LEN};
pub use context::{Context, Slot};
pub use device::Device;
pub use driver::Driver;
pub use error::{ErrorKind, NfcError, Result};
pub use host::EventLoop;

/// Version of this library. Constant for the life of the process.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
