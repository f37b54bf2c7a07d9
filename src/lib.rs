//! Node.js bindings for NFC readers.
//!
//! `Context.open` runs the blocking device open on a worker thread and calls
//! back on the JS thread; see `nfc-core` for the ownership rules.

mod context;
mod device;
mod types;
mod utils;

pub use context::NfcContext;
pub use device::NfcDevice;
pub use types::ContextOptions;

use napi_derive::napi;
use nfc_core::pcsc::PcscDriver;
use nfc_core::Driver;

/// Version reported by the reader driver
#[napi]
pub fn version() -> String {
    PcscDriver::new().version().to_string()
}

/// Send `tracing` output to stderr. `filter` uses `RUST_LOG` syntax and
/// defaults to `NFC_LOG`, then `nfc_core=info`.
#[napi]
pub fn enable_logging(filter: Option<String>) {
    nfc_core::logging::init_tracing(filter.as_deref());
}
