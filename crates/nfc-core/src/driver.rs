//! Native resource handle layer.
//!
//! [`Driver`] is the narrow surface of the hardware library the bridge calls
//! into. Handles obtained from it are plain ownership carriers: a context handle
//! lives inside a [`NativeContext`], a device handle inside a
//! [`Device`](crate::device::Device).

use crate::config::ContextConfig;
use crate::error::Result;
use std::sync::Arc;

/// Hardware library surface.
///
/// `open` blocks for as long as device probing takes and is only ever called
/// from a worker thread. Device handles must stay usable after the context
/// handle they were opened from has been passed to `exit`.
pub trait Driver: Send + Sync + 'static {
    type Context: Send + Sync + 'static;
    type Device: Send + 'static;

    fn init(&self, config: &ContextConfig) -> Result<Self::Context>;

    fn exit(&self, context: Self::Context);

    /// Open a device. An empty connection string selects the first device found.
    fn open(&self, context: &Self::Context, connstring: &str) -> Result<Self::Device>;

    fn close(&self, device: Self::Device);

    fn device_name(&self, device: &Self::Device) -> String;

    fn device_connstring(&self, device: &Self::Device) -> String;

    fn version(&self) -> &'static str;
}

/// Owns one driver context handle and releases it through `exit` on drop.
pub struct NativeContext<D: Driver> {
    driver: Arc<D>,
    handle: Option<D::Context>,
}

impl<D: Driver> NativeContext<D> {
    pub fn init(driver: Arc<D>, config: &ContextConfig) -> Result<Self> {
        let handle = driver.init(config)?;
        Ok(Self {
            driver,
            handle: Some(handle),
        })
    }

    /// Blocking open against this context.
    pub fn open(&self, connstring: &str) -> Result<D::Device> {
        match &self.handle {
            Some(handle) => self.driver.open(handle, connstring),
            None => Err(crate::error::NfcError::state("NFC context dead")),
        }
    }

    pub fn driver(&self) -> &Arc<D> {
        &self.driver
    }
}

impl<D: Driver> Drop for NativeContext<D> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            tracing::debug!("releasing native NFC context");
            self.driver.exit(handle);
        }
    }
}
