//! Opened NFC device.

use crate::context::{Shared, Slot};
use crate::driver::Driver;
use crate::error::{NfcError, Result};
use std::sync::{Arc, Weak};

/// One opened device handle.
///
/// Only produced by a successful open. The handle is closed exactly once, by
/// [`Device::close`] or on drop, and the owning context's slot is vacated then.
pub struct Device<D: Driver> {
    driver: Arc<D>,
    context: Weak<Shared<D>>,
    context_id: u64,
    handle: Option<D::Device>,
    name: String,
    connstring: String,
}

impl<D: Driver> Device<D> {
    pub(crate) fn new(shared: &Arc<Shared<D>>, handle: D::Device) -> Self {
        let driver = shared.driver.clone();
        let name = driver.device_name(&handle);
        let connstring = driver.device_connstring(&handle);
        Self {
            driver,
            context: Arc::downgrade(shared),
            context_id: shared.id,
            handle: Some(handle),
            name,
            connstring,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn connstring(&self) -> &str {
        &self.connstring
    }

    /// Id of the context this device was opened from.
    pub fn context_id(&self) -> u64 {
        self.context_id
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// Borrow the driver handle, e.g. to issue driver-specific commands.
    pub fn native(&self) -> Result<&D::Device> {
        self.handle
            .as_ref()
            .ok_or_else(|| NfcError::state("NFC device closed"))
    }

    pub fn close(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        self.driver.close(handle);
        if let Some(shared) = self.context.upgrade() {
            shared.set_slot(Slot::Vacant);
        }
        tracing::info!(
            context = self.context_id,
            name = %self.name,
            "NFC device closed"
        );
    }

    pub fn initiator_init(&self) -> Result<()> {
        self.native()?;
        Err(NfcError::unimplemented("initiatorInit"))
    }

    pub fn initiator_list_passive_targets(&self) -> Result<()> {
        self.native()?;
        Err(NfcError::unimplemented("initiatorListPassiveTargets"))
    }
}

impl<D: Driver> Drop for Device<D> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<D: Driver> std::fmt::Debug for Device<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("name", &self.name)
            .field("connstring", &self.connstring)
            .field("open", &self.is_open())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::config::ContextConfig;
    use crate::context::{Context, Slot};
    use crate::error::ErrorKind;
    use crate::mock::MockDriver;
    use std::sync::Arc;

    fn open_device(driver: &Arc<MockDriver>) -> (Context<MockDriver>, super::Device<MockDriver>) {
        let ctx = Context::new(driver.clone(), ContextConfig::default()).unwrap();
        let mut request = ctx.begin_open("").unwrap();
        request.execute();
        let device = request.finish().unwrap();
        (ctx, device)
    }

    #[test]
    fn test_snapshots_name_and_connstring() {
        let driver = Arc::new(MockDriver::with_readers(&["ACS ACR122U PICC Interface 00 00"]));
        let (_ctx, device) = open_device(&driver);
        assert_eq!(device.name(), "ACS ACR122U PICC Interface 00 00");
        assert_eq!(device.connstring(), "mock:ACS ACR122U PICC Interface 00 00");
        assert!(device.is_open());
    }

    #[test]
    fn test_close_is_idempotent_and_vacates_slot() {
        let driver = Arc::new(MockDriver::with_readers(&["reader"]));
        let (ctx, mut device) = open_device(&driver);
        assert_eq!(ctx.slot(), Slot::Occupied);

        device.close();
        device.close();
        drop(device);

        assert_eq!(driver.stats().closes, 1);
        assert_eq!(ctx.slot(), Slot::Vacant);
    }

    #[test]
    fn test_initiator_operations_are_unimplemented() {
        let driver = Arc::new(MockDriver::with_readers(&["reader"]));
        let (_ctx, mut device) = open_device(&driver);

        assert_eq!(device.initiator_init().unwrap_err().kind(), ErrorKind::Unimplemented);
        assert_eq!(
            device.initiator_list_passive_targets().unwrap_err().kind(),
            ErrorKind::Unimplemented
        );

        device.close();
        assert_eq!(device.initiator_init().unwrap_err().kind(), ErrorKind::State);
    }

    #[test]
    fn test_device_outlives_context() {
        let driver = Arc::new(MockDriver::with_readers(&["reader"]));
        let (ctx, device) = open_device(&driver);
        drop(ctx);
        assert_eq!(driver.stats().exits, 1);
        assert!(device.is_open());

        drop(device);
        assert_eq!(driver.stats().closes, 1);
    }
}
