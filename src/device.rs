use crate::utils::to_napi_error;
use napi::bindgen_prelude::*;
use napi_derive::napi;
use nfc_core::pcsc::PcscDriver;
use nfc_core::Device;

/// An opened reader. Only handed out by `Context.open`.
#[napi(js_name = "Device")]
pub struct NfcDevice {
    inner: Device<PcscDriver>,
}

impl From<Device<PcscDriver>> for NfcDevice {
    fn from(inner: Device<PcscDriver>) -> Self {
        Self { inner }
    }
}

#[napi]
impl NfcDevice {
    #[napi(getter)]
    pub fn name(&self) -> String {
        self.inner.name().to_string()
    }

    #[napi(getter)]
    pub fn connection_string(&self) -> String {
        self.inner.connstring().to_string()
    }

    #[napi(getter)]
    pub fn is_open(&self) -> bool {
        self.inner.is_open()
    }

    /// Close the reader now instead of waiting for garbage collection.
    #[napi]
    pub fn close(&mut self) {
        self.inner.close();
    }

    #[napi]
    pub fn initiator_init(&self) -> Result<()> {
        self.inner.initiator_init().map_err(to_napi_error)
    }

    #[napi]
    pub fn initiator_list_passive_targets(&self) -> Result<()> {
        self.inner
            .initiator_list_passive_targets()
            .map_err(to_napi_error)
    }
}
