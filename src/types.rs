use napi_derive::napi;
use nfc_core::ContextConfig;

/// Overrides applied on top of the file and environment configuration.
#[napi(object)]
pub struct ContextOptions {
    /// Connection string opened when `open` is given an empty one.
    pub device: Option<String>,
    pub allow_autoscan: Option<bool>,
}

impl ContextOptions {
    pub(crate) fn apply(self, config: &mut ContextConfig) {
        if let Some(device) = self.device {
            config.device = Some(device);
        }
        if let Some(allow_autoscan) = self.allow_autoscan {
            config.allow_autoscan = allow_autoscan;
        }
    }
}
