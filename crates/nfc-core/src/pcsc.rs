//! PC/SC driver for ACR122-family readers.

use crate::config::ContextConfig;
use crate::connstring::{decode, Decoded};
use crate::driver::Driver;
use crate::error::{NfcError, Result};
use pcsc::{Card, Context, Disposition, Protocols, Scope, ShareMode};
use std::ffi::CString;

pub const ACR122_PCSC_DRIVER_NAME: &str = "acr122_pcsc";
pub const PCSC_BUS_NAME: &str = "pcsc";

/// Reader name prefixes of supported devices.
const SUPPORTED_READERS: &[&str] = &[
    "ACS ACR122",
    "ACS ACR 38U-CCID",
    "ACS ACR38U-CCID",
    "ACS AET65",
    "    CCID USB",
];

const GET_FIRMWARE: [u8; 5] = [0xFF, 0x00, 0x48, 0x00, 0x00];
/// IOCTL_CCID_ESCAPE function number.
const CCID_ESCAPE: u16 = 3500;

pub struct PcscDevice {
    card: Card,
    reader: String,
    name: String,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PcscDriver;

impl PcscDriver {
    pub fn new() -> Self {
        Self
    }

    /// Connection strings of the supported readers currently attached.
    pub fn scan(&self, ctx: &Context) -> Result<Vec<String>> {
        let readers = match ctx.list_readers_owned() {
            Ok(readers) => readers,
            Err(pcsc::Error::NoReadersAvailable) => return Ok(Vec::new()),
            Err(e) => {
                return Err(NfcError::resource(format!("Failed to list readers: {}", e)));
            }
        };

        Ok(readers
            .iter()
            .map(|r| r.to_string_lossy().to_string())
            .filter(|r| {
                let supported = SUPPORTED_READERS.iter().any(|p| r.starts_with(p));
                if !supported {
                    tracing::debug!(reader = %r, "PC/SC reader is not NFC capable or not supported");
                }
                supported
            })
            .map(|r| format!("{}:{}", ACR122_PCSC_DRIVER_NAME, r))
            .collect())
    }

    fn resolve_reader(&self, ctx: &Context, connstring: &str) -> Result<String> {
        let nth = |index: usize| -> Result<String> {
            let found = self.scan(ctx)?;
            let full = found.get(index).ok_or_else(|| {
                NfcError::open_failure(connstring, "no NFC device found")
            })?;
            match decode(full, ACR122_PCSC_DRIVER_NAME, PCSC_BUS_NAME) {
                Decoded::Device { param1, .. } => Ok(param1.to_string()),
                _ => Err(NfcError::open_failure(connstring, "malformed reader name")),
            }
        };

        if connstring.is_empty() {
            return nth(0);
        }
        match decode(connstring, ACR122_PCSC_DRIVER_NAME, PCSC_BUS_NAME) {
            Decoded::Mismatch => Err(NfcError::open_failure(
                connstring,
                "not an acr122_pcsc connection string",
            )),
            Decoded::DriverOnly => nth(0),
            // PC/SC reader names end in "NN NN", so anything shorter is an index.
            Decoded::Device { param1, .. } if param1.len() < 5 => {
                let index = param1.parse::<usize>().map_err(|_| {
                    NfcError::open_failure(connstring, format!("invalid reader index: {}", param1))
                })?;
                nth(index)
            }
            Decoded::Device { param1, .. } => Ok(param1.to_string()),
        }
    }

    fn firmware(card: &Card, direct: bool) -> Option<String> {
        let mut buf = [0u8; 11];
        let response = if direct {
            card.control(pcsc::ctl_code(CCID_ESCAPE.into()), &GET_FIRMWARE, &mut buf[..10])
        } else {
            card.transmit(&GET_FIRMWARE, &mut buf)
        };
        match response {
            Ok(data) => {
                let text = String::from_utf8_lossy(data)
                    .trim_end_matches('\0')
                    .trim()
                    .to_string();
                (!text.is_empty()).then_some(text)
            }
            Err(e) => {
                tracing::debug!(error = %e, "no ACR122 firmware received");
                None
            }
        }
    }
}

impl Driver for PcscDriver {
    type Context = Context;
    type Device = PcscDevice;

    fn init(&self, _config: &ContextConfig) -> Result<Context> {
        Context::establish(Scope::User)
            .map_err(|e| NfcError::resource(format!("Failed to establish PC/SC context: {}", e)))
    }

    fn exit(&self, context: Context) {
        if let Err((_, e)) = context.release() {
            tracing::warn!(error = %e, "Failed to release PC/SC context");
        }
    }

    fn open(&self, ctx: &Context, connstring: &str) -> Result<PcscDevice> {
        let reader = self.resolve_reader(ctx, connstring)?;
        let reader_cstr = CString::new(reader.as_str())
            .map_err(|e| NfcError::open_failure(connstring, format!("Failed to convert reader name: {}", e)))?;

        tracing::debug!(reader = %reader, "attempting to open PC/SC reader");
        let (card, direct) = match ctx.connect(&reader_cstr, ShareMode::Exclusive, Protocols::T0 | Protocols::T1) {
            Ok(card) => (card, false),
            // Readers without a card present only accept direct connections.
            Err(_) => {
                let card = ctx
                    .connect(&reader_cstr, ShareMode::Direct, Protocols::UNDEFINED)
                    .map_err(|e| {
                        NfcError::open_failure(connstring, format!("PC/SC connect failed: {}", e))
                    })?;
                (card, true)
            }
        };

        let name = match Self::firmware(&card, direct) {
            Some(firmware) => format!("{} / {}", reader, firmware),
            None => reader.clone(),
        };
        Ok(PcscDevice { card, reader, name })
    }

    fn close(&self, device: PcscDevice) {
        if let Err((_, e)) = device.card.disconnect(Disposition::LeaveCard) {
            tracing::warn!(reader = %device.reader, error = %e, "Failed to disconnect PC/SC reader");
        }
    }

    fn device_name(&self, device: &PcscDevice) -> String {
        device.name.clone()
    }

    fn device_connstring(&self, device: &PcscDevice) -> String {
        format!("{}:{}", ACR122_PCSC_DRIVER_NAME, device.reader)
    }

    fn version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }
}
