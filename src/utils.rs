use napi::{JsUnknown, Status, ValueType};
use nfc_core::{ErrorKind, NfcError};

/// Convert to a JS error whose message starts with the stable `[Code]` of the
/// error kind, e.g. `[StateError] invalid state: NFC context dead`.
pub fn to_napi_error(err: NfcError) -> napi::Error {
    let status = match err.kind() {
        ErrorKind::Validation => Status::InvalidArg,
        _ => Status::GenericFailure,
    };
    napi::Error::new(status, format!("[{}] {}", err.kind().code(), err))
}

/// Reject a host argument of the wrong JS type with a `[ValidationError]`.
pub fn expect_type(
    value: &JsUnknown,
    expected: ValueType,
    argument: &str,
    description: &str,
) -> napi::Result<()> {
    if value.get_type()? == expected {
        Ok(())
    } else {
        Err(to_napi_error(NfcError::wrong_type(argument, description)))
    }
}
