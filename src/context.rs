use crate::device::NfcDevice;
use crate::types::ContextOptions;
use crate::utils::{expect_type, to_napi_error};
use napi::bindgen_prelude::*;
use napi::threadsafe_function::{
    ErrorStrategy, ThreadSafeCallContext, ThreadsafeFunction, ThreadsafeFunctionCallMode,
};
use napi::{JsError, JsFunction, JsString, JsUnknown, ValueType};
use napi_derive::napi;
use nfc_core::pcsc::PcscDriver;
use nfc_core::{Context, ContextConfig, Handoff, NfcError, WorkerPool};
use std::sync::Arc;

type OpenCompletion = ThreadsafeFunction<Handoff<PcscDriver>, ErrorStrategy::Fatal>;

#[napi(js_name = "Context")]
pub struct NfcContext {
    inner: Context<PcscDriver>,
}

#[napi]
impl NfcContext {
    #[napi(constructor)]
    pub fn new(options: Option<ContextOptions>) -> Result<Self> {
        let mut config = ContextConfig::load().map_err(to_napi_error)?;
        if let Some(options) = options {
            options.apply(&mut config);
        }

        let inner = Context::new(Arc::new(PcscDriver::new()), config).map_err(to_napi_error)?;
        Ok(Self { inner })
    }

    /// Open a reader without blocking the event loop. `callback` is called once
    /// with `(err, device)`, the unused one being `null`; an empty connection
    /// string picks the first reader.
    #[napi(
        ts_args_type = "connstring: string, callback: (err: Error | null, device: Device | null) => void"
    )]
    pub fn open(&self, connstring: JsUnknown, callback: JsUnknown) -> Result<()> {
        expect_type(&connstring, ValueType::String, "connstring", "a string")?;
        expect_type(&callback, ValueType::Function, "callback", "a function")?;
        // Both casts are checked by the type tests above.
        let connstring = unsafe { connstring.cast::<JsString>() }
            .into_utf8()?
            .into_owned()?;
        let callback = unsafe { callback.cast::<JsFunction>() };

        let request = self.inner.begin_open(&connstring).map_err(to_napi_error)?;

        let completion: OpenCompletion = callback
            .create_threadsafe_function(0, |ctx: ThreadSafeCallContext<Handoff<PcscDriver>>| {
                let outcome = match ctx.value.take() {
                    Some(mut request) => request.finish(),
                    None => Err(NfcError::state("open completion already delivered")),
                };
                let null = ctx.env.get_null()?.into_unknown();
                Ok(match outcome {
                    Ok(device) => vec![Either::A(null), Either::B(NfcDevice::from(device))],
                    Err(err) => {
                        let err = JsError::from(to_napi_error(err)).into_unknown(ctx.env);
                        vec![Either::A(err), Either::A(null)]
                    }
                })
            })
            .map_err(|e| {
                to_napi_error(NfcError::resource(format!(
                    "Failed to create open completion: {}",
                    e
                )))
            })?;

        let pool = WorkerPool::global().map_err(to_napi_error)?;
        pool.submit(request, move |request| {
            let handoff = Handoff::new(request);
            let status = completion.call(handoff.clone(), ThreadsafeFunctionCallMode::NonBlocking);
            if status != Status::Ok {
                tracing::warn!(?status, "Failed to queue NFC open completion");
                // Napi keeps its copy when the call is refused; reclaim the record.
                drop(handoff.take());
            }
        });
        Ok(())
    }

    /// Release the native context once no open is in flight.
    #[napi]
    pub fn close(&self) {
        self.inner.close();
    }

    #[napi(getter)]
    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    #[napi(getter)]
    pub fn has_device(&self) -> bool {
        self.inner.has_device()
    }

    #[napi(getter)]
    pub fn pending_operations(&self) -> u32 {
        self.inner.pending_operations() as u32
    }
}
