//! Single-threaded host loop for Rust callers.
//!
//! Plays the part Node's event loop plays for the addon: workers hand finished
//! open records back over a channel and the thread that owns the loop runs the
//! completion callbacks while draining it.

use crate::bridge::{OpenRequest, WorkerPool};
use crate::context::Context;
use crate::device::Device;
use crate::driver::Driver;
use crate::error::Result;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;

type OpenCallback<D> = Box<dyn FnOnce(Result<Device<D>>)>;

struct Completion<D: Driver> {
    id: u64,
    request: OpenRequest<D>,
}

pub struct EventLoop<D: Driver> {
    pool: WorkerPool,
    tx: mpsc::UnboundedSender<Completion<D>>,
    rx: mpsc::UnboundedReceiver<Completion<D>>,
    callbacks: HashMap<u64, OpenCallback<D>>,
    next_id: u64,
}

impl<D: Driver> EventLoop<D> {
    pub fn new() -> Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        Ok(Self {
            pool: WorkerPool::new()?,
            tx,
            rx,
            callbacks: HashMap::new(),
            next_id: 0,
        })
    }

    /// Submit an open on `context`. Synchronous failures are returned here and
    /// `callback` is dropped without being called.
    pub fn open<F>(&mut self, context: &Context<D>, connstring: &str, callback: F) -> Result<()>
    where
        F: FnOnce(Result<Device<D>>) + 'static,
    {
        let request = context.begin_open(connstring)?;
        let id = self.next_id;
        self.next_id += 1;
        self.callbacks.insert(id, Box::new(callback));

        let tx = self.tx.clone();
        self.pool.submit(request, move |request| {
            if tx.send(Completion { id, request }).is_err() {
                tracing::debug!(op = id, "event loop gone, dropping open completion");
            }
        });
        Ok(())
    }

    /// Callbacks still waiting for their completion.
    pub fn pending(&self) -> usize {
        self.callbacks.len()
    }

    /// Block until every submitted open has been delivered.
    pub fn run_until_idle(&mut self) -> usize {
        let mut delivered = 0;
        while !self.callbacks.is_empty() {
            let rx = &mut self.rx;
            match self.pool.block_on(rx.recv()) {
                Some(completion) => {
                    self.dispatch(completion);
                    delivered += 1;
                }
                None => break,
            }
        }
        delivered
    }

    /// Deliver whatever completes within `timeout`.
    pub fn turn(&mut self, timeout: Duration) -> usize {
        if self.callbacks.is_empty() {
            return 0;
        }
        let rx = &mut self.rx;
        let first = self
            .pool
            .block_on(async { tokio::time::timeout(timeout, rx.recv()).await })
            .ok()
            .flatten();
        let Some(first) = first else {
            return 0;
        };
        self.dispatch(first);

        let mut delivered = 1;
        while let Ok(completion) = self.rx.try_recv() {
            self.dispatch(completion);
            delivered += 1;
        }
        delivered
    }

    fn dispatch(&mut self, completion: Completion<D>) {
        let Completion { id, mut request } = completion;
        let Some(callback) = self.callbacks.remove(&id) else {
            tracing::warn!(op = id, "open completion without a callback");
            return;
        };
        let outcome = request.finish();
        callback(outcome);
        drop(request);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ContextConfig;
    use crate::context::Slot;
    use crate::error::ErrorKind;
    use crate::mock::MockDriver;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    fn wait_until(mut done: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if done() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        done()
    }

    #[test]
    fn test_turn_times_out_while_open_is_held() {
        let driver = Arc::new(MockDriver::with_readers(&["reader"]));
        let gate = driver.hold_opens();
        let ctx = Context::new(driver.clone(), ContextConfig::default()).unwrap();
        let mut host = EventLoop::new().unwrap();

        let result = Rc::new(RefCell::new(None));
        let slot = result.clone();
        ctx.open(&mut host, "", move |r| {
            *slot.borrow_mut() = Some(r.map(|d| d.name().to_string()));
        })
        .unwrap();

        assert_eq!(host.turn(Duration::from_millis(20)), 0);
        assert_eq!(host.pending(), 1);
        assert!(result.borrow().is_none());

        gate.release();
        assert_eq!(host.run_until_idle(), 1);
        assert_eq!(host.pending(), 0);
        assert_eq!(result.borrow_mut().take().unwrap().unwrap(), "reader");
    }

    #[test]
    fn test_rejected_open_registers_no_callback() {
        let driver = Arc::new(MockDriver::new());
        let ctx = Context::new(driver.clone(), ContextConfig::default()).unwrap();
        let mut host = EventLoop::new().unwrap();

        let err = host
            .open(&ctx, &"x".repeat(4096), |_| panic!("callback must not run"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(host.pending(), 0);
        assert_eq!(host.run_until_idle(), 0);
    }

    #[test]
    fn test_drop_does_not_wait_for_running_open() {
        let driver = Arc::new(MockDriver::with_readers(&["reader"]));
        let gate = driver.hold_opens();
        let ctx = Context::new(driver.clone(), ContextConfig::default()).unwrap();
        let mut host = EventLoop::new().unwrap();

        ctx.open(&mut host, "", |_| panic!("callback must not run"))
            .unwrap();
        assert!(wait_until(|| driver.open_threads().len() == 1));

        // Unblocks a stalled drop so a regression fails instead of hanging.
        let backstop = gate.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_secs(2));
            backstop.release();
        });

        let started = Instant::now();
        drop(host);
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(ctx.slot(), Slot::Opening);

        gate.release();
        assert!(wait_until(|| ctx.pending_operations() == 0));
        assert_eq!(ctx.slot(), Slot::Vacant);
        assert_eq!(driver.stats().closes, 1);
    }
}
