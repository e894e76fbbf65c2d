//! Ctrl-C handling for streamed completions.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chat_context::CancelSignal;
use signal_hook::consts::SIGINT;
use signal_hook::SigId;

/// Process-wide SIGINT routing, installed once at startup.
///
/// While an [`InterruptGuard`] is held, SIGINT only sets the cancel flag.
/// Otherwise SIGINT gets its default action and terminates the process. At the
/// prompt the line editor reads Ctrl-C as a key press, so no signal arrives.
#[derive(Debug)]
pub struct InterruptHandler {
    cancel: CancelSignal,
    idle: Arc<AtomicBool>,
    ids: [SigId; 2],
}

impl InterruptHandler {
    pub fn install() -> io::Result<Self> {
        let cancel = Arc::new(AtomicBool::new(false));
        let idle = Arc::new(AtomicBool::new(true));
        // The conditional default must run before the flag action.
        let default_id = signal_hook::flag::register_conditional_default(SIGINT, Arc::clone(&idle))?;
        let flag_id = match signal_hook::flag::register(SIGINT, Arc::clone(&cancel)) {
            Ok(id) => id,
            Err(error) => {
                signal_hook::low_level::unregister(default_id);
                return Err(error);
            }
        };
        Ok(Self {
            cancel,
            idle,
            ids: [default_id, flag_id],
        })
    }

    /// Route SIGINT to a freshly cleared cancel flag until the guard drops.
    pub fn arm(&self) -> InterruptGuard<'_> {
        self.cancel.store(false, Ordering::Release);
        self.idle.store(false, Ordering::Release);
        InterruptGuard { handler: self }
    }

    #[must_use]
    pub fn is_armed(&self) -> bool {
        !self.idle.load(Ordering::Acquire)
    }
}

impl Drop for InterruptHandler {
    fn drop(&mut self) {
        for id in self.ids {
            signal_hook::low_level::unregister(id);
        }
    }
}

/// Scope of one streamed completion.
#[derive(Debug)]
pub struct InterruptGuard<'a> {
    handler: &'a InterruptHandler,
}

impl InterruptGuard<'_> {
    /// Flag set by Ctrl-C while this guard is held.
    #[must_use]
    pub fn signal(&self) -> &CancelSignal {
        &self.handler.cancel
    }
}

impl Drop for InterruptGuard<'_> {
    fn drop(&mut self) {
        self.handler.idle.store(true, Ordering::Release);
    }
}
