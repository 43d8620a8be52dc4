//! Ctrl-C routing.
//!
//! Each run asks for a fresh token with [`Interrupts::arm`]; a keyboard
//! interrupt cancels whichever token was armed last, so one Ctrl-C ends the
//! current item and the next [`Interrupts::arm`] starts clean.

use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub struct Interrupts {
    armed: Arc<Mutex<CancellationToken>>,
    listener: Option<JoinHandle<()>>,
}

impl Interrupts {
    /// Listen for Ctrl-C on the current tokio runtime.
    pub fn install() -> Self {
        let mut interrupts = Self::detached();
        let armed = Arc::clone(&interrupts.armed);
        interrupts.listener = Some(tokio::spawn(async move {
            loop {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    log::warn!("interrupt: cannot listen for Ctrl-C: {e}");
                    return;
                }
                log::info!("interrupt: Ctrl-C");
                cancel_armed(&armed);
            }
        }));
        interrupts
    }

    /// No signal listener; only [`Interrupts::interrupt`] cancels.
    pub fn detached() -> Self {
        Self {
            armed: Arc::new(Mutex::new(CancellationToken::new())),
            listener: None,
        }
    }

    /// Replace the armed token with a fresh one and return it.
    pub fn arm(&self) -> CancellationToken {
        let token = CancellationToken::new();
        match self.armed.lock() {
            Ok(mut armed) => *armed = token.clone(),
            Err(poisoned) => *poisoned.into_inner() = token.clone(),
        }
        token
    }

    /// Cancel the armed token as if Ctrl-C had been pressed.
    pub fn interrupt(&self) {
        cancel_armed(&self.armed);
    }
}

impl Drop for Interrupts {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
    }
}

fn cancel_armed(armed: &Mutex<CancellationToken>) {
    match armed.lock() {
        Ok(token) => token.cancel(),
        Err(poisoned) => poisoned.into_inner().cancel(),
    }
}
