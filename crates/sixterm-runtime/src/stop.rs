//! Cooperative stop requests for background tasks.
//!
//! A [`StopHandle`] owns the request; any number of [`StopToken`]s observe
//! it. Tasks check the token between bounded waits, so a request is seen
//! within one wait interval and no thread is ever killed.
//!
//! ```
//! use sixterm_runtime::stop::stop_pair;
//! use std::time::Duration;
//!
//! let (handle, token) = stop_pair();
//! let worker = std::thread::spawn(move || {
//!     while !token.sleep(Duration::from_millis(10)) {
//!         // poll input...
//!     }
//! });
//! handle.stop();
//! worker.join().unwrap();
//! ```

use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

#[derive(Default)]
struct Shared {
    stopped: Mutex<bool>,
    wake: Condvar,
}

impl Shared {
    fn is_stopped(&self) -> bool {
        *self.stopped.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Requests a stop. Dropping the handle does not stop anything.
pub struct StopHandle {
    shared: Arc<Shared>,
}

/// Observes a [`StopHandle`]. Cheap to clone and `Send`.
#[derive(Clone)]
pub struct StopToken {
    shared: Arc<Shared>,
}

/// Create a connected handle and token.
#[must_use]
pub fn stop_pair() -> (StopHandle, StopToken) {
    let shared = Arc::new(Shared::default());
    (
        StopHandle {
            shared: Arc::clone(&shared),
        },
        StopToken { shared },
    )
}

impl StopHandle {
    /// Request a stop and wake every sleeping token. Idempotent.
    pub fn stop(&self) {
        let mut stopped = self.shared.stopped.lock().unwrap_or_else(|e| e.into_inner());
        *stopped = true;
        self.shared.wake.notify_all();
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.shared.is_stopped()
    }

    #[must_use]
    pub fn token(&self) -> StopToken {
        StopToken {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl StopToken {
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.shared.is_stopped()
    }

    /// Sleep for `duration` unless a stop arrives first.
    ///
    /// Returns `true` if a stop was requested.
    pub fn sleep(&self, duration: Duration) -> bool {
        let stopped = self.shared.stopped.lock().unwrap_or_else(|e| e.into_inner());
        let (stopped, _) = self
            .shared
            .wake
            .wait_timeout_while(stopped, duration, |stopped| !*stopped)
            .unwrap_or_else(|e| e.into_inner());
        *stopped
    }
}
