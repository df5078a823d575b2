//! Per-user in-flight guard for cashier requests
//!
//! A user may have one cashier request running at a time. The guard is
//! released when dropped, so every exit path of a handler frees the slot.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

use crate::errors::CashierError;

const REQUEST_IN_FLIGHT: &str = "Please wait for your previous request to finish.";

#[derive(Clone, Default)]
pub struct AntiSpam {
    in_flight: Arc<Mutex<HashSet<i32>>>,
}

impl AntiSpam {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve the user's slot, failing if a request is already running
    pub fn acquire(&self, user_id: i32) -> Result<AntiSpamGuard, CashierError> {
        if !self.in_flight.lock().insert(user_id) {
            return Err(CashierError::validation(REQUEST_IN_FLIGHT));
        }

        Ok(AntiSpamGuard {
            in_flight: Arc::clone(&self.in_flight),
            user_id,
        })
    }

    pub fn is_locked(&self, user_id: i32) -> bool {
        self.in_flight.lock().contains(&user_id)
    }
}

pub struct AntiSpamGuard {
    in_flight: Arc<Mutex<HashSet<i32>>>,
    user_id: i32,
}

impl Drop for AntiSpamGuard {
    fn drop(&mut self) {
        self.in_flight.lock().remove(&self.user_id);
    }
}
