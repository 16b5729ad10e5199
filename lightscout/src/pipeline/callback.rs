//! User callback slots.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tracing::error;

use crate::alert::Alert;
use crate::position::Fix;

use super::error::CallbackError;

/// Called on the reader thread for every new fix.
pub type PositionCallback = Arc<dyn Fn(&Fix) -> Result<(), CallbackError> + Send + Sync>;

/// Called on the poller thread for every alert.
pub type AlertCallback = Arc<dyn Fn(&Alert) -> Result<(), CallbackError> + Send + Sync>;

/// Run a callback, containing both returned errors and panics.
///
/// Returns `true` when the callback completed successfully.
pub(crate) fn invoke<T: ?Sized>(
    kind: &'static str,
    callback: &(dyn Fn(&T) -> Result<(), CallbackError> + Send + Sync),
    value: &T,
) -> bool {
    match catch_unwind(AssertUnwindSafe(|| callback(value))) {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            error!(callback = kind, error = %e, "Callback failed");
            false
        }
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            error!(callback = kind, panic = %message, "Callback panicked");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invoke_success_error_and_panic() {
        let ok: AlertCallback = Arc::new(|_| Ok(()));
        let failing: AlertCallback = Arc::new(|_| Err(CallbackError::new("display offline")));
        let panicking: AlertCallback = Arc::new(|_| panic!("boom"));

        let alert = Alert {
            light_id: 1,
            distance_m: 40.0,
            lat: 45.0,
            lon: -75.0,
            zone: crate::alert::Zone::Imminent,
        };

        assert!(invoke("alert", ok.as_ref(), &alert));
        assert!(!invoke("alert", failing.as_ref(), &alert));
        assert!(!invoke("alert", panicking.as_ref(), &alert));
    }
}
