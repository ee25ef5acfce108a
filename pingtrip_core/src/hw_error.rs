//! Maps `Box<dyn Error>` from trait boundaries to typed `PingTripError`.
//!
//! The traits in `pingtrip_traits` use `Box<dyn Error + Send + Sync>` for
//! flexibility; this module converts those to our typed error enum, with an
//! optional feature-gated path for `pingtrip_hardware::HwError` downcasting.

use crate::error::PingTripError;

/// Map a sensor-side error to a typed `PingTripError`.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> PingTripError {
    #[cfg(feature = "hardware-errors")]
    {
        use pingtrip_hardware::error::HwError;
        if let Some(hw) = e.downcast_ref::<HwError>() {
            return match hw {
                HwError::Timeout | HwError::EchoTimeout => PingTripError::Timeout,
                HwError::Connect(_) | HwError::NotConnected => {
                    PingTripError::Transport(hw.to_string())
                }
                other => PingTripError::HardwareFault(other.to_string()),
            };
        }
    }

    // Fallback: string-based detection
    let s = e.to_string();
    if s.to_lowercase().contains("timeout") {
        PingTripError::Timeout
    } else {
        PingTripError::Hardware(s)
    }
}

/// Map a transport-side error; anything that is not already a transport
/// failure is wrapped as one so callers can treat the cycle as skipped.
pub fn map_transport_error(e: &(dyn std::error::Error + 'static)) -> PingTripError {
    match map_hw_error(e) {
        PingTripError::Transport(msg) => PingTripError::Transport(msg),
        PingTripError::Timeout => PingTripError::Transport("timeout".into()),
        other => PingTripError::Transport(other.to_string()),
    }
}
