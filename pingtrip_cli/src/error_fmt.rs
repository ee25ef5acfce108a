//! Human-readable error descriptions and structured JSON error formatting.

use pingtrip_core::error::{BuildError, CalibrationFailed, EncodeError, PingTripError};
use pingtrip_core::status::DisableReason;

/// Stable exit codes.
pub const EXIT_GENERIC: i32 = 1;
pub const EXIT_SENSOR_DISABLED: i32 = 3;
pub const EXIT_ENCODE: i32 = 4;

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(cf) = err.downcast_ref::<CalibrationFailed>() {
        return format!(
            "What happened: Baseline calibration did not settle (running variance {} > {} after {} reads).\nLikely causes: Something moving under the sensor, a vibrating mount, or an uneven reference surface.\nHow to fix: Clear the field of view and rerun, or raise calibration.max_variance in the config.",
            cf.running_variance, cf.max_variance, cf.iterations
        );
    }

    if let Some(reason) = err.downcast_ref::<DisableReason>() {
        if let DisableReason::BelowThreshold {
            baseline,
            threshold,
        } = reason
        {
            return format!(
                "What happened: Sensor disabled; baseline {baseline} cm does not exceed the detection threshold {threshold} cm.\nLikely causes: Sensor mounted too close to the surface, or an obstruction during calibration.\nHow to fix: Remount the sensor higher or lower detection.threshold_cm."
            );
        }
        return format!(
            "What happened: Sensor disabled ({reason}).\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug."
        );
    }

    if let Some(BuildError::InvalidConfig(msg)) = err.downcast_ref::<BuildError>() {
        return format!(
            "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun. See etc/pingtrip.toml for a sample."
        );
    }

    if let Some(ee) = err.downcast_ref::<EncodeError>() {
        return match ee {
            EncodeError::Overflow { needed, capacity } => format!(
                "What happened: Telemetry record needs {needed} bytes but the buffer holds {capacity}.\nLikely causes: A long device id or telemetry.max_record_len set too low.\nHow to fix: Raise telemetry.max_record_len or shorten telemetry.device_id."
            ),
            EncodeError::InvalidDeviceId(id) => format!(
                "What happened: Invalid device id {id:?}.\nLikely causes: Empty id or characters outside A-Z a-z 0-9 - . _ ~.\nHow to fix: Choose a URL-safe telemetry.device_id."
            ),
        };
    }

    if let Some(pe) = err.downcast_ref::<PingTripError>() {
        return match pe {
            PingTripError::Timeout => "What happened: Range sensor read timed out.\nLikely causes: No echo (target out of range or absorbent), wrong trigger/echo pins, or no power.\nHow to fix: Check [pins] and wiring; consider raising sensor.read_timeout_ms.".to_string(),
            PingTripError::Transport(m) => format!(
                "What happened: Telemetry transport failed ({m}).\nLikely causes: No network, wrong telemetry.host/port, or endpoint down.\nHow to fix: Check connectivity or run with --no-upload."
            ),
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    // String-based heuristics for errors coming from init or config
    let msg = err.to_string();
    let chain = err
        .chain()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(": ");
    let lower = chain.to_ascii_lowercase();

    if lower.contains("calibration csv must have headers") {
        return "Invalid headers in calibration CSV. Expected 'raw,cm'.".to_string();
    }

    if lower.contains("failed to read config") {
        let cause = err.root_cause();
        return format!(
            "What happened: {msg}.\nLikely causes: Wrong --config path ({cause}).\nHow to fix: Pass --config <FILE> or create etc/pingtrip.toml."
        );
    }

    if lower.contains("invalid configuration") {
        let cause = err.root_cause();
        return format!(
            "What happened: Configuration is invalid: {cause}.\nLikely causes: Out-of-range or mistyped values.\nHow to fix: Edit the TOML config and try again."
        );
    }

    if lower.contains("open echo sensor") || lower.contains("open adc channel") {
        return "What happened: Failed to initialize the range sensor.\nLikely causes: Incorrect pin numbers, SPI disabled, or insufficient GPIO permissions.\nHow to fix: Fix the [pins] values in the config; ensure the process can access GPIO/SPI.".to_string();
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {chain}"
    )
}

pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if err.downcast_ref::<CalibrationFailed>().is_some()
        || err.downcast_ref::<DisableReason>().is_some()
    {
        return EXIT_SENSOR_DISABLED;
    }
    if err.downcast_ref::<EncodeError>().is_some() {
        return EXIT_ENCODE;
    }
    EXIT_GENERIC
}

fn reason_name(err: &eyre::Report) -> &'static str {
    if err.downcast_ref::<CalibrationFailed>().is_some() {
        "CalibrationFailed"
    } else if let Some(r) = err.downcast_ref::<DisableReason>() {
        match r {
            DisableReason::CalibrationFailed(_) => "CalibrationFailed",
            DisableReason::BelowThreshold { .. } => "BelowThreshold",
        }
    } else if err.downcast_ref::<EncodeError>().is_some() {
        "Encode"
    } else if err.downcast_ref::<BuildError>().is_some() {
        "InvalidConfig"
    } else if let Some(PingTripError::Transport(_)) = err.downcast_ref::<PingTripError>() {
        "Transport"
    } else {
        "Error"
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    let msg = humanize(err);
    let details = match err.downcast_ref::<DisableReason>() {
        Some(DisableReason::CalibrationFailed(cf)) => Some(calibration_details(cf)),
        Some(DisableReason::BelowThreshold {
            baseline,
            threshold,
        }) => Some(json!({ "baseline_cm": baseline, "threshold_cm": threshold })),
        None => err.downcast_ref::<CalibrationFailed>().map(calibration_details),
    };

    let obj = if let Some(d) = details {
        json!({ "reason": reason_name(err), "details": d, "message": msg })
    } else {
        json!({ "reason": reason_name(err), "message": msg })
    };
    obj.to_string()
}

fn calibration_details(cf: &CalibrationFailed) -> serde_json::Value {
    serde_json::json!({
        "running_variance": cf.running_variance,
        "max_variance": cf.max_variance,
        "iterations": cf.iterations,
    })
}
