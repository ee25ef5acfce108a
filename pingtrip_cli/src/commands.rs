//! Command implementations: config mapping, engine assembly, and output.

use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use eyre::WrapErr;
use pingtrip_core::{
    BaselineOutcome, Counter, CounterBuilder, DisableReason, Endpoint, RunParams, SamplerCfg,
    TelemetryEncoder,
};
use pingtrip_traits::RangeSensor;
use serde_json::json;

use crate::backend::open_sensor;

/// Loaded configuration plus the optional CSV-fitted analog calibration.
pub struct Loaded {
    pub cfg: pingtrip_config::Config,
    pub analog: Option<pingtrip_config::AnalogCalibration>,
}

pub fn load(
    config: &std::path::Path,
    analog_csv: Option<&std::path::Path>,
) -> eyre::Result<Loaded> {
    let text = std::fs::read_to_string(config)
        .wrap_err_with(|| format!("failed to read config {}", config.display()))?;
    let cfg = pingtrip_config::load_toml(&text).wrap_err("invalid configuration (TOML)")?;
    let analog = analog_csv
        .map(|p| {
            pingtrip_config::load_calibration_csv(p)
                .wrap_err_with(|| format!("load analog calibration {}", p.display()))
        })
        .transpose()?;
    cfg.validate_with(analog.is_some())
        .wrap_err("invalid configuration")?;
    Ok(Loaded { cfg, analog })
}

fn build_counter(loaded: &Loaded) -> eyre::Result<Counter<Box<dyn RangeSensor>>> {
    let sampler = SamplerCfg::from_config(&loaded.cfg.sensor, loaded.analog.as_ref())?;
    let sensor = open_sensor(&loaded.cfg, &sampler)?;
    let counter = CounterBuilder::new()
        .apply_config(&loaded.cfg, loaded.analog.as_ref())?
        .with_sensor(sensor)
        .build()?;
    Ok(counter)
}

fn disabled_error(reason: DisableReason) -> eyre::Report {
    match reason {
        DisableReason::CalibrationFailed(e) => e.into(),
        other => other.into(),
    }
}

/// Reply draining shares the configured telemetry timeout.
fn telemetry_transport(endpoint: &Endpoint) -> pingtrip_hardware::TcpTransport {
    pingtrip_hardware::TcpTransport::new(endpoint.timeout)
}

pub fn run(
    loaded: &Loaded,
    ticks: Option<u64>,
    no_upload: bool,
    json: bool,
    shutdown: Arc<AtomicBool>,
) -> eyre::Result<()> {
    let mut counter = build_counter(loaded)?;
    // Calibration failure is not fatal: keep counting (nothing) and keep
    // reporting telemetry with baseline 0.
    let outcome = counter.establish_baseline();

    let upload = loaded.cfg.telemetry.enabled && !no_upload;
    let params = RunParams {
        max_ticks: ticks,
        upload,
        endpoint: Endpoint::from(&loaded.cfg.telemetry),
    };
    let mut transport = telemetry_transport(&params.endpoint);
    let summary = pingtrip_core::run(&mut counter, &mut transport, &params, &shutdown);
    let snap = summary.snapshot;

    if json {
        let obj = json!({
            "count": snap.cumulative_count,
            "average": snap.rolling_average,
            "baseline": snap.baseline_distance,
            "established": snap.baseline_established,
            "calibrated": outcome.is_established(),
            "ticks": summary.ticks,
            "drift_checks": summary.drift_checks,
            "baseline_moves": summary.baseline_moves,
            "uploads_ok": summary.uploads_ok,
            "uploads_failed": summary.uploads_failed,
            "failed_reads": snap.failed_reads,
        });
        println!("{obj}");
    } else {
        println!(
            "count={} average={} baseline={} established={} ticks={}",
            snap.cumulative_count,
            snap.rolling_average,
            snap.baseline_distance,
            snap.baseline_established,
            summary.ticks
        );
    }
    Ok(())
}

pub fn calibrate(loaded: &Loaded, json: bool) -> eyre::Result<()> {
    let mut counter = build_counter(loaded)?;
    match counter.establish_baseline() {
        BaselineOutcome::Established(cm) => {
            if json {
                println!("{}", json!({ "baseline_cm": cm, "established": true }));
            } else {
                println!("baseline: {cm} cm");
            }
            Ok(())
        }
        BaselineOutcome::Disabled(reason) => Err(disabled_error(reason)),
    }
}

pub fn encode(
    loaded: &Loaded,
    count: u64,
    average: i32,
    baseline: i32,
    device_id: Option<&str>,
    json: bool,
) -> eyre::Result<()> {
    let id = device_id.unwrap_or(&loaded.cfg.telemetry.device_id);
    let record = TelemetryEncoder::new(loaded.cfg.telemetry.max_record_len)
        .encode(id, count, average, baseline)?;
    if json {
        let text = String::from_utf8_lossy(&record);
        println!("{}", json!({ "record": text, "len": record.len() }));
    } else {
        let mut out = std::io::stdout().lock();
        out.write_all(&record).wrap_err("write record")?;
        out.flush().wrap_err("flush stdout")?;
    }
    Ok(())
}

pub fn self_check(loaded: &Loaded, json: bool) -> eyre::Result<()> {
    let sampler_cfg = SamplerCfg::from_config(&loaded.cfg.sensor, loaded.analog.as_ref())?;
    let sensor = open_sensor(&loaded.cfg, &sampler_cfg)?;
    let mut sampler = pingtrip_core::RangeSampler::new(sensor, sampler_cfg);
    let raw = sampler
        .sensor_mut()
        .read_raw(sampler_cfg.read_timeout)
        .map_err(|e| pingtrip_core::hw_error::map_hw_error(&*e))?;
    let cm = sampler.to_cm(raw);
    if json {
        println!("{}", json!({ "raw": raw, "cm": cm }));
    } else {
        println!("OK: {cm} cm (raw {raw})");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn transport_drains_for_the_configured_timeout() {
        let cfg = pingtrip_config::load_toml("[telemetry]\ntimeout_ms = 1500\n").unwrap();
        let endpoint = Endpoint::from(&cfg.telemetry);
        let transport = telemetry_transport(&endpoint);
        assert_eq!(transport.drain_timeout(), Duration::from_millis(1500));
    }
}
