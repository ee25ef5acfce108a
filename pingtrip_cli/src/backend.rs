//! Sensor backend selection.
//!
//! Without the `hardware` feature (or off Linux) the CLI runs against the
//! simulator, tuned through `PINGTRIP_SIM_*` environment variables:
//!
//! | variable | meaning | default |
//! |---|---|---|
//! | `PINGTRIP_SIM_SURFACE_CM` | reference surface distance | 200 |
//! | `PINGTRIP_SIM_OBJECT_CM` | distance of a passing object | 100 |
//! | `PINGTRIP_SIM_PASS_EVERY` | reads per pass period (0 = no traffic) | 0 |
//! | `PINGTRIP_SIM_PASS_LEN` | reads an object stays in view | 2 |
//! | `PINGTRIP_SIM_JITTER_CM` | alternating +/- noise | 0 |
//! | `PINGTRIP_SIM_DROPOUT_EVERY` | fail every Nth read (0 = never) | 0 |
//! | `PINGTRIP_SIM_SHIFT_AFTER` / `PINGTRIP_SIM_SHIFT_CM` | move the surface after N reads | unset |

use pingtrip_core::{ReadStrategy, SamplerCfg};
use pingtrip_traits::RangeSensor;

#[cfg(not(all(feature = "hardware", target_os = "linux")))]
pub fn open_sensor(
    _cfg: &pingtrip_config::Config,
    sampler: &SamplerCfg,
) -> eyre::Result<Box<dyn RangeSensor>> {
    use pingtrip_hardware::SimulatedRangeSensor;

    let signal = sim_signal(&sampler.strategy);
    let mut sim = SimulatedRangeSensor::new(signal, env_or("PINGTRIP_SIM_SURFACE_CM", 200.0)?)
        .with_passes(
            env_or("PINGTRIP_SIM_PASS_EVERY", 0)?,
            env_or("PINGTRIP_SIM_PASS_LEN", 2)?,
            env_or("PINGTRIP_SIM_OBJECT_CM", 100.0)?,
        )
        .with_jitter(env_or("PINGTRIP_SIM_JITTER_CM", 0.0)?)
        .with_dropouts(env_or("PINGTRIP_SIM_DROPOUT_EVERY", 0)?);
    if let Some(after) = env_opt::<u64>("PINGTRIP_SIM_SHIFT_AFTER")? {
        sim = sim.with_surface_change(after, env_or("PINGTRIP_SIM_SHIFT_CM", 0.0)?);
    }
    tracing::info!(?signal, "using simulated range sensor");
    Ok(Box::new(sim))
}

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub fn open_sensor(
    cfg: &pingtrip_config::Config,
    sampler: &SamplerCfg,
) -> eyre::Result<Box<dyn RangeSensor>> {
    use eyre::WrapErr;
    use pingtrip_hardware::HardwareRangeSensor;

    let sensor = match sampler.strategy {
        ReadStrategy::Pulse { .. } => {
            HardwareRangeSensor::pulse(cfg.pins.trigger, cfg.pins.echo).wrap_err_with(|| {
                format!(
                    "open echo sensor (trigger={}, echo={})",
                    cfg.pins.trigger, cfg.pins.echo
                )
            })?
        }
        ReadStrategy::Analog(_) => HardwareRangeSensor::analog(cfg.pins.adc_channel)
            .wrap_err_with(|| format!("open ADC channel {}", cfg.pins.adc_channel))?,
    };
    Ok(Box::new(sensor))
}

/// Encode distances the way the configured strategy will decode them.
#[cfg_attr(all(feature = "hardware", target_os = "linux"), allow(dead_code))]
fn sim_signal(strategy: &ReadStrategy) -> pingtrip_hardware::SimSignal {
    use pingtrip_hardware::SimSignal;
    match strategy {
        ReadStrategy::Pulse { temp_c } => SimSignal::EchoMicros {
            speed_m_s: pingtrip_core::range::speed_of_sound_m_s(*temp_c),
        },
        ReadStrategy::Analog(cal) => {
            // raw = (cm - offset) / gain + zero
            let zero = cal.zero_counts as f32 - cal.offset_cm / cal.gain_cm_per_count;
            SimSignal::AdcCounts {
                counts_per_cm: 1.0 / cal.gain_cm_per_count,
                zero_counts: zero.round().max(0.0) as u32,
            }
        }
    }
}

#[cfg_attr(all(feature = "hardware", target_os = "linux"), allow(dead_code))]
fn env_opt<T>(name: &str) -> eyre::Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(v) => v
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| eyre::eyre!("invalid {name}={v:?}: {e}")),
        Err(_) => Ok(None),
    }
}

#[cfg_attr(all(feature = "hardware", target_os = "linux"), allow(dead_code))]
fn env_or<T>(name: &str, default: T) -> eyre::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    Ok(env_opt(name)?.unwrap_or(default))
}
