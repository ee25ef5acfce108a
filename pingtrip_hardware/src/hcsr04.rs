use std::time::Duration;
use tracing::trace;

use crate::error::{HwError, Result};
use crate::util::{measure_pulse_width, width_to_micros};

/// Trigger/echo ultrasonic ranger (HC-SR04 and compatibles).
pub struct Hcsr04 {
    trigger: rppal::gpio::OutputPin,
    echo: rppal::gpio::InputPin,
}

impl Hcsr04 {
    pub fn new(trigger_pin: u8, echo_pin: u8) -> Result<Self> {
        let gpio = rppal::gpio::Gpio::new().map_err(|e| HwError::Gpio(e.to_string()))?;
        let mut trigger = gpio
            .get(trigger_pin)
            .map_err(|e| HwError::Gpio(format!("open trigger pin {trigger_pin}: {e}")))?
            .into_output();
        let echo = gpio
            .get(echo_pin)
            .map_err(|e| HwError::Gpio(format!("open echo pin {echo_pin}: {e}")))?
            .into_input();
        trigger.set_low();
        Ok(Self { trigger, echo })
    }

    /// Fire one ping and return the echo round-trip width in microseconds.
    pub fn ping(&mut self, timeout: Duration) -> Result<u32> {
        // 10 us trigger pulse starts a measurement cycle
        self.trigger.set_high();
        std::thread::sleep(Duration::from_micros(10));
        self.trigger.set_low();

        let echo = &self.echo;
        let width = measure_pulse_width(|| echo.is_high(), timeout, Duration::ZERO)?;
        let us = width_to_micros(width);
        trace!(echo_us = us, "hcsr04 echo");
        Ok(us)
    }
}
