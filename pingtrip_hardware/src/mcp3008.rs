use rppal::spi::{Bus, Mode, SlaveSelect, Spi};
use tracing::trace;

use crate::error::{HwError, Result};

const SPI_CLOCK_HZ: u32 = 1_000_000;

/// MCP3008 10-bit ADC on SPI0, used for analog distance sensors.
pub struct Mcp3008 {
    spi: Spi,
    channel: u8,
}

impl Mcp3008 {
    pub fn new(channel: u8) -> Result<Self> {
        if channel > 7 {
            return Err(HwError::Spi(format!("mcp3008 channel {channel} out of range 0..=7")));
        }
        let spi = Spi::new(Bus::Spi0, SlaveSelect::Ss0, SPI_CLOCK_HZ, Mode::Mode0)
            .map_err(|e| HwError::Spi(e.to_string()))?;
        Ok(Self { spi, channel })
    }

    /// Single-ended conversion on the configured channel (0..=1023).
    pub fn read_counts(&mut self) -> Result<u32> {
        let tx = [0x01, (0x08 | self.channel) << 4, 0x00];
        let mut rx = [0u8; 3];
        self.spi
            .transfer(&mut rx, &tx)
            .map_err(|e| HwError::Spi(e.to_string()))?;
        let counts = (u32::from(rx[1] & 0x03) << 8) | u32::from(rx[2]);
        trace!(counts, channel = self.channel, "mcp3008 conversion");
        Ok(counts)
    }
}
