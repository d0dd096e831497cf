/// Represents config for [`SdMmcSdio`](crate::SdMmcSdio).
pub trait SdMmcSdioConfig {
    /// Max status polls while waiting for a command response.
    const CMD_TIMEOUT_POLLS: u32;
    /// Max attempts of the voltage negotiation.
    const MAX_VOLTAGE_TRIALS: u32;
    /// Clock divider for the identification phase, must keep the bus clock at or below 400 kHz.
    const INIT_CLOCK_DIVIDER: u8;
    /// Delay between powering the card and the first command, in milliseconds.
    const POWER_UP_DELAY_MS: u32;
}

/// Default implementation of [`SdMmcSdioConfig`](crate::SdMmcSdioConfig).
///
/// The clock divider targets a 48 MHz kernel clock.
pub struct DefaultSdMmcSdioConfig;

impl SdMmcSdioConfig for DefaultSdMmcSdioConfig {
    const CMD_TIMEOUT_POLLS: u32 = 0x0001_0000;
    const MAX_VOLTAGE_TRIALS: u32 = 0x0000_FFFF;
    const INIT_CLOCK_DIVIDER: u8 = 0x76;
    const POWER_UP_DELAY_MS: u32 = 2;
}
