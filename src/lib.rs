//! SD card bring-up over a native SDIO bus controller, written in Embedded Rust.
//!
//! This crate negotiates protocol version, operating voltage and addressing
//! capacity with an SD card ([`SdMmcSdio::power_on`]) and then identifies it
//! ([`SdMmcSdio::identify`]). Register access is left to an [`SdioBus`]
//! implementation.
//!
//! # Features
//!
//! * `log` (default): log messages over the [log](https://crates.io/crates/log) facade.
//! * `defmt-log`: log messages over defmt instead. Disable the default features
//!   when enabling it.

#![cfg_attr(not(test), no_std)]

mod bus;
mod command;
mod config;
mod consts;
mod csd;
mod response;

pub use crate::bus::{
    flags, BusConfig, BusWidth, ClockEdge, ResponseSlot, SdioBus, StatusFlags,
};
pub use crate::command::{Command, ResponseShape, WaitPolicy};
pub use crate::config::{DefaultSdMmcSdioConfig, SdMmcSdioConfig};
pub use crate::consts::BLOCK_SIZE;
pub use crate::csd::{CapacityProvider, Csd, CsdData, CsdV1, CsdV2};
pub use crate::response::{
    classify_no_response, classify_r1, classify_r2, classify_r3, classify_r6, classify_r7,
    decode_card_status, CardStatus, Ocr, R6Response, ResponseOutcome, CARD_STATUS_ERRORS,
};

use crate::consts::arguments;

use core::marker::PhantomData;
use embedded_hal::blocking::delay::DelayMs;

#[cfg(feature = "log")]
use log::{debug, error, info, warn};

#[cfg(feature = "defmt-log")]
use defmt::{debug, error, info, warn};

#[cfg(all(feature = "defmt-log", feature = "log"))]
compile_error!("Cannot enable both log and defmt-log");

#[cfg(all(not(feature = "defmt-log"), not(feature = "log")))]
compile_error!("Must enable either log or defmt-log");

/// [`SdMmcSdio`] result error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-log", derive(defmt::Format))]
pub enum Error {
    /// No response to the command in time.
    ResponseTimeout,
    /// Response received, but its CRC check failed.
    CrcFail,
    /// Response to another command received.
    CommandMismatch,
    /// The card reported an illegal command.
    IllegalCommand,
    /// The command's argument was out of the allowed range for this card.
    AddressOutOfRange,
    /// A misaligned address which did not match the block length was used.
    AddressMisaligned,
    /// Transferred block length is not allowed for this card.
    BlockLengthError,
    /// An error in the sequence of erase commands occurred.
    EraseSequenceError,
    /// An invalid selection of write blocks for erase occurred.
    BadEraseParameter,
    /// Attempt to program a write protected block.
    WriteProtectViolation,
    /// Sequence or password error in the lock/unlock card command.
    LockUnlockFailed,
    /// CRC check of the previous command failed on the card.
    ComCrcFailed,
    /// Card internal ECC was applied but failed to correct the data.
    CardEccFailed,
    /// Internal card controller error.
    ControllerError,
    /// General or unknown error.
    GeneralUnknownError,
    /// The card could not sustain data transfer in stream read mode.
    StreamReadUnderrun,
    /// The card could not sustain data programming in stream write mode.
    StreamWriteOverrun,
    /// CID/CSD overwrite error.
    CidCsdOverwrite,
    /// Only partial address space was erased.
    WriteProtectEraseSkip,
    /// Command has been executed without using the internal ECC.
    CardEccDisabled,
    /// Erase sequence was cleared before executing.
    EraseReset,
    /// Error in the sequence of the authentication process.
    AkeSequenceError,
    /// The card did not finish power up within the allowed attempts.
    VoltageNegotiationTimeout,
}

impl Error {
    /// Transport level error, a caller may retry the whole sequence.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::ResponseTimeout | Error::CrcFail)
    }

    /// Error reported by the card in its status bits.
    pub fn is_card_reported(&self) -> bool {
        CARD_STATUS_ERRORS.iter().any(|(_, err)| err == self)
    }
}

/// SD physical layer version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-log", derive(defmt::Format))]
pub enum CardVersion {
    V1_1,
    V2_0,
}

/// Addressing capacity class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-log", derive(defmt::Format))]
pub enum CapacityClass {
    /// Byte addressed.
    Standard,
    /// Block addressed.
    High,
}

/// Card type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-log", derive(defmt::Format))]
pub enum CardType {
    SD1,
    SD2,
    SDHC,
}

/// Negotiated card parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-log", derive(defmt::Format))]
pub struct CardProfile {
    pub version: CardVersion,
    pub capacity: CapacityClass,
}

impl CardProfile {
    /// Profile from the final OCR of the voltage negotiation.
    ///
    /// High capacity is only accepted from a V2.0 card.
    fn from_ocr(version: CardVersion, ocr: Ocr) -> Self {
        let capacity = match (version, ocr.high_capacity()) {
            (CardVersion::V2_0, true) => CapacityClass::High,
            (CardVersion::V1_1, true) => {
                warn!("V1.x card reports high capacity, ignored");
                CapacityClass::Standard
            }
            (_, false) => CapacityClass::Standard,
        };

        CardProfile { version, capacity }
    }

    /// Card type.
    pub fn card_type(&self) -> CardType {
        match (self.version, self.capacity) {
            (CardVersion::V2_0, CapacityClass::High) => CardType::SDHC,
            (CardVersion::V2_0, CapacityClass::Standard) => CardType::SD2,
            (CardVersion::V1_1, _) => CardType::SD1,
        }
    }

    /// Command argument addressing the block `block`, `None` if a byte address overflows.
    pub fn block_address(&self, block: u32) -> Option<u32> {
        match self.capacity {
            CapacityClass::Standard => block.checked_mul(BLOCK_SIZE as u32),
            CapacityClass::High => Some(block),
        }
    }
}

/// Identification registers of a powered on card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardIdentity {
    /// Card identification register, most significant word first.
    pub cid: [u32; 4],
    /// Relative card address.
    pub rca: u16,
    /// Card specific data.
    pub csd: Csd,
}

/// SD Card SDIO driver.
///
/// `Bus` - SDIO bus controller.
/// `Delay` - Millisecond delay.
/// `Config` - Config implementation of driver config trait.
pub struct SdMmcSdio<Bus: SdioBus, Delay: DelayMs<u32>, Config: SdMmcSdioConfig> {
    bus: Bus,
    delay: Delay,
    config: PhantomData<Config>,
}

impl<Bus: SdioBus, Delay: DelayMs<u32>, Config: SdMmcSdioConfig> SdMmcSdio<Bus, Delay, Config> {
    /// Creates a new [`SdMmcSdio<Bus, Delay, Config>`].
    ///
    /// `bus` - SDIO bus controller.
    /// `delay` - delay provider.
    pub fn new(bus: Bus, delay: Delay) -> Self {
        SdMmcSdio {
            bus,
            delay,
            config: PhantomData::<Config>,
        }
    }

    /// Releases the bus controller and the delay.
    pub fn free(self) -> (Bus, Delay) {
        (self.bus, self.delay)
    }

    /// Send a command.
    fn send(&mut self, command: Command) {
        debug!("CMD{}, arg: {:#x}", command.index, command.argument);
        self.bus.send_command(command);
    }

    /// Poll the status until `classify` reports a terminal outcome.
    ///
    /// Latched flags are cleared on every terminal outcome.
    fn wait_response<F>(&mut self, mut classify: F) -> ResponseOutcome
    where
        F: FnMut(&Bus, StatusFlags) -> ResponseOutcome,
    {
        for _ in 0..Config::CMD_TIMEOUT_POLLS {
            let outcome = classify(&self.bus, self.bus.status());

            if !outcome.is_pending() {
                self.bus.clear_latched_flags();
                return outcome;
            }
        }

        ResponseOutcome::Error(Error::ResponseTimeout)
    }

    /// Send command without response.
    fn command_no_response(&mut self, command: Command) -> Result<(), Error> {
        self.send(command);
        self.wait_response(|_, status| classify_no_response(status))
            .into_result()
    }

    /// Send command with R1 response.
    fn command_r1(&mut self, command: Command) -> Result<(), Error> {
        self.send(command);
        self.wait_response(|bus, status| {
            classify_r1(
                status,
                bus.command_index(),
                CardStatus(bus.response(ResponseSlot::Resp1)),
                command.index,
            )
        })
        .into_result()
    }

    /// Send command with R2 response.
    fn command_r2(&mut self, command: Command) -> Result<[u32; 4], Error> {
        self.send(command);
        self.wait_response(|_, status| classify_r2(status))
            .into_result()?;

        Ok(ResponseSlot::LONG.map(|slot| self.bus.response(slot)))
    }

    /// Send command with R3 response.
    fn command_r3(&mut self, command: Command) -> Result<Ocr, Error> {
        self.send(command);
        self.wait_response(|_, status| classify_r3(status))
            .into_result()?;

        Ok(Ocr(self.bus.response(ResponseSlot::Resp1)))
    }

    /// Send command with R6 response.
    fn command_r6(&mut self, command: Command) -> Result<u16, Error> {
        let mut rca = None;

        self.send(command);
        self.wait_response(|bus, status| {
            let (outcome, published) = classify_r6(
                status,
                bus.command_index(),
                R6Response(bus.response(ResponseSlot::Resp1)),
                command.index,
            );
            rca = published;
            outcome
        })
        .into_result()?;

        rca.ok_or(Error::ResponseTimeout)
    }

    /// Send command with R7 response.
    fn command_r7(&mut self, command: Command) -> Result<(), Error> {
        self.send(command);
        self.wait_response(|_, status| classify_r7(status))
            .into_result()
    }

    /// Escape for the next application specific command.
    fn app_cmd(&mut self) -> Result<(), Error> {
        self.command_r1(Command::app_cmd(0))
    }

    /// Reset card to idle state.
    fn go_idle_state(&mut self) -> Result<(), Error> {
        info!("Resetting SD to idle state");

        self.command_no_response(Command::go_idle_state())
    }

    /// Verify SD Memory Card interface operating condition.
    ///
    /// Returns the card version and the capacity to request.
    fn check_version(&mut self) -> Result<(CardVersion, u32), Error> {
        info!("Verifying SD Memory Card interface operating condition");

        match self.command_r7(Command::send_if_cond()) {
            Ok(()) => Ok((CardVersion::V2_0, arguments::HIGH_CAPACITY)),
            Err(Error::ResponseTimeout) => {
                warn!("No response to SEND_IF_COND, assuming SD V1.x card");

                if let Err(err) = self.app_cmd() {
                    warn!("APP_CMD check failed: {:?}", err);
                }

                Ok((CardVersion::V1_1, arguments::STD_CAPACITY))
            }
            Err(err) => Err(err),
        }
    }

    /// Sends host capacity support information until the card finished power up.
    fn send_op_cond(&mut self, arg: u32) -> Result<Ocr, Error> {
        info!("Negotiating voltage window, arg: {:#x}", arg);

        for attempt in 0..Config::MAX_VOLTAGE_TRIALS {
            self.app_cmd()?;

            let ocr = self.command_r3(Command::sd_send_op_cond(arg))?;

            if ocr.powered_up() {
                info!("SD powered up, attempts: {}", attempt + 1);
                return Ok(ocr);
            }

            debug!("SD busy, attempt: {}", attempt + 1);
        }

        Err(Error::VoltageNegotiationTimeout)
    }

    /// Negotiation steps after bus bring-up.
    fn negotiate(&mut self) -> Result<CardProfile, Error> {
        self.go_idle_state()?;

        let (version, capacity_request) = self.check_version()?;

        if let Err(err) = self.app_cmd() {
            error!("SD rejected APP_CMD, not an SD card: {:?}", err);
            return Err(err);
        }

        let ocr = self.send_op_cond(arguments::VOLTAGE_WINDOW_SD | capacity_request)?;

        Ok(CardProfile::from_ocr(version, ocr))
    }

    /// Powers the card on and negotiates version, voltage and capacity.
    ///
    /// Calling it again re-runs the whole sequence.
    pub fn power_on(&mut self) -> Result<CardProfile, Error> {
        info!("SD power on started");

        self.bus.configure(BusConfig {
            clock_divider: Config::INIT_CLOCK_DIVIDER,
            edge: ClockEdge::Rising,
            bus_width: BusWidth::OneBit,
            flow_control: false,
        });
        self.bus.set_power(true);
        self.bus.enable_clock(true);
        self.delay.delay_ms(Config::POWER_UP_DELAY_MS);

        let result = self.negotiate();

        match &result {
            Ok(profile) => info!(
                "SD successfully powered on, version: {:?}, capacity: {:?}",
                profile.version, profile.capacity
            ),
            Err(err) => error!("Failed to power on SD: {:?}", err),
        }

        result
    }

    /// Identifies a powered on card: CID, relative address and CSD.
    ///
    /// The CSD layout follows the CSD_STRUCTURE field, so a V2.0 standard
    /// capacity card still decodes as a version 1 CSD.
    pub fn identify(&mut self, profile: &CardProfile) -> Result<CardIdentity, Error> {
        info!("SD identification started");

        let cid = self.command_r2(Command::all_send_cid())?;
        let rca = self.command_r6(Command::send_relative_address())?;
        let csd_data = self.command_r2(Command::send_csd(rca))?;

        let csd = Csd::from(csd_data);
        if profile.capacity == CapacityClass::High && matches!(csd, Csd::V1(_)) {
            warn!("High capacity card reported a version 1 CSD");
        }

        info!(
            "SD identified, rca: {:#x}, blocks: {}",
            rca,
            csd.card_capacity_blocks()
        );

        Ok(CardIdentity { cid, rca, csd })
    }
}
