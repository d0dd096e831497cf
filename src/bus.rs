use crate::command::Command;

use bitfield::bitfield;

pub use crate::consts::flags;

bitfield! {
    /// Snapshot of the bus controller status register.
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct StatusFlags(u32);
    impl Debug;
    pub ccrc_fail, _: 0;
    pub cmd_timeout, _: 2;
    pub cmd_rend, _: 6;
    pub cmd_sent, _: 7;
}

impl StatusFlags {
    /// No flag raised.
    pub const EMPTY: StatusFlags = StatusFlags(0);
}

/// Clock edge the command and data lines change on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-log", derive(defmt::Format))]
pub enum ClockEdge {
    Rising,
    Falling,
}

/// Data bus width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-log", derive(defmt::Format))]
pub enum BusWidth {
    OneBit,
    FourBit,
    EightBit,
}

/// Controller setup applied before the first command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-log", derive(defmt::Format))]
pub struct BusConfig {
    /// Bus clock = kernel clock / (divider + 2).
    pub clock_divider: u8,
    /// Clock edge.
    pub edge: ClockEdge,
    /// Bus width.
    pub bus_width: BusWidth,
    /// Hardware flow control.
    pub flow_control: bool,
}

/// Response register slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-log", derive(defmt::Format))]
pub enum ResponseSlot {
    /// Short response, or bits 127:96 of a long response.
    Resp1,
    /// Bits 95:64 of a long response.
    Resp2,
    /// Bits 63:32 of a long response.
    Resp3,
    /// Bits 31:1 of a long response.
    Resp4,
}

impl ResponseSlot {
    /// Slots of a long response, most significant first.
    pub const LONG: [ResponseSlot; 4] = [
        ResponseSlot::Resp1,
        ResponseSlot::Resp2,
        ResponseSlot::Resp3,
        ResponseSlot::Resp4,
    ];
}

/// Register level access to an SDIO bus controller.
///
/// The driver owns the implementation for the whole init sequence, so no
/// other command can be issued while it runs.
pub trait SdioBus {
    /// Applies the clock and bus setup.
    fn configure(&mut self, config: BusConfig);

    /// Powers the card on or off.
    fn set_power(&mut self, on: bool);

    /// Enables or disables the bus clock.
    fn enable_clock(&mut self, enable: bool);

    /// Starts sending a command, does not block.
    fn send_command(&mut self, command: Command);

    /// Current status flags, does not block.
    fn status(&self) -> StatusFlags;

    /// Clears the latched (static) flags, see [`flags::STATIC`].
    fn clear_latched_flags(&mut self);

    /// Response register content.
    fn response(&self, slot: ResponseSlot) -> u32;

    /// Command index of the last received response.
    fn command_index(&self) -> u8;
}
