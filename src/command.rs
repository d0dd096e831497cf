use crate::consts::{arguments, commands};

/// Expected shape of the card's reply to a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-log", derive(defmt::Format))]
pub enum ResponseShape {
    /// No response expected.
    None,
    /// 48-bit response, one response word.
    Short,
    /// 136-bit response, four response words.
    Long,
}

/// How the command path waits before sending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-log", derive(defmt::Format))]
pub enum WaitPolicy {
    /// Send immediately.
    None,
    /// Wait for an interrupt request.
    Interrupt,
    /// Wait for the end of a data transfer.
    Pending,
}

/// One command for the bus controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-log", derive(defmt::Format))]
pub struct Command {
    /// Command index.
    pub index: u8,
    /// Command argument.
    pub argument: u32,
    /// Expected response.
    pub response: ResponseShape,
    /// Wait policy.
    pub wait: WaitPolicy,
    /// Engage the command path state machine.
    pub cpsm: bool,
}

impl Command {
    /// Creates a command that is sent immediately with the CPSM enabled.
    pub const fn new(index: u8, argument: u32, response: ResponseShape) -> Self {
        Command {
            index,
            argument,
            response,
            wait: WaitPolicy::None,
            cpsm: true,
        }
    }

    /// GO_IDLE_STATE - init card in SD mode, no response.
    pub const fn go_idle_state() -> Self {
        Self::new(commands::CMD0, 0x0000_0000, ResponseShape::None)
    }

    /// SEND_IF_COND - verify SD Memory Card interface operating condition, R7.
    ///
    /// Asks for the 2.7-3.6V range with check pattern 0xAA.
    pub const fn send_if_cond() -> Self {
        Self::new(
            commands::CMD8,
            arguments::CHECK_PATTERN,
            ResponseShape::Short,
        )
    }

    /// APP_CMD - escape for application specific command, R1.
    ///
    /// Must precede every ACMD. `rca` is zero before the card has an address.
    pub const fn app_cmd(rca: u16) -> Self {
        Self::new(
            commands::CMD55,
            (rca as u32) << 16,
            ResponseShape::Short,
        )
    }

    /// SD_SEND_OP_COND - sends host capacity support information and activates
    /// the card's initialization process, R3.
    pub const fn sd_send_op_cond(argument: u32) -> Self {
        Self::new(commands::ACMD41, argument, ResponseShape::Short)
    }

    /// ALL_SEND_CID - asks any card to send its CID, R2.
    pub const fn all_send_cid() -> Self {
        Self::new(commands::CMD2, 0x0000_0000, ResponseShape::Long)
    }

    /// SEND_RELATIVE_ADDR - asks the card to publish a new relative address, R6.
    pub const fn send_relative_address() -> Self {
        Self::new(commands::CMD3, 0x0000_0000, ResponseShape::Short)
    }

    /// SEND_CSD - asks the addressed card to send its CSD, R2.
    pub const fn send_csd(rca: u16) -> Self {
        Self::new(commands::CMD9, (rca as u32) << 16, ResponseShape::Long)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_if_cond_carries_check_pattern_and_voltage_range() {
        let cmd = Command::send_if_cond();

        assert_eq!(cmd.index, 8);
        assert_eq!(cmd.argument & 0xFF, 0xAA);
        assert_eq!((cmd.argument >> 8) & 0xF, 0x1);
        assert_eq!(cmd.response, ResponseShape::Short);
    }

    #[test]
    fn app_cmd_places_rca_in_upper_half() {
        assert_eq!(Command::app_cmd(0).argument, 0);
        assert_eq!(Command::app_cmd(0x1234).argument, 0x1234_0000);
        assert_eq!(Command::send_csd(0xB368).argument, 0xB368_0000);
    }

    #[test]
    fn go_idle_state_expects_no_response() {
        let cmd = Command::go_idle_state();

        assert_eq!(cmd.index, 0);
        assert_eq!(cmd.response, ResponseShape::None);
        assert_eq!(cmd.wait, WaitPolicy::None);
        assert!(cmd.cpsm);
    }
}
