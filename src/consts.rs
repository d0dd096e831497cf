/// Size of a data block in bytes.
pub const BLOCK_SIZE: usize = 512;
/// Size of a data block in bytes, as `u64`.
pub const BLOCK_SIZE_U64: u64 = BLOCK_SIZE as u64;

pub mod commands {
    /// GO_IDLE_STATE - resets the card to idle state.
    pub const CMD0: u8 = 0;
    /// ALL_SEND_CID - asks any card to send the CID numbers.
    pub const CMD2: u8 = 2;
    /// SEND_RELATIVE_ADDR - asks the card to publish a new relative address.
    pub const CMD3: u8 = 3;
    /// SEND_IF_COND - verify SD Memory Card interface operating condition.
    pub const CMD8: u8 = 8;
    /// SEND_CSD - read the Card Specific Data (CSD register).
    pub const CMD9: u8 = 9;
    /// APP_CMD - escape for application specific command.
    pub const CMD55: u8 = 55;
    /// SD_SEND_OP_COND - Sends host capacity support information and activates
    /// the card's initialization process.
    pub const ACMD41: u8 = 41;
}

pub mod arguments {
    /// SEND_IF_COND argument: VHS 2.7-3.6V in bits 11:8, check pattern in bits 7:0.
    pub const CHECK_PATTERN: u32 = 0x0000_01AA;
    /// SD_SEND_OP_COND voltage window.
    pub const VOLTAGE_WINDOW_SD: u32 = 0x8010_0000;
    /// Host capacity support (HCS) request.
    pub const HIGH_CAPACITY: u32 = 0x4000_0000;
    /// No capacity request.
    pub const STD_CAPACITY: u32 = 0x0000_0000;
}

/// Card status error bits of an R1 response.
pub mod card_status {
    pub const ADDR_OUT_OF_RANGE: u32 = 0x8000_0000;
    pub const ADDR_MISALIGNED: u32 = 0x4000_0000;
    pub const BLOCK_LEN_ERR: u32 = 0x2000_0000;
    pub const ERASE_SEQ_ERR: u32 = 0x1000_0000;
    pub const BAD_ERASE_PARAM: u32 = 0x0800_0000;
    pub const WRITE_PROT_VIOLATION: u32 = 0x0400_0000;
    pub const LOCK_UNLOCK_FAILED: u32 = 0x0100_0000;
    pub const COM_CRC_FAILED: u32 = 0x0080_0000;
    pub const ILLEGAL_CMD: u32 = 0x0040_0000;
    pub const CARD_ECC_FAILED: u32 = 0x0020_0000;
    pub const CC_ERROR: u32 = 0x0010_0000;
    pub const GENERAL_UNKNOWN_ERROR: u32 = 0x0008_0000;
    pub const STREAM_READ_UNDERRUN: u32 = 0x0004_0000;
    pub const STREAM_WRITE_OVERRUN: u32 = 0x0002_0000;
    pub const CID_CSD_OVERWRITE: u32 = 0x0001_0000;
    pub const WP_ERASE_SKIP: u32 = 0x0000_8000;
    pub const CARD_ECC_DISABLED: u32 = 0x0000_4000;
    pub const ERASE_RESET: u32 = 0x0000_2000;
    pub const AKE_SEQ_ERROR: u32 = 0x0000_0008;
    /// All error bits above.
    pub const ERROR_BITS: u32 = 0xFDFF_E008;
}

/// Error bits of an R6 response.
pub mod r6 {
    pub const GENERAL_UNKNOWN_ERROR: u32 = 0x0000_2000;
    pub const ILLEGAL_CMD: u32 = 0x0000_4000;
    pub const COM_CRC_FAILED: u32 = 0x0000_8000;
    /// All error bits above.
    pub const ERROR_BITS: u32 = GENERAL_UNKNOWN_ERROR | ILLEGAL_CMD | COM_CRC_FAILED;
}

/// Controller status flags.
pub mod flags {
    /// Command response received, CRC check failed.
    pub const CCRC_FAIL: u32 = 1 << 0;
    /// Command response timeout.
    pub const CMD_TIMEOUT: u32 = 1 << 2;
    /// Command response received, CRC check passed.
    pub const CMD_REND: u32 = 1 << 6;
    /// Command sent, no response required.
    pub const CMD_SENT: u32 = 1 << 7;
    /// Flags latched by the controller until cleared.
    pub const STATIC: u32 = 0x0000_05FF;
}
