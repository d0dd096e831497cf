use crate::consts::BLOCK_SIZE_U64;

use bitfield::bitfield;
use size::{consts::KiB, Size};

/// Card Specific Data as read from the four long response registers, most significant first.
pub type CsdData = [u32; 4];

bitfield! {
    /// Card Specific Data, version 1.
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct CsdV1(u128);
    impl Debug;
    pub u8, version, _: 127, 126;
    pub u8, data_read_access_time1, _: 119, 112;
    pub u8, data_read_access_time2, _: 111, 104;
    pub u8, max_data_transfer_rate, _: 103, 96;
    pub u16, card_command_classes, _: 95, 84;
    pub u8, read_block_length, _: 83, 80;
    pub read_partial_blocks, _: 79;
    pub dsr_implemented, _: 76;
    pub u16, device_size, _: 73, 62;
    pub u8, device_size_multiplier, _: 49, 47;
    pub erase_single_block_enabled, _: 46;
    pub u8, erase_sector_size, _: 45, 39;
    pub u8, write_protect_group_size, _: 38, 32;
    pub u8, max_write_data_length, _: 25, 22;
    pub permanent_write_protection, _: 13;
    pub temporary_write_protection, _: 12;
}

bitfield! {
    /// Card Specific Data, version 2.
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct CsdV2(u128);
    impl Debug;
    pub u8, version, _: 127, 126;
    pub u8, data_read_access_time1, _: 119, 112;
    pub u8, data_read_access_time2, _: 111, 104;
    pub u8, max_data_transfer_rate, _: 103, 96;
    pub u16, card_command_classes, _: 95, 84;
    pub u8, read_block_length, _: 83, 80;
    pub read_partial_blocks, _: 79;
    pub dsr_implemented, _: 76;
    pub u32, device_size, _: 69, 48;
    pub erase_single_block_enabled, _: 46;
    pub u8, erase_sector_size, _: 45, 39;
    pub u8, write_protect_group_size, _: 38, 32;
    pub u8, max_write_data_length, _: 25, 22;
    pub permanent_write_protection, _: 13;
    pub temporary_write_protection, _: 12;
}

/// Card Specific Data, generic container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Csd {
    V1(CsdV1),
    V2(CsdV2),
}

/// Represents capacity provider.
pub trait CapacityProvider {
    /// Returns the card capacity in bytes.
    fn card_capacity(&self) -> Size;

    /// Returns the card capacity in 512-byte blocks.
    fn card_capacity_blocks(&self) -> u64;
}

fn join(csd_data: CsdData) -> u128 {
    csd_data
        .iter()
        .fold(0u128, |acc, &word| (acc << 32) | u128::from(word))
}

impl From<CsdData> for CsdV1 {
    fn from(csd_data: CsdData) -> Self {
        CsdV1(join(csd_data))
    }
}

impl From<CsdData> for CsdV2 {
    fn from(csd_data: CsdData) -> Self {
        CsdV2(join(csd_data))
    }
}

/// Picks the layout from CSD_STRUCTURE, reserved values decode as version 2.
impl From<CsdData> for Csd {
    fn from(csd_data: CsdData) -> Self {
        let csd = CsdV1::from(csd_data);
        match csd.version() {
            0 => Csd::V1(csd),
            _ => Csd::V2(CsdV2::from(csd_data)),
        }
    }
}

impl CapacityProvider for CsdV1 {
    fn card_capacity(&self) -> Size {
        Size::from_bytes(self.card_capacity_blocks() * BLOCK_SIZE_U64)
    }

    fn card_capacity_blocks(&self) -> u64 {
        // (C_SIZE + 1) * 2^(C_SIZE_MULT + 2) * 2^READ_BL_LEN / 512
        let shift = u32::from(self.device_size_multiplier())
            + u32::from(self.read_block_length())
            + 2;

        (u64::from(self.device_size()) + 1) << shift.saturating_sub(9)
    }
}

impl CapacityProvider for CsdV2 {
    fn card_capacity(&self) -> Size {
        Size::from_bytes(self.card_capacity_blocks() * BLOCK_SIZE_U64)
    }

    fn card_capacity_blocks(&self) -> u64 {
        (u64::from(self.device_size()) + 1) * (KiB as u64)
    }
}

impl CapacityProvider for Csd {
    fn card_capacity(&self) -> Size {
        match self {
            Csd::V1(csd) => csd.card_capacity(),
            Csd::V2(csd) => csd.card_capacity(),
        }
    }

    fn card_capacity_blocks(&self) -> u64 {
        match self {
            Csd::V1(csd) => csd.card_capacity_blocks(),
            Csd::V2(csd) => csd.card_capacity_blocks(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn v2_capacity_from_long_response() {
        // 8 GB SDHC: C_SIZE = 0x3B37
        let csd = CsdV2::from([0x400E_0032, 0x5B59_0000, 0x3B37_7F80, 0x0A40_4000]);

        assert_eq!(csd.version(), 1);
        assert_eq!(csd.read_block_length(), 9);
        assert_eq!(csd.device_size(), 0x3B37);
        assert_eq!(csd.card_capacity_blocks(), 0x3B38 * 1024);
        assert_eq!(
            Csd::V2(csd).card_capacity(),
            Size::from_bytes(0x3B38u64 * 1024 * 512)
        );
    }

    #[test]
    fn v1_capacity_from_long_response() {
        // C_SIZE = 0xF2A, C_SIZE_MULT = 7, READ_BL_LEN = 9
        let c_size: u128 = 0xF2A;
        let raw: u128 = (9u128 << 80) | (c_size << 62) | (7u128 << 47);
        let words = [
            (raw >> 96) as u32,
            (raw >> 64) as u32,
            (raw >> 32) as u32,
            raw as u32,
        ];
        let csd = CsdV1::from(words);

        assert_eq!(csd.version(), 0);
        assert_eq!(csd.device_size(), 0xF2A);
        assert_eq!(csd.device_size_multiplier(), 7);
        assert_eq!(csd.card_capacity_blocks(), 0xF2B << 9);
    }

    #[test]
    fn layout_follows_csd_structure() {
        let v2 = Csd::from([0x400E_0032, 0x5B59_0000, 0x3B37_7F80, 0x0A40_4000]);
        let v1 = Csd::from([0, 0x0009_03CA, 0x8003_8000, 0]);

        assert!(matches!(v2, Csd::V2(_)));
        assert!(matches!(v1, Csd::V1(_)));
        assert_eq!(v1.card_capacity_blocks(), 1_988_096);
    }
}
