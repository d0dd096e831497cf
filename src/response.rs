use crate::{
    bus::StatusFlags,
    consts::{card_status, r6},
    Error,
};

use bitfield::bitfield;

bitfield! {
    /// R1 card status, error bits are decoded with [`CARD_STATUS_ERRORS`].
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct CardStatus(u32);
    impl Debug;
    pub card_is_locked, _: 25;
    pub u8, current_state, _: 12, 9;
    pub ready_for_data, _: 8;
    pub app_cmd, _: 5;
}

bitfield! {
    /// R3 operation conditions register.
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct Ocr(u32);
    impl Debug;
    /// Set once the card finished its power up routine.
    pub powered_up, _: 31;
    /// Card capacity status, valid only when powered up.
    pub high_capacity, _: 30;
    pub u16, voltage_window, _: 23, 15;
}

bitfield! {
    /// R6 published relative card address response.
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct R6Response(u32);
    impl Debug;
    pub u16, rca, _: 31, 16;
    pub u16, status, _: 15, 0;
}

/// Result of classifying one controller status snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-log", derive(defmt::Format))]
pub enum ResponseOutcome {
    /// No terminal flag raised yet, keep polling.
    Pending,
    /// Command completed without error.
    Ok,
    /// Command failed.
    Error(Error),
}

impl ResponseOutcome {
    /// Converts a terminal outcome into a result, `Pending` maps to a timeout.
    pub fn into_result(self) -> Result<(), Error> {
        match self {
            ResponseOutcome::Ok => Ok(()),
            ResponseOutcome::Error(err) => Err(err),
            ResponseOutcome::Pending => Err(Error::ResponseTimeout),
        }
    }

    /// Returns true if polling should continue.
    pub fn is_pending(&self) -> bool {
        matches!(self, ResponseOutcome::Pending)
    }
}

impl From<Result<(), Error>> for ResponseOutcome {
    fn from(result: Result<(), Error>) -> Self {
        match result {
            Ok(()) => ResponseOutcome::Ok,
            Err(err) => ResponseOutcome::Error(err),
        }
    }
}

/// Card status error bits with their error, highest priority first.
pub const CARD_STATUS_ERRORS: [(u32, Error); 19] = [
    (card_status::ADDR_OUT_OF_RANGE, Error::AddressOutOfRange),
    (card_status::ADDR_MISALIGNED, Error::AddressMisaligned),
    (card_status::BLOCK_LEN_ERR, Error::BlockLengthError),
    (card_status::ERASE_SEQ_ERR, Error::EraseSequenceError),
    (card_status::BAD_ERASE_PARAM, Error::BadEraseParameter),
    (card_status::WRITE_PROT_VIOLATION, Error::WriteProtectViolation),
    (card_status::LOCK_UNLOCK_FAILED, Error::LockUnlockFailed),
    (card_status::COM_CRC_FAILED, Error::ComCrcFailed),
    (card_status::ILLEGAL_CMD, Error::IllegalCommand),
    (card_status::CARD_ECC_FAILED, Error::CardEccFailed),
    (card_status::CC_ERROR, Error::ControllerError),
    (card_status::GENERAL_UNKNOWN_ERROR, Error::GeneralUnknownError),
    (card_status::STREAM_READ_UNDERRUN, Error::StreamReadUnderrun),
    (card_status::STREAM_WRITE_OVERRUN, Error::StreamWriteOverrun),
    (card_status::CID_CSD_OVERWRITE, Error::CidCsdOverwrite),
    (card_status::WP_ERASE_SKIP, Error::WriteProtectEraseSkip),
    (card_status::CARD_ECC_DISABLED, Error::CardEccDisabled),
    (card_status::ERASE_RESET, Error::EraseReset),
    (card_status::AKE_SEQ_ERROR, Error::AkeSequenceError),
];

/// R6 error bits with their error, highest priority first.
pub const R6_ERRORS: [(u32, Error); 3] = [
    (r6::GENERAL_UNKNOWN_ERROR, Error::GeneralUnknownError),
    (r6::ILLEGAL_CMD, Error::IllegalCommand),
    (r6::COM_CRC_FAILED, Error::ComCrcFailed),
];

/// First error of `table` whose bit is set in `word`.
fn first_error(word: u32, table: &[(u32, Error)]) -> Option<Error> {
    table
        .iter()
        .find(|(mask, _)| word & mask != 0)
        .map(|&(_, err)| err)
}

/// Decodes the error bits of a card status word.
pub fn decode_card_status(status: CardStatus) -> Result<(), Error> {
    if status.0 & card_status::ERROR_BITS == 0 {
        return Ok(());
    }

    match first_error(status.0, &CARD_STATUS_ERRORS) {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Shared part of every short response: timeout first, then CRC.
fn transport_outcome(status: StatusFlags) -> Option<ResponseOutcome> {
    if status.cmd_timeout() {
        Some(ResponseOutcome::Error(Error::ResponseTimeout))
    } else if status.ccrc_fail() {
        Some(ResponseOutcome::Error(Error::CrcFail))
    } else if status.cmd_rend() {
        None
    } else {
        Some(ResponseOutcome::Pending)
    }
}

/// Classifies a command sent without response.
pub fn classify_no_response(status: StatusFlags) -> ResponseOutcome {
    if status.cmd_sent() {
        ResponseOutcome::Ok
    } else {
        ResponseOutcome::Pending
    }
}

/// Classifies an R7 (interface condition) response.
///
/// A timeout means the card is not V2.0 compliant or does not support the
/// requested voltage range.
pub fn classify_r7(status: StatusFlags) -> ResponseOutcome {
    transport_outcome(status).unwrap_or(ResponseOutcome::Ok)
}

/// Classifies an R1 response to command `cmd`.
pub fn classify_r1(
    status: StatusFlags,
    echoed_index: u8,
    response: CardStatus,
    cmd: u8,
) -> ResponseOutcome {
    if let Some(outcome) = transport_outcome(status) {
        return outcome;
    }

    if echoed_index != cmd {
        return ResponseOutcome::Error(Error::CommandMismatch);
    }

    decode_card_status(response).into()
}

/// Classifies an R2 (CID or CSD) response.
pub fn classify_r2(status: StatusFlags) -> ResponseOutcome {
    transport_outcome(status).unwrap_or(ResponseOutcome::Ok)
}

/// Classifies an R3 (OCR) response.
///
/// R3 has no CRC, so a CRC failure flag also marks a received response.
pub fn classify_r3(status: StatusFlags) -> ResponseOutcome {
    if status.cmd_timeout() {
        ResponseOutcome::Error(Error::ResponseTimeout)
    } else if status.cmd_rend() || status.ccrc_fail() {
        ResponseOutcome::Ok
    } else {
        ResponseOutcome::Pending
    }
}

/// Classifies an R6 response to command `cmd`, returns the published
/// relative card address on success.
pub fn classify_r6(
    status: StatusFlags,
    echoed_index: u8,
    response: R6Response,
    cmd: u8,
) -> (ResponseOutcome, Option<u16>) {
    if let Some(outcome) = transport_outcome(status) {
        return (outcome, None);
    }

    if echoed_index != cmd {
        return (ResponseOutcome::Error(Error::CommandMismatch), None);
    }

    match first_error(u32::from(response.status()) & r6::ERROR_BITS, &R6_ERRORS) {
        Some(err) => (ResponseOutcome::Error(err), None),
        None => (ResponseOutcome::Ok, Some(response.rca())),
    }
}
