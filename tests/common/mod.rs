#![allow(dead_code)]

use embedded_hal_mock::delay::MockNoop;
use sdmmc_sdio::{
    flags, BusConfig, Command, DefaultSdMmcSdioConfig, ResponseSlot, SdMmcSdio, SdioBus,
    StatusFlags,
};

/// Driver under test.
pub type Driver = SdMmcSdio<ScriptedBus, MockNoop, DefaultSdMmcSdioConfig>;

/// What the controller reports after a command.
#[derive(Debug, Clone, Copy)]
pub struct Reply {
    pub status: u32,
    pub index: u8,
    pub response: [u32; 4],
}

impl Reply {
    /// Command sent, no response expected.
    pub fn sent() -> Self {
        Self::with_status(flags::CMD_SENT)
    }

    /// Nothing ever happens.
    pub fn silent() -> Self {
        Self::with_status(0)
    }

    /// Command response timeout.
    pub fn timeout() -> Self {
        Self::with_status(flags::CMD_TIMEOUT)
    }

    /// Response with a bad CRC.
    pub fn crc_fail() -> Self {
        Self::with_status(flags::CCRC_FAIL)
    }

    /// Short response echoing `index`.
    pub fn short(index: u8, word: u32) -> Self {
        Reply {
            status: flags::CMD_REND,
            index,
            response: [word, 0, 0, 0],
        }
    }

    /// R3 response, flagged with a CRC failure as the controller does.
    pub fn ocr(word: u32) -> Self {
        Reply {
            status: flags::CCRC_FAIL,
            index: 0x3F,
            response: [word, 0, 0, 0],
        }
    }

    /// Long response.
    pub fn long(words: [u32; 4]) -> Self {
        Reply {
            status: flags::CMD_REND,
            index: 0x3F,
            response: words,
        }
    }

    fn with_status(status: u32) -> Self {
        Reply {
            status,
            index: 0,
            response: [0; 4],
        }
    }
}

/// Bus controller double answering every command through a responder.
pub struct ScriptedBus {
    responder: Box<dyn FnMut(&Command) -> Reply>,
    current: Reply,
    pub sent: Vec<Command>,
    pub clears: usize,
    pub config: Option<BusConfig>,
    pub powered: bool,
    pub clock: bool,
}

impl ScriptedBus {
    pub fn new<F>(responder: F) -> Self
    where
        F: FnMut(&Command) -> Reply + 'static,
    {
        ScriptedBus {
            responder: Box::new(responder),
            current: Reply::silent(),
            sent: Vec::new(),
            clears: 0,
            config: None,
            powered: false,
            clock: false,
        }
    }

    /// Indexes of all sent commands.
    pub fn indexes(&self) -> Vec<u8> {
        self.sent.iter().map(|cmd| cmd.index).collect()
    }

    /// Sent commands with the given index.
    pub fn sent_with(&self, index: u8) -> Vec<Command> {
        self.sent
            .iter()
            .filter(|cmd| cmd.index == index)
            .copied()
            .collect()
    }
}

impl SdioBus for ScriptedBus {
    fn configure(&mut self, config: BusConfig) {
        self.config = Some(config);
    }

    fn set_power(&mut self, on: bool) {
        self.powered = on;
    }

    fn enable_clock(&mut self, enable: bool) {
        self.clock = enable;
    }

    fn send_command(&mut self, command: Command) {
        self.sent.push(command);
        self.current = (self.responder)(&command);
    }

    fn status(&self) -> StatusFlags {
        StatusFlags(self.current.status)
    }

    fn clear_latched_flags(&mut self) {
        self.clears += 1;
        self.current.status &= !flags::STATIC;
    }

    fn response(&self, slot: ResponseSlot) -> u32 {
        match slot {
            ResponseSlot::Resp1 => self.current.response[0],
            ResponseSlot::Resp2 => self.current.response[1],
            ResponseSlot::Resp3 => self.current.response[2],
            ResponseSlot::Resp4 => self.current.response[3],
        }
    }

    fn command_index(&self) -> u8 {
        self.current.index
    }
}

/// Card status of an idle card waiting for an application command.
pub const APP_CMD_STATUS: u32 = 0x0000_0120;
/// OCR of a card still powering up.
pub const OCR_BUSY: u32 = 0x00FF_8000;
/// OCR of a powered up standard capacity card.
pub const OCR_READY_SDSC: u32 = 0x80FF_8000;
/// OCR of a powered up high capacity card.
pub const OCR_READY_SDHC: u32 = 0xC0FF_8000;

/// Answers like a healthy card, the OCR comes from `ocr`.
pub fn card<F>(v2: bool, mut ocr: F) -> impl FnMut(&Command) -> Reply
where
    F: FnMut() -> u32,
{
    move |cmd| match cmd.index {
        0 => Reply::sent(),
        8 if v2 => Reply::short(8, cmd.argument),
        8 => Reply::timeout(),
        55 => Reply::short(55, APP_CMD_STATUS),
        41 => Reply::ocr(ocr()),
        _ => Reply::timeout(),
    }
}

pub fn driver(bus: ScriptedBus) -> Driver {
    SdMmcSdio::new(bus, MockNoop::new())
}
