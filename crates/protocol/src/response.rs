//! Vendor response codes
//!
//! Both vendors answer every command with a single result byte. Exactly one
//! value means success; every other value is a failure with a fixed
//! description. Unlisted values decode to `Unknown(byte)` rather than an
//! error.

use std::fmt;

/// Result byte classifier shared by both vendors
pub trait ResponseCode: Copy + fmt::Debug {
    fn from_byte(byte: u8) -> Self;
    fn byte(&self) -> u8;
    fn is_success(&self) -> bool;
    fn description(&self) -> &'static str;
}

const UNKNOWN_RESULT: &str = "Unknown Result Code";

/// Magtek command result byte (byte 0 of the response buffer)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MagtekResponse {
    Success,
    Failure,
    BadParameter,
    Delayed,
    InvalidOperation,
    Unknown(u8),
}

static MAGTEK_RESPONSES: &[(u8, MagtekResponse, &str)] = &[
    (0x00, MagtekResponse::Success, "Success"),
    (0x01, MagtekResponse::Failure, "Failure"),
    (0x02, MagtekResponse::BadParameter, "Bad Parameter"),
    (
        0x05,
        MagtekResponse::Delayed,
        "Delayed (request refused by anti-hacking timer)",
    ),
    (
        0x07,
        MagtekResponse::InvalidOperation,
        "Invalid Operation (value already set)",
    ),
];

impl ResponseCode for MagtekResponse {
    fn from_byte(byte: u8) -> Self {
        MAGTEK_RESPONSES
            .iter()
            .find(|(code, _, _)| *code == byte)
            .map_or(MagtekResponse::Unknown(byte), |(_, rc, _)| *rc)
    }

    fn byte(&self) -> u8 {
        match self {
            MagtekResponse::Unknown(byte) => *byte,
            known => MAGTEK_RESPONSES
                .iter()
                .find(|(_, rc, _)| rc == known)
                .map_or(0xFF, |(code, _, _)| *code),
        }
    }

    fn is_success(&self) -> bool {
        matches!(self, MagtekResponse::Success)
    }

    fn description(&self) -> &'static str {
        MAGTEK_RESPONSES
            .iter()
            .find(|(_, rc, _)| rc == self)
            .map_or(UNKNOWN_RESULT, |(_, _, text)| *text)
    }
}

/// IDTech command result byte (first byte of the collected response)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdTechResponse {
    Acknowledge,
    NegativeAcknowledge,
    UnknownId,
    AlreadyInPosMode,
    KeyboardNegativeAcknowledge,
    Unknown(u8),
}

static IDTECH_RESPONSES: &[(u8, IdTechResponse, &str)] = &[
    (0x06, IdTechResponse::Acknowledge, "Acknowledge"),
    (0x15, IdTechResponse::NegativeAcknowledge, "Negative Acknowledge"),
    (0x16, IdTechResponse::UnknownId, "Unknown ID"),
    (0x17, IdTechResponse::AlreadyInPosMode, "Already in POS Mode"),
    (
        0xFD,
        IdTechResponse::KeyboardNegativeAcknowledge,
        "Negative Acknowledge",
    ),
];

impl ResponseCode for IdTechResponse {
    fn from_byte(byte: u8) -> Self {
        IDTECH_RESPONSES
            .iter()
            .find(|(code, _, _)| *code == byte)
            .map_or(IdTechResponse::Unknown(byte), |(_, rc, _)| *rc)
    }

    fn byte(&self) -> u8 {
        match self {
            IdTechResponse::Unknown(byte) => *byte,
            known => IDTECH_RESPONSES
                .iter()
                .find(|(_, rc, _)| rc == known)
                .map_or(0xFF, |(code, _, _)| *code),
        }
    }

    fn is_success(&self) -> bool {
        matches!(self, IdTechResponse::Acknowledge)
    }

    fn description(&self) -> &'static str {
        IDTECH_RESPONSES
            .iter()
            .find(|(_, rc, _)| rc == self)
            .map_or(UNKNOWN_RESULT, |(_, _, text)| *text)
    }
}

impl fmt::Display for MagtekResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#04x} ({})", self.byte(), self.description())
    }
}

impl fmt::Display for IdTechResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#04x} ({})", self.byte(), self.description())
    }
}
