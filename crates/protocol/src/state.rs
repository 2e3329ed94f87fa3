//! Magtek reader state
//!
//! The get-state command returns two bytes: the current state and the
//! antecedent event that led to it. Each is decoded through its own table.
//! Values outside the tables decode to an explicit "undefined" description.

use std::fmt;

static STATES: &[(u8, &str)] = &[
    (0x00, "WaitActAuth: waiting for activate authenticated mode"),
    (0x01, "WaitActRply: waiting for activation challenge reply"),
    (0x02, "WaitSwipe: waiting for swipe"),
    (0x03, "WaitDelay: waiting for anti-hacking timer"),
    (0x04, "WaitDeactRply: waiting for deactivation challenge reply"),
];

static ANTECEDENTS: &[(u8, &str)] = &[
    (0x00, "PowerUp: powered up"),
    (0x01, "GoodAuth: authentication succeeded"),
    (0x02, "GoodSwipe: good swipe"),
    (0x03, "BadSwipe: bad swipe"),
    (0x04, "FailAuth: authentication failed"),
    (0x05, "FailDeact: deactivation failed"),
    (0x06, "TOAuth: authentication timed out"),
    (0x07, "TOSwipe: swipe timed out"),
    (0x08, "GoodDeact: deactivation succeeded"),
    (0x09, "TODeact: deactivation timed out"),
];

const UNDEFINED_STATE: &str = "Undefined state";
const UNDEFINED_ANTECEDENT: &str = "Undefined antecedent";

fn lookup(table: &[(u8, &'static str)], byte: u8) -> Option<&'static str> {
    table
        .iter()
        .find(|(code, _)| *code == byte)
        .map(|(_, text)| *text)
}

/// Decoded `(state, antecedent)` pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceState {
    pub state: u8,
    pub antecedent: u8,
}

impl DeviceState {
    pub fn new(state: u8, antecedent: u8) -> Self {
        Self { state, antecedent }
    }

    pub fn state_description(&self) -> &'static str {
        lookup(STATES, self.state).unwrap_or(UNDEFINED_STATE)
    }

    pub fn antecedent_description(&self) -> &'static str {
        lookup(ANTECEDENTS, self.antecedent).unwrap_or(UNDEFINED_ANTECEDENT)
    }

    /// Human-readable form of both bytes; never fails
    pub fn describe(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "state {:#04x} ({}), antecedent {:#04x} ({})",
            self.state,
            self.state_description(),
            self.antecedent,
            self.antecedent_description()
        )
    }
}
