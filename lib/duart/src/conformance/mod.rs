// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Register-level conformance scenarios for the dual UART.
//!
//! A [`TestScenario`] is an ordered list of [`Step`]s. The [`Driver`] executes
//! them against a [`DualUart`](crate::hw::uart::DualUart), advancing the
//! simulated line only while it polls, and a [`Run`] sequences scenarios
//! into a [`Report`].

use thiserror::Error;

use crate::hw::uart::{ChannelId, Register, UartError};

mod driver;
mod poll;
mod run;
mod scenario;

pub use driver::*;
pub use poll::*;
pub use run::*;
pub use scenario::*;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum ScenarioError {
    #[error(
        "{channel} {register}: expected {expected:#04x}, read {actual:#04x} \
        (mask {mask:#04x})"
    )]
    AssertionMismatch {
        channel: ChannelId,
        register: Register,
        expected: u8,
        actual: u8,
        mask: u8,
    },

    #[error(
        "{channel} {register} bit {bit} not set after {iterations} polls"
    )]
    PollTimeout {
        channel: ChannelId,
        register: Register,
        bit: u8,
        iterations: u32,
    },

    #[error("{channel} reported an unexpected RX FIFO overrun")]
    FifoOverrunDetected { channel: ChannelId },

    #[error(
        "byte {index} ({data:#04x}): parity error injected={injected}, \
        receiver parity ok={parity_ok}"
    )]
    ParityOutcomeMismatch {
        index: usize,
        data: u8,
        injected: bool,
        parity_ok: bool,
    },

    #[error("{channel} received {data:#04x} which was never sent")]
    UnexpectedData { channel: ChannelId, data: u8 },

    #[error("nothing sent from {channel} is left to read back")]
    NothingSent { channel: ChannelId },

    #[error("no receive monitor attached")]
    MonitorNotAttached,

    #[error("injection probability {probability} outside [0, 1]")]
    InvalidProbability { probability: f64 },

    #[error(transparent)]
    Uart(#[from] UartError),
}
