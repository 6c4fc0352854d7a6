// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Auto RTS/CTS flow control.
//!
//! A receiver signals readiness on its RTS output; the transmitter samples
//! that signal as CTS. The transmitter only consults CTS when its own MCR
//! has AFE set.

use super::bits::*;

/// RTS output of a channel.
///
/// With AFE set, RTS tracks RX occupancy against the trigger level. With AFE
/// clear, RTS is whatever MCR bit 1 forces.
pub fn rts(mcr: u8, rx_len: usize, rx_threshold: usize) -> bool {
    if mcr & MCR_AFE != 0 {
        rx_len < rx_threshold
    } else {
        mcr & MCR_RTS != 0
    }
}

/// May the transmitter move the next frame from its FIFO into the shifter?
pub fn may_drain_tx(mcr: u8, cts: bool) -> bool {
    mcr & MCR_AFE == 0 || cts
}
