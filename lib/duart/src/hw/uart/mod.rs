// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

pub mod bits;
mod fifo;
pub mod flow;
pub mod line;
mod link;
mod regs;
mod uart16550;

pub use fifo::*;
pub use line::{Frame, ParityMode};
pub use link::*;
pub use regs::*;
pub use uart16550::*;
