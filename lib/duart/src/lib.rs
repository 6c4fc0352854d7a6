// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

#![allow(clippy::style)]

pub mod conformance;
pub mod hw;

pub use conformance::{Report, Run};
pub use hw::uart::{DualUart, UartChannel};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
