// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Line encoder/decoder.
//!
//! Frames carry eight data bits plus an optional parity bit. Start and stop
//! bits are implied; there is no bit-clock here, only the notion of a frame
//! occupying the shifter for some number of ticks.

use super::bits::*;

#[derive(Clone, Copy, Debug, Eq, PartialEq, strum::IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum ParityMode {
    None,
    Odd,
    Even,
}

impl ParityMode {
    /// Decode the parity field (bits 5:3) of a line control value.
    pub fn from_lcr(lcr: u8) -> Self {
        if lcr & LCR_PEN == 0 {
            ParityMode::None
        } else if lcr & LCR_EPS == 0 {
            ParityMode::Odd
        } else {
            ParityMode::Even
        }
    }

    /// Parity field bits for a line control value.
    pub fn lcr_bits(self) -> u8 {
        match self {
            ParityMode::None => 0,
            ParityMode::Odd => LCR_PEN,
            ParityMode::Even => LCR_PEN | LCR_EPS,
        }
    }

    /// Parity bit which makes the frame satisfy this mode.
    fn parity_bit(self, data: u8) -> Option<bool> {
        let odd_ones = data.count_ones() % 2 == 1;
        match self {
            ParityMode::None => None,
            ParityMode::Odd => Some(!odd_ones),
            ParityMode::Even => Some(odd_ones),
        }
    }
}

impl From<duart_config::Parity> for ParityMode {
    fn from(value: duart_config::Parity) -> Self {
        match value {
            duart_config::Parity::None => ParityMode::None,
            duart_config::Parity::Odd => ParityMode::Odd,
            duart_config::Parity::Even => ParityMode::Even,
        }
    }
}

/// A character as it travels over the wire.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Frame {
    pub data: u8,
    pub parity: Option<bool>,
}

pub fn encode(data: u8, mode: ParityMode) -> Frame {
    Frame { data, parity: mode.parity_bit(data) }
}

/// Recover the data byte from a frame, checking parity against `mode`.
///
/// Bad parity does not prevent recovery of the byte. A frame lacking a
/// parity bit fails any parity-checking mode, and a receiver with parity
/// disabled accepts every frame.
pub fn decode(frame: Frame, mode: ParityMode) -> (u8, bool) {
    let ok = match (mode.parity_bit(frame.data), frame.parity) {
        (None, _) => true,
        (Some(expected), Some(actual)) => expected == actual,
        (Some(_), None) => false,
    };
    (frame.data, ok)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn any_mode() -> impl Strategy<Value = ParityMode> {
        prop_oneof![
            Just(ParityMode::None),
            Just(ParityMode::Odd),
            Just(ParityMode::Even),
        ]
    }

    proptest! {
        #[test]
        fn byte_survives_round_trip(data in any::<u8>(), mode in any_mode()) {
            let (out, ok) = decode(encode(data, mode), mode);
            prop_assert_eq!(out, data);
            prop_assert!(ok);
        }

        #[test]
        fn parity_counts_set_bits(data in any::<u8>()) {
            let ones = |f: Frame| data.count_ones() + f.parity.unwrap() as u32;
            prop_assert_eq!(ones(encode(data, ParityMode::Odd)) % 2, 1);
            prop_assert_eq!(ones(encode(data, ParityMode::Even)) % 2, 0);
        }

        #[test]
        fn crossed_parity_always_fails(data in any::<u8>()) {
            let (_, ok) = decode(encode(data, ParityMode::Even), ParityMode::Odd);
            prop_assert!(!ok);
            let (_, ok) = decode(encode(data, ParityMode::Odd), ParityMode::Even);
            prop_assert!(!ok);
        }
    }

    #[test]
    fn lcr_parity_field() {
        assert_eq!(ParityMode::from_lcr(0b00_000_000), ParityMode::None);
        assert_eq!(ParityMode::from_lcr(0b00_001_000), ParityMode::Odd);
        assert_eq!(ParityMode::from_lcr(0b00_011_000), ParityMode::Even);
        // EPS without PEN is still no parity
        assert_eq!(ParityMode::from_lcr(0b00_010_000), ParityMode::None);
        // stick parity is ignored
        assert_eq!(ParityMode::from_lcr(0b00_101_000), ParityMode::Odd);
        // DLAB is unrelated
        assert_eq!(ParityMode::from_lcr(0b10_011_000), ParityMode::Even);

        for mode in [ParityMode::None, ParityMode::Odd, ParityMode::Even] {
            assert_eq!(ParityMode::from_lcr(mode.lcr_bits()), mode);
        }
    }

    #[test]
    fn receiver_without_parity_accepts_anything() {
        let frame = encode(0x5a, ParityMode::Even);
        assert_eq!(decode(frame, ParityMode::None), (0x5a, true));
    }

    #[test]
    fn missing_parity_bit_fails_check() {
        let frame = encode(0x5a, ParityMode::None);
        assert_eq!(frame.parity, None);
        assert_eq!(decode(frame, ParityMode::Odd), (0x5a, false));
    }
}
