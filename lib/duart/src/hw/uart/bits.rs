// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

#![allow(unused)]

/*
 * Register offsets from base
 */
pub const REG_RHR: u8 = 0b000; // Receiver Holding Register (RO)
pub const REG_THR: u8 = 0b000; // Transmitter Holding Register (WO)
pub const REG_IER: u8 = 0b001; // Interrupt Enable Register (RW)
pub const REG_IIR: u8 = 0b010; // Interrupt Ident Register (RO)
pub const REG_FCR: u8 = 0b010; // FIFO Control Register (WO)
pub const REG_LCR: u8 = 0b011; // Line Control Register (RW)
pub const REG_MCR: u8 = 0b100; // Modem Control Register (RW)
pub const REG_LSR: u8 = 0b101; // Line Status Register (RO)
pub const REG_MSR: u8 = 0b110; // Modem Status Register (RO)
pub const REG_SCR: u8 = 0b111; // Scratch Register (RW)
pub const REG_DLL: u8 = 0b000; // Divisor Latch LSB (RW when DLAB=1)
pub const REG_DLM: u8 = 0b001; // Divisor Latch MSB (RW when DLAB=1)

pub const REGISTER_LEN: u8 = 8;

/*
 * Interrupt Enable Register (IER) bits
 */
pub const IER_ERBFI: u8 = 1 << 0; // enable received data available intr
pub const IER_ETBEI: u8 = 1 << 1; // enable xmit holding register empty intr
pub const IER_ELSI: u8 = 1 << 2; // enable receiver line status intr
pub const IER_EDSSI: u8 = 1 << 3; // enable modem status intr

/*
 * Possible values of Interrupt Identification Register
 */
pub const ISRC_NONE: u8 = 0b0001; // no interrupt
pub const ISRC_RLS: u8 = 0b0110; // receiver line status
pub const ISRC_DR: u8 = 0b0100; // data ready
pub const ISRC_THRE: u8 = 0b0010; // transmitter holding register empty
pub const IIR_FIFO_ENABLED: u8 = 0b11000000;

/*
 * FIFO Control Register (FCR) bits
 */
pub const FCR_ENA: u8 = 1 << 0; // enable transmitter/receive FIFOs
pub const FCR_RXRST: u8 = 1 << 1; // clear bytes and count in receiver FIFO
pub const FCR_TXRST: u8 = 1 << 2; // clear bytes and count in transmit FIFO
pub const FCR_TRGR: u8 = 0b11000000;
pub const FCR_TRGR_SHIFT: u8 = 6;
pub const FCR_TRGR_4: u8 = 0b01000000; // RX trigger (and depth) of 4 bytes
// 0x41 selects a trigger of 4. 0x81 would select 8, not 4.

/// RX trigger levels, indexed by FCR bits 7:6.
pub const TRIGGER_LEVELS: [usize; 4] = [1, 4, 8, 14];

/*
 * Line Control Register (LCR) bits
 */
pub const LCR_PEN: u8 = 1 << 3; // parity enable
pub const LCR_EPS: u8 = 1 << 4; // even parity select
pub const LCR_STICK: u8 = 1 << 5; // stick parity (ignored by the codec)
pub const LCR_DLAB: u8 = 0b10000000; // Divisor Latch Access Bit

/*
 * Modem Control Register (MCR) bits
 */
pub const MCR_DTR: u8 = 1 << 0;
pub const MCR_RTS: u8 = 1 << 1; // request to send, forced when AFE is clear
pub const MCR_LOOP: u8 = 1 << 4; // loopback
pub const MCR_AFE: u8 = 1 << 5; // auto flow control enable

/*
 * Line Status Register (LSR) bits
 */
pub const LSR_DR: u8 = 1 << 0; // Data Ready
pub const LSR_OE: u8 = 1 << 1; // Overrun Error
pub const LSR_THRE: u8 = 1 << 5; // THRE indicator
pub const LSR_TEMT: u8 = 1 << 6; // Transmitter Empty indicator

/*
 * Modem Status Register (MSR) bits
 */
pub const MSR_CTS: u8 = 1 << 4;

pub const MASK_PARITY: u8 = 0b00111000;
pub const MASK_MCR: u8 = 0b00111111;
pub const MASK_IER: u8 = 0b00001111;
pub const MASK_ISRC: u8 = 0b00001111;
