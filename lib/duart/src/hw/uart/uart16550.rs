// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::num::NonZeroU32;

use slog::{debug, warn};

use super::bits::*;
use super::fifo::{Delivery, Fifo, FifoFull};
use super::flow;
use super::line::{self, Frame, ParityMode};
use super::regs::{Direction, Register, RegisterFile};

/*
 * 16550 UART channel
 *
 * Transmit Path:
 * Writes to the Transmitter Holding Register (THR) are encoded with the
 * parity mode in effect at the time of the write and queued in tx_fifo. On
 * each tick the shifter, if idle and permitted by flow control, takes the
 * oldest frame. The frame is handed to the peer (or, in loopback, to our own
 * receiver) once it has spent `frame_ticks` ticks in the shifter.
 *
 * Receive Path:
 * Arriving frames are decoded with the current parity mode and appended to
 * rx_fifo. A frame arriving while rx_fifo is full is lost and sets the sticky
 * overrun flag, which is reported (and cleared) by the next LSR read.
 */

#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
pub enum UartError {
    #[error("no register at offset {offset:#x} (DLAB={dlab})")]
    InvalidRegisterAccess { offset: u8, dlab: bool },

    #[error("TX FIFO full ({capacity} frames)")]
    TxFifoFull { capacity: usize },
}

impl From<FifoFull> for UartError {
    fn from(err: FifoFull) -> Self {
        UartError::TxFifoFull { capacity: err.capacity }
    }
}

bitflags::bitflags! {
    /// Line Status Register
    ///
    /// Never stored: computed from FIFO and shifter state on every read.
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct LineStatus: u8 {
        /// RX FIFO holds at least one byte.
        const DATA_READY = LSR_DR;

        /// A byte was lost to a full RX FIFO since the last LSR read.
        const OVERRUN = LSR_OE;

        /// TX FIFO is empty.
        const THR_EMPTY = LSR_THRE;

        /// TX FIFO and shifter are both empty.
        const TX_EMPTY = LSR_TEMT;
    }
}

/// The far end of a channel's serial line.
pub trait Peer {
    /// RTS output of the peer, sampled as our CTS input.
    fn rts(&self) -> bool;

    /// Accept a frame which finished shifting out of our transmitter.
    fn receive(&mut self, frame: Frame);
}

/// A byte in the RX FIFO along with the verdict of its parity check.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Received {
    pub data: u8,
    pub parity_ok: bool,
}

#[derive(Clone, Copy, Debug)]
struct InFlight {
    frame: Frame,
    remaining: u32,
}

pub struct UartChannel {
    log: slog::Logger,
    regs: RegisterFile,

    frame_ticks: NonZeroU32,
    cts: bool,
    shifter: Option<InFlight>,
    parity_errors: u64,

    rx_fifo: Fifo<Received>,
    tx_fifo: Fifo<Frame>,
}

impl UartChannel {
    pub fn new(log: &slog::Logger, cfg: &duart_config::Uart) -> Self {
        UartChannel {
            log: log.clone(),
            regs: RegisterFile::new(),
            frame_ticks: cfg.frame_ticks,
            cts: false,
            shifter: None,
            parity_errors: 0,
            rx_fifo: Fifo::new(1, 1),
            tx_fifo: Fifo::new(cfg.tx_fifo_depth, 1),
        }
    }

    /// Read UART register
    pub fn reg_read(&mut self, offset: u8) -> Result<u8, UartError> {
        let reg = self.regs.select(offset, Direction::Read)?;
        Ok(self.read(reg))
    }

    /// Write UART register
    pub fn reg_write(&mut self, offset: u8, data: u8) -> Result<(), UartError> {
        let reg = self.regs.select(offset, Direction::Write)?;
        self.write(reg, data)
    }

    /// Register a read at `offset` would select, given the current DLAB.
    pub fn select(
        &self,
        offset: u8,
        dir: Direction,
    ) -> Result<Register, UartError> {
        self.regs.select(offset, dir)
    }

    fn read(&mut self, reg: Register) -> u8 {
        match reg {
            Register::Rhr => {
                self.rx_fifo.pop().map(|r| r.data).unwrap_or(0u8)
            }
            Register::Iir => self.intr_ident(),
            Register::Lsr => {
                let lsr = self.line_status();
                // Reading the LSR consumes the overrun indication.
                self.rx_fifo.take_overrun();
                lsr.bits()
            }
            Register::Msr => {
                if self.cts {
                    MSR_CTS
                } else {
                    0
                }
            }
            _ => self.regs.read(reg).unwrap_or(0u8),
        }
    }

    fn write(&mut self, reg: Register, data: u8) -> Result<(), UartError> {
        match reg {
            Register::Thr => {
                let frame = line::encode(data, self.regs.parity());
                self.tx_fifo.push(frame)?;
            }
            Register::Fcr => self.fifo_control(data),
            Register::Lsr | Register::Msr => {
                // ignore writes to read-only status
            }
            Register::Lcr => {
                let old = self.regs.parity();
                self.regs.write(reg, data);
                let new = self.regs.parity();
                if old != new {
                    debug!(self.log, "parity mode changed";
                        "from" => <&str>::from(old),
                        "to" => <&str>::from(new));
                }
            }
            _ => {
                self.regs.write(reg, data);
            }
        }
        Ok(())
    }

    fn fifo_control(&mut self, data: u8) {
        let was_enabled = self.regs.fifo_enabled();
        self.regs.fcr = data;
        if self.regs.fifo_enabled() {
            let level = self.regs.trigger_level();
            self.rx_fifo.reconfigure(level, level);
            self.tx_fifo.clear();
            debug!(self.log, "FIFOs enabled"; "trigger" => level);
        } else if was_enabled {
            self.rx_fifo.reconfigure(1, 1);
            self.tx_fifo.clear();
            debug!(self.log, "FIFOs disabled");
        }
    }

    /// Advance the transmitter by one tick.
    pub fn tick(&mut self, peer: &mut dyn Peer) {
        let loopback = self.regs.is_loopback();

        if let Some(mut inflight) = self.shifter.take() {
            inflight.remaining -= 1;
            if inflight.remaining > 0 {
                self.shifter = Some(inflight);
            } else if loopback {
                self.rx_deliver(inflight.frame);
            } else {
                peer.receive(inflight.frame);
            }
        }

        // CTS is sampled after delivery, so a receiver which just reached
        // its trigger level holds off the next frame.
        self.cts = if loopback { self.rts_output() } else { peer.rts() };
        if self.shifter.is_none()
            && flow::may_drain_tx(self.regs.mcr, self.cts)
        {
            if let Some(frame) = self.tx_fifo.pop() {
                self.shifter = Some(InFlight {
                    frame,
                    remaining: self.frame_ticks.get(),
                });
            }
        }
    }

    fn rx_deliver(&mut self, frame: Frame) {
        let mode = self.regs.parity();
        let (data, parity_ok) = line::decode(frame, mode);
        if !parity_ok {
            self.parity_errors += 1;
            debug!(self.log, "parity error";
                "data" => data,
                "mode" => <&str>::from(mode));
        }
        match self.rx_fifo.deliver(Received { data, parity_ok }) {
            Delivery::Stored => {}
            Delivery::Overrun { first: true } => {
                warn!(self.log, "RX FIFO overrun";
                    "dropped" => data,
                    "depth" => self.rx_fifo.capacity());
            }
            Delivery::Overrun { first: false } => {
                debug!(self.log, "RX FIFO still overrun"; "dropped" => data);
            }
        }
    }

    /// Current LSR contents, without the clear-on-read side effect.
    pub fn line_status(&self) -> LineStatus {
        let mut lsr = LineStatus::empty();
        lsr.set(LineStatus::DATA_READY, !self.rx_fifo.is_empty());
        lsr.set(LineStatus::OVERRUN, self.rx_fifo.overrun());
        lsr.set(LineStatus::THR_EMPTY, self.tx_fifo.is_empty());
        lsr.set(
            LineStatus::TX_EMPTY,
            self.tx_fifo.is_empty() && self.shifter.is_none(),
        );
        lsr
    }

    fn intr_source(&self) -> u8 {
        let ier = self.regs.ier;
        if ier & IER_ELSI != 0 && self.rx_fifo.overrun() {
            // This ignores Parity Error, Framing Error, and Break
            ISRC_RLS
        } else if ier & IER_ERBFI != 0 && self.rx_fifo.at_threshold() {
            ISRC_DR
        } else if ier & IER_ETBEI != 0 && self.tx_fifo.is_empty() {
            ISRC_THRE
        } else {
            ISRC_NONE
        }
    }

    fn intr_ident(&self) -> u8 {
        let fifo_bits =
            if self.regs.fifo_enabled() { IIR_FIFO_ENABLED } else { 0 };
        fifo_bits | self.intr_source()
    }

    /// Whether any enabled interrupt source is pending.
    pub fn intr_state(&self) -> bool {
        self.intr_source() != ISRC_NONE
    }

    /// RTS as driven onto the line by this channel.
    pub fn rts_output(&self) -> bool {
        flow::rts(
            self.regs.mcr,
            self.rx_fifo.len(),
            self.rx_fifo.threshold(),
        )
    }

    /// Pop the oldest received byte along with its parity verdict.
    pub fn take_received(&mut self) -> Option<Received> {
        self.rx_fifo.pop()
    }

    pub fn parity(&self) -> ParityMode {
        self.regs.parity()
    }
    pub fn divisor(&self) -> u16 {
        self.regs.divisor()
    }
    pub fn parity_errors(&self) -> u64 {
        self.parity_errors
    }
    pub fn rx_len(&self) -> usize {
        self.rx_fifo.len()
    }
    pub fn rx_capacity(&self) -> usize {
        self.rx_fifo.capacity()
    }
    pub fn tx_len(&self) -> usize {
        self.tx_fifo.len()
    }
    pub fn shifter_busy(&self) -> bool {
        self.shifter.is_some()
    }

    pub fn reset(&mut self) {
        self.regs.reset();
        self.cts = false;
        self.shifter = None;
        self.parity_errors = 0;

        self.rx_fifo.reconfigure(1, 1);
        self.rx_fifo.reset();
        self.tx_fifo.reset();
    }
}

impl Peer for UartChannel {
    fn rts(&self) -> bool {
        self.rts_output()
    }
    fn receive(&mut self, frame: Frame) {
        if self.regs.is_loopback() {
            // Per the datasheet, the serial input pin is disconnected.
            // Simply discard all incoming data.
            debug!(self.log, "discarding frame in loopback";
                "data" => frame.data);
            return;
        }
        self.rx_deliver(frame);
    }
}
