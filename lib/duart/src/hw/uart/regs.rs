// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use serde::Serialize;

use super::bits::*;
use super::line::ParityMode;
use super::UartError;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Read,
    Write,
}

/// A register selected by an (offset, DLAB, direction) triple.
#[derive(
    Clone, Copy, Debug, Eq, PartialEq, Serialize, strum::IntoStaticStr,
)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Register {
    Rhr,
    Thr,
    Ier,
    Iir,
    Fcr,
    Lcr,
    Mcr,
    Lsr,
    Msr,
    Scr,
    Dll,
    Dlm,
}

impl Register {
    pub fn decode(
        offset: u8,
        dlab: bool,
        dir: Direction,
    ) -> Result<Self, UartError> {
        use Direction::*;

        let reg = match (offset, dlab, dir) {
            (REG_DLL, true, _) => Register::Dll,
            (REG_DLM, true, _) => Register::Dlm,
            (REG_RHR, false, Read) => Register::Rhr,
            (REG_THR, false, Write) => Register::Thr,
            (REG_IER, false, _) => Register::Ier,
            (REG_IIR, _, Read) => Register::Iir,
            (REG_FCR, _, Write) => Register::Fcr,
            (REG_LCR, _, _) => Register::Lcr,
            (REG_MCR, _, _) => Register::Mcr,
            (REG_LSR, _, _) => Register::Lsr,
            (REG_MSR, _, _) => Register::Msr,
            (REG_SCR, _, _) => Register::Scr,
            _ => return Err(UartError::InvalidRegisterAccess { offset, dlab }),
        };
        Ok(reg)
    }

    pub fn offset(self) -> u8 {
        match self {
            Register::Rhr | Register::Thr => REG_RHR,
            Register::Ier => REG_IER,
            Register::Iir | Register::Fcr => REG_IIR,
            Register::Lcr => REG_LCR,
            Register::Mcr => REG_MCR,
            Register::Lsr => REG_LSR,
            Register::Msr => REG_MSR,
            Register::Scr => REG_SCR,
            Register::Dll => REG_DLL,
            Register::Dlm => REG_DLM,
        }
    }

    /// Whether the register is only reachable with DLAB set.
    pub fn needs_dlab(self) -> bool {
        matches!(self, Register::Dll | Register::Dlm)
    }

    pub fn name(self) -> &'static str {
        self.into()
    }
}

impl std::fmt::Display for Register {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Backing store for the configuration registers of one channel.
///
/// Status registers (LSR, IIR, MSR) and the data path are not stored here;
/// the channel derives them from FIFO and line state at access time.
#[derive(Clone, Debug)]
pub struct RegisterFile {
    pub(super) ier: u8,
    pub(super) fcr: u8,
    pub(super) lcr: u8,
    pub(super) mcr: u8,
    pub(super) scr: u8,
    pub(super) dll: u8,
    pub(super) dlm: u8,
}

impl RegisterFile {
    pub fn new() -> Self {
        Self { ier: 0, fcr: 0, lcr: 0, mcr: 0, scr: 0, dll: 0, dlm: 0 }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Select the register addressed by `offset` using the stored DLAB.
    pub fn select(
        &self,
        offset: u8,
        dir: Direction,
    ) -> Result<Register, UartError> {
        Register::decode(offset, self.is_dlab(), dir)
    }

    /// Value of a stored register, or `None` for one derived elsewhere.
    pub fn read(&self, reg: Register) -> Option<u8> {
        match reg {
            Register::Ier => Some(self.ier),
            Register::Lcr => Some(self.lcr),
            Register::Mcr => Some(self.mcr),
            Register::Scr => Some(self.scr),
            Register::Dll => Some(self.dll),
            Register::Dlm => Some(self.dlm),
            _ => None,
        }
    }

    /// Store a value into a plain configuration register.
    ///
    /// Returns `false` if the register carries side effects (or is
    /// read-only) and so must be handled by the channel.
    pub fn write(&mut self, reg: Register, data: u8) -> bool {
        match reg {
            Register::Ier => self.ier = data & MASK_IER,
            Register::Lcr => self.lcr = data,
            Register::Mcr => self.mcr = data & MASK_MCR,
            Register::Scr => self.scr = data,
            Register::Dll => self.dll = data,
            Register::Dlm => self.dlm = data,
            _ => return false,
        }
        true
    }

    #[inline(always)]
    pub fn is_dlab(&self) -> bool {
        (self.lcr & LCR_DLAB) != 0
    }
    #[inline(always)]
    pub fn is_loopback(&self) -> bool {
        (self.mcr & MCR_LOOP) != 0
    }
    #[inline(always)]
    pub fn fifo_enabled(&self) -> bool {
        (self.fcr & FCR_ENA) != 0
    }
    pub fn parity(&self) -> ParityMode {
        ParityMode::from_lcr(self.lcr)
    }
    pub fn divisor(&self) -> u16 {
        u16::from_le_bytes([self.dll, self.dlm])
    }
    /// RX trigger level selected by the last FCR write. Without FIFOs the
    /// receiver is a single holding register.
    pub fn trigger_level(&self) -> usize {
        if !self.fifo_enabled() {
            return 1;
        }
        TRIGGER_LEVELS[((self.fcr & FCR_TRGR) >> FCR_TRGR_SHIFT) as usize]
    }
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dlab_selects_divisor_latch() {
        use Direction::*;
        assert_eq!(Register::decode(0, true, Read).unwrap(), Register::Dll);
        assert_eq!(Register::decode(1, true, Write).unwrap(), Register::Dlm);
        assert_eq!(Register::decode(0, false, Read).unwrap(), Register::Rhr);
        assert_eq!(Register::decode(0, false, Write).unwrap(), Register::Thr);
        assert_eq!(Register::decode(1, false, Read).unwrap(), Register::Ier);
        // DLAB does not shadow the upper registers
        assert_eq!(Register::decode(5, true, Read).unwrap(), Register::Lsr);
        assert_eq!(Register::decode(2, true, Write).unwrap(), Register::Fcr);
    }

    #[test]
    fn out_of_range_offset() {
        for dlab in [false, true] {
            let err = Register::decode(8, dlab, Direction::Read).unwrap_err();
            assert!(matches!(
                err,
                UartError::InvalidRegisterAccess { offset: 8, dlab: d } if d == dlab
            ));
        }
    }

    #[test]
    fn offsets_round_trip_through_decode() {
        for offset in 0..REGISTER_LEN {
            for dlab in [false, true] {
                for dir in [Direction::Read, Direction::Write] {
                    let reg = Register::decode(offset, dlab, dir).unwrap();
                    assert_eq!(reg.offset(), offset);
                    assert_eq!(reg.needs_dlab(), dlab && offset < 2);
                }
            }
        }
    }

    #[test]
    fn divisor_and_trigger() {
        let mut regs = RegisterFile::new();
        assert!(regs.write(Register::Dll, 0xf5));
        assert!(regs.write(Register::Dlm, 0x01));
        assert_eq!(regs.divisor(), 0x01f5);

        assert_eq!(regs.trigger_level(), 1);
        regs.fcr = 0x41;
        assert_eq!(regs.trigger_level(), 4);
        regs.fcr = 0xc1;
        assert_eq!(regs.trigger_level(), 14);
        regs.fcr = 0xc0;
        assert_eq!(regs.trigger_level(), 1);
    }

    #[test]
    fn derived_registers_not_stored() {
        let mut regs = RegisterFile::new();
        for reg in [Register::Lsr, Register::Msr, Register::Thr, Register::Fcr]
        {
            assert!(!regs.write(reg, 0xff));
        }
        assert_eq!(regs.read(Register::Lsr), None);
        assert_eq!(regs.read(Register::Rhr), None);
    }

    #[test]
    fn masked_writes() {
        let mut regs = RegisterFile::new();
        regs.write(Register::Ier, 0xff);
        regs.write(Register::Mcr, 0xff);
        assert_eq!(regs.read(Register::Ier), Some(MASK_IER));
        assert_eq!(regs.read(Register::Mcr), Some(MASK_MCR));
    }
}
