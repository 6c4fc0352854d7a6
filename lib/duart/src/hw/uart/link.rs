// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use serde::Serialize;

use super::uart16550::{UartChannel, UartError};

// Two channels with TX of each wired to RX of the other

#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    PartialEq,
    Serialize,
    strum::Display,
    strum::IntoStaticStr,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ChannelId {
    Uart0,
    Uart1,
}

pub struct DualUart {
    uart0: UartChannel,
    uart1: UartChannel,
    ticks: u64,
}

impl DualUart {
    pub fn new(log: &slog::Logger, cfg: &duart_config::Uart) -> Self {
        let chan = |id: ChannelId| {
            UartChannel::new(
                &log.new(slog::o!("uart" => <&str>::from(id))),
                cfg,
            )
        };
        DualUart {
            uart0: chan(ChannelId::Uart0),
            uart1: chan(ChannelId::Uart1),
            ticks: 0,
        }
    }

    pub fn channel(&self, id: ChannelId) -> &UartChannel {
        match id {
            ChannelId::Uart0 => &self.uart0,
            ChannelId::Uart1 => &self.uart1,
        }
    }
    pub fn channel_mut(&mut self, id: ChannelId) -> &mut UartChannel {
        match id {
            ChannelId::Uart0 => &mut self.uart0,
            ChannelId::Uart1 => &mut self.uart1,
        }
    }

    pub fn reg_read(
        &mut self,
        id: ChannelId,
        offset: u8,
    ) -> Result<u8, UartError> {
        self.channel_mut(id).reg_read(offset)
    }
    pub fn reg_write(
        &mut self,
        id: ChannelId,
        offset: u8,
        data: u8,
    ) -> Result<(), UartError> {
        self.channel_mut(id).reg_write(offset, data)
    }

    /// Advance both channels by one tick. UART0 resolves first.
    pub fn tick(&mut self) {
        self.uart0.tick(&mut self.uart1);
        self.uart1.tick(&mut self.uart0);
        self.ticks += 1;
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn reset(&mut self) {
        self.uart0.reset();
        self.uart1.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hw::uart::bits::*;
    use crate::hw::uart::ParityMode;
    use slog::{Discard, Logger};

    fn link() -> DualUart {
        let log = Logger::root(Discard, slog::o!());
        DualUart::new(&log, &duart_config::Uart::default())
    }

    #[test]
    fn tx_crosses_to_peer() {
        let mut link = link();
        link.reg_write(ChannelId::Uart0, REG_THR, 0x5a).unwrap();
        link.tick();
        link.tick();
        assert_eq!(link.reg_read(ChannelId::Uart1, REG_LSR).unwrap(), 0x61);
        assert_eq!(link.reg_read(ChannelId::Uart0, REG_LSR).unwrap(), 0x60);
        assert_eq!(link.reg_read(ChannelId::Uart1, REG_RHR).unwrap(), 0x5a);
        assert_eq!(link.ticks(), 2);
    }

    #[test]
    fn both_directions_at_once() {
        let mut link = link();
        link.reg_write(ChannelId::Uart0, REG_THR, 0x01).unwrap();
        link.reg_write(ChannelId::Uart1, REG_THR, 0x02).unwrap();
        link.tick();
        link.tick();
        assert_eq!(link.reg_read(ChannelId::Uart1, REG_RHR).unwrap(), 0x01);
        assert_eq!(link.reg_read(ChannelId::Uart0, REG_RHR).unwrap(), 0x02);
    }

    #[test]
    fn forced_rts_defeats_flow_control() {
        let mut link = link();
        // receiver: 4-deep FIFO, RTS forced
        link.reg_write(ChannelId::Uart1, REG_MCR, MCR_RTS).unwrap();
        link.reg_write(ChannelId::Uart1, REG_FCR, 0x41).unwrap();
        // sender: auto flow control
        link.reg_write(ChannelId::Uart0, REG_MCR, MCR_AFE).unwrap();
        for data in 0..9u8 {
            link.reg_write(ChannelId::Uart0, REG_THR, data).unwrap();
        }
        for _ in 0..20 {
            link.tick();
        }
        let lsr = link.reg_read(ChannelId::Uart1, REG_LSR).unwrap();
        assert_eq!(lsr & LSR_OE, LSR_OE);
        assert_eq!(link.channel(ChannelId::Uart1).rx_len(), 4);
        assert_eq!(link.channel(ChannelId::Uart0).tx_len(), 0);
    }

    #[test]
    fn auto_rts_prevents_overrun() {
        let mut link = link();
        link.reg_write(ChannelId::Uart1, REG_MCR, MCR_AFE).unwrap();
        link.reg_write(ChannelId::Uart1, REG_FCR, 0x41).unwrap();
        link.reg_write(ChannelId::Uart0, REG_MCR, MCR_AFE).unwrap();
        for data in 0..9u8 {
            link.reg_write(ChannelId::Uart0, REG_THR, data).unwrap();
        }
        for _ in 0..20 {
            link.tick();
        }
        let lsr = link.reg_read(ChannelId::Uart1, REG_LSR).unwrap();
        assert_eq!(lsr & LSR_OE, 0);
        assert_eq!(link.channel(ChannelId::Uart1).rx_len(), 4);
        // held back in the sender rather than lost
        assert!(link.channel(ChannelId::Uart0).tx_len() > 0);

        // draining the receiver releases the rest
        let mut got = Vec::new();
        for _ in 0..40 {
            while let Some(rx) =
                link.channel_mut(ChannelId::Uart1).take_received()
            {
                got.push(rx.data);
            }
            link.tick();
        }
        assert_eq!(got, (0..9u8).collect::<Vec<_>>());
    }

    #[test]
    fn parity_mismatch_between_channels() {
        let mut link = link();
        link.reg_write(ChannelId::Uart1, REG_LCR, ParityMode::Odd.lcr_bits())
            .unwrap();
        link.reg_write(ChannelId::Uart0, REG_LCR, ParityMode::Even.lcr_bits())
            .unwrap();
        link.reg_write(ChannelId::Uart0, REG_THR, 0xc3).unwrap();
        link.tick();
        link.tick();
        let rx = link.channel_mut(ChannelId::Uart1).take_received().unwrap();
        assert_eq!(rx.data, 0xc3);
        assert!(!rx.parity_ok);
        assert_eq!(link.channel(ChannelId::Uart1).parity_errors(), 1);
    }

    #[test]
    fn channel_names() {
        assert_eq!(ChannelId::Uart0.to_string(), "uart0");
        assert_eq!(<&str>::from(ChannelId::Uart1), "uart1");
    }
}
