// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use duart_config::OVERRUN_RX_DEPTH;

use crate::hw::uart::bits::*;
use crate::hw::uart::{ChannelId, LineStatus, ParityMode};

/// Divisor for 57600 baud off the reference clock.
pub const BAUD_57600: u16 = 0x00f5;

/// Line settings applied by a `Configure` step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChannelSetup {
    pub divisor: u16,
    pub parity: ParityMode,
    pub mcr: u8,
    pub fcr: Option<u8>,
    pub ier: Option<u8>,
}

impl ChannelSetup {
    pub fn new(parity: ParityMode, mcr: u8) -> Self {
        Self { divisor: BAUD_57600, parity, mcr, fcr: None, ier: None }
    }
    pub fn fcr(self, fcr: u8) -> Self {
        Self { fcr: Some(fcr), ..self }
    }
    pub fn ier(self, ier: u8) -> Self {
        Self { ier: Some(ier), ..self }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Step {
    /// Program divisor, modem control, FIFO control, parity and interrupt
    /// enables, leaving DLAB clear.
    Configure { channel: ChannelId, setup: ChannelSetup },

    /// Raw register write at the given offset.
    WriteReg { channel: ChannelId, offset: u8, value: u8 },

    /// Read a register and compare the bits selected by `mask`.
    Verify { channel: ChannelId, offset: u8, expected: u8, mask: u8 },

    Transmit { channel: ChannelId, data: u8 },

    TransmitRandom { channel: ChannelId },

    /// Read LSR until every bit in `status` is set.
    PollUntil { channel: ChannelId, status: LineStatus },

    /// Read one byte from `channel` and compare it with the oldest byte
    /// `source` sent which has not been read back yet.
    VerifyReadback { channel: ChannelId, source: ChannelId },

    /// Choose, with the given probability, to program `corrupt` parity
    /// instead of `clean` for the next transmission on `channel`.
    InjectParity {
        channel: ChannelId,
        clean: ParityMode,
        corrupt: ParityMode,
        probability: f64,
    },

    /// Drain `channel` in the background, checking what arrives against what
    /// `source` sends from here on.
    AttachMonitor { channel: ChannelId, source: ChannelId },

    /// Wait for the monitor to see every byte and report any mismatch.
    FinishMonitor,
}

/// A named, ordered list of steps.
#[derive(Clone, Debug)]
pub struct TestScenario {
    name: String,
    steps: Vec<Step>,
    expects_overrun: bool,
}

impl TestScenario {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), steps: Vec::new(), expects_overrun: false }
    }

    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub fn steps(mut self, steps: impl IntoIterator<Item = Step>) -> Self {
        self.steps.extend(steps);
        self
    }

    /// Treat an observed RX overrun as the expected outcome rather than a
    /// failure.
    pub fn expect_overrun(self) -> Self {
        Self { expects_overrun: true, ..self }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn step_list(&self) -> &[Step] {
        &self.steps
    }
    pub fn expects_overrun(&self) -> bool {
        self.expects_overrun
    }

    /// Single byte through UART0 in internal loopback.
    pub fn loopback(parity: ParityMode) -> Self {
        use ChannelId::Uart0;

        let name = format!("loopback-{}", <&str>::from(parity));
        let tx_idle = LSR_THRE | LSR_TEMT;
        Self::new(name).steps([
            Step::Configure {
                channel: Uart0,
                setup: ChannelSetup::new(parity, MCR_LOOP | MCR_AFE),
            },
            Step::Verify {
                channel: Uart0,
                offset: REG_LSR,
                expected: tx_idle,
                mask: 0xff,
            },
            Step::TransmitRandom { channel: Uart0 },
            Step::PollUntil { channel: Uart0, status: LineStatus::THR_EMPTY },
            Step::PollUntil { channel: Uart0, status: LineStatus::TX_EMPTY },
            Step::PollUntil { channel: Uart0, status: LineStatus::DATA_READY },
            Step::Verify {
                channel: Uart0,
                offset: REG_LSR,
                expected: tx_idle | LSR_DR,
                mask: 0xff,
            },
            Step::Verify {
                channel: Uart0,
                offset: REG_LSR,
                expected: tx_idle,
                mask: tx_idle,
            },
            Step::VerifyReadback { channel: Uart0, source: Uart0 },
        ])
    }

    /// Burst from UART0 into a 4-deep UART1 FIFO whose forced RTS defeats
    /// UART0's auto flow control.
    pub fn overrun(burst: usize) -> Self {
        use ChannelId::{Uart0, Uart1};

        let mut scenario = Self::new("overrun")
            .expect_overrun()
            .steps([
                Step::Configure {
                    channel: Uart1,
                    setup: ChannelSetup::new(ParityMode::Odd, MCR_RTS)
                        .fcr(FCR_ENA | FCR_TRGR_4)
                        .ier(IER_EDSSI),
                },
                Step::Configure {
                    channel: Uart0,
                    setup: ChannelSetup::new(ParityMode::Odd, MCR_AFE),
                },
                Step::Verify {
                    channel: Uart0,
                    offset: REG_LSR,
                    expected: LSR_THRE | LSR_TEMT,
                    mask: 0xff,
                },
            ])
            .steps((0..burst).map(|_| Step::TransmitRandom { channel: Uart0 }))
            .step(Step::PollUntil {
                channel: Uart1,
                status: LineStatus::OVERRUN,
            });

        if burst > OVERRUN_RX_DEPTH + 1 {
            // The overrun must be visible while the tail of the burst is
            // still on its way.
            scenario = scenario.step(Step::Verify {
                channel: Uart0,
                offset: REG_LSR,
                expected: 0,
                mask: LSR_TEMT,
            });
        }

        scenario
            .step(Step::PollUntil {
                channel: Uart0,
                status: LineStatus::TX_EMPTY,
            })
            .steps((0..OVERRUN_RX_DEPTH).map(|_| Step::VerifyReadback {
                channel: Uart1,
                source: Uart0,
            }))
            .step(Step::Verify {
                channel: Uart1,
                offset: REG_LSR,
                expected: 0,
                mask: LSR_DR,
            })
    }

    /// Randomly mismatch UART0's parity against UART1 and check that the
    /// receiver flags exactly the corrupted bytes.
    pub fn parity_injection(iterations: u32, probability: f64) -> Self {
        use ChannelId::{Uart0, Uart1};

        let tx_idle = LSR_THRE | LSR_TEMT;
        let iteration = [
            Step::Verify {
                channel: Uart0,
                offset: REG_LSR,
                expected: tx_idle,
                mask: 0xff,
            },
            Step::InjectParity {
                channel: Uart0,
                clean: ParityMode::Odd,
                corrupt: ParityMode::Even,
                probability,
            },
            Step::TransmitRandom { channel: Uart0 },
            Step::PollUntil { channel: Uart0, status: LineStatus::THR_EMPTY },
            Step::PollUntil { channel: Uart0, status: LineStatus::TX_EMPTY },
            Step::Verify {
                channel: Uart0,
                offset: REG_LSR,
                expected: tx_idle,
                mask: 0xff,
            },
        ];

        Self::new("parity-injection")
            .steps([
                Step::Configure {
                    channel: Uart1,
                    setup: ChannelSetup::new(ParityMode::Odd, MCR_AFE)
                        .fcr(FCR_ENA | FCR_TRGR_4)
                        .ier(IER_EDSSI),
                },
                Step::Configure {
                    channel: Uart0,
                    setup: ChannelSetup::new(ParityMode::Odd, MCR_AFE),
                },
                Step::AttachMonitor { channel: Uart1, source: Uart0 },
            ])
            .steps((0..iterations).flat_map(|_| iteration.clone()))
            .step(Step::FinishMonitor)
    }
}

impl From<&duart_config::Scenario> for TestScenario {
    fn from(cfg: &duart_config::Scenario) -> Self {
        match cfg {
            duart_config::Scenario::Loopback { parity } => {
                TestScenario::loopback((*parity).into())
            }
            duart_config::Scenario::Overrun { burst } => {
                TestScenario::overrun(*burst)
            }
            duart_config::Scenario::ParityInjection {
                iterations,
                injection_probability,
            } => TestScenario::parity_injection(
                *iterations,
                *injection_probability,
            ),
        }
    }
}
