// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use slog::{debug, info};

use super::poll::{poll_bounded, Polled};
use super::scenario::{ChannelSetup, Step, TestScenario};
use super::ScenarioError;
use crate::hw::uart::bits::*;
use crate::hw::uart::{
    ChannelId, Direction, DualUart, LineStatus, ParityMode, Register,
};

/// One register access made by the driver.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct Transaction {
    pub tick: u64,
    pub channel: ChannelId,
    pub register: Register,
    pub direction: Direction,
    pub value: u8,
}

/// Counters gathered while a scenario runs.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct ScenarioStats {
    pub ticks: u64,
    pub bytes_sent: usize,
    pub parity_injected: usize,
    pub parity_errors: usize,
}

#[derive(Clone, Copy, Debug)]
struct Expected {
    data: u8,
    injected: bool,
}

/// Background receiver: drains a channel after every tick and checks each
/// byte, and its parity verdict, against what was sent.
struct Monitor {
    channel: ChannelId,
    source: ChannelId,
    expected: VecDeque<Expected>,
    received: usize,
    parity_errors: usize,
    mismatch: Option<ScenarioError>,
}

impl Monitor {
    fn check(&mut self, data: u8, parity_ok: bool) {
        let index = self.received;
        self.received += 1;
        if !parity_ok {
            self.parity_errors += 1;
        }
        if self.mismatch.is_some() {
            return;
        }
        let Some(exp) = self.expected.pop_front() else {
            self.mismatch = Some(ScenarioError::UnexpectedData {
                channel: self.channel,
                data,
            });
            return;
        };
        if exp.data != data {
            self.mismatch = Some(ScenarioError::AssertionMismatch {
                channel: self.channel,
                register: Register::Rhr,
                expected: exp.data,
                actual: data,
                mask: 0xff,
            });
        } else if exp.injected == parity_ok {
            self.mismatch = Some(ScenarioError::ParityOutcomeMismatch {
                index,
                data,
                injected: exp.injected,
                parity_ok,
            });
        }
    }
}

/// Executes scenario steps against a pair of cross-wired UART channels.
pub struct Driver {
    log: slog::Logger,
    link: DualUart,
    rng: StdRng,
    poll_limit: u32,

    overrun_expected: bool,
    sent: [VecDeque<u8>; 2],
    pending_injection: Option<bool>,
    monitor: Option<Monitor>,
    stats: ScenarioStats,
    transactions: Vec<Transaction>,
}

fn slot(channel: ChannelId) -> usize {
    match channel {
        ChannelId::Uart0 => 0,
        ChannelId::Uart1 => 1,
    }
}

impl Driver {
    pub fn new(
        log: &slog::Logger,
        uart: &duart_config::Uart,
        seed: u64,
        poll_limit: u32,
    ) -> Self {
        Self {
            log: log.new(slog::o!("component" => "driver")),
            link: DualUart::new(log, uart),
            rng: StdRng::seed_from_u64(seed),
            poll_limit,
            overrun_expected: false,
            sent: [VecDeque::new(), VecDeque::new()],
            pending_injection: None,
            monitor: None,
            stats: ScenarioStats::default(),
            transactions: Vec::new(),
        }
    }

    pub fn link(&self) -> &DualUart {
        &self.link
    }
    pub fn link_mut(&mut self) -> &mut DualUart {
        &mut self.link
    }

    /// Every register access made so far, across all scenarios.
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Reset both channels and all per-scenario bookkeeping, then run each
    /// step of `scenario` until one fails.
    pub fn run_scenario(
        &mut self,
        scenario: &TestScenario,
    ) -> Result<ScenarioStats, ScenarioError> {
        self.link.reset();
        self.overrun_expected = scenario.expects_overrun();
        self.sent.iter_mut().for_each(VecDeque::clear);
        self.pending_injection = None;
        self.monitor = None;
        self.stats = ScenarioStats::default();

        let start = self.link.ticks();
        for step in scenario.step_list() {
            self.execute(step)?;
        }
        self.stats.ticks = self.link.ticks() - start;
        Ok(self.stats)
    }

    pub fn execute(&mut self, step: &Step) -> Result<(), ScenarioError> {
        match *step {
            Step::Configure { channel, setup } => {
                self.configure(channel, &setup)
            }
            Step::WriteReg { channel, offset, value } => {
                self.write(channel, offset, value)
            }
            Step::Verify { channel, offset, expected, mask } => {
                self.verify(channel, offset, expected, mask).map(|_| ())
            }
            Step::Transmit { channel, data } => self.transmit(channel, data),
            Step::TransmitRandom { channel } => {
                let data = self.rng.gen::<u8>();
                self.transmit(channel, data)
            }
            Step::PollUntil { channel, status } => {
                self.poll_until(channel, status).map(|_| ())
            }
            Step::VerifyReadback { channel, source } => {
                self.verify_readback(channel, source)
            }
            Step::InjectParity { channel, clean, corrupt, probability } => {
                self.inject_parity(channel, clean, corrupt, probability)
            }
            Step::AttachMonitor { channel, source } => {
                self.monitor = Some(Monitor {
                    channel,
                    source,
                    expected: VecDeque::new(),
                    received: 0,
                    parity_errors: 0,
                    mismatch: None,
                });
                Ok(())
            }
            Step::FinishMonitor => self.finish_monitor(),
        }
    }

    fn record(
        &mut self,
        channel: ChannelId,
        register: Register,
        direction: Direction,
        value: u8,
    ) {
        let tick = self.link.ticks();
        debug!(self.log, "register access";
            "tick" => tick,
            "uart" => %channel,
            "reg" => register.name(),
            "dir" => ?direction,
            "value" => format!("{value:#04x}"));
        self.transactions.push(Transaction {
            tick,
            channel,
            register,
            direction,
            value,
        });
    }

    pub fn read(
        &mut self,
        channel: ChannelId,
        offset: u8,
    ) -> Result<u8, ScenarioError> {
        let register =
            self.link.channel(channel).select(offset, Direction::Read)?;
        let value = self.link.reg_read(channel, offset)?;
        self.record(channel, register, Direction::Read, value);

        if register == Register::Lsr
            && value & LSR_OE != 0
            && !self.overrun_expected
        {
            return Err(ScenarioError::FifoOverrunDetected { channel });
        }
        Ok(value)
    }

    pub fn write(
        &mut self,
        channel: ChannelId,
        offset: u8,
        value: u8,
    ) -> Result<(), ScenarioError> {
        let register =
            self.link.channel(channel).select(offset, Direction::Write)?;
        self.link.reg_write(channel, offset, value)?;
        self.record(channel, register, Direction::Write, value);
        Ok(())
    }

    /// Masked compare of a register against an expected value.
    pub fn verify(
        &mut self,
        channel: ChannelId,
        offset: u8,
        expected: u8,
        mask: u8,
    ) -> Result<u8, ScenarioError> {
        let register =
            self.link.channel(channel).select(offset, Direction::Read)?;
        let actual = self.read(channel, offset)?;
        if (actual ^ expected) & mask != 0 {
            return Err(ScenarioError::AssertionMismatch {
                channel,
                register,
                expected,
                actual,
                mask,
            });
        }
        Ok(actual)
    }

    /// Set or clear DLAB, preserving the rest of LCR.
    pub fn set_dlab(
        &mut self,
        channel: ChannelId,
        dlab: bool,
    ) -> Result<(), ScenarioError> {
        let lcr = self.read(channel, REG_LCR)?;
        let lcr = if dlab { lcr | LCR_DLAB } else { lcr & !LCR_DLAB };
        self.write(channel, REG_LCR, lcr)
    }

    fn configure(
        &mut self,
        channel: ChannelId,
        setup: &ChannelSetup,
    ) -> Result<(), ScenarioError> {
        let [low, high] = setup.divisor.to_le_bytes();
        self.set_dlab(channel, true)?;
        self.write(channel, REG_DLL, low)?;
        self.write(channel, REG_DLM, high)?;
        self.write(channel, REG_MCR, setup.mcr)?;
        if let Some(fcr) = setup.fcr {
            self.write(channel, REG_FCR, fcr)?;
        }
        // Also drops DLAB.
        self.write(channel, REG_LCR, setup.parity.lcr_bits())?;
        if let Some(ier) = setup.ier {
            self.write(channel, REG_IER, ier)?;
        }
        Ok(())
    }

    pub fn transmit(
        &mut self,
        channel: ChannelId,
        data: u8,
    ) -> Result<(), ScenarioError> {
        debug!(self.log, "transmit"; "uart" => %channel, "data" => data);
        self.write(channel, REG_THR, data)?;
        self.sent[slot(channel)].push_back(data);
        self.stats.bytes_sent += 1;

        let injected = self.pending_injection.take().unwrap_or(false);
        if let Some(monitor) =
            self.monitor.as_mut().filter(|m| m.source == channel)
        {
            monitor.expected.push_back(Expected { data, injected });
        }
        Ok(())
    }

    /// Advance the link one tick, then let the monitor drain its channel.
    pub fn tick(&mut self) {
        self.link.tick();
        if let Some(monitor) = self.monitor.as_mut() {
            let chan = self.link.channel_mut(monitor.channel);
            while let Some(rx) = chan.take_received() {
                monitor.check(rx.data, rx.parity_ok);
            }
        }
    }

    /// Read LSR until all of `status` is set, ticking between reads.
    pub fn poll_until(
        &mut self,
        channel: ChannelId,
        status: LineStatus,
    ) -> Result<u8, ScenarioError> {
        let bits = status.bits();
        let limit = self.poll_limit;
        let res = poll_bounded::<_, _, ScenarioError>(
            self,
            limit,
            |drv| {
                let lsr = drv.read(channel, REG_LSR)?;
                Ok((lsr & bits == bits).then_some(lsr))
            },
            Driver::tick,
        )?;
        match res {
            Polled::Ready(lsr) => Ok(lsr),
            Polled::TimedOut { iterations } => {
                Err(ScenarioError::PollTimeout {
                    channel,
                    register: Register::Lsr,
                    bit: bits.trailing_zeros() as u8,
                    iterations,
                })
            }
        }
    }

    fn verify_readback(
        &mut self,
        channel: ChannelId,
        source: ChannelId,
    ) -> Result<(), ScenarioError> {
        let expected = self.sent[slot(source)]
            .pop_front()
            .ok_or(ScenarioError::NothingSent { channel: source })?;
        self.verify(channel, REG_RHR, expected, 0xff).map(|_| ())
    }

    fn inject_parity(
        &mut self,
        channel: ChannelId,
        clean: ParityMode,
        corrupt: ParityMode,
        probability: f64,
    ) -> Result<(), ScenarioError> {
        if !(0.0..=1.0).contains(&probability) {
            return Err(ScenarioError::InvalidProbability { probability });
        }
        let inject = self.rng.gen_bool(probability);
        let mode = if inject {
            debug!(self.log, "injecting parity error"; "uart" => %channel);
            self.stats.parity_injected += 1;
            corrupt
        } else {
            clean
        };
        self.write(channel, REG_LCR, mode.lcr_bits())?;
        self.pending_injection = Some(inject);
        Ok(())
    }

    fn finish_monitor(&mut self) -> Result<(), ScenarioError> {
        let channel = match self.monitor.as_ref() {
            Some(monitor) => monitor.channel,
            None => {
                return Err(ScenarioError::MonitorNotAttached);
            }
        };

        let limit = self.poll_limit;
        let res = poll_bounded::<_, _, ScenarioError>(
            self,
            limit,
            |drv| {
                let done = drv
                    .monitor
                    .as_ref()
                    .map_or(true, |m| m.expected.is_empty());
                Ok(done.then_some(()))
            },
            Driver::tick,
        )?;

        let Some(monitor) = self.monitor.take() else {
            return Err(ScenarioError::MonitorNotAttached);
        };
        self.stats.parity_errors = monitor.parity_errors;
        info!(self.log, "monitor finished";
            "uart" => %channel,
            "received" => monitor.received,
            "parity_errors" => monitor.parity_errors);

        if let Some(err) = monitor.mismatch {
            return Err(err);
        }
        if let Polled::TimedOut { iterations } = res {
            return Err(ScenarioError::PollTimeout {
                channel,
                register: Register::Rhr,
                bit: LSR_DR.trailing_zeros() as u8,
                iterations,
            });
        }
        Ok(())
    }
}
