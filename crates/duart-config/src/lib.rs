// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::num::NonZeroU32;
use std::path::Path;

use serde_derive::{Deserialize, Serialize};
use thiserror::Error;

/// Smallest RX FIFO the overrun scenario programs on the receiving channel.
pub const OVERRUN_RX_DEPTH: usize = 4;

/// Largest TX FIFO the model accepts.
pub const MAX_TX_FIFO_DEPTH: usize = 256;

/// Configuration for a conformance run against the dual UART model.
#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub run: Run,

    #[serde(default)]
    pub uart: Uart,

    #[serde(default = "default_scenarios", rename = "scenario")]
    pub scenarios: Vec<Scenario>,
}
impl Default for Config {
    fn default() -> Self {
        Self {
            run: Run::default(),
            uart: Uart::default(),
            scenarios: default_scenarios(),
        }
    }
}

impl Config {
    /// Reject settings which would make a run meaningless or unbounded.
    pub fn validate(&self) -> Result<(), ParseError> {
        if self.run.poll_limit == 0 {
            return Err(ParseError::Invalid(
                "run.poll_limit must be non-zero".to_string(),
            ));
        }
        if self.uart.tx_fifo_depth == 0
            || self.uart.tx_fifo_depth > MAX_TX_FIFO_DEPTH
        {
            return Err(ParseError::Invalid(format!(
                "uart.tx_fifo_depth must be between 1 and {MAX_TX_FIFO_DEPTH}"
            )));
        }
        for scenario in self.scenarios.iter() {
            match scenario {
                Scenario::Loopback { .. } => {}
                Scenario::Overrun { burst } => {
                    if *burst <= OVERRUN_RX_DEPTH {
                        return Err(ParseError::Invalid(format!(
                            "overrun burst of {burst} cannot overflow a \
                            {OVERRUN_RX_DEPTH}-byte RX FIFO"
                        )));
                    }
                    if *burst > self.uart.tx_fifo_depth {
                        return Err(ParseError::Invalid(format!(
                            "overrun burst of {burst} exceeds TX FIFO depth {}",
                            self.uart.tx_fifo_depth
                        )));
                    }
                }
                Scenario::ParityInjection {
                    injection_probability, ..
                } => {
                    if !(0.0..=1.0).contains(injection_probability) {
                        return Err(ParseError::Invalid(format!(
                            "injection probability {injection_probability} \
                            is outside [0, 1]"
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Run-wide policy.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Run {
    /// Seed for data and fault injection. A fresh seed is drawn when absent.
    pub seed: Option<u64>,

    #[serde(default = "default_stop_on_failure")]
    pub stop_on_failure: bool,

    /// Upper bound on register reads spent waiting for any one status bit.
    #[serde(default = "default_poll_limit")]
    pub poll_limit: u32,
}
impl Default for Run {
    fn default() -> Self {
        Self {
            seed: None,
            stop_on_failure: default_stop_on_failure(),
            poll_limit: default_poll_limit(),
        }
    }
}

/// Knobs of the UART model itself.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Uart {
    /// Ticks a frame spends in the transmit shifter.
    #[serde(default = "default_frame_ticks")]
    pub frame_ticks: NonZeroU32,

    #[serde(default = "default_tx_fifo_depth")]
    pub tx_fifo_depth: usize,
}
impl Default for Uart {
    fn default() -> Self {
        Self {
            frame_ticks: default_frame_ticks(),
            tx_fifo_depth: default_tx_fifo_depth(),
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    None,
    Odd,
    Even,
}

/// One named conformance scenario.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Scenario {
    Loopback {
        parity: Parity,
    },
    Overrun {
        #[serde(default = "default_overrun_burst")]
        burst: usize,
    },
    ParityInjection {
        #[serde(default = "default_iterations")]
        iterations: u32,
        #[serde(default = "default_injection_probability")]
        injection_probability: f64,
    },
}

fn default_stop_on_failure() -> bool {
    true
}
fn default_poll_limit() -> u32 {
    1024
}
fn default_frame_ticks() -> NonZeroU32 {
    NonZeroU32::MIN
}
fn default_tx_fifo_depth() -> usize {
    64
}
fn default_overrun_burst() -> usize {
    9
}
fn default_iterations() -> u32 {
    128
}
fn default_injection_probability() -> f64 {
    0.5
}
fn default_scenarios() -> Vec<Scenario> {
    vec![
        Scenario::Loopback { parity: Parity::None },
        Scenario::Loopback { parity: Parity::Odd },
        Scenario::Loopback { parity: Parity::Even },
        Scenario::Overrun { burst: default_overrun_burst() },
        Scenario::ParityInjection {
            iterations: default_iterations(),
            injection_probability: default_injection_probability(),
        },
    ]
}

/// Errors which may be returned when parsing the run configuration.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Cannot parse toml: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Parses a TOML string into a validated configuration object.
pub fn parse_str(contents: &str) -> Result<Config, ParseError> {
    let cfg = toml::from_str::<Config>(contents)?;
    cfg.validate()?;
    Ok(cfg)
}

/// Parses a TOML file into a validated configuration object.
pub fn parse<P: AsRef<Path>>(path: P) -> Result<Config, ParseError> {
    let contents = std::fs::read_to_string(path.as_ref())?;
    parse_str(&contents)
}
