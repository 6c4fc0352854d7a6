// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use slog::{error, info, warn};

use super::driver::{Driver, ScenarioStats, Transaction};
use super::scenario::TestScenario;
use super::ScenarioError;

#[derive(Clone, Debug, PartialEq)]
pub enum Verdict {
    Passed(ScenarioStats),
    Failed(ScenarioError),
    /// Not attempted, an earlier scenario failed with stop-on-failure set.
    Skipped,
}

#[derive(Clone, Debug)]
pub struct ScenarioOutcome {
    pub name: String,
    pub verdict: Verdict,
}

#[derive(Clone, Debug)]
pub struct Report {
    /// Seed the stimulus generator ran with. Feeding it back through the
    /// `run.seed` config reproduces the run.
    pub seed: u64,
    pub outcomes: Vec<ScenarioOutcome>,
    pub aborted: bool,
}

impl Report {
    /// True when every scenario ran and passed.
    pub fn passed(&self) -> bool {
        !self.aborted
            && self.outcomes.iter().all(|o| matches!(o.verdict, Verdict::Passed(_)))
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &ScenarioError)> {
        self.outcomes.iter().filter_map(|o| match &o.verdict {
            Verdict::Failed(err) => Some((o.name.as_str(), err)),
            _ => None,
        })
    }
}

/// A sequence of scenarios executed on one driver.
pub struct Run {
    log: slog::Logger,
    seed: u64,
    stop_on_failure: bool,
    scenarios: Vec<TestScenario>,
    driver: Driver,
}

impl Run {
    pub fn new(
        log: &slog::Logger,
        cfg: &duart_config::Config,
    ) -> Result<Self, duart_config::ParseError> {
        let scenarios = cfg.scenarios.iter().map(TestScenario::from).collect();
        Self::with_scenarios(log, cfg, scenarios)
    }

    /// Run `scenarios` instead of those listed in `cfg`.
    pub fn with_scenarios(
        log: &slog::Logger,
        cfg: &duart_config::Config,
        scenarios: Vec<TestScenario>,
    ) -> Result<Self, duart_config::ParseError> {
        cfg.validate()?;

        // Drawn seeds stay within a TOML integer so they can be fed back.
        let seed = cfg.run.seed.unwrap_or_else(|| rand::random::<u64>() >> 1);
        let log = log.new(slog::o!("seed" => seed));
        info!(log, "conformance run";
            "scenarios" => scenarios.len(),
            "stop_on_failure" => cfg.run.stop_on_failure,
            "frame_ticks" => cfg.uart.frame_ticks.get());

        let driver = Driver::new(&log, &cfg.uart, seed, cfg.run.poll_limit);
        Ok(Self {
            log,
            seed,
            stop_on_failure: cfg.run.stop_on_failure,
            scenarios,
            driver,
        })
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Register accesses made by every scenario executed so far.
    pub fn transactions(&self) -> &[Transaction] {
        self.driver.transactions()
    }

    pub fn execute(&mut self) -> Report {
        let mut outcomes = Vec::with_capacity(self.scenarios.len());
        let mut aborted = false;

        for scenario in &self.scenarios {
            let name = scenario.name().to_string();
            if aborted {
                outcomes.push(ScenarioOutcome { name, verdict: Verdict::Skipped });
                continue;
            }

            let verdict = match self.driver.run_scenario(scenario) {
                Ok(stats) => {
                    info!(self.log, "scenario passed";
                        "scenario" => &name,
                        "ticks" => stats.ticks,
                        "bytes_sent" => stats.bytes_sent,
                        "parity_injected" => stats.parity_injected,
                        "parity_errors" => stats.parity_errors);
                    Verdict::Passed(stats)
                }
                Err(err) => {
                    error!(self.log, "scenario failed";
                        "scenario" => &name,
                        "error" => %err);
                    if self.stop_on_failure {
                        aborted = true;
                    }
                    Verdict::Failed(err)
                }
            };
            outcomes.push(ScenarioOutcome { name, verdict });
        }

        if aborted {
            warn!(self.log, "run aborted after first failure";
                "skipped" => outcomes
                    .iter()
                    .filter(|o| o.verdict == Verdict::Skipped)
                    .count());
        }
        Report { seed: self.seed, outcomes, aborted }
    }
}
