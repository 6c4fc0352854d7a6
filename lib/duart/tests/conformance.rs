// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::num::NonZeroU32;

use duart::conformance::{Run, ScenarioError, TestScenario, Verdict};
use duart::hw::uart::{ChannelId, Register};
use slog::{o, Drain};

fn build_log() -> (slog::Logger, slog_async::AsyncGuard) {
    let decorator = slog_term::PlainDecorator::new(slog_term::TestStdoutWriter);
    let drain = slog_term::CompactFormat::new(decorator).build().fuse();
    let (drain, guard) = slog_async::Async::new(drain).build_with_guard();
    (slog::Logger::root(drain.fuse(), o!()), guard)
}

const CONFIG: &str = r#"
[run]
seed = 3735928559
poll_limit = 512

[uart]
frame_ticks = 3

[[scenario]]
kind = "loopback"
parity = "even"

[[scenario]]
kind = "overrun"
burst = 12

[[scenario]]
kind = "parity-injection"
iterations = 64
injection_probability = 0.25
"#;

#[test]
fn default_suite() {
    let (log, _guard) = build_log();
    for seed in [1, 0x16550, u64::MAX] {
        let mut cfg = duart_config::Config::default();
        cfg.run.seed = Some(seed);
        let report = Run::new(&log, &cfg).unwrap().execute();
        assert!(
            report.passed(),
            "seed {seed}: {:?}",
            report.failures().collect::<Vec<_>>()
        );
    }
}

#[test]
fn suite_from_toml_with_slow_frames() {
    let (log, _guard) = build_log();
    let cfg = duart_config::parse_str(CONFIG).unwrap();
    assert_eq!(cfg.uart.frame_ticks, NonZeroU32::new(3).unwrap());

    let mut run = Run::new(&log, &cfg).unwrap();
    assert_eq!(run.seed(), 0xdeadbeef);
    let report = run.execute();
    let names: Vec<_> = report.outcomes.iter().map(|o| o.name.as_str()).collect();
    assert_eq!(names, ["loopback-even", "overrun", "parity-injection"]);
    assert!(report.passed(), "{:?}", report.failures().collect::<Vec<_>>());

    let Verdict::Passed(stats) = report.outcomes[2].verdict else {
        panic!("parity-injection did not pass");
    };
    assert_eq!(stats.bytes_sent, 64);
    assert_eq!(stats.parity_errors, stats.parity_injected);
}

#[test]
fn parity_always_injected() {
    let (log, _guard) = build_log();
    let mut cfg = duart_config::Config::default();
    cfg.run.seed = Some(9);
    let scenarios = vec![TestScenario::parity_injection(16, 1.0)];
    let report = Run::with_scenarios(&log, &cfg, scenarios).unwrap().execute();

    let Verdict::Passed(stats) = report.outcomes[0].verdict else {
        panic!("{:?}", report.outcomes[0].verdict);
    };
    assert_eq!(stats.parity_injected, 16);
    assert_eq!(stats.parity_errors, 16);
}

#[test]
fn starved_poll_times_out() {
    let (log, _guard) = build_log();
    let mut cfg = duart_config::Config::default();
    cfg.run.seed = Some(5);
    cfg.run.poll_limit = 1;
    let report = Run::new(&log, &cfg).unwrap().execute();

    assert!(report.aborted);
    assert_eq!(
        report.outcomes[0].verdict,
        Verdict::Failed(ScenarioError::PollTimeout {
            channel: ChannelId::Uart0,
            register: Register::Lsr,
            bit: 5,
            iterations: 1,
        })
    );
    assert!(report.outcomes[1..]
        .iter()
        .all(|o| o.verdict == Verdict::Skipped));
}

#[test]
fn overrun_without_expectation_fails() {
    let (log, _guard) = build_log();
    let mut cfg = duart_config::Config::default();
    cfg.run.seed = Some(11);

    // Same traffic as the overrun scenario, without declaring the overrun.
    let steps = TestScenario::overrun(9).step_list().to_vec();
    let scenarios = vec![TestScenario::new("undeclared-overrun").steps(steps)];
    let report = Run::with_scenarios(&log, &cfg, scenarios).unwrap().execute();

    assert_eq!(
        report.outcomes[0].verdict,
        Verdict::Failed(ScenarioError::FifoOverrunDetected {
            channel: ChannelId::Uart1,
        })
    );
}

#[test]
fn transaction_log_serializes() {
    let (log, _guard) = build_log();
    let mut cfg = duart_config::Config::default();
    cfg.run.seed = Some(21);
    let scenarios =
        vec![TestScenario::loopback(duart::hw::uart::ParityMode::Odd)];
    let mut run = Run::with_scenarios(&log, &cfg, scenarios).unwrap();
    assert!(run.execute().passed());

    let json = serde_json::to_value(run.transactions()).unwrap();
    let first = &json[0];
    // Configure opens with a DLAB read-modify-write of LCR
    assert_eq!(first["channel"], "uart0");
    assert_eq!(first["register"], "Lcr");
    assert_eq!(first["direction"], "read");
    assert!(json
        .as_array()
        .unwrap()
        .iter()
        .any(|t| t["register"] == "Dll" && t["value"] == 0xf5));
}
