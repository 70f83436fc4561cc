//! Integration tests for the AppService → FSM → port pipeline.
//!
//! A fresh run, the one-shot commands, manual advance and the failure
//! paths, all against the recording adapters in `mock_hw`.

use std::sync::Arc;

use super::mock_hw::{EventLog, MemCheckpoint, MockClock, MockValves};

use valvectl::app::commands::{AppCommand, ManualCommand};
use valvectl::app::events::AppEvent;
use valvectl::app::service::{AppService, Settings};
use valvectl::checkpoint::Checkpoint;
use valvectl::config::RigConfig;
use valvectl::error::{ActuatorError, ConfigError, Error};
use valvectl::fsm::StateId;
use valvectl::registry::StateRegistry;
use valvectl::sequence::{LogicalState, Port};

const RIG: &str = r#"
sequence_loop: false
settle_ms: 0
devices:
  gpio:
    mapping: {0: 17, 1: 18, 2: 19}
    init: {0: 0}
  gpio_spare:
    kind: gpio
    enabled: false
    mapping: {0: 20}
    init: {0: 1}
sequence:
  - "1,gpio,0,1"
  - "2,gpio,1,1"
  - "3,gpio,2,0"
"#;

fn app_with(yaml: &str, command: AppCommand) -> AppService {
    let cfg = RigConfig::from_yaml(yaml).unwrap();
    let rig = cfg.validate().unwrap();
    AppService::new(
        rig,
        Arc::new(StateRegistry::in_memory()),
        command,
        Settings::from_config(&cfg),
    )
}

fn app(command: AppCommand) -> AppService {
    app_with(RIG, command)
}

// ── Fresh run ─────────────────────────────────────────────────

#[test]
fn fresh_run_sets_up_then_runs_every_step_once() {
    let mut app = app(AppCommand::RunSequence);
    let (mut hw, mut store, mut clock, mut sink) =
        (MockValves::new(), MemCheckpoint::new(), MockClock::new(), EventLog::new());

    app.run(&mut hw, &mut store, &mut clock, &mut sink).unwrap();

    assert_eq!(hw.applied, vec!["gpio#0=0", "gpio#0=1", "gpio#1=1", "gpio#2=0"]);
    assert_eq!(clock.slept, vec![60.0, 60.0, 60.0]);
    assert_eq!(
        store.saved,
        vec![
            Checkpoint::new(0, 60.0),
            Checkpoint::new(1, 120.0),
            Checkpoint::new(2, 180.0),
        ]
    );
    assert_eq!(app.state(), StateId::Halted);
    assert_eq!(app.passes(), 1);
    assert!(sink.contains(&AppEvent::PassComplete { passes: 1 }));
    assert_eq!(sink.events.last(), Some(&AppEvent::Halted));
}

#[test]
fn disabled_device_is_skipped_at_setup() {
    let mut app = app(AppCommand::RunSequence);
    let (mut hw, mut store, mut clock, mut sink) =
        (MockValves::new(), MemCheckpoint::new(), MockClock::new(), EventLog::new());

    app.run(&mut hw, &mut store, &mut clock, &mut sink).unwrap();

    assert!(sink.contains(&AppEvent::DeviceSkipped("gpio_spare".into())));
    assert!(hw.applied.iter().all(|a| !a.starts_with("gpio_spare")));
}

#[test]
fn steps_for_disabled_devices_still_advance_the_checkpoint() {
    let yaml = RIG.replace("  - \"2,gpio,1,1\"", "  - \"2,gpio_spare,0,1\"");
    let mut app = app_with(&yaml, AppCommand::RunSequence);
    let (mut hw, mut store, mut clock, mut sink) =
        (MockValves::new(), MemCheckpoint::new(), MockClock::new(), EventLog::new());

    app.run(&mut hw, &mut store, &mut clock, &mut sink).unwrap();

    assert_eq!(hw.applied, vec!["gpio#0=0", "gpio#0=1", "gpio#2=0"]);
    assert_eq!(store.saved.len(), 3);
    assert!(sink.contains(&AppEvent::StepSkipped {
        index: 1,
        device: "gpio_spare".into(),
    }));
}

#[test]
fn registry_follows_applied_states() {
    let mut app = app(AppCommand::RunSequence);
    let (mut hw, mut store, mut clock, mut sink) =
        (MockValves::new(), MemCheckpoint::new(), MockClock::new(), EventLog::new());

    app.run(&mut hw, &mut store, &mut clock, &mut sink).unwrap();

    let reg = app.registry();
    assert_eq!(reg.get("gpio", Port::index(0)), Some(LogicalState::Binary(true)));
    assert_eq!(reg.get("gpio", Port::index(2)), Some(LogicalState::Binary(false)));
    assert_eq!(reg.snapshot().len(), 3);
}

#[test]
fn progress_events_number_steps_from_one() {
    let mut app = app(AppCommand::RunSequence);
    let (mut hw, mut store, mut clock, mut sink) =
        (MockValves::new(), MemCheckpoint::new(), MockClock::new(), EventLog::new());

    app.run(&mut hw, &mut store, &mut clock, &mut sink).unwrap();

    assert!(sink.contains(&AppEvent::StepScheduled {
        number: 2,
        count: 3,
        key: "gpio#1".into(),
        state: "1".into(),
        wait_secs: 60.0,
    }));
}

#[test]
fn proportional_valve_keeps_a_single_registry_key() {
    let yaml = r#"
sequence_loop: false
settle_ms: 0
devices:
  gpio:
    mapping: {0: 17}
    init: {0: 1}
  mpv1:
    port: /dev/ttyUSB1
    baud: 9600
    init: {0: 1}
sequence:
  - "1,mpv1,-,50"
  - "2,mpv1,4,60"
"#;
    let mut app = app_with(yaml, AppCommand::RunSequence);
    let (mut hw, mut store, mut clock, mut sink) =
        (MockValves::new(), MemCheckpoint::new(), MockClock::new(), EventLog::new());
    app.run(&mut hw, &mut store, &mut clock, &mut sink).unwrap();

    assert_eq!(hw.applied, vec!["gpio#0=1", "mpv1#-=1", "mpv1#-=50", "mpv1#-=60"]);
    let keys: Vec<String> = app.registry().snapshot().into_keys().collect();
    assert_eq!(keys, vec!["gpio#0", "mpv1#-"]);

    // A manual command addressed to any port lands on the same key.
    let cmd = ManualCommand::parse("mpv1,3,70").unwrap();
    let cfg = RigConfig::from_yaml(yaml).unwrap();
    let mut manual = AppService::new(
        cfg.validate().unwrap(),
        Arc::clone(app.registry()),
        AppCommand::Manual(cmd),
        Settings::from_config(&cfg),
    );
    manual.run(&mut hw, &mut store, &mut clock, &mut sink).unwrap();

    assert_eq!(hw.applied.last().map(String::as_str), Some("mpv1#-=70"));
    let snapshot = app.registry().snapshot();
    assert_eq!(snapshot.len(), 2);
    assert_eq!(
        snapshot.get("mpv1#-"),
        Some(&LogicalState::Setpoint("70".into()))
    );
}

// ── Looping ───────────────────────────────────────────────────

#[test]
fn looping_plan_restarts_from_the_first_step() {
    let yaml = RIG.replace("sequence_loop: false", "sequence_loop: true");
    let mut app = app_with(&yaml, AppCommand::RunSequence);
    // Call 0 is setup; calls 1..=3 are pass one; call 5 is step 1 of pass two.
    let mut hw = MockValves::failing_at(5);
    let (mut store, mut clock, mut sink) = (MemCheckpoint::new(), MockClock::new(), EventLog::new());

    let err = app.run(&mut hw, &mut store, &mut clock, &mut sink).unwrap_err();

    assert!(matches!(err, Error::Actuator(ActuatorError::NotConnected(_))));
    assert_eq!(app.passes(), 1);
    assert_eq!(hw.applied[1..], ["gpio#0=1", "gpio#1=1", "gpio#2=0", "gpio#0=1"]);
    assert_eq!(store.saved.last(), Some(&Checkpoint::new(0, 60.0)));
}

// ── One-shot commands ─────────────────────────────────────────

#[test]
fn init_only_applies_initial_states_and_stops() {
    let mut app = app(AppCommand::InitOnly);
    let (mut hw, mut store, mut clock, mut sink) =
        (MockValves::new(), MemCheckpoint::new(), MockClock::new(), EventLog::new());

    app.run(&mut hw, &mut store, &mut clock, &mut sink).unwrap();

    assert_eq!(hw.applied, vec!["gpio#0=0"]);
    assert!(store.saved.is_empty());
    assert_eq!(app.state(), StateId::Halted);
}

#[test]
fn init_only_leaves_a_checkpointed_run_alone() {
    let mut app = app(AppCommand::InitOnly);
    let (mut hw, mut store, mut clock, mut sink) =
        (MockValves::new(), MemCheckpoint::at(1, 60.0), MockClock::new(), EventLog::new());

    app.run(&mut hw, &mut store, &mut clock, &mut sink).unwrap();

    assert!(hw.applied.is_empty());
    assert!(app.registry().snapshot().is_empty());
    assert_eq!(store.current, Some(Checkpoint::new(1, 60.0)));
    assert!(store.saved.is_empty());
    assert_eq!(app.state(), StateId::Halted);
}

#[test]
fn manual_step_never_touches_the_checkpoint() {
    let cmd = ManualCommand::parse("gpio,1,B").unwrap();
    let mut app = app(AppCommand::Manual(cmd));
    let (mut hw, mut store, mut clock, mut sink) =
        (MockValves::new(), MemCheckpoint::at(2, 120.0), MockClock::new(), EventLog::new());

    app.run(&mut hw, &mut store, &mut clock, &mut sink).unwrap();

    assert_eq!(hw.applied, vec!["gpio#1=1"]);
    assert!(store.saved.is_empty());
    assert_eq!(store.current, Some(Checkpoint::new(2, 120.0)));
    assert!(clock.slept.is_empty());
}

#[test]
fn manual_step_to_unknown_port_fails_before_io() {
    let cmd = ManualCommand::parse("gpio,7,1").unwrap();
    let mut app = app(AppCommand::Manual(cmd));
    let (mut hw, mut store, mut clock, mut sink) =
        (MockValves::new(), MemCheckpoint::new(), MockClock::new(), EventLog::new());

    let err = app.run(&mut hw, &mut store, &mut clock, &mut sink).unwrap_err();

    assert!(matches!(err, Error::Config(ConfigError::UnmappedPort { .. })));
    assert!(hw.applied.is_empty());
}

#[test]
fn prepare_rejects_a_drifted_checkpoint_before_any_hardware() {
    let mut app = app(AppCommand::RunSequence);
    let (mut hw, mut store, mut clock, mut sink) =
        (MockValves::new(), MemCheckpoint::at(7, 0.0), MockClock::new(), EventLog::new());

    let err = app.prepare(&store, &mut sink).unwrap_err();
    assert!(matches!(
        err,
        Error::Config(ConfigError::CheckpointBeyondPlan { step_index: 7, .. })
    ));
    assert!(sink.events.iter().all(|e| !matches!(e, AppEvent::Resumed(_))));

    // Once prepared, `run` does not load the checkpoint a second time.
    store.current = Some(Checkpoint::new(2, 120.0));
    app.prepare(&store, &mut sink).unwrap();
    store.current = Some(Checkpoint::new(9, 0.0));
    app.run(&mut hw, &mut store, &mut clock, &mut sink).unwrap();
    assert_eq!(hw.applied, vec!["gpio#2=0"]);
}

#[test]
fn manual_step_to_disabled_device_is_not_connected() {
    let cmd = ManualCommand::parse("gpio_spare,0,1").unwrap();
    let mut app = app(AppCommand::Manual(cmd));
    let (mut hw, mut store, mut clock, mut sink) =
        (MockValves::new(), MemCheckpoint::new(), MockClock::new(), EventLog::new());

    let err = app.run(&mut hw, &mut store, &mut clock, &mut sink).unwrap_err();

    assert!(matches!(err, Error::Actuator(ActuatorError::NotConnected(_))));
    assert!(hw.applied.is_empty());
}

// ── Manual advance ────────────────────────────────────────────

#[test]
fn manual_mode_waits_for_the_operator_instead_of_sleeping() {
    let yaml = RIG.replace("settle_ms: 0", "settle_ms: 0\nmanual_mode: true");
    let mut app = app_with(&yaml, AppCommand::RunSequence);
    let (mut hw, mut store, mut clock, mut sink) =
        (MockValves::new(), MemCheckpoint::new(), MockClock::new(), EventLog::new());

    app.run(&mut hw, &mut store, &mut clock, &mut sink).unwrap();

    assert_eq!(clock.advances, 3);
    assert!(clock.slept.is_empty());
    assert_eq!(hw.applied.len(), 4);
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::AwaitingAdvance { .. })),
        3
    );
    // Elapsed time still follows the plan offsets.
    assert_eq!(store.current, Some(Checkpoint::new(2, 180.0)));
}

// ── Failures ──────────────────────────────────────────────────

#[test]
fn actuator_failure_halts_and_keeps_last_good_checkpoint() {
    let mut app = app(AppCommand::RunSequence);
    // Call 0 is setup, call 1 is step 0, call 2 is step 1.
    let mut hw = MockValves::failing_at(2);
    let (mut store, mut clock, mut sink) = (MemCheckpoint::new(), MockClock::new(), EventLog::new());

    let err = app.run(&mut hw, &mut store, &mut clock, &mut sink).unwrap_err();

    assert!(matches!(err, Error::Actuator(_)));
    assert_eq!(app.state(), StateId::Halted);
    assert_eq!(store.current, Some(Checkpoint::new(0, 60.0)));
    assert_eq!(sink.events.last(), Some(&AppEvent::Halted));
}

#[test]
fn transient_failures_are_retried_within_budget() {
    let yaml = RIG.replace("settle_ms: 0", "settle_ms: 0\nactuator_retries: 2");
    let mut app = app_with(&yaml, AppCommand::InitOnly);
    let mut hw = MockValves {
        flaky: 2,
        ..MockValves::new()
    };
    let (mut store, mut clock, mut sink) = (MemCheckpoint::new(), MockClock::new(), EventLog::new());

    app.run(&mut hw, &mut store, &mut clock, &mut sink).unwrap();
    assert_eq!(hw.applied, vec!["gpio#0=0"]);
}

#[test]
fn retries_exhausted_is_fatal() {
    let yaml = RIG.replace("settle_ms: 0", "settle_ms: 0\nactuator_retries: 1");
    let mut app = app_with(&yaml, AppCommand::InitOnly);
    let mut hw = MockValves {
        flaky: 2,
        ..MockValves::new()
    };
    let (mut store, mut clock, mut sink) = (MemCheckpoint::new(), MockClock::new(), EventLog::new());

    let err = app.run(&mut hw, &mut store, &mut clock, &mut sink).unwrap_err();
    assert!(matches!(err, Error::Actuator(ActuatorError::NoAck { .. })));
}

#[test]
fn checkpoint_write_failures_do_not_stop_the_run() {
    let mut app = app(AppCommand::RunSequence);
    let mut store = MemCheckpoint {
        fail_saves: true,
        ..MemCheckpoint::new()
    };
    let (mut hw, mut clock, mut sink) = (MockValves::new(), MockClock::new(), EventLog::new());

    app.run(&mut hw, &mut store, &mut clock, &mut sink).unwrap();
    assert_eq!(hw.applied.len(), 4);
}

#[test]
fn empty_plan_is_rejected_in_sequence_mode_only() {
    let yaml = "settle_ms: 0\ndevices:\n  gpio:\n    mapping: {0: 17}\n    init: {0: 1}\n";

    let mut app = app_with(yaml, AppCommand::RunSequence);
    let (mut hw, mut store, mut clock, mut sink) =
        (MockValves::new(), MemCheckpoint::new(), MockClock::new(), EventLog::new());
    let err = app.run(&mut hw, &mut store, &mut clock, &mut sink).unwrap_err();
    assert!(matches!(err, Error::Config(ConfigError::EmptyPlan)));
    assert!(hw.applied.is_empty());

    let mut app = app_with(yaml, AppCommand::InitOnly);
    app.run(&mut hw, &mut store, &mut clock, &mut sink).unwrap();
    assert_eq!(hw.applied, vec!["gpio#0=1"]);
}
