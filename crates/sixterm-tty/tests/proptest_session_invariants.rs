//! Property-based invariant tests for sessions (public API only).
//!
//! Runs against `HeadlessSession`, which honors the same contract as the
//! native backends:
//!
//! 1. Any toggle sequence followed by shutdown leaves every feature off
//! 2. Shutdown output always ends with the cleanup sequence of what was on
//! 3. Raw mode enters and exits at most once per cycle, whatever the calls
//! 4. Arbitrary input never makes poll_event fail
//! 5. Size matches the constructor

use std::time::Duration;

use proptest::prelude::*;
use sixterm_backend::{SessionFeatures, TerminalSession, write_cleanup_sequence};
use sixterm_core::{ScriptedInput, TerminalConfig};
use sixterm_tty::HeadlessSession;

// ── Helpers ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
enum Op {
    HideCursor,
    ShowCursor,
    EnterAlt,
    ExitAlt,
    EnableMouse,
    DisableMouse,
    EnterRaw,
    ExitRaw,
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::HideCursor),
        Just(Op::ShowCursor),
        Just(Op::EnterAlt),
        Just(Op::ExitAlt),
        Just(Op::EnableMouse),
        Just(Op::DisableMouse),
        Just(Op::EnterRaw),
        Just(Op::ExitRaw),
    ]
}

fn apply(session: &mut HeadlessSession, op: Op) {
    match op {
        Op::HideCursor => session.hide_cursor().unwrap(),
        Op::ShowCursor => session.show_cursor().unwrap(),
        Op::EnterAlt => session.enter_alt_screen().unwrap(),
        Op::ExitAlt => session.exit_alt_screen().unwrap(),
        Op::EnableMouse => session.enable_mouse().unwrap(),
        Op::DisableMouse => session.disable_mouse().unwrap(),
        Op::EnterRaw => session.enter_raw_mode().unwrap(),
        Op::ExitRaw => session.exit_raw_mode().unwrap(),
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Any toggle sequence followed by shutdown leaves every feature off
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn shutdown_turns_everything_off(ops in proptest::collection::vec(arb_op(), 0..24)) {
        let mut session = HeadlessSession::new(80, 24);
        for op in ops {
            apply(&mut session, op);
        }
        session.shutdown().unwrap();
        prop_assert!(session.features().is_none());
        prop_assert!(!session.is_raw());
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Shutdown output ends with the cleanup sequence of what was on
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn shutdown_emits_cleanup(ops in proptest::collection::vec(arb_op(), 1..24)) {
        let mut session = HeadlessSession::new(80, 24);
        for op in ops {
            apply(&mut session, op);
        }
        let active = session.features();
        let output = session.output();
        let before = output.bytes().len();
        session.shutdown().unwrap();
        let tail = output.bytes()[before..].to_vec();
        if active.cursor_hidden {
            let mut cleanup = Vec::new();
            write_cleanup_sequence(&active, &mut cleanup).unwrap();
            prop_assert_eq!(tail, cleanup);
        } else if active.is_none() {
            prop_assert!(tail.is_empty());
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Raw mode transitions are balanced
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn raw_transitions_balance(ops in proptest::collection::vec(arb_op(), 0..24)) {
        let mut session = HeadlessSession::new(80, 24);
        for op in ops {
            apply(&mut session, op);
        }
        session.shutdown().unwrap();
        session.exit_raw_mode().unwrap();
        let (entries, exits) = session.output().raw_transitions();
        prop_assert_eq!(entries, exits);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Arbitrary input never makes poll_event fail
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn poll_never_fails(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
        let config = TerminalConfig {
            escape_timeout: Duration::from_millis(1),
            ..TerminalConfig::default()
        };
        let mut session = HeadlessSession::with_config(80, 24, &config)
            .with_input(ScriptedInput::from_bytes(&bytes));
        let mut events = 0;
        while let Some(_event) = session.poll_event(Duration::ZERO).unwrap() {
            events += 1;
            prop_assert!(events <= bytes.len());
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. Size matches the constructor
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn size_matches_constructor(cols in 1u16..500, rows in 1u16..200) {
        let session = HeadlessSession::new(cols, rows);
        prop_assert_eq!(session.size().unwrap(), (cols, rows));
        prop_assert_eq!(session.features(), SessionFeatures::NONE);
    }
}
