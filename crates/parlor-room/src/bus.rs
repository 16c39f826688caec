//! The command bus: serialized, validated dispatch into strategies.
//!
//! One bus per room, driven exclusively by the room's actor task — that is
//! what serializes command application. Across rooms, buses run freely in
//! parallel.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::{
    CommandContext, CommandDescriptor, GameDef, GameState, Outcome,
    RoomError, RosterEntry,
};

/// One journaled command: the descriptor plus the state document it
/// replaced, ready to be restored on undo.
#[derive(Debug)]
pub struct UndoEntry {
    pub descriptor: CommandDescriptor,
    prior: serde_json::Value,
}

/// Serialized command dispatch with a bounded undo journal.
pub struct CommandBus {
    command_timeout: Duration,
    journal: VecDeque<UndoEntry>,
    journal_limit: usize,
}

impl CommandBus {
    pub fn new(command_timeout: Duration, journal_limit: usize) -> Self {
        Self {
            command_timeout,
            journal: VecDeque::new(),
            journal_limit,
        }
    }

    /// Dispatches one command against the current state.
    ///
    /// On success the state has been replaced (version +1) and the journal
    /// holds the prior document. Every failure leaves both untouched.
    pub fn submit(
        &mut self,
        game: &dyn GameDef,
        state: &mut GameState,
        roster: &[RosterEntry],
        descriptor: CommandDescriptor,
    ) -> Result<u64, RoomError> {
        if descriptor.kind.is_empty() {
            return Err(RoomError::Validation("empty command type".into()));
        }
        if let Some(player_id) = &descriptor.player_id {
            if !roster.iter().any(|p| &p.id == player_id) {
                return Err(RoomError::NotInRoom(player_id.clone()));
            }
        }

        let strategy = game
            .strategy(&descriptor.kind)
            .ok_or_else(|| RoomError::UnknownCommand(descriptor.kind.clone()))?;

        let ctx = CommandContext {
            state: state.clone(),
            roster: roster.to_vec(),
            player_id: descriptor.player_id.clone(),
            payload: descriptor.payload.clone(),
        };

        // The budget gate sits between execute and apply: an over-budget
        // outcome is discarded before it can touch authoritative state.
        let started = Instant::now();
        let outcome = strategy.execute(ctx);
        let elapsed = started.elapsed();
        if elapsed > self.command_timeout {
            warn!(
                kind = %descriptor.kind,
                elapsed_us = elapsed.as_micros() as u64,
                budget_us = self.command_timeout.as_micros() as u64,
                "command exceeded budget — outcome discarded"
            );
            return Err(RoomError::CommandTimeout {
                budget: self.command_timeout,
            });
        }

        match outcome {
            Outcome::Reject { code, message } => {
                debug!(kind = %descriptor.kind, %code, "command rejected");
                Err(RoomError::Rejected { code, message })
            }
            Outcome::Accept { next } => {
                let prior = state.replace(next);
                if self.journal.len() == self.journal_limit {
                    self.journal.pop_front();
                }
                self.journal.push_back(UndoEntry { descriptor, prior });
                Ok(state.version())
            }
        }
    }

    /// Rolls back the most recent command, iff `player_id` submitted it.
    ///
    /// Restores the journaled document and bumps the version, so a
    /// command-then-undo pair lands at exactly `pre-command version + 2`.
    pub fn undo_last(
        &mut self,
        state: &mut GameState,
        player_id: &parlor_protocol::PlayerId,
    ) -> Result<u64, RoomError> {
        let last = self.journal.back().ok_or(RoomError::UndoForbidden)?;
        if last.descriptor.player_id.as_ref() != Some(player_id) {
            return Err(RoomError::UndoForbidden);
        }
        let entry = self.journal.pop_back().expect("checked above");
        debug!(kind = %entry.descriptor.kind, "command undone");
        state.replace(entry.prior);
        Ok(state.version())
    }

    pub fn journal_len(&self) -> usize {
        self.journal.len()
    }

    /// Drops all journal entries (round teardown).
    pub fn clear_journal(&mut self) {
        self.journal.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parlor_protocol::{ErrorCode, PlayerId};
    use serde_json::{json, Value};

    use crate::{GameError, SetupContext, Strategy};

    struct SetPhase;

    impl Strategy for SetPhase {
        fn execute(&self, ctx: CommandContext) -> Outcome {
            let mut doc = ctx.state.doc().clone();
            doc["phase"] = ctx.payload["phase"].clone();
            Outcome::accept(doc)
        }
    }

    struct AlwaysReject;

    impl Strategy for AlwaysReject {
        fn execute(&self, _ctx: CommandContext) -> Outcome {
            Outcome::reject(ErrorCode::NotYourTurn, "wait your turn")
        }
    }

    struct Sleeper;

    impl Strategy for Sleeper {
        fn execute(&self, ctx: CommandContext) -> Outcome {
            std::thread::sleep(Duration::from_millis(20));
            Outcome::accept(ctx.state.doc().clone())
        }
    }

    struct TestGame;

    impl GameDef for TestGame {
        fn game_id(&self) -> &'static str {
            "test"
        }
        fn min_players(&self) -> usize {
            1
        }
        fn max_players(&self) -> usize {
            4
        }
        fn initial_state(&self, _ctx: &SetupContext) -> Result<Value, GameError> {
            Ok(json!({"phase": "playing", "isComplete": false}))
        }
        fn strategy(&self, kind: &str) -> Option<&dyn Strategy> {
            match kind {
                "setPhase" => Some(&SetPhase),
                "reject" => Some(&AlwaysReject),
                "sleep" => Some(&Sleeper),
                _ => None,
            }
        }
        fn command_kinds(&self) -> &'static [&'static str] {
            &["setPhase", "reject", "sleep"]
        }
    }

    fn roster() -> Vec<RosterEntry> {
        vec![RosterEntry {
            id: PlayerId::new("p1"),
            display_name: "P1".into(),
            connected: true,
        }]
    }

    fn descriptor(kind: &str, payload: Value) -> CommandDescriptor {
        CommandDescriptor::new(kind, payload, Some(PlayerId::new("p1")))
    }

    fn fresh() -> (CommandBus, GameState) {
        let bus = CommandBus::new(Duration::from_millis(5), 64);
        let state = GameState::new(json!({"phase": "playing"}));
        (bus, state)
    }

    #[test]
    fn test_applied_command_bumps_version_by_one() {
        let (mut bus, mut state) = fresh();
        let v0 = state.version();
        let v1 = bus
            .submit(
                &TestGame,
                &mut state,
                &roster(),
                descriptor("setPhase", json!({"phase": "river"})),
            )
            .unwrap();
        assert_eq!(v1, v0 + 1);
        assert_eq!(state.phase(), Some("river"));
    }

    #[test]
    fn test_unknown_command() {
        let (mut bus, mut state) = fresh();
        let err = bus
            .submit(&TestGame, &mut state, &roster(), descriptor("warp", json!({})))
            .unwrap_err();
        assert!(matches!(err, RoomError::UnknownCommand(_)));
        assert_eq!(state.version(), 1);
    }

    #[test]
    fn test_rejection_changes_nothing() {
        let (mut bus, mut state) = fresh();
        let before = state.clone();
        let err = bus
            .submit(&TestGame, &mut state, &roster(), descriptor("reject", json!({})))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotYourTurn);
        assert_eq!(state, before);
        assert_eq!(bus.journal_len(), 0);
    }

    #[test]
    fn test_unauthenticated_player_rejected() {
        let (mut bus, mut state) = fresh();
        let d = CommandDescriptor::new(
            "setPhase",
            json!({"phase": "x"}),
            Some(PlayerId::new("stranger")),
        );
        assert!(matches!(
            bus.submit(&TestGame, &mut state, &roster(), d),
            Err(RoomError::NotInRoom(_))
        ));
    }

    #[test]
    fn test_system_command_skips_authentication() {
        let (mut bus, mut state) = fresh();
        let d = CommandDescriptor::new("setPhase", json!({"phase": "x"}), None);
        bus.submit(&TestGame, &mut state, &roster(), d).unwrap();
        assert_eq!(state.phase(), Some("x"));
    }

    #[test]
    fn test_budget_overrun_discards_outcome() {
        let (mut bus, mut state) = fresh();
        let before = state.clone();
        let err = bus
            .submit(&TestGame, &mut state, &roster(), descriptor("sleep", json!({})))
            .unwrap_err();
        assert!(matches!(err, RoomError::CommandTimeout { .. }));
        assert_eq!(state, before, "over-budget outcome must not apply");
    }

    #[test]
    fn test_undo_restores_prior_doc_at_plus_two() {
        let (mut bus, mut state) = fresh();
        let before_doc = state.doc().clone();
        let v0 = state.version();

        bus.submit(
            &TestGame,
            &mut state,
            &roster(),
            descriptor("setPhase", json!({"phase": "turn"})),
        )
        .unwrap();

        let v2 = bus.undo_last(&mut state, &PlayerId::new("p1")).unwrap();
        assert_eq!(v2, v0 + 2);
        assert_eq!(state.doc(), &before_doc);
    }

    #[test]
    fn test_undo_by_other_player_forbidden() {
        let (mut bus, mut state) = fresh();
        bus.submit(
            &TestGame,
            &mut state,
            &roster(),
            descriptor("setPhase", json!({"phase": "turn"})),
        )
        .unwrap();

        let err = bus
            .undo_last(&mut state, &PlayerId::new("p2"))
            .unwrap_err();
        assert!(matches!(err, RoomError::UndoForbidden));
        assert_eq!(state.phase(), Some("turn"));
    }

    #[test]
    fn test_undo_on_empty_journal_forbidden() {
        let (mut bus, mut state) = fresh();
        assert!(matches!(
            bus.undo_last(&mut state, &PlayerId::new("p1")),
            Err(RoomError::UndoForbidden)
        ));
    }

    #[test]
    fn test_journal_is_bounded_and_evicts_oldest() {
        let mut bus = CommandBus::new(Duration::from_millis(5), 3);
        let mut state = GameState::new(json!({"phase": "0"}));
        for i in 1..=5 {
            bus.submit(
                &TestGame,
                &mut state,
                &roster(),
                descriptor("setPhase", json!({"phase": i.to_string()})),
            )
            .unwrap();
        }
        assert_eq!(bus.journal_len(), 3);

        // Undo three times lands on the oldest retained doc ("2"), then
        // refuses cleanly.
        for _ in 0..3 {
            bus.undo_last(&mut state, &PlayerId::new("p1")).unwrap();
        }
        assert_eq!(state.phase(), Some("2"));
        assert!(bus.undo_last(&mut state, &PlayerId::new("p1")).is_err());
    }
}
