//! Finite state machine with an explicit allow-list and enter/exit hooks.

use crate::checkpoint::{CheckpointError, CheckpointField, MachineCheckpoint, CHECKPOINT_VERSION};
use crate::core::{State, StateHistory, StateTransition};
use chrono::Utc;
use log::{debug, warn};
use std::time::Duration;
use uuid::Uuid;

use super::capability::{Stateful, Updatable};
use super::definition::{Hook, HookContext, StateDefinition};
use super::error::MachineError;
use super::transition::Transition;

/// Per-entity finite state machine.
///
/// Built with [`StateMachineBuilder`](crate::builder::StateMachineBuilder).
/// A built machine is always in exactly one declared state.
///
/// Committing a transition runs, in order: the exit hook of the old state,
/// the state update, the enter hook of the new state. The change is then
/// recorded in the history. Signalling the change to the rest of the game is
/// the [`Registry`](crate::Registry)'s job.
pub struct StateMachine<S: State> {
    initial: S,
    current: S,
    definitions: Vec<StateDefinition<S>>,
    transitions: Vec<Transition<S>>,
    history: StateHistory<S>,
    sequence: u64,
    in_flight: Option<(S, S)>,
    pending: Option<S>,
    time_in_state: Duration,
}

impl<S: State> StateMachine<S> {
    pub(crate) fn from_parts(
        initial: S,
        definitions: Vec<StateDefinition<S>>,
        transitions: Vec<Transition<S>>,
        history: StateHistory<S>,
    ) -> Self {
        Self {
            current: initial.clone(),
            initial,
            definitions,
            transitions,
            history,
            sequence: 0,
            in_flight: None,
            pending: None,
            time_in_state: Duration::ZERO,
        }
    }

    pub fn current_state(&self) -> &S {
        &self.current
    }

    pub fn initial_state(&self) -> &S {
        &self.initial
    }

    pub fn is_final(&self) -> bool {
        self.current.is_final()
    }

    pub fn history(&self) -> &StateHistory<S> {
        &self.history
    }

    pub fn time_in_state(&self) -> Duration {
        self.time_in_state
    }

    /// Transition queued by [`StateMachine::defer`], if any.
    pub fn pending(&self) -> Option<&S> {
        self.pending.as_ref()
    }

    pub fn is_transitioning(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Declared states, in declaration order.
    pub fn states(&self) -> impl Iterator<Item = &S> {
        self.definitions.iter().map(StateDefinition::state)
    }

    pub fn is_declared(&self, state: &S) -> bool {
        self.definitions.iter().any(|d| d.state() == state)
    }

    /// States the allow-list permits from the current state. Guards are not
    /// evaluated.
    pub fn allowed_targets(&self) -> Vec<&S> {
        self.transitions
            .iter()
            .filter(|t| t.from == self.current)
            .map(|t| &t.to)
            .collect()
    }

    /// Whether [`StateMachine::transition`] to `to` would currently succeed.
    pub fn can_transition(&self, to: &S) -> bool {
        self.validate(to).is_ok()
    }

    /// Move to `to`.
    ///
    /// Fails without touching the state if a transition is already in
    /// progress, if `current -> to` is not in the allow-list, or if its guard
    /// rejects the move.
    pub fn transition(&mut self, to: S) -> Result<StateTransition<S>, MachineError> {
        if let Some((from, target)) = &self.in_flight {
            warn!(
                "rejected re-entrant transition to '{}' during '{}' -> '{}'",
                to.name(),
                from.name(),
                target.name()
            );
            return Err(MachineError::TransitionInProgress {
                from: from.name().to_owned(),
                to: target.name().to_owned(),
                requested: to.name().to_owned(),
            });
        }
        self.validate(&to)?;

        self.in_flight = Some((self.current.clone(), to.clone()));
        let from = self.current.clone();

        if let Some(exit) = self.hook_for(&from, StateDefinition::exit_hook) {
            exit(&mut HookContext::new(self, from.clone(), to.clone()));
        }

        self.current = to.clone();
        self.time_in_state = Duration::ZERO;

        if let Some(enter) = self.hook_for(&to, StateDefinition::enter_hook) {
            enter(&mut HookContext::new(self, from.clone(), to.clone()));
        }

        self.sequence += 1;
        let record = StateTransition {
            from,
            to,
            timestamp: Utc::now(),
            sequence: self.sequence,
        };
        self.history.record(record.clone());
        self.in_flight = None;

        debug!(
            "transition #{} '{}' -> '{}'",
            record.sequence,
            record.from.name(),
            record.to.name()
        );
        Ok(record)
    }

    /// Queue `to` to be applied on the next [`Updatable::update`], replacing
    /// and returning any earlier request.
    pub fn defer(&mut self, to: S) -> Option<S> {
        self.pending.replace(to)
    }

    /// Drop a queued request without applying it.
    pub fn cancel_deferred(&mut self) -> Option<S> {
        self.pending.take()
    }

    fn validate(&self, to: &S) -> Result<(), MachineError> {
        let rule = self
            .transitions
            .iter()
            .find(|t| t.matches(&self.current, to))
            .ok_or_else(|| MachineError::InvalidTransition {
                from: self.current.name().to_owned(),
                to: to.name().to_owned(),
            })?;

        if !rule.guard_allows(&self.current) {
            return Err(MachineError::GuardRejected {
                from: self.current.name().to_owned(),
                to: to.name().to_owned(),
            });
        }
        Ok(())
    }

    fn hook_for(
        &self,
        state: &S,
        select: fn(&StateDefinition<S>) -> Option<Hook<S>>,
    ) -> Option<Hook<S>> {
        self.definitions
            .iter()
            .find(|d| d.state() == state)
            .and_then(select)
    }

    /// Snapshot the machine's runtime data. Hooks, guards and the
    /// allow-list are not part of a checkpoint.
    pub fn checkpoint(&self) -> MachineCheckpoint<S> {
        MachineCheckpoint {
            version: CHECKPOINT_VERSION,
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            current: self.current.clone(),
            pending: self.pending.clone(),
            history: self.history.clone(),
            sequence: self.sequence,
            time_in_state: self.time_in_state,
        }
    }

    /// Load runtime data from a checkpoint taken from a machine with the
    /// same declared states. No hooks run.
    pub fn restore(&mut self, checkpoint: &MachineCheckpoint<S>) -> Result<(), CheckpointError> {
        if checkpoint.version != CHECKPOINT_VERSION {
            return Err(CheckpointError::UnsupportedVersion {
                found: checkpoint.version,
                supported: CHECKPOINT_VERSION,
            });
        }
        if self.is_transitioning() {
            return Err(CheckpointError::TransitionInProgress);
        }

        let undeclared = |field: CheckpointField, state: &S| CheckpointError::UndeclaredState {
            field,
            state: state.name().to_owned(),
        };
        if !self.is_declared(&checkpoint.current) {
            return Err(undeclared(CheckpointField::Current, &checkpoint.current));
        }
        if let Some(pending) = checkpoint.pending.as_ref().filter(|p| !self.is_declared(p)) {
            return Err(undeclared(CheckpointField::Pending, pending));
        }
        if let Some(state) = checkpoint
            .history
            .transitions()
            .iter()
            .flat_map(|record| [&record.from, &record.to])
            .find(|state| !self.is_declared(state))
        {
            return Err(undeclared(CheckpointField::History, state));
        }

        let limit = self.history.limit();
        self.current = checkpoint.current.clone();
        self.pending = checkpoint.pending.clone();
        self.history = checkpoint.history.clone();
        self.history.set_limit(limit);
        self.sequence = checkpoint.sequence;
        self.time_in_state = checkpoint.time_in_state;
        debug!(
            "restored checkpoint {} at '{}'",
            checkpoint.id,
            self.current.name()
        );
        Ok(())
    }

    pub(crate) fn set_history_limit(&mut self, limit: Option<usize>) {
        self.history.set_limit(limit);
    }
}

impl<S: State> Stateful for StateMachine<S> {
    type State = S;

    fn current_state(&self) -> &S {
        &self.current
    }

    fn time_in_state(&self) -> Duration {
        self.time_in_state
    }
}

impl<S: State> Updatable for StateMachine<S> {
    type Output = Option<Result<StateTransition<S>, MachineError>>;

    /// Advance `time_in_state` by `dt` and apply the deferred transition,
    /// if one is queued. A rejected request is dropped.
    fn update(&mut self, dt: Duration) -> Self::Output {
        self.time_in_state += dt;
        let next = self.pending.take()?;
        Some(self.transition(next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::StateMachineBuilder;
    use crate::state_enum;
    use std::sync::{Arc, Mutex};

    state_enum! {
        enum Life {
            Idle,
            Running,
            Stunned,
            Dead,
        }
        final: [Dead]
    }

    fn life() -> StateMachineBuilder<Life> {
        StateMachineBuilder::new()
            .states(Life::VARIANTS.iter().copied())
            .initial(Life::Idle)
            .transition(Life::Idle, Life::Running)
            .transition(Life::Running, Life::Dead)
    }

    #[test]
    fn allowed_transition_updates_state_and_history() {
        let mut machine = life().build().unwrap();

        let record = machine.transition(Life::Running).unwrap();

        assert_eq!(record.from, Life::Idle);
        assert_eq!(record.to, Life::Running);
        assert_eq!(record.sequence, 1);
        assert_eq!(machine.current_state(), &Life::Running);
        assert_eq!(machine.history().len(), 1);
    }

    #[test]
    fn transition_outside_allow_list_is_rejected() {
        let mut machine = life().build().unwrap();

        let result = machine.transition(Life::Dead);

        assert_eq!(
            result.err(),
            Some(MachineError::InvalidTransition {
                from: "Idle".to_owned(),
                to: "Dead".to_owned(),
            })
        );
        assert_eq!(machine.current_state(), &Life::Idle);
        assert!(machine.history().is_empty());
    }

    #[test]
    fn self_transition_needs_an_explicit_rule() {
        let mut machine = life().build().unwrap();
        assert!(machine.transition(Life::Idle).is_err());

        let mut machine = life()
            .transition(Life::Idle, Life::Idle)
            .build()
            .unwrap();
        assert!(machine.transition(Life::Idle).is_ok());
    }

    #[test]
    fn guard_rejection_leaves_state_untouched() {
        let mut machine = StateMachineBuilder::new()
            .states(Life::VARIANTS.iter().copied())
            .initial(Life::Idle)
            .guarded(Life::Idle, Life::Stunned, |_| false)
            .build()
            .unwrap();

        assert!(!machine.can_transition(&Life::Stunned));
        assert!(matches!(
            machine.transition(Life::Stunned),
            Err(MachineError::GuardRejected { .. })
        ));
        assert_eq!(machine.current_state(), &Life::Idle);
    }

    #[test]
    fn hooks_run_exit_then_enter() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let on_exit = Arc::clone(&log);
        let on_enter = Arc::clone(&log);

        let mut machine = life()
            .on_exit(Life::Idle, move |ctx| {
                on_exit
                    .lock()
                    .unwrap()
                    .push(format!("exit {:?} while {:?}", ctx.from(), ctx.current()));
            })
            .on_enter(Life::Running, move |ctx| {
                on_enter
                    .lock()
                    .unwrap()
                    .push(format!("enter {:?} while {:?}", ctx.to(), ctx.current()));
            })
            .build()
            .unwrap();

        machine.transition(Life::Running).unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec!["exit Idle while Idle", "enter Running while Running"]
        );
    }

    #[test]
    fn nested_transition_from_hook_is_rejected() {
        let outcome = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&outcome);

        let mut machine = life()
            .on_enter(Life::Running, move |ctx| {
                *sink.lock().unwrap() = Some(ctx.transition(Life::Dead));
            })
            .build()
            .unwrap();

        machine.transition(Life::Running).unwrap();

        let nested = outcome.lock().unwrap().take().unwrap();
        assert_eq!(
            nested.err(),
            Some(MachineError::TransitionInProgress {
                from: "Idle".to_owned(),
                to: "Running".to_owned(),
                requested: "Dead".to_owned(),
            })
        );
        assert_eq!(machine.current_state(), &Life::Running);
        assert!(!machine.is_transitioning());
    }

    #[test]
    fn deferred_transition_applies_on_update() {
        let mut machine = life()
            .on_enter(Life::Running, |ctx| {
                ctx.defer(Life::Dead);
            })
            .build()
            .unwrap();

        machine.transition(Life::Running).unwrap();
        assert_eq!(machine.pending(), Some(&Life::Dead));

        let applied = machine.update(Duration::from_millis(16)).unwrap().unwrap();

        assert_eq!(applied.to, Life::Dead);
        assert!(machine.is_final());
        assert!(machine.pending().is_none());
        assert!(machine.update(Duration::from_millis(16)).is_none());
    }

    #[test]
    fn deferring_again_replaces_the_request() {
        let mut machine = life().build().unwrap();

        assert_eq!(machine.defer(Life::Dead), None);
        assert_eq!(machine.defer(Life::Running), Some(Life::Dead));
        assert_eq!(machine.cancel_deferred(), Some(Life::Running));
        assert!(machine.update(Duration::ZERO).is_none());
    }

    #[test]
    fn time_in_state_resets_on_transition() {
        let mut machine = life().build().unwrap();

        machine.update(Duration::from_millis(10));
        machine.update(Duration::from_millis(5));
        assert_eq!(machine.time_in_state(), Duration::from_millis(15));

        machine.transition(Life::Running).unwrap();
        assert_eq!(machine.time_in_state(), Duration::ZERO);
    }

    #[test]
    fn allowed_targets_follow_current_state() {
        let mut machine = life()
            .guarded(Life::Idle, Life::Stunned, |_| false)
            .build()
            .unwrap();

        assert_eq!(machine.allowed_targets(), vec![&Life::Running, &Life::Stunned]);
        machine.transition(Life::Running).unwrap();
        assert_eq!(machine.allowed_targets(), vec![&Life::Dead]);
    }

    #[test]
    fn restore_rejects_history_with_undeclared_states() {
        let mut source = life().build().unwrap();
        source.transition(Life::Running).unwrap();
        source.transition(Life::Dead).unwrap();
        let mut checkpoint = source.checkpoint();
        checkpoint.current = Life::Running;

        let mut target = StateMachineBuilder::new()
            .states([Life::Idle, Life::Running])
            .initial(Life::Idle)
            .build()
            .unwrap();

        match target.restore(&checkpoint) {
            Err(error @ CheckpointError::UndeclaredState { field, .. }) => {
                assert_eq!(field, CheckpointField::History);
                assert_eq!(
                    error.to_string(),
                    "history state 'Dead' is not declared on this machine"
                );
            }
            other => panic!("Expected UndeclaredState, got {other:?}"),
        }
        assert_eq!(target.current_state(), &Life::Idle);
        assert!(target.history().is_empty());
    }

    #[test]
    fn restore_keeps_the_machines_history_limit() {
        let mut source = life().build().unwrap();
        source.transition(Life::Running).unwrap();
        source.transition(Life::Dead).unwrap();
        let checkpoint = source.checkpoint();

        let mut target = life().history_limit(1).build().unwrap();
        target.restore(&checkpoint).unwrap();

        assert_eq!(target.current_state(), &Life::Dead);
        assert_eq!(target.history().limit(), Some(1));
        target.defer(Life::Idle);
        assert!(matches!(
            target.update(Duration::ZERO),
            Some(Err(MachineError::InvalidTransition { .. }))
        ));
    }
}
