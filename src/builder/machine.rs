//! Builder for constructing state machines.

use crate::builder::error::BuildError;
use crate::builder::transition::TransitionBuilder;
use crate::core::{Guard, State, StateHistory};
use crate::machine::{HookContext, StateDefinition, StateMachine, Transition};
use std::sync::Arc;

/// Builder for constructing state machines with a fluent API.
///
/// States must be declared before `build`; hooks attached to a state that
/// was not declared yet declare it.
pub struct StateMachineBuilder<S: State> {
    initial: Option<S>,
    definitions: Vec<StateDefinition<S>>,
    transitions: Vec<Transition<S>>,
    history_limit: Option<usize>,
}

impl<S: State> StateMachineBuilder<S> {
    pub fn new() -> Self {
        Self {
            initial: None,
            definitions: Vec::new(),
            transitions: Vec::new(),
            history_limit: None,
        }
    }

    /// Set the initial state (required).
    pub fn initial(mut self, state: S) -> Self {
        self.initial = Some(state);
        self
    }

    /// Declare a state without hooks.
    pub fn state(mut self, state: S) -> Self {
        self.definitions.push(StateDefinition::new(state));
        self
    }

    /// Declare several states at once.
    pub fn states<I>(mut self, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
    {
        self.definitions
            .extend(states.into_iter().map(StateDefinition::new));
        self
    }

    /// Declare a state together with its hooks.
    pub fn define(mut self, definition: StateDefinition<S>) -> Self {
        self.definitions.push(definition);
        self
    }

    /// Run `hook` whenever `state` is entered.
    pub fn on_enter<F>(mut self, state: S, hook: F) -> Self
    where
        F: Fn(&mut HookContext<'_, S>) + Send + Sync + 'static,
    {
        self.definition_mut(state).set_enter(Arc::new(hook));
        self
    }

    /// Run `hook` whenever `state` is left.
    pub fn on_exit<F>(mut self, state: S, hook: F) -> Self
    where
        F: Fn(&mut HookContext<'_, S>) + Send + Sync + 'static,
    {
        self.definition_mut(state).set_exit(Arc::new(hook));
        self
    }

    /// Allow `from -> to` unconditionally.
    pub fn transition(mut self, from: S, to: S) -> Self {
        self.transitions.push(Transition::new(from, to));
        self
    }

    /// Allow `from -> to` while `predicate` holds.
    pub fn guarded<F>(mut self, from: S, to: S, predicate: F) -> Self
    where
        F: Fn(&S) -> bool + Send + Sync + 'static,
    {
        self.transitions
            .push(Transition::guarded(from, to, Guard::new(predicate)));
        self
    }

    /// Add a transition using a builder.
    /// Returns an error if the builder fails validation.
    pub fn transition_with(mut self, builder: TransitionBuilder<S>) -> Result<Self, BuildError> {
        let transition = builder.build()?;
        self.transitions.push(transition);
        Ok(self)
    }

    /// Add a pre-built transition.
    pub fn add_transition(mut self, transition: Transition<S>) -> Self {
        self.transitions.push(transition);
        self
    }

    /// Keep at most `limit` records in the machine's history.
    pub fn history_limit(mut self, limit: usize) -> Self {
        self.history_limit = Some(limit);
        self
    }

    fn definition_mut(&mut self, state: S) -> &mut StateDefinition<S> {
        let index = match self.definitions.iter().position(|d| *d.state() == state) {
            Some(index) => index,
            None => {
                self.definitions.push(StateDefinition::new(state));
                self.definitions.len() - 1
            }
        };
        &mut self.definitions[index]
    }

    /// Build the state machine, checking that every referenced state is
    /// declared exactly once and that no transition is listed twice.
    pub fn build(self) -> Result<StateMachine<S>, BuildError> {
        let initial = self.initial.ok_or(BuildError::MissingInitialState)?;

        if self.definitions.is_empty() {
            return Err(BuildError::NoStates);
        }

        for (i, definition) in self.definitions.iter().enumerate() {
            if self.definitions[..i]
                .iter()
                .any(|earlier| earlier.state() == definition.state())
            {
                return Err(BuildError::DuplicateState(
                    definition.state().name().to_owned(),
                ));
            }
        }

        let declared = |state: &S| self.definitions.iter().any(|d| d.state() == state);
        if !declared(&initial) {
            return Err(BuildError::UndeclaredState(initial.name().to_owned()));
        }

        for (i, transition) in self.transitions.iter().enumerate() {
            for endpoint in [&transition.from, &transition.to] {
                if !declared(endpoint) {
                    return Err(BuildError::UndeclaredState(endpoint.name().to_owned()));
                }
            }
            if self.transitions[..i]
                .iter()
                .any(|earlier| earlier.matches(&transition.from, &transition.to))
            {
                return Err(BuildError::DuplicateTransition {
                    from: transition.from.name().to_owned(),
                    to: transition.to.name().to_owned(),
                });
            }
        }

        let history = match self.history_limit {
            Some(limit) => StateHistory::with_limit(limit),
            None => StateHistory::new(),
        };

        Ok(StateMachine::from_parts(
            initial,
            self.definitions,
            self.transitions,
            history,
        ))
    }
}

impl<S: State> Default for StateMachineBuilder<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_enum;

    state_enum! {
        enum TestState {
            Idle,
            Running,
            Dead,
        }
        final: [Dead]
    }

    #[test]
    fn builder_validates_required_fields() {
        let result = StateMachineBuilder::<TestState>::new()
            .state(TestState::Idle)
            .build();

        assert!(matches!(result, Err(BuildError::MissingInitialState)));
    }

    #[test]
    fn builder_requires_states() {
        let result = StateMachineBuilder::<TestState>::new()
            .initial(TestState::Idle)
            .build();

        assert!(matches!(result, Err(BuildError::NoStates)));
    }

    #[test]
    fn initial_state_must_be_declared() {
        let result = StateMachineBuilder::new()
            .state(TestState::Running)
            .initial(TestState::Idle)
            .build();

        assert!(matches!(result, Err(BuildError::UndeclaredState(name)) if name == "Idle"));
    }

    #[test]
    fn transition_endpoints_must_be_declared() {
        let result = StateMachineBuilder::new()
            .states([TestState::Idle, TestState::Running])
            .initial(TestState::Idle)
            .transition(TestState::Running, TestState::Dead)
            .build();

        assert!(matches!(result, Err(BuildError::UndeclaredState(name)) if name == "Dead"));
    }

    #[test]
    fn duplicate_states_are_rejected() {
        let result = StateMachineBuilder::new()
            .states([TestState::Idle, TestState::Running, TestState::Idle])
            .initial(TestState::Idle)
            .build();

        assert!(matches!(result, Err(BuildError::DuplicateState(name)) if name == "Idle"));
    }

    #[test]
    fn duplicate_transitions_are_rejected() {
        let result = StateMachineBuilder::new()
            .states(TestState::VARIANTS.iter().copied())
            .initial(TestState::Idle)
            .transition(TestState::Idle, TestState::Running)
            .guarded(TestState::Idle, TestState::Running, |_| true)
            .build();

        assert_eq!(
            result.err(),
            Some(BuildError::DuplicateTransition {
                from: "Idle".to_owned(),
                to: "Running".to_owned(),
            })
        );
    }

    #[test]
    fn hooks_declare_missing_states() {
        let machine = StateMachineBuilder::new()
            .state(TestState::Idle)
            .on_enter(TestState::Running, |_| {})
            .initial(TestState::Idle)
            .transition(TestState::Idle, TestState::Running)
            .build()
            .unwrap();

        assert!(machine.is_declared(&TestState::Running));
        assert!(!machine.is_declared(&TestState::Dead));
    }

    #[test]
    fn fluent_api_builds_machine() {
        let machine = StateMachineBuilder::new()
            .states(TestState::VARIANTS.iter().copied())
            .initial(TestState::Idle)
            .transition(TestState::Idle, TestState::Running)
            .transition_with(
                TransitionBuilder::new()
                    .from(TestState::Running)
                    .to(TestState::Dead),
            )
            .unwrap()
            .history_limit(4)
            .build()
            .unwrap();

        assert_eq!(machine.current_state(), &TestState::Idle);
        assert_eq!(machine.history().limit(), Some(4));
        assert_eq!(machine.states().count(), 3);
    }
}
