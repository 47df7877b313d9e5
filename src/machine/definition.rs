//! Declared states and their enter/exit hooks.

use crate::core::{State, StateTransition};
use std::fmt;
use std::sync::Arc;

use super::error::MachineError;
use super::machine::StateMachine;

/// Callback run when a state is entered or exited.
pub type Hook<S> = Arc<dyn Fn(&mut HookContext<'_, S>) + Send + Sync>;

/// A state declared on a machine, with its optional hooks.
///
/// Definitions are fixed once the machine is built.
pub struct StateDefinition<S: State> {
    state: S,
    on_enter: Option<Hook<S>>,
    on_exit: Option<Hook<S>>,
}

impl<S: State> StateDefinition<S> {
    pub fn new(state: S) -> Self {
        Self {
            state,
            on_enter: None,
            on_exit: None,
        }
    }

    pub fn on_enter<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut HookContext<'_, S>) + Send + Sync + 'static,
    {
        self.on_enter = Some(Arc::new(hook));
        self
    }

    pub fn on_exit<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut HookContext<'_, S>) + Send + Sync + 'static,
    {
        self.on_exit = Some(Arc::new(hook));
        self
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    pub(crate) fn enter_hook(&self) -> Option<Hook<S>> {
        self.on_enter.clone()
    }

    pub(crate) fn exit_hook(&self) -> Option<Hook<S>> {
        self.on_exit.clone()
    }

    pub(crate) fn set_enter(&mut self, hook: Hook<S>) {
        self.on_enter = Some(hook);
    }

    pub(crate) fn set_exit(&mut self, hook: Hook<S>) {
        self.on_exit = Some(hook);
    }
}

impl<S: State> fmt::Debug for StateDefinition<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateDefinition")
            .field("state", &self.state)
            .field("on_enter", &self.on_enter.is_some())
            .field("on_exit", &self.on_exit.is_some())
            .finish()
    }
}

/// View of the machine handed to hooks while a transition is in progress.
///
/// The machine is mid-transition, so [`HookContext::transition`] always
/// fails with [`MachineError::TransitionInProgress`]. Hooks that want to
/// chain a follow-up move use [`HookContext::defer`]; the request is applied
/// on the machine's next update.
pub struct HookContext<'a, S: State> {
    machine: &'a mut StateMachine<S>,
    from: S,
    to: S,
}

impl<'a, S: State> HookContext<'a, S> {
    pub(crate) fn new(machine: &'a mut StateMachine<S>, from: S, to: S) -> Self {
        Self { machine, from, to }
    }

    /// State being left.
    pub fn from(&self) -> &S {
        &self.from
    }

    /// State being entered.
    pub fn to(&self) -> &S {
        &self.to
    }

    /// The machine's state at the time the hook runs: `from` inside exit
    /// hooks, `to` inside enter hooks.
    pub fn current(&self) -> &S {
        self.machine.current_state()
    }

    /// Attempt a nested transition. Always rejected.
    pub fn transition(&mut self, to: S) -> Result<StateTransition<S>, MachineError> {
        self.machine.transition(to)
    }

    /// Queue `to` for the machine's next update, replacing any earlier
    /// request.
    pub fn defer(&mut self, to: S) -> Option<S> {
        self.machine.defer(to)
    }
}
