//! Scripted compute backend for handler tests.
//!
//! Each operation returns a pre-configured outcome and counts how often it
//! was invoked, so tests can assert that handlers perform exactly one remote
//! call per request.

use std::sync::{Arc, Mutex};

use thiserror::Error;
use vmgate::{BackendFuture, ComputeBackend, InstanceView};

#[derive(Clone, Debug, Default)]
pub struct ScriptedBackend {
    state: Arc<Mutex<State>>,
}

#[derive(Debug, Default)]
struct State {
    fail_on_start: bool,
    fail_on_deallocate: bool,
    view: Option<InstanceView>,
    start_calls: u32,
    deallocate_calls: u32,
    view_calls: u32,
}

#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ScriptedBackendError {
    #[error("start failure")]
    Start,
    #[error("deallocate failure")]
    Deallocate,
    #[error("instance view failure")]
    InstanceView,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut State) -> T) -> T {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|err| panic!("scripted backend lock poisoned: {err}"));
        f(&mut state)
    }

    pub fn fail_on_start(&self) {
        self.with_state(|state| state.fail_on_start = true);
    }

    pub fn fail_on_deallocate(&self) {
        self.with_state(|state| state.fail_on_deallocate = true);
    }

    /// Sets the instance view returned by the next status queries. Without a
    /// view the status call fails.
    pub fn respond_with_view(&self, view: InstanceView) {
        self.with_state(|state| state.view = Some(view));
    }

    pub fn start_calls(&self) -> u32 {
        self.with_state(|state| state.start_calls)
    }

    pub fn deallocate_calls(&self) -> u32 {
        self.with_state(|state| state.deallocate_calls)
    }

    pub fn view_calls(&self) -> u32 {
        self.with_state(|state| state.view_calls)
    }
}

impl ComputeBackend for ScriptedBackend {
    type Error = ScriptedBackendError;

    fn start(&self) -> BackendFuture<'_, (), Self::Error> {
        let outcome = self.with_state(|state| {
            state.start_calls += 1;
            if state.fail_on_start {
                Err(ScriptedBackendError::Start)
            } else {
                Ok(())
            }
        });
        Box::pin(async move { outcome })
    }

    fn deallocate(&self) -> BackendFuture<'_, (), Self::Error> {
        let outcome = self.with_state(|state| {
            state.deallocate_calls += 1;
            if state.fail_on_deallocate {
                Err(ScriptedBackendError::Deallocate)
            } else {
                Ok(())
            }
        });
        Box::pin(async move { outcome })
    }

    fn instance_view(&self) -> BackendFuture<'_, InstanceView, Self::Error> {
        let outcome = self.with_state(|state| {
            state.view_calls += 1;
            state.view.clone().ok_or(ScriptedBackendError::InstanceView)
        });
        Box::pin(async move { outcome })
    }
}
