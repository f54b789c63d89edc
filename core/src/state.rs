//! Lifecycle states emitted by every SDK operation.
//!
//! A call's stream yields `Pending`, then exactly one of `Success` or
//! `Failure`, then ends. `Idle` exists for callers that need an initial value
//! before any call is made; the repository never emits it.

use std::pin::Pin;

use futures::Stream;
use serde::Serialize;

/// Stream returned by every repository and SDK operation.
pub type LifecycleStream<T> = Pin<Box<dyn Stream<Item = LifecycleState<T>> + Send>>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LifecycleState<T> {
    #[default]
    Idle,
    Pending,
    Success {
        data: T,
    },
    Failure {
        message: String,
    },
}

impl<T> LifecycleState<T> {
    pub fn success(data: T) -> Self {
        LifecycleState::Success { data }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        LifecycleState::Failure {
            message: message.into(),
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, LifecycleState::Pending)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            LifecycleState::Success { .. } | LifecycleState::Failure { .. }
        )
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            LifecycleState::Success { data } => Some(data),
            _ => None,
        }
    }

    pub fn into_data(self) -> Option<T> {
        match self {
            LifecycleState::Success { data } => Some(data),
            _ => None,
        }
    }

    pub fn failure_message(&self) -> Option<&str> {
        match self {
            LifecycleState::Failure { message } => Some(message),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> LifecycleState<U> {
        match self {
            LifecycleState::Idle => LifecycleState::Idle,
            LifecycleState::Pending => LifecycleState::Pending,
            LifecycleState::Success { data } => LifecycleState::Success { data: f(data) },
            LifecycleState::Failure { message } => LifecycleState::Failure { message },
        }
    }
}

impl<T, E: std::fmt::Display> From<Result<T, E>> for LifecycleState<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(data) => LifecycleState::success(data),
            Err(err) => LifecycleState::failure(err.to_string()),
        }
    }
}
