//! Responders are the scripted results of an expectation.

use std::cell::Cell;
use std::error::Error;
use std::fmt::{self, Debug, Display};
use std::sync::Arc;

use crate::counter::CountBounds;
use crate::log::Invocation;
use crate::value::Value;

/// One scripted outcome of a matched call.
#[derive(Clone)]
pub enum ResultAction {
    /// Return this value.
    Return(Value),
    /// Raise this error at the call site.
    Throw(Thrown),
    /// Compute the outcome with a callback.
    Delegate(Delegate),
    /// Run the real method. Only meaningful to interception providers that can.
    CallReal,
}

impl Debug for ResultAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Return(value) => write!(f, "Return({value})"),
            Self::Throw(thrown) => write!(f, "Throw({thrown})"),
            Self::Delegate(_) => write!(f, "Delegate"),
            Self::CallReal => write!(f, "CallReal"),
        }
    }
}

/// An error a mocked call raises at its call site.
#[derive(Clone)]
pub struct Thrown(Arc<dyn Error + Send + Sync + 'static>);

impl Thrown {
    /// Wrap any error.
    pub fn new<E: Error + Send + Sync + 'static>(error: E) -> Self {
        Self(Arc::new(error))
    }

    /// An error consisting only of a message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::new(ThrownMessage(message.into()))
    }

    /// The wrapped error.
    pub fn error(&self) -> &(dyn Error + Send + Sync + 'static) {
        self.0.as_ref()
    }

    /// Try to view the wrapped error as a concrete type.
    pub fn downcast_ref<E: Error + 'static>(&self) -> Option<&E> {
        self.0.downcast_ref::<E>()
    }
}

impl<E: Error + Send + Sync + 'static> From<E> for Thrown {
    fn from(error: E) -> Self {
        Self::new(error)
    }
}

impl Debug for Thrown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Thrown({:?})", self.0)
    }
}

impl Display for Thrown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct ThrownMessage(String);

/// What a [Delegate] callback gets to see.
pub struct DelegateCall<'a> {
    /// The intercepted call.
    pub invocation: &'a Invocation,
    /// 1-based number of this call among the ones the expectation answered.
    pub invocation_number: usize,
    /// Count bounds of the answering expectation.
    pub bounds: CountBounds,
    updated_bounds: Cell<Option<CountBounds>>,
}

impl<'a> DelegateCall<'a> {
    pub(crate) fn new(invocation: &'a Invocation, invocation_number: usize, bounds: CountBounds) -> Self {
        Self {
            invocation,
            invocation_number,
            bounds,
            updated_bounds: Cell::new(None),
        }
    }

    /// Change the minimum call count of the answering expectation.
    ///
    /// The change applies once the delegate returns, and is checked like bounds given
    /// while recording.
    pub fn set_min_times(&self, times: usize) {
        let mut bounds = self.current_bounds();
        bounds.min = times;
        self.updated_bounds.set(Some(bounds));
    }

    /// Change the maximum call count of the answering expectation.
    pub fn set_max_times(&self, times: usize) {
        let mut bounds = self.current_bounds();
        bounds.max = Some(times);
        self.updated_bounds.set(Some(bounds));
    }

    fn current_bounds(&self) -> CountBounds {
        self.updated_bounds.get().unwrap_or(self.bounds)
    }

    pub(crate) fn updated_bounds(&self) -> Option<CountBounds> {
        self.updated_bounds.get()
    }
}

type DelegateFn = dyn Fn(&DelegateCall<'_>) -> Result<Value, Thrown> + Send + Sync;

/// A shareable callback computing the result of a call.
#[derive(Clone)]
pub struct Delegate(Arc<DelegateFn>);

impl Delegate {
    /// Create a delegate from a closure.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&DelegateCall<'_>) -> Result<Value, Thrown> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Create a delegate from a closure that is not `Send`.
    ///
    /// Calling it from any thread other than the recording one raises a [Thrown] error.
    #[cfg(feature = "fragile")]
    pub fn thread_bound<F>(f: F) -> Self
    where
        F: Fn(&DelegateCall<'_>) -> Result<Value, Thrown> + 'static,
    {
        let fragile = fragile::Fragile::new(f);
        Self::new(move |call| match fragile.try_get() {
            Ok(f) => f(call),
            Err(_) => Err(Thrown::msg(format!(
                "{}: thread-bound delegate called from a different thread",
                call.invocation
            ))),
        })
    }

    pub(crate) fn call(&self, call: &DelegateCall<'_>) -> Result<Value, Thrown> {
        (self.0)(call)
    }
}

/// Select the scripted action for the zero-based `call_index`.
///
/// Calls past the end of the script reuse the last action.
pub(crate) fn find_action_by_call_index(
    script: &[ResultAction],
    call_index: usize,
) -> Option<&ResultAction> {
    script.get(call_index).or_else(|| script.last())
}
