//! `expectant` is a record/replay/verify engine for mock objects.
//!
//! A test declares mock targets, records the calls it expects together with their
//! scripted results, runs the code under test, and finally verifies what happened.
//! The actual interception of calls is left to an interception provider: a
//! hand-written test double, a generated one, or anything else that can turn a
//! method call into a [Target], a [Signature] and a list of [Value]s and hand them to
//! [Mocks::dispatch].
//!
//! ```rust
//! use expectant::*;
//!
//! let mocks = Mocks::new();
//! let repo = mocks.strict("UserRepo");
//! let find = Signature::new("find").param(ValueType::I64).returns(ValueType::Str);
//!
//! mocks.record(|rec| {
//!     rec.expect(&repo, &find, args![42]).returns("alice");
//! }).unwrap();
//!
//! // inside the code under test, through a test double:
//! let name = mocks.proxy(&repo).call(&find, vec![Value::I64(42)]).unwrap();
//! assert_eq!(Value::from("alice"), name);
//!
//! mocks.verify(|v| {
//!     v.expect(&repo, &find, args![any()]);
//! }).unwrap();
//! ```
//!
//! # Strict and lenient targets
//! Expectations on a [Strictness::Strict] target must be called in recorded order,
//! exactly once unless quantified otherwise, and any other call is an unexpected
//! invocation. Expectations marked [ExpectationBuilder::unordered] are exempt from the
//! order. A [Strictness::Lenient] target accepts any call: unmatched calls return the
//! default value of the method's return type.
//!
//! # Reporting
//! Unexpected invocations don't stop the test where they happen. They are collected,
//! and reported together with everything else that went wrong by the next verification,
//! by [Mocks::finish], or when the original [Mocks] handle is dropped.

#![forbid(unsafe_code)]

mod assemble;
mod build;
mod config;
mod counter;
mod debug;
mod error;
mod eval;
mod expectation;
mod log;
mod matcher;
mod mismatch;
mod mock_target;
mod proxy;
mod responder;
mod state;
mod teardown;
mod target;
mod value;
mod verify;

use std::sync::Arc;

pub use build::{ExpectationBuilder, Recording, Verification, VerificationBuilder};
pub use config::{Config, FallbackMode};
pub use counter::{CountBounds, NCalls};
pub use error::{Failure, Mismatch, MismatchKind, MockError, UnexpectedReason};
pub use eval::Decision;
pub use log::Invocation;
pub use matcher::{
    any, approx, contains, eq, matches_regex, ne, not_null, null, pred, prefix, range, suffix,
    try_with, with, ArgMatcher, IntoArgMatcher, MatcherError, PredicateMatcher,
};
pub use mismatch::ArgMismatches;
pub use proxy::Proxy;
pub use responder::{Delegate, DelegateCall, ResultAction, Thrown};
pub use state::Phase;
pub use target::{InstanceId, InterceptionPolicy, Signature, Strictness, Target, TargetOptions};
pub use value::{Value, ValueType};

/// A mock session: declared targets, their expectations and the invocation log.
///
/// `Mocks` is the explicit session handle; there is no global or thread-local state.
/// It can be cloned to hand the session to other threads. Only the original
/// instance verifies when dropped, and it must outlive its clones.
///
/// Dropping the original instance runs the same check as [Mocks::finish] and panics
/// with the aggregated report if anything went wrong, unless disabled with
/// [Config::verify_on_drop].
pub struct Mocks {
    shared_state: Arc<state::SharedState>,

    original_instance: bool,
    torn_down: bool,
}

impl Mocks {
    /// Create a session with the default [Config].
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Create a session with the given configuration.
    pub fn with_config(config: Config) -> Self {
        Self {
            shared_state: Arc::new(state::SharedState::new(config)),
            original_instance: true,
            torn_down: false,
        }
    }

    /// Declare a mocked type using [Config::default_strictness].
    ///
    /// # Panics
    /// If the type is already declared with other options.
    #[track_caller]
    pub fn declare(&self, type_name: &str) -> Target {
        self.declare_with(type_name, self.shared_state.config.default_options())
    }

    /// Declare a strict mocked type.
    #[track_caller]
    pub fn strict(&self, type_name: &str) -> Target {
        self.declare_with(type_name, TargetOptions::strict())
    }

    /// Declare a lenient mocked type.
    #[track_caller]
    pub fn lenient(&self, type_name: &str) -> Target {
        self.declare_with(type_name, TargetOptions::lenient())
    }

    /// Declare a mocked type with explicit options.
    ///
    /// # Panics
    /// If the type is already declared with other options.
    #[track_caller]
    pub fn declare_with(&self, type_name: &str, options: TargetOptions) -> Target {
        match self.try_declare_with(type_name, options) {
            Ok(target) => target,
            Err(err) => panic!("{err}"),
        }
    }

    /// Declare a mocked type with explicit options. Declaring a type again with the
    /// same options returns the existing target.
    pub fn try_declare_with(
        &self,
        type_name: &str,
        options: TargetOptions,
    ) -> Result<Target, MockError> {
        self.shared_state.declare(type_name, options)
    }

    /// Create a new instance of a declared type.
    ///
    /// Expectations recorded on the type apply to all of its instances. Expectations
    /// recorded on the returned target apply to this instance only.
    pub fn new_instance(&self, of_type: &Target) -> Result<Target, MockError> {
        self.shared_state.new_instance(of_type)
    }

    /// Record expectations.
    ///
    /// The block is validated when the closure returns. If it is rejected, none of its
    /// expectations take effect. Several record blocks may be used; later expectations
    /// are appended after earlier ones.
    pub fn record<F>(&self, f: F) -> Result<(), MockError>
    where
        F: FnOnce(&mut Recording),
    {
        self.shared_state.begin_record()?;

        let mut recording = Recording::new();
        f(&mut recording);
        let result = assemble::MockAssembler::new(&self.shared_state)
            .assemble(recording.entries, recording.iterations);

        self.shared_state.end_record();
        result
    }

    /// Entry point for interception providers: resolve an intercepted call.
    ///
    /// The call is always appended to the invocation log. An `Err` means API misuse,
    /// or a matcher that failed to evaluate.
    pub fn dispatch(
        &self,
        target: &Target,
        signature: &Signature,
        args: Vec<Value>,
    ) -> Result<Decision, MockError> {
        eval::EvalCtx::new(&self.shared_state).dispatch(target, signature, args)
    }

    /// Alias of [Mocks::dispatch].
    pub fn on_intercepted_call(
        &self,
        target: &Target,
        signature: &Signature,
        args: Vec<Value>,
    ) -> Result<Decision, MockError> {
        self.dispatch(target, signature, args)
    }

    /// A [Proxy] dispatching calls to `target` through this session.
    pub fn proxy(&self, target: &Target) -> Proxy<'_> {
        Proxy::new(self, target.clone())
    }

    /// Verify that the expectations declared in the block match the invocation log,
    /// regardless of order.
    ///
    /// The result also reports unexpected invocations and matcher errors collected
    /// since the previous verification.
    pub fn verify<'h, F>(&self, f: F) -> Result<(), Failure>
    where
        F: FnOnce(&mut Verification<'h>),
    {
        self.verify_with_mode(f, verify::VerifyMode { in_order: false, full: false })
    }

    /// Like [Mocks::verify], but the matching calls must have happened in the order of
    /// the block.
    pub fn verify_in_order<'h, F>(&self, f: F) -> Result<(), Failure>
    where
        F: FnOnce(&mut Verification<'h>),
    {
        self.verify_with_mode(f, verify::VerifyMode { in_order: true, full: false })
    }

    /// Like [Mocks::verify], but additionally every logged call on the types the block
    /// mentions must be covered by one of its expectations.
    pub fn verify_full<'h, F>(&self, f: F) -> Result<(), Failure>
    where
        F: FnOnce(&mut Verification<'h>),
    {
        self.verify_with_mode(f, verify::VerifyMode { in_order: false, full: true })
    }

    /// Combination of [Mocks::verify_in_order] and [Mocks::verify_full].
    pub fn verify_full_in_order<'h, F>(&self, f: F) -> Result<(), Failure>
    where
        F: FnOnce(&mut Verification<'h>),
    {
        self.verify_with_mode(f, verify::VerifyMode { in_order: true, full: true })
    }

    fn verify_with_mode<'h, F>(&self, f: F, mode: verify::VerifyMode) -> Result<(), Failure>
    where
        F: FnOnce(&mut Verification<'h>),
    {
        let mut verification = Verification::new();
        f(&mut verification);
        verify::Verifier::new(&self.shared_state).verify(verification, mode)
    }

    /// Snapshot of the invocation log, in call order.
    pub fn invocations(&self) -> Vec<Invocation> {
        self.shared_state.log.snapshot()
    }

    /// The session's current phase.
    pub fn phase(&self) -> Phase {
        self.shared_state.phase()
    }

    /// Close the session and run the final check: every recorded expectation must have
    /// reached its minimum count, and no unexpected invocation or matcher error may be
    /// pending.
    pub fn finish(mut self) -> Result<(), Failure> {
        self.torn_down = true;
        teardown::close_session(&self)
    }
}

impl Default for Mocks {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Mocks {
    fn clone(&self) -> Mocks {
        Mocks {
            shared_state: self.shared_state.clone(),
            original_instance: false,
            torn_down: false,
        }
    }
}

impl Drop for Mocks {
    fn drop(&mut self) {
        if self.torn_down {
            return;
        }

        if self.shared_state.config.verify_on_drop {
            teardown::teardown_panic(self);
        } else {
            self.torn_down = true;
            if self.original_instance {
                self.shared_state.close();
            }
        }
    }
}
