use std::fmt::Write;

use crate::counter::{CountBounds, NCalls};
use crate::log::Invocation;
use crate::matcher::MatcherError;
use crate::mismatch::ArgMismatches;
use crate::state::Phase;
use crate::target::TargetOptions;

pub(crate) type MockResult<T> = Result<T, MockError>;

/// Misuse of the mocking API. Returned synchronously from the call that caused it.
#[derive(Clone, Debug, thiserror::Error)]
pub enum MockError {
    /// A call or pattern names a type that was never declared in the session.
    #[error("{target} is not a declared mock target")]
    UndeclaredTarget {
        /// The offending target.
        target: String,
    },
    /// The number of argument constraints or values differs from the signature's arity.
    #[error("{pattern}: expected {expected} arguments, got {actual}")]
    ArityMismatch {
        /// The pattern or call with the wrong argument count.
        pattern: String,
        /// Arity of the signature.
        expected: usize,
        /// Number of arguments given.
        actual: usize,
    },
    /// An argument value does not fit its parameter type.
    #[error("{call}: argument #{index} of type {actual} does not fit parameter type {expected}")]
    ArgumentType {
        /// The offending call.
        call: String,
        /// Zero-based argument index.
        index: usize,
        /// The declared parameter type.
        expected: String,
        /// The type of the value passed.
        actual: String,
    },
    /// Minimum call count exceeds maximum.
    #[error("{pattern}: minimum of {min} calls exceeds maximum of {max}")]
    InvalidBounds {
        /// The pattern with contradictory bounds.
        pattern: String,
        /// Requested minimum.
        min: usize,
        /// Requested maximum.
        max: usize,
    },
    /// A record or verification block was given zero iterations.
    #[error("a block must run at least one iteration")]
    InvalidIterations,
    /// An `unverified` gap was placed in a verification block that doesn't check order.
    #[error("unverified invocations can only be placed in an in-order verification block")]
    UnverifiedOutsideOrder,
    /// The operation is not allowed in the session's current phase.
    #[error("cannot {operation} while the session is {phase}")]
    InvalidPhase {
        /// What was attempted.
        operation: &'static str,
        /// The phase the session was in.
        phase: Phase,
    },
    /// The session has been finished; no further calls are dispatched.
    #[error("the mock session is closed")]
    SessionClosed,
    /// A type was declared twice with different options.
    #[error("{target} is already declared as {existing}, cannot redeclare it as {requested}")]
    ConflictingDeclaration {
        /// The redeclared type.
        target: String,
        /// Options of the first declaration.
        existing: TargetOptions,
        /// Options of the rejected declaration.
        requested: TargetOptions,
    },
    /// A user predicate failed while matching a call.
    #[error(transparent)]
    MatcherEvaluation(#[from] MatcherError),
}

/// Why a replayed call was flagged as unexpected.
#[derive(Clone, Debug)]
pub enum UnexpectedReason {
    /// A recorded expectation matches, but an earlier one still waits for its calls.
    OutOfOrder {
        /// The expectation that should have been called next.
        expected: String,
    },
    /// Every matching expectation has used up its maximum count.
    ExceededMaxTimes {
        /// The exhausted expectation.
        expectation: String,
        /// Its bounds.
        bounds: CountBounds,
    },
    /// No recorded expectation accepts the arguments.
    NoMatch(ArgMismatches),
}

/// One discrepancy between the declared expectations and what the test did.
#[derive(Clone, Debug, thiserror::Error)]
pub enum Mismatch {
    /// A call matched no expectation, or exceeded its maximum count.
    #[error("{}", describe_unexpected(.invocation, .reason))]
    UnexpectedInvocation {
        /// The offending call.
        invocation: Invocation,
        /// How it was classified.
        reason: UnexpectedReason,
    },
    /// An expectation saw fewer calls than its minimum.
    #[error("Missing invocation of {expectation}: expected {bounds}, but got {}.", NCalls(*.actual))]
    MissingInvocation {
        /// The deficient expectation.
        expectation: String,
        /// Its bounds.
        bounds: CountBounds,
        /// Number of matching calls observed.
        actual: usize,
    },
    /// A verified expectation saw more calls than its maximum.
    #[error("Unexpected invocations of {expectation}: expected {bounds}, but got {}.", NCalls(*.actual))]
    TooManyInvocations {
        /// The exceeded expectation.
        expectation: String,
        /// Its bounds.
        bounds: CountBounds,
        /// Number of matching calls observed.
        actual: usize,
    },
    /// The calls of an ordered verification block happened in a different sequence.
    #[error("Unordered invocation of {expectation}: its matching call {invocation} happened before the preceding verified calls.")]
    UnorderedInvocation {
        /// The expectation found out of sequence.
        expectation: String,
        /// The earliest matching call, located before the verification cursor.
        invocation: Invocation,
    },
    /// A user predicate raised an error during matching.
    #[error("Matcher evaluation error: {0}")]
    MatcherEvaluation(MatcherError),
    /// Full verification found a call on a verified target that no expectation covers.
    #[error("Unverified invocation {invocation}.")]
    UnverifiedInvocation {
        /// The uncovered call.
        invocation: Invocation,
    },
    /// The verification block itself was malformed.
    #[error("Invalid verification: {0}")]
    Misuse(MockError),
}

/// The category of a [Mismatch].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MismatchKind {
    Unexpected,
    Missing,
    TooMany,
    Unordered,
    MatcherEvaluation,
    Unverified,
    Misuse,
}

impl Mismatch {
    /// The category of this mismatch.
    pub fn kind(&self) -> MismatchKind {
        match self {
            Self::UnexpectedInvocation { .. } => MismatchKind::Unexpected,
            Self::MissingInvocation { .. } => MismatchKind::Missing,
            Self::TooManyInvocations { .. } => MismatchKind::TooMany,
            Self::UnorderedInvocation { .. } => MismatchKind::Unordered,
            Self::MatcherEvaluation(_) => MismatchKind::MatcherEvaluation,
            Self::UnverifiedInvocation { .. } => MismatchKind::Unverified,
            Self::Misuse(_) => MismatchKind::Misuse,
        }
    }
}

fn describe_unexpected(invocation: &Invocation, reason: &UnexpectedReason) -> String {
    match reason {
        UnexpectedReason::OutOfOrder { expected } => {
            format!("Unexpected invocation {invocation}: called out of order. Expected a call matching {expected}.")
        }
        UnexpectedReason::ExceededMaxTimes {
            expectation,
            bounds,
        } => {
            format!("Unexpected invocation {invocation}: {expectation} allows {bounds}, and was already satisfied.")
        }
        UnexpectedReason::NoMatch(mismatches) if mismatches.is_empty() => {
            format!("Unexpected invocation {invocation}: no matching expectations.")
        }
        UnexpectedReason::NoMatch(mismatches) => {
            format!("Unexpected invocation {invocation}: no matching expectations.{mismatches}")
        }
    }
}

/// Aggregated outcome of a failed verification or teardown check.
#[derive(Clone, Debug, thiserror::Error)]
#[error("{}", render_failure(.mismatches))]
pub struct Failure {
    mismatches: Vec<Mismatch>,
}

impl Failure {
    pub(crate) fn from_mismatches(mismatches: Vec<Mismatch>) -> Result<(), Self> {
        if mismatches.is_empty() {
            Ok(())
        } else {
            Err(Self { mismatches })
        }
    }

    /// The discrepancies, in the order they were detected.
    pub fn mismatches(&self) -> &[Mismatch] {
        &self.mismatches
    }

    /// Categories of the discrepancies, in order.
    pub fn kinds(&self) -> Vec<MismatchKind> {
        self.mismatches.iter().map(Mismatch::kind).collect()
    }

    /// Whether any discrepancy has the given category.
    pub fn has(&self, kind: MismatchKind) -> bool {
        self.mismatches.iter().any(|mismatch| mismatch.kind() == kind)
    }

    /// Consume into the list of discrepancies.
    pub fn into_mismatches(self) -> Vec<Mismatch> {
        self.mismatches
    }
}

fn render_failure(mismatches: &[Mismatch]) -> String {
    let mut out = String::new();
    if mismatches.len() == 1 {
        out.push_str("Mock verification failed:");
    } else {
        let _ = write!(out, "Mock verification failed with {} errors:", mismatches.len());
    }
    for (index, mismatch) in mismatches.iter().enumerate() {
        let _ = write!(out, "\n{}. {mismatch}", index + 1);
    }
    out
}
