use std::fmt::{self, Display};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use predicates::Predicate;
use predicates_tree::CaseTreeExt;

use crate::mismatch::{ArgMismatch, ArgMismatchKind, ArgMismatchReporter};
use crate::value::Value;

/// A constraint on one argument slot of a recorded or verified call.
///
/// Build with [eq], [any], [range], [with], [try_with], [pred] and friends, or let
/// [args!](crate::args) convert plain values into [eq] matchers.
#[derive(Clone)]
pub enum ArgMatcher {
    /// Structural equality, with numeric widening.
    Exact(Value),
    /// Matches every value, including [Value::Null].
    Any,
    /// `lo <= actual <= hi` in the natural ordering of the value's type.
    Range(Value, Value),
    /// A user supplied predicate.
    Predicate(PredicateMatcher),
}

/// A matcher backed by a user supplied function.
#[derive(Clone)]
pub struct PredicateMatcher {
    description: Arc<str>,
    eval: Arc<dyn Fn(&Value) -> Result<bool, String> + Send + Sync>,
    explain: Option<Arc<dyn Fn(&Value) -> Option<String> + Send + Sync>>,
}

impl PredicateMatcher {
    /// Create a predicate matcher from a fallible function.
    pub fn new<F>(description: impl Into<Arc<str>>, eval: F) -> Self
    where
        F: Fn(&Value) -> Result<bool, String> + Send + Sync + 'static,
    {
        Self {
            description: description.into(),
            eval: Arc::new(eval),
            explain: None,
        }
    }
}

/// A predicate raised an error (or panicked) while evaluating an argument.
///
/// This always indicates a broken test fixture, so it is never treated as a plain mismatch.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("matcher {matcher} failed while evaluating {value}: {message}")]
pub struct MatcherError {
    pub(crate) matcher: String,
    pub(crate) value: String,
    pub(crate) message: String,
}

impl MatcherError {
    /// Description of the matcher that failed.
    pub fn matcher(&self) -> &str {
        &self.matcher
    }

    /// The error message raised by the predicate.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl ArgMatcher {
    /// Evaluate this matcher against an actual argument.
    pub fn matches(&self, actual: &Value) -> Result<bool, MatcherError> {
        Ok(match self {
            Self::Exact(expected) => expected == actual,
            Self::Any => true,
            Self::Range(lo, hi) => {
                matches!(
                    lo.partial_cmp(actual),
                    Some(std::cmp::Ordering::Less | std::cmp::Ordering::Equal)
                ) && matches!(
                    actual.partial_cmp(hi),
                    Some(std::cmp::Ordering::Less | std::cmp::Ordering::Equal)
                )
            }
            Self::Predicate(predicate) => {
                let outcome = catch_unwind(AssertUnwindSafe(|| (predicate.eval)(actual)));
                let result = match outcome {
                    Ok(result) => result,
                    Err(payload) => Err(panic_message(payload.as_ref())),
                };
                result.map_err(|message| MatcherError {
                    matcher: predicate.description.to_string(),
                    value: actual.to_string(),
                    message,
                })?
            }
        })
    }

    /// Like [ArgMatcher::matches], but reports the reason for a mismatch.
    pub(crate) fn matches_reporting(
        &self,
        input_index: usize,
        actual: &Value,
        reporter: &mut ArgMismatchReporter,
    ) -> Result<bool, MatcherError> {
        let matched = self.matches(actual)?;
        if !matched && reporter.enabled() {
            let (kind, explanation) = match self {
                Self::Exact(_) => (ArgMismatchKind::Eq, None),
                Self::Range(..) => (ArgMismatchKind::Range, None),
                Self::Any => (ArgMismatchKind::Predicate, None),
                Self::Predicate(predicate) => (
                    ArgMismatchKind::Predicate,
                    predicate.explain.as_ref().and_then(|explain| explain(actual)),
                ),
            };
            reporter.report(
                input_index,
                ArgMismatch {
                    kind,
                    actual: actual.to_string(),
                    expected: self.to_string(),
                    explanation,
                },
            );
        }
        Ok(matched)
    }

    /// Whether two matchers accept exactly the same values, as far as can be told
    /// without evaluating user code.
    pub(crate) fn is_equivalent(&self, other: &ArgMatcher) -> bool {
        match (self, other) {
            (Self::Exact(a), Self::Exact(b)) => a == b,
            (Self::Any, Self::Any) => true,
            (Self::Range(a_lo, a_hi), Self::Range(b_lo, b_hi)) => a_lo == b_lo && a_hi == b_hi,
            (Self::Predicate(a), Self::Predicate(b)) => Arc::ptr_eq(&a.eval, &b.eval),
            _ => false,
        }
    }
}

impl Display for ArgMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(value) => write!(f, "{value}"),
            Self::Any => write!(f, "_"),
            Self::Range(lo, hi) => write!(f, "{lo}..={hi}"),
            Self::Predicate(predicate) => write!(f, "{}", predicate.description),
        }
    }
}

impl fmt::Debug for ArgMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ArgMatcher({self})")
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("panicked: {msg}")
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("panicked: {msg}")
    } else {
        "panicked".to_string()
    }
}

/// Match a value by equality.
pub fn eq(value: impl Into<Value>) -> ArgMatcher {
    ArgMatcher::Exact(value.into())
}

/// Match any value.
pub fn any() -> ArgMatcher {
    ArgMatcher::Any
}

/// Match values within `lo..=hi`.
pub fn range(lo: impl Into<Value>, hi: impl Into<Value>) -> ArgMatcher {
    ArgMatcher::Range(lo.into(), hi.into())
}

/// Match values for which `f` returns true.
pub fn with<F>(f: F) -> ArgMatcher
where
    F: Fn(&Value) -> bool + Send + Sync + 'static,
{
    ArgMatcher::Predicate(PredicateMatcher::new("<predicate>", move |value| Ok(f(value))))
}

/// Match values with a fallible predicate. An `Err` is a fixture error, not a mismatch.
pub fn try_with<F, E>(f: F) -> ArgMatcher
where
    F: Fn(&Value) -> Result<bool, E> + Send + Sync + 'static,
    E: Display,
{
    ArgMatcher::Predicate(PredicateMatcher::new("<predicate>", move |value| {
        f(value).map_err(|err| err.to_string())
    }))
}

/// Adapt a [predicates] predicate. Its case tree is shown when an argument doesn't match.
pub fn pred<P>(predicate: P) -> ArgMatcher
where
    P: Predicate<Value> + Send + Sync + 'static,
{
    let predicate = Arc::new(predicate);
    let explainer = predicate.clone();

    ArgMatcher::Predicate(PredicateMatcher {
        description: predicate.to_string().into(),
        eval: Arc::new(move |value: &Value| Ok::<_, String>(predicate.eval(value))),
        explain: Some(Arc::new(move |value: &Value| {
            explainer
                .find_case(false, value)
                .map(|case| case.tree().to_string())
        })),
    })
}

/// Match values not equal to `value`.
pub fn ne(value: impl Into<Value>) -> ArgMatcher {
    let value = value.into();
    ArgMatcher::Predicate(PredicateMatcher::new(format!("ne({value})"), move |actual| {
        Ok(actual != &value)
    }))
}

/// Match [Value::Null] only.
pub fn null() -> ArgMatcher {
    ArgMatcher::Predicate(PredicateMatcher::new("null", |actual| Ok(actual.is_null())))
}

/// Match anything but [Value::Null].
pub fn not_null() -> ArgMatcher {
    ArgMatcher::Predicate(PredicateMatcher::new("not_null", |actual| {
        Ok(!actual.is_null())
    }))
}

/// Match numbers within `delta` of `value`.
pub fn approx(value: f64, delta: f64) -> ArgMatcher {
    ArgMatcher::Predicate(PredicateMatcher::new(
        format!("approx({value:?}, {delta:?})"),
        move |actual| Ok(actual.as_f64().map_or(false, |actual| (actual - value).abs() <= delta)),
    ))
}

/// Match strings containing `needle`.
pub fn contains(needle: impl Into<String>) -> ArgMatcher {
    let needle = needle.into();
    ArgMatcher::Predicate(PredicateMatcher::new(
        format!("contains({needle:?})"),
        move |actual| Ok(actual.as_str().map_or(false, |s| s.contains(needle.as_str()))),
    ))
}

/// Match strings starting with `prefix`.
pub fn prefix(prefix: impl Into<String>) -> ArgMatcher {
    let prefix = prefix.into();
    ArgMatcher::Predicate(PredicateMatcher::new(
        format!("starts_with({prefix:?})"),
        move |actual| Ok(actual.as_str().map_or(false, |s| s.starts_with(prefix.as_str()))),
    ))
}

/// Match strings ending with `suffix`.
pub fn suffix(suffix: impl Into<String>) -> ArgMatcher {
    let suffix = suffix.into();
    ArgMatcher::Predicate(PredicateMatcher::new(
        format!("ends_with({suffix:?})"),
        move |actual| Ok(actual.as_str().map_or(false, |s| s.ends_with(suffix.as_str()))),
    ))
}

/// Match strings against a regular expression.
///
/// An invalid expression surfaces as a [MatcherError] the first time the matcher runs.
pub fn matches_regex(pattern: &str) -> ArgMatcher {
    let description = format!("matches({pattern:?})");
    let compiled = regex::Regex::new(pattern).map_err(|err| err.to_string());

    ArgMatcher::Predicate(PredicateMatcher::new(description, move |actual| {
        let regex = compiled.as_ref().map_err(Clone::clone)?;
        Ok(actual.as_str().map_or(false, |s| regex.is_match(s)))
    }))
}

/// Conversion into an [ArgMatcher]. Plain values become [eq] matchers.
pub trait IntoArgMatcher {
    /// Perform the conversion.
    fn into_arg_matcher(self) -> ArgMatcher;
}

impl IntoArgMatcher for ArgMatcher {
    fn into_arg_matcher(self) -> ArgMatcher {
        self
    }
}

macro_rules! into_exact_matcher {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoArgMatcher for $ty {
                fn into_arg_matcher(self) -> ArgMatcher {
                    ArgMatcher::Exact(self.into())
                }
            }
        )*
    };
}

into_exact_matcher!(
    Value, bool, char, i8, i16, i32, i64, u8, u16, u32, u64, f32, f64, String, &str, Vec<u8>, (),
);

/// Build the argument constraint list of a recorded or verified call.
///
/// ```rust
/// use expectant::*;
/// let constraints = args![1, any(), "name"];
/// assert_eq!(3, constraints.len());
/// ```
#[macro_export]
macro_rules! args {
    ($($arg:expr),* $(,)?) => {
        ::std::vec![$($crate::IntoArgMatcher::into_arg_matcher($arg)),*]
    };
}
