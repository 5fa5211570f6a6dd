use crate::counter::CountBounds;
use crate::debug::CallSite;
use crate::error::MockError;
use crate::expectation::Pattern;
use crate::log::Invocation;
use crate::matcher::ArgMatcher;
use crate::responder::{Delegate, DelegateCall, ResultAction, Thrown};
use crate::target::{Signature, Target};
use crate::value::Value;

/// Explicit count constraints given in a builder. Unset sides fall back to defaults.
#[derive(Clone, Copy, Default, Debug)]
pub(crate) struct Quantifier {
    min: Option<usize>,
    max: Option<usize>,
}

impl Quantifier {
    fn exactly(&mut self, times: usize) {
        self.min = Some(times);
        self.max = Some(times);
    }

    /// Combine with `default`. When nothing was given and `script_len` exceeds the
    /// default maximum, the maximum is raised so every scripted result can be consumed.
    pub fn resolve(
        &self,
        default: CountBounds,
        script_len: usize,
        pattern: &Pattern,
    ) -> Result<CountBounds, MockError> {
        let bounds = match (self.min, self.max) {
            (Some(min), Some(max)) => CountBounds::between(min, max),
            (Some(min), None) => CountBounds::at_least(min),
            (None, Some(max)) => CountBounds::between(default.min.min(max), max),
            (None, None) => match default.max {
                Some(max) if script_len > max => CountBounds::between(default.min, script_len),
                _ => default,
            },
        };

        match bounds.max {
            Some(max) if !bounds.is_valid() => Err(MockError::InvalidBounds {
                pattern: pattern.description().to_string(),
                min: bounds.min,
                max,
            }),
            _ => Ok(bounds),
        }
    }
}

/// One expectation declared in a record block, not yet assembled.
pub(crate) struct RecordedEntry {
    pub pattern: Pattern,
    pub script: Vec<ResultAction>,
    pub quantifier: Quantifier,
    pub unordered: bool,
}

/// The recording-session handle passed to [Mocks::record](crate::Mocks::record).
///
/// Expectations declared here are validated and appended to their targets when the
/// record closure returns.
pub struct Recording {
    pub(crate) entries: Vec<RecordedEntry>,
    pub(crate) iterations: usize,
}

impl Recording {
    pub(crate) fn new() -> Self {
        Self {
            entries: vec![],
            iterations: 1,
        }
    }

    /// Expect the whole block to be exercised `iterations` times.
    ///
    /// The ordered expectations of strict targets are replayed as a sequence that
    /// repeats `iterations` times. The bounds of all other expectations are multiplied.
    pub fn iterations(&mut self, iterations: usize) -> &mut Self {
        self.iterations = iterations;
        self
    }

    /// Declare an expected call of `signature` on `target`, with one constraint per parameter.
    ///
    /// ```rust
    /// use expectant::*;
    ///
    /// let mocks = Mocks::new();
    /// let calc = mocks.strict("Calculator");
    /// let add = Signature::new("add").param(ValueType::I32).param(ValueType::I32).returns(ValueType::I32);
    ///
    /// mocks.record(|rec| {
    ///     rec.expect(&calc, &add, args![1, any()]).returns(10);
    /// }).unwrap();
    /// ```
    #[track_caller]
    pub fn expect(
        &mut self,
        target: &Target,
        signature: &Signature,
        args: Vec<ArgMatcher>,
    ) -> ExpectationBuilder<'_> {
        self.entries.push(RecordedEntry {
            pattern: Pattern::new(
                target.clone(),
                signature.clone(),
                args,
                CallSite::caller(),
            ),
            script: vec![],
            quantifier: Quantifier::default(),
            unordered: false,
        });

        let index = self.entries.len() - 1;
        ExpectationBuilder {
            entry: &mut self.entries[index],
        }
    }
}

/// Builder for the result script and count bounds of one recorded expectation.
///
/// Results are consumed one per matching call. The last one is repeated once the
/// script runs out.
pub struct ExpectationBuilder<'r> {
    entry: &'r mut RecordedEntry,
}

impl<'r> ExpectationBuilder<'r> {
    /// Append a returned value to the script.
    pub fn returns(self, value: impl Into<Value>) -> Self {
        self.action(ResultAction::Return(value.into()))
    }

    /// Append several returned values, one per consecutive call.
    pub fn returns_each<I>(mut self, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        for value in values {
            self = self.returns(value);
        }
        self
    }

    /// Append a raised error to the script.
    pub fn throws(self, error: impl Into<Thrown>) -> Self {
        self.action(ResultAction::Throw(error.into()))
    }

    /// Append a callback computing the result from the actual call.
    pub fn delegates<F>(self, f: F) -> Self
    where
        F: Fn(&DelegateCall<'_>) -> Result<Value, Thrown> + Send + Sync + 'static,
    {
        self.action(ResultAction::Delegate(Delegate::new(f)))
    }

    /// Append a call of the real method to the script.
    pub fn calls_real(self) -> Self {
        self.action(ResultAction::CallReal)
    }

    /// Append any scripted action.
    pub fn action(self, action: ResultAction) -> Self {
        self.entry.script.push(action);
        self
    }

    /// Expect exactly `times` matching calls.
    pub fn times(self, times: usize) -> Self {
        self.entry.quantifier.exactly(times);
        self
    }

    /// Expect at least `times` matching calls.
    pub fn min_times(self, times: usize) -> Self {
        self.entry.quantifier.min = Some(times);
        self
    }

    /// Expect at most `times` matching calls.
    pub fn max_times(self, times: usize) -> Self {
        self.entry.quantifier.max = Some(times);
        self
    }

    /// Expect no matching calls.
    pub fn never(self) -> Self {
        self.times(0)
    }

    /// Exempt this expectation from the recorded call order of a strict target.
    pub fn unordered(self) -> Self {
        self.entry.unordered = true;
        self
    }
}

/// Runs once for every call a verified expectation consumed.
pub(crate) type InvocationHandler<'h> = Box<dyn FnMut(&Invocation) + 'h>;

/// One expectation declared in a verification block.
pub(crate) struct VerifiedEntry<'h> {
    pub pattern: Pattern,
    pub quantifier: Quantifier,
    pub handler: Option<InvocationHandler<'h>>,
}

/// The handle passed to the verification blocks of [Mocks](crate::Mocks).
///
/// Expectations declared here are assertions about the invocation log. By default
/// each asserts exactly one matching call.
pub struct Verification<'h> {
    pub(crate) entries: Vec<VerifiedEntry<'h>>,
    /// Each gap is placed before the entry with this index.
    pub(crate) gaps: Vec<usize>,
    pub(crate) iterations: usize,
}

impl<'h> Verification<'h> {
    pub(crate) fn new() -> Self {
        Self {
            entries: vec![],
            gaps: vec![],
            iterations: 1,
        }
    }

    /// Assert calls of `signature` on `target` matching the given constraints.
    #[track_caller]
    pub fn expect(
        &mut self,
        target: &Target,
        signature: &Signature,
        args: Vec<ArgMatcher>,
    ) -> VerificationBuilder<'_, 'h> {
        self.entries.push(VerifiedEntry {
            pattern: Pattern::new(
                target.clone(),
                signature.clone(),
                args,
                CallSite::caller(),
            ),
            quantifier: Quantifier::default(),
            handler: None,
        });

        let index = self.entries.len() - 1;
        VerificationBuilder {
            entry: &mut self.entries[index],
        }
    }

    /// Mark where calls the block doesn't verify may have happened.
    ///
    /// Only allowed in in-order blocks. Once a block has a gap, each stretch of
    /// expectations between gaps must match consecutive calls on the verified types,
    /// and a stretch at the start or end of the block must match the first or last
    /// of those calls.
    ///
    /// ```rust
    /// use expectant::*;
    ///
    /// let mocks = Mocks::new();
    /// let doc = mocks.lenient("Document");
    /// let edit = Signature::new("edit");
    /// let save = Signature::new("save");
    ///
    /// mocks.proxy(&doc).call(&edit, vec![]).unwrap();
    /// mocks.proxy(&doc).call(&save, vec![]).unwrap();
    ///
    /// mocks.verify_in_order(|v| {
    ///     v.unverified();
    ///     v.expect(&doc, &save, args![]);
    /// }).unwrap();
    /// ```
    pub fn unverified(&mut self) -> &mut Self {
        self.gaps.push(self.entries.len());
        self
    }

    /// Verify the whole block `iterations` times.
    ///
    /// An in-order block is checked as if its expectations were written out
    /// `iterations` times in a row. Otherwise every count bound is multiplied.
    pub fn iterations(&mut self, iterations: usize) -> &mut Self {
        self.iterations = iterations;
        self
    }
}

/// Builder for the count bounds of one verified expectation.
pub struct VerificationBuilder<'v, 'h> {
    entry: &'v mut VerifiedEntry<'h>,
}

impl<'v, 'h> VerificationBuilder<'v, 'h> {
    /// Assert exactly `times` matching calls.
    pub fn times(self, times: usize) -> Self {
        self.entry.quantifier.exactly(times);
        self
    }

    /// Assert at least `times` matching calls.
    pub fn min_times(self, times: usize) -> Self {
        self.entry.quantifier.min = Some(times);
        self
    }

    /// Assert at most `times` matching calls.
    pub fn max_times(self, times: usize) -> Self {
        self.entry.quantifier.max = Some(times);
        self
    }

    /// Assert that no matching call happened.
    pub fn never(self) -> Self {
        self.times(0)
    }

    /// Run `handler` on every call this expectation accounts for, in call order.
    ///
    /// In-order blocks hand over the calls consumed at this position of the block.
    /// Other blocks hand over every matching call. Handlers run after the checks, also
    /// when verification fails.
    pub fn for_each<F>(self, handler: F) -> Self
    where
        F: FnMut(&Invocation) + 'h,
    {
        self.entry.handler = Some(Box::new(handler));
        self
    }
}
