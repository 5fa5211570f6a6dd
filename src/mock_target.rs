use std::cmp::Ordering;

use crate::counter::CountBounds;
use crate::error::{Mismatch, MockError, MockResult, UnexpectedReason};
use crate::expectation::Expectation;
use crate::log::Invocation;
use crate::matcher::MatcherError;
use crate::mismatch::{ArgMismatchReporter, ArgMismatches};
use crate::responder::ResultAction;
use crate::target::{Strictness, Target, TargetOptions};

/// Outcome of resolving one call against a target's expectations.
pub(crate) enum Resolution {
    Matched {
        /// Index of the answering expectation.
        index: usize,
        call_index: usize,
        bounds: CountBounds,
        action: ResultAction,
    },
    /// Lenient target, nothing matched.
    Unmatched,
    Unexpected(UnexpectedReason),
}

/// Holds all the expectation state of one mocked type during a session.
///
/// Instances of the type share this state; instance patterns are told apart by
/// [Target::covers].
pub(crate) struct MockTarget {
    pub target: Target,
    pub options: TargetOptions,
    pub expectations: Vec<Expectation>,
    /// Index of the last matched ordered expectation.
    cursor: Option<usize>,
    match_seq: u64,
}

impl MockTarget {
    pub fn new(target: Target, options: TargetOptions) -> Self {
        Self {
            target,
            options,
            expectations: vec![],
            cursor: None,
            match_seq: 0,
        }
    }

    /// Append a recorded expectation. On lenient targets an identical earlier
    /// expectation is replaced instead.
    pub fn add(&mut self, expectation: Expectation) {
        if self.options.strictness == Strictness::Lenient {
            if let Some(existing) = self
                .expectations
                .iter_mut()
                .find(|existing| existing.pattern.is_identical(&expectation.pattern))
            {
                *existing = expectation;
                return;
            }
        }

        self.expectations.push(expectation);
    }

    pub fn resolve(&mut self, invocation: &Invocation) -> Result<Resolution, MatcherError> {
        match self.options.strictness {
            Strictness::Strict => self.resolve_strict(invocation),
            Strictness::Lenient => self.resolve_lenient(invocation),
        }
    }

    fn resolve_strict(&mut self, invocation: &Invocation) -> Result<Resolution, MatcherError> {
        let mut blocked_by = None;

        for index in self.cursor.unwrap_or(0)..self.expectations.len() {
            let expectation = &self.expectations[index];
            if !expectation.ordered {
                continue;
            }

            if expectation.counter.has_capacity() && expectation.pattern.matches(invocation)? {
                self.cursor = Some(index);
                return Ok(self.accept(index));
            }

            if !expectation.counter.is_satisfied() {
                blocked_by = Some(index);
                break;
            }
        }

        for index in 0..self.expectations.len() {
            let expectation = &self.expectations[index];
            if !expectation.ordered
                && expectation.counter.has_capacity()
                && expectation.pattern.matches(invocation)?
            {
                return Ok(self.accept(index));
            }
        }

        Ok(Resolution::Unexpected(self.classify(invocation, blocked_by)?))
    }

    fn resolve_lenient(&mut self, invocation: &Invocation) -> Result<Resolution, MatcherError> {
        let mut candidates: Vec<usize> = (0..self.expectations.len()).collect();
        candidates.sort_by(|a, b| {
            match (
                self.expectations[*a].last_matched,
                self.expectations[*b].last_matched,
            ) {
                (Some(a), Some(b)) => b.cmp(&a),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
        });

        let mut exhausted = None;
        for index in candidates {
            let expectation = &self.expectations[index];
            if !expectation.pattern.matches(invocation)? {
                continue;
            }

            if expectation.counter.has_capacity() {
                return Ok(self.accept(index));
            }

            exhausted.get_or_insert(index);
        }

        Ok(match exhausted {
            Some(index) => Resolution::Unexpected(self.exceeded(index)),
            None => Resolution::Unmatched,
        })
    }

    fn accept(&mut self, index: usize) -> Resolution {
        self.match_seq += 1;
        let expectation = &mut self.expectations[index];
        let (call_index, action) = expectation.accept(self.match_seq);

        Resolution::Matched {
            index,
            call_index,
            bounds: expectation.counter.bounds(),
            action,
        }
    }

    /// Replace the bounds of an expectation, as requested by its delegate.
    pub fn update_bounds(&mut self, index: usize, bounds: CountBounds) -> MockResult<()> {
        let Some(expectation) = self.expectations.get_mut(index) else {
            return Ok(());
        };

        match bounds.max {
            Some(max) if !bounds.is_valid() => Err(MockError::InvalidBounds {
                pattern: expectation.pattern.description().to_string(),
                min: bounds.min,
                max,
            }),
            _ => {
                expectation.counter.set_bounds(bounds);
                Ok(())
            }
        }
    }

    fn classify(
        &self,
        invocation: &Invocation,
        blocked_by: Option<usize>,
    ) -> Result<UnexpectedReason, MatcherError> {
        let mut exhausted = None;

        for (index, expectation) in self.expectations.iter().enumerate() {
            if !expectation.pattern.matches(invocation)? {
                continue;
            }

            if expectation.counter.has_capacity() {
                let expected = match blocked_by {
                    Some(blocker) => self.expectations[blocker].pattern.description().to_string(),
                    None => "nothing further, the recorded sequence is complete".to_string(),
                };
                return Ok(UnexpectedReason::OutOfOrder { expected });
            }

            exhausted.get_or_insert(index);
        }

        if let Some(index) = exhausted {
            return Ok(self.exceeded(index));
        }

        let mut mismatches = ArgMismatches::new();
        for (pat_index, expectation) in self.expectations.iter().enumerate() {
            if expectation.pattern.targets(invocation) {
                let mut reporter = ArgMismatchReporter::new_enabled();
                expectation.pattern.matches_reporting(invocation, &mut reporter)?;
                mismatches.collect_from_reporter(pat_index, reporter);
            }
        }

        Ok(UnexpectedReason::NoMatch(mismatches))
    }

    fn exceeded(&self, index: usize) -> UnexpectedReason {
        let expectation = &self.expectations[index];
        UnexpectedReason::ExceededMaxTimes {
            expectation: expectation.pattern.description().to_string(),
            bounds: expectation.counter.bounds(),
        }
    }

    /// Report every expectation that has not reached its minimum.
    pub fn collect_deficits(&self, mismatches: &mut Vec<Mismatch>) {
        for expectation in &self.expectations {
            if !expectation.counter.is_satisfied() {
                mismatches.push(Mismatch::MissingInvocation {
                    expectation: expectation.pattern.description().to_string(),
                    bounds: expectation.counter.bounds(),
                    actual: expectation.counter.count(),
                });
            }
        }
    }
}
