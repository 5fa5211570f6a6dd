use std::sync::{Arc, Mutex};

use crate::build::RecordedEntry;
use crate::counter::{CallCounter, CountBounds};
use crate::error::{MockError, MockResult};
use crate::expectation::{Expectation, Pattern};
use crate::matcher::ArgMatcher;
use crate::mock_target::MockTarget;
use crate::state::{lock, SharedState};
use crate::target::Strictness;

/// Turns a closed record block into expectations on their targets.
///
/// The whole block is validated before anything is appended, so a rejected block
/// leaves the session untouched.
pub(crate) struct MockAssembler<'s> {
    shared_state: &'s SharedState,
}

impl<'s> MockAssembler<'s> {
    pub fn new(shared_state: &'s SharedState) -> Self {
        Self { shared_state }
    }

    /// With more than one iteration, the block's ordered expectations are appended
    /// once per iteration, and the bounds of the others are multiplied.
    pub fn assemble(&self, entries: Vec<RecordedEntry>, iterations: usize) -> MockResult<()> {
        if iterations == 0 {
            return Err(MockError::InvalidIterations);
        }

        let mut assembled: Vec<(Arc<Mutex<MockTarget>>, Expectation)> =
            Vec::with_capacity(entries.len());

        for entry in entries {
            let mock_target = self.declared_target(&entry.pattern)?;
            check_pattern(&entry.pattern)?;

            let strictness = lock(&mock_target).options.strictness;
            let ordered = strictness == Strictness::Strict && !entry.unordered;
            let default_bounds = if ordered {
                CountBounds::exactly(1)
            } else {
                CountBounds::at_least(0)
            };
            let mut bounds = entry
                .quantifier
                .resolve(default_bounds, entry.script.len(), &entry.pattern)?;
            if !ordered {
                bounds = bounds.repeated(iterations);
            }

            tracing::trace!(
                pattern = entry.pattern.description(),
                %bounds,
                ordered,
                "recorded expectation"
            );

            assembled.push((
                mock_target,
                Expectation {
                    pattern: entry.pattern,
                    script: entry.script,
                    counter: CallCounter::new(bounds),
                    ordered,
                    last_matched: None,
                },
            ));
        }

        let sequence: Vec<usize> = (0..assembled.len())
            .filter(|index| assembled[*index].1.ordered)
            .collect();
        for _ in 1..iterations {
            for index in &sequence {
                let (mock_target, expectation) = &assembled[*index];
                let copy = (mock_target.clone(), expectation.rearmed());
                assembled.push(copy);
            }
        }

        tracing::debug!(
            expectations = assembled.len(),
            iterations,
            "assembled record block"
        );

        for (mock_target, expectation) in assembled {
            lock(&mock_target).add(expectation);
        }

        Ok(())
    }

    pub fn declared_target(&self, pattern: &Pattern) -> MockResult<Arc<Mutex<MockTarget>>> {
        self.shared_state
            .target(&pattern.target)
            .ok_or_else(|| MockError::UndeclaredTarget {
                target: pattern.target.to_string(),
            })
    }
}

/// Check that a pattern has one constraint per parameter, and that literal values
/// in it fit their parameter types.
pub(crate) fn check_pattern(pattern: &Pattern) -> MockResult<()> {
    let params = pattern.signature.params();
    if params.len() != pattern.args.len() {
        return Err(MockError::ArityMismatch {
            pattern: pattern.description().to_string(),
            expected: params.len(),
            actual: pattern.args.len(),
        });
    }

    for (index, (param, matcher)) in params.iter().zip(&pattern.args).enumerate() {
        let literals = match matcher {
            ArgMatcher::Exact(value) => vec![value],
            ArgMatcher::Range(lo, hi) => vec![lo, hi],
            ArgMatcher::Any | ArgMatcher::Predicate(_) => vec![],
        };

        if let Some(value) = literals.into_iter().find(|value| !param.admits(value)) {
            return Err(MockError::ArgumentType {
                call: pattern.description().to_string(),
                index,
                expected: param.to_string(),
                actual: value.type_name().to_string(),
            });
        }
    }

    Ok(())
}
