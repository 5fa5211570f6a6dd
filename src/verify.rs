use crate::assemble::{check_pattern, MockAssembler};
use crate::build::{InvocationHandler, Verification};
use crate::counter::CountBounds;
use crate::error::{Failure, Mismatch, MockError};
use crate::expectation::Pattern;
use crate::log::Invocation;
use crate::state::SharedState;

/// How a verification block is checked against the invocation log.
#[derive(Clone, Copy, Debug)]
pub(crate) struct VerifyMode {
    pub in_order: bool,
    pub full: bool,
}

struct Verified<'h> {
    pattern: Pattern,
    bounds: CountBounds,
    /// Log positions of matching invocations.
    positions: Vec<usize>,
    handler: Option<InvocationHandler<'h>>,
}

/// One position of an in-order block, after iterations are written out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Step {
    Expect(usize),
    /// Calls the block doesn't verify may happen here.
    Gap,
}

pub(crate) struct Verifier<'s> {
    shared_state: &'s SharedState,
}

impl<'s> Verifier<'s> {
    pub fn new(shared_state: &'s SharedState) -> Self {
        Self { shared_state }
    }

    pub fn verify(&self, verification: Verification<'_>, mode: VerifyMode) -> Result<(), Failure> {
        if let Err(err) = self.shared_state.begin_verify() {
            return Failure::from_mismatches(vec![Mismatch::Misuse(err)]);
        }

        let mut mismatches = self.shared_state.drain_pending();
        let log = self.shared_state.log.snapshot();

        let (mut verified, steps) = match self.prepare(verification, mode, &log, &mut mismatches) {
            Ok(prepared) => prepared,
            Err(err) => {
                mismatches.push(Mismatch::Misuse(err));
                return Failure::from_mismatches(mismatches);
            }
        };

        let consumed = if mode.in_order {
            let runs = check_in_order(&verified, &steps, &log, &mut mismatches);
            if steps.contains(&Step::Gap) {
                check_gaps(&verified, &steps, &runs, &log, &mut mismatches);
            } else if mode.full {
                check_full(&verified, &log, &mut mismatches);
            }
            consumed_by_steps(verified.len(), &steps, runs)
        } else {
            check_counts(&verified, &mut mismatches);
            if mode.full {
                check_full(&verified, &log, &mut mismatches);
            }
            verified.iter().map(|entry| entry.positions.clone()).collect()
        };

        tracing::debug!(
            expectations = verified.len(),
            invocations = log.len(),
            mismatches = mismatches.len(),
            in_order = mode.in_order,
            full = mode.full,
            "verified invocations"
        );

        for (entry, positions) in verified.iter_mut().zip(consumed) {
            if let Some(handler) = entry.handler.as_mut() {
                for position in positions {
                    handler(&log[position]);
                }
            }
        }

        Failure::from_mismatches(mismatches)
    }

    fn prepare<'h>(
        &self,
        verification: Verification<'h>,
        mode: VerifyMode,
        log: &[Invocation],
        mismatches: &mut Vec<Mismatch>,
    ) -> Result<(Vec<Verified<'h>>, Vec<Step>), MockError> {
        let Verification {
            entries,
            gaps,
            iterations,
        } = verification;

        if iterations == 0 {
            return Err(MockError::InvalidIterations);
        }
        if !mode.in_order && !gaps.is_empty() {
            return Err(MockError::UnverifiedOutsideOrder);
        }

        let assembler = MockAssembler::new(self.shared_state);
        let mut verified = Vec::with_capacity(entries.len());
        let mut block = vec![];

        for (index, entry) in entries.into_iter().enumerate() {
            assembler.declared_target(&entry.pattern)?;
            check_pattern(&entry.pattern)?;
            let mut bounds = entry
                .quantifier
                .resolve(CountBounds::exactly(1), 0, &entry.pattern)?;
            if !mode.in_order {
                bounds = bounds.repeated(iterations);
            }

            let mut positions = vec![];
            for (position, invocation) in log.iter().enumerate() {
                match entry.pattern.matches(invocation) {
                    Ok(true) => positions.push(position),
                    Ok(false) => {}
                    Err(err) => mismatches.push(Mismatch::MatcherEvaluation(err)),
                }
            }

            block.extend(gaps.iter().filter(|gap| **gap == index).map(|_| Step::Gap));
            block.push(Step::Expect(index));
            verified.push(Verified {
                pattern: entry.pattern,
                bounds,
                positions,
                handler: entry.handler,
            });
        }
        block.extend(gaps.iter().filter(|gap| **gap == verified.len()).map(|_| Step::Gap));

        let steps = if mode.in_order {
            block.repeat(iterations)
        } else {
            block
        };

        Ok((verified, steps))
    }
}

fn check_counts(verified: &[Verified<'_>], mismatches: &mut Vec<Mismatch>) {
    for Verified {
        pattern,
        bounds,
        positions,
        ..
    } in verified
    {
        let actual = positions.len();
        if actual < bounds.min {
            mismatches.push(Mismatch::MissingInvocation {
                expectation: pattern.description().to_string(),
                bounds: *bounds,
                actual,
            });
        } else if bounds.is_exceeded_by(actual) {
            mismatches.push(Mismatch::TooManyInvocations {
                expectation: pattern.description().to_string(),
                bounds: *bounds,
                actual,
            });
        }
    }
}

/// `(step, expectation)` for every expectation step of a block.
fn expectation_steps(steps: &[Step]) -> impl Iterator<Item = (usize, usize)> + '_ {
    steps.iter().enumerate().filter_map(|(step, kind)| match kind {
        Step::Expect(index) => Some((step, *index)),
        Step::Gap => None,
    })
}

/// Walk the log with a cursor. Each expectation consumes its matches from the cursor
/// up to where the next expectation's required matches begin.
///
/// Returns the log positions each step consumed.
fn check_in_order(
    verified: &[Verified<'_>],
    steps: &[Step],
    log: &[Invocation],
    mismatches: &mut Vec<Mismatch>,
) -> Vec<Vec<usize>> {
    let mut runs = vec![vec![]; steps.len()];
    let mut consumed = vec![false; log.len()];
    let mut cursor = 0;

    for (step, index) in expectation_steps(steps) {
        let Verified {
            pattern,
            bounds,
            positions,
            ..
        } = &verified[index];
        let ahead: Vec<usize> = positions.iter().copied().filter(|p| *p >= cursor).collect();

        if bounds.max == Some(0) {
            if !ahead.is_empty() {
                mismatches.push(Mismatch::TooManyInvocations {
                    expectation: pattern.description().to_string(),
                    bounds: *bounds,
                    actual: ahead.len(),
                });
            }
            continue;
        }

        if ahead.len() < bounds.min {
            let behind: Vec<usize> = positions
                .iter()
                .copied()
                .filter(|p| *p < cursor && !consumed[*p])
                .collect();
            match behind.first() {
                Some(first) if behind.len() + ahead.len() >= bounds.min => {
                    mismatches.push(Mismatch::UnorderedInvocation {
                        expectation: pattern.description().to_string(),
                        invocation: log[*first].clone(),
                    });
                }
                _ => mismatches.push(Mismatch::MissingInvocation {
                    expectation: pattern.description().to_string(),
                    bounds: *bounds,
                    actual: ahead.len(),
                }),
            }
            continue;
        }

        let required_end = match bounds.min {
            0 => cursor,
            min => ahead[min - 1] + 1,
        };
        let boundary = expectation_steps(&steps[step + 1..])
            .map(|(_, next)| &verified[next])
            .find(|next| next.bounds.max != Some(0))
            .and_then(|next| next.positions.iter().copied().find(|p| *p >= required_end))
            .unwrap_or(usize::MAX);

        let run: Vec<usize> = ahead.into_iter().filter(|p| *p < boundary).collect();
        if let Some(last) = run.last() {
            cursor = last + 1;
        }
        for position in &run {
            consumed[*position] = true;
        }
        runs[step] = run;
    }

    check_run_counts(verified, steps, &runs, log.len(), mismatches);
    runs
}

/// Compare each step's calls with its maximum. Matching calls that come after the
/// following steps' calls and that no step consumed count towards the last step of
/// the same expectation.
fn check_run_counts(
    verified: &[Verified<'_>],
    steps: &[Step],
    runs: &[Vec<usize>],
    log_len: usize,
    mismatches: &mut Vec<Mismatch>,
) {
    let consumed = mark(runs, log_len);

    for (step, index) in expectation_steps(steps) {
        let Some(first) = runs[step].first() else {
            continue;
        };
        let Verified {
            pattern,
            bounds,
            positions,
            ..
        } = &verified[index];

        let is_last = !steps[step + 1..].contains(&Step::Expect(index));
        let trailing = if is_last {
            positions
                .iter()
                .filter(|position| **position > *first && !consumed[**position])
                .count()
        } else {
            0
        };

        let actual = runs[step].len() + trailing;
        if bounds.is_exceeded_by(actual) {
            mismatches.push(Mismatch::TooManyInvocations {
                expectation: pattern.description().to_string(),
                bounds: *bounds,
                actual,
            });
        }
    }
}

/// With gaps in a block, every stretch of steps between gaps must consume consecutive
/// calls on the verified types. The first and last stretch are anchored to the start
/// and end of the log unless the block starts or ends with a gap.
fn check_gaps(
    verified: &[Verified<'_>],
    steps: &[Step],
    runs: &[Vec<usize>],
    log: &[Invocation],
    mismatches: &mut Vec<Mismatch>,
) {
    let consumed = mark(runs, log.len());
    let in_scope: Vec<bool> = log.iter().map(|invocation| in_scope(verified, invocation)).collect();

    let mut stretches = vec![];
    let mut start = 0;
    for (step, kind) in steps.iter().enumerate() {
        if *kind == Step::Gap {
            stretches.push(start..step);
            start = step + 1;
        }
    }
    stretches.push(start..steps.len());

    let last = stretches.len() - 1;
    for (n, stretch) in stretches.into_iter().enumerate() {
        let span = runs[stretch].iter().flatten().copied();
        let (Some(lo), Some(hi)) = (span.clone().min(), span.max()) else {
            continue;
        };

        let from = if n == 0 { 0 } else { lo };
        let to = if n == last { log.len() } else { hi + 1 };
        for position in from..to {
            if in_scope[position] && !consumed[position] {
                mismatches.push(Mismatch::UnverifiedInvocation {
                    invocation: log[position].clone(),
                });
            }
        }
    }
}

/// Every logged call on a verified type must be covered by some expectation of the block.
fn check_full(verified: &[Verified<'_>], log: &[Invocation], mismatches: &mut Vec<Mismatch>) {
    let mut covered = vec![false; log.len()];
    for entry in verified {
        for position in &entry.positions {
            covered[*position] = true;
        }
    }

    for (position, invocation) in log.iter().enumerate() {
        if in_scope(verified, invocation) && !covered[position] {
            mismatches.push(Mismatch::UnverifiedInvocation {
                invocation: invocation.clone(),
            });
        }
    }
}

/// Whether the block mentions the type of the invocation.
fn in_scope(verified: &[Verified<'_>], invocation: &Invocation) -> bool {
    verified
        .iter()
        .any(|entry| entry.pattern.target.type_name() == invocation.target().type_name())
}

fn mark(runs: &[Vec<usize>], log_len: usize) -> Vec<bool> {
    let mut consumed = vec![false; log_len];
    for position in runs.iter().flatten() {
        consumed[*position] = true;
    }
    consumed
}

/// The consumed log positions of each expectation, over all of its steps.
fn consumed_by_steps(expectations: usize, steps: &[Step], runs: Vec<Vec<usize>>) -> Vec<Vec<usize>> {
    let mut consumed = vec![vec![]; expectations];
    for (step, run) in steps.iter().zip(runs) {
        if let Step::Expect(index) = step {
            consumed[*index].extend(run);
        }
    }
    for positions in &mut consumed {
        positions.sort_unstable();
        positions.dedup();
    }
    consumed
}
