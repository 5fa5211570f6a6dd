use std::{collections::HashSet, fmt::Display};

/// Why recorded patterns of the right method rejected the arguments of a call.
///
/// Only collected for diagnostics: one entry per rejected argument, per candidate pattern.
#[derive(Clone, Debug, Default)]
pub struct ArgMismatches {
    mismatches: Vec<(usize, usize, ArgMismatch)>,
}

impl ArgMismatches {
    pub(crate) fn new() -> Self {
        Self { mismatches: vec![] }
    }

    pub(crate) fn collect_from_reporter(&mut self, pat_index: usize, reporter: ArgMismatchReporter) {
        for (input_index, mismatch) in reporter.mismatches {
            self.mismatches.push((pat_index, input_index, mismatch));
        }
    }

    /// Whether no argument-level explanation was collected.
    pub fn is_empty(&self) -> bool {
        self.mismatches.is_empty()
    }

    /// Number of rejected arguments.
    pub fn len(&self) -> usize {
        self.mismatches.len()
    }

    fn has_unique_pat_index(&self) -> bool {
        let mut pat_indexes = HashSet::new();
        for (pat_index, _, _) in &self.mismatches {
            pat_indexes.insert(*pat_index);
        }

        pat_indexes.len() <= 1
    }
}

impl Display for ArgMismatches {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let is_unique_pat = self.has_unique_pat_index();

        for (pat_index, input_index, mismatch) in &self.mismatches {
            let ArgMismatch {
                kind,
                actual,
                expected,
                explanation,
            } = mismatch;

            writeln!(f)?;
            let mut header_msg = MismatchMsg::new(*pat_index, *input_index, is_unique_pat, *kind);

            match kind {
                ArgMismatchKind::Eq if actual == expected => {
                    header_msg.fmt(f)?;
                    write!(f, "Actual value did not equal expected value, but their representations are identical: {actual}")?;
                }
                ArgMismatchKind::Eq => {
                    header_msg.has_comparison = true;
                    header_msg.fmt(f)?;
                    Diff::new(actual, expected).fmt(f)?;
                }
                ArgMismatchKind::Range => {
                    header_msg.fmt(f)?;
                    write!(f, "{actual} is outside {expected}")?;
                }
                ArgMismatchKind::Predicate => {
                    header_msg.fmt(f)?;
                    write!(f, "{actual} rejected by {expected}")?;
                    if let Some(explanation) = explanation {
                        write!(f, "\n{explanation}")?;
                    }
                }
            }
        }

        Ok(())
    }
}

#[derive(Clone, Debug)]
pub(crate) struct ArgMismatch {
    pub kind: ArgMismatchKind,
    pub actual: String,
    pub expected: String,
    pub explanation: Option<String>,
}

#[derive(Clone, Copy, Debug)]
pub(crate) enum ArgMismatchKind {
    Eq,
    Range,
    Predicate,
}

/// Collects per-argument mismatches while a pattern is evaluated.
///
/// Disabled reporters skip rendering, which keeps the hot dispatch path cheap.
pub(crate) struct ArgMismatchReporter {
    enabled: bool,
    mismatches: Vec<(usize, ArgMismatch)>,
}

impl ArgMismatchReporter {
    pub fn new_enabled() -> Self {
        Self {
            enabled: true,
            mismatches: vec![],
        }
    }

    pub fn new_disabled() -> Self {
        Self {
            enabled: false,
            mismatches: vec![],
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn report(&mut self, input_index: usize, mismatch: ArgMismatch) {
        self.mismatches.push((input_index, mismatch));
    }

    #[cfg(test)]
    pub fn into_mismatches(self) -> Vec<(usize, ArgMismatch)> {
        self.mismatches
    }
}

struct MismatchMsg {
    pat_index: usize,
    input_index: usize,
    is_unique_pat: bool,
    kind: ArgMismatchKind,
    has_comparison: bool,
}

impl MismatchMsg {
    fn new(pat_index: usize, input_index: usize, is_unique_pat: bool, kind: ArgMismatchKind) -> Self {
        Self {
            pat_index,
            input_index,
            is_unique_pat,
            kind,
            has_comparison: false,
        }
    }
}

impl Display for MismatchMsg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let initial_msg = match self.kind {
            ArgMismatchKind::Eq => "Equality mismatch for ",
            ArgMismatchKind::Range => "Range mismatch for ",
            ArgMismatchKind::Predicate => "Predicate mismatch for ",
        };

        write!(f, "{initial_msg}")?;

        if self.is_unique_pat {
            write!(f, "argument #{}", self.input_index)?;
        } else {
            write!(
                f,
                "expectation #{}, argument #{}",
                self.pat_index, self.input_index
            )?;
        }

        if self.has_comparison {
            write!(f, " (actual / expected)")?;
        }

        writeln!(f, ":")
    }
}

struct Diff<'s> {
    actual: &'s str,
    expected: &'s str,
}

impl<'s> Diff<'s> {
    fn new(actual: &'s str, expected: &'s str) -> Self {
        Self { actual, expected }
    }
}

impl<'s> Display for Diff<'s> {
    #[cfg(feature = "pretty-print")]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let comparison = pretty_assertions::StrComparison::new(self.actual, self.expected);
        write!(f, "{comparison}")
    }

    #[cfg(not(feature = "pretty-print"))]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "  actual: {}", self.actual)?;
        write!(f, "expected: {}", self.expected)
    }
}
