use once_cell::sync::OnceCell;

use crate::counter::CallCounter;
use crate::debug::{self, CallSite};
use crate::log::Invocation;
use crate::matcher::{ArgMatcher, MatcherError};
use crate::mismatch::ArgMismatchReporter;
use crate::responder::{self, ResultAction};
use crate::target::{Signature, Target};

/// A recorded or verified call pattern: target, method and one constraint per argument.
#[derive(Clone)]
pub(crate) struct Pattern {
    pub target: Target,
    pub signature: Signature,
    pub args: Vec<ArgMatcher>,
    pub call_site: CallSite,
    description: OnceCell<String>,
}

impl Pattern {
    pub fn new(
        target: Target,
        signature: Signature,
        args: Vec<ArgMatcher>,
        call_site: CallSite,
    ) -> Self {
        Self {
            target,
            signature,
            args,
            call_site,
            description: OnceCell::new(),
        }
    }

    /// `Target.method(args) at file:line`, rendered once.
    pub fn description(&self) -> &str {
        self.description.get_or_init(|| {
            debug::render_pattern(&self.target, &self.signature, &self.args, self.call_site)
        })
    }

    /// Whether the call hits the same target and method, disregarding arguments.
    pub fn targets(&self, invocation: &Invocation) -> bool {
        self.target.covers(invocation.target()) && &self.signature == invocation.signature()
    }

    pub fn matches(&self, invocation: &Invocation) -> Result<bool, MatcherError> {
        self.matches_reporting(invocation, &mut ArgMismatchReporter::new_disabled())
    }

    /// Match every argument slot positionally. All slots are evaluated when reporting,
    /// so that the report lists every rejected argument.
    pub fn matches_reporting(
        &self,
        invocation: &Invocation,
        reporter: &mut ArgMismatchReporter,
    ) -> Result<bool, MatcherError> {
        if !self.targets(invocation) || self.args.len() != invocation.args().len() {
            return Ok(false);
        }

        let mut all_matched = true;
        for (index, (matcher, actual)) in self.args.iter().zip(invocation.args()).enumerate() {
            if !matcher.matches_reporting(index, actual, reporter)? {
                all_matched = false;
                if !reporter.enabled() {
                    break;
                }
            }
        }

        Ok(all_matched)
    }

    /// Same target, same method and equivalent constraints.
    pub fn is_identical(&self, other: &Pattern) -> bool {
        self.target == other.target
            && self.signature == other.signature
            && self.args.len() == other.args.len()
            && self
                .args
                .iter()
                .zip(&other.args)
                .all(|(a, b)| a.is_equivalent(b))
    }
}

/// A recorded rule binding a pattern to a result script and count bounds.
pub(crate) struct Expectation {
    pub pattern: Pattern,
    pub script: Vec<ResultAction>,
    pub counter: CallCounter,
    pub ordered: bool,
    /// Match sequence number of the latest call this expectation answered.
    pub last_matched: Option<u64>,
}

impl Expectation {
    /// A copy with the same pattern, script and bounds, and no calls counted yet.
    pub fn rearmed(&self) -> Self {
        Self {
            pattern: self.pattern.clone(),
            script: self.script.clone(),
            counter: CallCounter::new(self.counter.bounds()),
            ordered: self.ordered,
            last_matched: None,
        }
    }

    /// Count a call and pick its scripted action.
    pub fn accept(&mut self, match_seq: u64) -> (usize, ResultAction) {
        let call_index = self.counter.tick();
        self.last_matched = Some(match_seq);

        let action = responder::find_action_by_call_index(&self.script, call_index)
            .cloned()
            .unwrap_or_else(|| {
                ResultAction::Return(self.pattern.signature.return_type().default_value())
            });

        (call_index, action)
    }
}
