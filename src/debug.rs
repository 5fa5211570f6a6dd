use std::fmt::Display;

use crate::matcher::ArgMatcher;
use crate::target::{Signature, Target};

/// Where a pattern was declared in the test source.
#[derive(Clone, Copy, Debug)]
pub(crate) struct CallSite {
    pub file: &'static str,
    pub line: u32,
}

impl CallSite {
    #[track_caller]
    pub fn caller() -> Self {
        let location = std::panic::Location::caller();
        Self {
            file: location.file(),
            line: location.line(),
        }
    }
}

/// Renders `Target.method(matcher, ..)`.
pub(crate) struct PatternDebug<'a> {
    pub target: &'a Target,
    pub signature: &'a Signature,
    pub args: &'a [ArgMatcher],
}

impl<'a> Display for PatternDebug<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}(", self.target, self.signature.name())?;
        for (index, arg) in self.args.iter().enumerate() {
            if index > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{arg}")?;
        }
        write!(f, ")")
    }
}

pub(crate) fn render_pattern(
    target: &Target,
    signature: &Signature,
    args: &[ArgMatcher],
    call_site: CallSite,
) -> String {
    let CallSite { file, line } = call_site;
    format!(
        "{} at {file}:{line}",
        PatternDebug {
            target,
            signature,
            args
        }
    )
}
