use crate::target::{Strictness, TargetOptions};

/// What happens to calls on targets that were never declared.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FallbackMode {
    /// Dispatch returns [MockError::UndeclaredTarget](crate::MockError::UndeclaredTarget).
    #[default]
    Error,
    /// Dispatch returns [Decision::CallReal](crate::Decision::CallReal).
    CallReal,
}

/// Session configuration, passed to [Mocks::with_config](crate::Mocks::with_config).
///
/// ```rust
/// use expectant::*;
///
/// let mocks = Mocks::with_config(Config::default().fail_fast(true));
/// ```
#[derive(Clone, Debug)]
pub struct Config {
    pub(crate) verify_on_drop: bool,
    pub(crate) fail_fast: bool,
    pub(crate) fallback_mode: FallbackMode,
    pub(crate) default_strictness: Strictness,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            verify_on_drop: true,
            fail_fast: false,
            fallback_mode: FallbackMode::Error,
            default_strictness: Strictness::Strict,
        }
    }
}

impl Config {
    /// Whether dropping the original [Mocks](crate::Mocks) handle runs the final check
    /// and panics on failure. Defaults to `true`.
    pub fn verify_on_drop(mut self, enabled: bool) -> Self {
        self.verify_on_drop = enabled;
        self
    }

    /// Make [Proxy](crate::Proxy) panic at the call site of an unexpected invocation,
    /// instead of reporting it later. Defaults to `false`.
    pub fn fail_fast(mut self, enabled: bool) -> Self {
        self.fail_fast = enabled;
        self
    }

    /// How calls on undeclared targets are handled.
    pub fn fallback_mode(mut self, mode: FallbackMode) -> Self {
        self.fallback_mode = mode;
        self
    }

    /// Strictness used by [Mocks::declare](crate::Mocks::declare).
    pub fn default_strictness(mut self, strictness: Strictness) -> Self {
        self.default_strictness = strictness;
        self
    }

    pub(crate) fn default_options(&self) -> TargetOptions {
        match self.default_strictness {
            Strictness::Strict => TargetOptions::strict(),
            Strictness::Lenient => TargetOptions::lenient(),
        }
    }
}
