use std::fmt::Display;

/// Minimum and (optional) maximum number of calls an expectation accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CountBounds {
    pub(crate) min: usize,
    pub(crate) max: Option<usize>,
}

impl CountBounds {
    /// Exactly `n` calls.
    pub fn exactly(n: usize) -> Self {
        Self {
            min: n,
            max: Some(n),
        }
    }

    /// At least `n` calls, with no upper bound.
    pub fn at_least(n: usize) -> Self {
        Self { min: n, max: None }
    }

    /// Between `min` and `max` calls, inclusive.
    pub fn between(min: usize, max: usize) -> Self {
        Self {
            min,
            max: Some(max),
        }
    }

    pub fn min(&self) -> usize {
        self.min
    }

    /// `None` means unbounded.
    pub fn max(&self) -> Option<usize> {
        self.max
    }

    /// The bounds of a block repeated `iterations` times.
    pub(crate) fn repeated(self, iterations: usize) -> Self {
        Self {
            min: self.min.saturating_mul(iterations),
            max: self.max.map(|max| max.saturating_mul(iterations)),
        }
    }

    pub(crate) fn is_valid(&self) -> bool {
        self.max.map(|max| self.min <= max).unwrap_or(true)
    }

    pub(crate) fn admits(&self, count: usize) -> bool {
        count >= self.min && !self.is_exceeded_by(count)
    }

    pub(crate) fn is_exceeded_by(&self, count: usize) -> bool {
        self.max.map(|max| count > max).unwrap_or(false)
    }
}

impl Display for CountBounds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.min, self.max) {
            (_, Some(0)) => write!(f, "no calls"),
            (min, Some(max)) if min == max => write!(f, "exactly {}", NCalls(min)),
            (0, Some(max)) => write!(f, "at most {}", NCalls(max)),
            (min, Some(max)) => write!(f, "between {min} and {}", NCalls(max)),
            (min, None) => write!(f, "at least {}", NCalls(min)),
        }
    }
}

/// Per-expectation call counter. Mutated only under the owning target's lock.
pub(crate) struct CallCounter {
    actual_count: usize,
    bounds: CountBounds,
}

impl CallCounter {
    pub fn new(bounds: CountBounds) -> Self {
        Self {
            actual_count: 0,
            bounds,
        }
    }

    pub fn bounds(&self) -> CountBounds {
        self.bounds
    }

    pub fn set_bounds(&mut self, bounds: CountBounds) {
        self.bounds = bounds;
    }

    pub fn count(&self) -> usize {
        self.actual_count
    }

    /// Count one more call, returning the zero-based index of that call.
    pub fn tick(&mut self) -> usize {
        let index = self.actual_count;
        self.actual_count += 1;
        index
    }

    pub fn has_capacity(&self) -> bool {
        !self.bounds.is_exceeded_by(self.actual_count + 1)
    }

    pub fn is_satisfied(&self) -> bool {
        self.actual_count >= self.bounds.min
    }
}

/// Renders a call count with the right plural.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NCalls(pub usize);

impl Display for NCalls {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            0 => write!(f, "no calls"),
            1 => write!(f, "1 call"),
            _ => write!(f, "{} calls", self.0),
        }
    }
}
