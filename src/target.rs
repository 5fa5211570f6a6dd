use std::fmt::{self, Display};
use std::sync::Arc;

use crate::value::ValueType;

/// Identity of a mock target: a mocked type, or one particular instance of it.
///
/// A type-level target used in an expectation matches calls made on the type and on
/// every instance of it. An instance target only matches calls on itself.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Target {
    type_name: Arc<str>,
    instance: Option<InstanceId>,
}

/// Identifies one mocked instance within a [Mocks](crate::Mocks) session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(pub(crate) u64);

impl Target {
    pub(crate) fn of_type(type_name: impl Into<Arc<str>>) -> Self {
        Self {
            type_name: type_name.into(),
            instance: None,
        }
    }

    pub(crate) fn with_instance(&self, instance: InstanceId) -> Self {
        Self {
            type_name: self.type_name.clone(),
            instance: Some(instance),
        }
    }

    /// Name of the mocked type.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The instance id, if this target is a specific instance.
    pub fn instance(&self) -> Option<InstanceId> {
        self.instance
    }

    /// Whether an expectation declared on `self` applies to a call observed on `observed`.
    pub fn covers(&self, observed: &Target) -> bool {
        self.type_name == observed.type_name
            && (self.instance.is_none() || self.instance == observed.instance)
    }
}

impl Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.instance {
            Some(InstanceId(id)) => write!(f, "{}#{id}", self.type_name),
            None => write!(f, "{}", self.type_name),
        }
    }
}

/// Whether the order of recorded expectations is enforced during replay.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strictness {
    /// Calls must arrive in recorded order, and unexpected calls are failures.
    Strict,
    /// Calls may arrive in any order. Unmatched calls get the return type's default value.
    Lenient,
}

impl Display for Strictness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strict => write!(f, "Strict"),
            Self::Lenient => write!(f, "Lenient"),
        }
    }
}

/// Whether the interception provider runs the real method body for calls that no
/// expectation answers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InterceptionPolicy {
    /// The real method never runs.
    Total,
    /// Unanswered calls are delegated to the real method.
    Partial,
}

/// Per-target options supplied at declaration time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TargetOptions {
    pub(crate) strictness: Strictness,
    pub(crate) policy: InterceptionPolicy,
}

impl TargetOptions {
    /// Strict, total mocking.
    pub fn strict() -> Self {
        Self {
            strictness: Strictness::Strict,
            policy: InterceptionPolicy::Total,
        }
    }

    /// Lenient, total mocking.
    pub fn lenient() -> Self {
        Self {
            strictness: Strictness::Lenient,
            policy: InterceptionPolicy::Total,
        }
    }

    /// Switch to partial mocking: unanswered calls run the real method.
    pub fn partial(mut self) -> Self {
        self.policy = InterceptionPolicy::Partial;
        self
    }

    pub fn strictness(&self) -> Strictness {
        self.strictness
    }

    pub fn policy(&self) -> InterceptionPolicy {
        self.policy
    }
}

impl Display for TargetOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.policy {
            InterceptionPolicy::Total => write!(f, "{}", self.strictness),
            InterceptionPolicy::Partial => write!(f, "{}, partial", self.strictness),
        }
    }
}

/// A method signature: name, erased parameter types and return type.
///
/// Two signatures denote the same method when their names and parameter types are
/// equal. The return type only decides the default value of unanswered calls.
#[derive(Clone, Debug)]
pub struct Signature(Arc<SignatureInner>);

#[derive(Clone, Debug)]
struct SignatureInner {
    name: String,
    params: Vec<ValueType>,
    returns: ValueType,
}

impl Signature {
    /// A method with no parameters returning [ValueType::Unit].
    pub fn new(name: impl Into<String>) -> Self {
        Self(Arc::new(SignatureInner {
            name: name.into(),
            params: Vec::new(),
            returns: ValueType::Unit,
        }))
    }

    /// Append a parameter.
    pub fn param(mut self, param: ValueType) -> Self {
        Arc::make_mut(&mut self.0).params.push(param);
        self
    }

    /// Set the return type.
    pub fn returns(mut self, returns: ValueType) -> Self {
        Arc::make_mut(&mut self.0).returns = returns;
        self
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn params(&self) -> &[ValueType] {
        &self.0.params
    }

    pub fn return_type(&self) -> &ValueType {
        &self.0.returns
    }

    pub fn arity(&self) -> usize {
        self.0.params.len()
    }
}

impl PartialEq for Signature {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
            || (self.0.name == other.0.name && self.0.params == other.0.params)
    }
}

impl Eq for Signature {}

impl Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.0.name)?;
        for (index, param) in self.0.params.iter().enumerate() {
            if index > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{param}")?;
        }
        write!(f, ")")?;
        if self.0.returns != ValueType::Unit {
            write!(f, " -> {}", self.0.returns)?;
        }
        Ok(())
    }
}
