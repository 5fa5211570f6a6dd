use crate::eval::Decision;
use crate::responder::Thrown;
use crate::target::{Signature, Target};
use crate::value::Value;
use crate::Mocks;

/// Couples a [Mocks] session with one target, for hand-written test doubles.
///
/// A test double forwards each of its methods to [Proxy::call]:
///
/// ```rust
/// use expectant::*;
///
/// struct FakeClock<'m> {
///     proxy: Proxy<'m>,
///     now: Signature,
/// }
///
/// impl<'m> FakeClock<'m> {
///     fn now(&self) -> i64 {
///         match self.proxy.call(&self.now, vec![]) {
///             Ok(Value::I64(now)) => now,
///             other => panic!("{other:?}"),
///         }
///     }
/// }
/// ```
///
/// API misuse reported by the session panics at the call site. So does an unexpected
/// invocation when the session is configured with [Config::fail_fast](crate::Config::fail_fast);
/// otherwise the return type's default value is returned and the mismatch is reported later.
pub struct Proxy<'m> {
    mocks: &'m Mocks,
    target: Target,
}

impl<'m> Proxy<'m> {
    pub(crate) fn new(mocks: &'m Mocks, target: Target) -> Self {
        Self { mocks, target }
    }

    /// The target this proxy dispatches to.
    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Dispatch a call. Panics if the session decides to run the real method, since
    /// there is none. Use [Proxy::call_or_real] for partial mocks.
    pub fn call(&self, signature: &Signature, args: Vec<Value>) -> Result<Value, Thrown> {
        self.call_or_real(signature, args, |_| {
            panic!(
                "{}.{signature} cannot call the real method as there is no function available to call.",
                self.target
            )
        })
    }

    /// Dispatch a call, running `real` when the session decides the real method
    /// should handle it.
    pub fn call_or_real<R>(
        &self,
        signature: &Signature,
        args: Vec<Value>,
        real: R,
    ) -> Result<Value, Thrown>
    where
        R: FnOnce(&[Value]) -> Result<Value, Thrown>,
    {
        match self.mocks.dispatch(&self.target, signature, args.clone()) {
            Ok(Decision::Return(value)) => Ok(value),
            Ok(Decision::Throw(thrown)) => Err(thrown),
            Ok(Decision::CallReal) => real(&args),
            Ok(Decision::Unexpected(mismatch)) => {
                if self.mocks.shared_state.config.fail_fast {
                    panic!("{mismatch}");
                }
                Ok(signature.return_type().default_value())
            }
            Err(err) => panic!("{err}"),
        }
    }
}
