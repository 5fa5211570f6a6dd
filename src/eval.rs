use crate::config::FallbackMode;
use crate::error::{Mismatch, MockError, MockResult};
use crate::mock_target::Resolution;
use crate::responder::{DelegateCall, ResultAction, Thrown};
use crate::state::{lock, SharedState};
use crate::target::{InterceptionPolicy, Signature, Target};
use crate::value::Value;

/// What the interception provider should do with an intercepted call.
#[derive(Clone, Debug)]
pub enum Decision {
    /// Return this value to the caller.
    Return(Value),
    /// Raise this error at the call site.
    Throw(Thrown),
    /// Run the real method body.
    CallReal,
    /// The call was not expected. It has been recorded as a pending mismatch, which
    /// fails the next verification or the end of the session.
    Unexpected(Mismatch),
}

/// 's = shared state
pub(crate) struct EvalCtx<'s> {
    shared_state: &'s SharedState,
}

impl<'s> EvalCtx<'s> {
    pub fn new(shared_state: &'s SharedState) -> Self {
        Self { shared_state }
    }

    pub fn dispatch(
        &self,
        target: &Target,
        signature: &Signature,
        args: Vec<Value>,
    ) -> MockResult<Decision> {
        self.shared_state.begin_dispatch()?;
        let log = &self.shared_state.log;

        let mock_target = match self.shared_state.target(target) {
            Some(mock_target) => mock_target,
            None => {
                let invocation = log.observe(target, signature, args);
                tracing::debug!(%invocation, "call on undeclared target");
                log.append(invocation);

                return match self.shared_state.config.fallback_mode {
                    FallbackMode::Error => Err(MockError::UndeclaredTarget {
                        target: target.to_string(),
                    }),
                    FallbackMode::CallReal => Ok(Decision::CallReal),
                };
            }
        };

        if let Err(err) = check_args(target, signature, &args) {
            log.append(log.observe(target, signature, args));
            return Err(err);
        }

        // Counter update and log append form one critical section per target.
        let (invocation, resolution, policy) = {
            let mut mock_target = lock(&mock_target);
            let invocation = log.observe(target, signature, args);
            let resolution = mock_target.resolve(&invocation);
            log.append(invocation.clone());
            (invocation, resolution, mock_target.options.policy)
        };

        match resolution {
            Ok(Resolution::Matched {
                index,
                call_index,
                bounds,
                action,
            }) => {
                tracing::debug!(%invocation, call_index, ?action, "matched expectation");
                Ok(match action {
                    ResultAction::Return(value) => Decision::Return(value),
                    ResultAction::Throw(thrown) => Decision::Throw(thrown),
                    ResultAction::CallReal => Decision::CallReal,
                    ResultAction::Delegate(delegate) => {
                        let call = DelegateCall::new(&invocation, call_index + 1, bounds);
                        let outcome = delegate.call(&call);

                        if let Some(bounds) = call.updated_bounds() {
                            tracing::debug!(%invocation, %bounds, "delegate updated bounds");
                            if let Err(err) = lock(&mock_target).update_bounds(index, bounds) {
                                tracing::warn!(%invocation, "{err}");
                                self.shared_state.push_pending(Mismatch::Misuse(err));
                            }
                        }

                        match outcome {
                            Ok(value) => Decision::Return(value),
                            Err(thrown) => Decision::Throw(thrown),
                        }
                    }
                })
            }
            Ok(Resolution::Unmatched) => {
                tracing::trace!(%invocation, "no expectation on lenient target");
                Ok(match policy {
                    InterceptionPolicy::Partial => Decision::CallReal,
                    InterceptionPolicy::Total => {
                        Decision::Return(signature.return_type().default_value())
                    }
                })
            }
            Ok(Resolution::Unexpected(reason)) => {
                let mismatch = Mismatch::UnexpectedInvocation { invocation, reason };
                tracing::warn!("{mismatch}");
                self.shared_state.push_pending(mismatch.clone());
                Ok(Decision::Unexpected(mismatch))
            }
            Err(err) => {
                tracing::warn!(%invocation, "{err}");
                self.shared_state
                    .push_pending(Mismatch::MatcherEvaluation(err.clone()));
                Err(MockError::MatcherEvaluation(err))
            }
        }
    }
}

fn check_args(target: &Target, signature: &Signature, args: &[Value]) -> MockResult<()> {
    let describe = || format!("{target}.{signature}");

    if args.len() != signature.arity() {
        return Err(MockError::ArityMismatch {
            pattern: describe(),
            expected: signature.arity(),
            actual: args.len(),
        });
    }

    for (index, (param, value)) in signature.params().iter().zip(args).enumerate() {
        if !param.admits(value) {
            return Err(MockError::ArgumentType {
                call: describe(),
                index,
                expected: param.to_string(),
                actual: value.type_name().to_string(),
            });
        }
    }

    Ok(())
}
