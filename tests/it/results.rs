use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use expectant::*;

#[derive(Debug, thiserror::Error)]
#[error("insufficient funds: {0} missing")]
struct InsufficientFunds(u64);

fn account(mocks: &Mocks) -> (Target, Signature) {
    let account = mocks.strict("Account");
    let withdraw = Signature::new("withdraw")
        .param(ValueType::U64)
        .returns(ValueType::U64);
    (account, withdraw)
}

#[test]
fn last_scripted_result_repeats() {
    let mocks = Mocks::new();
    let (account, withdraw) = account(&mocks);

    mocks
        .record(|rec| {
            rec.expect(&account, &withdraw, args![any()])
                .returns_each([1u64, 2])
                .times(4);
        })
        .unwrap();

    let proxy = mocks.proxy(&account);
    let results: Vec<Value> = (0..4)
        .map(|_| proxy.call(&withdraw, vec![Value::U64(10)]).unwrap())
        .collect();
    assert_eq!(
        vec![Value::U64(1), Value::U64(2), Value::U64(2), Value::U64(2)],
        results
    );

    mocks.finish().unwrap();
}

#[test]
fn script_longer_than_default_count_raises_the_maximum() {
    let mocks = Mocks::new();
    let (account, withdraw) = account(&mocks);

    mocks
        .record(|rec| {
            rec.expect(&account, &withdraw, args![any()])
                .returns(1u64)
                .returns(2u64)
                .returns(3u64);
        })
        .unwrap();

    let proxy = mocks.proxy(&account);
    for expected in 1..=3u64 {
        assert_eq!(
            Value::U64(expected),
            proxy.call(&withdraw, vec![Value::U64(0)]).unwrap()
        );
    }

    mocks.finish().unwrap();
}

#[test]
fn thrown_error_reaches_the_caller() {
    let mocks = Mocks::new();
    let (account, withdraw) = account(&mocks);

    mocks
        .record(|rec| {
            rec.expect(&account, &withdraw, args![1000]).throws(InsufficientFunds(900));
        })
        .unwrap();

    let thrown = mocks
        .proxy(&account)
        .call(&withdraw, vec![Value::U64(1000)])
        .unwrap_err();
    assert_eq!("insufficient funds: 900 missing", thrown.to_string());
    assert!(matches!(
        thrown.downcast_ref::<InsufficientFunds>(),
        Some(InsufficientFunds(900))
    ));

    mocks.finish().unwrap();
}

#[test]
fn returns_and_throws_can_be_mixed() {
    let mocks = Mocks::new();
    let (account, withdraw) = account(&mocks);

    mocks
        .record(|rec| {
            rec.expect(&account, &withdraw, args![any()])
                .returns(100u64)
                .throws(Thrown::msg("account frozen"))
                .times(3);
        })
        .unwrap();

    let proxy = mocks.proxy(&account);
    assert_eq!(
        Value::U64(100),
        proxy.call(&withdraw, vec![Value::U64(1)]).unwrap()
    );
    for _ in 0..2 {
        let thrown = proxy.call(&withdraw, vec![Value::U64(1)]).unwrap_err();
        assert_eq!("account frozen", thrown.to_string());
    }

    mocks.finish().unwrap();
}

#[test]
fn delegate_computes_result_from_the_call() {
    let mocks = Mocks::new();
    let (account, withdraw) = account(&mocks);

    mocks
        .record(|rec| {
            rec.expect(&account, &withdraw, args![any()])
                .delegates(|call| {
                    let amount = call.invocation.args()[0].as_i128().unwrap_or_default();
                    Ok(Value::U64(amount as u64 * call.invocation_number as u64))
                })
                .times(2);
        })
        .unwrap();

    let proxy = mocks.proxy(&account);
    assert_eq!(
        Value::U64(10),
        proxy.call(&withdraw, vec![Value::U64(10)]).unwrap()
    );
    assert_eq!(
        Value::U64(20),
        proxy.call(&withdraw, vec![Value::U64(10)]).unwrap()
    );

    mocks.finish().unwrap();
}

#[test]
fn delegate_sees_bounds_and_may_fail() {
    let mocks = Mocks::new();
    let (account, withdraw) = account(&mocks);
    let seen = Arc::new(AtomicUsize::new(0));

    mocks
        .record(|rec| {
            let seen = seen.clone();
            rec.expect(&account, &withdraw, args![any()])
                .delegates(move |call| {
                    seen.fetch_add(1, Ordering::SeqCst);
                    assert_eq!(CountBounds::between(1, 5), call.bounds);
                    Err(Thrown::msg(format!("rejected {}", call.invocation)))
                })
                .min_times(1)
                .max_times(5);
        })
        .unwrap();

    let thrown = mocks
        .proxy(&account)
        .call(&withdraw, vec![Value::U64(3)])
        .unwrap_err();
    assert_eq!("rejected Account.withdraw(3)", thrown.to_string());
    assert_eq!(1, seen.load(Ordering::SeqCst));

    mocks.finish().unwrap();
}

#[test]
fn delegate_may_lower_the_maximum() {
    let mocks = Mocks::new();
    let (account, withdraw) = account(&mocks);

    mocks
        .record(|rec| {
            rec.expect(&account, &withdraw, args![any()])
                .delegates(|call| {
                    if call.invocation_number == 2 {
                        call.set_max_times(2);
                    }
                    Ok(Value::U64(call.invocation_number as u64))
                })
                .min_times(1);
        })
        .unwrap();

    let proxy = mocks.proxy(&account);
    assert_eq!(Value::U64(1), proxy.call(&withdraw, vec![Value::U64(5)]).unwrap());
    assert_eq!(Value::U64(2), proxy.call(&withdraw, vec![Value::U64(5)]).unwrap());

    match mocks.dispatch(&account, &withdraw, vec![Value::U64(5)]) {
        Ok(Decision::Unexpected(Mismatch::UnexpectedInvocation {
            reason: UnexpectedReason::ExceededMaxTimes { bounds, .. },
            ..
        })) => assert_eq!(CountBounds::between(1, 2), bounds),
        other => panic!("{other:?}"),
    }

    assert_eq!(
        vec![MismatchKind::Unexpected],
        mocks.finish().unwrap_err().kinds()
    );
}

#[test]
fn delegate_may_raise_the_minimum() {
    let mocks = Mocks::new();
    let (account, withdraw) = account(&mocks);

    mocks
        .record(|rec| {
            rec.expect(&account, &withdraw, args![any()])
                .delegates(|call| {
                    call.set_min_times(3);
                    Ok(Value::U64(0))
                })
                .max_times(5);
        })
        .unwrap();

    mocks
        .proxy(&account)
        .call(&withdraw, vec![Value::U64(1)])
        .unwrap();

    let failure = mocks.finish().unwrap_err();
    match failure.mismatches() {
        [Mismatch::MissingInvocation { bounds, actual, .. }] => {
            assert_eq!(CountBounds::between(3, 5), *bounds);
            assert_eq!(1, *actual);
        }
        other => panic!("{other:?}"),
    }
}

#[test]
fn delegate_with_contradictory_bounds_is_reported() {
    let mocks = Mocks::new();
    let (account, withdraw) = account(&mocks);

    mocks
        .record(|rec| {
            rec.expect(&account, &withdraw, args![any()])
                .delegates(|call| {
                    call.set_min_times(9);
                    Ok(Value::U64(0))
                })
                .max_times(5);
        })
        .unwrap();

    assert_eq!(
        Value::U64(0),
        mocks.proxy(&account).call(&withdraw, vec![Value::U64(1)]).unwrap()
    );

    let failure = mocks.finish().unwrap_err();
    assert_eq!(vec![MismatchKind::Misuse], failure.kinds());
    assert!(failure
        .to_string()
        .contains("minimum of 9 calls exceeds maximum of 5"));
}

#[test]
fn empty_script_returns_default_value() {
    let mocks = Mocks::new();
    let (account, withdraw) = account(&mocks);

    mocks
        .record(|rec| {
            rec.expect(&account, &withdraw, args![any()]);
        })
        .unwrap();

    assert_eq!(
        Value::U64(0),
        mocks
            .proxy(&account)
            .call(&withdraw, vec![Value::U64(5)])
            .unwrap()
    );

    mocks.finish().unwrap();
}

#[test]
fn explicit_action_is_scripted() {
    let mocks = Mocks::new();
    let (account, withdraw) = account(&mocks);

    mocks
        .record(|rec| {
            rec.expect(&account, &withdraw, args![any()])
                .action(ResultAction::Return(Value::U64(77)));
        })
        .unwrap();

    assert!(matches!(
        mocks.dispatch(&account, &withdraw, vec![Value::U64(1)]),
        Ok(Decision::Return(Value::U64(77)))
    ));

    mocks.finish().unwrap();
}

#[cfg(feature = "fragile")]
#[test]
fn thread_bound_delegate_fails_on_other_threads() {
    use std::rc::Rc;

    let mocks = Mocks::new();
    let (account, withdraw) = account(&mocks);
    let local = Rc::new(5u64);

    mocks
        .record(|rec| {
            let local = local.clone();
            rec.expect(&account, &withdraw, args![any()])
                .action(ResultAction::Delegate(Delegate::thread_bound(move |_| {
                    Ok(Value::U64(*local))
                })))
                .times(2);
        })
        .unwrap();

    assert_eq!(
        Value::U64(5),
        mocks
            .proxy(&account)
            .call(&withdraw, vec![Value::U64(0)])
            .unwrap()
    );

    std::thread::scope(|scope| {
        let mocks = mocks.clone();
        let (account, withdraw) = (account.clone(), withdraw.clone());
        scope
            .spawn(move || {
                let thrown = mocks
                    .proxy(&account)
                    .call(&withdraw, vec![Value::U64(0)])
                    .unwrap_err();
                assert!(thrown
                    .to_string()
                    .ends_with("thread-bound delegate called from a different thread"));
            })
            .join()
            .unwrap();
    });

    mocks.finish().unwrap();
}
