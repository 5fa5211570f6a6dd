use expectant::*;
use pretty_assertions::assert_eq;

fn counter() -> Signature {
    Signature::new("count").returns(ValueType::I32)
}

#[test]
fn unmatched_call_returns_default_value_and_is_logged() {
    let mocks = Mocks::new();
    let stats = mocks.lenient("Stats");
    let count = counter();

    assert_eq!(Value::I32(0), mocks.proxy(&stats).call(&count, vec![]).unwrap());

    let invocations = mocks.invocations();
    assert_eq!(1, invocations.len());
    assert_eq!("count", invocations[0].signature().name());

    mocks.finish().unwrap();
}

#[test]
fn default_values_follow_the_return_type() {
    let mocks = Mocks::new();
    let repo = mocks.lenient("Repo");
    let proxy = mocks.proxy(&repo);

    let cases = [
        (ValueType::Bool, Value::Bool(false)),
        (ValueType::F64, Value::F64(0.0)),
        (ValueType::Str, Value::from("")),
        (ValueType::List, Value::List(vec![])),
        (ValueType::Object("User".to_string()), Value::Null),
        (ValueType::Unit, Value::Unit),
    ];

    for (index, (returns, expected)) in cases.into_iter().enumerate() {
        let signature = Signature::new(format!("get{index}")).returns(returns);
        assert_eq!(expected, proxy.call(&signature, vec![]).unwrap());
    }

    mocks.finish().unwrap();
}

#[test]
fn expectations_may_be_called_in_any_order() {
    let mocks = Mocks::new();
    let stats = mocks.lenient("Stats");
    let count = counter();
    let reset = Signature::new("reset");

    mocks
        .record(|rec| {
            rec.expect(&stats, &count, args![]).returns(5);
            rec.expect(&stats, &reset, args![]);
        })
        .unwrap();

    let proxy = mocks.proxy(&stats);
    proxy.call(&reset, vec![]).unwrap();
    assert_eq!(Value::I32(5), proxy.call(&count, vec![]).unwrap());
    assert_eq!(Value::I32(5), proxy.call(&count, vec![]).unwrap());

    mocks.finish().unwrap();
}

#[test]
fn most_recently_matched_expectation_wins() {
    let mocks = Mocks::new();
    let kv = mocks.lenient("Kv");
    let get = Signature::new("get")
        .param(ValueType::Str)
        .returns(ValueType::I32);

    mocks
        .record(|rec| {
            rec.expect(&kv, &get, args!["answer"]).returns(42);
            rec.expect(&kv, &get, args![any()]).returns(1);
        })
        .unwrap();

    let proxy = mocks.proxy(&kv);
    // neither matched yet, declaration order decides
    assert_eq!(Value::I32(42), proxy.call(&get, vec!["answer".into()]).unwrap());
    assert_eq!(Value::I32(1), proxy.call(&get, vec!["other".into()]).unwrap());
    // the catch-all matched last
    assert_eq!(Value::I32(1), proxy.call(&get, vec!["answer".into()]).unwrap());

    mocks.finish().unwrap();
}

#[test]
fn rerecording_an_identical_expectation_replaces_it() {
    let mocks = Mocks::new();
    let stats = mocks.lenient("Stats");
    let count = counter();

    mocks
        .record(|rec| {
            rec.expect(&stats, &count, args![]).returns(1);
        })
        .unwrap();
    assert_eq!(Value::I32(1), mocks.proxy(&stats).call(&count, vec![]).unwrap());

    mocks
        .record(|rec| {
            rec.expect(&stats, &count, args![]).returns(2);
        })
        .unwrap();
    assert_eq!(Value::I32(2), mocks.proxy(&stats).call(&count, vec![]).unwrap());

    mocks.finish().unwrap();
}

#[test]
fn exhausted_expectation_is_unexpected() {
    let mocks = Mocks::new();
    let stats = mocks.lenient("Stats");
    let count = counter();

    mocks
        .record(|rec| {
            rec.expect(&stats, &count, args![]).returns(3).times(1);
        })
        .unwrap();

    let proxy = mocks.proxy(&stats);
    assert_eq!(Value::I32(3), proxy.call(&count, vec![]).unwrap());
    // the mismatch is deferred, the caller gets the default value
    assert_eq!(Value::I32(0), proxy.call(&count, vec![]).unwrap());

    let failure = mocks.finish().unwrap_err();
    match failure.mismatches() {
        [Mismatch::UnexpectedInvocation {
            reason: UnexpectedReason::ExceededMaxTimes { bounds, .. },
            ..
        }] => assert_eq!(CountBounds::exactly(1), *bounds),
        other => panic!("{other:?}"),
    }
}

#[test]
fn min_times_is_checked_at_finish() {
    let mocks = Mocks::new();
    let stats = mocks.lenient("Stats");
    let count = counter();

    mocks
        .record(|rec| {
            rec.expect(&stats, &count, args![]).returns(3).min_times(2);
        })
        .unwrap();

    mocks.proxy(&stats).call(&count, vec![]).unwrap();

    match mocks.finish().unwrap_err().mismatches() {
        [Mismatch::MissingInvocation { bounds, actual, .. }] => {
            assert_eq!(CountBounds::at_least(2), *bounds);
            assert_eq!(1, *actual);
        }
        other => panic!("{other:?}"),
    }
}

#[test]
fn default_strictness_is_configurable() {
    let mocks = Mocks::with_config(Config::default().default_strictness(Strictness::Lenient));
    let stats = mocks.declare("Stats");
    let count = counter();

    assert_eq!(Value::I32(0), mocks.proxy(&stats).call(&count, vec![]).unwrap());
    mocks.finish().unwrap();
}

#[test]
fn iterations_multiply_lenient_bounds() {
    let mocks = Mocks::new();
    let stats = mocks.lenient("Stats");
    let count = counter();

    mocks
        .record(|rec| {
            rec.iterations(3);
            rec.expect(&stats, &count, args![]).returns(5).times(1);
        })
        .unwrap();

    let proxy = mocks.proxy(&stats);
    for _ in 0..3 {
        assert_eq!(Value::I32(5), proxy.call(&count, vec![]).unwrap());
    }
    match mocks.dispatch(&stats, &count, vec![]) {
        Ok(Decision::Unexpected(Mismatch::UnexpectedInvocation {
            reason: UnexpectedReason::ExceededMaxTimes { bounds, .. },
            ..
        })) => assert_eq!(CountBounds::exactly(3), bounds),
        other => panic!("{other:?}"),
    }

    assert_eq!(
        vec![MismatchKind::Unexpected],
        mocks.finish().unwrap_err().kinds()
    );
}
