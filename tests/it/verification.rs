use expectant::*;
use pretty_assertions::assert_eq;

struct Mailer {
    target: Target,
    send: Signature,
}

fn mailer(mocks: &Mocks) -> Mailer {
    Mailer {
        target: mocks.lenient("Mailer"),
        send: Signature::new("send")
            .param(ValueType::Str)
            .returns(ValueType::Bool),
    }
}

fn send_all(mocks: &Mocks, mailer: &Mailer, recipients: &[&str]) {
    let proxy = mocks.proxy(&mailer.target);
    for recipient in recipients {
        proxy.call(&mailer.send, vec![(*recipient).into()]).unwrap();
    }
}

#[test]
fn verify_counts_matching_calls() {
    let mocks = Mocks::new();
    let mailer = mailer(&mocks);
    send_all(&mocks, &mailer, &["ann", "bob", "ann"]);

    mocks
        .verify(|v| {
            v.expect(&mailer.target, &mailer.send, args!["ann"]).times(2);
            v.expect(&mailer.target, &mailer.send, args!["bob"]);
            v.expect(&mailer.target, &mailer.send, args![prefix("c")]).never();
        })
        .unwrap();

    mocks.finish().unwrap();
}

#[test]
fn verify_defaults_to_exactly_once() {
    let mocks = Mocks::new();
    let mailer = mailer(&mocks);
    send_all(&mocks, &mailer, &["ann", "ann"]);

    let failure = mocks
        .verify(|v| {
            v.expect(&mailer.target, &mailer.send, args!["ann"]);
        })
        .unwrap_err();

    match failure.mismatches() {
        [Mismatch::TooManyInvocations { bounds, actual, .. }] => {
            assert_eq!(CountBounds::exactly(1), *bounds);
            assert_eq!(2, *actual);
        }
        other => panic!("{other:?}"),
    }

    mocks.finish().unwrap();
}

#[test]
fn missing_calls_are_reported() {
    let mocks = Mocks::new();
    let mailer = mailer(&mocks);
    send_all(&mocks, &mailer, &["ann"]);

    let failure = mocks
        .verify(|v| {
            v.expect(&mailer.target, &mailer.send, args![any()]).min_times(2);
            v.expect(&mailer.target, &mailer.send, args!["bob"]);
        })
        .unwrap_err();

    assert_eq!(
        vec![MismatchKind::Missing, MismatchKind::Missing],
        failure.kinds()
    );
    assert!(failure
        .to_string()
        .starts_with("Mock verification failed with 2 errors:\n1. Missing invocation of Mailer.send(_)"));

    mocks.finish().unwrap();
}

#[test]
fn verification_can_be_repeated() {
    let mocks = Mocks::new();
    let mailer = mailer(&mocks);

    send_all(&mocks, &mailer, &["ann"]);
    mocks
        .verify(|v| {
            v.expect(&mailer.target, &mailer.send, args![any()]);
        })
        .unwrap();

    send_all(&mocks, &mailer, &["bob"]);
    mocks
        .verify(|v| {
            v.expect(&mailer.target, &mailer.send, args![any()]).times(2);
        })
        .unwrap();

    mocks.finish().unwrap();
}

#[test]
fn pending_unexpected_calls_fail_the_next_verification() {
    let mocks = Mocks::new();
    let mailer = mailer(&mocks);

    mocks
        .record(|rec| {
            rec.expect(&mailer.target, &mailer.send, args![any()])
                .returns(true)
                .max_times(1);
        })
        .unwrap();

    send_all(&mocks, &mailer, &["ann", "bob"]);

    let failure = mocks
        .verify(|v| {
            v.expect(&mailer.target, &mailer.send, args![any()]).times(2);
        })
        .unwrap_err();
    assert_eq!(vec![MismatchKind::Unexpected], failure.kinds());

    // reported once
    mocks
        .verify(|v| {
            v.expect(&mailer.target, &mailer.send, args![any()]).times(2);
        })
        .unwrap();

    mocks.finish().unwrap();
}

#[test]
fn verify_rejects_undeclared_targets() {
    let mocks = Mocks::new();
    let other = Mocks::new();
    let ghost = other.lenient("Ghost");
    let boo = Signature::new("boo");

    let failure = mocks
        .verify(|v| {
            v.expect(&ghost, &boo, args![]);
        })
        .unwrap_err();

    match failure.mismatches() {
        [Mismatch::Misuse(MockError::UndeclaredTarget { target })] => assert_eq!("Ghost", target),
        other => panic!("{other:?}"),
    }

    mocks.finish().unwrap();
    other.finish().unwrap();
}

#[test]
fn verify_rejects_wrong_arity() {
    let mocks = Mocks::new();
    let mailer = mailer(&mocks);

    let failure = mocks
        .verify(|v| {
            v.expect(&mailer.target, &mailer.send, args!["ann", "bob"]);
        })
        .unwrap_err();

    assert!(matches!(
        failure.mismatches(),
        [Mismatch::Misuse(MockError::ArityMismatch {
            expected: 1,
            actual: 2,
            ..
        })]
    ));

    mocks.finish().unwrap();
}

#[test]
fn for_each_inspects_every_matching_call() {
    let mocks = Mocks::new();
    let mailer = mailer(&mocks);
    send_all(&mocks, &mailer, &["ann", "bob", "cid"]);

    let mut recipients = vec![];
    mocks
        .verify(|v| {
            v.expect(&mailer.target, &mailer.send, args![any()])
                .times(3)
                .for_each(|invocation| recipients.push(invocation.args()[0].to_string()));
        })
        .unwrap();

    assert_eq!(vec!["\"ann\"", "\"bob\"", "\"cid\""], recipients);

    mocks.finish().unwrap();
}

#[test]
fn iterations_multiply_the_expected_counts() {
    let mocks = Mocks::new();
    let mailer = mailer(&mocks);
    send_all(&mocks, &mailer, &["ann", "bob", "ann", "bob"]);

    mocks
        .verify(|v| {
            v.iterations(2);
            v.expect(&mailer.target, &mailer.send, args!["ann"]);
            v.expect(&mailer.target, &mailer.send, args!["bob"]);
        })
        .unwrap();

    let failure = mocks
        .verify(|v| {
            v.iterations(3);
            v.expect(&mailer.target, &mailer.send, args!["ann"]);
        })
        .unwrap_err();
    match failure.mismatches() {
        [Mismatch::MissingInvocation { bounds, actual, .. }] => {
            assert_eq!(CountBounds::exactly(3), *bounds);
            assert_eq!(2, *actual);
        }
        other => panic!("{other:?}"),
    }

    mocks.finish().unwrap();
}

#[test]
fn unverified_gap_needs_an_in_order_block() {
    let mocks = Mocks::new();
    let mailer = mailer(&mocks);
    send_all(&mocks, &mailer, &["ann"]);

    let failure = mocks
        .verify(|v| {
            v.unverified();
            v.expect(&mailer.target, &mailer.send, args![any()]);
        })
        .unwrap_err();
    match failure.mismatches() {
        [Mismatch::Misuse(MockError::UnverifiedOutsideOrder)] => {}
        other => panic!("{other:?}"),
    }

    let failure = mocks.verify(|v| {
        v.iterations(0);
    });
    assert!(failure.unwrap_err().has(MismatchKind::Misuse));

    mocks.finish().unwrap();
}
