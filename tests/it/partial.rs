use std::cell::Cell;

use expectant::*;

struct Thermostat<'m> {
    proxy: Proxy<'m>,
    read: Signature,
    set: Signature,
    real_reads: Cell<usize>,
}

impl<'m> Thermostat<'m> {
    fn new(mocks: &'m Mocks) -> Self {
        let target = mocks.declare_with("Thermostat", TargetOptions::lenient().partial());
        Self {
            proxy: mocks.proxy(&target),
            read: Signature::new("read").returns(ValueType::F64),
            set: Signature::new("set").param(ValueType::F64),
            real_reads: Cell::new(0),
        }
    }

    fn read(&self) -> f64 {
        let value = self
            .proxy
            .call_or_real(&self.read, vec![], |_| {
                self.real_reads.set(self.real_reads.get() + 1);
                Ok(Value::F64(21.5))
            })
            .unwrap();
        value.as_f64().unwrap()
    }

    fn set(&self, celsius: f64) {
        self.proxy
            .call_or_real(&self.set, vec![celsius.into()], |_| Ok(Value::Unit))
            .unwrap();
    }
}

#[test]
fn unanswered_calls_run_the_real_method() {
    let mocks = Mocks::new();
    let thermostat = Thermostat::new(&mocks);

    assert_eq!(21.5, thermostat.read());
    assert_eq!(1, thermostat.real_reads.get());

    drop(thermostat);
    mocks.finish().unwrap();
}

#[test]
fn recorded_calls_are_answered_by_the_mock() {
    let mocks = Mocks::new();
    let thermostat = Thermostat::new(&mocks);

    mocks
        .record(|rec| {
            rec.expect(thermostat.proxy.target(), &thermostat.read, args![])
                .returns(30.0)
                .times(1);
        })
        .unwrap();

    assert_eq!(30.0, thermostat.read());
    assert_eq!(0, thermostat.real_reads.get());

    thermostat.set(18.0);

    mocks
        .verify(|v| {
            v.expect(thermostat.proxy.target(), &thermostat.set, args![approx(18.0, 0.1)]);
        })
        .unwrap();

    drop(thermostat);
    mocks.finish().unwrap();
}

#[test]
fn calls_real_in_script_defers_to_the_real_method() {
    let mocks = Mocks::new();
    let thermostat = Thermostat::new(&mocks);

    mocks
        .record(|rec| {
            rec.expect(thermostat.proxy.target(), &thermostat.read, args![])
                .returns(10.0)
                .calls_real()
                .times(2);
        })
        .unwrap();

    assert_eq!(10.0, thermostat.read());
    assert_eq!(21.5, thermostat.read());
    assert_eq!(1, thermostat.real_reads.get());

    drop(thermostat);
    mocks.finish().unwrap();
}

#[test]
fn strict_partial_target_decision_is_call_real() {
    let mocks = Mocks::new();
    let clock = mocks.declare_with("Clock", TargetOptions::strict().partial());
    let now = Signature::new("now").returns(ValueType::I64);

    mocks
        .record(|rec| {
            rec.expect(&clock, &now, args![]).calls_real();
        })
        .unwrap();

    assert!(matches!(
        mocks.dispatch(&clock, &now, vec![]),
        Ok(Decision::CallReal)
    ));

    mocks.finish().unwrap();
}
