use crate::error::{Failure, Mismatch};
use crate::state::lock;
use crate::Mocks;

pub(crate) fn teardown_panic(mocks: &mut Mocks) {
    if let Err(failure) = teardown(mocks) {
        panic!("{failure}");
    }
}

/// The implicit end-of-session check: deficient recorded expectations, plus every
/// discrepancy still pending from replay.
pub(crate) fn teardown(mocks: &mut Mocks) -> Result<(), Failure> {
    mocks.torn_down = true;

    // skip verification if not the original instance.
    if !mocks.original_instance {
        return Ok(());
    }

    // skip verification if already panicking in the original thread.
    if std::thread::panicking() {
        mocks.shared_state.close();
        return Ok(());
    }

    if std::sync::Arc::strong_count(&mocks.shared_state) > 1 {
        panic!("Mocks cannot verify calls, because the original instance got dropped while there are clones still alive.");
    }

    if std::thread::current().id() != mocks.shared_state.original_thread {
        panic!("Original Mocks instance destroyed on a different thread than the one it was created on. To solve this, clone the object before sending it to the other thread.");
    }

    close_session(mocks)
}

pub(crate) fn close_session(mocks: &Mocks) -> Result<(), Failure> {
    let shared_state = &mocks.shared_state;
    if !shared_state.close() {
        return Ok(());
    }

    let mut mismatches: Vec<Mismatch> = shared_state.drain_pending();
    for mock_target in shared_state.all_targets() {
        lock(&mock_target).collect_deficits(&mut mismatches);
    }

    tracing::debug!(
        invocations = shared_state.log.len(),
        mismatches = mismatches.len(),
        "closed mock session"
    );

    Failure::from_mismatches(mismatches)
}
