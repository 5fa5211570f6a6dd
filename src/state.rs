use std::collections::BTreeMap;
use std::fmt::Display;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use crate::config::Config;
use crate::error::{Mismatch, MockError, MockResult};
use crate::log::InvocationLog;
use crate::mock_target::MockTarget;
use crate::target::{InstanceId, Target, TargetOptions};

/// Lifecycle phase of a mock session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Targets declared, nothing recorded or called yet.
    Declared,
    /// A record block is open.
    Recording,
    /// The code under test runs and calls are dispatched.
    Replaying,
    /// A verification block was run.
    Verifying,
    /// The session was finished. Nothing is dispatched anymore.
    Closed,
}

impl Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Declared => "declared",
            Self::Recording => "recording",
            Self::Replaying => "replaying",
            Self::Verifying => "verifying",
            Self::Closed => "closed",
        };
        write!(f, "{name}")
    }
}

/// Lock a mutex, recovering the data if another thread panicked while holding it.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|err| err.into_inner())
}

/// Everything shared between the clones of one [Mocks](crate::Mocks) handle.
pub(crate) struct SharedState {
    pub config: Config,
    pub log: InvocationLog,
    pub original_thread: std::thread::ThreadId,

    targets: RwLock<BTreeMap<Arc<str>, Arc<Mutex<MockTarget>>>>,
    phase: Mutex<Phase>,
    pending: Mutex<Vec<Mismatch>>,
    next_instance: AtomicU64,
}

impl SharedState {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            log: InvocationLog::new(),
            original_thread: std::thread::current().id(),
            targets: RwLock::new(BTreeMap::new()),
            phase: Mutex::new(Phase::Declared),
            pending: Mutex::new(vec![]),
            next_instance: AtomicU64::new(1),
        }
    }

    pub fn declare(&self, type_name: &str, options: TargetOptions) -> MockResult<Target> {
        let mut targets = self.targets.write().unwrap_or_else(|err| err.into_inner());

        if let Some(existing) = targets.get(type_name) {
            let existing = lock(existing);
            if existing.options != options {
                return Err(MockError::ConflictingDeclaration {
                    target: type_name.to_string(),
                    existing: existing.options,
                    requested: options,
                });
            }
            return Ok(existing.target.clone());
        }

        let target = Target::of_type(type_name);
        tracing::debug!(%target, strictness = %options.strictness, "declared mock target");
        targets.insert(
            Arc::from(type_name),
            Arc::new(Mutex::new(MockTarget::new(target.clone(), options))),
        );

        Ok(target)
    }

    pub fn new_instance(&self, of_type: &Target) -> MockResult<Target> {
        if self.target(of_type).is_none() {
            return Err(MockError::UndeclaredTarget {
                target: of_type.to_string(),
            });
        }

        let id = self.next_instance.fetch_add(1, Ordering::SeqCst);
        Ok(of_type.with_instance(InstanceId(id)))
    }

    /// The expectation state of `target`'s type, if declared.
    pub fn target(&self, target: &Target) -> Option<Arc<Mutex<MockTarget>>> {
        self.targets
            .read()
            .unwrap_or_else(|err| err.into_inner())
            .get(target.type_name())
            .cloned()
    }

    pub fn all_targets(&self) -> Vec<Arc<Mutex<MockTarget>>> {
        self.targets
            .read()
            .unwrap_or_else(|err| err.into_inner())
            .values()
            .cloned()
            .collect()
    }

    pub fn phase(&self) -> Phase {
        *lock(&self.phase)
    }

    pub fn begin_record(&self) -> MockResult<()> {
        let mut phase = lock(&self.phase);
        match *phase {
            Phase::Declared | Phase::Replaying | Phase::Verifying => {
                *phase = Phase::Recording;
                Ok(())
            }
            Phase::Closed => Err(MockError::SessionClosed),
            Phase::Recording => Err(MockError::InvalidPhase {
                operation: "open a record block",
                phase: *phase,
            }),
        }
    }

    pub fn end_record(&self) {
        *lock(&self.phase) = Phase::Replaying;
    }

    pub fn begin_dispatch(&self) -> MockResult<()> {
        let mut phase = lock(&self.phase);
        match *phase {
            Phase::Replaying => Ok(()),
            Phase::Declared | Phase::Verifying => {
                *phase = Phase::Replaying;
                Ok(())
            }
            Phase::Closed => Err(MockError::SessionClosed),
            Phase::Recording => Err(MockError::InvalidPhase {
                operation: "dispatch a call",
                phase: *phase,
            }),
        }
    }

    pub fn begin_verify(&self) -> MockResult<()> {
        let mut phase = lock(&self.phase);
        match *phase {
            Phase::Declared | Phase::Replaying | Phase::Verifying => {
                *phase = Phase::Verifying;
                Ok(())
            }
            Phase::Closed => Err(MockError::SessionClosed),
            Phase::Recording => Err(MockError::InvalidPhase {
                operation: "verify",
                phase: *phase,
            }),
        }
    }

    /// Close the session. Returns false if it was closed already.
    pub fn close(&self) -> bool {
        let mut phase = lock(&self.phase);
        let was_open = *phase != Phase::Closed;
        *phase = Phase::Closed;
        was_open
    }

    pub fn push_pending(&self, mismatch: Mismatch) {
        lock(&self.pending).push(mismatch);
    }

    pub fn drain_pending(&self) -> Vec<Mismatch> {
        std::mem::take(&mut *lock(&self.pending))
    }
}
