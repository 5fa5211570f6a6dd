use std::fmt::{self, Display};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::thread::ThreadId;

use crate::target::{Signature, Target};
use crate::value::Value;

/// One observed call, as reported by the interception provider.
///
/// Immutable once logged. Argument slots always hold concrete values.
#[derive(Clone, Debug)]
pub struct Invocation {
    seq: u64,
    target: Target,
    signature: Signature,
    args: Vec<Value>,
    thread: ThreadId,
}

impl Invocation {
    /// Position in the session's invocation log, starting at 0.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// The thread the call was made on.
    pub fn thread(&self) -> ThreadId {
        self.thread
    }
}

impl Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}(", self.target, self.signature.name())?;
        for (index, arg) in self.args.iter().enumerate() {
            if index > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{arg}")?;
        }
        write!(f, ")")
    }
}

/// Session-scoped, append-only record of every dispatched call.
pub(crate) struct InvocationLog {
    next_seq: AtomicU64,
    entries: Mutex<Vec<Invocation>>,
}

impl InvocationLog {
    pub fn new() -> Self {
        Self {
            next_seq: AtomicU64::new(0),
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Build the next invocation record without logging it yet.
    pub fn observe(&self, target: &Target, signature: &Signature, args: Vec<Value>) -> Invocation {
        Invocation {
            seq: self.next_seq.fetch_add(1, Ordering::SeqCst),
            target: target.clone(),
            signature: signature.clone(),
            args,
            thread: std::thread::current().id(),
        }
    }

    pub fn append(&self, invocation: Invocation) {
        let mut entries = self.entries.lock().unwrap_or_else(|err| err.into_inner());
        // Sequence numbers are handed out before the owning target lock is released,
        // but appends of different targets may interleave.
        let position = entries
            .iter()
            .rposition(|entry| entry.seq < invocation.seq)
            .map(|index| index + 1)
            .unwrap_or(0);
        entries.insert(position, invocation);
    }

    pub fn snapshot(&self) -> Vec<Invocation> {
        self.entries
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .len()
    }
}
