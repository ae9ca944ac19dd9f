//! Input Event Model
//!
//! The typed stream the instrumentation layer feeds the engine. Events
//! are a tagged variant dispatched with a single `match`; there is no
//! handler hierarchy to extend, only arms to add.
//!
//! Memory accesses carry the shadow slot the instrumentation obtained from
//! [`RaceDetector::make_shadow_var`](crate::RaceDetector::make_shadow_var)
//! on first touch, plus an `Arc`'d static description of the access site
//! so per-event cost stays at a couple of refcount bumps.

use crate::domain::shadow::VarState;
use racetrack_core::{BarrierId, ClassId, LockId, SiteId, Tid, VolatileId};
use std::fmt;
use std::sync::Arc;

/// What kind of memory location an access touches
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessTarget {
    /// An object or static field
    Field {
        /// Declaring class
        owner: ClassId,
        /// Field name, for report text
        name: String,
        /// Static fields additionally order against class initialization
        is_static: bool,
    },
    /// An element of an array object
    Array {
        /// Identity of the array object
        object: u64,
    },
    /// A volatile variable (synchronization, not race-checked)
    Volatile {
        /// Identity of the volatile
        id: VolatileId,
    },
}

/// Where in the target program an access site lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    /// Enclosing method, `Class.method` style
    pub method: String,
    /// Source line
    pub line: u32,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.method, self.line)
    }
}

/// Static description of one access site, shared by all its events
#[derive(Debug, Clone)]
pub struct AccessInfo {
    /// De-duplication key for reports from this site
    pub site: SiteId,
    /// The location being accessed
    pub target: AccessTarget,
    /// Source position of the access
    pub location: SourceLocation,
}

impl AccessInfo {
    /// Human-readable identity of the accessed location
    pub fn describe(&self, element: Option<usize>) -> String {
        match &self.target {
            AccessTarget::Field { owner, name, .. } => format!("{}.{}", owner, name),
            AccessTarget::Array { object } => match element {
                Some(index) => format!("array#{}[{}]", object, index),
                None => format!("array#{}", object),
            },
            AccessTarget::Volatile { id } => format!("volatile {}", id),
        }
    }
}

/// The shadow the instrumentation attached to a location
#[derive(Debug, Clone)]
pub enum ShadowSlot {
    /// Race-checked data location
    Data(Arc<VarState>),
    /// Volatile location; ordering only, no `VarState`
    Volatile,
}

/// One memory access by one thread
#[derive(Debug, Clone)]
pub struct AccessEvent {
    /// The accessing thread
    pub tid: Tid,
    /// Write or read
    pub is_write: bool,
    /// Array index for array accesses
    pub element: Option<usize>,
    /// Shadow slot for the accessed location
    pub shadow: ShadowSlot,
    /// Static site description
    pub info: Arc<AccessInfo>,
}

/// Everything the instrumentation can tell the engine
#[derive(Debug, Clone)]
pub enum Event {
    /// A thread became known (first event for its tid)
    NewThread {
        /// The new thread
        tid: Tid,
    },
    /// `parent` started `child`
    Fork {
        /// Forking thread
        parent: Tid,
        /// Forked thread
        child: Tid,
    },
    /// `joiner` finished joining on the terminated `joinee`
    Join {
        /// Joining thread
        joiner: Tid,
        /// Terminated thread being joined
        joinee: Tid,
    },
    /// A thread terminated
    Stop {
        /// The terminating thread
        tid: Tid,
    },
    /// A field, array, or volatile access
    Access(AccessEvent),
    /// Monitor acquired
    Acquire {
        /// Acquiring thread
        tid: Tid,
        /// The monitor
        lock: LockId,
    },
    /// Monitor released
    Release {
        /// Releasing thread
        tid: Tid,
        /// The monitor
        lock: LockId,
    },
    /// About to wait on a monitor (releases it)
    PreWait {
        /// Waiting thread
        tid: Tid,
        /// The monitor
        lock: LockId,
    },
    /// Woke from waiting on a monitor (reacquired it)
    PostWait {
        /// Waking thread
        tid: Tid,
        /// The monitor
        lock: LockId,
    },
    /// About to notify a monitor
    PreNotify {
        /// Notifying thread
        tid: Tid,
        /// The monitor
        lock: LockId,
    },
    /// Finished notifying a monitor
    PostNotify {
        /// Notifying thread
        tid: Tid,
        /// The monitor
        lock: LockId,
    },
    /// Arrived at a barrier
    BarrierEnter {
        /// Arriving thread
        tid: Tid,
        /// The barrier
        barrier: BarrierId,
    },
    /// Left a barrier
    BarrierExit {
        /// Leaving thread
        tid: Tid,
        /// The barrier
        barrier: BarrierId,
    },
    /// A class finished static initialization
    ClassInitialized {
        /// Initializing thread
        tid: Tid,
        /// The class
        class: ClassId,
    },
    /// A thread is about to touch a class's statics for the first time
    ClassAccessed {
        /// Accessing thread
        tid: Tid,
        /// The class
        class: ClassId,
    },
}

impl Event {
    /// The thread this event executes on
    pub fn tid(&self) -> Tid {
        match self {
            Event::NewThread { tid }
            | Event::Stop { tid }
            | Event::Acquire { tid, .. }
            | Event::Release { tid, .. }
            | Event::PreWait { tid, .. }
            | Event::PostWait { tid, .. }
            | Event::PreNotify { tid, .. }
            | Event::PostNotify { tid, .. }
            | Event::BarrierEnter { tid, .. }
            | Event::BarrierExit { tid, .. }
            | Event::ClassInitialized { tid, .. }
            | Event::ClassAccessed { tid, .. } => *tid,
            Event::Fork { parent, .. } => *parent,
            Event::Join { joiner, .. } => *joiner,
            Event::Access(access) => access.tid,
        }
    }
}
