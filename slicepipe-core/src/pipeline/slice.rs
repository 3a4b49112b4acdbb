//! Per-slice atomic state machine.
//!
//! ```text
//! Free ──(writer CAS)──► InUseW ──(write done)──► Valid ──(reader CAS)──► InUseR
//!   ▲                                                                       │
//!   └──────── Listed ◄──────────────────(read done)──────────────────────────┘
//!               │
//!               └──(writer CAS)──► InUseW ...
//! ```
//!
//! `InUseW` / `InUseR` are only ever entered through a successful
//! compare-and-swap and are always left again by the same call.

use std::sync::atomic::{AtomicU64, AtomicU8, AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};

/// Main state of one slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[repr(u8)]
pub enum MainState {
    /// Never written since construction.
    Free = 0,
    /// Consumed by a reader; claimable by the next writer.
    Listed = 1,
    /// Exclusively held by a writer.
    InUseW = 2,
    /// Fully written; claimable by a reader.
    Valid = 3,
    /// Exclusively held by a reader.
    InUseR = 4,
}

impl MainState {
    /// States a writer may claim from.
    pub fn is_writable(self) -> bool {
        matches!(self, MainState::Free | MainState::Listed)
    }

    /// States a reader may claim from.
    pub fn is_readable(self) -> bool {
        self == MainState::Valid
    }

    pub fn is_locked(self) -> bool {
        matches!(self, MainState::InUseW | MainState::InUseR)
    }

    fn from_raw(raw: u8) -> Self {
        match raw {
            0 => MainState::Free,
            1 => MainState::Listed,
            2 => MainState::InUseW,
            3 => MainState::Valid,
            4 => MainState::InUseR,
            // Only values written by `as u8` above ever reach the atomic.
            _ => unreachable!("corrupt slice state {raw}"),
        }
    }
}

/// Identifier of a charging or reading agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(pub u32);

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "agent-{}", self.0)
    }
}

/// Atomic slot for an optional owner. Stores `id + 1`; zero means none.
#[derive(Debug)]
struct OwnerCell(AtomicU64);

impl OwnerCell {
    fn new(owner: Option<AgentId>) -> Self {
        Self(AtomicU64::new(Self::encode(owner)))
    }

    fn encode(owner: Option<AgentId>) -> u64 {
        owner.map_or(0, |id| u64::from(id.0) + 1)
    }

    fn get(&self) -> Option<AgentId> {
        match self.0.load(Ordering::Relaxed) {
            0 => None,
            // Encoded from a u32, so the subtraction always fits.
            raw => Some(AgentId((raw - 1) as u32)),
        }
    }

    fn set(&self, owner: Option<AgentId>) {
        self.0.store(Self::encode(owner), Ordering::Relaxed);
    }
}

/// State machine guarding one contiguous range of the pipeline buffer.
#[derive(Debug)]
pub struct SliceState {
    builder_id: OwnerCell,
    checker_id: OwnerCell,
    main_state: AtomicU8,
    processed: AtomicUsize,
}

impl Default for SliceState {
    fn default() -> Self {
        Self::new()
    }
}

impl SliceState {
    /// A `Free` slice with no owners and a zero progress counter.
    pub fn new() -> Self {
        Self::with_owners(None, None)
    }

    /// Writer-side view: builder set, checker none.
    pub fn for_builder(builder: AgentId) -> Self {
        Self::with_owners(Some(builder), None)
    }

    /// Reader-side view: checker set, builder none.
    pub fn for_checker(checker: AgentId) -> Self {
        Self::with_owners(None, Some(checker))
    }

    fn with_owners(builder: Option<AgentId>, checker: Option<AgentId>) -> Self {
        Self {
            builder_id: OwnerCell::new(builder),
            checker_id: OwnerCell::new(checker),
            main_state: AtomicU8::new(MainState::Free as u8),
            processed: AtomicUsize::new(0),
        }
    }

    /// Current state (acquire).
    pub fn state(&self) -> MainState {
        MainState::from_raw(self.main_state.load(Ordering::Acquire))
    }

    /// Last writer to claim this slice.
    pub fn builder_id(&self) -> Option<AgentId> {
        self.builder_id.get()
    }

    /// Last reader to claim this slice.
    pub fn checker_id(&self) -> Option<AgentId> {
        self.checker_id.get()
    }

    /// Samples transferred by the current (or last) owner since its claim.
    ///
    /// Diagnostic only; readiness is decided by `state()` alone.
    pub fn processed(&self) -> usize {
        self.processed.load(Ordering::Acquire)
    }

    /// Try to move `observed → target`. Acquire on success so the new owner
    /// sees everything published by the previous owner's release store.
    pub(crate) fn try_claim(&self, observed: MainState, target: MainState) -> bool {
        self.main_state
            .compare_exchange(
                observed as u8,
                target as u8,
                Ordering::Acquire,
                Ordering::Relaxed,
            )
            .is_ok()
    }

    pub(crate) fn begin_write(&self, builder: Option<AgentId>) {
        self.builder_id.set(builder);
        self.processed.store(0, Ordering::Relaxed);
    }

    pub(crate) fn begin_read(&self, checker: Option<AgentId>) {
        self.checker_id.set(checker);
        self.processed.store(0, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn tick(&self) {
        self.processed.fetch_add(1, Ordering::Release);
    }

    /// Release the slice into `next`, publishing all sample accesses made
    /// while it was held.
    pub(crate) fn publish(&self, next: MainState) {
        self.main_state.store(next as u8, Ordering::Release);
    }

    pub fn snapshot(&self, index: usize) -> SliceSnapshot {
        SliceSnapshot {
            index,
            state: self.state(),
            builder_id: self.builder_id(),
            checker_id: self.checker_id(),
            processed: self.processed(),
        }
    }
}

/// Point-in-time view of one slice, for consoles and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SliceSnapshot {
    pub index: usize,
    pub state: MainState,
    pub builder_id: Option<AgentId>,
    pub checker_id: Option<AgentId>,
    pub processed: usize,
}
