use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Serialize;

/// Counters describing pipeline traffic. All updates are `Relaxed`; nothing
/// here participates in slice hand-off.
#[derive(Debug, Default)]
pub struct PipelineDiagnostics {
    pub charges: AtomicUsize,
    pub reads: AtomicUsize,
    pub idle_charges: AtomicUsize,
    pub idle_reads: AtomicUsize,
    pub claim_attempts: AtomicUsize,
    pub claim_conflicts: AtomicUsize,
}

impl PipelineDiagnostics {
    pub fn reset(&self) {
        self.charges.store(0, Ordering::Relaxed);
        self.reads.store(0, Ordering::Relaxed);
        self.idle_charges.store(0, Ordering::Relaxed);
        self.idle_reads.store(0, Ordering::Relaxed);
        self.claim_attempts.store(0, Ordering::Relaxed);
        self.claim_conflicts.store(0, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            charges: self.charges.load(Ordering::Relaxed),
            reads: self.reads.load(Ordering::Relaxed),
            idle_charges: self.idle_charges.load(Ordering::Relaxed),
            idle_reads: self.idle_reads.load(Ordering::Relaxed),
            claim_attempts: self.claim_attempts.load(Ordering::Relaxed),
            claim_conflicts: self.claim_conflicts.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticsSnapshot {
    /// Successful charge calls.
    pub charges: usize,
    /// Successful read calls.
    pub reads: usize,
    /// Charge calls that found no claimable slice.
    pub idle_charges: usize,
    /// Read calls that found no claimable slice.
    pub idle_reads: usize,
    /// State loads performed while scanning, across both roles.
    pub claim_attempts: usize,
    /// Compare-and-swap attempts lost to another agent.
    pub claim_conflicts: usize,
}
