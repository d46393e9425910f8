//! Progress reporting for callers that want to observe a running scan.

use std::time::Duration;

/// The five sequential pipeline phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPhase {
    Research,
    Discovery,
    Extraction,
    Validation,
    Sync,
}

impl ScanPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Research => "research",
            Self::Discovery => "discovery",
            Self::Extraction => "extraction",
            Self::Validation => "validation",
            Self::Sync => "sync",
        }
    }
}

impl std::fmt::Display for ScanPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observer passed into the orchestrator by the caller. Replaces any
/// process-wide progress state: each scan reports to exactly the object
/// it was handed.
pub trait ScanProgress: Send + Sync {
    fn phase_started(&self, phase: ScanPhase);
    fn phase_completed(&self, phase: ScanPhase, duration: Duration);
}

/// No-op reporter for library and scripted use.
pub struct SilentProgress;

impl ScanProgress for SilentProgress {
    fn phase_started(&self, _phase: ScanPhase) {}
    fn phase_completed(&self, _phase: ScanPhase, _duration: Duration) {}
}
