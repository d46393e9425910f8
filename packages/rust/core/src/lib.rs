//! End-to-end scan orchestration.
//!
//! Wires the researcher, discoverer, extractor, and validator into a
//! five-phase pipeline behind [`ScanOrchestrator`]. Callers observe
//! progress through the [`ScanProgress`] trait.

pub mod progress;
pub mod scanner;

pub use progress::{ScanPhase, ScanProgress, SilentProgress};
pub use scanner::{ScanOrchestrator, ScanServices};
