//! Trial evaluation, significance scoring and iterative signal extraction

mod window;
pub use window::{CircularWindow, PhaseIntervals, phase};

pub mod evaluator;
pub use evaluator::{BestTrials, SearchData};

pub mod orchestrator;
pub use orchestrator::Orchestrator;

pub mod significance;
pub use significance::Significance;

pub mod extraction;
pub use extraction::{DetectionResult, Periodogram, TerminationReason};
