#![doc = include_str!("../README.md")]

mod array_stats;

mod cache;
pub use cache::CsvResultCache;

mod data;
pub use data::FluxSeries;

mod error;
pub use error::{CacheError, FluxSeriesError, SearchError};

pub mod grid;
pub use grid::{DutyCycleTrials, PeriodGrid, TrialGrid};

pub mod model;
pub use model::{ModelComponent, ModelComponentTrait, ModelKind};

pub mod params;
pub use params::{
    EvaluatorParams, ExtractionParams, GridParams, Polarity, RebinParams, ScorerParams,
};

pub mod rebin;
pub use rebin::{ResolutionLevel, ResolutionLevels};

pub mod search;
pub use search::{DetectionResult, Periodogram, TerminationReason};

mod transit_search;
pub use transit_search::{SearchOutcome, TransitSearch};

mod types;

pub use ndarray;
