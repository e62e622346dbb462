/// Error returned from [crate::FluxSeries] constructors
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FluxSeriesError {
    #[error("time, flux and flux error arrays have different lengths: {t}, {flux}, {flux_err}")]
    LengthMismatch {
        t: usize,
        flux: usize,
        flux_err: usize,
    },

    #[error("time array contains non-finite value at index {index}")]
    NonFiniteTime { index: usize },

    #[error("time must strictly increase, violated at index {index}")]
    Unsorted { index: usize },

    #[error("flux series has {actual} finite samples, at least {minimum} are required")]
    ShortTimeSeries { actual: usize, minimum: usize },
}

/// Error returned from the transit search
///
/// No error is ever retried: the search is deterministic, so every error carries enough context
/// to find the upstream problem and the caller decides what to do with it.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SearchError {
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("minimum period {min} must be positive and smaller than maximum period {max}")]
    InvalidPeriodRange { min: f64, max: f64 },

    #[error(
        "period grid has {actual} nodes, at least {minimum} are required, time span or resolution is insufficient"
    )]
    TooFewPeriods { actual: usize, minimum: usize },

    #[error(
        "trial duration {duration_hours} h is unresolvable at cadence {cadence_hours} h, at least {minimum_cadences} cadences are required"
    )]
    UnresolvableDuration {
        duration_hours: f64,
        cadence_hours: f64,
        minimum_cadences: f64,
    },

    #[error(
        "in-transit mean flux is not finite for period {period}, duration {duration_hours} h, resolution level {level}"
    )]
    NonFiniteInTransitMean {
        period: f64,
        duration_hours: f64,
        level: usize,
    },

    #[error("local noise of the power curve is zero for all {periods} periods")]
    DegenerateStatistic { periods: usize },

    #[error("worker of partition {partition} failed: {message}")]
    WorkerFailure { partition: usize, message: String },

    #[error("cannot build worker pool: {0}")]
    ThreadPool(String),

    #[error(transparent)]
    Series(#[from] FluxSeriesError),
}

impl SearchError {
    pub(crate) fn invalid_parameter(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

/// Error returned from [crate::CsvResultCache] and [crate::TransitSearch::run_cached]
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("run identifier {0:?} must be non-empty and consist of ASCII letters, digits, '-', '_' or '.'")]
    InvalidRunId(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Search(#[from] SearchError),
}
