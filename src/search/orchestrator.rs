//! Parallel trial evaluation over partitions of the period grid
//!
//! The number of trials per period decreases with the period: the frequency grid gives the
//! period density $\propto P^{-2}$, while the number of epochs per period grows as
//! $1 / q \propto P^{2/3}$ for the density-invariant duty cycle $q$. The work density is
//! therefore $\propto P^{-\gamma}$ with $\gamma = 4/3$, and partition boundaries are the nodes of
//! its inverse cumulative distribution:
//! $$
//! P_k = \left(P_\mathrm{min}^{1-\gamma} + \frac{k}{N}\left(P_\mathrm{max}^{1-\gamma} - P_\mathrm{min}^{1-\gamma}\right)\right)^{1/(1-\gamma)}.
//! $$

use crate::error::SearchError;
use crate::params::EvaluatorParams;
use crate::search::evaluator::{BestTrials, SearchData, evaluate};

use log::debug;
use ndarray::ArrayView1;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::any::Any;
use std::ops::Range;
use std::panic::{AssertUnwindSafe, catch_unwind};

/// Power-law index of the work density over period
const WORK_DENSITY_INDEX: f64 = 4.0 / 3.0;

/// Trial evaluator dispatching partitions of the period grid to a worker pool
///
/// The pool is built once and reused by every search pass of a run. Workers are pure functions
/// of their partition and the shared [SearchData], results are concatenated in partition order.
pub struct Orchestrator {
    pool: Option<ThreadPool>,
}

impl Orchestrator {
    pub fn new(params: &EvaluatorParams) -> Result<Self, SearchError> {
        let pool = if params.parallel {
            let pool = ThreadPoolBuilder::new()
                .num_threads(params.n_workers)
                .thread_name(|i| format!("transit-search-{i}"))
                .build()
                .map_err(|err| SearchError::ThreadPool(err.to_string()))?;
            debug!("Worker pool of {} threads", pool.current_num_threads());
            Some(pool)
        } else {
            None
        };
        Ok(Self { pool })
    }

    /// Number of partitions the period grid is split into
    pub fn n_partitions(&self) -> usize {
        self.pool
            .as_ref()
            .map_or(1, |pool| pool.current_num_threads())
    }

    /// Best trials for every period of the grid, in period order
    ///
    /// Any failed worker aborts the whole evaluation, no partial result is returned.
    pub fn evaluate(&self, data: &SearchData) -> Result<BestTrials, SearchError> {
        self.evaluate_with(data, evaluate)
    }

    fn evaluate_with<F>(&self, data: &SearchData, worker: F) -> Result<BestTrials, SearchError>
    where
        F: Fn(&SearchData, Range<usize>) -> Result<BestTrials, SearchError> + Sync,
    {
        let partitions = equal_work_partitions(data.grid.periods(), self.n_partitions());
        debug!("Period grid partitions: {partitions:?}");
        let results: Vec<BestTrials> = match &self.pool {
            Some(pool) => pool.install(|| {
                partitions
                    .par_iter()
                    .enumerate()
                    .map(|(i, range)| run_partition(&worker, data, i, range.clone()))
                    .collect::<Result<Vec<_>, SearchError>>()
            })?,
            None => partitions
                .iter()
                .enumerate()
                .map(|(i, range)| run_partition(&worker, data, i, range.clone()))
                .collect::<Result<Vec<_>, SearchError>>()?,
        };
        let mut best = BestTrials::with_capacity(data.grid.len());
        for result in results {
            best.append(result);
        }
        Ok(best)
    }
}

fn run_partition<F>(
    worker: &F,
    data: &SearchData,
    partition: usize,
    range: Range<usize>,
) -> Result<BestTrials, SearchError>
where
    F: Fn(&SearchData, Range<usize>) -> Result<BestTrials, SearchError>,
{
    catch_unwind(AssertUnwindSafe(|| worker(data, range))).unwrap_or_else(|payload| {
        Err(SearchError::WorkerFailure {
            partition,
            message: panic_message(payload.as_ref()),
        })
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Split increasing periods into at most `n` contiguous non-empty index ranges of equal work
pub fn equal_work_partitions(periods: ArrayView1<f64>, n: usize) -> Vec<Range<usize>> {
    let size = periods.len();
    if size == 0 {
        return vec![];
    }
    let n = n.clamp(1, size);
    let (min, max) = (periods[0], periods[size - 1]);
    let exponent = 1.0 - WORK_DENSITY_INDEX;
    let (cdf_min, cdf_max) = (min.powf(exponent), max.powf(exponent));

    let mut bounds = Vec::with_capacity(n + 1);
    bounds.push(0);
    for k in 1..n {
        let boundary =
            (cdf_min + (k as f64 / n as f64) * (cdf_max - cdf_min)).powf(exponent.recip());
        let index = periods
            .iter()
            .position(|&period| period >= boundary)
            .unwrap_or(size);
        bounds.push(index);
    }
    bounds.push(size);
    bounds.dedup();
    bounds
        .windows(2)
        .map(|w| w[0]..w[1])
        .filter(|range| !range.is_empty())
        .collect()
}
