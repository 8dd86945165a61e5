//! Worker pool and the Batch Point-Difference Engine
//!
//! Point arithmetic for the H check (tau window differences, MSMs) runs on a
//! dedicated rayon pool. Work is described by typed [`PointTask`]s; each task
//! owns its inputs, so workers share no mutable state, and results come back
//! in partition order.

#![forbid(unsafe_code)]

use std::ops::Range;

use ark_bn254::G1Projective;
use ark_ec::{AffineRepr, CurveGroup};
use rayon::prelude::*;
use tracing::debug;

use crate::G1;

/// Pool construction or task input failures.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// rayon could not spawn the threads
    #[error("failed to build worker pool: {0}")]
    Build(#[from] rayon::ThreadPoolBuildError),
    /// Element-wise operands of different lengths
    #[error("operand lengths differ ({lhs} vs {rhs})")]
    LengthMismatch {
        /// Left operand length.
        lhs: usize,
        /// Right operand length.
        rhs: usize,
    },
}

/// Hardware parallelism, never less than one worker.
pub fn default_workers() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1).max(1)
}

/// Split `len` items into at most `workers` contiguous ranges of `len / workers`
/// items; the last range absorbs the remainder and empty ranges are dropped.
pub fn partition(len: usize, workers: usize) -> Vec<Range<usize>> {
    let workers = workers.max(1);
    let size = len / workers;
    (0..workers)
        .map(|i| {
            let start = i * size;
            let end = if i == workers - 1 { len } else { start + size };
            start..end
        })
        .filter(|r| !r.is_empty())
        .collect()
}

/// Self-contained unit of point arithmetic.
#[derive(Clone, Debug)]
pub enum PointTask {
    /// Element-wise `lhs[i] − rhs[i]`, normalized to affine in one batch.
    SubAffine {
        /// Minuends.
        lhs: Vec<G1>,
        /// Subtrahends.
        rhs: Vec<G1>,
    },
    /// Batch-normalize projective points.
    Normalize(Vec<G1Projective>),
}

impl PointTask {
    /// Run the task on the calling thread.
    pub fn execute(self) -> Vec<G1> {
        match self {
            PointTask::SubAffine { lhs, rhs } => {
                let diff: Vec<G1Projective> =
                    lhs.iter().zip(&rhs).map(|(a, b)| a.into_group() - b).collect();
                G1Projective::normalize_batch(&diff)
            }
            PointTask::Normalize(points) => G1Projective::normalize_batch(&points),
        }
    }
}

/// Fixed-size pool for CPU-bound point work.
pub struct WorkerPool {
    pool: rayon::ThreadPool,
    workers: usize,
}

impl WorkerPool {
    /// Pool with `workers` threads, or [`default_workers`] when `None` or zero.
    pub fn new(workers: Option<usize>) -> Result<Self, PoolError> {
        let workers = workers.filter(|w| *w > 0).unwrap_or_else(default_workers);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("zkey-worker-{i}"))
            .build()?;
        debug!(workers, "worker pool ready");
        Ok(Self { pool, workers })
    }

    /// Thread count.
    #[inline]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run `op` inside the pool so nested rayon work (MSM) uses its threads.
    pub fn install<OP, R>(&self, op: OP) -> R
    where
        OP: FnOnce() -> R + Send,
        R: Send,
    {
        self.pool.install(op)
    }

    /// Execute tasks concurrently; output `i` belongs to task `i`.
    pub fn run(&self, tasks: Vec<PointTask>) -> Vec<Vec<G1>> {
        self.pool.install(|| tasks.into_par_iter().map(PointTask::execute).collect())
    }

    /// Element-wise affine difference `lhs − rhs`, split across the workers.
    pub fn batch_sub(&self, lhs: &[G1], rhs: &[G1]) -> Result<Vec<G1>, PoolError> {
        if lhs.len() != rhs.len() {
            return Err(PoolError::LengthMismatch { lhs: lhs.len(), rhs: rhs.len() });
        }
        let tasks = partition(lhs.len(), self.workers)
            .into_iter()
            .map(|r| PointTask::SubAffine { lhs: lhs[r.clone()].to_vec(), rhs: rhs[r].to_vec() })
            .collect();
        Ok(self.run(tasks).concat())
    }

    /// Batch-normalize projective points, split across the workers.
    pub fn normalize_batch(&self, points: &[G1Projective]) -> Vec<G1> {
        let tasks = partition(points.len(), self.workers)
            .into_iter()
            .map(|r| PointTask::Normalize(points[r].to_vec()))
            .collect();
        self.run(tasks).concat()
    }
}
