//! Parallel-for used to encode groups.
//!
//! The encoder only needs "call `task(i)` for every `i` in `0..count`" and
//! does not care about order or threads. Each task writes to its own output
//! slot, so runners need no synchronization beyond joining.

/// Runs independent tasks, possibly concurrently.
///
/// Implementations must call `task` exactly once for every index in
/// `0..count` and return only after all calls have finished.
pub trait ParallelRunner {
    fn run(&self, count: usize, task: &(dyn Fn(usize) + Sync));
}

/// Runs tasks one after another on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialRunner;

impl ParallelRunner for SequentialRunner {
    fn run(&self, count: usize, task: &(dyn Fn(usize) + Sync)) {
        (0..count).for_each(task);
    }
}

/// Runs tasks on the global rayon thread pool.
#[cfg(feature = "parallel")]
#[cfg_attr(docsrs, doc(cfg(feature = "parallel")))]
#[derive(Debug, Clone, Copy, Default)]
pub struct RayonRunner;

#[cfg(feature = "parallel")]
impl ParallelRunner for RayonRunner {
    fn run(&self, count: usize, task: &(dyn Fn(usize) + Sync)) {
        use rayon::prelude::*;

        (0..count).into_par_iter().for_each(task);
    }
}

impl<R: ParallelRunner + ?Sized> ParallelRunner for &R {
    fn run(&self, count: usize, task: &(dyn Fn(usize) + Sync)) {
        (**self).run(count, task);
    }
}
