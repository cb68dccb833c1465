//! Parallel-for over the particle range.
//!
//! Every pipeline stage is written as a per-particle closure that reads the
//! previous stages' buffers and writes exactly one slot of its own output
//! buffer. The executor decides how those closures are scheduled.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

pub trait StageExecutor: Send + Sync {
    /// Run `f(i, &mut out[i])` for every index.
    fn for_each_mut<T, F>(&self, out: &mut [T], f: F)
    where
        T: Send,
        F: Fn(usize, &mut T) + Sync + Send;

    /// Fill `out[i] = f(i)` for every index.
    fn map_into<T, F>(&self, out: &mut [T], f: F)
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send,
    {
        self.for_each_mut(out, |i, slot| *slot = f(i));
    }
}

/// Runs stages on the calling thread, in index order.
#[derive(Clone, Copy, Debug, Default)]
pub struct SerialExecutor;

impl StageExecutor for SerialExecutor {
    fn for_each_mut<T, F>(&self, out: &mut [T], f: F)
    where
        T: Send,
        F: Fn(usize, &mut T) + Sync + Send,
    {
        for (i, slot) in out.iter_mut().enumerate() {
            f(i, slot);
        }
    }
}

/// Runs stages on the rayon thread pool.
#[cfg(feature = "parallel")]
#[derive(Clone, Copy, Debug, Default)]
pub struct ParallelExecutor;

#[cfg(feature = "parallel")]
impl StageExecutor for ParallelExecutor {
    fn for_each_mut<T, F>(&self, out: &mut [T], f: F)
    where
        T: Send,
        F: Fn(usize, &mut T) + Sync + Send,
    {
        out.par_iter_mut()
            .enumerate()
            .for_each(|(i, slot)| f(i, slot));
    }
}

#[cfg(feature = "parallel")]
pub type DefaultExecutor = ParallelExecutor;

#[cfg(not(feature = "parallel"))]
pub type DefaultExecutor = SerialExecutor;
