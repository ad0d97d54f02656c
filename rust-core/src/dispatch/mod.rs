//! Parallel chunk dispatcher
//!
//! Splits independent work (spectrogram rows, archive sub-intervals)
//! across a bounded rayon pool and reassembles results in input order.
//! The first worker error cancels outstanding chunks and is returned
//! unchanged; partial results are discarded.

use crate::error::{Result, SpectralError};
use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;

/// Runs tasks on at most `nproc` worker threads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkDispatcher {
    nproc: usize,
}

impl Default for ChunkDispatcher {
    fn default() -> Self {
        Self { nproc: 1 }
    }
}

impl ChunkDispatcher {
    /// `nproc` of zero is treated as one (serial)
    pub fn new(nproc: usize) -> Self {
        Self { nproc: nproc.max(1) }
    }

    pub fn nproc(&self) -> usize {
        self.nproc
    }

    /// Apply `work` to every task, returning results in task order
    ///
    /// Runs on the calling thread when `nproc` is one or there is only a
    /// single task.
    pub fn run<T, R, F>(&self, tasks: Vec<T>, work: F) -> Result<Vec<R>>
    where
        T: Send,
        R: Send,
        F: Fn(usize, T) -> Result<R> + Sync,
    {
        let total = tasks.len();
        if self.nproc == 1 || total <= 1 {
            return tasks
                .into_iter()
                .enumerate()
                .map(|(index, task)| work(index, task))
                .collect();
        }

        let threads = self.nproc.min(total);
        log::debug!("dispatching {total} chunks over {threads} workers");
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|e| SpectralError::WorkerPool(e.to_string()))?;

        let cancelled = AtomicBool::new(false);
        let (tx, rx) = mpsc::channel::<(usize, Result<R>)>();

        pool.scope(|scope| {
            for (index, task) in tasks.into_iter().enumerate() {
                let tx = tx.clone();
                let work = &work;
                let cancelled = &cancelled;
                scope.spawn(move |_| {
                    if cancelled.load(Ordering::SeqCst) {
                        return;
                    }
                    let result = work(index, task);
                    if result.is_err() {
                        cancelled.store(true, Ordering::SeqCst);
                    }
                    // Receiver outlives the scope
                    let _ = tx.send((index, result));
                });
            }
        });
        drop(tx);

        let mut slots: Vec<Option<R>> = (0..total).map(|_| None).collect();
        for (index, result) in rx {
            match result {
                Ok(value) => slots[index] = Some(value),
                Err(err) => {
                    log::debug!("chunk {index} failed, discarding partial results");
                    return Err(err);
                }
            }
        }

        slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.ok_or_else(|| SpectralError::WorkerPool(format!("chunk {index} produced no result")))
            })
            .collect()
    }
}

/// Split `0..total` into at most `parts` contiguous, ordered ranges of
/// (nearly) equal size
pub fn partition(total: usize, parts: usize) -> Vec<Range<usize>> {
    if total == 0 {
        return Vec::new();
    }
    let parts = parts.clamp(1, total);
    let size = total.div_ceil(parts);
    (0..total)
        .step_by(size)
        .map(|start| start..(start + size).min(total))
        .collect()
}

/// Split `[start, end)` into `parts` equal contiguous sub-intervals
pub fn partition_interval(start: f64, end: f64, parts: usize) -> Vec<(f64, f64)> {
    let parts = parts.max(1);
    let width = (end - start) / parts as f64;
    (0..parts)
        .map(|i| {
            let lo = start + i as f64 * width;
            let hi = if i + 1 == parts {
                end
            } else {
                start + (i + 1) as f64 * width
            };
            (lo, hi)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition() {
        assert_eq!(partition(10, 3), vec![0..4, 4..8, 8..10]);
        assert_eq!(partition(2, 8), vec![0..1, 1..2]);
        assert_eq!(partition(5, 0), vec![0..5]);
        assert!(partition(0, 4).is_empty());
    }

    #[test]
    fn test_partition_interval_is_contiguous() {
        let parts = partition_interval(100.0, 110.0, 4);
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0].0, 100.0);
        assert_eq!(parts[3].1, 110.0);
        for pair in parts.windows(2) {
            assert_eq!(pair[0].1, pair[1].0);
        }
    }

    #[test]
    fn test_results_in_task_order() {
        let dispatcher = ChunkDispatcher::new(4);
        let tasks: Vec<u64> = (0..64).collect();
        let out = dispatcher
            .run(tasks, |index, task| {
                // Uneven work so completion order differs from task order
                let spin = (64 - task) * 1000;
                let mut acc = 0u64;
                for i in 0..spin {
                    acc = acc.wrapping_add(i);
                }
                Ok((index as u64, task * 2, acc))
            })
            .unwrap();
        for (i, (index, doubled, _)) in out.iter().enumerate() {
            assert_eq!(*index, i as u64);
            assert_eq!(*doubled, 2 * i as u64);
        }
    }

    #[test]
    fn test_serial_and_parallel_agree() {
        let tasks: Vec<f64> = (0..17).map(|i| i as f64 * 0.1).collect();
        let work = |_: usize, x: f64| Ok(x.sin() * x.exp());
        let serial = ChunkDispatcher::new(1).run(tasks.clone(), work).unwrap();
        let parallel = ChunkDispatcher::new(3).run(tasks, work).unwrap();
        assert_eq!(serial, parallel);
    }

    #[test]
    fn test_worker_error_aborts() {
        let dispatcher = ChunkDispatcher::new(3);
        let result: Result<Vec<usize>> = dispatcher.run((0..12).collect(), |_, task: usize| {
            if task == 5 {
                Err(SpectralError::MissingData {
                    channel: "X1:TEST".into(),
                    start: 5.0,
                    end: 6.0,
                })
            } else {
                Ok(task)
            }
        });
        match result {
            Err(SpectralError::MissingData { channel, .. }) => assert_eq!(channel, "X1:TEST"),
            other => panic!("expected missing data error, got {other:?}"),
        }
    }

    #[test]
    fn test_serial_error_propagates() {
        let result: Result<Vec<()>> = ChunkDispatcher::new(1).run(vec![1, 2], |_, task: i32| {
            if task == 2 {
                Err(SpectralError::InvalidArgument("bad chunk".into()))
            } else {
                Ok(())
            }
        });
        assert!(matches!(result, Err(SpectralError::InvalidArgument(_))));
    }
}
