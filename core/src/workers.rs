//! A bounded worker pool for the file-granularity parallelism of §5: S1, S4
//! and S10 dispatch one job per capture file; S2/S3/S5-S9 run sequentially
//! per session within whichever worker picked that session up.

use crossbeam_channel::{bounded, Sender};
use std::thread::JoinHandle;

/// Runs `jobs` across `worker_count` threads, collecting every result. A
/// panicking or error-returning job never stops the others (§5
/// "Cancellation"): results are gathered positionally so callers can tell
/// which input failed.
pub fn run_pool<T, R, F>(jobs: Vec<T>, worker_count: usize, work: F) -> Vec<R>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> R + Send + Sync + 'static,
{
    let worker_count = worker_count.max(1);
    let n = jobs.len();
    let (job_tx, job_rx) = bounded::<(usize, T)>(n.max(1));
    let (res_tx, res_rx) = bounded::<(usize, R)>(n.max(1));

    for (idx, job) in jobs.into_iter().enumerate() {
        job_tx.send((idx, job)).expect("job channel open");
    }
    drop(job_tx);

    let work = std::sync::Arc::new(work);
    let handles: Vec<JoinHandle<()>> = (0..worker_count)
        .map(|_| {
            let job_rx = job_rx.clone();
            let res_tx: Sender<(usize, R)> = res_tx.clone();
            let work = work.clone();
            std::thread::spawn(move || {
                while let Ok((idx, job)) = job_rx.recv() {
                    let result = work(job);
                    if res_tx.send((idx, result)).is_err() {
                        break;
                    }
                }
            })
        })
        .collect();
    drop(res_tx);

    let mut slots: Vec<Option<R>> = (0..n).map(|_| None).collect();
    while let Ok((idx, result)) = res_rx.recv() {
        slots[idx] = Some(result);
    }

    for handle in handles {
        let _ = handle.join();
    }

    slots.into_iter().map(|s| s.expect("every job completes")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_order_and_runs_all() {
        let jobs: Vec<i32> = (0..50).collect();
        let results = run_pool(jobs, 4, |x| x * 2);
        let expected: Vec<i32> = (0..50).map(|x| x * 2).collect();
        assert_eq!(results, expected);
    }
}
