use std::sync::{mpsc, Arc};
use std::thread;

use crate::{
    group::{WorkerCtx, WorkerGroup},
    proxy::Controller,
    registry::Registry,
    worker::{Worker, WorkerState},
    Error,
};

/// Main app, runs a controller function against a group of parallel workers
pub struct Pmi {
    registry: Arc<Registry>,
}
impl Pmi {
    pub fn new(registry: Registry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    /// Spawn `num_workers - 1` worker threads (rank 0 is the controller
    /// itself), run `f` on the controller, then shut the group down and
    /// join every thread. The group lives exactly as long as this call.
    pub fn run<F>(&mut self, num_workers: usize, f: F) -> Result<(), Error>
    where
        F: FnOnce(&mut Controller) -> Result<(), Error>,
    {
        assert!(num_workers > 0, "Worker group should be non-empty");

        let (tx, rx) = mpsc::channel();
        let mut senders = Vec::with_capacity(num_workers - 1);
        let mut handles = Vec::with_capacity(num_workers - 1);
        for rank in 1..num_workers {
            let (tx2, rx2) = mpsc::channel();
            senders.push(tx2);

            let state = WorkerState::new(
                WorkerCtx {
                    rank,
                    size: num_workers,
                },
                Arc::clone(&self.registry),
            );
            let tx_worker = tx.clone();
            handles.push(thread::spawn(move || {
                Worker::new(rx2, tx_worker, state).run()
            }));
        }

        let rank0 = WorkerState::new(
            WorkerCtx {
                rank: 0,
                size: num_workers,
            },
            Arc::clone(&self.registry),
        );
        let mut controller = Controller::new(
            WorkerGroup::new(rank0, senders, rx),
            Arc::clone(&self.registry),
        );

        let result = f(&mut controller);
        controller.shutdown();
        drop(controller);

        for handle in handles {
            if handle.join().is_err() {
                return result.and(Err(Error::Disconnect));
            }
        }
        result
    }
}
