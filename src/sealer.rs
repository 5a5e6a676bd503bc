use std::sync::{mpsc, Arc, Mutex};
use std::thread;

use crate::engine::SectorEngine;
use crate::error::Result;
use crate::helpers;
use crate::metadata::{SealedSectorMetadata, SectorId, StagedSectorMetadata};

pub struct SealerWorker {
    pub id: usize,
    pub thread: Option<thread::JoinHandle<()>>,
}

pub enum SealerInput {
    Seal {
        staged_sector: StagedSectorMetadata,
        prover_id: [u8; 31],
        done_tx: mpsc::Sender<(SectorId, Result<SealedSectorMetadata>)>,
    },
    Shutdown,
}

impl SealerWorker {
    pub fn start<E: SectorEngine + 'static>(
        id: usize,
        seal_task_rx: Arc<Mutex<mpsc::Receiver<SealerInput>>>,
        engine: Arc<E>,
    ) -> SealerWorker {
        let thread = thread::spawn(move || loop {
            // Acquire a lock on the rx end of the channel, get a task,
            // relinquish the lock and return the task. The receiver is
            // mutexed for coordinating reads across multiple worker-threads.
            // A closed channel or poisoned lock means the builder is gone,
            // so the worker winds down.
            let task = {
                let rx = match seal_task_rx.lock() {
                    Ok(rx) => rx,
                    Err(_) => break,
                };

                match rx.recv() {
                    Ok(task) => task,
                    Err(_) => break,
                }
            };

            match task {
                SealerInput::Seal {
                    staged_sector,
                    prover_id,
                    done_tx,
                } => {
                    let sector_id = staged_sector.sector_id;
                    let result = helpers::seal(engine.as_ref(), prover_id, staged_sector);

                    // The orchestrator may have bailed out; nothing to do
                    // with the result in that case.
                    let _ = done_tx.send((sector_id, result));
                }
                SealerInput::Shutdown => break,
            }
        });

        SealerWorker {
            id,
            thread: Some(thread),
        }
    }
}
