//! Background deduplication worker.
//!
//! One thread drains a bounded queue of inodes. `submit` blocks while the
//! queue is full, so producers are throttled to the hashing rate.

use super::DedupEngine;
use crate::error::{Result, TagvfsError};
use crate::stats::Stats;
use std::io;
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

enum DedupCmd {
    Object(i64),
    Flush(SyncSender<()>),
}

pub struct DedupWorker {
    tx: Option<SyncSender<DedupCmd>>,
    handle: Option<JoinHandle<()>>,
    stats: Arc<Stats>,
}

fn worker_gone() -> TagvfsError {
    TagvfsError::Io(io::Error::new(
        io::ErrorKind::BrokenPipe,
        "dedup worker has stopped",
    ))
}

impl DedupWorker {
    pub fn start(engine: Arc<DedupEngine>, capacity: usize, stats: Arc<Stats>) -> Result<Self> {
        let (tx, rx) = mpsc::sync_channel(capacity.max(1));
        let worker_stats = stats.clone();
        let handle = thread::Builder::new()
            .name("tagvfs-dedup".to_string())
            .spawn(move || run_worker(engine, rx, worker_stats))?;
        info!(capacity, "Started dedup worker");
        Ok(Self {
            tx: Some(tx),
            handle: Some(handle),
            stats,
        })
    }

    /// Sending side of the queue, usable without holding the worker.
    pub fn queue(&self) -> Result<DedupQueue> {
        let tx = self.tx.clone().ok_or_else(worker_gone)?;
        Ok(DedupQueue {
            tx,
            stats: self.stats.clone(),
        })
    }

    /// Process what is queued, then stop the thread.
    pub fn shutdown(&mut self) {
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Dedup worker panicked");
            } else {
                info!("Dedup worker stopped");
            }
        }
    }
}

/// Producer handle onto a running worker's queue.
#[derive(Clone)]
pub struct DedupQueue {
    tx: SyncSender<DedupCmd>,
    stats: Arc<Stats>,
}

impl DedupQueue {
    pub fn submit(&self, inode: i64) -> Result<()> {
        self.stats.queue_push();
        if self.tx.send(DedupCmd::Object(inode)).is_err() {
            self.stats.queue_pop();
            return Err(worker_gone());
        }
        Ok(())
    }

    pub fn flush(&self) -> Result<()> {
        let (done_tx, done_rx) = mpsc::sync_channel(1);
        self.tx
            .send(DedupCmd::Flush(done_tx))
            .map_err(|_| worker_gone())?;
        done_rx.recv().map_err(|_| worker_gone())
    }
}

impl Drop for DedupWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_worker(engine: Arc<DedupEngine>, rx: Receiver<DedupCmd>, stats: Arc<Stats>) {
    while let Ok(cmd) = rx.recv() {
        match cmd {
            DedupCmd::Object(inode) => {
                let outcome = engine.deduplicate(inode);
                stats.queue_pop();
                debug!(inode, ?outcome, "Background dedup pass");
            }
            DedupCmd::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
}
