use std::cell::RefCell;
use std::collections::VecDeque;
use std::sync::mpsc;
use std::time::Duration;

use crate::comm::communicator::{Communicator, RecvRequest};
use crate::foundation::error::{CompositeError, CompositeResult};

/// How long a rank waits for a message before giving up.
pub const DEFAULT_RECV_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug)]
struct Envelope {
    src: usize,
    tag: u32,
    bytes: Vec<u8>,
}

/// One rank of a [`LocalCluster`].
///
/// Messages that arrive before a matching receive is posted wait in a stash
/// in arrival order.
pub struct LocalComm {
    rank: usize,
    outboxes: Vec<mpsc::Sender<Envelope>>,
    inbox: mpsc::Receiver<Envelope>,
    stash: RefCell<VecDeque<Envelope>>,
    timeout: Duration,
}

impl LocalComm {
    fn take_stashed(&self, requests: &mut [RecvRequest]) -> Option<(usize, Vec<u8>)> {
        let mut stash = self.stash.borrow_mut();
        let (pos, idx) = stash.iter().enumerate().find_map(|(pos, env)| {
            matching(requests, env).map(|idx| (pos, idx))
        })?;
        let env = stash.remove(pos)?;
        requests[idx].complete();
        Some((idx, env.bytes))
    }
}

fn matching(requests: &[RecvRequest], env: &Envelope) -> Option<usize> {
    requests
        .iter()
        .position(|r| r.is_pending() && r.src == env.src && r.tag == env.tag)
}

impl Communicator for LocalComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.outboxes.len()
    }

    fn send(&self, dest: usize, tag: u32, bytes: Vec<u8>) -> CompositeResult<()> {
        let outbox = self.outboxes.get(dest).ok_or_else(|| {
            CompositeError::transport(format!(
                "rank {dest} outside a cluster of {}",
                self.outboxes.len()
            ))
        })?;
        outbox
            .send(Envelope {
                src: self.rank,
                tag,
                bytes,
            })
            .map_err(|_| CompositeError::transport(format!("rank {dest} hung up")))
    }

    fn wait_any(&self, requests: &mut [RecvRequest]) -> CompositeResult<(usize, Vec<u8>)> {
        if !requests.iter().any(RecvRequest::is_pending) {
            return Err(CompositeError::sanity("wait_any called without pending receives"));
        }
        if let Some(hit) = self.take_stashed(requests) {
            return Ok(hit);
        }
        loop {
            let env = self.inbox.recv_timeout(self.timeout).map_err(|e| {
                CompositeError::transport(format!(
                    "rank {} waiting for {:?}: {e}",
                    self.rank,
                    requests
                        .iter()
                        .filter(|r| r.is_pending())
                        .map(|r| (r.src, r.tag))
                        .collect::<Vec<_>>()
                ))
            })?;
            if let Some(idx) = matching(requests, &env) {
                requests[idx].complete();
                return Ok((idx, env.bytes));
            }
            self.stash.borrow_mut().push_back(env);
        }
    }
}

/// Runs a closure once per rank, each on its own thread, connected by
/// in-memory mailboxes.
#[derive(Clone, Copy, Debug)]
pub struct LocalCluster {
    size: usize,
    timeout: Duration,
}

impl LocalCluster {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            timeout: DEFAULT_RECV_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Shorthand for `LocalCluster::new(size).launch(f)`.
    pub fn run<T, F>(size: usize, f: F) -> CompositeResult<Vec<T>>
    where
        T: Send,
        F: Fn(&LocalComm) -> T + Sync,
    {
        Self::new(size).launch(f)
    }

    /// Run `f` on every rank and return the results in rank order.
    pub fn launch<T, F>(&self, f: F) -> CompositeResult<Vec<T>>
    where
        T: Send,
        F: Fn(&LocalComm) -> T + Sync,
    {
        if self.size == 0 {
            return Err(CompositeError::invalid_value("a cluster needs at least one rank"));
        }
        let (senders, receivers): (Vec<_>, Vec<_>) =
            (0..self.size).map(|_| mpsc::channel::<Envelope>()).unzip();
        let f = &f;
        let timeout = self.timeout;

        std::thread::scope(|scope| {
            let handles: Vec<_> = receivers
                .into_iter()
                .enumerate()
                .map(|(rank, inbox)| {
                    let outboxes = senders.clone();
                    std::thread::Builder::new()
                        .name(format!("icet-rank-{rank}"))
                        .spawn_scoped(scope, move || {
                            let comm = LocalComm {
                                rank,
                                outboxes,
                                inbox,
                                stash: RefCell::new(VecDeque::new()),
                                timeout,
                            };
                            f(&comm)
                        })
                        .map_err(|e| CompositeError::transport(format!("spawning rank {rank}: {e}")))
                })
                .collect();

            let mut results = Vec::with_capacity(handles.len());
            let mut first_err = None;
            for (rank, handle) in handles.into_iter().enumerate() {
                match handle {
                    Ok(h) => match h.join() {
                        Ok(value) => results.push(value),
                        Err(_) => {
                            first_err.get_or_insert(CompositeError::transport(format!(
                                "rank {rank} panicked"
                            )));
                        }
                    },
                    Err(e) => {
                        first_err.get_or_insert(e);
                    }
                }
            }
            match first_err {
                Some(e) => Err(e),
                None => Ok(results),
            }
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/comm/local.rs"]
mod tests;
