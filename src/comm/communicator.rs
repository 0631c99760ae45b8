use std::cell::Cell;

use crate::comm::{TAG_ALLGATHER, TAG_GATHER};
use crate::foundation::error::{CompositeError, CompositeResult};

/// Handle for a posted send.
///
/// Sends are buffered by every transport in this crate, so a request is
/// complete as soon as it is returned; waiting on it only checks that.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SendRequest {
    pub dest: usize,
    pub tag: u32,
    pub len: usize,
}

/// Handle for a posted receive, matched on source and tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecvRequest {
    pub src: usize,
    pub tag: u32,
    done: bool,
}

impl RecvRequest {
    pub fn new(src: usize, tag: u32) -> Self {
        Self {
            src,
            tag,
            done: false,
        }
    }

    /// A request that never matches anything; `wait_any` skips it.
    pub fn null() -> Self {
        Self {
            src: usize::MAX,
            tag: 0,
            done: true,
        }
    }

    pub fn is_pending(&self) -> bool {
        !self.done
    }

    pub(crate) fn complete(&mut self) {
        self.done = true;
    }
}

/// Transport between the ranks of one compositing session.
///
/// Delivery is reliable and ordered per `(source, destination, tag)`.
pub trait Communicator {
    fn rank(&self) -> usize;

    fn size(&self) -> usize;

    /// Send `bytes` to `dest`; returns once the message is buffered.
    fn send(&self, dest: usize, tag: u32, bytes: Vec<u8>) -> CompositeResult<()>;

    /// Post a send and return a handle for it.
    fn isend(&self, dest: usize, tag: u32, bytes: Vec<u8>) -> CompositeResult<SendRequest> {
        let len = bytes.len();
        self.send(dest, tag, bytes)?;
        Ok(SendRequest { dest, tag, len })
    }

    /// Post a receive from `src` with `tag`.
    fn irecv(&self, src: usize, tag: u32) -> RecvRequest {
        RecvRequest::new(src, tag)
    }

    /// Block until one pending request in `requests` is satisfied and return
    /// its index and payload. The request is marked complete.
    fn wait_any(&self, requests: &mut [RecvRequest]) -> CompositeResult<(usize, Vec<u8>)>;

    /// Wait for every send in `sends`.
    fn wait_all(&self, sends: &[SendRequest]) -> CompositeResult<()> {
        for s in sends {
            if s.dest >= self.size() {
                return Err(CompositeError::transport(format!(
                    "send to rank {} outside a group of {}",
                    s.dest,
                    self.size()
                )));
            }
        }
        Ok(())
    }

    /// Blocking receive.
    fn recv(&self, src: usize, tag: u32) -> CompositeResult<Vec<u8>> {
        let mut requests = [self.irecv(src, tag)];
        self.wait_any(&mut requests).map(|(_, bytes)| bytes)
    }

    /// Every rank's `bytes`, indexed by rank.
    fn allgather(&self, bytes: &[u8]) -> CompositeResult<Vec<Vec<u8>>> {
        let (me, size) = (self.rank(), self.size());
        for dest in (0..size).filter(|&r| r != me) {
            self.send(dest, TAG_ALLGATHER, bytes.to_vec())?;
        }
        let mut out = vec![Vec::new(); size];
        out[me] = bytes.to_vec();
        let mut requests: Vec<RecvRequest> = (0..size)
            .map(|r| {
                if r == me {
                    RecvRequest::null()
                } else {
                    self.irecv(r, TAG_ALLGATHER)
                }
            })
            .collect();
        for _ in 1..size {
            let (idx, data) = self.wait_any(&mut requests)?;
            out[idx] = data;
        }
        Ok(out)
    }

    /// Collect every rank's `bytes` at `dest`. Only `dest` gets `Some`.
    fn gather(&self, bytes: &[u8], dest: usize) -> CompositeResult<Option<Vec<Vec<u8>>>> {
        let (me, size) = (self.rank(), self.size());
        if me != dest {
            self.send(dest, TAG_GATHER, bytes.to_vec())?;
            return Ok(None);
        }
        let mut out = vec![Vec::new(); size];
        out[me] = bytes.to_vec();
        for src in (0..size).filter(|&r| r != me) {
            out[src] = self.recv(src, TAG_GATHER)?;
        }
        Ok(Some(out))
    }
}

/// Wraps a communicator and counts the payload bytes it sends.
pub struct CountingComm<'a, C: Communicator + ?Sized> {
    inner: &'a C,
    bytes_sent: Cell<u64>,
}

impl<'a, C: Communicator + ?Sized> CountingComm<'a, C> {
    pub fn new(inner: &'a C) -> Self {
        Self {
            inner,
            bytes_sent: Cell::new(0),
        }
    }

    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent.get()
    }
}

impl<C: Communicator + ?Sized> Communicator for CountingComm<'_, C> {
    fn rank(&self) -> usize {
        self.inner.rank()
    }

    fn size(&self) -> usize {
        self.inner.size()
    }

    fn send(&self, dest: usize, tag: u32, bytes: Vec<u8>) -> CompositeResult<()> {
        let len = bytes.len() as u64;
        self.inner.send(dest, tag, bytes)?;
        self.bytes_sent.set(self.bytes_sent.get().saturating_add(len));
        Ok(())
    }

    fn irecv(&self, src: usize, tag: u32) -> RecvRequest {
        self.inner.irecv(src, tag)
    }

    fn wait_any(&self, requests: &mut [RecvRequest]) -> CompositeResult<(usize, Vec<u8>)> {
        self.inner.wait_any(requests)
    }

    fn wait_all(&self, sends: &[SendRequest]) -> CompositeResult<()> {
        self.inner.wait_all(sends)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/comm/communicator.rs"]
mod tests;
