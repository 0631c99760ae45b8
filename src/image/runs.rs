//! Readers and writers for run-length encoded pixel streams.
//!
//! A stream is a sequence of `(inactive, active)` `u32` pairs, each followed
//! by `active` interleaved pixels.

use crate::foundation::error::{CompositeError, CompositeResult};
use crate::image::header::RUN_LENGTH_SIZE;

pub(crate) fn read_run(data: &[u8], pos: usize) -> Option<(usize, usize)> {
    let b = data.get(pos..pos + RUN_LENGTH_SIZE)?;
    let inactive = u32::from_le_bytes([b[0], b[1], b[2], b[3]]);
    let active = u32::from_le_bytes([b[4], b[5], b[6], b[7]]);
    Some((inactive as usize, active as usize))
}

pub(crate) fn write_run(data: &mut [u8], pos: usize, inactive: usize, active: usize) {
    data[pos..pos + 4].copy_from_slice(&(inactive as u32).to_le_bytes());
    data[pos + 4..pos + 8].copy_from_slice(&(active as u32).to_le_bytes());
}

pub(crate) fn push_run(data: &mut Vec<u8>, inactive: usize, active: usize) {
    data.extend_from_slice(&(inactive as u32).to_le_bytes());
    data.extend_from_slice(&(active as u32).to_le_bytes());
}

fn corrupt(what: &str) -> CompositeError {
    CompositeError::sanity(format!("corrupt compressed image: {what}"))
}

/// Read position inside a run-length stream.
#[derive(Clone, Debug)]
pub(crate) struct RunCursor<'a> {
    data: &'a [u8],
    pos: usize,
    inactive: usize,
    active: usize,
    pixel_bytes: usize,
    last_run: Option<usize>,
}

impl<'a> RunCursor<'a> {
    pub fn new(data: &'a [u8], pixel_bytes: usize) -> Self {
        Self {
            data,
            pos: 0,
            inactive: 0,
            active: 0,
            pixel_bytes,
            last_run: None,
        }
    }

    /// Inactive pixels left before the active part of the current run.
    pub fn inactive(&self) -> usize {
        self.inactive
    }

    /// Active pixels left in the current run.
    pub fn active(&self) -> usize {
        self.active
    }

    /// Byte position of the next unread pixel or run header.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Position of the last run header loaded, if any.
    pub fn last_run(&self) -> Option<usize> {
        self.last_run
    }

    /// Load run headers until the cursor holds at least one pixel.
    pub fn refill(&mut self) -> CompositeResult<()> {
        while self.inactive == 0 && self.active == 0 {
            let (inactive, active) =
                read_run(self.data, self.pos).ok_or_else(|| corrupt("ran out of runs"))?;
            self.last_run = Some(self.pos);
            self.pos += RUN_LENGTH_SIZE;
            self.inactive = inactive;
            self.active = active;
        }
        Ok(())
    }

    pub fn skip_inactive(&mut self, n: usize) {
        debug_assert!(n <= self.inactive);
        self.inactive -= n;
    }

    /// Consume `n` active pixels and return their bytes.
    pub fn take_active(&mut self, n: usize) -> CompositeResult<&'a [u8]> {
        debug_assert!(self.inactive == 0 && n <= self.active);
        let len = n * self.pixel_bytes;
        let bytes = self
            .data
            .get(self.pos..self.pos + len)
            .ok_or_else(|| corrupt("active pixels run past the end of the buffer"))?;
        self.pos += len;
        self.active -= n;
        Ok(bytes)
    }

    /// Advance `count` pixels, optionally appending them to `out`.
    pub fn scan(&mut self, mut count: usize, mut out: Option<&mut RunWriter>) -> CompositeResult<()> {
        while count > 0 {
            self.refill()?;
            let n = self.inactive.min(count);
            if n > 0 {
                self.skip_inactive(n);
                count -= n;
                if let Some(w) = out.as_mut() {
                    w.add_inactive(n);
                }
            }
            let n = self.active.min(count);
            if n > 0 {
                let px = self.take_active(n)?;
                count -= n;
                if let Some(w) = out.as_mut() {
                    w.add_active(px, n);
                }
            }
        }
        Ok(())
    }
}

/// Append-only builder of a run-length stream.
///
/// Adjacent inactive spans merge into one run and a new run only starts once
/// the current one has active pixels.
#[derive(Debug)]
pub(crate) struct RunWriter {
    data: Vec<u8>,
    run: usize,
}

impl RunWriter {
    /// Start a stream in `buffer`, reusing its allocation.
    pub fn new(mut buffer: Vec<u8>) -> Self {
        buffer.clear();
        push_run(&mut buffer, 0, 0);
        Self { data: buffer, run: 0 }
    }

    fn current(&self) -> (usize, usize) {
        read_run(&self.data, self.run).unwrap_or((0, 0))
    }

    pub fn add_inactive(&mut self, n: usize) {
        if n == 0 {
            return;
        }
        let (inactive, active) = self.current();
        if active > 0 {
            self.run = self.data.len();
            push_run(&mut self.data, n, 0);
        } else {
            write_run(&mut self.data, self.run, inactive + n, 0);
        }
    }

    /// Append `n` active pixels whose interleaved bytes are `pixels`.
    pub fn add_active(&mut self, pixels: &[u8], n: usize) {
        if n == 0 {
            return;
        }
        self.data.extend_from_slice(pixels);
        self.bump_active(n);
    }

    /// Append one active pixel from separate color and depth slices.
    pub fn add_pixel(&mut self, color: &[u8], depth: &[u8]) {
        self.data.extend_from_slice(color);
        self.data.extend_from_slice(depth);
        self.bump_active(1);
    }

    fn bump_active(&mut self, n: usize) {
        let (inactive, active) = self.current();
        write_run(&mut self.data, self.run, inactive, active + n);
    }

    pub fn finish(self) -> Vec<u8> {
        self.data
    }
}

#[cfg(test)]
#[path = "../../tests/unit/image/runs.rs"]
mod tests;
