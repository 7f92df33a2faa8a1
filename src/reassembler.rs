use std::collections::BTreeMap;

use bytes::Bytes;

use crate::stream::{ByteStream, Reader};

/// Collapses out-of-order, possibly overlapping substrings of the inbound
/// byte stream into in-order bytes pushed downstream.
///
/// Fragments are addressed by their stream index. Bytes left of the write
/// frontier are already downstream and get dropped; bytes past the
/// downstream stream's remaining capacity are dropped too, to be
/// retransmitted once capacity opens. Whatever survives is either pushed
/// immediately or parked in a sorted map of non-overlapping fragments.
#[derive(Debug)]
pub struct Reassembler {
    output: ByteStream,
    next_index: u64,
    end_index: Option<u64>,
    pending: BTreeMap<u64, Bytes>,
}

impl Reassembler {
    pub fn new(output: ByteStream) -> Self {
        Self {
            output,
            next_index: 0,
            end_index: None,
            pending: BTreeMap::new(),
        }
    }

    /// Accepts the substring of the stream starting at `first_index`.
    ///
    /// `is_last` marks `data` as ending the stream; the downstream writer is
    /// closed once every byte up to that end has been pushed, even if the
    /// marking fragment itself had to be dropped for capacity.
    pub fn insert(&mut self, first_index: u64, data: Bytes, is_last: bool) {
        // Saturating: an index resolved from a stale wrapped seqno can sit
        // at the far end of the u64 space.
        let data_end = first_index.saturating_add(data.len() as u64);
        if is_last {
            self.end_index = Some(data_end);
        }

        // Entirely at or left of the frontier: already downstream.
        if data_end <= self.next_index {
            self.close_if_done();
            return;
        }

        let mut first_index = first_index;
        let mut data = data;
        if first_index < self.next_index {
            data = data.slice((self.next_index - first_index) as usize..);
            first_index = self.next_index;
        }

        let max_end = self.next_index + self.output.available_capacity() as u64;
        if first_index >= max_end {
            log::trace!(
                target: "utcp/reasm",
                "no capacity for fragment at {}, window ends at {}",
                first_index,
                max_end
            );
            return;
        }
        if first_index + data.len() as u64 > max_end {
            data = data.slice(..(max_end - first_index) as usize);
        }

        if first_index == self.next_index {
            self.next_index += data.len() as u64;
            self.output.push(data);
            self.drain_pending();
            self.close_if_done();
        } else {
            self.buffer(first_index, data);
        }
    }

    /// Pushes parked fragments for as long as they touch the frontier.
    fn drain_pending(&mut self) {
        while let Some(entry) = self.pending.first_entry() {
            let start = *entry.key();
            if start > self.next_index {
                break;
            }
            let mut segment = entry.remove();
            let end = start + segment.len() as u64;
            if end <= self.next_index {
                continue;
            }
            if start < self.next_index {
                segment = segment.slice((self.next_index - start) as usize..);
            }
            self.next_index += segment.len() as u64;
            self.output.push(segment);
        }
    }

    /// Parks a fragment that does not touch the frontier, keeping the
    /// pending map free of overlaps.
    fn buffer(&mut self, mut first_index: u64, mut data: Bytes) {
        if data.is_empty() {
            return;
        }
        let mut data_end = first_index + data.len() as u64;

        // A predecessor reaching into the new fragment trims it from the
        // left, or covers it outright.
        if let Some((&prev_start, prev)) = self.pending.range(..first_index).next_back() {
            let prev_end = prev_start + prev.len() as u64;
            if prev_end > first_index {
                if prev_end >= data_end {
                    return;
                }
                data = data.slice((prev_end - first_index) as usize..);
                first_index = prev_end;
                data_end = first_index + data.len() as u64;
            }
        }

        // Successors fully covered by the new fragment are dropped; a
        // partial overlap trims the new fragment from the right instead.
        while let Some((&next_start, next)) = self.pending.range(first_index..).next() {
            if next_start >= data_end {
                break;
            }
            if next_start + next.len() as u64 <= data_end {
                self.pending.remove(&next_start);
            } else {
                data = data.slice(..(next_start - first_index) as usize);
                break;
            }
        }

        if !data.is_empty() {
            log::trace!(
                target: "utcp/reasm",
                "parking {} bytes at {} (frontier {})",
                data.len(),
                first_index,
                self.next_index
            );
            self.pending.insert(first_index, data);
        }
    }

    fn close_if_done(&mut self) {
        if self.end_index.is_some_and(|end| self.next_index >= end) {
            self.output.close();
        }
    }

    /// Bytes parked in the pending map.
    pub fn count_bytes_pending(&self) -> u64 {
        self.pending.values().map(|data| data.len() as u64).sum()
    }

    /// First stream index not yet pushed downstream.
    pub fn next_index(&self) -> u64 {
        self.next_index
    }

    pub fn stream(&self) -> &ByteStream {
        &self.output
    }

    pub fn stream_mut(&mut self) -> &mut ByteStream {
        &mut self.output
    }

    pub fn reader(&mut self) -> Reader<'_> {
        self.output.reader()
    }
}
