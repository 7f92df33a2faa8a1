use std::collections::VecDeque;

use bytes::{Buf, Bytes};

/// A bounded pipe of bytes between one writer and one reader.
///
/// The stream owns its state once; [`ByteStream::writer`] and
/// [`ByteStream::reader`] hand out short-lived capability handles over that
/// state. Pushes beyond the remaining capacity are truncated, not rejected,
/// so a writer can batch optimistically against
/// [`available_capacity`](ByteStream::available_capacity). The closed and
/// error flags are sticky.
#[derive(Debug)]
pub struct ByteStream {
    capacity: usize,
    chunks: VecDeque<Bytes>,
    buffered: usize,
    pushed: u64,
    popped: u64,
    closed: bool,
    error: bool,
}

/// Write capability of a [`ByteStream`].
#[derive(Debug)]
pub struct Writer<'a>(&'a mut ByteStream);

/// Read capability of a [`ByteStream`].
#[derive(Debug)]
pub struct Reader<'a>(&'a mut ByteStream);

impl ByteStream {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            chunks: VecDeque::new(),
            buffered: 0,
            pushed: 0,
            popped: 0,
            closed: false,
            error: false,
        }
    }

    pub fn writer(&mut self) -> Writer<'_> {
        Writer(self)
    }

    pub fn reader(&mut self) -> Reader<'_> {
        Reader(self)
    }

    /// Appends up to `available_capacity` bytes of `data`; the rest is
    /// silently dropped. No-op once the input side is closed.
    pub fn push(&mut self, mut data: Bytes) {
        if self.closed || data.is_empty() {
            return;
        }
        let accept = data.len().min(self.available_capacity());
        if accept == 0 {
            return;
        }
        if accept < data.len() {
            log::trace!(
                target: "utcp/stream",
                "truncating push of {} bytes to {}",
                data.len(),
                accept
            );
            data.truncate(accept);
        }
        self.chunks.push_back(data);
        self.buffered += accept;
        self.pushed += accept as u64;
    }

    /// Marks the input side closed. Nothing more will be written.
    pub fn close(&mut self) {
        self.closed = true;
    }

    /// Poisons the stream. Leaves counters and the closed flag untouched.
    pub fn set_error(&mut self) {
        self.error = true;
    }

    /// The longest contiguous prefix available without copying. May be
    /// shorter than [`bytes_buffered`](Self::bytes_buffered) when the
    /// storage is fragmented; drain with repeated peek/pop cycles.
    pub fn peek(&self) -> &[u8] {
        self.chunks.front().map_or(&[], |chunk| &chunk[..])
    }

    /// Removes up to `n` bytes from the front.
    pub fn pop(&mut self, n: usize) {
        let mut remaining = n.min(self.buffered);
        self.buffered -= remaining;
        self.popped += remaining as u64;

        while remaining > 0 {
            let front = self
                .chunks
                .front_mut()
                .expect("buffered bytes imply a chunk");
            if remaining < front.len() {
                front.advance(remaining);
                remaining = 0;
            } else {
                remaining -= front.len();
                self.chunks.pop_front();
            }
        }
    }

    /// Peeks and pops into `buf`, returning the number of bytes copied.
    pub fn read(&mut self, buf: &mut [u8]) -> usize {
        let mut copied = 0;
        while copied < buf.len() {
            let chunk = self.peek();
            if chunk.is_empty() {
                break;
            }
            let take = chunk.len().min(buf.len() - copied);
            buf[copied..copied + take].copy_from_slice(&chunk[..take]);
            self.pop(take);
            copied += take;
        }
        copied
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available_capacity(&self) -> usize {
        self.capacity - self.buffered
    }

    pub fn bytes_buffered(&self) -> usize {
        self.buffered
    }

    pub fn bytes_pushed(&self) -> u64 {
        self.pushed
    }

    pub fn bytes_popped(&self) -> u64 {
        self.popped
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Closed and fully drained.
    pub fn is_finished(&self) -> bool {
        self.closed && self.buffered == 0
    }

    pub fn has_error(&self) -> bool {
        self.error
    }
}

impl Writer<'_> {
    pub fn push(&mut self, data: Bytes) {
        self.0.push(data)
    }

    pub fn close(&mut self) {
        self.0.close()
    }

    pub fn set_error(&mut self) {
        self.0.set_error()
    }

    pub fn available_capacity(&self) -> usize {
        self.0.available_capacity()
    }

    pub fn bytes_pushed(&self) -> u64 {
        self.0.bytes_pushed()
    }

    pub fn is_closed(&self) -> bool {
        self.0.is_closed()
    }
}

impl Reader<'_> {
    pub fn peek(&self) -> &[u8] {
        self.0.peek()
    }

    pub fn pop(&mut self, n: usize) {
        self.0.pop(n)
    }

    pub fn read(&mut self, buf: &mut [u8]) -> usize {
        self.0.read(buf)
    }

    pub fn bytes_buffered(&self) -> usize {
        self.0.bytes_buffered()
    }

    pub fn bytes_popped(&self) -> u64 {
        self.0.bytes_popped()
    }

    pub fn is_finished(&self) -> bool {
        self.0.is_finished()
    }

    pub fn has_error(&self) -> bool {
        self.0.has_error()
    }
}
