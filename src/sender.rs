use std::collections::VecDeque;

use bytes::{Bytes, BytesMut};

use crate::config::TcpConfig;
use crate::pkt::{TcpAck, TcpFlags, TcpSegment};
use crate::seq::SeqNo;
use crate::stream::{ByteStream, Writer};

/// The retransmission timer: a plain counter advanced by `tick`, with no
/// wall-clock dependency.
#[derive(Debug)]
struct RetransmitTimer {
    rto: u64,
    elapsed: u64,
    running: bool,
}

impl RetransmitTimer {
    fn new(rto: u64) -> Self {
        Self {
            rto,
            elapsed: 0,
            running: false,
        }
    }

    /// Starts the timer from zero; running timers are left alone.
    fn arm(&mut self) {
        if !self.running {
            self.running = true;
            self.elapsed = 0;
        }
    }

    fn resume(&mut self) {
        self.running = true;
    }

    fn stop(&mut self) {
        self.running = false;
        self.elapsed = 0;
    }

    /// Advances the counter; true once the current RTO has elapsed.
    fn advance(&mut self, ms: u64) -> bool {
        if !self.running {
            return false;
        }
        self.elapsed += ms;
        self.elapsed >= self.rto
    }

    fn backoff(&mut self) {
        self.rto *= 2;
    }

    fn restart(&mut self) {
        self.elapsed = 0;
    }

    fn set_rto(&mut self, rto: u64) {
        self.rto = rto;
    }
}

/// The sending half of a connection endpoint.
///
/// Reads the outbound byte stream, emits segments under the peer's window,
/// tracks what is still in flight, and retransmits the oldest outstanding
/// segment with exponential backoff when the timer expires. Every public
/// operation is a discrete synchronous event; segments leave through the
/// `transmit` callback handed to [`push`](Self::push) and
/// [`tick`](Self::tick).
#[derive(Debug)]
pub struct TcpSender {
    output: ByteStream,
    isn: SeqNo,
    initial_rto: u64,
    max_payload_size: usize,

    /// Next absolute seqno to emit; SYN and FIN occupy one slot each.
    next_seqno: u64,
    /// Highest absolute seqno the peer has acknowledged.
    acked_seqno: u64,
    /// Last advertised window, 1 until the peer has spoken.
    window: u16,
    fin_sent: bool,

    outstanding: VecDeque<(u64, TcpSegment)>,
    timer: RetransmitTimer,
    retransmissions: u64,
}

impl TcpSender {
    pub fn new(output: ByteStream, isn: SeqNo, initial_rto_ms: u64) -> Self {
        Self {
            output,
            isn,
            initial_rto: initial_rto_ms,
            max_payload_size: crate::config::MAX_PAYLOAD_SIZE,

            next_seqno: 0,
            acked_seqno: 0,
            window: 1,
            fin_sent: false,

            outstanding: VecDeque::new(),
            timer: RetransmitTimer::new(initial_rto_ms),
            retransmissions: 0,
        }
    }

    pub fn from_config(cfg: &TcpConfig) -> Self {
        let mut sender = Self::new(
            ByteStream::new(cfg.tx_buffer_size),
            cfg.initial_seqno(),
            cfg.initial_rto_ms,
        );
        sender.max_payload_size = cfg.max_payload_size;
        sender
    }

    /// Emits as many segments as the stream and the effective window allow.
    ///
    /// A zero advertised window is treated as one for a single probe
    /// segment, to elicit the ACK that will either reopen the window or
    /// confirm it is still shut.
    pub fn push(&mut self, mut transmit: impl FnMut(&TcpSegment)) {
        let effective_window = u64::from(self.window.max(1));

        loop {
            let in_flight = self.next_seqno - self.acked_seqno;
            if effective_window <= in_flight {
                break;
            }
            let mut space = effective_window - in_flight;

            let mut flags = TcpFlags::new();
            if self.next_seqno == 0 {
                flags.syn = true;
                space -= 1;
            }

            // Fill the payload chunk by chunk; peek only ever returns the
            // contiguous front of the stream.
            let limit = (self.max_payload_size as u64).min(space) as usize;
            let mut payload = BytesMut::new();
            while payload.len() < limit && self.output.bytes_buffered() > 0 {
                let chunk = self.output.peek();
                if chunk.is_empty() {
                    break;
                }
                let take = chunk.len().min(limit - payload.len());
                payload.extend_from_slice(&chunk[..take]);
                self.output.pop(take);
            }

            let used = payload.len() as u64 + u64::from(flags.syn);
            if self.output.is_finished() && !self.fin_sent && space > used {
                flags.fin = true;
                self.fin_sent = true;
            }

            let segment = TcpSegment {
                seqno: SeqNo::wrap(self.next_seqno, self.isn),
                flags: flags.rst(self.output.has_error()),
                payload: payload.freeze(),
            };
            if segment.sequence_length() == 0 {
                break;
            }

            log::trace!(
                target: "utcp/tx",
                "sending {} {} bytes at {} (in flight {})",
                segment.flags,
                segment.payload.len(),
                segment.seqno,
                in_flight
            );

            let start = self.next_seqno;
            self.next_seqno += segment.sequence_length();
            transmit(&segment);
            self.outstanding.push_back((start, segment));

            self.timer.arm();

            // A single probe per push when the real window is zero.
            if self.window == 0 {
                break;
            }
        }
    }

    /// An empty segment carrying the current seqno, for the collaborator to
    /// attach a pure ACK to. Occupies no sequence space and is never
    /// retransmitted.
    pub fn empty_segment(&self) -> TcpSegment {
        TcpSegment {
            seqno: SeqNo::wrap(self.next_seqno, self.isn),
            flags: TcpFlags::new().rst(self.output.has_error()),
            payload: Bytes::new(),
        }
    }

    /// Processes the peer receiver's acknowledgement and window update.
    pub fn receive(&mut self, ack: TcpAck) {
        self.window = ack.window;

        if ack.rst {
            log::debug!(target: "utcp/tx", "peer reset, poisoning outbound stream");
            self.output.set_error();
            return;
        }
        let Some(ackno) = ack.ackno else { return };

        let new_ack = ackno.unwrap(self.isn, self.acked_seqno);
        if new_ack > self.next_seqno {
            // Acknowledges bytes that were never sent.
            log::trace!(
                target: "utcp/tx",
                "ignoring ack {} beyond next seqno {}",
                new_ack,
                self.next_seqno
            );
            return;
        }

        if new_ack > self.acked_seqno {
            log::trace!(
                target: "utcp/tx",
                "ack advanced {} -> {} (window {})",
                self.acked_seqno,
                new_ack,
                self.window
            );
            self.acked_seqno = new_ack;
            self.timer.set_rto(self.initial_rto);
            self.timer.restart();
            self.retransmissions = 0;
        }

        while let Some((start, segment)) = self.outstanding.front() {
            if start + segment.sequence_length() <= self.acked_seqno {
                self.outstanding.pop_front();
            } else {
                break;
            }
        }

        if self.outstanding.is_empty() {
            self.timer.stop();
        } else {
            self.timer.resume();
        }
    }

    /// Advances the retransmission timer by `ms` milliseconds, resending
    /// the oldest outstanding segment on expiry.
    pub fn tick(&mut self, ms: u64, mut transmit: impl FnMut(&TcpSegment)) {
        if !self.timer.advance(ms) {
            return;
        }

        if let Some((start, segment)) = self.outstanding.front() {
            log::debug!(
                target: "utcp/tx",
                "retransmitting {} at {} (abs {}, rto {})",
                segment.flags,
                segment.seqno,
                start,
                self.timer.rto
            );
            transmit(segment);
        }

        // No backoff while probing a zero window.
        if self.window > 0 {
            self.timer.backoff();
        }
        self.timer.restart();
        self.retransmissions += 1;
    }

    pub fn sequence_numbers_in_flight(&self) -> u64 {
        self.next_seqno - self.acked_seqno
    }

    pub fn consecutive_retransmissions(&self) -> u64 {
        self.retransmissions
    }

    pub fn stream(&self) -> &ByteStream {
        &self.output
    }

    /// Write capability of the outbound stream, for the application.
    pub fn writer(&mut self) -> Writer<'_> {
        self.output.writer()
    }
}
