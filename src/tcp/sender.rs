//! Fragments an outbound byte stream into wire segments, tracks
//! outstanding (sent, unacknowledged) data, and retransmits on timeout.

use std::collections::VecDeque;

use crate::byte_stream::{ByteStream, Reader, Writer};
use crate::error::{Error, Result};
use crate::tcp::config::TcpConfig;
use crate::tcp::message::{TcpReceiverMessage, TcpSenderMessage};
use crate::wrap32::Wrap32;

/// A previously transmitted, not-yet-fully-acknowledged segment. Kept by
/// value so retransmission can reproduce the exact bytes even after the
/// outbound stream has popped them.
#[derive(Debug, Clone)]
struct Outstanding {
    abs_seqno: u64,
    syn: bool,
    fin: bool,
    payload: Vec<u8>,
    is_probe: bool,
}

impl Outstanding {
    fn seq_len(&self) -> usize {
        self.syn as usize + self.payload.len() + self.fin as usize
    }
}

#[derive(Debug)]
pub struct TcpSender {
    writer: Writer,
    reader: Reader,
    isn: Wrap32,
    max_payload_size: usize,
    initial_rto_ms: u64,

    next_seqno_abs: u64,
    bytes_in_flight: u64,
    outstanding: VecDeque<Outstanding>,

    window_size: u16,
    last_ack_abs: u64,
    fin_sent: bool,

    current_rto_ms: u64,
    elapsed_ms: u64,
    timer_running: bool,
    consecutive_retx: u32,
}

impl TcpSender {
    pub fn new(stream: &ByteStream, isn: Wrap32, config: TcpConfig) -> Result<Self> {
        if config.initial_rto_ms == 0 {
            return Err(Error::ZeroInitialRto);
        }
        Ok(TcpSender {
            writer: stream.writer(),
            reader: stream.reader(),
            isn,
            max_payload_size: config.max_payload_size,
            initial_rto_ms: config.initial_rto_ms,

            next_seqno_abs: 0,
            bytes_in_flight: 0,
            outstanding: VecDeque::new(),

            window_size: 0,
            last_ack_abs: 0,
            fin_sent: false,

            current_rto_ms: config.initial_rto_ms,
            elapsed_ms: 0,
            timer_running: false,
            consecutive_retx: 0,
        })
    }

    pub fn writer(&self) -> &Writer {
        &self.writer
    }

    pub fn reader(&self) -> &Reader {
        &self.reader
    }

    /// Fill the peer's advertised window with segments, invoking `transmit`
    /// once per segment sent.
    pub fn push(&mut self, mut transmit: impl FnMut(&TcpSenderMessage)) {
        let effective_win = if self.window_size == 0 {
            1
        } else {
            self.window_size as u64
        };

        while self.bytes_in_flight < effective_win {
            let avail = effective_win - self.bytes_in_flight;
            let syn = self.next_seqno_abs == 0;

            let data_index: u64 = if syn {
                0
            } else {
                (self.next_seqno_abs - 1) - self.reader.bytes_popped()
            };

            let buf_len = self.reader.len() as u64;
            let buf_avail = buf_len.saturating_sub(data_index);

            let syn_cost = if syn { 1 } else { 0 };
            let max_payload = std::cmp::min(
                buf_avail,
                std::cmp::min(self.max_payload_size as u64, avail.saturating_sub(syn_cost)),
            ) as usize;

            let fin_already_sent =
                self.fin_sent || self.outstanding.iter().any(|seg| seg.fin);

            let mut fin = false;
            if self.writer.is_closed() && !fin_already_sent {
                if max_payload == 0 {
                    if avail >= syn_cost + 1 {
                        fin = true;
                    }
                } else if data_index as usize + max_payload == buf_len as usize
                    && avail >= syn_cost + max_payload as u64 + 1
                {
                    fin = true;
                }
            }

            if !syn && max_payload == 0 && !fin {
                break;
            }

            let payload = if max_payload > 0 {
                self.reader.copy_at(data_index as usize, max_payload)
            } else {
                Vec::new()
            };

            let msg = TcpSenderMessage {
                seqno: Wrap32::wrap(self.next_seqno_abs, self.isn),
                syn,
                fin,
                rst: self.writer.has_error(),
                payload,
            };

            tracing::trace!(
                seqno = %msg.seqno,
                syn,
                fin,
                payload_len = msg.payload.len(),
                "sender transmitting segment"
            );
            let seq_len = msg.sequence_length();
            transmit(&msg);

            if seq_len > 0 {
                let abs_seqno = self.next_seqno_abs;
                self.outstanding.push_back(Outstanding {
                    abs_seqno,
                    syn: msg.syn,
                    fin: msg.fin,
                    payload: msg.payload,
                    is_probe: self.window_size == 0 && abs_seqno != 0,
                });
                self.bytes_in_flight += seq_len as u64;
                self.next_seqno_abs += seq_len as u64;
                if msg.fin {
                    self.fin_sent = true;
                }
                if !self.timer_running {
                    self.timer_running = true;
                    self.elapsed_ms = 0;
                    self.current_rto_ms = self.initial_rto_ms;
                }
            }

            if self.bytes_in_flight >= effective_win {
                break;
            }
        }
    }

    /// Build a zero-length message carrying the current seqno/RST, without
    /// touching retransmission state. Used to deliver a bare ACK or RST.
    pub fn make_empty_message(&self) -> TcpSenderMessage {
        TcpSenderMessage {
            seqno: Wrap32::wrap(self.next_seqno_abs, self.isn),
            syn: false,
            fin: false,
            rst: self.writer.has_error(),
            payload: Vec::new(),
        }
    }

    pub fn receive(&mut self, msg: TcpReceiverMessage) {
        if msg.rst {
            tracing::warn!("sender got RST, marking stream error");
            self.writer.set_error();
            return;
        }

        self.window_size = msg.window_size;

        let Some(ackno) = msg.ackno else {
            return;
        };

        let ack_abs = ackno.unwrap(self.isn, self.next_seqno_abs);

        if ack_abs > self.next_seqno_abs {
            tracing::warn!(ack_abs, next_seqno_abs = self.next_seqno_abs, "sender ignoring ack of unsent data");
            return;
        }
        if ack_abs <= self.last_ack_abs {
            return;
        }

        self.last_ack_abs = ack_abs;

        while let Some(front) = self.outstanding.front() {
            if front.abs_seqno + front.seq_len() as u64 <= ack_abs {
                let seg = self.outstanding.pop_front().unwrap();
                self.bytes_in_flight -= seg.seq_len() as u64;
            } else {
                break;
            }
        }

        let acked_data = ack_abs.saturating_sub(1);
        let already_popped = self.reader.bytes_popped();
        if acked_data > already_popped {
            let to_pop = std::cmp::min(acked_data - already_popped, self.reader.len() as u64);
            if to_pop > 0 {
                self.reader.pop(to_pop);
            }
        }

        self.current_rto_ms = self.initial_rto_ms;
        self.consecutive_retx = 0;
        if self.outstanding.is_empty() {
            self.timer_running = false;
            self.elapsed_ms = 0;
        } else {
            self.timer_running = true;
            self.elapsed_ms = 0;
        }
    }

    pub fn tick(&mut self, ms_since_last_tick: u64, mut transmit: impl FnMut(&TcpSenderMessage)) {
        if !self.timer_running {
            return;
        }
        self.elapsed_ms += ms_since_last_tick;
        if self.elapsed_ms < self.current_rto_ms {
            return;
        }

        let Some(front) = self.outstanding.front() else {
            self.timer_running = false;
            self.elapsed_ms = 0;
            return;
        };

        let msg = TcpSenderMessage {
            seqno: Wrap32::wrap(front.abs_seqno, self.isn),
            syn: front.syn,
            fin: front.fin,
            rst: false,
            payload: front.payload.clone(),
        };
        let seq_len = msg.sequence_length();
        let is_probe = front.is_probe;

        tracing::debug!(seqno = %msg.seqno, seq_len, is_probe, "sender retransmitting");
        transmit(&msg);

        if seq_len > 0 && !is_probe {
            self.consecutive_retx += 1;
            self.current_rto_ms *= 2;
            tracing::debug!(
                consecutive_retx = self.consecutive_retx,
                current_rto_ms = self.current_rto_ms,
                "sender doubled RTO after timeout"
            );
        }

        self.elapsed_ms = 0;
        self.timer_running = true;
    }

    pub fn sequence_numbers_in_flight(&self) -> u64 {
        self.bytes_in_flight
    }

    pub fn consecutive_retransmissions(&self) -> u32 {
        self.consecutive_retx
    }

    /// Whether the sender's underlying stream has observed an error.
    pub fn has_error(&self) -> bool {
        self.writer.has_error()
    }
}
