//! Translates incoming wire segments into [`Reassembler`] insertions and
//! produces acknowledgements/window updates for the peer's sender.

use crate::reassembler::Reassembler;
use crate::tcp::message::{TcpReceiverMessage, TcpSenderMessage};
use crate::wrap32::Wrap32;

#[derive(Debug)]
pub struct TcpReceiver {
    reassembler: Reassembler,
    isn: Option<Wrap32>,
}

impl TcpReceiver {
    pub fn new(reassembler: Reassembler) -> Self {
        TcpReceiver {
            reassembler,
            isn: None,
        }
    }

    pub fn receive(&mut self, message: TcpSenderMessage) {
        if message.rst {
            tracing::warn!("receiver got RST, marking stream error");
            self.reassembler.writer().set_error();
            return;
        }

        if self.isn.is_none() {
            if message.syn {
                tracing::debug!(seqno = %message.seqno, "receiver learned ISN from SYN");
                self.isn = Some(message.seqno);
            } else {
                tracing::trace!("receiver ignoring pre-SYN segment");
                return;
            }
        }
        let isn = self.isn.unwrap();

        let first_index = if message.syn {
            0
        } else {
            let checkpoint = 1 + self.reassembler.writer().bytes_pushed();
            let abs_seqno = message.seqno.unwrap(isn, checkpoint);
            if abs_seqno == 0 {
                tracing::warn!("receiver ignoring malformed segment (seqno resolves to abs 0)");
                return;
            }
            abs_seqno - 1
        };

        if !message.payload.is_empty() || message.fin {
            self.reassembler
                .insert(first_index, message.payload, message.fin);
        }
    }

    pub fn send(&self) -> TcpReceiverMessage {
        let writer = self.reassembler.writer();
        let rst = self.reassembler.writer().has_error();
        let avail = writer.available_capacity();
        let window_size = std::cmp::min(avail, u16::MAX as u64) as u16;

        let Some(isn) = self.isn else {
            return TcpReceiverMessage {
                ackno: None,
                window_size,
                rst,
            };
        };

        let ack_abs = 1 + writer.bytes_pushed() + writer.is_closed() as u64;
        TcpReceiverMessage {
            ackno: Some(Wrap32::wrap(ack_abs, isn)),
            window_size,
            rst,
        }
    }

    /// Whether the receiver's underlying stream has observed an error.
    pub fn has_error(&self) -> bool {
        self.reassembler.writer().has_error()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::byte_stream::ByteStream;

    fn receiver(capacity: u64) -> TcpReceiver {
        let stream = ByteStream::new(capacity).unwrap();
        TcpReceiver::new(Reassembler::new(stream.writer()))
    }

    #[test]
    fn window_and_ackno_after_syn() {
        let mut r = receiver(4096);
        let isn = Wrap32::from_raw(42);
        r.receive(TcpSenderMessage {
            seqno: isn,
            syn: true,
            payload: vec![],
            fin: false,
            rst: false,
        });

        let out = r.send();
        assert_eq!(out.window_size, 4096);
        assert_eq!(out.ackno, Some(Wrap32::wrap(1, isn)));
    }

    #[test]
    fn pre_syn_traffic_is_ignored() {
        let mut r = receiver(16);
        r.receive(TcpSenderMessage {
            seqno: Wrap32::from_raw(5),
            syn: false,
            payload: b"x".to_vec(),
            fin: false,
            rst: false,
        });
        assert_eq!(r.send().ackno, None);
    }

    #[test]
    fn rst_sets_error_and_is_reported() {
        let mut r = receiver(16);
        r.receive(TcpSenderMessage {
            seqno: Wrap32::from_raw(0),
            syn: false,
            payload: vec![],
            fin: false,
            rst: true,
        });
        assert!(r.has_error());
        assert!(r.send().rst);
    }

    #[test]
    fn ack_advances_with_received_payload() {
        let mut r = receiver(16);
        let isn = Wrap32::from_raw(0);
        r.receive(TcpSenderMessage {
            seqno: isn,
            syn: true,
            payload: vec![],
            fin: false,
            rst: false,
        });
        r.receive(TcpSenderMessage {
            seqno: Wrap32::wrap(1, isn),
            syn: false,
            payload: b"hello".to_vec(),
            fin: false,
            rst: false,
        });
        assert_eq!(r.send().ackno, Some(Wrap32::wrap(6, isn)));
    }

    #[test]
    fn ack_includes_fin_once_stream_closes() {
        let mut r = receiver(16);
        let isn = Wrap32::from_raw(0);
        r.receive(TcpSenderMessage {
            seqno: isn,
            syn: true,
            payload: vec![],
            fin: false,
            rst: false,
        });
        r.receive(TcpSenderMessage {
            seqno: Wrap32::wrap(1, isn),
            syn: false,
            payload: b"hi".to_vec(),
            fin: true,
            rst: false,
        });
        assert_eq!(r.send().ackno, Some(Wrap32::wrap(4, isn)));
    }
}
