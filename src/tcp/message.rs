//! Wire-level message shapes exchanged between a sender and its peer's
//! receiver. Framing these onto an actual packet is an external concern;
//! this crate only defines the logical payload.

use crate::wrap32::Wrap32;

/// Emitted by a [`crate::tcp::sender::TcpSender`], consumed by the peer's
/// [`crate::tcp::receiver::TcpReceiver`].
#[derive(Debug, Clone, Default)]
pub struct TcpSenderMessage {
    pub seqno: Wrap32,
    pub syn: bool,
    pub payload: Vec<u8>,
    pub fin: bool,
    pub rst: bool,
}

impl TcpSenderMessage {
    pub fn sequence_length(&self) -> usize {
        self.syn as usize + self.payload.len() + self.fin as usize
    }
}

/// Emitted by a [`crate::tcp::receiver::TcpReceiver`], consumed by the
/// peer's [`crate::tcp::sender::TcpSender`].
#[derive(Debug, Clone, Default)]
pub struct TcpReceiverMessage {
    pub ackno: Option<Wrap32>,
    pub window_size: u16,
    pub rst: bool,
}
