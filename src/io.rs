//! Buffers between the caller's flat byte slices and whole handshake
//! messages.
//!
//! [`InboundBuffer`] keeps whatever part of the peer's stream has not yet
//! formed a complete message; [`OutboundQueue`] holds produced bytes until
//! the caller supplies enough output capacity.

use alloc::vec::Vec;

use log::trace;

use crate::error::{Error, Result};
use crate::tls::messages::{read_handshake_header, HEADER_LEN};

/// Largest handshake message body we are willing to buffer.
pub const MAX_MESSAGE_LEN: usize = 64 * 1024;

/// Reassembles handshake messages from arbitrarily split input.
#[derive(Debug, Default)]
pub struct InboundBuffer {
    buf: Vec<u8>,
    start: usize,
    /// Bytes handed out as messages so far.
    taken: usize,
}

impl InboundBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append bytes received from the peer.
    pub fn feed(&mut self, data: &[u8]) {
        if self.start > 0 && self.start == self.buf.len() {
            self.buf.clear();
            self.start = 0;
        }
        self.buf.extend_from_slice(data);
    }

    /// Bytes buffered but not yet returned as messages.
    pub fn buffered(&self) -> usize {
        self.buf.len() - self.start
    }

    /// Total bytes returned as messages since creation.
    pub fn taken(&self) -> usize {
        self.taken
    }

    /// Pop the next complete message (header included), if any.
    pub fn next_message(&mut self) -> Result<Option<Vec<u8>>> {
        let pending = &self.buf[self.start..];
        if pending.len() < HEADER_LEN {
            return Ok(None);
        }
        let (_, len) = read_handshake_header(pending)?;
        if len > MAX_MESSAGE_LEN {
            return Err(Error::Decode("oversized handshake message"));
        }
        let total = HEADER_LEN + len;
        if pending.len() < total {
            trace!("partial message: {} of {} bytes", pending.len(), total);
            return Ok(None);
        }
        let msg = pending[..total].to_vec();
        self.start += total;
        self.taken += total;
        if self.start == self.buf.len() {
            self.buf.clear();
            self.start = 0;
        }
        Ok(Some(msg))
    }
}

/// Handshake bytes waiting for output capacity.
#[derive(Debug, Default)]
pub struct OutboundQueue {
    buf: Vec<u8>,
    start: usize,
}

impl OutboundQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    pub fn len(&self) -> usize {
        self.buf.len() - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy as much as fits into `out`; returns the number of bytes written.
    pub fn drain_into(&mut self, out: &mut [u8]) -> usize {
        let n = self.len().min(out.len());
        out[..n].copy_from_slice(&self.buf[self.start..self.start + n]);
        self.start += n;
        if self.start == self.buf.len() {
            self.buf.clear();
            self.start = 0;
        }
        n
    }

    /// Drop everything queued.
    pub fn clear(&mut self) {
        self.buf.clear();
        self.start = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn message(ty: u8, body: &[u8]) -> Vec<u8> {
        let mut m = vec![ty, 0, (body.len() >> 8) as u8, body.len() as u8];
        m.extend_from_slice(body);
        m
    }

    #[test]
    fn reassembles_split_messages() {
        let mut stream = message(8, &[1, 2, 3]);
        stream.extend(message(20, &[9; 5]));

        for split in 0..=stream.len() {
            let mut inbound = InboundBuffer::new();
            let mut got = Vec::new();
            for part in [&stream[..split], &stream[split..]] {
                inbound.feed(part);
                while let Some(m) = inbound.next_message().unwrap() {
                    got.push(m);
                }
            }
            assert_eq!(got, [message(8, &[1, 2, 3]), message(20, &[9; 5])], "split at {split}");
            assert_eq!(inbound.buffered(), 0);
        }
    }

    #[test]
    fn counts_taken_bytes() {
        let mut inbound = InboundBuffer::new();
        inbound.feed(&message(8, &[1, 2]));
        inbound.feed(&[20, 0]);
        assert!(inbound.next_message().unwrap().is_some());
        assert_eq!(inbound.taken(), 6);
        assert_eq!(inbound.next_message().unwrap(), None);
        assert_eq!(inbound.taken(), 6);
        assert_eq!(inbound.buffered(), 2);
    }

    #[test]
    fn keeps_partial_tail() {
        let mut inbound = InboundBuffer::new();
        inbound.feed(&[20, 0, 0, 4, 1, 2]);
        assert_eq!(inbound.next_message().unwrap(), None);
        assert_eq!(inbound.buffered(), 6);
    }

    #[test]
    fn rejects_oversized_message() {
        let mut inbound = InboundBuffer::new();
        inbound.feed(&[11, 0x10, 0x00, 0x00]);
        assert_eq!(
            inbound.next_message(),
            Err(Error::Decode("oversized handshake message"))
        );
    }

    #[test]
    fn backpressure_preserves_order() {
        let mut q = OutboundQueue::new();
        q.push(&[1, 2, 3, 4, 5]);
        q.push(&[6, 7]);

        let mut a = [0u8; 3];
        assert_eq!(q.drain_into(&mut a), 3);
        assert_eq!(a, [1, 2, 3]);
        assert_eq!(q.len(), 4);

        let mut b = [0u8; 16];
        assert_eq!(q.drain_into(&mut b), 4);
        assert_eq!(&b[..4], &[4, 5, 6, 7]);
        assert!(q.is_empty());
        assert_eq!(q.drain_into(&mut b), 0);
    }
}
