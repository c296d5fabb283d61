use log::warn;

use crate::align::padding;
use crate::error::{Error, Result};

/// Byte order of a message body, as flagged in the message header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Endianness {
    Little,
    Big,
}

impl Endianness {
    /// The header flag byte: `l` or `B`.
    pub fn flag(self) -> u8 {
        match self {
            Endianness::Little => b'l',
            Endianness::Big => b'B',
        }
    }

    pub fn from_flag(flag: u8) -> Option<Self> {
        match flag {
            b'l' => Some(Endianness::Little),
            b'B' => Some(Endianness::Big),
            _ => None,
        }
    }
}

impl Default for Endianness {
    fn default() -> Self {
        Endianness::Little
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageKind {
    MethodCall,
    MethodReturn,
    Error,
    Signal,
}

impl Default for MessageKind {
    fn default() -> Self {
        MessageKind::MethodCall
    }
}

/// A message body together with its signature.
///
/// This is the boundary to whatever transport carries the message: the
/// header, serial numbers and socket I/O live there. Alignment is counted
/// from the start of the body.
///
/// A message whose encoding failed part-way through a container is
/// abandoned: its body ends in a half-written value, so it refuses any
/// further appends and should be discarded.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Message {
    kind: MessageKind,
    endianness: Endianness,
    signature: String,
    body: Vec<u8>,
    abandoned: bool,
}

impl Message {
    pub fn new(kind: MessageKind) -> Self {
        Message {
            kind,
            ..Message::default()
        }
    }

    pub fn with_endianness(kind: MessageKind, endianness: Endianness) -> Self {
        Message {
            kind,
            endianness,
            ..Message::default()
        }
    }

    /// Wraps a body received from elsewhere. The signature is checked
    /// when the body is decoded.
    pub fn from_parts(
        kind: MessageKind,
        endianness: Endianness,
        signature: impl Into<String>,
        body: Vec<u8>,
    ) -> Self {
        Message {
            kind,
            endianness,
            signature: signature.into(),
            body,
            abandoned: false,
        }
    }

    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn set_signature(&mut self, signature: impl Into<String>) {
        self.signature = signature.into();
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Length of the body so far, which is where the next append lands
    /// before alignment.
    pub fn position(&self) -> usize {
        self.body.len()
    }

    pub fn is_abandoned(&self) -> bool {
        self.abandoned
    }

    pub(crate) fn abandon(&mut self) {
        if !self.abandoned {
            warn!(
                "abandoning message with signature {:?} after {} body bytes",
                self.signature,
                self.body.len()
            );
        }
        self.abandoned = true;
    }

    /// Pads the body with zeros to `alignment`, then appends `bytes`.
    /// Returns the offset the bytes were written at.
    pub fn append_raw(&mut self, bytes: &[u8], alignment: usize) -> Result<usize> {
        if self.abandoned {
            return Err(Error::container_mismatch(
                "message was abandoned by an earlier failed encode",
            ));
        }
        let pad = padding(self.body.len(), alignment);
        self.body.resize(self.body.len() + pad, 0);
        let offset = self.body.len();
        self.body.extend_from_slice(bytes);
        Ok(offset)
    }

    /// Reads `count` bytes starting at `offset` rounded up to
    /// `alignment`. The skipped padding must be zero.
    pub fn read_raw(&self, offset: usize, count: usize, alignment: usize) -> Result<&[u8]> {
        let start = offset + padding(offset, alignment);
        let end = start
            .checked_add(count)
            .ok_or_else(|| Error::corrupted(offset, "length overflows the body"))?;
        if end > self.body.len() {
            return Err(Error::corrupted(
                offset,
                format!(
                    "needs {} bytes at {}, body has {}",
                    count,
                    start,
                    self.body.len()
                ),
            ));
        }
        if self.body[offset..start].iter().any(|&b| b != 0) {
            return Err(Error::corrupted(offset, "non-zero padding"));
        }
        Ok(&self.body[start..end])
    }

    // Backfills bytes that were reserved earlier, e.g. an array length.
    pub(crate) fn patch(&mut self, offset: usize, bytes: &[u8]) {
        self.body[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    pub(crate) fn push_signature(&mut self, signature: &str) {
        self.signature.push_str(signature);
    }
}

#[cfg(test)]
mod tests {
    use super::{Endianness, Message, MessageKind};
    use crate::error::{Error, Result};
    use test_log::test;

    #[test]
    fn raw_append_pads_with_zeros() -> Result<()> {
        let mut mesg = Message::new(MessageKind::Signal);
        assert_eq!(mesg.append_raw(&[1], 1)?, 0);
        assert_eq!(mesg.append_raw(&[2, 0, 0, 0], 4)?, 4);
        assert_eq!(mesg.append_raw(&[3], 8)?, 8);
        assert_eq!(mesg.body(), &[1, 0, 0, 0, 2, 0, 0, 0, 3]);
        assert_eq!(mesg.position(), 9);
        Ok(())
    }

    #[test]
    fn raw_read_checks_padding_and_bounds() -> Result<()> {
        let mesg = Message::from_parts(
            MessageKind::MethodReturn,
            Endianness::Little,
            "yu",
            vec![7, 0, 0, 0, 9, 0, 0, 0],
        );
        assert_eq!(mesg.read_raw(1, 4, 4)?, &[9, 0, 0, 0]);
        assert!(matches!(
            mesg.read_raw(1, 8, 4),
            Err(Error::DataCorrupted { .. })
        ));

        let dirty = Message::from_parts(
            MessageKind::MethodReturn,
            Endianness::Little,
            "yu",
            vec![7, 1, 0, 0, 9, 0, 0, 0],
        );
        assert!(matches!(
            dirty.read_raw(1, 4, 4),
            Err(Error::DataCorrupted { .. })
        ));
        Ok(())
    }

    #[test]
    fn abandoned_message_refuses_appends() {
        let mut mesg = Message::default();
        mesg.abandon();
        assert!(mesg.is_abandoned());
        assert!(matches!(
            mesg.append_raw(&[0], 1),
            Err(Error::ContainerMismatch { .. })
        ));
    }

    #[test]
    fn endianness_flags() {
        assert_eq!(Endianness::from_flag(b'B'), Some(Endianness::Big));
        assert_eq!(Endianness::from_flag(Endianness::Little.flag()), Some(Endianness::Little));
        assert_eq!(Endianness::from_flag(b'x'), None);
    }
}
