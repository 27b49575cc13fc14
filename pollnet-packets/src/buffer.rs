use std::fmt;

/// Room kept in front of a fresh payload. Covers Ethernet (14) + IPv4 (20) +
/// ICMP or UDP (8) with space to spare.
pub const DEFAULT_HEADROOM: usize = 64;

/// Room kept after a fresh payload, enough to pad a tiny payload up to the
/// Ethernet minimum of 46 bytes.
pub const DEFAULT_TAILROOM: usize = 48;

///
/// A byte region with a movable window inside fixed backing storage.
///
/// ```text
/// |<- headroom ->|<-------- window -------->|<- tailroom ->|
/// 0           offset                  offset + len     capacity
/// ```
///
/// Headers are pushed and pulled at the front of the window, padding at the
/// back. The backing storage never grows: an operation that would move the
/// window outside of it returns an error and leaves the buffer untouched.
///
#[derive(Clone, Default, PartialEq, Eq)]
pub struct PacketBuffer {
    storage: Vec<u8>,
    offset: usize,
    len: usize,
}

impl PacketBuffer {
    /// A zeroed window of `len` bytes with the default head and tail room.
    pub fn new(len: usize) -> Self {
        PacketBuffer {
            storage: vec![0; DEFAULT_HEADROOM + len + DEFAULT_TAILROOM],
            offset: DEFAULT_HEADROOM,
            len,
        }
    }

    /// A window holding a copy of `payload`, with the default head and tail room.
    pub fn from_payload(payload: &[u8]) -> Self {
        let mut buffer = PacketBuffer::new(payload.len());
        buffer.as_mut_slice().copy_from_slice(payload);
        buffer
    }

    /// An empty window at the start of `capacity` bytes of storage. This is
    /// the shape of a receive slot.
    pub fn with_capacity(capacity: usize) -> Self {
        PacketBuffer {
            storage: vec![0; capacity],
            offset: 0,
            len: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn headroom(&self) -> usize {
        self.offset
    }

    pub fn tailroom(&self) -> usize {
        self.storage.len() - self.offset - self.len
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.storage[self.offset..self.offset + self.len]
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.storage[self.offset..self.offset + self.len]
    }

    /// Replaces the window with a copy of `frame`, placed at the start of the
    /// storage.
    pub fn fill(&mut self, frame: &[u8]) -> Result<(), &'static str> {
        if frame.len() > self.storage.len() {
            return Err("Frame does not fit in the buffer");
        }
        self.offset = 0;
        self.len = frame.len();
        self.storage[..frame.len()].copy_from_slice(frame);
        Ok(())
    }

    /// Opens the whole storage as the window so a driver can read straight
    /// into it. Follow up with `truncate` once the frame length is known.
    pub fn reset(&mut self) -> &mut [u8] {
        self.offset = 0;
        self.len = self.storage.len();
        &mut self.storage[..]
    }

    /// Shortens the window to `len` bytes. Does nothing if it is already shorter.
    pub fn truncate(&mut self, len: usize) {
        if len < self.len {
            self.len = len;
        }
    }

    /// Grows the window by `len` bytes at the front and returns the new
    /// header region. The uncovered bytes keep whatever the storage held, so
    /// a header pulled earlier can be exposed again unchanged.
    pub fn push_header(&mut self, len: usize) -> Result<&mut [u8], &'static str> {
        if len > self.offset {
            return Err("Not enough headroom to push header");
        }
        self.offset -= len;
        self.len += len;
        Ok(&mut self.storage[self.offset..self.offset + len])
    }

    /// Drops `len` bytes from the front of the window.
    pub fn pull_header(&mut self, len: usize) -> Result<(), &'static str> {
        if len > self.len {
            return Err("Header is longer than the buffer");
        }
        self.offset += len;
        self.len -= len;
        Ok(())
    }

    /// Grows the window by `len` zero bytes at the back.
    pub fn push_padding(&mut self, len: usize) -> Result<(), &'static str> {
        if len > self.tailroom() {
            return Err("Not enough tailroom to add padding");
        }
        let end = self.offset + self.len;
        for byte in &mut self.storage[end..end + len] {
            *byte = 0;
        }
        self.len += len;
        Ok(())
    }

    /// Drops `len` bytes from the back of the window.
    pub fn trim_padding(&mut self, len: usize) -> Result<(), &'static str> {
        if len > self.len {
            return Err("Padding is longer than the buffer");
        }
        self.len -= len;
        Ok(())
    }
}

impl AsRef<[u8]> for PacketBuffer {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl AsMut<[u8]> for PacketBuffer {
    fn as_mut(&mut self) -> &mut [u8] {
        self.as_mut_slice()
    }
}

impl fmt::Debug for PacketBuffer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("PacketBuffer")
            .field("offset", &self.offset)
            .field("len", &self.len)
            .field("capacity", &self.storage.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_buffer() {
        let buffer = PacketBuffer::new(10);
        assert_eq!(buffer.len(), 10);
        assert_eq!(buffer.headroom(), DEFAULT_HEADROOM);
        assert_eq!(buffer.tailroom(), DEFAULT_TAILROOM);
        assert_eq!(buffer.as_slice(), &[0; 10]);
    }

    #[test]
    fn push_and_pull_header() {
        let mut buffer = PacketBuffer::from_payload(b"World!");
        buffer
            .push_header(7)
            .unwrap()
            .copy_from_slice(b"Hello, ");
        assert_eq!(buffer.as_slice(), b"Hello, World!");

        buffer.pull_header(7).unwrap();
        assert_eq!(buffer.as_slice(), b"World!");

        // The pulled bytes are still in the storage
        assert_eq!(buffer.push_header(7).unwrap(), b"Hello, ");
    }

    #[test]
    fn push_header_past_headroom_fails() {
        let mut buffer = PacketBuffer::from_payload(&[1, 2, 3]);
        assert!(buffer.push_header(DEFAULT_HEADROOM + 1).is_err());
        assert_eq!(buffer.as_slice(), &[1, 2, 3]);
        assert_eq!(buffer.headroom(), DEFAULT_HEADROOM);
    }

    #[test]
    fn pull_header_past_window_fails() {
        let mut buffer = PacketBuffer::from_payload(&[1, 2, 3]);
        assert!(buffer.pull_header(4).is_err());
        assert_eq!(buffer.len(), 3);
    }

    #[test]
    fn padding() {
        let mut buffer = PacketBuffer::from_payload(&[0xff; 4]);
        buffer.push_padding(4).unwrap();
        assert_eq!(buffer.as_slice(), &[0xff, 0xff, 0xff, 0xff, 0, 0, 0, 0]);
        buffer.trim_padding(6).unwrap();
        assert_eq!(buffer.as_slice(), &[0xff, 0xff]);
        assert!(buffer.trim_padding(3).is_err());
        assert!(buffer.push_padding(DEFAULT_TAILROOM + 3).is_err());
    }

    #[test]
    fn padding_is_zeroed_after_trim() {
        let mut buffer = PacketBuffer::from_payload(&[7; 8]);
        buffer.trim_padding(4).unwrap();
        buffer.push_padding(4).unwrap();
        assert_eq!(buffer.as_slice(), &[7, 7, 7, 7, 0, 0, 0, 0]);
    }

    #[test]
    fn fill_receive_slot() {
        let mut slot = PacketBuffer::with_capacity(16);
        assert!(slot.is_empty());
        slot.fill(&[1, 2, 3, 4]).unwrap();
        assert_eq!(slot.as_slice(), &[1, 2, 3, 4]);
        assert!(slot.fill(&[0; 17]).is_err());
        assert_eq!(slot.as_slice(), &[1, 2, 3, 4]);
    }

    #[test]
    fn reset_and_truncate() {
        let mut slot = PacketBuffer::with_capacity(8);
        slot.reset()[..3].copy_from_slice(&[9, 8, 7]);
        slot.truncate(3);
        assert_eq!(slot.as_slice(), &[9, 8, 7]);
    }

    #[test]
    fn clone_is_independent() {
        let original = PacketBuffer::from_payload(&[1, 2, 3]);
        let mut copy = original.clone();
        copy.as_mut_slice()[0] = 42;
        assert_eq!(original.as_slice(), &[1, 2, 3]);
        assert_eq!(copy.as_slice(), &[42, 2, 3]);
    }
}
