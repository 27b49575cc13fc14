///
/// Running 16-bit ones' complement sum as described in RFC 1071
/// https://tools.ietf.org/html/rfc1071
///
/// Bytes may be fed in several spans. A span of odd length leaves its last
/// byte pending, to be paired with the first byte of the next span, so the
/// result only depends on the concatenation of the spans. A trailing odd byte
/// is padded with a zero octet when the sum is finished.
///
#[derive(Clone, Copy, Debug, Default)]
pub struct Checksum {
    sum: u32,
    pending: Option<u8>,
}

impl Checksum {
    pub fn new() -> Self {
        Checksum::default()
    }

    pub fn add(mut self, bytes: &[u8]) -> Self {
        let mut bytes = bytes;
        if let Some(high) = self.pending.take() {
            match bytes.split_first() {
                Some((low, rest)) => {
                    self.sum += u32::from(u16::from_be_bytes([high, *low]));
                    bytes = rest;
                }
                None => {
                    self.pending = Some(high);
                    return self;
                }
            }
        }

        let mut words = bytes.chunks_exact(2);
        for word in &mut words {
            self.sum += u32::from(u16::from_be_bytes([word[0], word[1]]));
            self.fold();
        }
        if let [last] = words.remainder() {
            self.pending = Some(*last);
        }
        self
    }

    pub fn add_u16(self, word: u16) -> Self {
        self.add(&word.to_be_bytes())
    }

    /// The ones' complement of the sum, ready to be written into a header.
    pub fn finish(mut self) -> u16 {
        if let Some(high) = self.pending.take() {
            self.sum += u32::from(u16::from_be_bytes([high, 0]));
        }
        self.fold();
        self.fold();
        !(self.sum as u16)
    }

    fn fold(&mut self) {
        self.sum = (self.sum & 0xFFFF) + (self.sum >> 16);
    }
}

/// Checksum of a single contiguous span.
pub fn checksum16(data: &[u8]) -> u16 {
    Checksum::new().add(data).finish()
}
