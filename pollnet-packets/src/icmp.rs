use crate::*;
use std::convert::TryInto;

/// Type, code, checksum and the 4 byte rest-of-header.
pub const ICMP_HEADER_LEN: usize = 8;
/// How much of the offending datagram's payload an unreachable message quotes.
pub const ICMP_UNREACHABLE_QUOTE_LEN: usize = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IcmpType {
    EchoReply,
    DestUnreachable,
    EchoRequest,
    Unknown(u8),
}

impl From<u8> for IcmpType {
    fn from(icmp_type: u8) -> Self {
        match icmp_type {
            0 => IcmpType::EchoReply,
            3 => IcmpType::DestUnreachable,
            8 => IcmpType::EchoRequest,
            other => IcmpType::Unknown(other),
        }
    }
}

impl From<IcmpType> for u8 {
    fn from(icmp_type: IcmpType) -> Self {
        match icmp_type {
            IcmpType::EchoReply => 0,
            IcmpType::DestUnreachable => 3,
            IcmpType::EchoRequest => 8,
            IcmpType::Unknown(other) => other,
        }
    }
}

/// Codes carried by a Destination Unreachable message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnreachableCode {
    Protocol = 2,
    Port = 3,
}

///
/// Getters/setters over an ICMP message (RFC 792). The checksum covers the
/// whole message, so the view spans everything after the IP header.
///
#[derive(Clone, Debug)]
pub struct IcmpPacket<T: AsRef<[u8]>> {
    buffer: T,
}

impl<T: AsRef<[u8]>> IcmpPacket<T> {
    pub fn new_checked(buffer: T) -> Result<IcmpPacket<T>, &'static str> {
        if buffer.as_ref().len() < ICMP_HEADER_LEN {
            return Err("Message is too short to be an ICMP packet");
        }
        Ok(IcmpPacket { buffer })
    }

    pub fn new_unchecked(buffer: T) -> IcmpPacket<T> {
        IcmpPacket { buffer }
    }

    pub fn into_inner(self) -> T {
        self.buffer
    }

    pub fn icmp_type(&self) -> IcmpType {
        IcmpType::from(self.buffer.as_ref()[0])
    }

    pub fn code(&self) -> u8 {
        self.buffer.as_ref()[1]
    }

    pub fn checksum(&self) -> u16 {
        self.read_u16(2)
    }

    /// Echo identifier. Only meaningful for echo request/reply.
    pub fn echo_ident(&self) -> u16 {
        self.read_u16(4)
    }

    /// Echo sequence number. Only meaningful for echo request/reply.
    pub fn echo_seq_no(&self) -> u16 {
        self.read_u16(6)
    }

    /// Everything after the 8 byte header: echo data, or the quoted datagram
    /// of an error message.
    pub fn data(&self) -> &[u8] {
        &self.buffer.as_ref()[ICMP_HEADER_LEN..]
    }

    pub fn compute_checksum(&self) -> u16 {
        let message = self.buffer.as_ref();
        Checksum::new()
            .add(&message[..2])
            .add(&message[4..])
            .finish()
    }

    pub fn verify_checksum(&self) -> bool {
        self.compute_checksum() == self.checksum()
    }

    fn read_u16(&self, at: usize) -> u16 {
        u16::from_be_bytes(self.buffer.as_ref()[at..at + 2].try_into().unwrap())
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> IcmpPacket<T> {
    pub fn set_icmp_type(&mut self, icmp_type: IcmpType) {
        self.buffer.as_mut()[0] = u8::from(icmp_type);
    }

    pub fn set_code(&mut self, code: u8) {
        self.buffer.as_mut()[1] = code;
    }

    pub fn set_checksum(&mut self, checksum: u16) {
        self.write_u16(2, checksum);
    }

    pub fn fill_checksum(&mut self) {
        let checksum = self.compute_checksum();
        self.set_checksum(checksum);
    }

    pub fn set_echo_ident(&mut self, ident: u16) {
        self.write_u16(4, ident);
    }

    pub fn set_echo_seq_no(&mut self, seq_no: u16) {
        self.write_u16(6, seq_no);
    }

    /// Zeroes the 4 byte rest-of-header, as unreachable messages require.
    pub fn clear_rest_of_header(&mut self) {
        for byte in &mut self.buffer.as_mut()[4..8] {
            *byte = 0;
        }
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.buffer.as_mut()[ICMP_HEADER_LEN..]
    }

    fn write_u16(&mut self, at: usize, value: u16) {
        self.buffer.as_mut()[at..at + 2].copy_from_slice(&value.to_be_bytes());
    }
}
