use crate::*;
use std::convert::TryInto;
use std::net::Ipv4Addr;

pub const UDP_HEADER_LEN: usize = 8;

/// The fields of the IPv4 header that the UDP checksum covers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ipv4PseudoHeader {
    pub src_addr: Ipv4Addr,
    pub dest_addr: Ipv4Addr,
    pub protocol: IpProtocol,
    pub length: u16,
}

impl Ipv4PseudoHeader {
    pub fn new(src_addr: Ipv4Addr, dest_addr: Ipv4Addr, length: u16) -> Self {
        Ipv4PseudoHeader {
            src_addr,
            dest_addr,
            protocol: IpProtocol::UDP,
            length,
        }
    }

    /// A running checksum seeded with the pseudo header.
    pub fn checksum(&self) -> Checksum {
        Checksum::new()
            .add(&self.src_addr.octets())
            .add(&self.dest_addr.octets())
            .add(&[0, u8::from(self.protocol)])
            .add_u16(self.length)
    }
}

///
/// Getters/setters over a UDP segment (RFC 768).
///
/// ```text
/// 0          2          4          6          8
/// |-src port-|-dst port-|--length--|-checksum-|--payload...
/// ```
///
/// `new_checked` insists that the length field covers at least the header
/// and no more than the buffer. Bytes past the length field are ignored.
///
#[derive(Clone, Debug)]
pub struct UdpSegment<T: AsRef<[u8]>> {
    buffer: T,
}

impl<T: AsRef<[u8]>> UdpSegment<T> {
    pub fn new_checked(buffer: T) -> Result<UdpSegment<T>, &'static str> {
        if buffer.as_ref().len() < UDP_HEADER_LEN {
            return Err("Segment to short to contain valid UDP Header");
        }
        let segment = UdpSegment { buffer };
        let length = segment.length() as usize;
        if length < UDP_HEADER_LEN {
            return Err("Length field is shorter than the UDP header");
        }
        if length > segment.buffer.as_ref().len() {
            return Err("Segment is not correct length as given by it's length field");
        }
        Ok(segment)
    }

    pub fn new_unchecked(buffer: T) -> UdpSegment<T> {
        UdpSegment { buffer }
    }

    pub fn into_inner(self) -> T {
        self.buffer
    }

    pub fn src_port(&self) -> u16 {
        self.read_u16(0)
    }

    pub fn dest_port(&self) -> u16 {
        self.read_u16(2)
    }

    pub fn length(&self) -> u16 {
        self.read_u16(4)
    }

    pub fn checksum(&self) -> u16 {
        self.read_u16(6)
    }

    pub fn payload(&self) -> &[u8] {
        &self.buffer.as_ref()[UDP_HEADER_LEN..self.length() as usize]
    }

    /// Checksum over the pseudo header and the segment, with the checksum
    /// field skipped. A result of zero is returned as 0xFFFF, since a zero
    /// field on the wire means "no checksum".
    pub fn compute_checksum(&self, src_addr: Ipv4Addr, dest_addr: Ipv4Addr) -> u16 {
        let segment = &self.buffer.as_ref()[..self.length() as usize];
        let checksum = Ipv4PseudoHeader::new(src_addr, dest_addr, self.length())
            .checksum()
            .add(&segment[..6])
            .add(&segment[8..])
            .finish();
        if checksum == 0 {
            0xFFFF
        } else {
            checksum
        }
    }

    /// A zero checksum field means the sender did not compute one, which
    /// always passes.
    pub fn verify_checksum(&self, src_addr: Ipv4Addr, dest_addr: Ipv4Addr) -> bool {
        let checksum = self.checksum();
        checksum == 0 || checksum == self.compute_checksum(src_addr, dest_addr)
    }

    fn read_u16(&self, at: usize) -> u16 {
        u16::from_be_bytes(self.buffer.as_ref()[at..at + 2].try_into().unwrap())
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> UdpSegment<T> {
    pub fn set_src_port(&mut self, port: u16) {
        self.write_u16(0, port);
    }

    pub fn set_dest_port(&mut self, port: u16) {
        self.write_u16(2, port);
    }

    pub fn set_length(&mut self, length: u16) {
        self.write_u16(4, length);
    }

    pub fn set_checksum(&mut self, checksum: u16) {
        self.write_u16(6, checksum);
    }

    pub fn fill_checksum(&mut self, src_addr: Ipv4Addr, dest_addr: Ipv4Addr) {
        let checksum = self.compute_checksum(src_addr, dest_addr);
        self.set_checksum(checksum);
    }

    pub fn payload_mut(&mut self) -> &mut [u8] {
        let end = self.length() as usize;
        &mut self.buffer.as_mut()[UDP_HEADER_LEN..end]
    }

    fn write_u16(&mut self, at: usize, value: u16) {
        self.buffer.as_mut()[at..at + 2].copy_from_slice(&value.to_be_bytes());
    }
}
