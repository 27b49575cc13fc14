use crate::clock::Clock;
use crate::driver::Driver;
use crate::error::{Result, StackError};
use crate::stack::NetStack;
use pollnet_packets::{
    IpProtocol, PacketBuffer, UdpSegment, UnreachableCode, IPV4_HEADER_LEN, IPV4_MAX_LEN,
    UDP_HEADER_LEN,
};
use std::net::Ipv4Addr;
use tracing::{debug, trace};

/// Receives the payloads of datagrams sent to an open port.
pub trait DatagramHandler: Send {
    fn on_datagram(&mut self, payload: &[u8], src_ip: Ipv4Addr, src_port: u16);
}

impl<F> DatagramHandler for F
where
    F: FnMut(&[u8], Ipv4Addr, u16) + Send,
{
    fn on_datagram(&mut self, payload: &[u8], src_ip: Ipv4Addr, src_port: u16) {
        self(payload, src_ip, src_port)
    }
}

impl<D: Driver, C: Clock> NetStack<D, C> {
    /// Delivers a received segment to the handler open on its destination
    /// port. `ip_header_len` is the length of the IP header just pulled off
    /// `buf`; it is pushed back on to quote the datagram in a port
    /// unreachable.
    pub fn udp_in(&mut self, buf: &mut PacketBuffer, src_ip: Ipv4Addr, ip_header_len: usize) {
        let (src_port, dst_port, length) = {
            let segment = match UdpSegment::new_checked(buf.as_slice()) {
                Ok(segment) => segment,
                Err(reason) => {
                    trace!(reason, %src_ip, "dropping UDP segment");
                    return;
                }
            };
            if !segment.verify_checksum(src_ip, self.iface.ip) {
                trace!(%src_ip, "dropping UDP segment with bad checksum");
                return;
            }
            (
                segment.src_port(),
                segment.dest_port(),
                segment.length() as usize,
            )
        };

        let now = self.clock.now();
        if !self.udp_ports.contains(&dst_port, now) {
            debug!(dst_port, %src_ip, "port unreachable");
            if buf.push_header(ip_header_len).is_ok() {
                self.icmp_unreachable(buf, src_ip, UnreachableCode::Port);
            }
            return;
        }

        if buf.pull_header(UDP_HEADER_LEN).is_err() {
            return;
        }
        buf.truncate(length - UDP_HEADER_LEN);
        if let Some(handler) = self.udp_ports.get_mut(&dst_port, now) {
            trace!(%src_ip, src_port, dst_port, len = buf.len(), "delivering datagram");
            handler.on_datagram(buf.as_slice(), src_ip, src_port);
        }
    }

    /// Prepends a UDP header to `buf` and sends it to `dst_ip`.
    pub fn udp_out(
        &mut self,
        mut buf: PacketBuffer,
        src_port: u16,
        dst_ip: Ipv4Addr,
        dst_port: u16,
    ) -> Result<()> {
        if buf.len() > IPV4_MAX_LEN - IPV4_HEADER_LEN - UDP_HEADER_LEN {
            return Err(StackError::PayloadTooLarge(buf.len()));
        }
        buf.push_header(UDP_HEADER_LEN).map_err(StackError::Buffer)?;
        let length = buf.len() as u16;

        let src_ip = self.iface.ip;
        let mut segment = UdpSegment::new_unchecked(buf.as_mut_slice());
        segment.set_src_port(src_port);
        segment.set_dest_port(dst_port);
        segment.set_length(length);
        segment.set_checksum(0);
        segment.fill_checksum(src_ip, dst_ip);

        self.ip_out(buf, dst_ip, IpProtocol::UDP)
    }

    /// Registers `handler` for datagrams sent to `port`.
    pub fn udp_open<H>(&mut self, port: u16, handler: H) -> Result<()>
    where
        H: DatagramHandler + 'static,
    {
        let now = self.clock.now();
        if self.udp_ports.contains(&port, now) {
            return Err(StackError::PortInUse(port));
        }
        self.udp_ports.insert(port, Box::new(handler), now)?;
        debug!(port, "UDP port opened");
        Ok(())
    }

    /// Returns whether a handler was registered on `port`.
    pub fn udp_close(&mut self, port: u16) -> bool {
        let closed = self.udp_ports.remove(&port).is_some();
        if closed {
            debug!(port, "UDP port closed");
        }
        closed
    }

    /// Copies `data` into a new buffer and sends it.
    pub fn udp_send(
        &mut self,
        data: &[u8],
        src_port: u16,
        dst_ip: Ipv4Addr,
        dst_port: u16,
    ) -> Result<()> {
        self.udp_out(PacketBuffer::from_payload(data), src_port, dst_ip, dst_port)
    }

    pub fn udp_open_ports(&self) -> usize {
        self.udp_ports.len()
    }
}
