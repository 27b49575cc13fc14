use crate::classifier::{Classifier, IpClass};
use crate::clock::Clock;
use crate::driver::Driver;
use crate::error::{Result, StackError};
use crate::stack::NetStack;
use pollnet_packets::{
    IpProtocol, Ipv4Packet, MacAddr, PacketBuffer, UnreachableCode, IPV4_HEADER_LEN, IPV4_MAX_LEN,
};
use std::net::Ipv4Addr;
use tracing::{debug, trace};

impl<D: Driver, C: Clock> NetStack<D, C> {
    /// Validates a received IPv4 packet addressed to this interface and
    /// passes its payload to ICMP or UDP. Other protocols get a protocol
    /// unreachable. Fragments are delivered as they come; nothing is
    /// reassembled.
    pub fn ip_in(&mut self, buf: &mut PacketBuffer, src_mac: MacAddr) {
        let (header_len, total_len, src_ip, dst_ip) = {
            let packet = match Ipv4Packet::new_checked(buf.as_slice()) {
                Ok(packet) => packet,
                Err(reason) => {
                    trace!(reason, %src_mac, "dropping IPv4 packet");
                    return;
                }
            };
            if !packet.verify_checksum() {
                trace!(%src_mac, "dropping IPv4 packet with bad header checksum");
                return;
            }
            (
                packet.header_len(),
                packet.total_len() as usize,
                packet.src_addr(),
                packet.dest_addr(),
            )
        };

        if dst_ip != self.iface.ip {
            trace!(%dst_ip, "dropping IPv4 packet for another host");
            return;
        }

        // Link layer padding
        if buf.len() > total_len {
            let padding = buf.len() - total_len;
            if let Err(reason) = buf.trim_padding(padding) {
                trace!(reason, "dropping IPv4 packet");
                return;
            }
        }

        match self.ip_classifier.classify(buf) {
            IpClass::Icmp => {
                if buf.pull_header(header_len).is_ok() {
                    self.icmp_in(buf, src_ip);
                }
            }
            IpClass::Udp => {
                if buf.pull_header(header_len).is_ok() {
                    self.udp_in(buf, src_ip, header_len);
                }
            }
            IpClass::Unsupported(protocol) => {
                debug!(protocol, %src_ip, "protocol unreachable");
                self.icmp_unreachable(buf, src_ip, UnreachableCode::Protocol);
            }
        }
    }

    /// Sends `buf` as the payload of an IPv4 datagram to `dst_ip`, split into
    /// fragments if it is larger than the MTU allows. Every call consumes one
    /// identification value, fragmented or not.
    pub fn ip_out(&mut self, buf: PacketBuffer, dst_ip: Ipv4Addr, protocol: IpProtocol) -> Result<()> {
        let len = buf.len();
        if len > IPV4_MAX_LEN - IPV4_HEADER_LEN {
            return Err(StackError::PayloadTooLarge(len));
        }

        let id = self.ip_id;
        self.ip_id = self.ip_id.wrapping_add(1);

        if len <= self.iface.max_ip_payload() {
            return self.ip_fragment_out(buf, dst_ip, protocol, id, 0, false);
        }

        let fragment_len = self.iface.fragment_payload();
        let fragments = (len + fragment_len - 1) / fragment_len;
        trace!(%dst_ip, id, len, fragments, "fragmenting datagram");
        for (index, chunk) in buf.as_slice().chunks(fragment_len).enumerate() {
            let offset = (index * fragment_len / 8) as u16;
            let more_fragments = index + 1 < fragments;
            self.ip_fragment_out(
                PacketBuffer::from_payload(chunk),
                dst_ip,
                protocol,
                id,
                offset,
                more_fragments,
            )?;
        }
        Ok(())
    }

    /// Prepends a 20 byte IPv4 header to `buf` and passes it to ARP.
    /// `offset` is in 8 byte units.
    pub fn ip_fragment_out(
        &mut self,
        mut buf: PacketBuffer,
        dst_ip: Ipv4Addr,
        protocol: IpProtocol,
        id: u16,
        offset: u16,
        more_fragments: bool,
    ) -> Result<()> {
        buf.push_header(IPV4_HEADER_LEN).map_err(StackError::Buffer)?;
        let total_len = buf.len() as u16;

        let mut packet = Ipv4Packet::new_unchecked(buf.as_mut_slice());
        packet.set_header_len(IPV4_HEADER_LEN);
        packet.set_tos(0);
        packet.set_total_len(total_len);
        packet.set_identification(id);
        packet.set_fragment(more_fragments, offset);
        packet.set_ttl(self.config.ip_ttl);
        packet.set_protocol(protocol);
        packet.set_checksum(0);
        packet.set_src_addr(self.iface.ip);
        packet.set_dest_addr(dst_ip);
        packet.fill_checksum();

        self.arp_out(buf, dst_ip);
        Ok(())
    }
}
