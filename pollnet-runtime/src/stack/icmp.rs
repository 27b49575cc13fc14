use crate::clock::Clock;
use crate::driver::Driver;
use crate::stack::NetStack;
use pollnet_packets::{
    IcmpPacket, IcmpType, IpProtocol, Ipv4Packet, PacketBuffer, UnreachableCode, ICMP_HEADER_LEN,
    ICMP_UNREACHABLE_QUOTE_LEN, IPV4_HEADER_LEN,
};
use std::cmp;
use std::net::Ipv4Addr;
use tracing::{trace, warn};

impl<D: Driver, C: Clock> NetStack<D, C> {
    /// Answers echo requests. Every other message type is ignored.
    pub fn icmp_in(&mut self, buf: &mut PacketBuffer, src_ip: Ipv4Addr) {
        let icmp_type = {
            let packet = match IcmpPacket::new_checked(buf.as_slice()) {
                Ok(packet) => packet,
                Err(reason) => {
                    trace!(reason, %src_ip, "dropping ICMP message");
                    return;
                }
            };
            if !packet.verify_checksum() {
                trace!(%src_ip, "dropping ICMP message with bad checksum");
                return;
            }
            packet.icmp_type()
        };

        match icmp_type {
            IcmpType::EchoRequest => self.icmp_echo_reply(buf, src_ip),
            other => trace!(icmp_type = ?other, %src_ip, "ignoring ICMP message"),
        }
    }

    /// Sends an unreachable message to `src_ip` about the datagram in
    /// `ip_buf`, whose window must start at its IP header. The message
    /// quotes that header and the first 8 bytes of its payload.
    pub fn icmp_unreachable(&mut self, ip_buf: &PacketBuffer, src_ip: Ipv4Addr, code: UnreachableCode) {
        let original = ip_buf.as_slice();
        if original.len() < IPV4_HEADER_LEN {
            trace!(len = original.len(), "nothing to quote in ICMP unreachable");
            return;
        }
        let header_len = cmp::min(
            cmp::max(Ipv4Packet::new_unchecked(original).header_len(), IPV4_HEADER_LEN),
            original.len(),
        );
        let quote_len = cmp::min(header_len + ICMP_UNREACHABLE_QUOTE_LEN, original.len());

        let mut message = PacketBuffer::new(ICMP_HEADER_LEN + quote_len);
        let mut packet = IcmpPacket::new_unchecked(message.as_mut_slice());
        packet.set_icmp_type(IcmpType::DestUnreachable);
        packet.set_code(code as u8);
        packet.clear_rest_of_header();
        packet.data_mut().copy_from_slice(&original[..quote_len]);
        packet.fill_checksum();

        trace!(%src_ip, ?code, "sending ICMP unreachable");
        if let Err(e) = self.ip_out(message, src_ip, IpProtocol::ICMP) {
            warn!(error = %e, %src_ip, "could not send ICMP unreachable");
        }
    }

    fn icmp_echo_reply(&mut self, request: &PacketBuffer, src_ip: Ipv4Addr) {
        let mut reply = PacketBuffer::from_payload(request.as_slice());
        let mut packet = IcmpPacket::new_unchecked(reply.as_mut_slice());
        packet.set_icmp_type(IcmpType::EchoReply);
        packet.set_code(0);
        packet.fill_checksum();

        trace!(
            %src_ip,
            ident = packet.echo_ident(),
            seq_no = packet.echo_seq_no(),
            "sending echo reply"
        );
        if let Err(e) = self.ip_out(reply, src_ip, IpProtocol::ICMP) {
            warn!(error = %e, %src_ip, "could not send echo reply");
        }
    }
}
