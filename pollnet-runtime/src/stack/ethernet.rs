use crate::classifier::{Classifier, EtherClass};
use crate::clock::Clock;
use crate::driver::Driver;
use crate::stack::NetStack;
use pollnet_packets::{
    EtherType, EthernetFrame, MacAddr, PacketBuffer, ETHERNET_HEADER_LEN, ETHERNET_MIN_PAYLOAD,
};
use tracing::{instrument, trace, warn};

impl<D: Driver, C: Clock> NetStack<D, C> {
    /// Strips the Ethernet header from a received frame and hands the payload
    /// to ARP or IP.
    #[instrument(level = "trace", skip(self, buf), fields(len = buf.len()))]
    pub fn frame_in(&mut self, buf: &mut PacketBuffer) {
        let src_mac = match EthernetFrame::new_checked(buf.as_slice()) {
            Ok(frame) => frame.src_mac(),
            Err(reason) => {
                trace!(reason, "dropping frame");
                return;
            }
        };
        let class = self.ether_classifier.classify(buf);
        if let Err(reason) = buf.pull_header(ETHERNET_HEADER_LEN) {
            trace!(reason, "dropping frame");
            return;
        }

        match class {
            EtherClass::Arp => self.arp_in(buf, src_mac),
            EtherClass::Ipv4 => self.ip_in(buf, src_mac),
            EtherClass::Unsupported(ether_type) => {
                trace!(ether_type, %src_mac, "dropping frame with unsupported ether type")
            }
        }
    }

    /// Pads the payload to the Ethernet minimum, prepends the header and
    /// hands the frame to the driver. Failures are logged and the frame is
    /// dropped.
    pub fn frame_out(&mut self, mut buf: PacketBuffer, dst_mac: MacAddr, ether_type: EtherType) {
        if buf.len() < ETHERNET_MIN_PAYLOAD {
            let padding = ETHERNET_MIN_PAYLOAD - buf.len();
            if let Err(reason) = buf.push_padding(padding) {
                warn!(reason, "dropping outbound frame");
                return;
            }
        }
        let header = match buf.push_header(ETHERNET_HEADER_LEN) {
            Ok(header) => header,
            Err(reason) => {
                warn!(reason, "dropping outbound frame");
                return;
            }
        };

        let mut frame = EthernetFrame::new_unchecked(header);
        frame.set_dest_mac(dst_mac);
        frame.set_src_mac(self.iface.mac);
        frame.set_ether_type(ether_type);

        if let Err(e) = self.driver.send(&buf) {
            warn!(error = %e, %dst_mac, "driver send failed");
        }
    }
}
