use crate::clock::ManualClock;
use crate::config::StackConfig;
use crate::driver::{channel_link, ChannelDriver, ChannelPeer};
use crate::stack::NetStack;
use crate::utils::test::packet_generators::arp_reply_frame;
use pollnet_packets::MacAddr;
use std::net::Ipv4Addr;
use std::time::Duration;
use tokio::runtime;

/// The utils::test::harness module should help layer tests abstract away the plumbing of a
/// stack under test. Tests should be expressed with the typical "Given, When, Then" structure
/// (https://martinfowler.com/bliki/GivenWhenThen.html).

/// "Given" refers to the state of the world before the behavior under test runs.
/// For a stack that is its configuration, the time on its clock and what it has already
/// learned about its peer.

/// "When" refers to the behavior under test.
/// Usually a frame delivered from the peer, or a call on the stack's outbound surface.

/// "Then" refers to the expected changes to the system due to executing the behavior under test
/// against the initial context.
/// These are the frames the stack sent back to the peer, and its tables afterwards.

pub const LOCAL_IP: Ipv4Addr = Ipv4Addr::new(192, 0, 2, 1);
pub const LOCAL_MAC: MacAddr = MacAddr::new([0xaa; 6]);
pub const PEER_IP: Ipv4Addr = Ipv4Addr::new(192, 0, 2, 2);
pub const PEER_MAC: MacAddr = MacAddr::new([0xbb; 6]);

pub fn test_config() -> StackConfig {
    StackConfig::new(LOCAL_IP, LOCAL_MAC)
}

pub fn initialize_runtime() -> runtime::Runtime {
    runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap()
}

/// A stack wired to an in-memory peer, running on a clock the test moves by hand.
pub struct TestHarness {
    pub stack: NetStack<ChannelDriver, ManualClock>,
    pub peer: ChannelPeer,
    pub clock: ManualClock,
    /// The gratuitous ARP request the stack sent while starting up.
    pub announcement: Vec<u8>,
}

impl TestHarness {
    pub fn new() -> Self {
        TestHarness::with_config(test_config())
    }

    pub fn with_config(config: StackConfig) -> Self {
        let (driver, peer) = channel_link();
        let clock = ManualClock::new();
        let stack = NetStack::with_clock(config, driver, clock.clone()).unwrap();
        let mut startup = peer.sent();
        assert_eq!(startup.len(), 1, "expected exactly one announcement");
        TestHarness {
            stack,
            peer,
            clock,
            announcement: startup.remove(0),
        }
    }

    /// A harness whose stack already knows `PEER_MAC` for `PEER_IP`.
    pub fn resolved() -> Self {
        let mut harness = TestHarness::new();
        harness.resolve_peer();
        harness
    }

    /// Teaches the stack the peer's address through an unsolicited reply.
    pub fn resolve_peer(&mut self) {
        self.deliver(arp_reply_frame(PEER_MAC, PEER_IP, LOCAL_MAC, LOCAL_IP));
        self.sent();
    }

    /// Hands `frame` to the stack and polls once.
    pub fn deliver(&mut self, frame: Vec<u8>) {
        self.peer.inject(frame).unwrap();
        assert!(self.stack.poll(), "stack did not pick up the frame");
    }

    /// Every frame the stack has sent since the last call.
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.peer.sent()
    }

    pub fn advance(&self, duration: Duration) {
        self.clock.advance(duration);
    }
}
