/// Classifiers decide which layer a packet goes to next. The Ethernet layer classifies frames by
/// ether type and the IP layer classifies datagrams by protocol number; each returns an Enum that
/// the owning layer matches on to pick a handler.
pub mod classifier;

/// Time sources for everything in the stack that expires. `SystemClock` is what a running stack
/// uses; `ManualClock` lets tests move time by hand.
pub mod clock;

/// Configuration of a single interface: its addresses, MTU, and the timeouts and limits of the
/// stack's tables. A `StackConfig` is validated once when the stack is built and then reduced to
/// the `InterfaceContext` the layers read.
pub mod config;

/// The boundary between the stack and the link. A driver moves whole Ethernet frames in and out
/// without blocking. `ChannelDriver` is an in-memory link for tests and for stacks wired to each
/// other inside one process.
pub mod driver;

/// Errors surfaced to callers of the stack.
pub mod error;

/// Runs a stack inside a tokio task and hands back a `StackHandle` to talk to it. This is the way
/// to share one stack between several tasks or threads.
pub mod runner;

/// The protocol layers themselves. `NetStack` is where you start: build one from a config and a
/// driver, open UDP ports on it, and call `poll` whenever you want it to process the link. If you
/// want to see how a frame travels from the wire to a handler, read the layers in order:
/// ethernet, arp, ip, icmp, udp.
pub mod stack;

/// State tables with expiry, used for the ARP cache, the ARP pending queue and the UDP port table.
pub mod state;

/// Utility module
#[cfg(test)]
mod utils;

pub use self::error::{Result, StackError};
pub use self::stack::NetStack;
