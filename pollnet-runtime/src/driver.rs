use crossbeam::channel::{self, Receiver, Sender, TryRecvError};
use pollnet_packets::PacketBuffer;
use std::io;

/// The link a stack sends and receives whole Ethernet frames on.
pub trait Driver {
    /// Reads at most one frame into `frame`, replacing its window. Returns the
    /// frame length, or 0 when nothing is waiting. Must not block.
    fn recv(&mut self, frame: &mut PacketBuffer) -> io::Result<usize>;

    /// Transmits the window of `frame`.
    fn send(&mut self, frame: &PacketBuffer) -> io::Result<()>;
}

/// An in-memory link backed by a pair of crossbeam channels. The other end
/// is a `ChannelPeer`.
#[derive(Debug)]
pub struct ChannelDriver {
    incoming: Receiver<Vec<u8>>,
    outgoing: Sender<Vec<u8>>,
}

/// The far end of a `ChannelDriver`: inject frames for the stack to receive
/// and collect the frames it sends.
#[derive(Clone, Debug)]
pub struct ChannelPeer {
    incoming: Sender<Vec<u8>>,
    outgoing: Receiver<Vec<u8>>,
}

/// Creates a connected driver and peer.
pub fn channel_link() -> (ChannelDriver, ChannelPeer) {
    let (to_stack, from_peer) = channel::unbounded();
    let (to_peer, from_stack) = channel::unbounded();
    (
        ChannelDriver {
            incoming: from_peer,
            outgoing: to_peer,
        },
        ChannelPeer {
            incoming: to_stack,
            outgoing: from_stack,
        },
    )
}

impl Driver for ChannelDriver {
    fn recv(&mut self, frame: &mut PacketBuffer) -> io::Result<usize> {
        match self.incoming.try_recv() {
            Ok(bytes) => {
                frame
                    .fill(&bytes)
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
                Ok(bytes.len())
            }
            // A peer that went away simply never sends again
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => Ok(0),
        }
    }

    fn send(&mut self, frame: &PacketBuffer) -> io::Result<()> {
        self.outgoing
            .send(frame.as_slice().to_vec())
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "peer hung up"))
    }
}

impl ChannelPeer {
    /// Queues `frame` for the stack's next poll.
    pub fn inject(&self, frame: Vec<u8>) -> io::Result<()> {
        self.incoming
            .send(frame)
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "stack hung up"))
    }

    /// Takes every frame the stack has sent so far.
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.outgoing.try_iter().collect()
    }

    /// The raw receiver, for callers that want to block on the stack.
    pub fn receiver(&self) -> &Receiver<Vec<u8>> {
        &self.outgoing
    }
}
