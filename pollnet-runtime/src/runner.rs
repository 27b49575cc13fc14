//! Runs a stack as a single tokio task.
//!
//! The task owns the `NetStack` outright. It drains the driver on every tick of an interval and,
//! between ticks, serves commands sent through a `StackHandle`. Nothing outside the task touches
//! stack state, so no locking is needed. Datagrams for ports opened through the handle arrive on
//! crossbeam channels; command replies come back over oneshot channels.

use crate::clock::Clock;
use crate::driver::Driver;
use crate::error::{Result, StackError};
use crate::stack::{ArpEntry, DatagramHandler, NetStack};
use crossbeam::channel;
use futures::channel::oneshot;
use std::net::Ipv4Addr;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{info, trace};

/// Frames processed per tick before the task yields to pending commands.
pub const POLL_BURST: usize = 64;

/// A datagram received on a port opened through a `StackHandle`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Datagram {
    pub payload: Vec<u8>,
    pub src_ip: Ipv4Addr,
    pub src_port: u16,
}

struct ChannelHandler {
    port: u16,
    datagrams: channel::Sender<Datagram>,
}

impl DatagramHandler for ChannelHandler {
    fn on_datagram(&mut self, payload: &[u8], src_ip: Ipv4Addr, src_port: u16) {
        let datagram = Datagram {
            payload: payload.to_vec(),
            src_ip,
            src_port,
        };
        if self.datagrams.send(datagram).is_err() {
            trace!(port = self.port, "receiver dropped, discarding datagram");
        }
    }
}

enum Command {
    Open {
        port: u16,
        reply: oneshot::Sender<Result<channel::Receiver<Datagram>>>,
    },
    Close {
        port: u16,
        reply: oneshot::Sender<bool>,
    },
    Send {
        payload: Vec<u8>,
        src_port: u16,
        dst_ip: Ipv4Addr,
        dst_port: u16,
        reply: oneshot::Sender<Result<()>>,
    },
    ArpEntries {
        reply: oneshot::Sender<Vec<ArpEntry>>,
    },
    Shutdown,
}

/// Talks to a stack running under `spawn`. Dropping the handle also stops the task.
pub struct StackHandle<D: Driver, C: Clock> {
    commands: mpsc::UnboundedSender<Command>,
    task: JoinHandle<NetStack<D, C>>,
}

/// Moves `stack` into a new task on the current tokio runtime. The driver is
/// polled every `poll_interval`.
pub fn spawn<D, C>(stack: NetStack<D, C>, poll_interval: Duration) -> StackHandle<D, C>
where
    D: Driver + Send + 'static,
    C: Clock + Send + 'static,
{
    let (commands, receiver) = mpsc::unbounded_channel();
    let task = tokio::spawn(run(stack, receiver, poll_interval));
    StackHandle { commands, task }
}

async fn run<D: Driver, C: Clock>(
    mut stack: NetStack<D, C>,
    mut commands: mpsc::UnboundedReceiver<Command>,
    poll_interval: Duration,
) -> NetStack<D, C> {
    info!(ip = %stack.interface().ip, ?poll_interval, "stack runner started");
    let mut ticker = time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(Command::Shutdown) | None => break,
                Some(command) => serve(&mut stack, command),
            },
            _ = ticker.tick() => {
                stack.poll_burst(POLL_BURST);
            }
        }
    }

    stack.log_arp_table();
    info!(ip = %stack.interface().ip, "stack runner stopped");
    stack
}

// A failed reply only means the caller stopped waiting.
fn serve<D: Driver, C: Clock>(stack: &mut NetStack<D, C>, command: Command) {
    match command {
        Command::Open { port, reply } => {
            let (sender, receiver) = channel::unbounded();
            let handler = ChannelHandler {
                port,
                datagrams: sender,
            };
            let _ = reply.send(stack.udp_open(port, handler).map(|_| receiver));
        }
        Command::Close { port, reply } => {
            let _ = reply.send(stack.udp_close(port));
        }
        Command::Send {
            payload,
            src_port,
            dst_ip,
            dst_port,
            reply,
        } => {
            let _ = reply.send(stack.udp_send(&payload, src_port, dst_ip, dst_port));
        }
        Command::ArpEntries { reply } => {
            let _ = reply.send(stack.arp_entries());
        }
        Command::Shutdown => {}
    }
}

impl<D: Driver, C: Clock> StackHandle<D, C> {
    /// Opens `port` and returns the channel its datagrams arrive on.
    pub async fn open(&self, port: u16) -> Result<channel::Receiver<Datagram>> {
        let (reply, response) = oneshot::channel();
        self.request(Command::Open { port, reply })?;
        response.await.map_err(|_| StackError::RunnerClosed)?
    }

    pub async fn close(&self, port: u16) -> Result<bool> {
        let (reply, response) = oneshot::channel();
        self.request(Command::Close { port, reply })?;
        response.await.map_err(|_| StackError::RunnerClosed)
    }

    pub async fn send(
        &self,
        payload: Vec<u8>,
        src_port: u16,
        dst_ip: Ipv4Addr,
        dst_port: u16,
    ) -> Result<()> {
        let (reply, response) = oneshot::channel();
        self.request(Command::Send {
            payload,
            src_port,
            dst_ip,
            dst_port,
            reply,
        })?;
        response.await.map_err(|_| StackError::RunnerClosed)?
    }

    pub async fn arp_entries(&self) -> Result<Vec<ArpEntry>> {
        let (reply, response) = oneshot::channel();
        self.request(Command::ArpEntries { reply })?;
        response.await.map_err(|_| StackError::RunnerClosed)
    }

    /// Stops the task and hands the stack back.
    pub async fn shutdown(self) -> Result<NetStack<D, C>> {
        // The task may already be gone; joining tells us either way
        let _ = self.commands.send(Command::Shutdown);
        self.task.await.map_err(|_| StackError::RunnerClosed)
    }

    fn request(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| StackError::RunnerClosed)
    }
}
