//! Control-plane messages.
//!
//! Every [`Message`] carries one [`Command`] and the sending half of a
//! one-shot reply channel. The engine applies commands on the audio thread
//! between buffers and answers each one exactly once; the caller keeps the
//! [`ReplySlot`] and waits on it.
//!
//! Units removed by [`Command::Unmount`] and [`Command::Clear`] come back in
//! the reply, so they are dropped on the caller's thread rather than the
//! audio thread.

use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, bounded};
use patchbay_core::{GraphError, PropValue, Source, Unit, UnitId};

/// A graph mutation.
#[derive(Debug)]
pub enum Command {
    /// Append a unit to the evaluation order.
    Mount(Unit),
    /// Remove a unit by id.
    Unmount(UnitId),
    /// Remove every non-permanent unit.
    Clear,
    /// Rewire one input.
    Patch {
        /// Target unit.
        unit: UnitId,
        /// Input name on the target.
        input: String,
        /// Constant or producer output.
        source: Source,
    },
    /// Set a unit property.
    SetProp {
        /// Target unit.
        unit: UnitId,
        /// Property name.
        prop: String,
        /// New value.
        value: PropValue,
    },
}

impl Command {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Mount(_) => "mount",
            Self::Unmount(_) => "unmount",
            Self::Clear => "clear",
            Self::Patch { .. } => "patch",
            Self::SetProp { .. } => "set-prop",
        }
    }
}

/// Payload of a successful reply.
#[derive(Debug)]
pub enum ReplyData {
    /// The unit removed by an unmount.
    Unit(Box<Unit>),
    /// The units removed by a clear, in evaluation order.
    Units(Vec<Unit>),
}

/// Outcome of one command. `error` set means the graph is unchanged and
/// `data` is empty.
#[derive(Debug, Default)]
pub struct Reply {
    /// Removed units, if the command removed any.
    pub data: Option<ReplyData>,
    /// Why the command was refused.
    pub error: Option<GraphError>,
}

impl Reply {
    /// Successful reply with no payload.
    pub fn ok() -> Self {
        Self::default()
    }

    /// Successful reply carrying `data`.
    pub fn with_data(data: ReplyData) -> Self {
        Self {
            data: Some(data),
            error: None,
        }
    }

    /// Refused command.
    pub fn failed(error: GraphError) -> Self {
        Self {
            data: None,
            error: Some(error),
        }
    }

    /// Whether the command was applied.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Converts into a `Result` over the payload.
    pub fn into_result(self) -> Result<Option<ReplyData>, GraphError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.data),
        }
    }
}

/// A command plus its reply channel.
#[derive(Debug)]
pub struct Message {
    command: Command,
    reply: Sender<Reply>,
}

impl Message {
    /// Wraps `command` and returns the slot its reply will arrive in.
    pub fn new(command: Command) -> (Self, ReplySlot) {
        let (tx, rx) = bounded(1);
        (Self { command, reply: tx }, ReplySlot { rx })
    }

    /// The wrapped command.
    pub fn command(&self) -> &Command {
        &self.command
    }

    /// Splits into the command and a responder that answers it.
    pub fn into_parts(self) -> (Command, Responder) {
        (self.command, Responder { tx: self.reply })
    }
}

/// Sending half of a reply channel.
#[derive(Debug)]
pub struct Responder {
    tx: Sender<Reply>,
}

impl Responder {
    /// Delivers the reply. Never blocks; a caller that dropped its slot is
    /// ignored.
    pub fn send(self, reply: Reply) {
        // Capacity 1 and a single send: this can only fail if the slot is gone.
        let _ = self.tx.try_send(reply);
    }
}

/// Receiving half of a reply channel.
///
/// Every wait returns `None` if the message was dropped unanswered. A
/// message the engine accepted is always answered, so that only happens when
/// the message never reached it (for example, `send_message` refused it) or
/// the engine itself was dropped with the message still queued.
#[derive(Debug)]
pub struct ReplySlot {
    rx: Receiver<Reply>,
}

impl ReplySlot {
    /// Blocks until the reply arrives.
    pub fn wait(&self) -> Option<Reply> {
        self.rx.recv().ok()
    }

    /// Blocks for at most `timeout`.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Reply> {
        match self.rx.recv_timeout(timeout) {
            Ok(reply) => Some(reply),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Returns the reply if it has already arrived.
    pub fn try_recv(&self) -> Option<Reply> {
        match self.rx.try_recv() {
            Ok(reply) => Some(reply),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }
}
