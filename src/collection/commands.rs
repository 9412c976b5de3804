// src/collection/commands.rs
//! Requests from the network collaborator, applied on the control-loop thread

use std::time::Duration;

use crossbeam::channel::{self, Receiver, Sender, TryRecvError, TrySendError};
use tracing::{debug, warn};

use crate::collection::session::{CollectionSession, CollectionStatus, SettingsUpdate};
use crate::config::constants::collection::COMMAND_QUEUE_SIZE;
use crate::error::{ErrorBuilder, FingerTimerResult};

#[derive(Debug)]
pub enum CollectionCommand {
    Start,
    Stop,
    Collect,
    Settings(SettingsUpdate),
    ClearData,
    ExportData(Sender<String>),
    Status(Sender<CollectionStatus>),
}

/// Clonable sender side held by request handlers
#[derive(Debug, Clone)]
pub struct CollectionHandle {
    sender: Sender<CollectionCommand>,
}

/// Receiver side drained by the control loop
#[derive(Debug)]
pub struct CommandReceiver {
    receiver: Receiver<CollectionCommand>,
}

pub fn command_channel() -> (CollectionHandle, CommandReceiver) {
    let (sender, receiver) = channel::bounded(COMMAND_QUEUE_SIZE);
    (CollectionHandle { sender }, CommandReceiver { receiver })
}

impl CollectionHandle {
    fn send(&self, command: CollectionCommand) -> FingerTimerResult<()> {
        self.sender.try_send(command).map_err(|err| match err {
            TrySendError::Full(_) => ErrorBuilder::new("collection", "send").timing("command queue full", None),
            TrySendError::Disconnected(_) => {
                ErrorBuilder::new("collection", "send").configuration("control loop is not running")
            }
        })
    }

    pub fn start(&self) -> FingerTimerResult<()> {
        self.send(CollectionCommand::Start)
    }

    pub fn stop(&self) -> FingerTimerResult<()> {
        self.send(CollectionCommand::Stop)
    }

    pub fn collect(&self) -> FingerTimerResult<()> {
        self.send(CollectionCommand::Collect)
    }

    pub fn update_settings(&self, update: SettingsUpdate) -> FingerTimerResult<()> {
        self.send(CollectionCommand::Settings(update))
    }

    pub fn clear_data(&self) -> FingerTimerResult<()> {
        self.send(CollectionCommand::ClearData)
    }

    /// CSV collected so far; waits up to `timeout` for the loop to answer
    pub fn export_data(&self, timeout: Duration) -> FingerTimerResult<String> {
        let (reply, answer) = channel::bounded(1);
        self.send(CollectionCommand::ExportData(reply))?;
        answer
            .recv_timeout(timeout)
            .map_err(|_| ErrorBuilder::new("collection", "export_data").timing("no reply", Some(timeout.as_millis() as u64)))
    }

    pub fn status(&self, timeout: Duration) -> FingerTimerResult<CollectionStatus> {
        let (reply, answer) = channel::bounded(1);
        self.send(CollectionCommand::Status(reply))?;
        answer
            .recv_timeout(timeout)
            .map_err(|_| ErrorBuilder::new("collection", "status").timing("no reply", Some(timeout.as_millis() as u64)))
    }
}

impl CommandReceiver {
    /// Apply every queued command to `session`; returns how many were applied
    pub fn drain_into(&self, session: &mut CollectionSession) -> usize {
        let mut applied = 0;
        loop {
            match self.receiver.try_recv() {
                Ok(command) => {
                    apply_command(session, command);
                    applied += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        applied
    }
}

fn apply_command(session: &mut CollectionSession, command: CollectionCommand) {
    debug!(?command, "collection command");
    match command {
        CollectionCommand::Start => session.start(),
        CollectionCommand::Stop => session.stop(),
        CollectionCommand::Collect => session.trigger(),
        CollectionCommand::Settings(update) => {
            if let Err(err) = session.apply(update) {
                warn!(error = %err, "rejected collection settings");
            }
        }
        CollectionCommand::ClearData => session.clear_data(),
        // A requester that gave up has dropped its receiver
        CollectionCommand::ExportData(reply) => {
            let _ = reply.send(session.data().to_string());
        }
        CollectionCommand::Status(reply) => {
            let _ = reply.send(session.status());
        }
    }
}
