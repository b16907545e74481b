//! Worker → UI log delivery.
//!
//! A single unbounded FIFO channel carries messages for both log surfaces, so
//! messages for a surface arrive in the order they were sent.

use chrono::{DateTime, Local};
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};

/// The two log areas of the collection panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogSurface {
    /// Technical progress and errors
    Technical,
    /// One line per collected invoice
    Invoices,
}

impl LogSurface {
    pub fn placeholder(&self) -> &'static str {
        match self {
            LogSurface::Technical => "Log técnico",
            LogSurface::Invoices => "Log faturas coletadas",
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogEvent {
    pub surface: LogSurface,
    pub message: String,
    pub timestamp: DateTime<Local>,
}

impl LogEvent {
    pub fn new(surface: LogSurface, message: impl Into<String>) -> Self {
        Self {
            surface,
            message: message.into(),
            timestamp: Local::now(),
        }
    }
}

/// Sending half handed to workers
#[derive(Debug, Clone)]
pub struct LogSink {
    sender: UnboundedSender<LogEvent>,
}

impl LogSink {
    /// Never blocks; a closed UI just drops the message
    pub fn send(&self, surface: LogSurface, message: impl Into<String>) {
        let message = message.into();
        match surface {
            LogSurface::Technical => tracing::info!(target: "coleta::automation", "{}", message),
            LogSurface::Invoices => tracing::info!(target: "coleta::invoices", "{}", message),
        }
        let _ = self.sender.send(LogEvent::new(surface, message));
    }

    pub fn technical(&self, message: impl Into<String>) {
        self.send(LogSurface::Technical, message);
    }

    pub fn invoice(&self, message: impl Into<String>) {
        self.send(LogSurface::Invoices, message);
    }
}

/// Receiving half polled by the UI every frame
#[derive(Debug)]
pub struct LogReceiver {
    receiver: UnboundedReceiver<LogEvent>,
}

impl LogReceiver {
    /// Everything queued so far, oldest first
    pub fn drain(&mut self) -> Vec<LogEvent> {
        let mut events = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        events
    }
}

pub fn log_channel() -> (LogSink, LogReceiver) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (LogSink { sender }, LogReceiver { receiver })
}
