//! Notification system for the GUI
//!
//! Handles notification entries and operation state polling.

use super::async_job::AsyncJob;
use std::collections::VecDeque;

/// History kept in the notifications window
pub const MAX_NOTIFICATIONS: usize = 50;

/// A notification entry with message and timestamp
#[derive(Clone, Debug)]
pub struct NotificationEntry {
    pub message: String,
    pub timestamp: chrono::DateTime<chrono::Local>,
}

impl NotificationEntry {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timestamp: chrono::Local::now(),
        }
    }

    pub fn time_ago(&self) -> String {
        let now = chrono::Local::now();
        let duration = now.signed_duration_since(self.timestamp);
        if duration.num_seconds() < 60 {
            "agora".to_string()
        } else if duration.num_minutes() < 60 {
            format!("há {} min", duration.num_minutes())
        } else if duration.num_hours() < 24 {
            format!("há {} h", duration.num_hours())
        } else {
            self.timestamp.format("%d/%m %H:%M").to_string()
        }
    }
}

/// Push a notification, dropping the oldest past [`MAX_NOTIFICATIONS`]
pub fn notify(notifications: &mut VecDeque<NotificationEntry>, message: impl Into<String>) {
    notifications.push_back(NotificationEntry::new(message));
    while notifications.len() > MAX_NOTIFICATIONS {
        notifications.pop_front();
    }
}

/// Panel state with one background job and a status line
pub trait OperationState {
    type Output;

    fn job_mut(&mut self) -> &mut Option<AsyncJob<Self::Output>>;
    fn status_mut(&mut self) -> &mut Option<String>;

    /// Operation name for notifications and the operation log
    fn operation(&self) -> &'static str;

    /// Status line for a successful run
    fn describe(&self, output: &Self::Output) -> String;

    /// Called with the result before it is dropped
    fn finished(&mut self, _output: &Self::Output) {}
}

/// Poll an operation state and update notifications on completion.
/// Returns the log line describing the outcome once the job ends.
pub fn poll_operation_state<T: OperationState>(
    state: &mut T,
    notifications: &mut VecDeque<NotificationEntry>,
) -> Option<String> {
    let res = state.job_mut().as_mut()?.poll()?;
    *state.job_mut() = None;

    let line = match res {
        Ok(output) => {
            let summary = state.describe(&output);
            state.finished(&output);
            *state.status_mut() = Some(format!("[OK] {}", summary));
            notify(notifications, format!("{}: {}", state.operation(), summary));
            summary
        }
        Err(e) => {
            let error_msg = format!("{:#}", e);
            tracing::warn!("{} failed: {}", state.operation(), error_msg);
            *state.status_mut() = Some(format!("[!!] Falha: {}", error_msg));
            notify(notifications, format!("{} falhou: {}", state.operation(), error_msg));
            format!("Falha: {}", error_msg)
        }
    };
    Some(line)
}
