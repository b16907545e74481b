//! Invoice collection automation.
//!
//! ## Module Structure
//!
//! - `log_bridge` - Channel carrying worker log lines to the two UI log surfaces
//! - `pool` - Fixed-size worker pool the UI submits tasks to
//! - `task` - One collection run: automator + row snapshot + log sink
//! - `registry` - Carrier id → automator constructor
//! - `dispatch` - Start-button preconditions and task submission
//! - `blume` - Blume portal automator (browser behind the `PortalSession` trait)
//! - `webdriver` - `thirtyfour` implementation of `PortalSession`

pub mod blume;
pub mod dispatch;
pub mod log_bridge;
pub mod pool;
pub mod registry;
pub mod task;
pub mod webdriver;

use crate::config::AutomationConfig;
use crate::invoices::InvoiceRow;
use anyhow::Result;
use async_trait::async_trait;
use std::path::PathBuf;

pub use dispatch::{dispatch, DispatchError, DispatchRequest, Dispatched};
pub use log_bridge::{log_channel, LogEvent, LogReceiver, LogSink, LogSurface};
pub use pool::{TaskSubmitter, WorkerPool};
pub use registry::AutomatorRegistry;
pub use task::AutomationTask;

/// Counts reported at the end of a collection run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectionSummary {
    pub collected: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl CollectionSummary {
    pub fn total(&self) -> usize {
        self.collected + self.failed + self.skipped
    }
}

/// Everything an automator needs at construction time
#[derive(Debug, Clone)]
pub struct AutomatorContext {
    pub save_directory: PathBuf,
    pub config: AutomationConfig,
}

/// Carrier-specific invoice collector
#[async_trait]
pub trait InvoiceAutomator: Send + Sync {
    /// Normalized carrier id this automator serves
    fn carrier(&self) -> &str;

    /// Collect every row, reporting progress through `log`.
    /// Per-row failures are logged and counted; `Err` means the run could not proceed at all.
    async fn collect(&self, rows: &[InvoiceRow], log: &LogSink) -> Result<CollectionSummary>;

    /// Release browser resources still held (called when the window closes)
    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}
