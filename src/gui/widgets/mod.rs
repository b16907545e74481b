//! Widget components for the GUI
//!
//! ## Available Widgets
//!
//! - `LogBuffer` - Capped, auto-scrolling log area

mod log_panel;

pub use log_panel::{LogBuffer, MAX_LOG_LINES};
