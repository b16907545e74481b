//! Coleta - desktop tool for the invoice operations team.
//!
//! The GUI lives in [`gui`]; everything else is plain library code that the
//! panels call into and that can be exercised without a window.

pub mod agitel;
pub mod automation;
pub mod config;
pub mod gui;
pub mod invoices;
pub mod merge;
pub mod operation_log;
pub mod organize;
pub mod replace;
pub mod settings;
pub mod sheet;
pub mod utils;
