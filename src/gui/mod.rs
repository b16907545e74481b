//! GUI module for Coleta
//!
//! This module provides the graphical user interface built with egui/eframe.
//!
//! ## Module Structure
//!
//! - `app` - Main CollectionApp struct, frameless window shell and launch
//! - `async_job` - Generic polling of background file jobs
//! - `dialogs` - Modal warning/error dialogs
//! - `helpers` - Asset loading (window icon, themed icons) and text formatting
//! - `navigation` - Home tiles, panel combo and the current panel
//! - `notifications` - Notification system and operation state polling
//! - `theme` - Light/dark palettes and the ThemeManager
//! - `views` - Panel rendering (home, collection, organize, agitel, merge, replace)
//! - `widgets` - Reusable UI widgets (LogBuffer)
//!
//! ## Usage
//!
//! ```no_run
//! use coleta::config::AutomationConfig;
//! use coleta::gui;
//! use coleta::settings::Settings;
//!
//! gui::launch(AutomationConfig::default(), Settings::load()).expect("Failed to launch GUI");
//! ```

mod app;
pub mod async_job;
pub mod dialogs;
pub mod helpers;
pub mod navigation;
pub mod notifications;
pub mod theme;
pub mod views;
pub mod widgets;

// Re-export main public API
pub use app::{launch, CollectionApp, WINDOW_TITLE};

pub use async_job::{spawn_job, AsyncJob};
pub use dialogs::{DialogKind, DialogQueue};
pub use navigation::{Navigator, Panel};
pub use notifications::{NotificationEntry, OperationState};
pub use theme::{configure_style, AppTheme, ThemeManager, ThemeMode};
pub use widgets::LogBuffer;
