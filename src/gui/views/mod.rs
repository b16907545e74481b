//! View modules for the GUI
//!
//! Each submodule renders one panel of the stacked main area and owns that
//! panel's state type.
//!
//! ## Module Structure
//!
//! - `home` - Home tiles
//! - `collection` - Invoice collection (pickers, carrier selector, logs)
//! - `organize` - Folder organization
//! - `agitel` - Agitel report processing
//! - `merge` - Spreadsheet merging
//! - `replace` - Simple find/replace
//!
//! ## Implementation Notes
//!
//! View functions are methods on `CollectionApp` taking `&mut egui::Ui`,
//! called from `App::update` in `app.rs` for the current panel.

pub mod agitel;
pub mod collection;
pub mod home;
pub mod merge;
pub mod organize;
pub mod replace;

pub use agitel::AgitelState;
pub use collection::CollectionState;
pub use merge::MergeState;
pub use organize::OrganizeState;
pub use replace::ReplaceState;
