//! The filing panel: item tracking and reconciliation of server results into UI state.

mod controller;
mod traits;
mod types;

pub use controller::FilingPanel;
pub use traits::PanelHost;
pub use types::PanelState;
