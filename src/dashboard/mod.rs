//! Dashboard state, its actor, and the refresh loop

pub mod actor;
pub mod refresh;
pub mod state;

pub use actor::{DashboardError, DashboardHandle};
pub use refresh::{refresh, start_refresh_task};
pub use state::{Dashboard, ServiceSummary, ServicesView};
