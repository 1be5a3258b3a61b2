pub mod config;
pub mod monitor;
pub mod vdesk;
pub mod workspace;

pub use config::{Config, RememberLayout};
pub use monitor::{MonitorRegistry, Output, Outputs, WorkloadOracle};
pub use vdesk::{Repair, VirtualDesk};
pub use workspace::{Layout, WorkspaceId};
