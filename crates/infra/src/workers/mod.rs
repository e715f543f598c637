//! Background workers.

pub mod overdue_sweeper;

pub use overdue_sweeper::{OverdueSweeper, SweeperConfig, WorkerHandle};
