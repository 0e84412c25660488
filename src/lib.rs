pub mod cli;
pub mod core;
pub mod logging;

pub use crate::core::coordinator::{Coordinator, ProjectStart, TaskRun};
pub use crate::core::error::{CrewError, CrewResult};
