pub mod posting;
pub mod recurrence;
pub mod scanner;
pub mod service;

pub use recurrence::Frequency;
pub use scanner::DueScheduleScanner;
pub use service::{ScheduleService, SweepFailure, SweepReport};
