pub mod scheduler;

pub use scheduler::{Scheduler, SchedulerHandle, OUTPUT_DISPLAY_LEN};
