pub mod clock;
pub mod fs_atomic;
pub mod ids;
pub mod logging;

pub use ids::{MessageId, ReportId, UserId};
pub use logging::EventLog;
