pub mod ids;
pub mod names;
pub mod time;

pub use ids::{ItemId, LayerId, OrgId};
pub use names::{geodatabase_file_name, sanitize_name};
pub use time::{Clock, SystemClock, Timestamp};
