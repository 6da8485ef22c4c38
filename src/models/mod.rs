#![allow(unused_imports)]
// file: src/models/mod.rs

pub mod announcement;
pub mod event;
pub mod external;
pub mod recur;
pub mod sync;
pub mod user;
pub mod view;

// Re-export the public types so callers can `use crate::models::Event`.
pub use announcement::{AnnouncementType, BreakBlock, PlannerAnnouncement};
pub use event::{Event, EventAction, EventId, EventKind, EventTag, EventTags, HomeworkRef};
pub use external::{ExternalCalendar, ExternalEvent};
pub use recur::{RecurFrequency, RecurRule, UNTIL_SENTINEL};
pub use sync::{SyncOutcome, SyncResult, SyncSummary};
pub use user::User;
pub use view::{View, ViewDay};
