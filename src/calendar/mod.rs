// Calendar module
// Recurrence expansion, the provider abstraction, view assembly and the ICS
// feed importer's fetch and parse stages.

pub mod announcements;
pub mod common;
pub mod external;
pub mod ics;
pub mod provider;
pub mod recur;
pub mod view;

pub use announcements::AnnouncementProvider;
pub use common::{validate_ics_url_format, FeedFetcher, HttpFeedFetcher};
pub use external::ExternalCalendarProvider;
pub use ics::IcsParser;
pub use provider::{DataKinds, Provider, ProviderData, ProviderFactory, ProviderRegistry};
pub use view::{ViewBuilder, ViewWindow};
