//! novacal-calendar: Google Calendar integration for NovaCal
//!
//! REST access to Google Calendar with authorized-user OAuth tokens, the
//! lookup and mutation tools handed to the agent, and the records behind
//! the visual calendar.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use novacal_calendar::{CalendarAgentFactory, CalendarToolkit};
//!
//! let toolkit = Arc::new(CalendarToolkit::new(&config.calendar)?);
//! let agenda = toolkit.lookup().range_summary("2025-08-17", "2025-08-17", None).await;
//! let factory = CalendarAgentFactory::new(config, toolkit);
//! ```

pub mod bootstrap;
pub mod error;
pub mod format;
pub mod google;
pub mod lookup;
pub mod models;
pub mod oauth;
pub mod toolkit;
pub mod tools;
pub mod view;

pub use bootstrap::{bootstrap_credentials, BootstrapOutcome, BootstrapReport, SecretStore};
pub use error::{CalendarError, Result};
pub use google::{DeleteOutcome, GoogleCalendar, ListQuery};
pub use lookup::{EventLookup, FindEventIdsTool, ListSchedulesTool};
pub use models::{CalendarEvent, EventDateTime, GoogleEvent, ViewEvent};
pub use oauth::{AuthorizedUser, TokenStore};
pub use toolkit::{CalendarAgentFactory, CalendarToolkit};
pub use view::{CalendarView, EMPTY_VIEW_MESSAGE};
