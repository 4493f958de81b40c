//! CalDAV client for startdeck.
//!
//! Covers the three operations the calendar widget needs:
//!
//! - [`discover`]: locate a user's calendar collections via `PROPFIND`
//! - [`report`]: fetch ICS documents for a time window via `REPORT`
//! - plain GET of a published ICS URL via [`CaldavClient::get`]
//!
//! Only Basic authentication is supported; an empty username means
//! anonymous access.

pub mod client;
pub mod config;
pub mod discovery;
pub mod error;
pub mod report;
pub mod xml;

pub use client::{CaldavClient, DavResponse};
pub use config::CaldavConfig;
pub use discovery::{DiscoveredCalendar, Discovery, discover};
pub use error::{CaldavError, CaldavResult, UpstreamDiagnostics};
pub use report::report;
pub use xml::{XmlError, extract_all, extract_first};
