//! `shiprasetu` - shared crowd-management state for the Simhastha pilgrim portal
//!
//! This library keeps the portal's four shared collections (alerts, route
//! recommendations, ghat crowd statuses and route paths) in memory, mirrors
//! every change to a `SQLite` key-value store, and polls that store so several
//! processes sharing one database converge on the same data.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod booking;
pub mod cli;
pub mod config;
pub mod error;
pub mod live;
pub mod logging;
pub mod lost_found;
pub mod records;
pub mod state;
pub mod storage;
pub mod sync;

pub use booking::{Booking, BookingDesk, BookingRequest};
pub use config::Config;
pub use error::{Error, Result};
pub use live::{Availability, LiveStatus};
pub use logging::init_logging;
pub use lost_found::{LostFoundBoard, NewReport, Report, ReportFilter, ReportKind};
pub use records::{
    Alert, CrowdLevel, FieldUpdate, GhatStatus, Priority, Recommendation, RecommendationKind,
    RoutePath,
};
pub use state::{Mutation, SharedState, Snapshot};
pub use storage::{CollectionKey, KeyValueStore, PersistentStore, SqliteStore, StoreEntry};
pub use sync::{SyncEvent, SyncHandle, SyncStats, Synchronizer};
