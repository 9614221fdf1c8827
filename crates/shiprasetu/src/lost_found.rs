//! Lost-and-found board.
//!
//! Reports of missing and found people, newest first, persisted under
//! `{namespace}_lost_found`.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::records::required;
use crate::state::Mutation;
use crate::storage::{LoadSource, PersistentStore};

const LOST_FOUND_KEY: &str = "lost_found";

/// Whether someone is missing or has been found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    /// Someone is missing.
    Lost,
    /// Someone was found and is waiting to be claimed.
    Found,
}

impl std::fmt::Display for ReportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lost => write!(f, "lost"),
            Self::Found => write!(f, "found"),
        }
    }
}

/// Whether a report still needs attention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    /// Open.
    Active,
    /// Reunited.
    Resolved,
}

impl std::fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Resolved => write!(f, "resolved"),
        }
    }
}

/// Which reports a search returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportFilter {
    /// Every report.
    #[default]
    All,
    /// Only [`ReportKind::Lost`].
    Lost,
    /// Only [`ReportKind::Found`].
    Found,
}

impl ReportFilter {
    fn matches(self, kind: ReportKind) -> bool {
        match self {
            Self::All => true,
            Self::Lost => kind == ReportKind::Lost,
            Self::Found => kind == ReportKind::Found,
        }
    }
}

/// One posted report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// Unique on the board.
    pub id: i64,
    /// Lost or found.
    #[serde(rename = "type")]
    pub kind: ReportKind,
    /// Name of the person, or a description like "Unknown Child".
    pub name: String,
    /// Age as entered.
    pub age: String,
    /// Gender as entered.
    pub gender: String,
    /// Where they were last seen or found.
    pub location: String,
    /// Clothing and other identifying details.
    pub description: String,
    /// Human-readable age of the report.
    pub timestamp: String,
    /// Open or resolved.
    pub status: ReportStatus,
}

/// The fields a visitor fills in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReport {
    /// Lost or found.
    pub kind: ReportKind,
    /// Required.
    pub name: String,
    /// Optional.
    pub age: String,
    /// Optional.
    pub gender: String,
    /// Required.
    pub location: String,
    /// Required.
    pub description: String,
}

/// Reports on the board before anyone has posted.
#[must_use]
pub fn default_reports() -> Vec<Report> {
    let report = |id,
                  kind,
                  name: &str,
                  age: &str,
                  gender: &str,
                  location: &str,
                  description: &str,
                  timestamp: &str,
                  status| Report {
        id,
        kind,
        name: name.to_string(),
        age: age.to_string(),
        gender: gender.to_string(),
        location: location.to_string(),
        description: description.to_string(),
        timestamp: timestamp.to_string(),
        status,
    };
    vec![
        report(
            1,
            ReportKind::Lost,
            "Ramesh Kumar",
            "65",
            "male",
            "Near Ram Ghat",
            "Elderly man wearing white kurta, has walking stick",
            "2 hours ago",
            ReportStatus::Active,
        ),
        report(
            2,
            ReportKind::Found,
            "Unknown Child",
            "8",
            "female",
            "Triveni Ghat",
            "Young girl in red dress, speaks Hindi",
            "1 hour ago",
            ReportStatus::Active,
        ),
        report(
            3,
            ReportKind::Lost,
            "Sunita Devi",
            "45",
            "female",
            "Mangalnath Zone",
            "Woman in blue saree, carrying yellow bag",
            "30 minutes ago",
            ReportStatus::Resolved,
        ),
    ]
}

/// The lost-and-found board.
#[derive(Debug, Clone)]
pub struct LostFoundBoard {
    store: PersistentStore,
}

impl LostFoundBoard {
    /// Open the board stored in `store`.
    #[must_use]
    pub fn new(store: PersistentStore) -> Self {
        Self { store }
    }

    /// All reports, newest first.
    #[must_use]
    pub fn reports(&self) -> Vec<Report> {
        let (reports, source) = self.store.load_with_source(LOST_FOUND_KEY, default_reports());
        if matches!(source, LoadSource::Missing | LoadSource::Corrupt) {
            if let Err(e) = self.store.save(LOST_FOUND_KEY, &reports) {
                warn!(error = %e, "Failed to write back lost-and-found reports");
            }
        }
        reports
    }

    /// Post a new report at the top of the board.
    ///
    /// # Errors
    ///
    /// Returns a validation error if name, location or description is blank,
    /// or a storage error if the board cannot be saved.
    pub fn submit(&self, new_report: NewReport) -> Result<Report> {
        let mut report = Report {
            id: Utc::now().timestamp_millis(),
            kind: new_report.kind,
            name: required("name", &new_report.name)?,
            age: new_report.age.trim().to_string(),
            gender: new_report.gender.trim().to_string(),
            location: required("location", &new_report.location)?,
            description: required("description", &new_report.description)?,
            timestamp: "Just now".to_string(),
            status: ReportStatus::Active,
        };

        let mut reports = self.reports();
        if let Some(max) = reports.iter().map(|r| r.id).max() {
            report.id = report.id.max(max.saturating_add(1));
        }
        reports.insert(0, report.clone());
        self.store.save(LOST_FOUND_KEY, &reports)?;
        info!(id = report.id, kind = %report.kind, "Lost-and-found report posted");
        Ok(report)
    }

    /// Reports whose name, description or location contains `term`,
    /// ignoring case, limited to `filter`.
    #[must_use]
    pub fn search(&self, term: &str, filter: ReportFilter) -> Vec<Report> {
        let term = term.to_lowercase();
        self.reports()
            .into_iter()
            .filter(|r| filter.matches(r.kind))
            .filter(|r| {
                r.name.to_lowercase().contains(&term)
                    || r.description.to_lowercase().contains(&term)
                    || r.location.to_lowercase().contains(&term)
            })
            .collect()
    }

    /// Mark a report resolved.
    ///
    /// # Errors
    ///
    /// Returns an error if the board cannot be saved.
    pub fn resolve(&self, id: i64) -> Result<Mutation> {
        let mut reports = self.reports();
        let Some(report) = reports.iter_mut().find(|r| r.id == id) else {
            debug!(id, "No report to resolve");
            return Ok(Mutation::NotFound);
        };
        report.status = ReportStatus::Resolved;
        self.store.save(LOST_FOUND_KEY, &reports)?;
        Ok(Mutation::Applied)
    }
}
