//! Record types for the four shared collections.
//!
//! Every record serializes with camelCase field names and lowercase enum
//! values, which is the layout the portal pages read from storage.

use chrono::{Duration, Local, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Display format for alert timestamps, e.g. `10/19/2026, 3:04:05 PM`.
const DISPLAY_TIME_FORMAT: &str = "%-m/%-d/%Y, %-I:%M:%S %p";

/// Urgency of an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Needs immediate attention.
    High,
    /// Worth knowing soon.
    Medium,
    /// Informational.
    Low,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::High => write!(f, "high"),
            Self::Medium => write!(f, "medium"),
            Self::Low => write!(f, "low"),
        }
    }
}

/// How strongly a route recommendation is worded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationKind {
    /// The preferred path.
    Recommended,
    /// A usable fallback.
    Alternative,
    /// A path to stay away from.
    Avoid,
}

impl std::fmt::Display for RecommendationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Recommended => write!(f, "recommended"),
            Self::Alternative => write!(f, "alternative"),
            Self::Avoid => write!(f, "avoid"),
        }
    }
}

/// Crowd level shared by ghats and route paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrowdLevel {
    /// Little or no crowding.
    Low,
    /// Noticeable crowding.
    Moderate,
    /// Heavy crowding.
    High,
}

impl CrowdLevel {
    /// Fraction of `maxCapacity` a ghat is assumed to hold at this level.
    #[must_use]
    pub fn occupancy_factor(self) -> f64 {
        match self {
            Self::Low => 0.3,
            Self::Moderate => 0.7,
            Self::High => 0.95,
        }
    }

    /// Wait time shown for a ghat at this level.
    #[must_use]
    pub fn wait_time(self) -> &'static str {
        match self {
            Self::Low => "No wait",
            Self::Moderate => "10-20 min",
            Self::High => "30-45 min",
        }
    }

    /// Occupancy derived from this level for a ghat holding at most `max_capacity`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn capacity_for(self, max_capacity: u32) -> u32 {
        let max = f64::from(max_capacity);
        // Result lies in 0..=max_capacity, so the cast cannot truncate.
        (max * self.occupancy_factor()).min(max).round() as u32
    }
}

impl std::fmt::Display for CrowdLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Moderate => write!(f, "moderate"),
            Self::High => write!(f, "high"),
        }
    }
}

/// Tri-state input for an optional text field.
///
/// Separates "leave the field alone" from "clear it".
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FieldUpdate<T> {
    /// Keep the current value.
    #[default]
    Keep,
    /// Replace the value.
    Set(T),
    /// Remove the value.
    Clear,
}

impl<T> FieldUpdate<T> {
    /// Apply this update to an optional field.
    pub fn apply(self, slot: &mut Option<T>) {
        match self {
            Self::Keep => {}
            Self::Set(value) => *slot = Some(value),
            Self::Clear => *slot = None,
        }
    }
}

impl<T> From<Option<T>> for FieldUpdate<T> {
    /// `Some` sets the field, `None` clears it.
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Clear, Self::Set)
    }
}

/// A broadcast notice shown on the alerts feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    /// Unique within the alerts collection.
    pub id: i64,
    /// Notice text.
    pub message: String,
    /// Urgency.
    pub priority: Priority,
    /// Human-readable creation time.
    pub timestamp: String,
}

impl Alert {
    /// Build a new alert stamped with the current time.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the trimmed message is empty.
    pub fn new(message: &str, priority: Priority) -> Result<Self> {
        let message = required("message", message)?;
        Ok(Self {
            id: Utc::now().timestamp_millis(),
            message,
            priority,
            timestamp: display_time(Local::now()),
        })
    }
}

/// Route advice shown next to the crowd map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    /// Unique within the recommendations collection.
    pub id: i64,
    /// Advice text.
    pub message: String,
    /// Advice strength.
    #[serde(rename = "type")]
    pub kind: RecommendationKind,
    /// Which route or area the advice is about.
    pub route_details: String,
}

impl Recommendation {
    /// Build a new recommendation with a fresh id.
    ///
    /// # Errors
    ///
    /// Returns a validation error if either text field is empty after trimming.
    pub fn new(message: &str, kind: RecommendationKind, route_details: &str) -> Result<Self> {
        Ok(Self {
            id: Utc::now().timestamp_millis(),
            message: required("message", message)?,
            kind,
            route_details: required("route details", route_details)?,
        })
    }
}

/// Live crowd status of a single ghat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GhatStatus {
    /// Unique within the ghat collection.
    pub id: i64,
    /// Ghat name.
    pub name: String,
    /// Current crowd level.
    pub status: CrowdLevel,
    /// Operator note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
    /// Estimated number of people present.
    pub current_capacity: u32,
    /// Maximum number of people the ghat holds.
    pub max_capacity: u32,
    /// Expected wait.
    pub wait_time: String,
}

impl GhatStatus {
    /// Set the crowd level and derive occupancy and wait time from it.
    pub fn apply_status(&mut self, status: CrowdLevel) {
        self.status = status;
        self.current_capacity = status.capacity_for(self.max_capacity);
        self.wait_time = status.wait_time().to_string();
    }

    /// Occupancy as a whole percentage of `max_capacity`.
    #[must_use]
    pub fn occupancy_percent(&self) -> u32 {
        if self.max_capacity == 0 {
            return 0;
        }
        let pct = u64::from(self.current_capacity) * 100 / u64::from(self.max_capacity);
        u32::try_from(pct).unwrap_or(u32::MAX)
    }

    /// Pull `current_capacity` back under `max_capacity`.
    ///
    /// Returns `true` if the record had to be corrected.
    pub fn clamp_capacity(&mut self) -> bool {
        if self.current_capacity > self.max_capacity {
            self.current_capacity = self.max_capacity;
            true
        } else {
            false
        }
    }
}

/// A directed link between two zones on the crowd map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutePath {
    /// Unique within the route collection.
    pub id: i64,
    /// Starting zone.
    pub from: String,
    /// Destination zone.
    pub to: String,
    /// Current crowd level along the path.
    pub crowd_level: CrowdLevel,
    /// Operator note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Whether the path is open.
    pub is_active: bool,
}

/// Format a local time the way the portal shows it.
#[must_use]
pub fn display_time(time: chrono::DateTime<Local>) -> String {
    time.format(DISPLAY_TIME_FORMAT).to_string()
}

/// Trim `value` and reject it if nothing is left.
pub(crate) fn required(field: &'static str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(Error::validation(field, "must not be empty"))
    } else {
        Ok(trimmed.to_string())
    }
}

/// Alerts present before anyone has posted one.
#[must_use]
pub fn default_alerts() -> Vec<Alert> {
    let now = Local::now();
    vec![
        Alert {
            id: 1,
            message: "Triveni Ghat overcrowded – please use alternative routes".to_string(),
            priority: Priority::High,
            timestamp: display_time(now),
        },
        Alert {
            id: 2,
            message: "Route from Mangalnath Zone blocked due to maintenance".to_string(),
            priority: Priority::Medium,
            timestamp: display_time(now - Duration::minutes(15)),
        },
        Alert {
            id: 3,
            message: "Emergency exit at Kal Bhairav Mandir is now open".to_string(),
            priority: Priority::Low,
            timestamp: display_time(now - Duration::hours(1)),
        },
    ]
}

/// Built-in route recommendations.
#[must_use]
pub fn default_recommendations() -> Vec<Recommendation> {
    let rec = |id, message: &str, kind, route_details: &str| Recommendation {
        id,
        message: message.to_string(),
        kind,
        route_details: route_details.to_string(),
    };
    vec![
        rec(
            1,
            "Recommended Path: Route A via Nanakheda Gate",
            RecommendationKind::Recommended,
            "via Nanakheda Gate",
        ),
        rec(
            2,
            "Alternative: Take Route B through Dada Nagar Ghat",
            RecommendationKind::Alternative,
            "through Dada Nagar Ghat",
        ),
        rec(
            3,
            "Avoid Triveni Ghat – overcrowded",
            RecommendationKind::Avoid,
            "Triveni Ghat area",
        ),
    ]
}

/// Built-in ghat statuses.
///
/// The seed figures are sample data and do not follow the level-to-capacity
/// table; they are only recomputed once an operator updates a ghat.
#[must_use]
#[rustfmt::skip]
pub fn default_ghat_statuses() -> Vec<GhatStatus> {
    let ghat = |id, name: &str, status, remarks: Option<&str>, current, max, wait: &str| {
        GhatStatus {
            id,
            name: name.to_string(),
            status,
            remarks: remarks.map(str::to_string),
            current_capacity: current,
            max_capacity: max,
            wait_time: wait.to_string(),
        }
    };
    vec![
        ghat(1, "Ram Ghat", CrowdLevel::Moderate, Some("Steady flow of pilgrims"), 45, 100, "No wait"),
        ghat(2, "Triveni Ghat", CrowdLevel::High, Some("Very crowded, long wait times"), 78, 100, "15 min"),
        ghat(3, "Mangalnath Zone", CrowdLevel::Low, Some("Peaceful atmosphere"), 95, 100, "45 min"),
        ghat(4, "Kal Bhairav Mandir", CrowdLevel::Moderate, None, 32, 80, "No wait"),
        ghat(5, "Dada Nagar Ghat", CrowdLevel::Low, None, 67, 90, "20 min"),
        ghat(6, "Sadawal Transit Zone", CrowdLevel::Moderate, Some("Transit area, moderate flow"), 25, 70, "No wait"),
    ]
}

/// Built-in route paths.
#[must_use]
#[rustfmt::skip]
pub fn default_route_paths() -> Vec<RoutePath> {
    let path = |id, from: &str, to: &str, crowd_level, notes: Option<&str>, is_active| RoutePath {
        id,
        from: from.to_string(),
        to: to.to_string(),
        crowd_level,
        notes: notes.map(str::to_string),
        is_active,
    };
    vec![
        path(1, "Hari Phatak Gate", "Sadawal Transit Zone", CrowdLevel::Low, Some("Clear path, recommended"), true),
        path(2, "Shipra Pul Gate", "Ram Ghat", CrowdLevel::Moderate, Some("Some congestion expected"), true),
        path(3, "Triveni Ghat", "Ram Ghat", CrowdLevel::High, Some("Heavy traffic, avoid if possible"), false),
        path(4, "Dada Nagar Ghat", "Triveni Ghat", CrowdLevel::Low, None, true),
        path(5, "Nanakheda Gate", "Mangalnath Zone", CrowdLevel::Low, Some("Scenic route via temple"), true),
        path(6, "Kal Bhairav Mandir", "Ram Ghat", CrowdLevel::Moderate, None, true),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_table() {
        assert_eq!(CrowdLevel::Low.capacity_for(100), 30);
        assert_eq!(CrowdLevel::Moderate.capacity_for(100), 70);
        assert_eq!(CrowdLevel::High.capacity_for(100), 95);
        assert_eq!(CrowdLevel::High.capacity_for(80), 76);
        assert_eq!(CrowdLevel::Low.capacity_for(90), 27);
        assert_eq!(CrowdLevel::Low.capacity_for(0), 0);
    }

    #[test]
    fn test_capacity_never_exceeds_max() {
        for max in [1, 2, 3, 7, 19, 70, 99, 1000, u32::MAX] {
            for level in [CrowdLevel::Low, CrowdLevel::Moderate, CrowdLevel::High] {
                assert!(level.capacity_for(max) <= max, "{level} at {max}");
            }
        }
    }

    #[test]
    fn test_wait_time_table() {
        assert_eq!(CrowdLevel::Low.wait_time(), "No wait");
        assert_eq!(CrowdLevel::Moderate.wait_time(), "10-20 min");
        assert_eq!(CrowdLevel::High.wait_time(), "30-45 min");
    }

    #[test]
    fn test_apply_status() {
        let mut ghat = default_ghat_statuses().remove(3);
        ghat.apply_status(CrowdLevel::High);

        assert_eq!(ghat.status, CrowdLevel::High);
        assert_eq!(ghat.current_capacity, 76);
        assert_eq!(ghat.wait_time, "30-45 min");
    }

    #[test]
    fn test_field_update_apply() {
        let mut slot = Some("old".to_string());
        FieldUpdate::Keep.apply(&mut slot);
        assert_eq!(slot.as_deref(), Some("old"));

        FieldUpdate::Set("new".to_string()).apply(&mut slot);
        assert_eq!(slot.as_deref(), Some("new"));

        FieldUpdate::Clear.apply(&mut slot);
        assert!(slot.is_none());
    }

    #[test]
    fn test_field_update_from_option() {
        assert_eq!(FieldUpdate::from(Some(1)), FieldUpdate::Set(1));
        assert_eq!(FieldUpdate::<i32>::from(None), FieldUpdate::Clear);
        assert_eq!(FieldUpdate::<i32>::default(), FieldUpdate::Keep);
    }

    #[test]
    fn test_alert_new_trims_message() {
        let alert = Alert::new("  Gate 4 closed  ", Priority::Medium).unwrap();
        assert_eq!(alert.message, "Gate 4 closed");
        assert_eq!(alert.priority, Priority::Medium);
        assert!(alert.id > 0);
        assert!(!alert.timestamp.is_empty());
    }

    #[test]
    fn test_alert_new_rejects_blank() {
        let err = Alert::new("   ", Priority::High).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_recommendation_new_requires_both_fields() {
        assert!(Recommendation::new("Use Route C", RecommendationKind::Alternative, "").is_err());
        assert!(Recommendation::new("", RecommendationKind::Alternative, "Route C").is_err());

        let rec = Recommendation::new("Use Route C", RecommendationKind::Alternative, " Route C ")
            .unwrap();
        assert_eq!(rec.route_details, "Route C");
    }

    #[test]
    fn test_alert_json_layout() {
        let alert = Alert {
            id: 7,
            message: "m".to_string(),
            priority: Priority::High,
            timestamp: "t".to_string(),
        };
        let json = serde_json::to_string(&alert).unwrap();
        assert_eq!(
            json,
            r#"{"id":7,"message":"m","priority":"high","timestamp":"t"}"#
        );
    }

    #[test]
    fn test_recommendation_json_layout() {
        let json = serde_json::to_value(&default_recommendations()[2]).unwrap();
        assert_eq!(json["type"], "avoid");
        assert_eq!(json["routeDetails"], "Triveni Ghat area");
    }

    #[test]
    fn test_ghat_json_omits_missing_remarks() {
        let ghats = default_ghat_statuses();
        let json = serde_json::to_value(&ghats[3]).unwrap();
        assert!(json.get("remarks").is_none());
        assert_eq!(json["currentCapacity"], 32);
        assert_eq!(json["maxCapacity"], 80);
        assert_eq!(json["waitTime"], "No wait");
    }

    #[test]
    fn test_route_path_reads_browser_layout() {
        let json = r#"{"id":4,"from":"Dada Nagar Ghat","to":"Triveni Ghat","crowdLevel":"low","isActive":true}"#;
        let path: RoutePath = serde_json::from_str(json).unwrap();
        assert_eq!(path, default_route_paths()[3]);
    }

    #[test]
    fn test_defaults_have_unique_ids() {
        fn unique(ids: Vec<i64>) -> bool {
            let mut sorted = ids.clone();
            sorted.sort_unstable();
            sorted.dedup();
            sorted.len() == ids.len()
        }
        assert!(unique(default_alerts().iter().map(|a| a.id).collect()));
        assert!(unique(default_recommendations().iter().map(|r| r.id).collect()));
        assert!(unique(default_ghat_statuses().iter().map(|g| g.id).collect()));
        assert!(unique(default_route_paths().iter().map(|p| p.id).collect()));
    }

    #[test]
    fn test_default_ghats_respect_capacity() {
        for ghat in default_ghat_statuses() {
            assert!(ghat.current_capacity <= ghat.max_capacity, "{}", ghat.name);
            assert!(ghat.max_capacity > 0);
        }
    }

    #[test]
    fn test_occupancy_percent() {
        let ghats = default_ghat_statuses();
        assert_eq!(ghats[0].occupancy_percent(), 45);
        assert_eq!(ghats[3].occupancy_percent(), 40);
    }

    #[test]
    fn test_clamp_capacity() {
        let mut ghat = default_ghat_statuses().remove(0);
        assert!(!ghat.clamp_capacity());

        ghat.current_capacity = 250;
        assert!(ghat.clamp_capacity());
        assert_eq!(ghat.current_capacity, ghat.max_capacity);
    }
}
