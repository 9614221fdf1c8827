//! Plain-text rendering for CLI output.

use std::fmt::Write as _;

use crate::booking::{Booking, GHATS, TIME_SLOTS};
use crate::live::{Availability, LiveStatus};
use crate::lost_found::Report;
use crate::records::{Alert, GhatStatus, Recommendation, RoutePath};
use crate::storage::StoreEntry;

/// One line per alert.
#[must_use]
pub fn alerts(alerts: &[Alert]) -> String {
    if alerts.is_empty() {
        return "No alerts.\n".to_string();
    }
    let mut out = String::new();
    for alert in alerts {
        let _ = writeln!(
            out,
            "[{}] {:<6} {}  ({})",
            alert.id,
            alert.priority.to_string(),
            alert.message,
            alert.timestamp
        );
    }
    out
}

/// One block per recommendation.
#[must_use]
pub fn recommendations(recs: &[Recommendation]) -> String {
    if recs.is_empty() {
        return "No recommendations.\n".to_string();
    }
    let mut out = String::new();
    for rec in recs {
        let _ = writeln!(
            out,
            "[{}] {:<11} {}",
            rec.id,
            rec.kind.to_string(),
            rec.message
        );
        let _ = writeln!(out, "      route: {}", rec.route_details);
    }
    out
}

/// A table of ghat statuses.
#[must_use]
pub fn ghats(ghats: &[GhatStatus]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<3} {:<22} {:<9} {:>9} {:<10} Remarks",
        "ID", "Ghat", "Crowd", "Occupancy", "Wait"
    );
    for ghat in ghats {
        let _ = writeln!(
            out,
            "{:<3} {:<22} {:<9} {:>9} {:<10} {}",
            ghat.id,
            ghat.name,
            ghat.status.to_string(),
            format!("{}/{}", ghat.current_capacity, ghat.max_capacity),
            ghat.wait_time,
            ghat.remarks.as_deref().unwrap_or("-"),
        );
    }
    out
}

/// A table of route paths.
#[must_use]
pub fn routes(paths: &[RoutePath]) -> String {
    let mut out = String::new();
    for path in paths {
        let state = if path.is_active { "open" } else { "closed" };
        let _ = write!(
            out,
            "[{}] {} → {}  {} ({state})",
            path.id, path.from, path.to, path.crowd_level
        );
        if let Some(notes) = &path.notes {
            let _ = write!(out, "  {notes}");
        }
        out.push('\n');
    }
    out
}

/// The availability summary shown on the public board.
#[must_use]
pub fn live_status(live: &LiveStatus) -> String {
    let mut out = String::new();
    for group in Availability::ALL {
        let _ = writeln!(
            out,
            "{:<10} {:>2}  {}",
            group.to_string(),
            live.count(group),
            live.tooltip(group)
        );
    }
    out
}

/// A table of raw storage entries.
#[must_use]
pub fn storage_entries(entries: &[StoreEntry]) -> String {
    if entries.is_empty() {
        return "Storage is empty.\n".to_string();
    }
    let mut out = String::new();
    let _ = writeln!(out, "{:<32} {:>8}  Updated", "Key", "Bytes");
    for entry in entries {
        let _ = writeln!(
            out,
            "{:<32} {:>8}  {}",
            entry.key, entry.size_bytes, entry.updated_at
        );
    }
    out
}

/// Summary of a booking.
#[must_use]
pub fn booking(booking: &Booking) -> String {
    let r = &booking.request;
    let mut out = String::new();
    let _ = writeln!(out, "Token ID: {}", booking.token_id);
    let _ = writeln!(out, "Name:     {} ({}, {})", r.name, r.age, r.gender);
    let _ = writeln!(out, "Ghat:     {}", r.ghat);
    let _ = writeln!(out, "Date:     {}", r.date);
    let _ = writeln!(out, "Time:     {}", r.time_slot);
    let _ = writeln!(out, "Booked:   {}", booking.booking_time);
    out
}

/// The ghats and time slots that can be booked.
#[must_use]
pub fn booking_options() -> String {
    let mut out = String::from("Ghats:\n");
    for ghat in GHATS {
        let note = if ghat.available { "" } else { " (unavailable)" };
        let _ = writeln!(out, "  {}{note}", ghat.label);
    }
    out.push_str("Time slots:\n");
    for slot in TIME_SLOTS {
        let note = if slot.available { "" } else { " (full)" };
        let _ = writeln!(out, "  {}{note}", slot.label);
    }
    out
}

/// One block per lost-and-found report.
#[must_use]
pub fn reports(reports: &[Report]) -> String {
    if reports.is_empty() {
        return "No matching reports.\n".to_string();
    }
    let mut out = String::new();
    for report in reports {
        let _ = writeln!(
            out,
            "[{}] {} / {}  {} ({} {})  at {}",
            report.id,
            report.kind,
            report.status,
            report.name,
            report.age,
            report.gender,
            report.location
        );
        let _ = writeln!(out, "      {}  ({})", report.description, report.timestamp);
    }
    out
}
