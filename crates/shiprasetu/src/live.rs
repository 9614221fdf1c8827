//! Live crowd summary for the public status board.

use serde::Serialize;

use crate::records::{CrowdLevel, GhatStatus};

/// How many names a tooltip lists before eliding the rest.
const TOOLTIP_NAMES: usize = 3;

/// Public-facing grouping of ghats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    /// Crowd level low.
    Available,
    /// Crowd level moderate.
    Moderate,
    /// Crowd level high.
    High,
}

impl Availability {
    /// All groups in display order.
    pub const ALL: [Self; 3] = [Self::Available, Self::Moderate, Self::High];
}

impl From<CrowdLevel> for Availability {
    fn from(level: CrowdLevel) -> Self {
        match level {
            CrowdLevel::Low => Self::Available,
            CrowdLevel::Moderate => Self::Moderate,
            CrowdLevel::High => Self::High,
        }
    }
}

impl std::fmt::Display for Availability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Available => write!(f, "available"),
            Self::Moderate => write!(f, "moderate"),
            Self::High => write!(f, "high"),
        }
    }
}

/// One ghat as the status board shows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GhatCard {
    /// Ghat id.
    pub id: i64,
    /// Ghat name.
    pub name: String,
    /// Group the ghat falls in.
    pub availability: Availability,
    /// Occupancy as a percentage of capacity.
    pub occupancy_percent: u32,
    /// Expected wait.
    pub wait_time: String,
}

/// Ghats grouped by availability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LiveStatus {
    cards: Vec<GhatCard>,
}

impl LiveStatus {
    /// Summarize `ghats`, keeping their order.
    #[must_use]
    pub fn from_ghats(ghats: &[GhatStatus]) -> Self {
        let cards = ghats
            .iter()
            .map(|g| GhatCard {
                id: g.id,
                name: g.name.clone(),
                availability: g.status.into(),
                occupancy_percent: g.occupancy_percent(),
                wait_time: g.wait_time.clone(),
            })
            .collect();
        Self { cards }
    }

    /// Every card.
    #[must_use]
    pub fn cards(&self) -> &[GhatCard] {
        &self.cards
    }

    /// Cards in `group`.
    pub fn group(&self, group: Availability) -> impl Iterator<Item = &GhatCard> {
        self.cards.iter().filter(move |c| c.availability == group)
    }

    /// Number of ghats in `group`.
    #[must_use]
    pub fn count(&self, group: Availability) -> usize {
        self.group(group).count()
    }

    /// The first few names in `group`, with `...` if there are more.
    #[must_use]
    pub fn tooltip(&self, group: Availability) -> String {
        let names: Vec<&str> = self
            .group(group)
            .take(TOOLTIP_NAMES)
            .map(|c| c.name.as_str())
            .collect();
        let mut tooltip = names.join(", ");
        if self.count(group) > TOOLTIP_NAMES {
            tooltip.push_str("...");
        }
        tooltip
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::default_ghat_statuses;

    #[test]
    fn test_default_grouping() {
        let live = LiveStatus::from_ghats(&default_ghat_statuses());

        assert_eq!(live.count(Availability::Available), 2);
        assert_eq!(live.count(Availability::Moderate), 3);
        assert_eq!(live.count(Availability::High), 1);
        assert_eq!(
            live.tooltip(Availability::Moderate),
            "Ram Ghat, Kal Bhairav Mandir, Sadawal Transit Zone"
        );
        assert_eq!(live.tooltip(Availability::High), "Triveni Ghat");
        assert_eq!(
            Availability::ALL.iter().map(|g| live.count(*g)).sum::<usize>(),
            6
        );
    }

    #[test]
    fn test_tooltip_elides_after_three() {
        let mut ghats = default_ghat_statuses();
        for ghat in &mut ghats {
            ghat.apply_status(CrowdLevel::Low);
        }
        let live = LiveStatus::from_ghats(&ghats);

        let expected = format!("{}, {}, {}...", ghats[0].name, ghats[1].name, ghats[2].name);
        assert_eq!(live.tooltip(Availability::Available), expected);
        assert_eq!(live.tooltip(Availability::High), "");
    }

    #[test]
    fn test_tooltip_without_ellipsis() {
        let ghats = default_ghat_statuses();
        let live = LiveStatus::from_ghats(&ghats[..1]);

        assert_eq!(live.tooltip(ghats[0].status.into()), ghats[0].name);
    }

    #[test]
    fn test_card_occupancy() {
        let mut ghats = default_ghat_statuses();
        ghats[1].apply_status(CrowdLevel::Moderate);
        let live = LiveStatus::from_ghats(&ghats);

        let card = &live.cards()[1];
        assert_eq!(card.availability, Availability::Moderate);
        assert_eq!(card.occupancy_percent, 70);
        assert_eq!(card.wait_time, "10-20 min");
    }

    #[test]
    fn test_availability_from_level() {
        assert_eq!(Availability::from(CrowdLevel::Low), Availability::Available);
        assert_eq!(Availability::from(CrowdLevel::High).to_string(), "high");
    }
}
