//! Eligibility tiers derived from a creator's track record.
//!
//! Tiers are never persisted. Every consumer (auto-approval at intake, the starting-tier
//! concurrency gate, and tier-upgrade detection after an upload) calls [`tier_for`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// Minimum score for the standard tier once a campaign has been completed.
pub const STANDARD_MIN_SCORE: u8 = 50;
/// Minimum score for the VIP tier once a campaign has been completed.
pub const VIP_MIN_SCORE: u8 = 85;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Starting,
    Standard,
    Vip,
}

impl Tier {
    pub const fn label(self) -> &'static str {
        match self {
            Tier::Starting => "starting",
            Tier::Standard => "standard",
            Tier::Vip => "vip",
        }
    }

    /// VIP creators bypass admin review when applying.
    pub const fn auto_approves(self) -> bool {
        matches!(self, Tier::Vip)
    }

    /// Starting creators may hold one unsettled application at a time.
    pub const fn limits_concurrent_applications(self) -> bool {
        matches!(self, Tier::Starting)
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub fn tier_for(completed_campaigns: u32, score: u8) -> Tier {
    if completed_campaigns == 0 || score < STANDARD_MIN_SCORE {
        Tier::Starting
    } else if score >= VIP_MIN_SCORE {
        Tier::Vip
    } else {
        Tier::Standard
    }
}

/// Returns the tier to celebrate when moving from `before` to `after`.
///
/// Only `starting -> standard` and any move into `vip` are announced.
pub fn celebrated_upgrade(before: Tier, after: Tier) -> Option<Tier> {
    match (before, after) {
        (Tier::Starting, Tier::Standard) => Some(Tier::Standard),
        (before, Tier::Vip) if before != Tier::Vip => Some(Tier::Vip),
        _ => None,
    }
}
