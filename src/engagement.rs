//! Engagement scoring: a pure, total function over (category, matched
//! keyword families), consumed by the CRM collaborator.

use std::collections::BTreeSet;

use crate::category::Category;
use crate::profiles::Profiles;

/// Per-category base plus fixed bonuses for matched families, clamped to
/// `[0, 100]`. No error cases.
pub fn engagement_score(
    profiles: &Profiles,
    category: Category,
    families: &BTreeSet<String>,
) -> i32 {
    let mut score = profiles.engagement.base_for(category);
    for family in families {
        score += profiles.engagement.bonus_for(family);
    }
    score.clamp(0, 100)
}
