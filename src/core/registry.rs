//! Tier and marker-type registry.
//!
//! Owns the ordered tier list (visibility, lock, allowed types, color) and
//! the marker-type definitions (key binding, color, category). Read by both
//! the keyboard machine and the renderer; exactly one tier is "active" and
//! receives newly placed markers by default. Locked or hidden tiers are
//! never eligible to become active.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerCategory {
    /// Start/end of a sign or sentence.
    Boundary,
    /// Internal phase (hold, transition, stroke).
    Phase,
    /// Punctual feature (blink, head nod).
    Feature,
    Custom,
}

/// A marker-type definition. The `slug` is the stable machine name used for
/// pairing and interchange; slugs ending `-start`/`-end` are paired for
/// auto-linking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerType {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    /// Single-character key binding. Intended unique per tier; duplicates
    /// across tiers are tolerated because lookup is always tier-scoped.
    pub key: char,
    /// Hex color, e.g. "#4A9EFF".
    pub color: String,
    pub category: MarkerCategory,
    #[serde(default)]
    pub description: Option<String>,
}

/// An annotation track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tier {
    pub id: Uuid,
    pub name: String,
    /// Allowed marker types, in display order.
    pub marker_types: Vec<Uuid>,
    pub visible: bool,
    pub locked: bool,
    /// Hex row accent color.
    pub color: String,
}

/// Ordered registry of tiers and marker types plus the active-tier cursor.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Registry {
    tiers: IndexMap<Uuid, Tier>,
    types: IndexMap<Uuid, MarkerType>,
    active_tier: Option<Uuid>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Default annotation setup for a fresh session: two manual tiers plus a
    /// non-manual features tier.
    pub fn with_defaults() -> Self {
        let mut reg = Self::new();
        let sign_start = reg.add_type("sign-start", "Sign start", 's', "#3FB950", MarkerCategory::Boundary);
        let sign_end = reg.add_type("sign-end", "Sign end", 'e', "#F85149", MarkerCategory::Boundary);
        let hold = reg.add_type("hold", "Hold", 'h', "#D29922", MarkerCategory::Phase);
        let transition = reg.add_type("transition", "Transition", 't', "#A371F7", MarkerCategory::Phase);
        let blink = reg.add_type("blink", "Eye blink", 'b', "#58A6FF", MarkerCategory::Feature);
        let nod = reg.add_type("head-nod", "Head nod", 'd', "#79C0FF", MarkerCategory::Feature);

        reg.add_tier("Right hand", vec![sign_start, sign_end, hold, transition], "#2D5A88");
        reg.add_tier("Left hand", vec![sign_start, sign_end, hold, transition], "#2D8866");
        reg.add_tier("Non-manual", vec![blink, nod], "#6E4C8E");
        reg
    }

    // ========== Types ==========

    pub fn add_type(
        &mut self,
        slug: &str,
        name: &str,
        key: char,
        color: &str,
        category: MarkerCategory,
    ) -> Uuid {
        let id = Uuid::new_v4();
        self.types.insert(
            id,
            MarkerType {
                id,
                slug: slug.to_string(),
                name: name.to_string(),
                key,
                color: color.to_string(),
                category,
                description: None,
            },
        );
        id
    }

    pub fn marker_type(&self, id: Uuid) -> Option<&MarkerType> {
        self.types.get(&id)
    }

    pub fn types(&self) -> impl Iterator<Item = &MarkerType> {
        self.types.values()
    }

    pub fn type_by_slug(&self, slug: &str) -> Option<&MarkerType> {
        self.types.values().find(|t| t.slug == slug)
    }

    /// True for `*-start` slugs.
    pub fn is_start_type(&self, id: Uuid) -> bool {
        self.marker_type(id).is_some_and(|t| t.slug.ends_with("-start"))
    }

    /// True for `*-end` slugs.
    pub fn is_end_type(&self, id: Uuid) -> bool {
        self.marker_type(id).is_some_and(|t| t.slug.ends_with("-end"))
    }

    /// The paired `-end` type of a `-start` type (or vice versa).
    pub fn paired_type(&self, id: Uuid) -> Option<&MarkerType> {
        let t = self.marker_type(id)?;
        let paired_slug = if let Some(base) = t.slug.strip_suffix("-start") {
            format!("{base}-end")
        } else if let Some(base) = t.slug.strip_suffix("-end") {
            format!("{base}-start")
        } else {
            return None;
        };
        self.type_by_slug(&paired_slug)
    }

    /// The `-end` type to confirm a hold-release with, falling back to the
    /// held type itself when it has no pair.
    pub fn end_type_for(&self, start_type: Uuid) -> Uuid {
        if self.is_start_type(start_type) {
            self.paired_type(start_type).map(|t| t.id).unwrap_or(start_type)
        } else {
            start_type
        }
    }

    // ========== Tiers ==========

    pub fn add_tier(&mut self, name: &str, marker_types: Vec<Uuid>, color: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.tiers.insert(
            id,
            Tier {
                id,
                name: name.to_string(),
                marker_types,
                visible: true,
                locked: false,
                color: color.to_string(),
            },
        );
        if self.active_tier.is_none() {
            self.active_tier = Some(id);
        }
        id
    }

    pub fn tier(&self, id: Uuid) -> Option<&Tier> {
        self.tiers.get(&id)
    }

    pub fn tier_mut(&mut self, id: Uuid) -> Option<&mut Tier> {
        self.tiers.get_mut(&id)
    }

    pub fn tiers(&self) -> impl Iterator<Item = &Tier> {
        self.tiers.values()
    }

    /// Replace all tiers and types (restore/import path). Keeps the active
    /// tier if it survived, otherwise falls back to the first eligible one.
    pub fn replace(&mut self, tiers: Vec<Tier>, types: Vec<MarkerType>) {
        self.tiers = tiers.into_iter().map(|t| (t.id, t)).collect();
        self.types = types.into_iter().map(|t| (t.id, t)).collect();
        if self.active_tier.is_none_or(|id| !self.tiers.contains_key(&id)) {
            self.active_tier = self.tiers.values().find(|t| self.eligible(t)).map(|t| t.id);
        }
    }

    fn eligible(&self, tier: &Tier) -> bool {
        tier.visible && !tier.locked
    }

    // ========== Active tier ==========

    pub fn active_tier(&self) -> Option<&Tier> {
        self.active_tier.and_then(|id| self.tiers.get(&id))
    }

    pub fn active_tier_id(&self) -> Option<Uuid> {
        self.active_tier
    }

    /// Activate a tier; rejected for locked/hidden tiers.
    pub fn set_active_tier(&mut self, id: Uuid) -> bool {
        match self.tiers.get(&id) {
            Some(t) if self.eligible(t) => {
                self.active_tier = Some(id);
                true
            }
            _ => false,
        }
    }

    /// Advance the active tier to the next eligible one, wrapping around.
    /// Returns the new active tier id.
    pub fn cycle_active_tier(&mut self) -> Option<Uuid> {
        if self.tiers.is_empty() {
            return None;
        }
        let order: Vec<Uuid> = self.tiers.keys().copied().collect();
        let start = self
            .active_tier
            .and_then(|id| order.iter().position(|x| *x == id))
            .unwrap_or(0);
        for step in 1..=order.len() {
            let candidate = order[(start + step) % order.len()];
            if self.tiers.get(&candidate).map(|t| self.eligible(t)) == Some(true) {
                self.active_tier = Some(candidate);
                return Some(candidate);
            }
        }
        None
    }

    // ========== Key lookup ==========

    /// Resolve a typed character to a marker type allowed on `tier_id`.
    /// First type in tier order wins on duplicate keys.
    pub fn type_for_key(&self, tier_id: Uuid, key: char) -> Option<&MarkerType> {
        let tier = self.tier(tier_id)?;
        tier.marker_types
            .iter()
            .filter_map(|id| self.types.get(id))
            .find(|t| t.key.eq_ignore_ascii_case(&key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_skips_locked_and_hidden() {
        let mut reg = Registry::with_defaults();
        let order: Vec<Uuid> = reg.tiers().map(|t| t.id).collect();
        assert_eq!(reg.active_tier_id(), Some(order[0]));

        reg.tier_mut(order[1]).unwrap().locked = true;
        assert_eq!(reg.cycle_active_tier(), Some(order[2]));

        reg.tier_mut(order[0]).unwrap().visible = false;
        // Only tier 2 is eligible now; cycling wraps back to it.
        assert_eq!(reg.cycle_active_tier(), Some(order[2]));
    }

    #[test]
    fn locked_tier_cannot_become_active() {
        let mut reg = Registry::with_defaults();
        let order: Vec<Uuid> = reg.tiers().map(|t| t.id).collect();
        reg.tier_mut(order[1]).unwrap().locked = true;
        assert!(!reg.set_active_tier(order[1]));
        assert_eq!(reg.active_tier_id(), Some(order[0]));
    }

    #[test]
    fn start_end_pairing() {
        let reg = Registry::with_defaults();
        let start = reg.type_by_slug("sign-start").unwrap();
        let end = reg.type_by_slug("sign-end").unwrap();
        assert!(reg.is_start_type(start.id));
        assert!(reg.is_end_type(end.id));
        assert_eq!(reg.paired_type(start.id).map(|t| t.id), Some(end.id));
        assert_eq!(reg.paired_type(end.id).map(|t| t.id), Some(start.id));
        assert_eq!(reg.end_type_for(start.id), end.id);
        // A phase type has no pair and maps to itself.
        let hold = reg.type_by_slug("hold").unwrap();
        assert_eq!(reg.end_type_for(hold.id), hold.id);
    }

    #[test]
    fn key_lookup_is_tier_scoped() {
        let reg = Registry::with_defaults();
        let manual = reg.tiers().next().unwrap().id;
        let nonmanual = reg.tiers().nth(2).unwrap().id;
        assert_eq!(reg.type_for_key(manual, 's').unwrap().slug, "sign-start");
        // 's' is not bound on the non-manual tier.
        assert!(reg.type_for_key(nonmanual, 's').is_none());
        assert_eq!(reg.type_for_key(nonmanual, 'b').unwrap().slug, "blink");
        // Case-insensitive match.
        assert_eq!(reg.type_for_key(manual, 'S').unwrap().slug, "sign-start");
    }
}
