//! Collision queries on the lane grid
//!
//! The track is three discrete lanes, so overlap is a lane match plus a
//! vertical band test. Queries return entity IDs so the caller can remove
//! by ID after mutating other state.

use super::state::Entity;
use crate::consts::*;

/// Whether a vertical position is inside the runner's collision band
#[inline]
pub fn in_hit_band(y: f32) -> bool {
    y > HIT_BAND_TOP && y < HIT_BAND_BOTTOM
}

/// Whether an entity overlaps the runner standing in `lane`
#[inline]
pub fn overlaps_runner(entity: &Entity, lane: u8) -> bool {
    entity.lane == lane && in_hit_band(entity.y)
}

/// First entity (lowest ID) matching `filter` that overlaps the runner
pub fn first_overlap<F>(entities: &[Entity], lane: u8, filter: F) -> Option<u32>
where
    F: Fn(&Entity) -> bool,
{
    entities
        .iter()
        .filter(|e| filter(e))
        .filter(|e| overlaps_runner(e, lane))
        .min_by_key(|e| e.id)
        .map(|e| e.id)
}

/// Whether any entity matching `filter` sits in `lane` strictly inside (lo, hi)
pub fn lane_occupied<F>(entities: &[Entity], lane: u8, lo: f32, hi: f32, filter: F) -> bool
where
    F: Fn(&Entity) -> bool,
{
    entities
        .iter()
        .any(|e| e.lane == lane && e.y > lo && e.y < hi && filter(e))
}

/// Lane distance between two lanes
#[inline]
pub fn lane_gap(a: u8, b: u8) -> u8 {
    a.abs_diff(b)
}
