//! Geometric helpers for 3D collision detection.
//!
//! Axis-aligned overlap checks used by the placement engine when testing
//! candidate positions against items already placed in a container.

use crate::model::PlacedItem;

/// Checks whether two placed items overlap in space.
///
/// Axis-Aligned Bounding Box (AABB) test: two boxes do NOT overlap if they
/// are fully separated along at least one axis.
///
/// # Parameters
/// * `a` - First placed item
/// * `b` - Second placed item
///
/// # Returns
/// `true` if the items overlap, otherwise `false`
pub fn intersects(a: &PlacedItem, b: &PlacedItem) -> bool {
    let (ax, ay, az) = a.position;
    let (al, aw, ah) = a.dims;
    let (bx, by, bz) = b.position;
    let (bl, bw, bh) = b.dims;

    !(ax + al <= bx
        || bx + bl <= ax
        || ay + aw <= by
        || by + bw <= ay
        || az + ah <= bz
        || bz + bh <= az)
}
