//! Single-container placement engine.
//!
//! The overflow orchestrator consumes placement through the narrow
//! [`PlacementEngine`] trait: container geometry and a weight ceiling go in,
//! placed items with positions and oriented dimensions come out, together
//! with the subsequence of items that did not fit. The default
//! [`GridPlacer`] searches a position grid along X and Y with Z layers taken
//! from the tops of already placed items, rejecting candidates that collide
//! or exceed the weight ceiling.

use std::cmp::Ordering;

use crate::geometry::intersects;
use crate::model::{ContainerTemplate, Item, PlacedItem};
use crate::types::{EPSILON_GENERAL, EPSILON_HEIGHT};

/// Configuration forwarded to the placement engine per request.
#[derive(Copy, Clone, Debug)]
pub struct PlacementConfig {
    /// Try larger items first inside one container.
    pub bigger_first: bool,
    /// Spread items across future containers rather than greedily filling
    /// this one. With one container per call the greedy and spread orders
    /// coincide; the flag is part of the engine contract regardless.
    pub distribute_items: bool,
    /// Allow the six axis-aligned orientations per item.
    pub allow_rotation: bool,
    /// Decimal places for coordinates and oriented dimensions. Candidates
    /// are quantized to this precision before feasibility checks.
    pub rounding_precision: u32,
    /// Step size of the candidate position grid (smaller = finer, slower).
    pub grid_step: f64,
}

impl PlacementConfig {
    pub const DEFAULT_BIGGER_FIRST: bool = true;
    pub const DEFAULT_DISTRIBUTE_ITEMS: bool = false;
    pub const DEFAULT_ALLOW_ROTATION: bool = true;
    pub const DEFAULT_ROUNDING_PRECISION: u32 = 2;
    pub const DEFAULT_GRID_STEP: f64 = 5.0;
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            bigger_first: Self::DEFAULT_BIGGER_FIRST,
            distribute_items: Self::DEFAULT_DISTRIBUTE_ITEMS,
            allow_rotation: Self::DEFAULT_ALLOW_ROTATION,
            rounding_precision: Self::DEFAULT_ROUNDING_PRECISION,
            grid_step: Self::DEFAULT_GRID_STEP,
        }
    }
}

/// Result of one single-container placement call.
///
/// `placed` and `unfitted` together account for every input item exactly
/// once. `unfitted` preserves the relative input order even when the engine
/// tried items in a different order internally.
#[derive(Clone, Debug)]
pub struct Placement {
    pub placed: Vec<PlacedItem>,
    pub unfitted: Vec<Item>,
}

/// Internal engine failure.
///
/// Not expected in normal operation; the orchestrator treats it as request
/// failure, never as a retry signal.
#[derive(Debug, Clone)]
pub struct PlacementError(pub String);

impl std::fmt::Display for PlacementError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Placement engine failed: {}", self.0)
    }
}

impl std::error::Error for PlacementError {}

/// Contract between the overflow orchestrator and the placement primitive.
pub trait PlacementEngine {
    /// Places as many of `items` as possible into one empty container built
    /// from `template`.
    fn place(
        &self,
        template: &ContainerTemplate,
        items: Vec<Item>,
        config: &PlacementConfig,
    ) -> Result<Placement, PlacementError>;
}

/// The six axis-aligned orientations as index permutations of (l, w, h).
const ORIENTATIONS: [(usize, usize, usize); 6] = [
    (0, 1, 2),
    (0, 2, 1),
    (1, 0, 2),
    (1, 2, 0),
    (2, 0, 1),
    (2, 1, 0),
];

/// Default placement engine: deterministic grid search.
#[derive(Clone, Copy, Debug, Default)]
pub struct GridPlacer;

impl PlacementEngine for GridPlacer {
    fn place(
        &self,
        template: &ContainerTemplate,
        items: Vec<Item>,
        config: &PlacementConfig,
    ) -> Result<Placement, PlacementError> {
        if config.grid_step <= 0.0 || !config.grid_step.is_finite() {
            return Err(PlacementError(format!(
                "grid step must be positive and finite, got {}",
                config.grid_step
            )));
        }

        // Internal try order; unfitted items are reported in input order.
        let mut order: Vec<usize> = (0..items.len()).collect();
        if config.bigger_first {
            order.sort_by(|&a, &b| {
                items[b]
                    .volume()
                    .partial_cmp(&items[a].volume())
                    .unwrap_or(Ordering::Equal)
                    .then_with(|| a.cmp(&b))
            });
        }

        let mut placed: Vec<PlacedItem> = Vec::new();
        let mut total_weight = 0.0;
        let mut unfitted_idx: Vec<usize> = Vec::new();

        for &idx in &order {
            let item = &items[idx];

            if total_weight + item.weight > template.max_weight + EPSILON_GENERAL {
                unfitted_idx.push(idx);
                continue;
            }

            match find_position(item, &placed, template.dims, config) {
                Some((position, dims)) => {
                    total_weight += item.weight;
                    placed.push(PlacedItem {
                        item: item.clone(),
                        position,
                        dims,
                    });
                }
                None => unfitted_idx.push(idx),
            }
        }

        unfitted_idx.sort_unstable();
        let mut items = items;
        let mut unfitted = Vec::with_capacity(unfitted_idx.len());
        // Drain from the back so earlier indices stay valid.
        for &idx in unfitted_idx.iter().rev() {
            unfitted.push(items.swap_remove(idx));
        }
        unfitted.reverse();

        Ok(Placement { placed, unfitted })
    }
}

/// Finds the best free position for an item, trying orientations if allowed.
///
/// Score order: lowest z, then y, then x; earlier orientations win ties.
///
/// Candidates are quantized to `rounding_precision` before the bounds and
/// collision checks, so the stored placement is exactly the one that was
/// checked and rounding can never move it past a wall or into a neighbor.
///
/// # Returns
/// `Some((position, oriented_dims))` on success, otherwise `None`
fn find_position(
    item: &Item,
    placed: &[PlacedItem],
    container: (f64, f64, f64),
    config: &PlacementConfig,
) -> Option<((f64, f64, f64), (f64, f64, f64))> {
    // Relevant Z layers: the floor plus the top of every placed item.
    let mut z_layers: Vec<f64> = placed.iter().map(|p| p.position.2 + p.dims.2).collect();
    z_layers.push(0.0);
    z_layers.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    z_layers.dedup_by(|a, b| (*a - *b).abs() < EPSILON_HEIGHT);

    let mut best: Option<(PlacementScore, (f64, f64, f64), (f64, f64, f64))> = None;

    for dims in orientations(item.dims, config.allow_rotation) {
        let dims = round_triple(dims, config.rounding_precision);
        let (dl, dw, dh) = dims;
        if dl > container.0 + EPSILON_GENERAL
            || dw > container.1 + EPSILON_GENERAL
            || dh > container.2 + EPSILON_GENERAL
        {
            continue;
        }

        let xs = axis_positions(container.0, dl, config.grid_step);
        let ys = axis_positions(container.1, dw, config.grid_step);

        for &z in &z_layers {
            let z = round_to(z, config.rounding_precision);
            if z + dh > container.2 + EPSILON_GENERAL {
                continue;
            }

            for &y in &ys {
                let y = round_to(y, config.rounding_precision);
                if y + dw > container.1 + EPSILON_GENERAL {
                    continue;
                }

                for &x in &xs {
                    let x = round_to(x, config.rounding_precision);
                    if x + dl > container.0 + EPSILON_GENERAL {
                        continue;
                    }

                    let candidate = PlacedItem {
                        item: item.clone(),
                        position: (x, y, z),
                        dims,
                    };

                    if placed.iter().any(|p| intersects(p, &candidate)) {
                        continue;
                    }

                    let score = PlacementScore { z, y, x };
                    let better = match &best {
                        None => true,
                        Some((current, _, _)) => score.is_better_than(current),
                    };
                    if better {
                        best = Some((score, (x, y, z), dims));
                    }
                }
            }
        }
    }

    best.map(|(_, position, dims)| (position, dims))
}

/// Returns the orientations to try for the given declared dimensions.
///
/// Duplicate orientations (square faces, cubes) are collapsed so ties do not
/// depend on redundant candidates.
fn orientations(dims: (f64, f64, f64), allow_rotation: bool) -> Vec<(f64, f64, f64)> {
    if !allow_rotation {
        return vec![dims];
    }

    let sides = [dims.0, dims.1, dims.2];
    let mut result: Vec<(f64, f64, f64)> = Vec::with_capacity(6);
    for (a, b, c) in ORIENTATIONS {
        let oriented = (sides[a], sides[b], sides[c]);
        if !result.iter().any(|&existing| {
            let (el, ew, eh) = existing;
            (el - oriented.0).abs() < EPSILON_GENERAL
                && (ew - oriented.1).abs() < EPSILON_GENERAL
                && (eh - oriented.2).abs() < EPSILON_GENERAL
        }) {
            result.push(oriented);
        }
    }
    result
}

/// Generates candidate positions along one axis.
///
/// Step grid starting at 0, always including the flush-right position so a
/// maximally shifted placement stays reachable.
fn axis_positions(container_len: f64, object_len: f64, step: f64) -> Vec<f64> {
    let max_pos = (container_len - object_len).max(0.0);
    let mut positions = Vec::new();

    if max_pos <= EPSILON_GENERAL {
        positions.push(0.0);
        return positions;
    }

    let mut pos = 0.0;
    while pos <= max_pos + EPSILON_GENERAL {
        positions.push(pos.min(max_pos));
        pos += step;
    }

    if let Some(&last) = positions.last() {
        if (last - max_pos).abs() > EPSILON_GENERAL {
            positions.push(max_pos);
        }
    }

    positions.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    positions.dedup_by(|a, b| (*a - *b).abs() < EPSILON_GENERAL);
    positions
}

/// Score of one candidate position; lower (z, y, x) is better.
#[derive(Clone, Copy)]
struct PlacementScore {
    z: f64,
    y: f64,
    x: f64,
}

impl PlacementScore {
    fn is_better_than(&self, current: &Self) -> bool {
        match compare_with_epsilon(self.z, current.z, EPSILON_HEIGHT) {
            Ordering::Less => return true,
            Ordering::Greater => return false,
            Ordering::Equal => {}
        }
        match compare_with_epsilon(self.y, current.y, EPSILON_GENERAL) {
            Ordering::Less => return true,
            Ordering::Greater => return false,
            Ordering::Equal => {}
        }
        matches!(
            compare_with_epsilon(self.x, current.x, EPSILON_GENERAL),
            Ordering::Less
        )
    }
}

/// Compares two values with tolerance.
fn compare_with_epsilon(a: f64, b: f64, eps: f64) -> Ordering {
    if (a - b).abs() <= eps {
        Ordering::Equal
    } else if a < b {
        Ordering::Less
    } else {
        Ordering::Greater
    }
}

fn round_to(value: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(precision as i32);
    (value * factor).round() / factor
}

fn round_triple(triple: (f64, f64, f64), precision: u32) -> (f64, f64, f64) {
    (
        round_to(triple.0, precision),
        round_to(triple.1, precision),
        round_to(triple.2, precision),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, dims: (f64, f64, f64), weight: f64) -> Item {
        Item {
            name: name.to_string(),
            dims,
            weight,
        }
    }

    fn template(dims: (f64, f64, f64), max_weight: f64) -> ContainerTemplate {
        ContainerTemplate::new(dims, max_weight).unwrap()
    }

    #[test]
    fn single_item_lands_at_origin() {
        let result = GridPlacer
            .place(
                &template((20.0, 20.0, 20.0), 100.0),
                vec![item("A", (10.0, 10.0, 10.0), 5.0)],
                &PlacementConfig::default(),
            )
            .unwrap();

        assert!(result.unfitted.is_empty());
        assert_eq!(result.placed.len(), 1);
        assert_eq!(result.placed[0].position, (0.0, 0.0, 0.0));
    }

    #[test]
    fn eight_cubes_fill_container_two_overflow() {
        let items: Vec<Item> = (0..10).map(|_| item("Cube", (4.0, 4.0, 4.0), 1.0)).collect();
        let result = GridPlacer
            .place(
                &template((10.0, 10.0, 10.0), 100_000.0),
                items,
                &PlacementConfig::default(),
            )
            .unwrap();

        // Cube side 4 on a length-10 axis only fits twice per axis under the
        // default grid, so 8 fit and 2 stay unfitted.
        assert_eq!(result.placed.len(), 8);
        assert_eq!(result.unfitted.len(), 2);
    }

    #[test]
    fn placed_items_never_exceed_container_bounds() {
        let container = (10.0, 10.0, 10.0);
        let items: Vec<Item> = (0..10).map(|_| item("Cube", (4.0, 4.0, 4.0), 1.0)).collect();
        let result = GridPlacer
            .place(
                &template(container, 100_000.0),
                items,
                &PlacementConfig::default(),
            )
            .unwrap();

        for p in &result.placed {
            assert!(p.position.0 + p.dims.0 <= container.0 + EPSILON_GENERAL);
            assert!(p.position.1 + p.dims.1 <= container.1 + EPSILON_GENERAL);
            assert!(p.position.2 + p.dims.2 <= container.2 + EPSILON_GENERAL);
        }
    }

    #[test]
    fn placed_items_do_not_overlap() {
        let items: Vec<Item> = (0..10).map(|_| item("Cube", (4.0, 4.0, 4.0), 1.0)).collect();
        let result = GridPlacer
            .place(
                &template((10.0, 10.0, 10.0), 100_000.0),
                items,
                &PlacementConfig::default(),
            )
            .unwrap();

        for (i, a) in result.placed.iter().enumerate() {
            for b in result.placed.iter().skip(i + 1) {
                assert!(!intersects(a, b), "items at {:?} and {:?} overlap", a.position, b.position);
            }
        }
    }

    #[test]
    fn rotation_enables_fit() {
        let tpl = template((4.0, 10.0, 4.0), 100.0);
        let long_item = item("Beam", (10.0, 4.0, 4.0), 5.0);

        let no_rotation = PlacementConfig {
            allow_rotation: false,
            ..PlacementConfig::default()
        };
        let result = GridPlacer
            .place(&tpl, vec![long_item.clone()], &no_rotation)
            .unwrap();
        assert!(result.placed.is_empty());
        assert_eq!(result.unfitted.len(), 1);

        let with_rotation = PlacementConfig {
            allow_rotation: true,
            ..PlacementConfig::default()
        };
        let result = GridPlacer
            .place(&tpl, vec![long_item], &with_rotation)
            .unwrap();
        assert_eq!(result.placed.len(), 1);
        assert!(result.unfitted.is_empty());
        // Oriented dims differ from the declared ones.
        assert_eq!(result.placed[0].dims, (4.0, 10.0, 4.0));
    }

    #[test]
    fn weight_ceiling_limits_placement() {
        let items = vec![
            item("Heavy-1", (2.0, 2.0, 2.0), 60.0),
            item("Heavy-2", (2.0, 2.0, 2.0), 60.0),
        ];
        let result = GridPlacer
            .place(
                &template((10.0, 10.0, 10.0), 100.0),
                items,
                &PlacementConfig::default(),
            )
            .unwrap();

        assert_eq!(result.placed.len(), 1);
        assert_eq!(result.unfitted.len(), 1);
    }

    #[test]
    fn unfitted_preserves_input_order_despite_bigger_first() {
        // Three items too large to place at all; try order is by volume but
        // the unfitted list must come back in input order.
        let items = vec![
            item("First", (20.0, 20.0, 20.0), 1.0),
            item("Second", (30.0, 30.0, 30.0), 1.0),
            item("Third", (25.0, 25.0, 25.0), 1.0),
        ];
        let config = PlacementConfig {
            bigger_first: true,
            ..PlacementConfig::default()
        };
        let result = GridPlacer
            .place(&template((10.0, 10.0, 10.0), 100.0), items, &config)
            .unwrap();

        assert!(result.placed.is_empty());
        let names: Vec<&str> = result.unfitted.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["First", "Second", "Third"]);
    }

    #[test]
    fn conservation_placed_plus_unfitted_equals_input() {
        let items: Vec<Item> = (0..7)
            .map(|i| item(&format!("Item-{}", i), (4.0, 4.0, 4.0), 1.0))
            .collect();
        let result = GridPlacer
            .place(
                &template((10.0, 10.0, 10.0), 100_000.0),
                items.clone(),
                &PlacementConfig::default(),
            )
            .unwrap();

        assert_eq!(result.placed.len() + result.unfitted.len(), items.len());
    }

    #[test]
    fn coordinates_are_rounded_to_configured_precision() {
        let config = PlacementConfig {
            grid_step: 0.333,
            rounding_precision: 1,
            bigger_first: false,
            ..PlacementConfig::default()
        };
        let items = vec![
            item("A", (3.0, 3.0, 3.0), 1.0),
            item("B", (3.0, 3.0, 3.0), 1.0),
        ];
        let result = GridPlacer
            .place(&template((6.5, 3.0, 3.0), 100.0), items, &config)
            .unwrap();

        for p in &result.placed {
            for v in [p.position.0, p.position.1, p.position.2] {
                assert!(
                    ((v * 10.0).round() / 10.0 - v).abs() < 1e-12,
                    "coordinate {} not rounded to one decimal",
                    v
                );
            }
        }
    }

    #[test]
    fn rounding_cannot_push_a_placement_past_the_wall() {
        // Flush-right against a fractional wall sits at x = 6.006, which
        // would round up to 6.01 and overhang the container. The rounded
        // candidate must be rejected instead.
        let container = (10.006, 4.0, 4.0);
        let config = PlacementConfig {
            grid_step: 7.0,
            rounding_precision: 2,
            ..PlacementConfig::default()
        };
        let items = vec![
            item("A", (4.0, 4.0, 4.0), 1.0),
            item("B", (4.0, 4.0, 4.0), 1.0),
        ];
        let result = GridPlacer
            .place(&template(container, 100.0), items, &config)
            .unwrap();

        assert_eq!(result.placed.len(), 1);
        assert_eq!(result.unfitted.len(), 1);
        for p in &result.placed {
            assert!(p.position.0 + p.dims.0 <= container.0 + EPSILON_GENERAL);
            assert!(p.position.1 + p.dims.1 <= container.1 + EPSILON_GENERAL);
            assert!(p.position.2 + p.dims.2 <= container.2 + EPSILON_GENERAL);
        }
    }

    #[test]
    fn invalid_grid_step_is_an_engine_error() {
        let config = PlacementConfig {
            grid_step: 0.0,
            ..PlacementConfig::default()
        };
        let result = GridPlacer.place(
            &template((10.0, 10.0, 10.0), 100.0),
            vec![item("A", (1.0, 1.0, 1.0), 1.0)],
            &config,
        );
        assert!(result.is_err());
    }

    #[test]
    fn axis_positions_include_flush_right() {
        let positions = axis_positions(10.0, 4.0, 5.0);
        assert_eq!(positions, vec![0.0, 5.0, 6.0]);
    }

    #[test]
    fn orientations_collapse_for_cubes() {
        assert_eq!(orientations((4.0, 4.0, 4.0), true).len(), 1);
        assert_eq!(orientations((4.0, 4.0, 8.0), true).len(), 3);
        assert_eq!(orientations((2.0, 4.0, 8.0), true).len(), 6);
        assert_eq!(orientations((2.0, 4.0, 8.0), false).len(), 1);
    }
}
