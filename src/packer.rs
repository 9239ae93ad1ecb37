//! Multi-container overflow packing.
//!
//! The pipeline for one request: expand box types into items, validate
//! admissibility against the container template, apply the ordering
//! strategy, then run the overflow loop that opens containers until every
//! item is placed. The single-container placement itself happens behind the
//! [`PlacementEngine`] trait; this module owns the container-creation
//! policy, the progress guard, and the per-container utilization reports.

use std::time::{Duration, Instant};

use serde::Serialize;
#[allow(unused_imports)]
use serde_json::json;
use utoipa::ToSchema;

use crate::model::{BoxType, Container, ContainerTemplate, Item, ValidationError};
use crate::placement::{PlacementConfig, PlacementEngine, PlacementError};
use crate::types::EPSILON_GENERAL;

/// Errors that abort a packing request.
///
/// There is no partial-success mode: a request either fully succeeds with a
/// complete container list or fails with one diagnostic. Nothing is retried.
#[derive(Debug)]
pub enum PackError {
    /// Bad input, detected before any placement work.
    Validation(ValidationError),
    /// An item could not be placed in a freshly created, empty container.
    UnpackableItem { item_name: String },
    /// One placement call exceeded the configured wall-clock budget.
    PlacementTimeout {
        container_id: usize,
        elapsed: Duration,
        budget: Duration,
    },
    /// The placement engine reported an internal failure.
    Placement(PlacementError),
}

impl std::fmt::Display for PackError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PackError::Validation(err) => write!(f, "{}", err),
            PackError::UnpackableItem { item_name } => {
                write!(
                    f,
                    "Item '{}' cannot be placed in an empty container",
                    item_name
                )
            }
            PackError::PlacementTimeout {
                container_id,
                elapsed,
                budget,
            } => {
                write!(
                    f,
                    "Placement for container {} took {:?}, budget is {:?}",
                    container_id, elapsed, budget
                )
            }
            PackError::Placement(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for PackError {}

impl From<ValidationError> for PackError {
    fn from(err: ValidationError) -> Self {
        PackError::Validation(err)
    }
}

impl From<PlacementError> for PackError {
    fn from(err: PlacementError) -> Self {
        PackError::Placement(err)
    }
}

/// Pre-sort applied to the item sequence before placement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PackingStrategy {
    /// Identity order.
    #[default]
    None,
    /// Stable sort by item volume, descending.
    BestFit,
}

impl PackingStrategy {
    /// Parses a strategy name.
    ///
    /// Unknown names deliberately fall back to `None` instead of failing;
    /// the request-facing flag is advisory.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "best_fit" => PackingStrategy::BestFit,
            _ => PackingStrategy::None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PackingStrategy::None => "none",
            PackingStrategy::BestFit => "best_fit",
        }
    }
}

/// Per-request packing options, assembled from config defaults plus
/// request-level overrides.
#[derive(Clone, Copy, Debug, Default)]
pub struct PackOptions {
    pub placement: PlacementConfig,
    pub strategy: PackingStrategy,
    /// Wall-clock budget per placement call; `None` disables the check.
    pub placement_timeout: Option<Duration>,
}

/// Turns box types into the flat ordered item sequence.
///
/// Each box type contributes exactly `quantity` items in input order; a
/// quantity of 0 contributes nothing.
///
/// # Errors
/// `ValidationError::InvalidQuantity` if a quantity is negative or
/// non-integral (NaN and infinite values count as non-integral).
pub fn expand_box_types(box_types: &[BoxType]) -> Result<Vec<Item>, ValidationError> {
    let mut items = Vec::new();
    for box_type in box_types {
        let quantity = box_type.quantity;
        if !quantity.is_finite() || quantity < 0.0 || quantity.fract() != 0.0 {
            return Err(ValidationError::InvalidQuantity {
                box_name: box_type.name.clone(),
                quantity,
            });
        }
        for _ in 0..(quantity as usize) {
            items.push(Item {
                name: box_type.name.clone(),
                dims: box_type.dims,
                weight: box_type.weight,
            });
        }
    }
    Ok(items)
}

/// Rejects the request on the first box type that exceeds the template in
/// its declared, unrotated orientation.
///
/// Rotation is a placement-time concern; this check only rejects boxes whose
/// declared axes already rule them out, so it never creates false negatives
/// for the placement engine.
pub fn check_admissibility(
    template: &ContainerTemplate,
    box_types: &[BoxType],
) -> Result<(), ValidationError> {
    for box_type in box_types {
        let (l, w, h) = box_type.dims;
        let (tl, tw, th) = template.dims;
        if l > tl + EPSILON_GENERAL || w > tw + EPSILON_GENERAL || h > th + EPSILON_GENERAL {
            return Err(ValidationError::OversizedBox {
                box_name: box_type.name.clone(),
            });
        }
    }
    Ok(())
}

/// Applies the ordering strategy to the item sequence.
pub fn apply_strategy(mut items: Vec<Item>, strategy: PackingStrategy) -> Vec<Item> {
    match strategy {
        PackingStrategy::None => items,
        PackingStrategy::BestFit => {
            items.sort_by(|a, b| {
                b.volume()
                    .partial_cmp(&a.volume())
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            items
        }
    }
}

/// Outcome of a fully packed request.
#[derive(Clone, Debug)]
pub struct PackOutcome {
    pub containers: Vec<Container>,
    /// Number of items produced by the expander; every one of them sits in
    /// exactly one container.
    pub item_count: usize,
}

/// Packs a whole request: validate, expand, order, then overflow-pack.
///
/// # Errors
/// Any [`PackError`]; no containers survive a failure.
pub fn pack(
    template: &ContainerTemplate,
    box_types: &[BoxType],
    options: &PackOptions,
    engine: &dyn PlacementEngine,
) -> Result<PackOutcome, PackError> {
    check_admissibility(template, box_types)?;
    let items = expand_box_types(box_types)?;
    let items = apply_strategy(items, options.strategy);
    let item_count = items.len();
    let containers = orchestrate(template, items, options, engine)?;
    Ok(PackOutcome {
        containers,
        item_count,
    })
}

/// The overflow loop: open containers until every item is placed.
///
/// Each iteration instantiates container `len+1` from the template, hands
/// the remaining items to the placement engine and continues with the
/// unfitted tail. The engine guarantees that placed and unfitted together
/// account for every input item exactly once.
///
/// Termination: every iteration must place at least one item. A fresh,
/// empty container that places nothing means the offending item can never
/// fit, and the loop fails with [`PackError::UnpackableItem`] instead of
/// diverging.
fn orchestrate(
    template: &ContainerTemplate,
    items: Vec<Item>,
    options: &PackOptions,
    engine: &dyn PlacementEngine,
) -> Result<Vec<Container>, PackError> {
    let mut remaining = items;
    let mut containers: Vec<Container> = Vec::new();

    while !remaining.is_empty() {
        let id = containers.len() + 1;
        let mut container = template.instantiate(id);

        let before = Instant::now();
        let placement = engine.place(template, remaining, &options.placement)?;
        if let Some(budget) = options.placement_timeout {
            let elapsed = before.elapsed();
            if elapsed > budget {
                return Err(PackError::PlacementTimeout {
                    container_id: id,
                    elapsed,
                    budget,
                });
            }
        }

        if placement.placed.is_empty() {
            let item_name = placement
                .unfitted
                .first()
                .map(|item| item.name.clone())
                .unwrap_or_default();
            return Err(PackError::UnpackableItem { item_name });
        }

        container.placed = placement.placed;
        containers.push(container);
        remaining = placement.unfitted;
    }

    Ok(containers)
}

/// One placed item in the externally visible result.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct PackedItemReport {
    pub name: String,
    #[schema(value_type = [f64; 3], example = json!([0.0, 0.0, 0.0]))]
    pub position: (f64, f64, f64),
    /// Oriented dimensions; differ from the declared ones when rotated.
    #[schema(value_type = [f64; 3], example = json!([4.0, 4.0, 4.0]))]
    pub dims: (f64, f64, f64),
}

/// Per-container result, in creation order.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct ContainerReport {
    pub container_name: String,
    /// Volumetric utilization, rounded to two decimal places.
    pub utilization_percent: f64,
    #[schema(value_type = [f64; 3], example = json!([10.0, 10.0, 10.0]))]
    pub container_dims: (f64, f64, f64),
    /// Placed items; omitted when the request was not verbose.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub packed_items: Option<Vec<PackedItemReport>>,
}

/// Builds one report per container, preserving creation order.
///
/// `verbose` controls whether per-item placement data is included.
pub fn aggregate(containers: &[Container], verbose: bool) -> Vec<ContainerReport> {
    containers
        .iter()
        .map(|container| {
            let utilization = round_two_decimals(container.utilization_percent());
            let packed_items = verbose.then(|| {
                container
                    .placed
                    .iter()
                    .map(|p| PackedItemReport {
                        name: p.item.name.clone(),
                        position: p.position,
                        dims: p.dims,
                    })
                    .collect()
            });
            ContainerReport {
                container_name: container.name(),
                utilization_percent: utilization,
                container_dims: container.dims,
                packed_items,
            }
        })
        .collect()
}

fn round_two_decimals(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
