//! Data models for the container packing pipeline.
//!
//! This module defines the fundamental data structures:
//! - `ContainerTemplate`: the outer dimensions and weight ceiling shared by
//!   every container created for a request
//! - `BoxType`: one line of user input (dimensions, weight, quantity)
//! - `Item`: one physical unit derived from a box type
//! - `PlacedItem`: an item with its position and oriented dimensions
//! - `Container`: a created container holding placed items
//!
//! All structures implement the traits from the `types` module.

use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use utoipa::ToSchema;

use crate::types::{Dimensional, Vec3, Weighted};

/// Validation error for request data.
///
/// Every variant is detected before any packing attempt; no containers are
/// created once one of these surfaces.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    InvalidDimension(String),
    InvalidWeight(String),
    /// A box type exceeds the container template in at least one axis in its
    /// declared, unrotated orientation.
    OversizedBox {
        box_name: String,
    },
    /// Quantity is negative or non-integral.
    InvalidQuantity {
        box_name: String,
        quantity: f64,
    },
    /// A form field could not be parsed as a number.
    NonNumericField {
        field: String,
        value: String,
    },
    /// A required form field was absent.
    MissingField {
        field: String,
    },
    /// The parallel `box_*[]` form arrays have differing lengths.
    MismatchedBoxArrays {
        field: String,
        expected: usize,
        actual: usize,
    },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::InvalidDimension(msg) => write!(f, "Invalid dimension: {}", msg),
            ValidationError::InvalidWeight(msg) => write!(f, "Invalid weight: {}", msg),
            ValidationError::OversizedBox { box_name } => {
                write!(
                    f,
                    "Box '{}' exceeds the container dimensions in at least one axis",
                    box_name
                )
            }
            ValidationError::InvalidQuantity { box_name, quantity } => {
                write!(
                    f,
                    "Box '{}' has invalid quantity {}: must be a non-negative integer",
                    box_name, quantity
                )
            }
            ValidationError::NonNumericField { field, value } => {
                write!(f, "Field '{}' is not numeric: '{}'", field, value)
            }
            ValidationError::MissingField { field } => {
                write!(f, "Required field '{}' is missing", field)
            }
            ValidationError::MismatchedBoxArrays {
                field,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "Box field '{}' has {} entries, expected {}",
                    field, actual, expected
                )
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Helper function to validate a single dimension.
fn validate_dimension(value: f64, name: &str) -> Result<(), ValidationError> {
    if value <= 0.0 || value.is_nan() || value.is_infinite() {
        return Err(ValidationError::InvalidDimension(format!(
            "{} must be positive, got: {}",
            name, value
        )));
    }
    Ok(())
}

/// Helper function to validate a weight.
fn validate_weight_value(value: f64) -> Result<(), ValidationError> {
    if value <= 0.0 || value.is_nan() || value.is_infinite() {
        return Err(ValidationError::InvalidWeight(format!(
            "Weight must be positive, got: {}",
            value
        )));
    }
    Ok(())
}

/// Validates all three dimensions of a 3D object.
fn validate_dims(dims: (f64, f64, f64)) -> Result<(), ValidationError> {
    validate_dimension(dims.0, "Length")?;
    validate_dimension(dims.1, "Width")?;
    validate_dimension(dims.2, "Height")?;
    Ok(())
}

/// Immutable template for every container created during one request.
///
/// # Fields
/// * `dims` - Dimensions (length, width, height) of the container
/// * `max_weight` - Weight ceiling per container in kg
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ContainerTemplate {
    pub dims: (f64, f64, f64),
    pub max_weight: f64,
}

impl ContainerTemplate {
    /// Generous default weight ceiling, so that by default only geometric
    /// size, not total weight, limits a container.
    pub const DEFAULT_MAX_WEIGHT: f64 = 100_000.0;

    /// Creates a new container template with validation.
    ///
    /// # Returns
    /// `Ok(ContainerTemplate)` for valid values, otherwise `Err(ValidationError)`
    pub fn new(dims: (f64, f64, f64), max_weight: f64) -> Result<Self, ValidationError> {
        validate_dims(dims)?;
        validate_weight_value(max_weight)?;
        Ok(Self { dims, max_weight })
    }

    /// Instantiates an empty container with the given sequence number.
    pub fn instantiate(&self, id: usize) -> Container {
        Container {
            id,
            dims: self.dims,
            max_weight: self.max_weight,
            placed: Vec::new(),
        }
    }

    /// Returns the volume of the template.
    pub fn volume(&self) -> f64 {
        let (l, w, h) = self.dims;
        l * w * h
    }
}

impl Dimensional for ContainerTemplate {
    fn dimensions(&self) -> Vec3 {
        Vec3::from_tuple(self.dims)
    }
}

/// One line of user input: a box type with a requested quantity.
///
/// # Fields
/// * `name` - Display name of the box type
/// * `dims` - Dimensions (length, width, height)
/// * `weight` - Weight per unit in kg
/// * `quantity` - Requested number of units; kept as a raw number so the
///   item expander can reject negative or non-integral values explicitly
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct BoxType {
    pub name: String,
    #[schema(value_type = [f64; 3], example = json!([4.0, 4.0, 4.0]))]
    pub dims: (f64, f64, f64),
    pub weight: f64,
    pub quantity: f64,
}

impl BoxType {
    /// Creates a new box type with dimension and weight validation.
    ///
    /// Quantity is not validated here; the item expander owns that check.
    ///
    /// # Examples
    /// ```
    /// use loadplan::model::BoxType;
    ///
    /// let ok = BoxType::new("Cube", (4.0, 4.0, 4.0), 1.0, 10.0);
    /// assert!(ok.is_ok());
    ///
    /// let bad = BoxType::new("Cube", (-4.0, 4.0, 4.0), 1.0, 10.0);
    /// assert!(bad.is_err());
    /// ```
    pub fn new(
        name: impl Into<String>,
        dims: (f64, f64, f64),
        weight: f64,
        quantity: f64,
    ) -> Result<Self, ValidationError> {
        validate_dims(dims)?;
        validate_weight_value(weight)?;
        Ok(Self {
            name: name.into(),
            dims,
            weight,
            quantity,
        })
    }

    /// Calculates the volume of one unit.
    pub fn volume(&self) -> f64 {
        let (l, w, h) = self.dims;
        l * w * h
    }
}

impl Dimensional for BoxType {
    fn dimensions(&self) -> Vec3 {
        Vec3::from_tuple(self.dims)
    }
}

impl Weighted for BoxType {
    fn weight(&self) -> f64 {
        self.weight
    }
}

/// One physical unit to be packed, expanded from a box type.
///
/// Items from the same box type are value-equal but keep distinct identities
/// through their position in the expansion order, because placement is
/// order-sensitive.
#[derive(Clone, Debug, PartialEq)]
pub struct Item {
    pub name: String,
    pub dims: (f64, f64, f64),
    pub weight: f64,
}

impl Item {
    /// Calculates the volume of the item in its declared orientation.
    pub fn volume(&self) -> f64 {
        let (l, w, h) = self.dims;
        l * w * h
    }
}

impl Dimensional for Item {
    fn dimensions(&self) -> Vec3 {
        Vec3::from_tuple(self.dims)
    }
}

impl Weighted for Item {
    fn weight(&self) -> f64 {
        self.weight
    }
}

/// An item placed inside a container.
///
/// # Fields
/// * `item` - The original item
/// * `position` - Position (x, y, z) of the lower left front corner
/// * `dims` - Oriented dimensions; differ from `item.dims` when the
///   placement engine rotated the item
#[derive(Clone, Debug)]
pub struct PlacedItem {
    pub item: Item,
    pub position: (f64, f64, f64),
    pub dims: (f64, f64, f64),
}

impl PlacedItem {
    /// Calculates the volume of the oriented bounding box.
    pub fn volume(&self) -> f64 {
        let (l, w, h) = self.dims;
        l * w * h
    }
}

impl Dimensional for PlacedItem {
    fn dimensions(&self) -> Vec3 {
        Vec3::from_tuple(self.dims)
    }
}

impl Weighted for PlacedItem {
    fn weight(&self) -> f64 {
        self.item.weight
    }
}

/// A container created by the overflow orchestrator.
///
/// Immutable once the placement engine returns; never merged or split.
///
/// # Fields
/// * `id` - 1-based sequence number, strictly increasing per request
/// * `dims` - Template dimensions (length, width, height)
/// * `max_weight` - Weight ceiling inherited from the template
/// * `placed` - Placed items in placement order
#[derive(Clone, Debug)]
pub struct Container {
    pub id: usize,
    pub dims: (f64, f64, f64),
    pub max_weight: f64,
    pub placed: Vec<PlacedItem>,
}

impl Container {
    /// Calculates the total weight of all placed items.
    pub fn total_weight(&self) -> f64 {
        self.placed.iter().map(|p| p.item.weight).sum()
    }

    /// Calculates the packed volume (sum of oriented bounding boxes).
    pub fn used_volume(&self) -> f64 {
        self.placed.iter().map(|p| p.volume()).sum()
    }

    /// Calculates the total volume of the container.
    pub fn total_volume(&self) -> f64 {
        let (l, w, h) = self.dims;
        l * w * h
    }

    /// Calculates the volumetric utilization in percent.
    ///
    /// # Returns
    /// Percentage between 0.0 and 100.0; 0.0 when the container volume is 0
    pub fn utilization_percent(&self) -> f64 {
        let total = self.total_volume();
        if total <= 0.0 {
            return 0.0;
        }
        (self.used_volume() / total) * 100.0
    }

    /// Display name in the externally visible form.
    pub fn name(&self) -> String {
        format!("Container-{}", self.id)
    }
}

impl Dimensional for Container {
    fn dimensions(&self) -> Vec3 {
        Vec3::from_tuple(self.dims)
    }
}
