//! Multi-container 3D packing service.
//!
//! Takes a container template and a list of box types (dimensions, weight,
//! quantity), decides how many containers are needed, and reports volumetric
//! utilization per container. The single-container placement algorithm is
//! consumed through the [`placement::PlacementEngine`] trait; everything
//! around it (expansion, validation, the overflow loop, aggregation) lives
//! in [`packer`].

pub mod api;
pub mod config;
pub mod geometry;
pub mod model;
pub mod packer;
pub mod placement;
pub mod types;
