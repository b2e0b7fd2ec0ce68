//! Dimension space: the coordinate system of content variance.
//!
//! A repository declares its dimensions (for example `language`) with value
//! trees. The allowed combinations of values form the dimension space; the
//! variation graph relates those points by generalization and specialization.

pub mod point;
pub mod source;
pub mod variation_graph;

pub use point::{DimensionSpacePoint, DimensionSpacePointSet, OriginDimensionSpacePoint};
pub use source::{
    ContentDimension, ContentDimensionConfig, ContentDimensionSource, ContentDimensionValue,
    DimensionValueConfig,
};
pub use variation_graph::{InterDimensionalVariationGraph, VariantType};

#[cfg(test)]
#[path = "tests/point_tests.rs"]
mod tests;
