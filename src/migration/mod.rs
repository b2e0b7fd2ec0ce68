//! Content migrations.
//!
//! A migration is a list of steps. Each step selects content with filters and
//! applies transformations of exactly one shape:
//!
//! - global transformations run once per step (dimension space changes)
//! - node aggregate based transformations run once per matched aggregate
//! - node based transformations run once per matched node variant
//!
//! Transformations only derive commands. The runner dispatches them through
//! the repository, so every change is validated like any other command.

pub mod config;
pub mod filters;
pub mod registry;
pub mod runner;
pub mod transformations;

pub use config::{ComponentConfiguration, MigrationConfiguration, MigrationStepConfiguration};
pub use filters::Filter;
pub use registry::{build_filter, build_transformation};
pub use runner::{Migration, MigrationStep, StepTransformations};
pub use transformations::{
    GlobalTransformation, NodeAggregateTransformation, NodeTransformation, NodeVariantContext, Transformation,
};
