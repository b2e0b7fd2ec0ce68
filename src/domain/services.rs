//! External services for the content stream aggregate.
//!
//! Services provide the read-only configuration (dimension space, node types)
//! and time to command handlers without coupling them to storage.

use crate::dimension::{ContentDimensionSource, InterDimensionalVariationGraph};
use crate::domain::types::TimestampUtc;
use crate::node_type::NodeTypeManager;
use std::sync::Arc;

/// Services injected into the aggregates for command handling.
#[derive(Debug, Clone)]
pub struct ContentRepositoryServices {
    pub variation_graph: Arc<InterDimensionalVariationGraph>,
    pub node_types: Arc<NodeTypeManager>,
    pub clock: RepositoryClock,
}

impl ContentRepositoryServices {
    pub fn new(dimensions: &ContentDimensionSource, node_types: NodeTypeManager) -> Self {
        Self {
            variation_graph: Arc::new(InterDimensionalVariationGraph::new(dimensions)),
            node_types: Arc::new(node_types),
            clock: RepositoryClock,
        }
    }
}

impl Default for ContentRepositoryServices {
    fn default() -> Self {
        Self::new(&ContentDimensionSource::default(), NodeTypeManager::default())
    }
}

/// Clock service for timestamp generation.
#[derive(Debug, Clone, Default)]
pub struct RepositoryClock;

impl RepositoryClock {
    /// Returns the current UTC timestamp.
    pub fn now(&self) -> TimestampUtc {
        TimestampUtc::now()
    }
}
