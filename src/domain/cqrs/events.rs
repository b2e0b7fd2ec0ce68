//! Content stream events.
//!
//! Events are the single source of truth for a content stream. Folding a
//! stream's (composed) history over `ContentGraph::apply` reconstructs every
//! node aggregate deterministically.

use crate::dimension::{DimensionSpacePoint, DimensionSpacePointSet, OriginDimensionSpacePoint};
use crate::domain::properties::{NodeReference, SerializedPropertyValues};
use crate::domain::types::{
    ContentStreamId, NodeAggregateClassification, NodeAggregateId, NodeName, NodeTypeName,
    PropertyName, ReferenceName,
};
use cqrs_es::DomainEvent;
use serde::{Deserialize, Serialize};

/// Position of a node in one covered point: before `succeeding_sibling`, or last.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterdimensionalSibling {
    pub dimension_space_point: DimensionSpacePoint,
    pub succeeding_sibling: Option<NodeAggregateId>,
}

impl InterdimensionalSibling {
    pub fn new(dimension_space_point: DimensionSpacePoint, succeeding_sibling: Option<NodeAggregateId>) -> Self {
        Self {
            dimension_space_point,
            succeeding_sibling,
        }
    }
}

/// Events emitted by the content stream aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentStreamEvent {
    // ===== Content stream lifecycle =====
    ContentStreamWasCreated {
        content_stream_id: ContentStreamId,
    },

    /// The stream's history begins with the source's first `version_of_source_content_stream` events.
    ContentStreamWasForked {
        content_stream_id: ContentStreamId,
        source_content_stream_id: ContentStreamId,
        version_of_source_content_stream: usize,
    },

    ContentStreamWasClosed {
        content_stream_id: ContentStreamId,
    },

    ContentStreamWasReopened {
        content_stream_id: ContentStreamId,
    },

    ContentStreamWasRemoved {
        content_stream_id: ContentStreamId,
    },

    // ===== Node aggregates =====
    RootNodeAggregateWithNodeWasCreated {
        node_aggregate_id: NodeAggregateId,
        node_type_name: NodeTypeName,
        covered_dimension_space_points: DimensionSpacePointSet,
    },

    RootNodeAggregateDimensionsWereUpdated {
        node_aggregate_id: NodeAggregateId,
        covered_dimension_space_points: DimensionSpacePointSet,
    },

    /// One covered point of a newly created node; creation emits one per covered point.
    NodeAggregateWithNodeWasCreated {
        node_aggregate_id: NodeAggregateId,
        node_type_name: NodeTypeName,
        origin_dimension_space_point: OriginDimensionSpacePoint,
        covered_dimension_space_point: DimensionSpacePoint,
        parent_node_aggregate_id: NodeAggregateId,
        succeeding_sibling_node_aggregate_id: Option<NodeAggregateId>,
        node_name: Option<NodeName>,
        initial_property_values: SerializedPropertyValues,
        node_aggregate_classification: NodeAggregateClassification,
    },

    NodePropertiesWereSet {
        node_aggregate_id: NodeAggregateId,
        origin_dimension_space_point: OriginDimensionSpacePoint,
        property_values: SerializedPropertyValues,
        properties_to_unset: Vec<PropertyName>,
    },

    /// Replaces the reference set `reference_name` of the given variants.
    NodeReferencesWereSet {
        source_node_aggregate_id: NodeAggregateId,
        affected_source_origin_dimension_space_points: Vec<OriginDimensionSpacePoint>,
        reference_name: ReferenceName,
        references: Vec<NodeReference>,
    },

    NodeAggregateWasMoved {
        node_aggregate_id: NodeAggregateId,
        new_parent_node_aggregate_id: Option<NodeAggregateId>,
        succeeding_siblings: Vec<InterdimensionalSibling>,
    },

    NodeAggregateWasDisabled {
        node_aggregate_id: NodeAggregateId,
        affected_dimension_space_points: DimensionSpacePointSet,
    },

    NodeAggregateWasEnabled {
        node_aggregate_id: NodeAggregateId,
        affected_dimension_space_points: DimensionSpacePointSet,
    },

    /// Removes the aggregate and its descendants from the covered points.
    NodeAggregateWasRemoved {
        node_aggregate_id: NodeAggregateId,
        affected_occupied_dimension_space_points: Vec<OriginDimensionSpacePoint>,
        affected_covered_dimension_space_points: DimensionSpacePointSet,
        removal_attachment_point: Option<NodeAggregateId>,
    },

    /// Copies the hierarchy found at `source_dimension_space_point` to the affected points.
    NodeAggregateCoverageWasRestored {
        node_aggregate_id: NodeAggregateId,
        source_dimension_space_point: DimensionSpacePoint,
        affected_covered_dimension_space_points: DimensionSpacePointSet,
        recursive: bool,
    },

    NodeAggregateTypeWasChanged {
        node_aggregate_id: NodeAggregateId,
        new_node_type_name: NodeTypeName,
    },

    NodeAggregateNameWasChanged {
        node_aggregate_id: NodeAggregateId,
        new_node_name: NodeName,
    },

    // ===== Variation =====
    NodeSpecializationVariantWasCreated {
        node_aggregate_id: NodeAggregateId,
        source_origin: OriginDimensionSpacePoint,
        specialization_origin: OriginDimensionSpacePoint,
        specialization_siblings: Vec<InterdimensionalSibling>,
    },

    NodeGeneralizationVariantWasCreated {
        node_aggregate_id: NodeAggregateId,
        source_origin: OriginDimensionSpacePoint,
        generalization_origin: OriginDimensionSpacePoint,
        variant_siblings: Vec<InterdimensionalSibling>,
    },

    NodePeerVariantWasCreated {
        node_aggregate_id: NodeAggregateId,
        source_origin: OriginDimensionSpacePoint,
        peer_origin: OriginDimensionSpacePoint,
        peer_siblings: Vec<InterdimensionalSibling>,
    },

    // ===== Dimension adjustment =====
    DimensionSpacePointWasMoved {
        source: DimensionSpacePoint,
        target: DimensionSpacePoint,
    },

    DimensionShineThroughWasAdded {
        source: DimensionSpacePoint,
        target: DimensionSpacePoint,
    },
}

impl ContentStreamEvent {
    /// Lifecycle events describe the stream itself rather than its content.
    pub fn is_lifecycle_event(&self) -> bool {
        matches!(
            self,
            Self::ContentStreamWasCreated { .. }
                | Self::ContentStreamWasForked { .. }
                | Self::ContentStreamWasClosed { .. }
                | Self::ContentStreamWasReopened { .. }
                | Self::ContentStreamWasRemoved { .. }
        )
    }

    /// Whether the event carries content changes that publishing hands to the base.
    pub fn is_publishable(&self) -> bool {
        !self.is_lifecycle_event()
    }
}

impl DomainEvent for ContentStreamEvent {
    fn event_type(&self) -> String {
        match self {
            Self::ContentStreamWasCreated { .. } => "ContentStreamWasCreated".to_string(),
            Self::ContentStreamWasForked { .. } => "ContentStreamWasForked".to_string(),
            Self::ContentStreamWasClosed { .. } => "ContentStreamWasClosed".to_string(),
            Self::ContentStreamWasReopened { .. } => "ContentStreamWasReopened".to_string(),
            Self::ContentStreamWasRemoved { .. } => "ContentStreamWasRemoved".to_string(),
            Self::RootNodeAggregateWithNodeWasCreated { .. } => {
                "RootNodeAggregateWithNodeWasCreated".to_string()
            }
            Self::RootNodeAggregateDimensionsWereUpdated { .. } => {
                "RootNodeAggregateDimensionsWereUpdated".to_string()
            }
            Self::NodeAggregateWithNodeWasCreated { .. } => {
                "NodeAggregateWithNodeWasCreated".to_string()
            }
            Self::NodePropertiesWereSet { .. } => "NodePropertiesWereSet".to_string(),
            Self::NodeReferencesWereSet { .. } => "NodeReferencesWereSet".to_string(),
            Self::NodeAggregateWasMoved { .. } => "NodeAggregateWasMoved".to_string(),
            Self::NodeAggregateWasDisabled { .. } => "NodeAggregateWasDisabled".to_string(),
            Self::NodeAggregateWasEnabled { .. } => "NodeAggregateWasEnabled".to_string(),
            Self::NodeAggregateWasRemoved { .. } => "NodeAggregateWasRemoved".to_string(),
            Self::NodeAggregateCoverageWasRestored { .. } => {
                "NodeAggregateCoverageWasRestored".to_string()
            }
            Self::NodeAggregateTypeWasChanged { .. } => "NodeAggregateTypeWasChanged".to_string(),
            Self::NodeAggregateNameWasChanged { .. } => "NodeAggregateNameWasChanged".to_string(),
            Self::NodeSpecializationVariantWasCreated { .. } => {
                "NodeSpecializationVariantWasCreated".to_string()
            }
            Self::NodeGeneralizationVariantWasCreated { .. } => {
                "NodeGeneralizationVariantWasCreated".to_string()
            }
            Self::NodePeerVariantWasCreated { .. } => "NodePeerVariantWasCreated".to_string(),
            Self::DimensionSpacePointWasMoved { .. } => "DimensionSpacePointWasMoved".to_string(),
            Self::DimensionShineThroughWasAdded { .. } => {
                "DimensionShineThroughWasAdded".to_string()
            }
        }
    }

    fn event_version(&self) -> String {
        "1.0".to_string()
    }
}
