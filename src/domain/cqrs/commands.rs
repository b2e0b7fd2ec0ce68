//! Content stream commands.
//!
//! Commands express intent. The aggregate validates them against the current
//! content graph and emits events. Node commands never carry the content
//! stream id: the stream is addressed by the aggregate id the command is
//! dispatched to, so the same command can be replayed onto another stream.

use crate::dimension::{DimensionSpacePoint, OriginDimensionSpacePoint};
use crate::domain::features::copying::{NodeAggregateIdMapping, NodeSubtreeSnapshot};
use crate::domain::properties::{NodeReference, PropertyValuesToWrite, SerializedPropertyValues};
use crate::domain::strategies::{
    NodeAggregateTypeChangeConflictResolutionStrategy, NodeVariantSelectionStrategy,
    RelationDistributionStrategy,
};
use crate::domain::types::{
    ContentStreamId, NodeAggregateId, NodeAggregateIdsByNodePaths, NodeName, NodeTypeName,
    PropertyName, ReferenceName, UserId,
};
use serde::{Deserialize, Serialize};

/// Who issued a command. Passed explicitly with every command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandContext {
    pub initiating_user_id: UserId,
}

impl CommandContext {
    pub fn new(initiating_user_id: UserId) -> Self {
        Self { initiating_user_id }
    }

    pub fn system() -> Self {
        Self::new(UserId::system())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateRootNodeAggregateWithNode {
    pub node_aggregate_id: NodeAggregateId,
    pub node_type_name: NodeTypeName,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateRootNodeAggregateDimensions {
    pub node_aggregate_id: NodeAggregateId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateNodeAggregateWithNode {
    pub node_aggregate_id: NodeAggregateId,
    pub node_type_name: NodeTypeName,
    pub origin_dimension_space_point: OriginDimensionSpacePoint,
    pub parent_node_aggregate_id: NodeAggregateId,
    #[serde(default)]
    pub succeeding_sibling_node_aggregate_id: Option<NodeAggregateId>,
    #[serde(default)]
    pub node_name: Option<NodeName>,
    #[serde(default)]
    pub initial_property_values: PropertyValuesToWrite,
    /// Ids for tethered descendants by path (`main`, `main/footer`); missing
    /// entries are derived from the new aggregate id.
    #[serde(default)]
    pub tethered_descendant_node_aggregate_ids: NodeAggregateIdsByNodePaths,
}

impl CreateNodeAggregateWithNode {
    pub fn new(
        node_aggregate_id: NodeAggregateId,
        node_type_name: NodeTypeName,
        origin_dimension_space_point: OriginDimensionSpacePoint,
        parent_node_aggregate_id: NodeAggregateId,
    ) -> Self {
        Self {
            node_aggregate_id,
            node_type_name,
            origin_dimension_space_point,
            parent_node_aggregate_id,
            succeeding_sibling_node_aggregate_id: None,
            node_name: None,
            initial_property_values: PropertyValuesToWrite::default(),
            tethered_descendant_node_aggregate_ids: NodeAggregateIdsByNodePaths::default(),
        }
    }

    pub fn with_node_name(mut self, node_name: NodeName) -> Self {
        self.node_name = Some(node_name);
        self
    }

    pub fn with_succeeding_sibling(mut self, sibling: NodeAggregateId) -> Self {
        self.succeeding_sibling_node_aggregate_id = Some(sibling);
        self
    }

    pub fn with_initial_property_values(mut self, values: PropertyValuesToWrite) -> Self {
        self.initial_property_values = values;
        self
    }

    pub fn with_tethered_descendant_ids(mut self, ids: NodeAggregateIdsByNodePaths) -> Self {
        self.tethered_descendant_node_aggregate_ids = ids;
        self
    }
}

/// Sets typed property values; `null` unsets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetNodeProperties {
    pub node_aggregate_id: NodeAggregateId,
    pub origin_dimension_space_point: OriginDimensionSpacePoint,
    pub property_values: PropertyValuesToWrite,
}

/// Sets already serialized values without type validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetSerializedNodeProperties {
    pub node_aggregate_id: NodeAggregateId,
    pub origin_dimension_space_point: OriginDimensionSpacePoint,
    pub property_values: SerializedPropertyValues,
    #[serde(default)]
    pub properties_to_unset: Vec<PropertyName>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetNodeReferences {
    pub source_node_aggregate_id: NodeAggregateId,
    pub source_origin_dimension_space_point: OriginDimensionSpacePoint,
    pub reference_name: ReferenceName,
    pub references: Vec<NodeReference>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveNodeAggregate {
    pub dimension_space_point: DimensionSpacePoint,
    pub node_aggregate_id: NodeAggregateId,
    #[serde(default)]
    pub new_parent_node_aggregate_id: Option<NodeAggregateId>,
    #[serde(default)]
    pub new_preceding_sibling_node_aggregate_id: Option<NodeAggregateId>,
    #[serde(default)]
    pub new_succeeding_sibling_node_aggregate_id: Option<NodeAggregateId>,
    pub relation_distribution_strategy: RelationDistributionStrategy,
}

/// Payload shared by disable and enable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToggleNodeAggregate {
    pub node_aggregate_id: NodeAggregateId,
    pub covered_dimension_space_point: DimensionSpacePoint,
    pub node_variant_selection_strategy: NodeVariantSelectionStrategy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoveNodeAggregate {
    pub node_aggregate_id: NodeAggregateId,
    pub covered_dimension_space_point: DimensionSpacePoint,
    pub node_variant_selection_strategy: NodeVariantSelectionStrategy,
    #[serde(default)]
    pub removal_attachment_point: Option<NodeAggregateId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestoreNodeAggregateCoverage {
    pub node_aggregate_id: NodeAggregateId,
    pub origin_dimension_space_point: OriginDimensionSpacePoint,
    pub dimension_space_point_to_cover: DimensionSpacePoint,
    pub with_specializations: bool,
    pub recursive: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeNodeAggregateType {
    pub node_aggregate_id: NodeAggregateId,
    pub new_node_type_name: NodeTypeName,
    pub strategy: NodeAggregateTypeChangeConflictResolutionStrategy,
    #[serde(default)]
    pub tethered_descendant_node_aggregate_ids: NodeAggregateIdsByNodePaths,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeNodeAggregateName {
    pub node_aggregate_id: NodeAggregateId,
    pub new_node_name: NodeName,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateNodeVariant {
    pub node_aggregate_id: NodeAggregateId,
    pub source_origin: OriginDimensionSpacePoint,
    pub target_origin: OriginDimensionSpacePoint,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CopyNodesRecursively {
    pub node_tree_to_insert: NodeSubtreeSnapshot,
    pub target_dimension_space_point: OriginDimensionSpacePoint,
    pub target_parent_node_aggregate_id: NodeAggregateId,
    #[serde(default)]
    pub target_succeeding_sibling_node_aggregate_id: Option<NodeAggregateId>,
    #[serde(default)]
    pub target_node_name: Option<NodeName>,
    pub node_aggregate_id_mapping: NodeAggregateIdMapping,
}

impl CopyNodesRecursively {
    /// Builds the command with freshly generated ids for every copied node.
    pub fn with_generated_ids(
        node_tree_to_insert: NodeSubtreeSnapshot,
        target_dimension_space_point: OriginDimensionSpacePoint,
        target_parent_node_aggregate_id: NodeAggregateId,
    ) -> Self {
        let node_aggregate_id_mapping = NodeAggregateIdMapping::generate_for(&node_tree_to_insert);
        Self {
            node_tree_to_insert,
            target_dimension_space_point,
            target_parent_node_aggregate_id,
            target_succeeding_sibling_node_aggregate_id: None,
            target_node_name: None,
            node_aggregate_id_mapping,
        }
    }
}

/// Payload shared by the dimension adjustment commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionAdjustment {
    pub source: DimensionSpacePoint,
    pub target: DimensionSpacePoint,
}

/// Commands accepted by the content stream aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentStreamCommand {
    // ===== Content stream lifecycle =====
    CreateContentStream {
        content_stream_id: ContentStreamId,
    },

    /// Start a stream whose history is the source's first `version_of_source_content_stream` events.
    /// The repository resolves the source version before dispatch.
    ForkContentStream {
        content_stream_id: ContentStreamId,
        source_content_stream_id: ContentStreamId,
        version_of_source_content_stream: usize,
    },

    /// Closed streams reject node commands until reopened.
    CloseContentStream,

    ReopenContentStream,

    /// Removed streams behave as if they never existed.
    RemoveContentStream,

    // ===== Node aggregates =====
    CreateRootNodeAggregateWithNode(CreateRootNodeAggregateWithNode),
    UpdateRootNodeAggregateDimensions(UpdateRootNodeAggregateDimensions),
    CreateNodeAggregateWithNode(CreateNodeAggregateWithNode),
    SetNodeProperties(SetNodeProperties),
    SetSerializedNodeProperties(SetSerializedNodeProperties),
    SetNodeReferences(SetNodeReferences),
    MoveNodeAggregate(MoveNodeAggregate),
    DisableNodeAggregate(ToggleNodeAggregate),
    EnableNodeAggregate(ToggleNodeAggregate),
    RemoveNodeAggregate(RemoveNodeAggregate),
    RestoreNodeAggregateCoverage(RestoreNodeAggregateCoverage),
    ChangeNodeAggregateType(ChangeNodeAggregateType),
    ChangeNodeAggregateName(ChangeNodeAggregateName),
    CreateNodeVariant(CreateNodeVariant),
    CopyNodesRecursively(CopyNodesRecursively),

    // ===== Dimension adjustment =====
    MoveDimensionSpacePoint(DimensionAdjustment),
    AddDimensionShineThrough(DimensionAdjustment),
}

impl ContentStreamCommand {
    /// Stable name recorded in event metadata.
    pub fn command_type(&self) -> &'static str {
        match self {
            Self::CreateContentStream { .. } => "CreateContentStream",
            Self::ForkContentStream { .. } => "ForkContentStream",
            Self::CloseContentStream => "CloseContentStream",
            Self::ReopenContentStream => "ReopenContentStream",
            Self::RemoveContentStream => "RemoveContentStream",
            Self::CreateRootNodeAggregateWithNode(_) => "CreateRootNodeAggregateWithNode",
            Self::UpdateRootNodeAggregateDimensions(_) => "UpdateRootNodeAggregateDimensions",
            Self::CreateNodeAggregateWithNode(_) => "CreateNodeAggregateWithNode",
            Self::SetNodeProperties(_) => "SetNodeProperties",
            Self::SetSerializedNodeProperties(_) => "SetSerializedNodeProperties",
            Self::SetNodeReferences(_) => "SetNodeReferences",
            Self::MoveNodeAggregate(_) => "MoveNodeAggregate",
            Self::DisableNodeAggregate(_) => "DisableNodeAggregate",
            Self::EnableNodeAggregate(_) => "EnableNodeAggregate",
            Self::RemoveNodeAggregate(_) => "RemoveNodeAggregate",
            Self::RestoreNodeAggregateCoverage(_) => "RestoreNodeAggregateCoverage",
            Self::ChangeNodeAggregateType(_) => "ChangeNodeAggregateType",
            Self::ChangeNodeAggregateName(_) => "ChangeNodeAggregateName",
            Self::CreateNodeVariant(_) => "CreateNodeVariant",
            Self::CopyNodesRecursively(_) => "CopyNodesRecursively",
            Self::MoveDimensionSpacePoint(_) => "MoveDimensionSpacePoint",
            Self::AddDimensionShineThrough(_) => "AddDimensionShineThrough",
        }
    }

    pub fn is_lifecycle_command(&self) -> bool {
        matches!(
            self,
            Self::CreateContentStream { .. }
                | Self::ForkContentStream { .. }
                | Self::CloseContentStream
                | Self::ReopenContentStream
                | Self::RemoveContentStream
        )
    }

    /// The node aggregate a node command addresses.
    pub fn node_aggregate_id(&self) -> Option<&NodeAggregateId> {
        match self {
            Self::CreateRootNodeAggregateWithNode(c) => Some(&c.node_aggregate_id),
            Self::UpdateRootNodeAggregateDimensions(c) => Some(&c.node_aggregate_id),
            Self::CreateNodeAggregateWithNode(c) => Some(&c.node_aggregate_id),
            Self::SetNodeProperties(c) => Some(&c.node_aggregate_id),
            Self::SetSerializedNodeProperties(c) => Some(&c.node_aggregate_id),
            Self::SetNodeReferences(c) => Some(&c.source_node_aggregate_id),
            Self::MoveNodeAggregate(c) => Some(&c.node_aggregate_id),
            Self::DisableNodeAggregate(c) | Self::EnableNodeAggregate(c) => Some(&c.node_aggregate_id),
            Self::RemoveNodeAggregate(c) => Some(&c.node_aggregate_id),
            Self::RestoreNodeAggregateCoverage(c) => Some(&c.node_aggregate_id),
            Self::ChangeNodeAggregateType(c) => Some(&c.node_aggregate_id),
            Self::ChangeNodeAggregateName(c) => Some(&c.node_aggregate_id),
            Self::CreateNodeVariant(c) => Some(&c.node_aggregate_id),
            Self::CopyNodesRecursively(c) => Some(&c.target_parent_node_aggregate_id),
            _ => None,
        }
    }

    /// Whether the command touches `node_aggregate_id`, optionally restricted
    /// to one dimension space point. Commands that carry no point match any.
    pub fn matches_node(
        &self,
        node_aggregate_id: &NodeAggregateId,
        dimension_space_point: Option<&DimensionSpacePoint>,
    ) -> bool {
        if self.node_aggregate_id() != Some(node_aggregate_id) {
            return false;
        }
        let Some(point) = dimension_space_point else {
            return true;
        };
        match self {
            Self::CreateNodeAggregateWithNode(c) => c.origin_dimension_space_point.as_dimension_space_point() == point,
            Self::SetNodeProperties(c) => c.origin_dimension_space_point.as_dimension_space_point() == point,
            Self::SetSerializedNodeProperties(c) => {
                c.origin_dimension_space_point.as_dimension_space_point() == point
            }
            Self::SetNodeReferences(c) => c.source_origin_dimension_space_point.as_dimension_space_point() == point,
            Self::MoveNodeAggregate(c) => &c.dimension_space_point == point,
            Self::DisableNodeAggregate(c) | Self::EnableNodeAggregate(c) => {
                &c.covered_dimension_space_point == point
            }
            Self::RemoveNodeAggregate(c) => &c.covered_dimension_space_point == point,
            Self::RestoreNodeAggregateCoverage(c) => &c.dimension_space_point_to_cover == point,
            Self::CreateNodeVariant(c) => {
                c.source_origin.as_dimension_space_point() == point
                    || c.target_origin.as_dimension_space_point() == point
            }
            Self::CopyNodesRecursively(c) => c.target_dimension_space_point.as_dimension_space_point() == point,
            _ => true,
        }
    }
}
