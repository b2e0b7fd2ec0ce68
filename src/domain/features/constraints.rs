//! Precondition checks shared by the node command handlers.

use crate::dimension::{DimensionSpacePoint, DimensionSpacePointSet, OriginDimensionSpacePoint};
use crate::domain::cqrs::ContentStreamData;
use crate::domain::errors::ContentRepositoryError;
use crate::domain::node_aggregate::NodeAggregate;
use crate::domain::services::ContentRepositoryServices;
use crate::domain::types::{NodeAggregateId, NodeName, NodeTypeName};
use crate::node_type::NodeType;

impl ContentStreamData {
    pub(crate) fn require_node_aggregate(&self, id: &NodeAggregateId) -> Result<&NodeAggregate, ContentRepositoryError> {
        self.graph()
            .node_aggregate(id)
            .ok_or_else(|| ContentRepositoryError::NodeAggregateCurrentlyDoesNotExist {
                node_aggregate_id: id.clone(),
            })
    }

    pub(crate) fn require_node_aggregate_to_not_exist(&self, id: &NodeAggregateId) -> Result<(), ContentRepositoryError> {
        match self.graph().node_aggregate(id) {
            Some(_) => Err(ContentRepositoryError::NodeAggregateCurrentlyExists {
                node_aggregate_id: id.clone(),
            }),
            None => Ok(()),
        }
    }

    /// The parent's type must allow `node_type`. Below a tethered parent, the
    /// grandparents' constraints for that tethered child apply instead.
    pub(crate) fn require_constraints_imposed_by_ancestors(
        &self,
        services: &ContentRepositoryServices,
        node_type: &NodeType,
        node_name: Option<&NodeName>,
        parent_id: &NodeAggregateId,
    ) -> Result<(), ContentRepositoryError> {
        let parent = self.require_node_aggregate(parent_id)?;
        if !parent.is_tethered() {
            if let Some(parent_type) = services.node_types.get(parent.node_type_name()) {
                require_parent_type_allows(parent_type, node_name, node_type)?;
            }
        }
        for grandparent in self.graph().parent_aggregates(parent_id) {
            let (Some(grandparent_type), Some(parent_name)) =
                (services.node_types.get(grandparent.node_type_name()), parent.node_name())
            else {
                continue;
            };
            if !grandparent_type.allows_grandchild_node_type(parent_name, node_type) {
                return Err(ContentRepositoryError::NodeConstraintViolation {
                    message: format!(
                        "node type '{}' is not allowed below tethered child '{}' of '{}'",
                        node_type.name(),
                        parent_name,
                        grandparent_type.name()
                    ),
                });
            }
        }
        Ok(())
    }

    /// No other child of `parent_id` named `node_name` may cover any of `points`.
    pub(crate) fn require_node_name_to_be_uncovered(
        &self,
        node_name: &NodeName,
        parent_id: &NodeAggregateId,
        points: &DimensionSpacePointSet,
        except: Option<&NodeAggregateId>,
    ) -> Result<(), ContentRepositoryError> {
        let covered = self
            .graph()
            .child_aggregates_by_name(parent_id, node_name)
            .into_iter()
            .filter(|c| Some(c.id()) != except)
            .any(|c| points.iter().any(|p| c.covers(p) && c.parent_in(p) == Some(parent_id)));
        if covered {
            return Err(ContentRepositoryError::NodeNameIsAlreadyCovered {
                node_name: node_name.clone(),
                parent_node_aggregate_id: parent_id.clone(),
            });
        }
        Ok(())
    }

    /// `child_id` hangs below `parent_id` in `point`.
    pub(crate) fn require_node_aggregate_to_be_child(
        &self,
        child_id: &NodeAggregateId,
        parent_id: &NodeAggregateId,
        point: &DimensionSpacePoint,
    ) -> Result<(), ContentRepositoryError> {
        let child = self.require_node_aggregate(child_id)?;
        if child.parent_in(point) != Some(parent_id) {
            return Err(ContentRepositoryError::NodeConstraintViolation {
                message: format!("'{}' is no child of '{}' in {}", child_id, parent_id, point),
            });
        }
        Ok(())
    }

    /// `sibling_id` shares its parent with `reference_id` in `point`.
    pub(crate) fn require_node_aggregate_to_be_sibling(
        &self,
        reference_id: &NodeAggregateId,
        sibling_id: &NodeAggregateId,
        point: &DimensionSpacePoint,
    ) -> Result<(), ContentRepositoryError> {
        let reference = self.require_node_aggregate(reference_id)?;
        match reference.parent_in(point) {
            Some(parent) => self.require_node_aggregate_to_be_child(sibling_id, parent, point),
            None => Err(ContentRepositoryError::NodeConstraintViolation {
                message: format!("'{}' has no siblings in {}", reference_id, point),
            }),
        }
    }
}

pub(crate) fn require_node_type<'a>(
    services: &'a ContentRepositoryServices,
    name: &NodeTypeName,
) -> Result<&'a NodeType, ContentRepositoryError> {
    services.node_types.require(name)
}

pub(crate) fn require_node_type_to_not_be_abstract(node_type: &NodeType) -> Result<(), ContentRepositoryError> {
    if node_type.is_abstract() {
        return Err(ContentRepositoryError::NodeTypeIsAbstract {
            node_type_name: node_type.name().clone(),
        });
    }
    Ok(())
}

pub(crate) fn require_node_type_to_be_of_type_root(node_type: &NodeType) -> Result<(), ContentRepositoryError> {
    if !node_type.is_root() {
        return Err(ContentRepositoryError::NodeTypeIsNotOfTypeRoot {
            node_type_name: node_type.name().clone(),
        });
    }
    Ok(())
}

pub(crate) fn require_node_type_to_not_be_of_type_root(node_type: &NodeType) -> Result<(), ContentRepositoryError> {
    if node_type.is_root() {
        return Err(ContentRepositoryError::NodeTypeIsOfTypeRoot {
            node_type_name: node_type.name().clone(),
        });
    }
    Ok(())
}

pub(crate) fn require_node_aggregate_to_not_be_root(aggregate: &NodeAggregate) -> Result<(), ContentRepositoryError> {
    if aggregate.is_root() {
        return Err(ContentRepositoryError::NodeAggregateIsRoot {
            node_aggregate_id: aggregate.id().clone(),
        });
    }
    Ok(())
}

pub(crate) fn require_node_aggregate_to_be_untethered(aggregate: &NodeAggregate) -> Result<(), ContentRepositoryError> {
    if aggregate.is_tethered() {
        return Err(ContentRepositoryError::NodeAggregateIsTethered {
            node_aggregate_id: aggregate.id().clone(),
        });
    }
    Ok(())
}

pub(crate) fn require_node_aggregate_to_cover(
    aggregate: &NodeAggregate,
    point: &DimensionSpacePoint,
) -> Result<(), ContentRepositoryError> {
    if !aggregate.covers(point) {
        return Err(ContentRepositoryError::NodeAggregateDoesCurrentlyNotCoverDimensionSpacePoint {
            node_aggregate_id: aggregate.id().clone(),
            dimension_space_point: point.clone(),
        });
    }
    Ok(())
}

pub(crate) fn require_node_aggregate_to_cover_all(
    aggregate: &NodeAggregate,
    points: &DimensionSpacePointSet,
) -> Result<(), ContentRepositoryError> {
    points
        .iter()
        .try_for_each(|point| require_node_aggregate_to_cover(aggregate, point))
}

pub(crate) fn require_node_aggregate_to_occupy(
    aggregate: &NodeAggregate,
    origin: &OriginDimensionSpacePoint,
) -> Result<(), ContentRepositoryError> {
    if !aggregate.occupies(origin) {
        return Err(ContentRepositoryError::NodeAggregateDoesCurrentlyNotOccupyDimensionSpacePoint {
            node_aggregate_id: aggregate.id().clone(),
            origin: origin.clone(),
        });
    }
    Ok(())
}

pub(crate) fn require_node_aggregate_to_not_occupy(
    aggregate: &NodeAggregate,
    origin: &OriginDimensionSpacePoint,
) -> Result<(), ContentRepositoryError> {
    if aggregate.occupies(origin) {
        return Err(ContentRepositoryError::DimensionSpacePointIsAlreadyOccupied {
            node_aggregate_id: aggregate.id().clone(),
            origin: origin.clone(),
        });
    }
    Ok(())
}

/// The parent type must allow the child type, and a name the parent reserves
/// for a tethered child must be used with exactly that child's type.
fn require_parent_type_allows(
    parent_type: &NodeType,
    node_name: Option<&NodeName>,
    node_type: &NodeType,
) -> Result<(), ContentRepositoryError> {
    if !parent_type.allows_child_node_type(node_type) {
        return Err(ContentRepositoryError::NodeConstraintViolation {
            message: format!(
                "node type '{}' is not allowed for child nodes of type '{}'",
                node_type.name(),
                parent_type.name()
            ),
        });
    }
    if let Some(name) = node_name {
        if let Some(tethered_type) = parent_type.type_of_tethered_node(name) {
            if &tethered_type != node_type.name() {
                return Err(ContentRepositoryError::NodeConstraintViolation {
                    message: format!(
                        "node type '{}' does not match '{}' declared for tethered child '{}' of '{}'",
                        node_type.name(),
                        tethered_type,
                        name,
                        parent_type.name()
                    ),
                });
            }
        }
    }
    Ok(())
}
