//! Property modification.

use super::constraints::{require_node_aggregate_to_occupy, require_node_type};
use super::HandlerResult;
use crate::domain::cqrs::commands::{SetNodeProperties, SetSerializedNodeProperties};
use crate::domain::cqrs::{ContentStreamData, ContentStreamEvent};
use crate::domain::errors::ContentRepositoryError;
use crate::domain::properties::{PropertyValuesToWrite, SerializedPropertyValue, SerializedPropertyValues};
use crate::domain::services::ContentRepositoryServices;
use crate::node_type::NodeType;

impl ContentStreamData {
    pub(crate) fn handle_set_node_properties(
        &self,
        command: SetNodeProperties,
        services: &ContentRepositoryServices,
    ) -> HandlerResult {
        let aggregate = self.require_node_aggregate(&command.node_aggregate_id)?;
        require_node_aggregate_to_occupy(aggregate, &command.origin_dimension_space_point)?;
        let node_type = require_node_type(services, aggregate.node_type_name())?;
        let property_values = serialize_property_values(node_type, &command.property_values)?;

        Ok(vec![ContentStreamEvent::NodePropertiesWereSet {
            node_aggregate_id: command.node_aggregate_id,
            origin_dimension_space_point: command.origin_dimension_space_point,
            property_values,
            properties_to_unset: command.property_values.names_to_unset(),
        }])
    }

    pub(crate) fn handle_set_serialized_node_properties(&self, command: SetSerializedNodeProperties) -> HandlerResult {
        let aggregate = self.require_node_aggregate(&command.node_aggregate_id)?;
        require_node_aggregate_to_occupy(aggregate, &command.origin_dimension_space_point)?;

        Ok(vec![ContentStreamEvent::NodePropertiesWereSet {
            node_aggregate_id: command.node_aggregate_id,
            origin_dimension_space_point: command.origin_dimension_space_point,
            property_values: command.property_values,
            properties_to_unset: command.properties_to_unset,
        }])
    }
}

/// Validates `values` against the declarations of `node_type` and pairs every
/// non-null value with its declared type. Null values are validated for
/// declaration only; they become unsets.
pub(crate) fn serialize_property_values(
    node_type: &NodeType,
    values: &PropertyValuesToWrite,
) -> Result<SerializedPropertyValues, ContentRepositoryError> {
    let mut serialized = SerializedPropertyValues::new();
    for (name, value) in values.iter() {
        let declaration = node_type
            .property(name)
            .ok_or_else(|| ContentRepositoryError::PropertyCannotBeSet {
                property_name: name.clone(),
                node_type_name: node_type.name().clone(),
                reason: "the property is not declared".to_string(),
            })?;
        if value.is_null() {
            continue;
        }
        if !declaration.accepts(value) {
            return Err(ContentRepositoryError::PropertyCannotBeSet {
                property_name: name.clone(),
                node_type_name: node_type.name().clone(),
                reason: format!("value {} does not match type '{}'", value, declaration.type_name),
            });
        }
        serialized.insert(
            name.clone(),
            SerializedPropertyValue::new(value.clone(), &declaration.type_name),
        );
    }
    Ok(serialized)
}
