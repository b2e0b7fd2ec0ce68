//! Node types: schema for nodes, their properties, references and children.

pub mod manager;
pub mod definition;

pub use manager::NodeTypeManager;
pub use definition::{
    ChildNodeDeclaration, ConstraintsDeclaration, NodeType, NodeTypeDeclaration,
    PropertyDeclaration, ReferenceConstraints, ReferenceDeclaration,
};
