//! Core graph data structures

mod edge;
mod engine;
mod entity;
mod node;
mod viewer;


pub use edge::{Edge, EdgeId};
pub use engine::{GraphEngine, GraphError, GraphResult};
pub use entity::Entity;
pub use node::{props, Node, NodeId, Properties, PropertyValue};
pub use viewer::Viewer;
