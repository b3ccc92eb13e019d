// Scene graph

mod graph;
mod node;

pub use graph::{NodeArena, Scene};
pub use node::{Node, NodeBehavior, NodeId, Surface, TickContext};
