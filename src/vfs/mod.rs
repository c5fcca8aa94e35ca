pub mod document;
pub mod tree;
pub mod versions;

pub use document::{Document, NodeDoc};
pub use tree::{NodeId, NodeKind, NodeSlot, Tree};
