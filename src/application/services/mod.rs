//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on the I/O boundary trait `HierarchyStore`
//! but are themselves concrete structs, not traits.

mod hierarchy;
mod marked_set;
mod subtree;

pub use hierarchy::HierarchyService;
pub use marked_set::{
    MarkingOptions, PartialTreeBuilder, DEFAULT_NODE_THRESHOLD_LEAF, DEFAULT_NODE_THRESHOLD_TOTAL,
};
pub use subtree::{
    default_serializer, HtmlListTemplate, RenderContext, RenderedNode, SubtreeRenderer,
    SubtreeTemplate, TextTree, TreeArrayNode,
};
