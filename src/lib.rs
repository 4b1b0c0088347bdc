//! marktree: partial tree marking and lazy expansion for large hierarchies
//!
//! A [`PartialTreeBuilder`](application::services::PartialTreeBuilder) decides
//! which nodes of a possibly huge hierarchy to show: it expands breadth-first
//! until a node budget is spent, collapses nodes with too many children, and
//! can later expand single nodes on demand or open the path down to one node.
//! The marked portion is rendered through
//! [`SubtreeRenderer`](application::services::SubtreeRenderer) as a view model,
//! HTML lists, nested JSON or a terminal tree.
//!
//! Layers:
//! - `domain`: nodes, filters, mark bookkeeping, view model
//! - `application`: marking, rendering and navigation services
//! - `infrastructure`: hierarchy stores, loaders, DI container
//! - `cli`: command line front end

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
