//! Engine-independent descriptions of processing graphs.
//!
//! A graph is assembled with [`GraphBuilder`], validated into a [`GraphDesc`],
//! and handed to an [`AudioEngine`](crate::engine::AudioEngine) in one batch.

/// Builder and validated description.
pub mod builder;
/// Node ids, kinds, ports and the render context.
pub mod node;

pub use builder::{GraphBuilder, GraphDesc};
pub use node::{Connection, NodeDesc, NodeId, NodeKind, Param, Port, RenderCtx};
