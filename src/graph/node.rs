use crate::engine::scheduler::Grain;

/// Handle to a node inside a [`GraphDesc`](super::GraphDesc).
///
/// Ids are indices into the description's node list and are only meaningful
/// for the graph that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A modulatable parameter on a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Param {
    /// Multiplier of a gain node.
    Gain,
    /// Delay time of a delay node, in seconds.
    DelayTime,
}

/// Destination of a connection.
///
/// Audio ports sum into a node's signal input. Param ports sum into the
/// parameter's intrinsic value, sample by sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Port {
    Audio(NodeId),
    Param(NodeId, Param),
}

impl Port {
    pub fn node(self) -> NodeId {
        match self {
            Port::Audio(id) | Port::Param(id, _) => id,
        }
    }
}

/// What a node does.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// The effect's signal input, fed by the host.
    Input,
    /// The effect's signal output, summing everything connected to it.
    Output,
    /// Scales its input by `gain` plus any param modulation.
    Gain { gain: f32 },
    /// Delays its input by `delay_time` plus any param modulation, clamped to `max_delay`.
    Delay { max_delay: f32, delay_time: f32 },
    /// Plays a buffer from a scheduled start time, looping or once.
    Player(Grain),
}

impl NodeKind {
    pub fn accepts_audio(&self) -> bool {
        matches!(self, NodeKind::Output | NodeKind::Gain { .. } | NodeKind::Delay { .. })
    }

    pub fn accepts_param(&self, param: Param) -> bool {
        matches!(
            (self, param),
            (NodeKind::Gain { .. }, Param::Gain) | (NodeKind::Delay { .. }, Param::DelayTime)
        )
    }

    pub fn produces_output(&self) -> bool {
        !matches!(self, NodeKind::Output)
    }
}

/// A node plus a label for logs and debugging.
#[derive(Debug, Clone)]
pub struct NodeDesc {
    pub label: &'static str,
    pub kind: NodeKind,
}

/// An edge from a node's output to a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connection {
    pub from: NodeId,
    pub to: Port,
}

/// Context handed to the renderer for one block.
#[derive(Debug, Clone, Copy)]
pub struct RenderCtx {
    pub sample_rate: f32,
    /// Frame index of the first sample in the block.
    pub frame: u64,
}

impl RenderCtx {
    pub fn new(sample_rate: f32, frame: u64) -> Self {
        Self { sample_rate, frame }
    }
}
