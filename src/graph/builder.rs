use std::collections::VecDeque;

use crate::{
    engine::scheduler::Grain,
    error::{Result, ShiftError},
    graph::node::{Connection, NodeDesc, NodeId, NodeKind, Port},
};

/*
Declarative Graph Description
=============================

The shifter never touches a live engine while it wires itself up. It first
describes every node and connection in a `GraphDesc`, and the engine realizes
that description in one batch, so the wiring can be checked with no audio
running.

    let mut graph = GraphBuilder::new();
    let amp = graph.gain("amp", 0.5);
    graph.connect(graph.input(), Port::Audio(amp));
    graph.connect(amp, Port::Audio(graph.output()));
    let desc = graph.build()?;

Every graph has exactly one Input and one Output node, created by
`GraphBuilder::new`.

Validation rules
----------------

  - both ends of a connection must exist
  - Output has no outgoing connections
  - Audio ports only on Output, Gain and Delay
  - Param ports only where the node has that param (Gain::Gain,
    Delay::DelayTime)
  - no cycles: nodes are rendered in topological order, each block
*/

/// Incrementally assembles a [`GraphDesc`].
#[derive(Debug, Clone)]
pub struct GraphBuilder {
    nodes: Vec<NodeDesc>,
    connections: Vec<Connection>,
    input: NodeId,
    output: NodeId,
}

impl GraphBuilder {
    pub fn new() -> Self {
        let nodes = vec![
            NodeDesc {
                label: "input",
                kind: NodeKind::Input,
            },
            NodeDesc {
                label: "output",
                kind: NodeKind::Output,
            },
        ];

        Self {
            nodes,
            connections: Vec::new(),
            input: NodeId(0),
            output: NodeId(1),
        }
    }

    pub fn input(&self) -> NodeId {
        self.input
    }

    pub fn output(&self) -> NodeId {
        self.output
    }

    fn add(&mut self, label: &'static str, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeDesc { label, kind });
        id
    }

    /// Gain node with an initial intrinsic gain.
    pub fn gain(&mut self, label: &'static str, gain: f32) -> NodeId {
        self.add(label, NodeKind::Gain { gain })
    }

    /// Delay node able to hold `max_delay` seconds.
    pub fn delay(&mut self, label: &'static str, max_delay: f32) -> NodeId {
        self.add(
            label,
            NodeKind::Delay {
                max_delay,
                delay_time: 0.0,
            },
        )
    }

    /// Buffer player started according to `grain`.
    pub fn player(&mut self, label: &'static str, grain: Grain) -> NodeId {
        self.add(label, NodeKind::Player(grain))
    }

    pub fn connect(&mut self, from: NodeId, to: Port) -> &mut Self {
        self.connections.push(Connection { from, to });
        self
    }

    /// Validate and freeze the description.
    pub fn build(self) -> Result<GraphDesc> {
        let desc = GraphDesc {
            nodes: self.nodes,
            connections: self.connections,
            input: self.input,
            output: self.output,
        };
        desc.validate()?;
        Ok(desc)
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A validated, engine-independent description of a processing graph.
#[derive(Debug, Clone)]
pub struct GraphDesc {
    nodes: Vec<NodeDesc>,
    connections: Vec<Connection>,
    input: NodeId,
    output: NodeId,
}

impl GraphDesc {
    pub fn nodes(&self) -> &[NodeDesc] {
        &self.nodes
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn input(&self) -> NodeId {
        self.input
    }

    pub fn output(&self) -> NodeId {
        self.output
    }

    pub fn node(&self, id: NodeId) -> Result<&NodeDesc> {
        self.nodes.get(id.0).ok_or(ShiftError::UnknownNode(id))
    }

    /// Connections arriving at `id`, on any port.
    pub fn inputs_of(&self, id: NodeId) -> impl Iterator<Item = &Connection> + '_ {
        self.connections.iter().filter(move |c| c.to.node() == id)
    }

    fn validate(&self) -> Result<()> {
        for connection in &self.connections {
            let from = self.node(connection.from)?;
            let to = self.node(connection.to.node())?;

            if !from.kind.produces_output() {
                return Err(ShiftError::InvalidConnection(format!(
                    "'{}' has no output",
                    from.label
                )));
            }

            let accepted = match connection.to {
                Port::Audio(_) => to.kind.accepts_audio(),
                Port::Param(_, param) => to.kind.accepts_param(param),
            };
            if !accepted {
                return Err(ShiftError::InvalidConnection(format!(
                    "'{}' cannot feed {:?} on '{}'",
                    from.label, connection.to, to.label
                )));
            }
        }

        self.topological_order().map(|_| ())
    }

    /// Node ids ordered so every node comes after all of its sources.
    pub fn topological_order(&self) -> Result<Vec<NodeId>> {
        let count = self.nodes.len();
        let mut in_degree = vec![0usize; count];
        let mut edges: Vec<Vec<usize>> = vec![Vec::new(); count];

        for connection in &self.connections {
            let to = connection.to.node().0;
            edges[connection.from.0].push(to);
            in_degree[to] += 1;
        }

        let mut ready: VecDeque<usize> = (0..count).filter(|&i| in_degree[i] == 0).collect();
        let mut order = Vec::with_capacity(count);

        while let Some(i) = ready.pop_front() {
            order.push(NodeId(i));
            for &next in &edges[i] {
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    ready.push_back(next);
                }
            }
        }

        if order.len() == count {
            Ok(order)
        } else {
            Err(ShiftError::GraphCycle)
        }
    }
}
