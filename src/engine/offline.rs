use std::collections::VecDeque;

use crate::{
    engine::{renderer::GraphRenderer, AudioEngine, ParamEvent},
    error::{Result, ShiftError},
    graph::{GraphDesc, NodeId, Param},
};

/// Single-threaded engine for offline bouncing and tests.
///
/// Events queue up until the next `process` (or `flush_events`) call, the
/// same way they would wait for the next audio callback in a realtime host.
pub struct OfflineEngine {
    sample_rate: f32,
    renderer: Option<GraphRenderer>,
    pending: VecDeque<ParamEvent>,
}

impl OfflineEngine {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            renderer: None,
            pending: VecDeque::with_capacity(crate::EVENT_QUEUE_SIZE),
        }
    }

    fn renderer_mut(&mut self) -> Result<&mut GraphRenderer> {
        self.renderer.as_mut().ok_or(ShiftError::GraphNotRealized)
    }

    /// Apply queued events without rendering.
    pub fn flush_events(&mut self) -> Result<()> {
        let renderer = self.renderer.as_mut().ok_or(ShiftError::GraphNotRealized)?;
        renderer.drain_events(&mut self.pending);
        Ok(())
    }

    /// Render `input` through the realized graph.
    pub fn process(&mut self, input: &[f32], output: &mut [f32]) -> Result<()> {
        self.flush_events()?;
        self.renderer_mut()?.process(input, output);
        Ok(())
    }

    /// Render `frames` of silence, discarding the output.
    pub fn advance(&mut self, frames: usize) -> Result<()> {
        let silence = vec![0.0; frames];
        let mut sink = vec![0.0; frames];
        self.process(&silence, &mut sink)
    }

    /// Current intrinsic value of a node parameter.
    pub fn param_value(&self, node: NodeId, param: Param) -> Option<f32> {
        self.renderer.as_ref()?.param_value(node, param)
    }

    pub fn pending_events(&self) -> usize {
        self.pending.len()
    }
}

impl AudioEngine for OfflineEngine {
    fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    fn now(&self) -> f64 {
        self.renderer.as_ref().map_or(0.0, GraphRenderer::now)
    }

    fn realize(&mut self, graph: GraphDesc) -> Result<()> {
        if self.renderer.is_some() {
            return Err(ShiftError::GraphAlreadyRealized);
        }
        self.renderer = Some(GraphRenderer::new(&graph, self.sample_rate)?);
        Ok(())
    }

    fn schedule(&mut self, event: ParamEvent) {
        log::trace!("queued {event:?}");
        self.pending.push_back(event);
    }
}
