//! The audio engine contract the shifter drives, plus reference engines.
//!
//! The shifter only ever talks to an engine through [`AudioEngine`]: it reads
//! the clock, hands over one [`GraphDesc`], and afterwards sends
//! [`ParamEvent`]s. Anything that can render a `GraphDesc` can host it.

pub mod offline;
#[cfg(feature = "rtrb")]
pub mod realtime;
pub mod renderer;
pub mod scheduler;

#[cfg(feature = "rtrb")]
use rtrb::Consumer;
use std::collections::VecDeque;

use crate::{
    error::Result,
    graph::{GraphDesc, NodeId, Param},
};

pub use offline::OfflineEngine;
#[cfg(feature = "rtrb")]
pub use realtime::{RealtimeEngine, RealtimeRenderer};
pub use renderer::GraphRenderer;
pub use scheduler::{Grain, GrainSchedule};

/// A parameter change sent from the control side to a realized graph.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamEvent {
    /// Jump to `value` as soon as the event is applied.
    SetValue {
        node: NodeId,
        param: Param,
        value: f32,
    },
    /// Approach `target` exponentially, starting at `at_time` (engine seconds).
    SetTarget {
        node: NodeId,
        param: Param,
        target: f32,
        at_time: f64,
        time_constant: f32,
    },
}

impl ParamEvent {
    pub fn node(&self) -> NodeId {
        match *self {
            ParamEvent::SetValue { node, .. } | ParamEvent::SetTarget { node, .. } => node,
        }
    }
}

/// What the shifter needs from its host engine.
pub trait AudioEngine {
    fn sample_rate(&self) -> f32;

    /// Monotonic engine time in seconds.
    fn now(&self) -> f64;

    /// Instantiate a graph. Called once, before any event is scheduled.
    fn realize(&mut self, graph: GraphDesc) -> Result<()>;

    /// Queue a parameter change. Must never block.
    fn schedule(&mut self, event: ParamEvent);

    /// Queue several changes that must land together, or none of them.
    ///
    /// Engines with bounded queues override this to refuse the whole batch
    /// when it does not fit.
    fn schedule_all(&mut self, events: &[ParamEvent]) -> Result<()> {
        for &event in events {
            self.schedule(event);
        }
        Ok(())
    }
}

impl<E: AudioEngine + ?Sized> AudioEngine for &mut E {
    fn sample_rate(&self) -> f32 {
        (**self).sample_rate()
    }

    fn now(&self) -> f64 {
        (**self).now()
    }

    fn realize(&mut self, graph: GraphDesc) -> Result<()> {
        (**self).realize(graph)
    }

    fn schedule(&mut self, event: ParamEvent) {
        (**self).schedule(event)
    }

    fn schedule_all(&mut self, events: &[ParamEvent]) -> Result<()> {
        (**self).schedule_all(events)
    }
}

/// Source of pending parameter events, drained once per block.
pub trait EventReceiver {
    fn pop(&mut self) -> Option<ParamEvent>;
}

impl EventReceiver for VecDeque<ParamEvent> {
    fn pop(&mut self) -> Option<ParamEvent> {
        self.pop_front()
    }
}

#[cfg(feature = "rtrb")]
impl EventReceiver for Consumer<ParamEvent> {
    fn pop(&mut self) -> Option<ParamEvent> {
        Consumer::pop(self).ok()
    }
}
