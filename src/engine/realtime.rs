use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use rtrb::{Consumer, Producer, PushError, RingBuffer};

use crate::{
    engine::{renderer::GraphRenderer, AudioEngine, ParamEvent},
    error::{Result, ShiftError},
    graph::{GraphDesc, NodeId, Param},
    EVENT_QUEUE_SIZE,
};

/*
Realtime Engine
===============

Splits the engine into two halves that never share a lock:

  RealtimeEngine     control side. Implements `AudioEngine`, pushes events
                     into a wait-free SPSC ring buffer, reads the clock.

  RealtimeRenderer   audio side. Moved into the audio callback once the graph
                     is realized. Drains the ring buffer at the start of
                     every block, renders, publishes the frame counter.

    control thread                      audio thread
    ──────────────                      ────────────
    shifter.set_pitch_offset(..)
      └─ engine.schedule(event) ──rtrb──→ renderer.process(..)
                                            ├─ drain events
    engine.now() ←──── AtomicU64 ─────────┴─ render, store frame

If the queue is full a single event is dropped with a warning. Updates that
span several events go through `schedule_all`, which refuses the whole batch
unless every event fits, so the audio side never sees half an update.
*/

/// Control-side handle of a realtime engine.
pub struct RealtimeEngine {
    sample_rate: f32,
    tx: Producer<ParamEvent>,
    rx: Option<Consumer<ParamEvent>>,
    clock: Arc<AtomicU64>,
    renderer: Option<RealtimeRenderer>,
}

impl RealtimeEngine {
    pub fn new(sample_rate: f32) -> Self {
        Self::with_queue_size(sample_rate, EVENT_QUEUE_SIZE)
    }

    pub fn with_queue_size(sample_rate: f32, queue_size: usize) -> Self {
        let (tx, rx) = RingBuffer::<ParamEvent>::new(queue_size);
        Self {
            sample_rate,
            tx,
            rx: Some(rx),
            clock: Arc::new(AtomicU64::new(0)),
            renderer: None,
        }
    }

    /// Take the audio-side renderer after the graph has been realized.
    pub fn take_renderer(&mut self) -> Option<RealtimeRenderer> {
        self.renderer.take()
    }

    /// Free slots left in the event queue.
    pub fn queue_slots(&self) -> usize {
        self.tx.slots()
    }
}

impl AudioEngine for RealtimeEngine {
    fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    fn now(&self) -> f64 {
        self.clock.load(Ordering::Acquire) as f64 / self.sample_rate as f64
    }

    fn realize(&mut self, graph: GraphDesc) -> Result<()> {
        if self.rx.is_none() {
            return Err(ShiftError::GraphAlreadyRealized);
        }
        let renderer = GraphRenderer::new(&graph, self.sample_rate)?;
        let rx = self.rx.take().ok_or(ShiftError::GraphAlreadyRealized)?;
        self.renderer = Some(RealtimeRenderer {
            renderer,
            rx,
            clock: Arc::clone(&self.clock),
        });
        Ok(())
    }

    fn schedule(&mut self, event: ParamEvent) {
        match self.tx.push(event) {
            Ok(()) => log::trace!("queued {event:?}"),
            Err(PushError::Full(dropped)) => {
                log::warn!("parameter queue full, dropping {dropped:?}")
            }
        }
    }

    fn schedule_all(&mut self, events: &[ParamEvent]) -> Result<()> {
        // Single producer: free slots can only grow until we push
        let available = self.tx.slots();
        if available < events.len() {
            log::warn!(
                "parameter queue full, dropping update of {} events",
                events.len()
            );
            return Err(ShiftError::EventQueueFull {
                needed: events.len(),
                available,
            });
        }
        for &event in events {
            self.schedule(event);
        }
        Ok(())
    }
}

/// Audio-side half of a [`RealtimeEngine`].
pub struct RealtimeRenderer {
    renderer: GraphRenderer,
    rx: Consumer<ParamEvent>,
    clock: Arc<AtomicU64>,
}

impl RealtimeRenderer {
    /// Apply pending events, render, and publish the new clock value.
    pub fn process(&mut self, input: &[f32], output: &mut [f32]) {
        self.renderer.drain_events(&mut self.rx);
        self.renderer.process(input, output);
        self.clock.store(self.renderer.frame(), Ordering::Release);
    }

    pub fn sample_rate(&self) -> f32 {
        self.renderer.sample_rate()
    }

    /// Current intrinsic value of a node parameter.
    pub fn param_value(&self, node: NodeId, param: Param) -> Option<f32> {
        self.renderer.param_value(node, param)
    }
}
