use std::sync::Arc;

use crate::{
    dsp::{
        amplify::{accumulate, multiply_in_place},
        delay::DelayLine,
        smooth::SmoothedParam,
    },
    engine::{EventReceiver, ParamEvent},
    error::{Result, ShiftError},
    graph::{GraphDesc, NodeId, NodeKind, Param, Port, RenderCtx},
    MAX_BLOCK_SIZE,
};

/*
Graph Renderer
==============

Renders a realized `GraphDesc` block by block. Nodes run in topological
order, so by the time a node renders, every buffer it reads is complete for
the current block.

Per node, per sample:

  Input    out = host input
  Output   out = sum(audio inputs)
  Gain     out = sum(audio inputs) * (gain.next() + sum(param inputs))
  Delay    out = delay(sum(audio inputs), delay.next() + sum(param inputs))
  Player   out = 0 before the start frame, then the buffer, looping or once

Parameters are `SmoothedParam`s, so scheduled targets start on their exact
frame even in the middle of a block.

Everything is allocated when the renderer is built. `process` and
`apply_event` never allocate, so the renderer can live on the audio thread.
*/

enum NodeState {
    Input,
    Output,
    Gain {
        gain: SmoothedParam,
    },
    Delay {
        line: DelayLine,
        delay_time: SmoothedParam,
    },
    Player {
        buffer: Arc<[f32]>,
        start_frame: u64,
        looping: bool,
    },
}

struct Slot {
    state: NodeState,
    audio_inputs: Vec<usize>,
    param_inputs: Vec<usize>,
    out: Vec<f32>,
}

/// Sum the current block of every source slot into `dst`.
fn gather(slots: &[Slot], sources: &[usize], dst: &mut [f32]) {
    dst.fill(0.0);
    for &source in sources {
        accumulate(dst, &slots[source].out[..dst.len()]);
    }
}

/// Sample-accurate renderer for a realized graph.
pub struct GraphRenderer {
    slots: Vec<Slot>,
    order: Vec<usize>,
    output: usize,
    sample_rate: f32,
    frame: u64,
    signal: Vec<f32>,
    modulation: Vec<f32>,
}

impl GraphRenderer {
    pub fn new(graph: &GraphDesc, sample_rate: f32) -> Result<Self> {
        if !(sample_rate > 0.0) || !sample_rate.is_finite() {
            return Err(ShiftError::InvalidSampleRate(sample_rate));
        }

        let order = graph
            .topological_order()?
            .into_iter()
            .map(|id| id.index())
            .collect();

        let mut slots: Vec<Slot> = graph
            .nodes()
            .iter()
            .map(|node| {
                let state = match &node.kind {
                    NodeKind::Input => NodeState::Input,
                    NodeKind::Output => NodeState::Output,
                    NodeKind::Gain { gain } => NodeState::Gain {
                        gain: SmoothedParam::new(*gain),
                    },
                    NodeKind::Delay {
                        max_delay,
                        delay_time,
                    } => NodeState::Delay {
                        line: DelayLine::new(*max_delay, sample_rate),
                        delay_time: SmoothedParam::new(*delay_time),
                    },
                    NodeKind::Player(grain) => NodeState::Player {
                        buffer: Arc::clone(&grain.buffer),
                        start_frame: seconds_to_frame(grain.start_time, sample_rate),
                        looping: grain.looping,
                    },
                };
                Slot {
                    state,
                    audio_inputs: Vec::new(),
                    param_inputs: Vec::new(),
                    out: vec![0.0; MAX_BLOCK_SIZE],
                }
            })
            .collect();

        for connection in graph.connections() {
            let from = connection.from.index();
            match connection.to {
                Port::Audio(to) => slots[to.index()].audio_inputs.push(from),
                Port::Param(to, _) => slots[to.index()].param_inputs.push(from),
            }
        }

        log::debug!(
            "realized graph with {} nodes and {} connections at {} Hz",
            slots.len(),
            graph.connections().len(),
            sample_rate
        );

        Ok(Self {
            slots,
            order,
            output: graph.output().index(),
            sample_rate,
            frame: 0,
            signal: vec![0.0; MAX_BLOCK_SIZE],
            modulation: vec![0.0; MAX_BLOCK_SIZE],
        })
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Frames rendered so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Engine time in seconds.
    pub fn now(&self) -> f64 {
        self.frame as f64 / self.sample_rate as f64
    }

    /// Apply one parameter event. Events for unknown nodes or params are ignored.
    pub fn apply_event(&mut self, event: ParamEvent) {
        let sample_rate = self.sample_rate;
        let current = self.frame;
        let Some(param) = self
            .slots
            .get_mut(event.node().index())
            .and_then(|slot| slot.param_mut(event))
        else {
            return;
        };

        match event {
            ParamEvent::SetValue { value, .. } => param.set_value(value),
            ParamEvent::SetTarget {
                target,
                at_time,
                time_constant,
                ..
            } => {
                let start = seconds_to_frame(at_time, sample_rate).max(current);
                param.set_target_at(target, start, time_constant, sample_rate);
            }
        }
    }

    pub fn drain_events(&mut self, events: &mut impl EventReceiver) {
        while let Some(event) = events.pop() {
            self.apply_event(event);
        }
    }

    /// Current value of a node parameter, without modulation inputs.
    pub fn param_value(&self, node: NodeId, param: Param) -> Option<f32> {
        match (&self.slots.get(node.index())?.state, param) {
            (NodeState::Gain { gain }, Param::Gain) => Some(gain.value()),
            (NodeState::Delay { delay_time, .. }, Param::DelayTime) => Some(delay_time.value()),
            _ => None,
        }
    }

    /// Render `input` through the graph into `output`.
    ///
    /// Buffers of any length are processed in blocks of at most `MAX_BLOCK_SIZE`.
    pub fn process(&mut self, input: &[f32], output: &mut [f32]) {
        debug_assert_eq!(input.len(), output.len());
        let frames = input.len().min(output.len());

        let mut offset = 0;
        while offset < frames {
            let len = (frames - offset).min(MAX_BLOCK_SIZE);
            self.render_block(
                &input[offset..offset + len],
                &mut output[offset..offset + len],
            );
            offset += len;
        }
    }

    fn render_block(&mut self, input: &[f32], output: &mut [f32]) {
        let len = input.len();
        let ctx = RenderCtx::new(self.sample_rate, self.frame);

        for position in 0..self.order.len() {
            let index = self.order[position];
            let signal = &mut self.signal[..len];
            let modulation = &mut self.modulation[..len];

            gather(&self.slots, &self.slots[index].audio_inputs, signal);
            gather(&self.slots, &self.slots[index].param_inputs, modulation);

            let slot = &mut self.slots[index];
            let out = &mut slot.out[..len];

            match &mut slot.state {
                NodeState::Input => out.copy_from_slice(input),
                NodeState::Output => out.copy_from_slice(signal),
                NodeState::Gain { gain } => {
                    for (n, m) in modulation.iter_mut().enumerate() {
                        *m += gain.next(ctx.frame + n as u64);
                    }
                    out.copy_from_slice(signal);
                    multiply_in_place(out, modulation);
                }
                NodeState::Delay { line, delay_time } => {
                    for (n, o) in out.iter_mut().enumerate() {
                        let seconds = delay_time.next(ctx.frame + n as u64) + modulation[n];
                        *o = line.next_sample(signal[n], seconds * ctx.sample_rate);
                    }
                }
                NodeState::Player {
                    buffer,
                    start_frame,
                    looping,
                } => render_player(out, buffer, *start_frame, *looping, ctx.frame),
            }
        }

        output.copy_from_slice(&self.slots[self.output].out[..len]);
        self.frame += len as u64;
    }
}

impl Slot {
    fn param_mut(&mut self, event: ParamEvent) -> Option<&mut SmoothedParam> {
        let param = match event {
            ParamEvent::SetValue { param, .. } | ParamEvent::SetTarget { param, .. } => param,
        };
        match (&mut self.state, param) {
            (NodeState::Gain { gain }, Param::Gain) => Some(gain),
            (NodeState::Delay { delay_time, .. }, Param::DelayTime) => Some(delay_time),
            _ => None,
        }
    }
}

fn render_player(out: &mut [f32], buffer: &[f32], start_frame: u64, looping: bool, frame: u64) {
    let len = buffer.len() as u64;
    for (n, o) in out.iter_mut().enumerate() {
        let frame = frame + n as u64;
        *o = if frame < start_frame || len == 0 {
            0.0
        } else {
            let position = frame - start_frame;
            if looping {
                buffer[(position % len) as usize]
            } else if position < len {
                buffer[position as usize]
            } else {
                0.0
            }
        };
    }
}

#[inline]
fn seconds_to_frame(seconds: f64, sample_rate: f32) -> u64 {
    (seconds.max(0.0) * sample_rate as f64).round() as u64
}
