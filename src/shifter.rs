use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use crate::{
    config::ShifterConfig,
    dsp::{
        envelope::{make_delay_ramp_buffer, make_fade_buffer},
        smooth::ExponentialApproach,
        transpose::transpose,
    },
    engine::{scheduler::GrainSchedule, AudioEngine, ParamEvent},
    error::Result,
    graph::{GraphBuilder, GraphDesc, NodeId, Param, Port},
};

/*
Dual-Grain Pitch Shifter
========================

A delay line whose delay time changes while audio passes through it plays
back faster or slower than real time. A falling delay time raises pitch, a
rising one lowers it. The catch: a delay time cannot keep moving in one
direction forever, so it has to jump back, and the jump is a click.

The fix is two delay lines, each swept by a looped ramp, each windowed by a
looped crossfade. The two are half a loop period apart, so one line is always
mid-sweep while the other jumps back inside its silent tail.

Signal Flow
-----------

    ramp_down_a ─→ route_down_a ─┐                ┌─ fade_a
    ramp_up_a ───→ route_up_a ───┴→ depth_a ─┐    ↓ (gain param)
                                  (delay time)↓
                         input ──┬──────→ delay_a ──→ mix_a ──┐
                                 │                            ├─→ output
                                 └──────→ delay_b ──→ mix_b ──┘
                                  (delay time)↑    ↑ (gain param)
    ramp_down_b ─→ route_down_b ─┬→ depth_b ─┘    └─ fade_b
    ramp_up_b ───→ route_up_b ───┘

  ramp_*     looped delay-time ramps, 0..1 (down: rising, up: falling)
  route_*    direction switch. Exactly one direction pair is at gain 1.
  depth_*    scales the ramp into seconds: 0.5 * delay depth, smoothed
  fade_*     looped equal-power windows driving the mix gains
  mix_*      intrinsic gain 0, so output = delayed signal * window

The `a` players start at `first`, the `b` players at `second`, half a loop
period later (see `engine::scheduler`).

Pitch Amount
------------

`set_pitch_offset(mult, transpose)`:

  1. if `transpose`, mult = transpose_curve(mult / 2)
  2. clamp mult to [-max_pitch_down, max_pitch_up]
  3. mult > 0 selects the up ramps, mult <= 0 the down ramps
     (0 rides the down path with zero depth: bypass)
  4. set_delay(base_delay_time * |mult|)

`set_delay(depth)` glides both depth gains to 0.5 * depth with the smoothing
time constant. Greater depth over the same grain means a steeper sweep, which
means a larger pitch ratio.

The routing gains and the depth target of one call reach the engine as a
single batch, so exactly one direction pair is ever open on the audio side.
*/

/// Which ramp pair currently drives the delay lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Down,
    Up,
}

impl Direction {
    /// Direction selected by a resolved pitch multiplier.
    pub fn from_multiplier(mult: f64) -> Self {
        if mult > 0.0 {
            Direction::Up
        } else {
            Direction::Down
        }
    }
}

/// Control-side view of the shifter's pitch settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchState {
    /// Resolved, signed pitch multiplier. Negative shifts down, 0 bypasses.
    pub mult: f64,
    /// Multiplier replaced by the last `set_pitch_offset`.
    pub previous_mult: f64,
    /// Target delay depth in seconds.
    pub delay_depth: f64,
    pub direction: Direction,
}

/// Outcome of a range check on a control value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RangeCheck {
    InRange,
    Clamped { requested: f64, applied: f64 },
}

impl RangeCheck {
    pub fn is_clamped(&self) -> bool {
        matches!(self, RangeCheck::Clamped { .. })
    }

    fn check(requested: f64, min: f64, max: f64) -> (f64, Self) {
        // NaN falls back to the closest bound to zero
        let applied = if requested.is_nan() {
            0.0f64.clamp(min, max)
        } else {
            requested.clamp(min, max)
        };
        if applied == requested {
            (applied, RangeCheck::InRange)
        } else {
            (applied, RangeCheck::Clamped { requested, applied })
        }
    }
}

/// Last pitch multiplier, shared between shifter instances that opt in.
#[derive(Debug, Clone, Default)]
pub struct SharedPitch(Arc<AtomicU64>);

impl SharedPitch {
    pub fn new(initial: f64) -> Self {
        Self(Arc::new(AtomicU64::new(initial.to_bits())))
    }

    pub fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Acquire))
    }

    pub fn store(&self, mult: f64) {
        self.0.store(mult.to_bits(), Ordering::Release);
    }
}

/// Nodes the shifter addresses after realization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShifterNodes {
    pub input: NodeId,
    pub output: NodeId,
    pub route_down: [NodeId; 2],
    pub route_up: [NodeId; 2],
    pub depth: [NodeId; 2],
    pub delays: [NodeId; 2],
    pub mixes: [NodeId; 2],
}

/// Describe the shifter's graph without touching an engine.
pub fn describe(
    config: &ShifterConfig,
    sample_rate: f32,
    now: f64,
) -> Result<(GraphDesc, ShifterNodes, GrainSchedule)> {
    config.validate()?;

    let (active, fade) = (config.buffer_time, config.fade_time);
    let ramp_down = make_delay_ramp_buffer(sample_rate, active, fade, false)?;
    let ramp_up = make_delay_ramp_buffer(sample_rate, active, fade, true)?;
    let window = make_fade_buffer(sample_rate, active, fade)?;

    let schedule = GrainSchedule::new(now, config.start_latency, active, fade);
    let [ramp_down_a, ramp_down_b] = schedule.pair(&ramp_down);
    let [ramp_up_a, ramp_up_b] = schedule.pair(&ramp_up);
    let [fade_a, fade_b] = schedule.pair(&window);

    let mut graph = GraphBuilder::new();
    let (input, output) = (graph.input(), graph.output());

    let ramp_down_a = graph.player("ramp_down_a", ramp_down_a);
    let ramp_down_b = graph.player("ramp_down_b", ramp_down_b);
    let ramp_up_a = graph.player("ramp_up_a", ramp_up_a);
    let ramp_up_b = graph.player("ramp_up_b", ramp_up_b);
    let fade_a = graph.player("fade_a", fade_a);
    let fade_b = graph.player("fade_b", fade_b);

    let route_down = [
        graph.gain("route_down_a", 1.0),
        graph.gain("route_down_b", 1.0),
    ];
    let route_up = [graph.gain("route_up_a", 0.0), graph.gain("route_up_b", 0.0)];

    let initial_depth = (0.5 * config.base_delay_time) as f32;
    let depth = [
        graph.gain("depth_a", initial_depth),
        graph.gain("depth_b", initial_depth),
    ];

    let max_delay = config.max_delay_time as f32;
    let delays = [graph.delay("delay_a", max_delay), graph.delay("delay_b", max_delay)];
    let mixes = [graph.gain("mix_a", 0.0), graph.gain("mix_b", 0.0)];

    graph
        .connect(ramp_down_a, Port::Audio(route_down[0]))
        .connect(ramp_down_b, Port::Audio(route_down[1]))
        .connect(ramp_up_a, Port::Audio(route_up[0]))
        .connect(ramp_up_b, Port::Audio(route_up[1]))
        .connect(fade_a, Port::Param(mixes[0], Param::Gain))
        .connect(fade_b, Port::Param(mixes[1], Param::Gain));

    for i in 0..2 {
        graph
            .connect(route_down[i], Port::Audio(depth[i]))
            .connect(route_up[i], Port::Audio(depth[i]))
            .connect(depth[i], Port::Param(delays[i], Param::DelayTime))
            .connect(input, Port::Audio(delays[i]))
            .connect(delays[i], Port::Audio(mixes[i]))
            .connect(mixes[i], Port::Audio(output));
    }

    let nodes = ShifterNodes {
        input,
        output,
        route_down,
        route_up,
        depth,
        delays,
        mixes,
    };

    Ok((graph.build()?, nodes, schedule))
}

/// Realtime pitch shifter built from two crossfaded, modulated delay lines.
pub struct PitchShifter<E: AudioEngine> {
    engine: E,
    config: ShifterConfig,
    nodes: ShifterNodes,
    schedule: GrainSchedule,
    state: PitchState,
    depth: ExponentialApproach,
    shared: Option<SharedPitch>,
}

impl<E: AudioEngine> PitchShifter<E> {
    /// Build a shifter with the default configuration.
    pub fn new(engine: E) -> Result<Self> {
        Self::with_config(engine, ShifterConfig::default())
    }

    /// Describe the graph, realize it on `engine` and apply the base delay.
    ///
    /// Fails before anything is realized if the configuration or the
    /// engine's sample rate is invalid.
    pub fn with_config(mut engine: E, config: ShifterConfig) -> Result<Self> {
        let (graph, nodes, schedule) = describe(&config, engine.sample_rate(), engine.now())?;
        engine.realize(graph)?;

        let initial_depth = config.base_delay_time;
        let mut shifter = Self {
            engine,
            config,
            nodes,
            schedule,
            state: PitchState {
                mult: 0.0,
                previous_mult: 0.0,
                delay_depth: initial_depth,
                direction: Direction::Down,
            },
            depth: ExponentialApproach::constant(initial_depth),
            shared: None,
        };
        shifter.set_delay(initial_depth)?;
        Ok(shifter)
    }

    /// Mirror every pitch change into `shared`.
    pub fn with_shared_pitch(mut self, shared: SharedPitch) -> Self {
        shared.store(self.state.mult);
        self.shared = Some(shared);
        self
    }

    fn clamp_depth(&self, depth_seconds: f64) -> (f64, RangeCheck) {
        let (depth, check) = RangeCheck::check(depth_seconds, 0.0, self.config.max_delay_time);
        if let RangeCheck::Clamped { requested, applied } = check {
            log::warn!("delay depth {requested}s out of range, clamped to {applied}s");
        }
        (depth, check)
    }

    fn depth_events(&self, depth: f64, now: f64) -> [ParamEvent; 2] {
        let target = (0.5 * depth) as f32;
        let time_constant = self.config.smoothing_time_constant as f32;
        self.nodes.depth.map(|node| ParamEvent::SetTarget {
            node,
            param: Param::Gain,
            target,
            at_time: now,
            time_constant,
        })
    }

    fn commit_depth(&mut self, depth: f64, now: f64) {
        self.depth = self
            .depth
            .retarget(depth, now, self.config.smoothing_time_constant);
        self.state.delay_depth = depth;
    }

    /// Set the delay modulation depth in seconds.
    ///
    /// Depths outside `[0, max_delay_time]` are clamped and reported. Fails
    /// with [`ShiftError::EventQueueFull`](crate::error::ShiftError::EventQueueFull) if the engine cannot take the
    /// update, in which case nothing changes.
    pub fn set_delay(&mut self, depth_seconds: f64) -> Result<RangeCheck> {
        let (depth, check) = self.clamp_depth(depth_seconds);
        let now = self.engine.now();

        let events = self.depth_events(depth, now);
        self.engine.schedule_all(&events)?;
        self.commit_depth(depth, now);
        Ok(check)
    }

    /// Set pitch direction and amount.
    ///
    /// With `transpose`, `mult` is first mapped through the transpose curve
    /// at `mult / 2`. The resolved multiplier is clamped to
    /// `[-max_pitch_down, max_pitch_up]`; a clamp is logged and reported.
    ///
    /// Routing and depth go to the engine as one batch. If the engine cannot
    /// take it, the call fails with [`ShiftError::EventQueueFull`](crate::error::ShiftError::EventQueueFull) and both
    /// the audio side and [`PitchState`] keep the previous setting.
    pub fn set_pitch_offset(&mut self, mult: f64, transpose_amount: bool) -> Result<RangeCheck> {
        let requested = if transpose_amount {
            transpose(mult / 2.0)
        } else {
            mult
        };
        let (mult, check) = RangeCheck::check(
            requested,
            -self.config.max_pitch_down,
            self.config.max_pitch_up,
        );
        if let RangeCheck::Clamped { requested, applied } = check {
            log::warn!("pitch multiplier {requested} out of range, clamped to {applied}");
        }

        let direction = Direction::from_multiplier(mult);
        let (down, up) = match direction {
            Direction::Up => (0.0, 1.0),
            Direction::Down => (1.0, 0.0),
        };
        let route = |node, value| ParamEvent::SetValue {
            node,
            param: Param::Gain,
            value,
        };

        let (depth, delay_check) = self.clamp_depth(self.config.base_delay_time * mult.abs());
        let now = self.engine.now();
        let [depth_a, depth_b] = self.depth_events(depth, now);
        let [down_a, down_b] = self.nodes.route_down;
        let [up_a, up_b] = self.nodes.route_up;

        self.engine.schedule_all(&[
            route(down_a, down),
            route(down_b, down),
            route(up_a, up),
            route(up_b, up),
            depth_a,
            depth_b,
        ])?;

        self.commit_depth(depth, now);
        self.state.previous_mult = self.state.mult;
        self.state.mult = mult;
        self.state.direction = direction;
        if let Some(shared) = &self.shared {
            shared.store(mult);
        }

        log::debug!("pitch offset {mult} ({direction:?})");

        Ok(if check.is_clamped() {
            check
        } else {
            delay_check
        })
    }

    /// Smoothed delay depth, in seconds, at engine time `time`.
    pub fn delay_depth_at(&self, time: f64) -> f64 {
        self.depth.value_at(time)
    }

    /// Smoothed delay depth at the engine's current time.
    pub fn current_delay_depth(&self) -> f64 {
        self.delay_depth_at(self.engine.now())
    }

    pub fn state(&self) -> PitchState {
        self.state
    }

    pub fn direction(&self) -> Direction {
        self.state.direction
    }

    pub fn config(&self) -> &ShifterConfig {
        &self.config
    }

    pub fn nodes(&self) -> &ShifterNodes {
        &self.nodes
    }

    pub fn schedule(&self) -> GrainSchedule {
        self.schedule
    }

    /// Signal input node of the realized graph.
    pub fn input(&self) -> NodeId {
        self.nodes.input
    }

    /// Mixed output node of the realized graph.
    pub fn output(&self) -> NodeId {
        self.nodes.output
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn into_engine(self) -> E {
        self.engine
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{engine::OfflineEngine, error::ShiftError, graph::NodeKind};
    use approx::assert_abs_diff_eq;

    const SR: f32 = 48_000.0;

    fn shifter() -> PitchShifter<OfflineEngine> {
        PitchShifter::new(OfflineEngine::new(SR)).unwrap()
    }

    fn gains(shifter: &mut PitchShifter<OfflineEngine>) -> (Vec<f32>, Vec<f32>) {
        let nodes = *shifter.nodes();
        let engine = shifter.engine_mut();
        engine.flush_events().unwrap();
        let read = |ids: [NodeId; 2]| {
            ids.iter()
                .map(|&id| engine.param_value(id, Param::Gain).unwrap())
                .collect::<Vec<_>>()
        };
        (read(nodes.route_down), read(nodes.route_up))
    }

    #[test]
    fn describes_six_players_and_two_delay_lines() {
        let (graph, nodes, schedule) = describe(&ShifterConfig::default(), SR, 0.0).unwrap();

        let players: Vec<_> = graph
            .nodes()
            .iter()
            .filter_map(|n| match &n.kind {
                NodeKind::Player(grain) => Some(grain),
                _ => None,
            })
            .collect();
        assert_eq!(players.len(), 6);
        assert!(players.iter().all(|g| g.looping));
        assert_eq!(
            players
                .iter()
                .filter(|g| g.start_time == schedule.first)
                .count(),
            3
        );
        assert_abs_diff_eq!(schedule.offset(), 0.05, epsilon = 1e-12);

        for mix in nodes.mixes {
            assert!(matches!(
                graph.node(mix).unwrap().kind,
                NodeKind::Gain { gain } if gain == 0.0
            ));
            assert_eq!(graph.inputs_of(mix).count(), 2);
        }
        for delay in nodes.delays {
            assert!(matches!(
                graph.node(delay).unwrap().kind,
                NodeKind::Delay { max_delay, .. } if max_delay == 5.0
            ));
        }
    }

    #[test]
    fn starts_on_down_path_with_base_depth() {
        let mut shifter = shifter();
        assert_eq!(shifter.direction(), Direction::Down);
        assert_eq!(shifter.state().delay_depth, 0.1);

        let (down, up) = gains(&mut shifter);
        assert_eq!(down, vec![1.0, 1.0]);
        assert_eq!(up, vec![0.0, 0.0]);
    }

    #[test]
    fn sign_selects_direction() {
        let mut shifter = shifter();

        shifter.set_pitch_offset(2.0, false).unwrap();
        assert_eq!(shifter.direction(), Direction::Up);
        let (down, up) = gains(&mut shifter);
        assert_eq!((down, up), (vec![0.0, 0.0], vec![1.0, 1.0]));

        shifter.set_pitch_offset(-1.0, false).unwrap();
        assert_eq!(shifter.direction(), Direction::Down);
        let (down, up) = gains(&mut shifter);
        assert_eq!((down, up), (vec![1.0, 1.0], vec![0.0, 0.0]));
        assert_abs_diff_eq!(shifter.state().delay_depth, 0.1, epsilon = 1e-12);
        assert_eq!(shifter.state().previous_mult, 2.0);
    }

    #[test]
    fn zero_takes_down_path_and_glides_depth_to_zero() {
        let mut shifter = shifter();
        shifter.set_pitch_offset(1.5, false).unwrap();
        shifter.set_pitch_offset(0.0, false).unwrap();

        assert_eq!(shifter.direction(), Direction::Down);
        assert_eq!(shifter.state().delay_depth, 0.0);

        let start = shifter.engine().now();
        let before = shifter.delay_depth_at(start);
        let after_one = shifter.delay_depth_at(start + 0.01);
        let after_five = shifter.delay_depth_at(start + 0.05);
        assert!(before > after_one && after_one > after_five);
        assert!(after_five < 0.01 * before);
    }

    #[test]
    fn depth_gain_reaches_half_the_delay() {
        let mut shifter = shifter();
        shifter.set_delay(0.3).unwrap();
        shifter.engine_mut().advance(4_800).unwrap();

        let depth = shifter.nodes().depth;
        for node in depth {
            let gain = shifter.engine().param_value(node, Param::Gain).unwrap();
            assert_abs_diff_eq!(gain, 0.15, epsilon = 1e-4);
        }
        assert_abs_diff_eq!(shifter.current_delay_depth(), 0.3, epsilon = 1e-4);
    }

    #[test]
    fn transpose_uses_half_the_amount() {
        let mut shifter = shifter();
        shifter.set_pitch_offset(-24.0, true).unwrap();
        assert_abs_diff_eq!(shifter.state().mult, -1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(shifter.state().delay_depth, 0.1, epsilon = 1e-12);

        shifter.set_pitch_offset(4.0, true).unwrap();
        assert_abs_diff_eq!(shifter.state().mult, transpose(2.0), epsilon = 1e-12);
        assert_eq!(shifter.direction(), Direction::Up);
    }

    #[test]
    fn up_and_down_have_their_own_bounds() {
        let mut shifter = shifter();
        let up_limit = transpose(12.0);

        let check = shifter.set_pitch_offset(10.0, false).unwrap();
        assert_eq!(
            check,
            RangeCheck::Clamped {
                requested: 10.0,
                applied: up_limit
            }
        );
        assert_eq!(shifter.state().mult, up_limit);

        // +24 semitones sits exactly on the bound
        assert_eq!(
            shifter.set_pitch_offset(24.0, true).unwrap(),
            RangeCheck::InRange
        );

        let check = shifter.set_pitch_offset(-1.5, false).unwrap();
        assert_eq!(
            check,
            RangeCheck::Clamped {
                requested: -1.5,
                applied: -1.0
            }
        );
        assert_eq!(shifter.direction(), Direction::Down);
        assert_abs_diff_eq!(shifter.state().delay_depth, 0.1, epsilon = 1e-12);

        assert_eq!(
            shifter.set_pitch_offset(-24.0, true).unwrap(),
            RangeCheck::InRange
        );
        assert!(shifter.set_pitch_offset(-30.0, true).unwrap().is_clamped());
        assert_eq!(shifter.state().mult, -1.0);
    }

    #[test]
    fn out_of_range_values_are_clamped_and_reported() {
        let mut shifter = shifter();

        let check = shifter.set_delay(12.0).unwrap();
        assert!(check.is_clamped());
        assert_eq!(shifter.state().delay_depth, 5.0);

        assert_eq!(
            shifter.set_delay(-1.0).unwrap(),
            RangeCheck::Clamped {
                requested: -1.0,
                applied: 0.0
            }
        );
        assert!(shifter
            .set_pitch_offset(f64::NAN, false)
            .unwrap()
            .is_clamped());
        assert_eq!(shifter.state().mult, 0.0);
    }

    #[cfg(feature = "rtrb")]
    #[test]
    fn overflowing_update_leaves_one_direction_open() {
        use crate::engine::RealtimeEngine;

        let mut shifter = PitchShifter::new(RealtimeEngine::new(SR)).unwrap();
        let mut renderer = shifter.engine_mut().take_renderer().unwrap();
        let nodes = *shifter.nodes();

        // Fill the queue without rendering
        for _ in 0..10 {
            shifter.set_pitch_offset(2.0, false).unwrap();
        }
        assert!(matches!(
            shifter.set_pitch_offset(-1.0, false),
            Err(ShiftError::EventQueueFull { needed: 6, .. })
        ));
        assert_eq!(shifter.direction(), Direction::Up);
        assert_eq!(shifter.state().mult, 2.0);

        let open_pairs = |renderer: &crate::engine::RealtimeRenderer| {
            [nodes.route_down, nodes.route_up]
                .iter()
                .filter(|pair| {
                    pair.iter()
                        .all(|&id| renderer.param_value(id, Param::Gain) == Some(1.0))
                })
                .count()
        };

        let mut out = [0.0; 128];
        renderer.process(&[0.0; 128], &mut out);
        assert_eq!(open_pairs(&renderer), 1);
        assert_eq!(
            renderer.param_value(nodes.route_up[0], Param::Gain),
            Some(1.0)
        );

        // Drained: the same change now goes through whole
        shifter.set_pitch_offset(-1.0, false).unwrap();
        renderer.process(&[0.0; 128], &mut out);
        assert_eq!(open_pairs(&renderer), 1);
        assert_eq!(
            renderer.param_value(nodes.route_down[0], Param::Gain),
            Some(1.0)
        );
        assert_eq!(shifter.direction(), Direction::Down);
    }

    #[test]
    fn shared_pitch_follows_every_instance() {
        let shared = SharedPitch::new(-1.0);
        let mut first = shifter().with_shared_pitch(shared.clone());
        let mut second = shifter().with_shared_pitch(shared.clone());
        assert_eq!(shared.load(), 0.0);

        first.set_pitch_offset(1.25, false).unwrap();
        assert_eq!(shared.load(), 1.25);
        second.set_pitch_offset(-0.5, false).unwrap();
        assert_eq!(shared.load(), -0.5);
    }

    #[test]
    fn invalid_configuration_fails_before_realizing() {
        let mut engine = OfflineEngine::new(SR);
        let config = ShifterConfig {
            fade_time: 0.2,
            ..Default::default()
        };
        assert!(matches!(
            PitchShifter::with_config(&mut engine, config),
            Err(ShiftError::InvalidTiming { .. })
        ));

        let mut out = [0.0; 1];
        assert_eq!(
            engine.process(&[0.0], &mut out),
            Err(ShiftError::GraphNotRealized)
        );
    }

    #[test]
    fn invalid_sample_rate_fails() {
        assert!(matches!(
            PitchShifter::new(OfflineEngine::new(0.0)),
            Err(ShiftError::InvalidSampleRate(_))
        ));
    }
}
