/// Variable delay line with fractional, linearly interpolated reads.
///
/// Capacity is fixed at construction from a maximum delay time, so writes and
/// reads never allocate. Requested delays outside `[0, max_delay]` are clamped.
pub struct DelayLine {
    buffer: Vec<f32>,
    write_pos: usize,
    max_delay_samples: f32,
}

impl DelayLine {
    pub fn new(max_delay_seconds: f32, sample_rate: f32) -> Self {
        let max_delay_samples = (max_delay_seconds.max(0.0) * sample_rate.max(0.0)).ceil();
        // Two guard samples: one for the interpolation partner, one for the
        // slot being written this frame
        let len = max_delay_samples as usize + 2;

        Self {
            buffer: vec![0.0; len],
            write_pos: 0,
            max_delay_samples,
        }
    }

    pub fn max_delay_samples(&self) -> f32 {
        self.max_delay_samples
    }

    /// Push one input sample.
    #[inline]
    pub fn write(&mut self, sample: f32) {
        self.buffer[self.write_pos] = sample;
        self.write_pos = (self.write_pos + 1) % self.buffer.len();
    }

    /// Read `delay_samples` behind the most recent write.
    ///
    /// A delay of 0 returns the sample just written.
    #[inline]
    pub fn read_interpolated(&self, delay_samples: f32) -> f32 {
        let len = self.buffer.len();
        let delay = delay_samples.clamp(0.0, self.max_delay_samples);
        let whole = delay.floor();
        let frac = delay - whole;

        let newest = (self.write_pos + len - 1) % len;
        let i0 = (newest + len - whole as usize) % len;
        let i1 = (i0 + len - 1) % len;

        let a = self.buffer[i0];
        let b = self.buffer[i1];
        a + (b - a) * frac
    }

    /// Write `sample`, then read it back `delay_samples` later.
    #[inline]
    pub fn next_sample(&mut self, sample: f32, delay_samples: f32) -> f32 {
        self.write(sample);
        self.read_interpolated(delay_samples)
    }

    pub fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }
}
