//! Per-cell target/current buffers with asymmetric smoothing

/// Target and displayed values for every cell
#[derive(Debug, Clone, Default)]
pub struct FieldBuffer {
    target: Vec<f32>,
    current: Vec<f32>,
    rate_in: f32,
    rate_out: f32,
}

impl FieldBuffer {
    /// Rates are clamped to `[0, 1]` so a step never overshoots the target
    pub fn new(len: usize, rate_in: f32, rate_out: f32) -> Self {
        let mut buffer = Self::default();
        buffer.set_rates(rate_in, rate_out);
        buffer.resize(len);
        buffer
    }

    pub fn len(&self) -> usize {
        self.current.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    pub fn set_rates(&mut self, rate_in: f32, rate_out: f32) {
        self.rate_in = sanitize_rate(rate_in);
        self.rate_out = sanitize_rate(rate_out);
    }

    pub fn rates(&self) -> (f32, f32) {
        (self.rate_in, self.rate_out)
    }

    /// Resize and zero both buffers when the length changes.
    ///
    /// Returns `true` when a reset happened.
    pub fn resize(&mut self, len: usize) -> bool {
        if self.current.len() == len {
            return false;
        }
        self.target = vec![0.0; len];
        self.current = vec![0.0; len];
        true
    }

    /// Zero both buffers in place
    pub fn reset(&mut self) {
        self.target.fill(0.0);
        self.current.fill(0.0);
    }

    /// Target values, cleared for the next computation
    pub fn clear_target(&mut self) -> &mut [f32] {
        self.target.fill(0.0);
        &mut self.target
    }

    pub fn target(&self) -> &[f32] {
        &self.target
    }

    pub fn current(&self) -> &[f32] {
        &self.current
    }

    /// Move every current value towards its target.
    ///
    /// Rising magnitudes use `rate_in`, falling ones `rate_out`.
    pub fn smooth(&mut self) -> &[f32] {
        for (current, &target) in self.current.iter_mut().zip(&self.target) {
            let rate = if target.abs() > current.abs() {
                self.rate_in
            } else {
                self.rate_out
            };
            *current += (target - *current) * rate;
        }
        &self.current
    }
}

fn sanitize_rate(rate: f32) -> f32 {
    if rate.is_finite() {
        rate.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
