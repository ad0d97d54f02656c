//! Direct-form FIR filter with a ring-buffer delay line
//!
//! Used for short FIR coefficient sets where time-domain convolution
//! beats the FFT path.

/// Causal FIR filter with zero-allocation ring buffer
#[derive(Debug, Clone)]
pub struct FirFilter {
    /// Filter coefficients h[n]
    coefficients: Vec<f64>,

    /// Delay line holding the previous M samples
    state_buffer: Vec<f64>,

    /// Current write position in ring buffer
    cursor: usize,
}

impl FirFilter {
    /// Create a new FIR filter with given coefficients h[n], n = 0..M-1
    ///
    /// An empty coefficient set behaves as a zero filter.
    pub fn new(coefficients: Vec<f64>) -> Self {
        let length = coefficients.len().max(1);
        Self {
            coefficients,
            state_buffer: vec![0.0; length],
            cursor: 0,
        }
    }

    /// Filter one sample: y[n] = Σ h[k] x[n-k]
    #[inline]
    pub fn process_sample(&mut self, input: f64) -> f64 {
        let length = self.state_buffer.len();
        self.state_buffer[self.cursor] = input;

        let mut output = 0.0;
        for (k, &coeff) in self.coefficients.iter().enumerate() {
            let idx = (self.cursor + length - k) % length;
            output += coeff * self.state_buffer[idx];
        }

        self.cursor = (self.cursor + 1) % length;
        output
    }

    /// Filter a block, continuing from the current state
    pub fn process_block(&mut self, input: &[f64]) -> Vec<f64> {
        input.iter().map(|&x| self.process_sample(x)).collect()
    }

    /// Filter a block in place
    pub fn process_block_inplace(&mut self, buffer: &mut [f64]) {
        for sample in buffer.iter_mut() {
            *sample = self.process_sample(*sample);
        }
    }

    /// Clear the delay line
    pub fn reset(&mut self) {
        self.state_buffer.fill(0.0);
        self.cursor = 0;
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn length(&self) -> usize {
        self.coefficients.len()
    }

    /// Group delay of a linear-phase filter, in samples
    pub fn group_delay_samples(&self) -> f64 {
        self.coefficients.len().saturating_sub(1) as f64 / 2.0
    }
}
