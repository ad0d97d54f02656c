//! FFT-based fast convolution for long FIR filters
//!
//! Overlap-add with frequency-domain multiplication: O(N log N) instead of
//! O(N*M) for direct convolution.

use crate::error::{Result, SpectralError};
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

/// FFT-based FIR filter for long impulse responses
pub struct FastFirFilter {
    /// Filter coefficients in frequency domain
    h_fft: Vec<Complex<f64>>,

    /// FFT size, power of two >= block_size + filter_length - 1
    fft_size: usize,

    block_size: usize,
    filter_length: usize,

    /// Convolution tail carried into the next block
    overlap: Vec<f64>,

    fft: Arc<dyn Fft<f64>>,
    ifft: Arc<dyn Fft<f64>>,

    buffer: Vec<Complex<f64>>,
}

impl FastFirFilter {
    /// Create a filter for inputs fed in blocks of at most `block_size`
    pub fn new(coefficients: Vec<f64>, block_size: usize) -> Self {
        let filter_length = coefficients.len().max(1);
        let block_size = block_size.max(1);
        let fft_size = (block_size + filter_length - 1).next_power_of_two();

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);
        let ifft = planner.plan_fft_inverse(fft_size);

        let mut h_fft = vec![Complex::new(0.0, 0.0); fft_size];
        for (slot, &coeff) in h_fft.iter_mut().zip(coefficients.iter()) {
            *slot = Complex::new(coeff, 0.0);
        }
        fft.process(&mut h_fft);

        Self {
            h_fft,
            fft_size,
            block_size,
            filter_length,
            overlap: vec![0.0; filter_length - 1],
            fft,
            ifft,
            buffer: vec![Complex::new(0.0, 0.0); fft_size],
        }
    }

    /// Full linear convolution of one block (length n + M - 1)
    fn convolve_block(&mut self, input: &[f64]) -> Vec<f64> {
        let n = input.len();
        for (slot, &x) in self.buffer.iter_mut().zip(input.iter()) {
            *slot = Complex::new(x, 0.0);
        }
        self.buffer[n..].fill(Complex::new(0.0, 0.0));

        self.fft.process(&mut self.buffer);
        for (x, h) in self.buffer.iter_mut().zip(self.h_fft.iter()) {
            *x *= h;
        }
        self.ifft.process(&mut self.buffer);

        let scale = 1.0 / self.fft_size as f64;
        self.buffer[..n + self.filter_length - 1]
            .iter()
            .map(|c| c.re * scale)
            .collect()
    }

    /// Filter one block, continuing from the carried tail; output has
    /// the same length as the input
    ///
    /// Blocks longer than `block_size` fail with `InvalidArgument`.
    pub fn process_block(&mut self, input: &[f64]) -> Result<Vec<f64>> {
        if input.len() > self.block_size {
            return Err(SpectralError::InvalidArgument(format!(
                "block of {} samples exceeds the configured block size of {}",
                input.len(),
                self.block_size
            )));
        }
        Ok(self.process_chunk(input))
    }

    fn process_chunk(&mut self, input: &[f64]) -> Vec<f64> {
        let n = input.len();
        let mut full = self.convolve_block(input);

        // The tail may reach past this block when n < M - 1
        for (y, tail) in full.iter_mut().zip(self.overlap.iter()) {
            *y += tail;
        }
        self.overlap = full.split_off(n);
        full
    }

    /// Causal filtering of a whole signal (same length as the input)
    pub fn filter(&mut self, input: &[f64]) -> Vec<f64> {
        self.reset();
        let mut output = Vec::with_capacity(input.len());
        for chunk in input.chunks(self.block_size) {
            output.extend(self.process_chunk(chunk));
        }
        output
    }

    /// Full linear convolution (length N + M - 1)
    pub fn convolve(&mut self, input: &[f64]) -> Vec<f64> {
        let mut output = self.filter(input);
        output.extend_from_slice(&self.overlap);
        self.reset();
        output
    }

    /// Convolution output centred on the input (numpy `mode="same"`)
    pub fn convolve_same(&mut self, input: &[f64]) -> Vec<f64> {
        let full = self.convolve(input);
        let offset = (self.filter_length - 1) / 2;
        full[offset..offset + input.len()].to_vec()
    }

    pub fn reset(&mut self) {
        self.overlap.fill(0.0);
    }

    pub fn filter_length(&self) -> usize {
        self.filter_length
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }
}
