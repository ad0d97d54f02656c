//! Partitioning of a sample sequence into fixed-length overlapping segments

use crate::error::{Result, SpectralError};
use std::ops::Range;

/// Segment `i` covers samples `[i * stride, i * stride + length)`
///
/// Only segments lying entirely inside the input are planned; the
/// trailing partial segment is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentPlan {
    length: usize,
    stride: usize,
    count: usize,
}

impl SegmentPlan {
    /// Plan segments of `length` samples overlapping by `overlap`
    pub fn new(samples: usize, length: usize, overlap: usize) -> Result<Self> {
        if length == 0 {
            return Err(SpectralError::InvalidSegmentation(
                "segment length must be at least one sample".into(),
            ));
        }
        if overlap >= length {
            return Err(SpectralError::InvalidSegmentation(format!(
                "overlap ({overlap} samples) must be less than the segment length ({length} samples)"
            )));
        }
        if length > samples {
            return Err(SpectralError::InvalidSegmentation(format!(
                "segment length ({length} samples) exceeds the input length ({samples} samples)"
            )));
        }
        let stride = length - overlap;
        let count = (samples - length) / stride + 1;
        Ok(Self {
            length,
            stride,
            count,
        })
    }

    /// Plan for dense reuse: every `block_stride` must fall on the segment grid
    pub fn aligned(samples: usize, length: usize, overlap: usize, block_stride: usize) -> Result<Self> {
        let plan = Self::new(samples, length, overlap)?;
        if block_stride == 0 || block_stride % plan.stride != 0 {
            return Err(SpectralError::Alignment(format!(
                "outer stride ({block_stride} samples) is not a multiple of the segment stride ({} samples)",
                plan.stride
            )));
        }
        Ok(plan)
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn overlap(&self) -> usize {
        self.length - self.stride
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn range(&self, index: usize) -> Range<usize> {
        let start = index * self.stride;
        start..start + self.length
    }

    pub fn ranges(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        (0..self.count).map(move |i| self.range(i))
    }

    /// One past the last sample used by any segment
    pub fn covered(&self) -> usize {
        match self.count {
            0 => 0,
            n => self.range(n - 1).end,
        }
    }
}

/// Convert a duration to a whole number of samples
pub fn seconds_to_samples(seconds: f64, sample_rate: f64) -> Result<usize> {
    let samples = (seconds * sample_rate).round();
    if !samples.is_finite() || samples < 0.0 {
        return Err(SpectralError::InvalidArgument(format!(
            "cannot express {seconds} s at {sample_rate} Hz as a sample count"
        )));
    }
    Ok(samples as usize)
}
