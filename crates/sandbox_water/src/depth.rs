//! Raw depth frames from the sensor and the derived per-pixel products.

use crate::constants::RAW_DEPTH_TO_MM;

/// One sensor frame, row-major, samples in 0.1 mm units.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DepthFrame {
    pub width: usize,
    pub height: usize,
    pub samples: Vec<u16>,
}

impl DepthFrame {
    pub fn new(width: usize, height: usize, samples: Vec<u16>) -> Self {
        debug_assert_eq!(samples.len(), width * height);
        Self {
            width,
            height,
            samples,
        }
    }

    /// Frame with every sample set to `value`.
    pub fn filled(width: usize, height: usize, value: u16) -> Self {
        Self::new(width, height, vec![value; width * height])
    }

    pub fn get(&self, col: usize, row: usize) -> Option<u16> {
        if col < self.width && row < self.height {
            self.samples.get(row * self.width + col).copied()
        } else {
            None
        }
    }

    pub fn set(&mut self, col: usize, row: usize, value: u16) {
        if col < self.width && row < self.height {
            self.samples[row * self.width + col] = value;
        }
    }

    /// Samples converted to millimetres.
    pub fn to_millimetres(&self) -> Vec<f32> {
        self.samples.iter().map(|&s| s as f32 * RAW_DEPTH_TO_MM).collect()
    }

    /// Mean (column, row) of samples inside the inclusive band `min..=max`.
    /// `None` when no sample is in the band.
    pub fn band_centroid(&self, min: u16, max: u16) -> Option<(f32, f32)> {
        if self.width == 0 {
            return None;
        }
        let mut sum_col = 0.0f64;
        let mut sum_row = 0.0f64;
        let mut count = 0usize;
        for (idx, &depth) in self.samples.iter().enumerate() {
            if depth >= min && depth <= max {
                sum_col += (idx % self.width) as f64;
                sum_row += (idx / self.width) as f64;
                count += 1;
            }
        }
        if count == 0 {
            return None;
        }
        Some(((sum_col / count as f64) as f32, (sum_row / count as f64) as f32))
    }
}

/// Polled sensor feed.
pub trait RawDepthSource {
    /// True once a frame newer than the last `current_frame` call is available.
    fn new_data_ready(&self) -> bool;

    /// Latest frame, marking it consumed.
    fn current_frame(&mut self) -> Option<&DepthFrame>;
}

/// Per-pixel foreground mask: anything closer than `max_distance_mm`
/// (and not a zero "no reading" sample) is foreground.
pub fn foreground_mask(frame: &DepthFrame, max_distance_mm: f32) -> Vec<bool> {
    frame
        .samples
        .iter()
        .map(|&raw| {
            let mm = raw as f32 * RAW_DEPTH_TO_MM;
            mm > 0.0 && mm < max_distance_mm
        })
        .collect()
}

/// In-memory feed: frames are queued and handed out one per poll.
#[derive(Debug, Default)]
pub struct QueuedDepthSource {
    pending: std::collections::VecDeque<DepthFrame>,
    current: Option<DepthFrame>,
}

impl QueuedDepthSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, frame: DepthFrame) {
        self.pending.push_back(frame);
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

impl RawDepthSource for QueuedDepthSource {
    fn new_data_ready(&self) -> bool {
        !self.pending.is_empty()
    }

    fn current_frame(&mut self) -> Option<&DepthFrame> {
        if let Some(next) = self.pending.pop_front() {
            self.current = Some(next);
        }
        self.current.as_ref()
    }
}
