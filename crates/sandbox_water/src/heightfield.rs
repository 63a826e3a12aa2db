//! Scalar height grids backing the water surface.

/// One of the two ping-pong buffers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BufferId {
    A,
    B,
}

impl BufferId {
    /// The other buffer.
    pub fn other(self) -> Self {
        match self {
            BufferId::A => BufferId::B,
            BufferId::B => BufferId::A,
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            BufferId::A => 0,
            BufferId::B => 1,
        }
    }
}

/// Fixed-size 2D grid of surface heights, row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct HeightField {
    pub width: usize,
    pub height: usize,
    pub heights: Vec<f32>,
}

impl HeightField {
    /// Create a grid with every sample at `initial_height`.
    pub fn new(width: usize, height: usize, initial_height: f32) -> Self {
        Self {
            width,
            height,
            heights: vec![initial_height; width * height],
        }
    }

    #[inline]
    pub fn idx(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    /// Height at grid position, 0 outside the grid.
    pub fn get(&self, x: usize, y: usize) -> f32 {
        if x < self.width && y < self.height {
            self.heights[self.idx(x, y)]
        } else {
            0.0
        }
    }

    /// Set height at grid position; out-of-range writes are ignored.
    pub fn set(&mut self, x: usize, y: usize, value: f32) {
        if x < self.width && y < self.height {
            let idx = self.idx(x, y);
            self.heights[idx] = value;
        }
    }

    /// Clamp a continuous grid coordinate onto a valid cell.
    pub fn clamp_cell(&self, x: f32, y: f32) -> (usize, usize) {
        let cx = (x.round() as i64).clamp(0, self.width as i64 - 1) as usize;
        let cy = (y.round() as i64).clamp(0, self.height as i64 - 1) as usize;
        (cx, cy)
    }

    pub fn fill(&mut self, value: f32) {
        self.heights.fill(value);
    }

    pub fn same_dimensions(&self, other: &HeightField) -> bool {
        self.width == other.width && self.height == other.height
    }

    pub fn is_finite(&self) -> bool {
        self.heights.iter().all(|h| h.is_finite())
    }

    /// Raw bytes for texture upload.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.heights)
    }
}
