/// Compute dispatch granularity. Every buffer dimension is a multiple of this.
pub const TILE_SIZE: usize = 8;

/// Smallest accepted resolution.
pub const MIN_RESOLUTION: usize = 8;

/// Sizing of the simulation lattice.
///
/// `resolution` is the requested horizontal cell count; the actual buffer
/// dimensions are rounded up to whole tiles. The vertical count follows the
/// aspect ratio (height / width) of the simulated area.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimulationGrid {
    resolution: usize,
    aspect: f32,
    step_size: f32,
}

impl SimulationGrid {
    pub fn new(resolution: usize, aspect: f32, step_size: f32) -> Self {
        Self {
            resolution: resolution.max(MIN_RESOLUTION),
            aspect,
            step_size,
        }
    }

    pub fn resolution(&self) -> usize {
        self.resolution
    }

    pub fn step_size(&self) -> f32 {
        self.step_size
    }

    pub fn tiles_x(&self) -> usize {
        self.resolution.div_ceil(TILE_SIZE)
    }

    pub fn tiles_y(&self) -> usize {
        let rows = (self.resolution as f32 * self.aspect) as usize;
        rows.max(1).div_ceil(TILE_SIZE)
    }

    pub fn width(&self) -> usize {
        self.tiles_x() * TILE_SIZE
    }

    pub fn height(&self) -> usize {
        self.tiles_y() * TILE_SIZE
    }

    pub fn size(&self) -> usize {
        self.width() * self.height()
    }

    /// Cell spacing in normalised units, `1 / height`.
    pub fn dx(&self) -> f32 {
        1.0 / self.height() as f32
    }

    /// World-space length of one grid side, `resolution * step_size`.
    pub fn world_extent(&self) -> f32 {
        self.resolution as f32 * self.step_size
    }

    /// Workgroup counts for a 2D dispatch over the whole grid.
    pub fn dispatch_size(&self) -> (u32, u32, u32) {
        (self.tiles_x() as u32, self.tiles_y() as u32, 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_rounds_up_to_tiles() {
        let grid = SimulationGrid::new(8, 1.0, 0.5);
        assert_eq!((grid.width(), grid.height()), (8, 8));

        let grid = SimulationGrid::new(13, 1.0, 0.5);
        assert_eq!((grid.width(), grid.height()), (16, 16));
        assert_eq!(grid.dispatch_size(), (2, 2, 1));
    }

    #[test]
    fn resolution_is_clamped_to_minimum() {
        let grid = SimulationGrid::new(3, 1.0, 0.5);
        assert_eq!(grid.resolution(), MIN_RESOLUTION);
        assert_eq!(grid.width(), 8);
    }

    #[test]
    fn aspect_shapes_height() {
        let grid = SimulationGrid::new(64, 0.5, 1.0);
        assert_eq!(grid.width(), 64);
        assert_eq!(grid.height(), 32);
        assert_eq!(grid.dx(), 1.0 / 32.0);
    }

    #[test]
    fn world_extent_uses_requested_resolution() {
        let grid = SimulationGrid::new(13, 1.0, 0.5);
        assert_eq!(grid.world_extent(), 6.5);
    }
}
