use crate::grid::SimulationGrid;
use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How reads outside the grid are resolved.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgePolicy {
    /// Out-of-range reads return zero.
    #[default]
    Zero,
    /// Out-of-range reads hold the nearest edge cell.
    Clamp,
    /// Out-of-range reads wrap around (toroidal).
    Wrap,
}

/// Identity of a solver-owned buffer. Carried by every field so a dispatch
/// trace can say which buffer was read and which was written.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BufferSlot {
    V1,
    V2,
    V3,
    P1,
    P2,
    Divergence,
}

impl fmt::Display for BufferSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BufferSlot::V1 => "V1",
            BufferSlot::V2 => "V2",
            BufferSlot::V3 => "V3",
            BufferSlot::P1 => "P1",
            BufferSlot::P2 => "P2",
            BufferSlot::Divergence => "DivW",
        };
        f.write_str(label)
    }
}

/// Row-major 2D buffer of cell values.
#[derive(Clone, Debug, PartialEq)]
pub struct Field<T> {
    slot: BufferSlot,
    width: usize,
    height: usize,
    data: Vec<T>,
}

pub type VectorField = Field<Vec2>;
pub type ScalarField = Field<f32>;

impl<T: Copy + Default> Field<T> {
    pub fn new(slot: BufferSlot, width: usize, height: usize) -> Self {
        Self {
            slot,
            width,
            height,
            data: vec![T::default(); width * height],
        }
    }

    pub fn for_grid(slot: BufferSlot, grid: &SimulationGrid) -> Self {
        Self::new(slot, grid.width(), grid.height())
    }

    pub fn from_fn(
        slot: BufferSlot,
        width: usize,
        height: usize,
        f: impl Fn(usize, usize) -> T,
    ) -> Self {
        let data = (0..width * height).map(|i| f(i % width, i / width)).collect();
        Self {
            slot,
            width,
            height,
            data,
        }
    }

    pub fn slot(&self) -> BufferSlot {
        self.slot
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn idx(&self, x: usize, y: usize) -> usize {
        debug_assert!(x < self.width && y < self.height);
        y * self.width + x
    }

    pub fn get(&self, x: usize, y: usize) -> T {
        self.data[self.idx(x, y)]
    }

    pub fn set(&mut self, x: usize, y: usize, value: T) {
        let idx = self.idx(x, y);
        self.data[idx] = value;
    }

    /// Reads a possibly out-of-range cell. Out-of-range reads return zero,
    /// matching storage-texture loads.
    pub fn load(&self, x: i64, y: i64) -> T {
        self.read(x, y, EdgePolicy::Zero)
    }

    pub fn read(&self, x: i64, y: i64, policy: EdgePolicy) -> T {
        let (w, h) = (self.width as i64, self.height as i64);
        let inside = (0..w).contains(&x) && (0..h).contains(&y);
        if inside {
            return self.data[(y * w + x) as usize];
        }
        match policy {
            EdgePolicy::Zero => T::default(),
            EdgePolicy::Clamp => {
                let cx = x.clamp(0, w - 1);
                let cy = y.clamp(0, h - 1);
                self.data[(cy * w + cx) as usize]
            }
            EdgePolicy::Wrap => {
                let cx = x.rem_euclid(w);
                let cy = y.rem_euclid(h);
                self.data[(cy * w + cx) as usize]
            }
        }
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }

    /// Copies cell contents from `other`; the slot tag stays.
    pub fn copy_from(&mut self, other: &Self) {
        debug_assert_eq!((self.width, self.height), (other.width, other.height));
        self.data.copy_from_slice(&other.data);
    }
}

impl VectorField {
    /// Bilinear sample at a continuous cell-space position (cell centres at
    /// integer coordinates), clamped to the grid.
    pub fn sample_linear(&self, pos: Vec2) -> Vec2 {
        let max = Vec2::new((self.width - 1) as f32, (self.height - 1) as f32);
        let p = pos.clamp(Vec2::ZERO, max);
        let x0 = p.x.floor() as i64;
        let y0 = p.y.floor() as i64;
        let sx = p.x - x0 as f32;
        let sy = p.y - y0 as f32;

        let v00 = self.read(x0, y0, EdgePolicy::Clamp);
        let v10 = self.read(x0 + 1, y0, EdgePolicy::Clamp);
        let v01 = self.read(x0, y0 + 1, EdgePolicy::Clamp);
        let v11 = self.read(x0 + 1, y0 + 1, EdgePolicy::Clamp);

        v00.lerp(v10, sx).lerp(v01.lerp(v11, sx), sy)
    }
}

/// A borrowed buffer of either kind.
#[derive(Clone, Copy, Debug)]
pub enum FieldRef<'a> {
    Vector(&'a VectorField),
    Scalar(&'a ScalarField),
}

impl FieldRef<'_> {
    pub fn slot(&self) -> BufferSlot {
        match self {
            FieldRef::Vector(field) => field.slot(),
            FieldRef::Scalar(field) => field.slot(),
        }
    }

    pub fn width(&self) -> usize {
        match self {
            FieldRef::Vector(field) => field.width(),
            FieldRef::Scalar(field) => field.width(),
        }
    }

    pub fn height(&self) -> usize {
        match self {
            FieldRef::Vector(field) => field.height(),
            FieldRef::Scalar(field) => field.height(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> ScalarField {
        ScalarField::from_fn(BufferSlot::P1, 4, 3, |x, y| (y * 4 + x) as f32)
    }

    #[test]
    fn out_of_range_policies() {
        let field = ramp();
        assert_eq!(field.read(-1, 0, EdgePolicy::Zero), 0.0);
        assert_eq!(field.read(5, 1, EdgePolicy::Clamp), field.get(3, 1));
        assert_eq!(field.read(-1, 0, EdgePolicy::Wrap), field.get(3, 0));
        assert_eq!(field.read(0, 3, EdgePolicy::Wrap), field.get(0, 0));
        assert_eq!(field.load(2, 2), 10.0);
    }

    #[test]
    fn copy_keeps_slot() {
        let src = ramp();
        let mut dst = ScalarField::new(BufferSlot::P2, 4, 3);
        dst.copy_from(&src);
        assert_eq!(dst.slot(), BufferSlot::P2);
        assert_eq!(dst.data(), src.data());
    }

    #[test]
    fn bilinear_sample_interpolates_between_centres() {
        let field = VectorField::from_fn(BufferSlot::V1, 2, 2, |x, _| Vec2::new(x as f32, 0.0));
        let v = field.sample_linear(Vec2::new(0.25, 0.5));
        assert!((v.x - 0.25).abs() < 1e-6);
        // Clamped outside the grid
        assert_eq!(field.sample_linear(Vec2::new(-3.0, 0.0)).x, 0.0);
        assert_eq!(field.sample_linear(Vec2::new(9.0, 9.0)).x, 1.0);
    }
}
