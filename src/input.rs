//! Obstacle sampling into the grid-local input array consumed by the force kernel.

use crate::error::{FluidError, Result};
use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};

/// Kind of obstacle stirring the fluid, with the radius data each kind carries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Obstacle {
    /// The tracked character. Its radius is used as-is.
    PrimaryMover { radius: f32 },
    /// A sphere whose native radius is multiplied by its uniform scale.
    SecondarySphere { radius: f32, scale: f32 },
}

impl Obstacle {
    pub fn world_radius(&self) -> f32 {
        match *self {
            Obstacle::PrimaryMover { radius } => radius,
            Obstacle::SecondarySphere { radius, scale } => radius * scale,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ObstacleTransform {
    pub position: Vec3,
    pub obstacle: Obstacle,
}

impl ObstacleTransform {
    pub fn primary(position: Vec3, radius: f32) -> Self {
        Self {
            position,
            obstacle: Obstacle::PrimaryMover { radius },
        }
    }

    pub fn sphere(position: Vec3, radius: f32, scale: f32) -> Self {
        Self {
            position,
            obstacle: Obstacle::SecondarySphere { radius, scale },
        }
    }
}

/// Read-only view of all obstacles for one step.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ObstacleSnapshot {
    pub primary: Option<ObstacleTransform>,
    pub secondary: Vec<ObstacleTransform>,
}

/// One entry of the force kernel's structured input buffer.
///
/// Layout is five packed floats: position, velocity, radius.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ObstacleRecord {
    pub position: [f32; 2],
    pub velocity: [f32; 2],
    pub radius: f32,
}

pub const OBSTACLE_RECORD_STRIDE: usize = std::mem::size_of::<ObstacleRecord>();

impl ObstacleRecord {
    pub fn position(&self) -> Vec2 {
        Vec2::from(self.position)
    }

    pub fn velocity(&self) -> Vec2 {
        Vec2::from(self.velocity)
    }
}

/// Projects a world-space vector onto the horizontal plane, in units of the
/// grid's world extent.
pub fn project_to_grid(v: Vec3, extent: f32) -> Vec2 {
    Vec2::new(v.x, v.z) / extent
}

/// Converts obstacle transforms into [`ObstacleRecord`]s each step.
///
/// Slot 0 always belongs to the primary mover and holds a zeroed record when
/// there is none; secondary spheres follow in snapshot order. The slot count
/// is fixed when the sampler is built.
#[derive(Clone, Debug)]
pub struct InputSampler {
    records: Vec<ObstacleRecord>,
    previous: Vec<Option<Vec3>>,
    radius_scale: f32,
    velocity_scale: f32,
}

impl InputSampler {
    pub fn new(secondary_count: usize, radius_scale: f32, velocity_scale: f32) -> Self {
        let slots = secondary_count + 1;
        Self {
            records: vec![ObstacleRecord::default(); slots],
            previous: vec![None; slots],
            radius_scale,
            velocity_scale,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn secondary_count(&self) -> usize {
        self.records.len() - 1
    }

    pub fn records(&self) -> &[ObstacleRecord] {
        &self.records
    }

    /// Raw bytes of the record array, ready for a structured-buffer upload.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.records)
    }

    /// Forgets all position history so the next sample is a seeding sample.
    pub fn reset(&mut self) {
        self.previous.fill(None);
        self.records.fill(ObstacleRecord::default());
    }

    /// Samples every obstacle relative to the grid `origin`. `extent` is the
    /// grid's world size (`resolution * step_size`).
    pub fn sample(
        &mut self,
        snapshot: &ObstacleSnapshot,
        origin: Vec3,
        extent: f32,
    ) -> Result<&[ObstacleRecord]> {
        if snapshot.secondary.len() != self.secondary_count() {
            return Err(FluidError::ObstacleCountChanged {
                expected: self.secondary_count(),
                found: snapshot.secondary.len(),
            });
        }

        match &snapshot.primary {
            Some(primary) => self.sample_slot(0, primary, origin, extent),
            None => {
                self.records[0] = ObstacleRecord::default();
                self.previous[0] = None;
            }
        }

        for (i, sphere) in snapshot.secondary.iter().enumerate() {
            self.sample_slot(i + 1, sphere, origin, extent);
        }

        Ok(&self.records)
    }

    fn sample_slot(&mut self, index: usize, transform: &ObstacleTransform, origin: Vec3, extent: f32) {
        let position = transform.position;

        let pos2d = project_to_grid(position - origin, extent) + Vec2::splat(0.5);

        let velocity = match self.previous[index] {
            Some(previous) => project_to_grid(previous - position, extent) * self.velocity_scale,
            None => Vec2::ZERO,
        };
        self.previous[index] = Some(position);

        let radius = self.radius_scale * transform.obstacle.world_radius() / extent;

        self.records[index] = ObstacleRecord {
            position: pos2d.to_array(),
            velocity: velocity.to_array(),
            radius,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sampler(secondary: usize) -> InputSampler {
        InputSampler::new(secondary, 1.0, 1.0)
    }

    #[test]
    fn record_stride_is_five_floats() {
        assert_eq!(OBSTACLE_RECORD_STRIDE, 20);
        let s = sampler(2);
        assert_eq!(s.as_bytes().len(), 3 * 20);
    }

    #[test]
    fn first_sample_has_zero_velocity() {
        let mut s = sampler(1);
        let snapshot = ObstacleSnapshot {
            primary: Some(ObstacleTransform::primary(Vec3::new(100.0, 0.0, -40.0), 0.5)),
            secondary: vec![ObstacleTransform::sphere(Vec3::new(-3.0, 1.0, 9.0), 0.5, 2.0)],
        };
        let records = s.sample(&snapshot, Vec3::ZERO, 4.0).unwrap();
        assert!(records.iter().all(|r| r.velocity == [0.0, 0.0]));
    }

    #[test]
    fn velocity_uses_previous_minus_current() {
        let mut s = InputSampler::new(0, 1.0, 2.0);
        let mut snapshot = ObstacleSnapshot {
            primary: Some(ObstacleTransform::primary(Vec3::ZERO, 0.5)),
            secondary: vec![],
        };
        s.sample(&snapshot, Vec3::ZERO, 4.0).unwrap();
        snapshot.primary = Some(ObstacleTransform::primary(Vec3::new(1.0, 0.0, 0.0), 0.5));
        let records = s.sample(&snapshot, Vec3::ZERO, 4.0).unwrap();
        // (0 - 1) / 4 * 2
        assert_eq!(records[0].velocity, [-0.5, 0.0]);
        assert_eq!(records[0].position, [0.75, 0.5]);
    }

    #[test]
    fn absent_primary_keeps_placeholder_slot() {
        let mut s = sampler(1);
        let snapshot = ObstacleSnapshot {
            primary: None,
            secondary: vec![ObstacleTransform::sphere(Vec3::ZERO, 1.0, 1.0)],
        };
        let records = s.sample(&snapshot, Vec3::ZERO, 8.0).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], ObstacleRecord::default());
        assert_eq!(records[1].radius, 1.0 / 8.0);
    }

    #[test]
    fn empty_snapshot_still_produces_one_slot() {
        let mut s = sampler(0);
        let records = s.sample(&ObstacleSnapshot::default(), Vec3::ZERO, 8.0).unwrap();
        assert_eq!(records, &[ObstacleRecord::default()]);
    }

    #[test]
    fn radius_is_linear_in_scale_and_inverse_in_extent() {
        let mut s = InputSampler::new(1, 2.2, 1.0);
        let mut snapshot = ObstacleSnapshot {
            primary: None,
            secondary: vec![ObstacleTransform::sphere(Vec3::ZERO, 0.5, 1.0)],
        };
        let base = s.sample(&snapshot, Vec3::ZERO, 8.0).unwrap()[1].radius;

        snapshot.secondary[0] = ObstacleTransform::sphere(Vec3::ZERO, 0.5, 2.0);
        let doubled_scale = s.sample(&snapshot, Vec3::ZERO, 8.0).unwrap()[1].radius;
        assert!((doubled_scale - 2.0 * base).abs() < 1e-6);

        snapshot.secondary[0] = ObstacleTransform::sphere(Vec3::ZERO, 0.5, 1.0);
        let doubled_step = s.sample(&snapshot, Vec3::ZERO, 16.0).unwrap()[1].radius;
        assert!((doubled_step - 0.5 * base).abs() < 1e-6);
    }

    #[test]
    fn changing_secondary_count_is_rejected() {
        let mut s = sampler(1);
        let err = s.sample(&ObstacleSnapshot::default(), Vec3::ZERO, 8.0).unwrap_err();
        assert!(matches!(
            err,
            FluidError::ObstacleCountChanged { expected: 1, found: 0 }
        ));
    }

    #[test]
    fn primary_appearing_later_is_seeded() {
        let mut s = sampler(0);
        s.sample(&ObstacleSnapshot::default(), Vec3::ZERO, 8.0).unwrap();
        let snapshot = ObstacleSnapshot {
            primary: Some(ObstacleTransform::primary(Vec3::new(5.0, 0.0, 5.0), 0.5)),
            secondary: vec![],
        };
        let records = s.sample(&snapshot, Vec3::ZERO, 8.0).unwrap();
        assert_eq!(records[0].velocity, [0.0, 0.0]);
    }
}
