use glam::{IVec2, Vec3};

/// Snaps `value` onto a lattice of pitch `snap` by subtracting the truncating
/// remainder. Negative values therefore snap toward positive infinity.
pub fn snap(value: f32, snap: f32) -> f32 {
    value - value % snap
}

/// Follows a target on a snapped horizontal lattice and reports how many
/// whole cells the lattice moved since the previous update.
#[derive(Clone, Debug, PartialEq)]
pub struct GridTracker {
    step_size: f32,
    height: f32,
    previous: Vec3,
    current: Vec3,
}

impl GridTracker {
    pub fn new(target: Vec3, step_size: f32, height: f32) -> Self {
        let mut tracker = Self {
            step_size,
            height,
            previous: Vec3::ZERO,
            current: Vec3::ZERO,
        };
        tracker.current = tracker.snap_position(target);
        tracker.previous = tracker.current;
        tracker
    }

    pub fn step_size(&self) -> f32 {
        self.step_size
    }

    /// Current snapped grid origin in world space.
    pub fn position(&self) -> Vec3 {
        self.current
    }

    pub fn previous_position(&self) -> Vec3 {
        self.previous
    }

    pub fn snap_position(&self, position: Vec3) -> Vec3 {
        Vec3::new(
            snap(position.x, self.step_size),
            position.y + self.height,
            snap(position.z, self.step_size),
        )
    }

    /// Re-snaps the target and returns the cell delta `(round(dx/step),
    /// round(dz/step))` relative to the previous snapped position.
    pub fn update(&mut self, target: Vec3) -> IVec2 {
        self.previous = self.current;
        self.current = self.snap_position(target);

        let delta = self.current - self.previous;
        IVec2::new(
            (delta.x / self.step_size).round() as i32,
            (delta.z / self.step_size).round() as i32,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snap_stays_within_one_step_for_positive_values() {
        for i in 0..200 {
            let v = i as f32 * 0.25 + 0.1;
            let s = 0.5;
            let d = v - snap(v, s);
            assert!((0.0..s).contains(&d), "v={v} d={d}");
        }
    }

    #[test]
    fn snap_negative_rounds_toward_positive_infinity() {
        // -1.2 % 0.5 == -0.2 so the snap lands on -1.0, not -1.5
        assert!((snap(-1.2, 0.5) - (-1.0)).abs() < 1e-6);
        assert!((snap(-0.3, 0.5) - 0.0).abs() < 1e-6);
    }

    #[test]
    fn stationary_target_yields_zero_offset() {
        let target = Vec3::new(3.3, 1.0, -7.9);
        let mut tracker = GridTracker::new(target, 0.5, 0.4);
        for _ in 0..10 {
            assert_eq!(tracker.update(target), IVec2::ZERO);
        }
    }

    #[test]
    fn snapped_position_adds_height() {
        let tracker = GridTracker::new(Vec3::new(1.3, 2.0, 0.7), 0.5, 0.4);
        let p = tracker.position();
        assert!((p.x - 1.0).abs() < 1e-6);
        assert!((p.y - 2.4).abs() < 1e-6);
        assert!((p.z - 0.5).abs() < 1e-6);
    }

    #[test]
    fn crossing_cells_reports_offset() {
        let mut tracker = GridTracker::new(Vec3::new(0.1, 0.0, 0.1), 0.5, 0.0);
        assert_eq!(tracker.update(Vec3::new(0.6, 0.0, 0.1)), IVec2::new(1, 0));
        assert_eq!(tracker.update(Vec3::new(0.6, 0.0, 1.2)), IVec2::new(0, 2));
        assert_eq!(tracker.update(Vec3::new(0.6, 0.0, 1.2)), IVec2::ZERO);
    }
}
