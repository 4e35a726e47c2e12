use crate::field::VectorField;

#[derive(Debug, Clone, PartialEq)]
pub struct FieldMetrics {
    pub max_speed: f32,
    pub avg_speed: f32,
    pub kinetic_energy: f32,
    pub mean_divergence: f32,
    pub mean_vorticity: f32,
    pub non_finite: usize,
    pub step: u64,
}

impl FieldMetrics {
    /// Summarises a velocity field. Divergence and vorticity are central
    /// differences over interior cells, in the solver's `height / 2` scaling.
    pub fn analyze(field: &VectorField, step: u64) -> Self {
        let (width, height) = (field.width(), field.height());
        let half_h = height as f32 / 2.0;

        let mut max_speed: f32 = 0.0;
        let mut speed_sum: f32 = 0.0;
        let mut kinetic_energy: f32 = 0.0;
        let mut non_finite = 0;

        for v in field.data() {
            if !v.is_finite() {
                non_finite += 1;
                continue;
            }
            let speed = v.length();
            max_speed = max_speed.max(speed);
            speed_sum += speed;
            kinetic_energy += 0.5 * speed * speed;
        }

        let mut total_divergence = 0.0;
        let mut total_vorticity = 0.0;
        let mut interior = 0usize;
        for y in 1..height - 1 {
            for x in 1..width - 1 {
                let left = field.get(x - 1, y);
                let right = field.get(x + 1, y);
                let down = field.get(x, y - 1);
                let up = field.get(x, y + 1);

                // ∇·v
                let divergence = (right.x - left.x + up.y - down.y) * half_h;
                // ∇×v
                let vorticity = (right.y - left.y - (up.x - down.x)) * half_h;

                if divergence.is_finite() && vorticity.is_finite() {
                    total_divergence += divergence.abs();
                    total_vorticity += vorticity.abs();
                    interior += 1;
                }
            }
        }

        let cells = field.data().len().max(1) as f32;
        let interior = interior.max(1) as f32;

        Self {
            max_speed,
            avg_speed: speed_sum / cells,
            kinetic_energy,
            mean_divergence: total_divergence / interior,
            mean_vorticity: total_vorticity / interior,
            non_finite,
            step,
        }
    }

    pub fn log_summary(&self) {
        log::info!(
            "Step {}: max speed {:.6}, avg speed {:.6}, kinetic energy {:.6}, mean |div| {:.6}, mean |curl| {:.6}, non-finite {}",
            self.step,
            self.max_speed,
            self.avg_speed,
            self.kinetic_energy,
            self.mean_divergence,
            self.mean_vorticity,
            self.non_finite
        );
    }
}

#[derive(Debug, Default)]
pub struct MetricsRecorder {
    pub history: Vec<FieldMetrics>,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, field: &VectorField, step: u64) -> &FieldMetrics {
        self.history.push(FieldMetrics::analyze(field, step));
        &self.history[self.history.len() - 1]
    }

    pub fn peak_speed(&self) -> f32 {
        self.history.iter().map(|m| m.max_speed).fold(0.0, f32::max)
    }

    pub fn log_trends(&self) {
        let (Some(first), Some(last)) = (self.history.first(), self.history.last()) else {
            return;
        };
        if self.history.len() < 2 {
            return;
        }

        log::info!("=== TREND ANALYSIS ===");
        log::info!(
            "Kinetic energy: {:.6} -> {:.6} ({:+.3}%)",
            first.kinetic_energy,
            last.kinetic_energy,
            (last.kinetic_energy - first.kinetic_energy) / first.kinetic_energy.max(0.001) * 100.0
        );
        log::info!(
            "Mean |div|: {:.6} -> {:.6}, peak speed {:.6}",
            first.mean_divergence,
            last.mean_divergence,
            self.peak_speed()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::BufferSlot;
    use glam::Vec2;

    #[test]
    fn rotation_has_vorticity_but_no_divergence() {
        let field = VectorField::from_fn(BufferSlot::V1, 16, 16, |x, y| {
            Vec2::new(-(y as f32 - 7.5), x as f32 - 7.5) * 0.01
        });
        let m = FieldMetrics::analyze(&field, 0);
        assert!(m.mean_divergence < 1e-5);
        assert!(m.mean_vorticity > 0.1);
        assert_eq!(m.non_finite, 0);
    }

    #[test]
    fn counts_non_finite_cells() {
        let mut field = VectorField::new(BufferSlot::V1, 8, 8);
        field.set(3, 3, Vec2::new(f32::NAN, 0.0));
        let m = FieldMetrics::analyze(&field, 7);
        assert_eq!(m.non_finite, 1);
        assert_eq!(m.step, 7);
        assert_eq!(m.max_speed, 0.0);
    }

    #[test]
    fn recorder_tracks_peak() {
        let mut recorder = MetricsRecorder::new();
        let still = VectorField::new(BufferSlot::V1, 8, 8);
        let moving = VectorField::from_fn(BufferSlot::V1, 8, 8, |_, _| Vec2::new(0.3, 0.4));
        recorder.record(&still, 0);
        recorder.record(&moving, 1);
        assert!((recorder.peak_speed() - 0.5).abs() < 1e-6);
    }
}
