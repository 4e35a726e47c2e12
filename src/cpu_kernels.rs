//! Reference CPU implementation of the fluid kernels, row-parallel with rayon.
//!
//! Velocities are in height-normalised uv units per second. Storage reads
//! outside the grid return zero unless noted.

use crate::field::{EdgePolicy, ScalarField, VectorField};
use crate::input::ObstacleRecord;
use crate::kernels::{ComputeKernels, KernelUniforms};
use glam::Vec2;
use rayon::prelude::*;

#[derive(Clone, Copy, Debug, Default)]
pub struct CpuKernels {
    edge_policy: EdgePolicy,
}

impl CpuKernels {
    pub fn new(edge_policy: EdgePolicy) -> Self {
        Self { edge_policy }
    }

    pub fn edge_policy(&self) -> EdgePolicy {
        self.edge_policy
    }
}

/// Sum of the four axis neighbours, zero outside the grid.
fn neighbour_sum_vec(field: &VectorField, x: i64, y: i64) -> Vec2 {
    field.load(x - 1, y) + field.load(x + 1, y) + field.load(x, y - 1) + field.load(x, y + 1)
}

fn neighbour_sum_scalar(field: &ScalarField, x: i64, y: i64) -> f32 {
    field.load(x - 1, y) + field.load(x + 1, y) + field.load(x, y - 1) + field.load(x, y + 1)
}

/// Radial obstacle falloff: `(1 - d²/r²) * exp(-exponent * d²)` inside the
/// radius, zero outside.
pub fn obstacle_weight(dist_sq: f32, radius: f32, exponent: f32) -> f32 {
    let r_sq = radius * radius;
    if radius <= 0.0 || dist_sq >= r_sq {
        return 0.0;
    }
    (1.0 - dist_sq / r_sq) * (-exponent * dist_sq).exp()
}

impl ComputeKernels for CpuKernels {
    fn offset(&mut self, uniforms: &KernelUniforms, w_in: &VectorField, w_out: &mut VectorField) {
        let offset = uniforms.offset();
        let policy = self.edge_policy;
        let width = w_out.width();

        w_out
            .data_mut()
            .par_chunks_mut(width)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, cell) in row.iter_mut().enumerate() {
                    *cell = w_in.read(
                        x as i64 + offset.x as i64,
                        y as i64 + offset.y as i64,
                        policy,
                    );
                }
            });
    }

    fn advect(&mut self, uniforms: &KernelUniforms, u_in: &VectorField, w_out: &mut VectorField) {
        let width = w_out.width();
        let scale = uniforms.delta_time * u_in.height() as f32;

        w_out
            .data_mut()
            .par_chunks_mut(width)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, cell) in row.iter_mut().enumerate() {
                    let here = Vec2::new(x as f32, y as f32);
                    let source = here - u_in.get(x, y) * scale;
                    *cell = u_in.sample_linear(source);
                }
            });
    }

    fn jacobi2(
        &mut self,
        uniforms: &KernelUniforms,
        x2_in: &VectorField,
        b2_in: &VectorField,
        x2_out: &mut VectorField,
    ) {
        let (alpha, beta) = (uniforms.alpha, uniforms.beta);
        let width = x2_out.width();

        x2_out
            .data_mut()
            .par_chunks_mut(width)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, cell) in row.iter_mut().enumerate() {
                    let sum = neighbour_sum_vec(x2_in, x as i64, y as i64);
                    *cell = (sum + alpha * b2_in.get(x, y)) / beta;
                }
            });
    }

    fn force(
        &mut self,
        uniforms: &KernelUniforms,
        w_in: &VectorField,
        fluid_input: &[ObstacleRecord],
        w_out: &mut VectorField,
    ) {
        let count = (uniforms.fluid_input_count as usize).min(fluid_input.len());
        let records = &fluid_input[..count];
        let (force, exponent) = (uniforms.force, uniforms.exponent);
        let width = w_out.width();
        let size = Vec2::new(w_out.width() as f32, w_out.height() as f32);

        w_out
            .data_mut()
            .par_chunks_mut(width)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, cell) in row.iter_mut().enumerate() {
                    let uv = (Vec2::new(x as f32, y as f32) + 0.5) / size;
                    let mut push = Vec2::ZERO;
                    for record in records {
                        let dist_sq = (uv - record.position()).length_squared();
                        let weight = obstacle_weight(dist_sq, record.radius, exponent);
                        // Records carry previous-minus-current displacement.
                        push -= record.velocity() * force * weight;
                    }
                    *cell = w_in.get(x, y) + push;
                }
            });
    }

    fn projection_setup(
        &mut self,
        _uniforms: &KernelUniforms,
        w_in: &VectorField,
        div_w_out: &mut ScalarField,
        p_out: &mut ScalarField,
    ) {
        let width = div_w_out.width();
        let half_h = w_in.height() as f32 / 2.0;

        div_w_out
            .data_mut()
            .par_chunks_mut(width)
            .enumerate()
            .for_each(|(y, row)| {
                let y = y as i64;
                for (x, cell) in row.iter_mut().enumerate() {
                    let x = x as i64;
                    let dudx = w_in.load(x + 1, y).x - w_in.load(x - 1, y).x;
                    let dvdy = w_in.load(x, y + 1).y - w_in.load(x, y - 1).y;
                    *cell = (dudx + dvdy) * half_h;
                }
            });

        p_out.fill(0.0);
    }

    fn jacobi1(
        &mut self,
        uniforms: &KernelUniforms,
        x1_in: &ScalarField,
        b1_in: &ScalarField,
        x1_out: &mut ScalarField,
    ) {
        let (alpha, beta) = (uniforms.alpha, uniforms.beta);
        let width = x1_out.width();

        x1_out
            .data_mut()
            .par_chunks_mut(width)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, cell) in row.iter_mut().enumerate() {
                    let sum = neighbour_sum_scalar(x1_in, x as i64, y as i64);
                    *cell = (sum + alpha * b1_in.get(x, y)) / beta;
                }
            });
    }

    fn projection_finish(
        &mut self,
        _uniforms: &KernelUniforms,
        w_in: &VectorField,
        p_in: &ScalarField,
        u_out: &mut VectorField,
    ) {
        let (width, height) = (u_out.width(), u_out.height());
        let half_h = height as f32 / 2.0;

        // Interior: subtract the pressure gradient, reading pressure from the
        // interior band only.
        u_out
            .data_mut()
            .par_chunks_mut(width)
            .enumerate()
            .for_each(|(y, row)| {
                if y == 0 || y == height - 1 {
                    return;
                }
                for x in 1..width - 1 {
                    let left = p_in.get((x - 1).max(1), y);
                    let right = p_in.get((x + 1).min(width - 2), y);
                    let down = p_in.get(x, (y - 1).max(1));
                    let up = p_in.get(x, (y + 1).min(height - 2));
                    row[x] = w_in.get(x, y) - Vec2::new(right - left, up - down) * half_h;
                }
            });

        // Boundary: reflect the adjacent interior cell.
        for y in 1..height - 1 {
            let inner_left = u_out.get(1, y);
            let inner_right = u_out.get(width - 2, y);
            u_out.set(0, y, -inner_left);
            u_out.set(width - 1, y, -inner_right);
        }
        for x in 1..width - 1 {
            let inner_bottom = u_out.get(x, 1);
            let inner_top = u_out.get(x, height - 2);
            u_out.set(x, 0, -inner_bottom);
            u_out.set(x, height - 1, -inner_top);
        }
        for (x, y) in [(0, 0), (width - 1, 0), (0, height - 1), (width - 1, height - 1)] {
            u_out.set(x, y, Vec2::ZERO);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::BufferSlot;
    use glam::IVec2;

    fn vectors(width: usize, height: usize, f: impl Fn(usize, usize) -> Vec2) -> VectorField {
        VectorField::from_fn(BufferSlot::V1, width, height, f)
    }

    #[test]
    fn offset_shifts_and_zero_fills() {
        let src = vectors(8, 8, |x, y| Vec2::new(x as f32, y as f32));
        let mut dst = VectorField::new(BufferSlot::V3, 8, 8);
        let mut u = KernelUniforms::default();
        u.set_offset(IVec2::new(1, 0));

        CpuKernels::new(EdgePolicy::Zero).offset(&u, &src, &mut dst);

        assert_eq!(dst.get(0, 3), Vec2::new(1.0, 3.0));
        assert_eq!(dst.get(6, 3), Vec2::new(7.0, 3.0));
        assert_eq!(dst.get(7, 3), Vec2::ZERO);
    }

    #[test]
    fn offset_wrap_policy_is_toroidal() {
        let src = vectors(8, 8, |x, _| Vec2::new(x as f32, 0.0));
        let mut dst = VectorField::new(BufferSlot::V3, 8, 8);
        let mut u = KernelUniforms::default();
        u.set_offset(IVec2::new(2, 0));

        CpuKernels::new(EdgePolicy::Wrap).offset(&u, &src, &mut dst);

        assert_eq!(dst.get(6, 0).x, 0.0);
        assert_eq!(dst.get(7, 0).x, 1.0);
    }

    #[test]
    fn advect_uniform_flow_is_unchanged() {
        let flow = Vec2::new(0.01, -0.02);
        let src = vectors(16, 16, |_, _| flow);
        let mut dst = VectorField::new(BufferSlot::V2, 16, 16);
        let u = KernelUniforms::new(0.0, 1.0 / 60.0, 0.0, 0.0);

        CpuKernels::default().advect(&u, &src, &mut dst);

        for v in dst.data() {
            assert!((*v - flow).length() < 1e-6);
        }
    }

    #[test]
    fn advect_moves_features_downstream() {
        // A single blob at x=4 in a flow that moves one cell per step to +x.
        let height = 16;
        let dt = 1.0 / 60.0;
        let speed = 1.0 / (dt * height as f32);
        let src = vectors(16, height, |x, _| {
            Vec2::new(speed, if x == 4 { 1.0 } else { 0.0 })
        });
        let mut dst = VectorField::new(BufferSlot::V2, 16, height);
        let u = KernelUniforms::new(0.0, dt, 0.0, 0.0);

        CpuKernels::default().advect(&u, &src, &mut dst);

        assert!((dst.get(5, 8).y - 1.0).abs() < 1e-4);
        assert!(dst.get(4, 8).y.abs() < 1e-4);
    }

    #[test]
    fn jacobi_sweep_averages_neighbours() {
        let x_in = ScalarField::from_fn(BufferSlot::P1, 3, 3, |x, y| if (x, y) == (1, 1) { 0.0 } else { 1.0 });
        let b = ScalarField::new(BufferSlot::Divergence, 3, 3);
        let mut out = ScalarField::new(BufferSlot::P2, 3, 3);
        let mut u = KernelUniforms::default();
        u.set_jacobi(-1.0, 4.0);

        CpuKernels::default().jacobi1(&u, &x_in, &b, &mut out);

        assert_eq!(out.get(1, 1), 1.0);
        // Two of the corner's neighbours fall outside the grid and read zero.
        assert_eq!(out.get(0, 0), 0.5);
    }

    #[test]
    fn divergence_of_radial_flow_is_positive() {
        let src = vectors(8, 8, |x, y| Vec2::new(x as f32 - 3.5, y as f32 - 3.5) * 0.01);
        let mut div = ScalarField::new(BufferSlot::Divergence, 8, 8);
        let mut p = ScalarField::from_fn(BufferSlot::P1, 8, 8, |_, _| 5.0);

        CpuKernels::default().projection_setup(&KernelUniforms::default(), &src, &mut div, &mut p);

        // central differences of 0.02 on both axes, scaled by height / 2
        assert!((div.get(3, 3) - 0.16).abs() < 1e-6);
        assert!(p.data().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn projection_finish_reflects_boundaries() {
        let src = vectors(8, 8, |_, _| Vec2::new(0.5, 0.25));
        let p = ScalarField::new(BufferSlot::P1, 8, 8);
        let mut out = VectorField::new(BufferSlot::V1, 8, 8);

        CpuKernels::default().projection_finish(&KernelUniforms::default(), &src, &p, &mut out);

        assert_eq!(out.get(3, 3), Vec2::new(0.5, 0.25));
        assert_eq!(out.get(0, 3), Vec2::new(-0.5, -0.25));
        assert_eq!(out.get(3, 7), Vec2::new(-0.5, -0.25));
        assert_eq!(out.get(0, 0), Vec2::ZERO);
    }

    #[test]
    fn force_pushes_along_motion_inside_radius() {
        let src = VectorField::new(BufferSlot::V2, 8, 8);
        let mut out = VectorField::new(BufferSlot::V3, 8, 8);
        let record = ObstacleRecord {
            position: [0.5, 0.5],
            // moved toward +x: previous - current is negative
            velocity: [-0.01, 0.0],
            radius: 0.3,
        };
        let mut u = KernelUniforms::new(0.0, 1.0 / 60.0, 300.0, 0.0);
        u.fluid_input_count = 1;

        CpuKernels::default().force(&u, &src, &[record], &mut out);

        // Cell (3,3) centre is at uv (0.4375, 0.4375), inside the radius.
        assert!(out.get(3, 3).x > 0.0);
        assert_eq!(out.get(3, 3).y, 0.0);
        // Far corner is outside the radius.
        assert_eq!(out.get(0, 0), Vec2::ZERO);
    }

    #[test]
    fn weight_is_zero_for_placeholder_records() {
        assert_eq!(obstacle_weight(0.0, 0.0, 200.0), 0.0);
        assert_eq!(obstacle_weight(0.0, 0.5, 0.0), 1.0);
        assert_eq!(obstacle_weight(0.3, 0.5, 0.0), 0.0);
    }
}
