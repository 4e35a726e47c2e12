use crate::field::{BufferSlot, FieldRef, ScalarField, VectorField};
use crate::grid::SimulationGrid;
use crate::input::ObstacleRecord;
use crate::kernels::{ComputeKernels, KernelUniforms};
use glam::IVec2;

/// Jacobi sweeps per relaxation phase. Even, so each solve ends in the
/// buffer it started from.
pub const JACOBI_ITERATIONS: usize = 20;

/// Per-step inputs that are not owned by the solver.
#[derive(Clone, Copy, Debug)]
pub struct StepParams {
    pub time: f32,
    pub dt: f32,
    pub viscosity: f32,
    pub force: f32,
    pub exponent: f32,
    pub offset: IVec2,
}

/// Owns the velocity and pressure buffers and issues the seven kernel phases.
///
/// `V1` holds the authoritative field between steps. Within a step:
///
/// | phase       | reads        | writes |
/// |-------------|--------------|--------|
/// | offset      | V1           | V3     |
/// | advect      | V3           | V2     |
/// | diffuse     | V2/V3, B=V1  | V2     |
/// | force       | V2           | V3     |
/// | p-setup     | V3           | div, P1|
/// | pressure    | P1/P2, B=div | P1     |
/// | p-finish    | V3, P1       | V1     |
#[derive(Clone, Debug)]
pub struct VelocityFieldSolver {
    grid: SimulationGrid,
    v1: VectorField,
    v2: VectorField,
    v3: VectorField,
    p1: ScalarField,
    p2: ScalarField,
    divergence: ScalarField,
    steps: u64,
}

impl VelocityFieldSolver {
    pub fn new(grid: SimulationGrid) -> Self {
        Self {
            grid,
            v1: VectorField::for_grid(BufferSlot::V1, &grid),
            v2: VectorField::for_grid(BufferSlot::V2, &grid),
            v3: VectorField::for_grid(BufferSlot::V3, &grid),
            p1: ScalarField::for_grid(BufferSlot::P1, &grid),
            p2: ScalarField::for_grid(BufferSlot::P2, &grid),
            divergence: ScalarField::for_grid(BufferSlot::Divergence, &grid),
            steps: 0,
        }
    }

    pub fn grid(&self) -> &SimulationGrid {
        &self.grid
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Replaces every buffer with fresh zeroed storage sized for `grid`.
    pub fn resize(&mut self, grid: SimulationGrid) {
        log::info!(
            "Reallocating fluid buffers: {}x{} -> {}x{}",
            self.grid.width(),
            self.grid.height(),
            grid.width(),
            grid.height()
        );
        *self = Self::new(grid);
    }

    /// The authoritative divergence-free velocity field.
    pub fn velocity(&self) -> &VectorField {
        &self.v1
    }

    /// Replaces the authoritative field, e.g. to restore a saved state.
    pub fn set_velocity(&mut self, field: &VectorField) {
        self.v1.copy_from(field);
    }

    /// The forced field before projection, as left by the last step.
    pub fn forced(&self) -> &VectorField {
        &self.v3
    }

    pub fn buffer(&self, slot: BufferSlot) -> FieldRef<'_> {
        match slot {
            BufferSlot::V1 => FieldRef::Vector(&self.v1),
            BufferSlot::V2 => FieldRef::Vector(&self.v2),
            BufferSlot::V3 => FieldRef::Vector(&self.v3),
            BufferSlot::P1 => FieldRef::Scalar(&self.p1),
            BufferSlot::P2 => FieldRef::Scalar(&self.p2),
            BufferSlot::Divergence => FieldRef::Scalar(&self.divergence),
        }
    }

    /// Runs every phase once, in order.
    pub fn step<K: ComputeKernels + ?Sized>(
        &mut self,
        kernels: &mut K,
        params: &StepParams,
        obstacles: &[ObstacleRecord],
    ) {
        let mut uniforms = KernelUniforms::new(params.time, params.dt, params.force, params.exponent);
        let dx = self.grid.dx();

        // 1. Shift by the grid offset (V1 is last step's result)
        uniforms.set_offset(params.offset);
        kernels.offset(&uniforms, &self.v1, &mut self.v3);

        // 2. Advection
        kernels.advect(&uniforms, &self.v3, &mut self.v2);

        // 3. Diffusion, right-hand side frozen in V1
        let alpha = dx * dx / (params.viscosity * params.dt);
        uniforms.set_jacobi(alpha, 4.0 + alpha);
        self.v1.copy_from(&self.v2);
        for i in 0..JACOBI_ITERATIONS {
            if i % 2 == 0 {
                kernels.jacobi2(&uniforms, &self.v2, &self.v1, &mut self.v3);
            } else {
                kernels.jacobi2(&uniforms, &self.v3, &self.v1, &mut self.v2);
            }
        }

        // 4. External force
        uniforms.fluid_input_count = obstacles.len() as u32;
        kernels.force(&uniforms, &self.v2, obstacles, &mut self.v3);

        // 5. Projection setup
        kernels.projection_setup(&uniforms, &self.v3, &mut self.divergence, &mut self.p1);

        // 6. Pressure
        uniforms.set_jacobi(-dx * dx, 4.0);
        for i in 0..JACOBI_ITERATIONS {
            if i % 2 == 0 {
                kernels.jacobi1(&uniforms, &self.p1, &self.divergence, &mut self.p2);
            } else {
                kernels.jacobi1(&uniforms, &self.p2, &self.divergence, &mut self.p1);
            }
        }

        // 7. Projection finish
        kernels.projection_finish(&uniforms, &self.v3, &self.p1, &mut self.v1);

        self.steps += 1;
    }
}
