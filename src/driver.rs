use crate::analysis::FieldMetrics;
use crate::config::FluidConfig;
use crate::error::{FluidError, Result};
use crate::field::{BufferSlot, FieldRef, VectorField};
use crate::grid::SimulationGrid;
use crate::input::{InputSampler, ObstacleRecord, ObstacleSnapshot};
use crate::kernels::ComputeKernels;
use crate::solver::{StepParams, VelocityFieldSolver};
use crate::tracker::GridTracker;
use glam::{IVec2, Vec3};
use serde::{Deserialize, Serialize};

/// Time steps above this are accepted but flagged; diffusion and pressure
/// coefficients are never clamped.
const LARGE_DT_WARNING: f32 = 0.1;

/// Thickness of the preview volume handed to the visualizer.
const PREVIEW_THICKNESS: f32 = 0.1;

/// Which solver buffer the visualizer is shown.
///
/// After a step `V1` is the projected result, `V2` the diffused field, `V3`
/// the forced field before projection, `P1` the converged pressure and `P2`
/// the second-to-last pressure iterate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldView {
    V1,
    V2,
    #[default]
    V3,
    P1,
    P2,
    Divergence,
}

impl FieldView {
    pub const ALL: [FieldView; 6] = [
        FieldView::V1,
        FieldView::V2,
        FieldView::V3,
        FieldView::P1,
        FieldView::P2,
        FieldView::Divergence,
    ];

    pub fn slot(self) -> BufferSlot {
        match self {
            FieldView::V1 => BufferSlot::V1,
            FieldView::V2 => BufferSlot::V2,
            FieldView::V3 => BufferSlot::V3,
            FieldView::P1 => BufferSlot::P1,
            FieldView::P2 => BufferSlot::P2,
            FieldView::Divergence => BufferSlot::Divergence,
        }
    }
}

/// Everything the visualizer receives once per step.
#[derive(Clone, Copy, Debug)]
pub struct FieldFrame<'a> {
    pub step: u64,
    pub view: FieldView,
    pub selected: FieldRef<'a>,
    /// The forced field (`V3`) that particle effects sample.
    pub velocity: &'a VectorField,
    /// World position of the grid origin.
    pub position: Vec3,
    /// World size of the grid volume.
    pub size: Vec3,
}

/// Consumer of the simulated field, e.g. a preview surface or particle system.
pub trait Visualizer {
    fn present(&mut self, frame: &FieldFrame<'_>) -> Result<()>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriverState {
    Configured,
    Running,
    Stopped,
}

/// Builds a [`SimulationDriver`], refusing to start without collaborators.
pub struct SimulationDriverBuilder {
    config: FluidConfig,
    kernels: Option<Box<dyn ComputeKernels>>,
    visualizer: Option<Box<dyn Visualizer>>,
}

impl SimulationDriverBuilder {
    pub fn kernels(mut self, kernels: impl ComputeKernels + 'static) -> Self {
        self.kernels = Some(Box::new(kernels));
        self
    }

    pub fn visualizer(mut self, visualizer: impl Visualizer + 'static) -> Self {
        self.visualizer = Some(Box::new(visualizer));
        self
    }

    pub fn build(self) -> Result<SimulationDriver> {
        self.config.validate()?;
        let kernels = self
            .kernels
            .ok_or(FluidError::MissingCollaborator("compute kernels"))?;
        let visualizer = self
            .visualizer
            .ok_or(FluidError::MissingCollaborator("visualizer"))?;

        let grid = SimulationGrid::new(
            self.config.resolution,
            self.config.aspect,
            self.config.grid_step_size,
        );
        log::info!(
            "Fluid driver configured: {}x{} cells, dispatch {:?}, extent {:.2}",
            grid.width(),
            grid.height(),
            grid.dispatch_size(),
            grid.world_extent()
        );

        Ok(SimulationDriver {
            view: self.config.preview,
            sampler: InputSampler::new(0, self.config.radius_scale, self.config.velocity_scale),
            config: self.config,
            kernels,
            visualizer,
            solver: VelocityFieldSolver::new(grid),
            tracker: None,
            state: DriverState::Configured,
            time: 0.0,
            last_offset: IVec2::ZERO,
        })
    }
}

/// Sequences tracker, sampler, solver and visualizer once per host frame.
///
/// Lifecycle: [`init`](Self::init) once, [`step`](Self::step) per frame,
/// [`shutdown`](Self::shutdown) to stop. A stopped driver can be re-initialised.
pub struct SimulationDriver {
    config: FluidConfig,
    kernels: Box<dyn ComputeKernels>,
    visualizer: Box<dyn Visualizer>,
    solver: VelocityFieldSolver,
    tracker: Option<GridTracker>,
    sampler: InputSampler,
    state: DriverState,
    view: FieldView,
    time: f32,
    last_offset: IVec2,
}

impl SimulationDriver {
    pub fn builder(config: FluidConfig) -> SimulationDriverBuilder {
        SimulationDriverBuilder {
            config,
            kernels: None,
            visualizer: None,
        }
    }

    /// Snaps the grid onto `target`, sizes the obstacle array from the
    /// snapshot and takes the seeding sample.
    pub fn init(&mut self, target: Vec3, obstacles: &ObstacleSnapshot) -> Result<()> {
        if self.state != DriverState::Configured {
            self.solver = VelocityFieldSolver::new(*self.solver.grid());
            self.time = 0.0;
        }

        let tracker = GridTracker::new(target, self.config.grid_step_size, self.config.grid_height);
        let origin = tracker.position();
        self.tracker = Some(tracker);
        self.last_offset = IVec2::ZERO;

        self.sampler = InputSampler::new(
            obstacles.secondary.len(),
            self.config.radius_scale,
            self.config.velocity_scale,
        );
        self.sampler
            .sample(obstacles, origin, self.solver.grid().world_extent())?;

        self.state = DriverState::Running;
        log::info!(
            "Fluid simulation started at {:?} with {} obstacle slots",
            origin,
            self.sampler.len()
        );
        Ok(())
    }

    /// Advances the simulation by `dt` seconds.
    pub fn step(&mut self, dt: f32, target: Vec3, obstacles: &ObstacleSnapshot) -> Result<()> {
        if self.state != DriverState::Running {
            return Err(FluidError::NotRunning);
        }
        if !(dt.is_finite() && dt > 0.0) {
            return Err(FluidError::InvalidTimeStep(dt));
        }
        if dt > LARGE_DT_WARNING {
            log::warn!("Large time step {dt:.3}s, diffusion and projection may go unstable");
        }
        let tracker = self.tracker.as_mut().ok_or(FluidError::NotRunning)?;

        let offset = tracker.update(target);
        let origin = tracker.position();
        self.last_offset = offset;

        let extent = self.solver.grid().world_extent();
        let records = self.sampler.sample(obstacles, origin, extent)?;

        self.time += dt;
        let params = StepParams {
            time: self.time,
            dt,
            viscosity: self.config.viscosity,
            force: self.config.force,
            exponent: self.config.exponent,
            offset,
        };
        self.solver.step(self.kernels.as_mut(), &params, records);

        if log::log_enabled!(log::Level::Debug) {
            let metrics = FieldMetrics::analyze(self.solver.velocity(), self.solver.steps());
            log::debug!(
                "step {} offset {:?}: max speed {:.5}, mean |div| {:.6}, non-finite {}",
                metrics.step,
                offset,
                metrics.max_speed,
                metrics.mean_divergence,
                metrics.non_finite
            );
        }

        let frame = FieldFrame {
            step: self.solver.steps(),
            view: self.view,
            selected: self.solver.buffer(self.view.slot()),
            velocity: self.solver.forced(),
            position: origin,
            size: Vec3::new(extent, PREVIEW_THICKNESS, extent),
        };
        self.visualizer.present(&frame)
    }

    /// Stops issuing steps. Buffers stay readable.
    pub fn shutdown(&mut self) {
        if self.state == DriverState::Running {
            log::info!("Fluid simulation stopped after {} steps", self.solver.steps());
        }
        self.state = DriverState::Stopped;
    }

    /// Changes the grid resolution. Every field buffer is reallocated and the
    /// stored flow is discarded.
    pub fn set_resolution(&mut self, resolution: usize) -> Result<()> {
        let config = FluidConfig {
            resolution,
            ..self.config.clone()
        };
        config.validate()?;
        let grid = SimulationGrid::new(resolution, config.aspect, config.grid_step_size);
        if grid != *self.solver.grid() {
            self.solver.resize(grid);
        }
        self.config = config;
        Ok(())
    }

    pub fn set_view(&mut self, view: FieldView) {
        self.view = view;
    }

    pub fn view(&self) -> FieldView {
        self.view
    }

    /// Any solver buffer, for inspection.
    pub fn field(&self, view: FieldView) -> FieldRef<'_> {
        self.solver.buffer(view.slot())
    }

    /// The authoritative projected velocity field.
    pub fn velocity(&self) -> &VectorField {
        self.solver.velocity()
    }

    pub fn records(&self) -> &[ObstacleRecord] {
        self.sampler.records()
    }

    pub fn grid(&self) -> &SimulationGrid {
        self.solver.grid()
    }

    pub fn config(&self) -> &FluidConfig {
        &self.config
    }

    pub fn origin(&self) -> Option<Vec3> {
        self.tracker.as_ref().map(GridTracker::position)
    }

    pub fn last_offset(&self) -> IVec2 {
        self.last_offset
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn steps(&self) -> u64 {
        self.solver.steps()
    }
}
