//! Moving-grid stable fluids: a 2D velocity field that follows a target
//! through the world and is stirred by obstacles.

pub mod analysis;
pub mod config;
pub mod cpu_kernels;
pub mod driver;
pub mod error;
pub mod export;
pub mod field;
pub mod grid;
pub mod input;
pub mod kernels;
pub mod render;
pub mod solver;
pub mod tracker;

pub use analysis::{FieldMetrics, MetricsRecorder};
pub use config::FluidConfig;
pub use cpu_kernels::CpuKernels;
pub use driver::{DriverState, FieldFrame, FieldView, SimulationDriver, Visualizer};
pub use error::{FluidError, Result};
pub use export::PngPreview;
pub use field::{BufferSlot, EdgePolicy, FieldRef, ScalarField, VectorField};
pub use grid::SimulationGrid;
pub use input::{InputSampler, Obstacle, ObstacleRecord, ObstacleSnapshot, ObstacleTransform};
pub use kernels::{ComputeKernels, Kernel, KernelUniforms, TracingKernels};
pub use render::Renderer;
pub use solver::{JACOBI_ITERATIONS, VelocityFieldSolver};
pub use tracker::GridTracker;
