//! The compute-kernel seam. The solver only binds buffers and uniforms and
//! issues dispatches; the numerics live behind [`ComputeKernels`].

use crate::field::{BufferSlot, ScalarField, VectorField};
use crate::grid::TILE_SIZE;
use crate::input::ObstacleRecord;
use bytemuck::{Pod, Zeroable};
use glam::IVec2;
use std::fmt;

/// Kernel indices as compiled into the fluid compute program.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Kernel {
    Advect = 0,
    Force = 1,
    PSetup = 2,
    PFinish = 3,
    Jacobi1 = 4,
    Jacobi2 = 5,
    Offset = 6,
}

impl fmt::Display for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Uniform and binding names expected by the existing compute program.
pub mod names {
    pub const TIME: &str = "Time";
    pub const DELTA_TIME: &str = "DeltaTime";
    pub const OFFSET_U: &str = "offsetU";
    pub const OFFSET_V: &str = "offsetV";
    pub const ALPHA: &str = "Alpha";
    pub const BETA: &str = "Beta";
    pub const FLUID_INPUT_COUNT: &str = "FluidInputCount";

    pub const W_IN: &str = "W_in";
    pub const W_OUT: &str = "W_out";
    pub const U_IN: &str = "U_in";
    pub const U_OUT: &str = "U_out";
    pub const B1_IN: &str = "B1_in";
    pub const B2_IN: &str = "B2_in";
    pub const X1_IN: &str = "X1_in";
    pub const X1_OUT: &str = "X1_out";
    pub const X2_IN: &str = "X2_in";
    pub const X2_OUT: &str = "X2_out";
    pub const P_IN: &str = "P_in";
    pub const P_OUT: &str = "P_out";
    pub const DIV_W_OUT: &str = "DivW_out";
    pub const FLUID_INPUT: &str = "FluidInput";
}

/// Uniform block shared by every kernel. Fields are overwritten phase by
/// phase exactly as the solver sets them.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct KernelUniforms {
    pub time: f32,
    pub delta_time: f32,
    pub offset_u: i32,
    pub offset_v: i32,
    pub alpha: f32,
    pub beta: f32,
    pub fluid_input_count: u32,
    pub force: f32,
    pub exponent: f32,
    _padding: [u32; 3],
}

impl KernelUniforms {
    pub fn new(time: f32, delta_time: f32, force: f32, exponent: f32) -> Self {
        Self {
            time,
            delta_time,
            force,
            exponent,
            ..Self::default()
        }
    }

    pub fn offset(&self) -> IVec2 {
        IVec2::new(self.offset_u, self.offset_v)
    }

    pub fn set_offset(&mut self, offset: IVec2) {
        self.offset_u = offset.x;
        self.offset_v = offset.y;
    }

    pub fn set_jacobi(&mut self, alpha: f32, beta: f32) {
        self.alpha = alpha;
        self.beta = beta;
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

impl fmt::Display for KernelUniforms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}={:.4} {}={:.5} {}={} {}={} {}={:.6} {}={:.6} {}={}",
            names::TIME,
            self.time,
            names::DELTA_TIME,
            self.delta_time,
            names::OFFSET_U,
            self.offset_u,
            names::OFFSET_V,
            self.offset_v,
            names::ALPHA,
            self.alpha,
            names::BETA,
            self.beta,
            names::FLUID_INPUT_COUNT,
            self.fluid_input_count,
        )
    }
}

/// Executes the seven fluid kernels.
///
/// Inputs are shared borrows and outputs are exclusive borrows, so no
/// dispatch can read and write the same buffer.
pub trait ComputeKernels {
    /// `W_out[c] = W_in[c + offset]`.
    fn offset(&mut self, uniforms: &KernelUniforms, w_in: &VectorField, w_out: &mut VectorField);

    /// Semi-Lagrangian self-advection of `u_in`.
    fn advect(&mut self, uniforms: &KernelUniforms, u_in: &VectorField, w_out: &mut VectorField);

    /// One Jacobi sweep on a vector field with fixed right-hand side `b2_in`.
    fn jacobi2(
        &mut self,
        uniforms: &KernelUniforms,
        x2_in: &VectorField,
        b2_in: &VectorField,
        x2_out: &mut VectorField,
    );

    /// Adds obstacle forces from `fluid_input`.
    fn force(
        &mut self,
        uniforms: &KernelUniforms,
        w_in: &VectorField,
        fluid_input: &[ObstacleRecord],
        w_out: &mut VectorField,
    );

    /// Writes the divergence of `w_in` and clears the pressure guess.
    fn projection_setup(
        &mut self,
        uniforms: &KernelUniforms,
        w_in: &VectorField,
        div_w_out: &mut ScalarField,
        p_out: &mut ScalarField,
    );

    /// One Jacobi sweep on a scalar field with fixed right-hand side `b1_in`.
    fn jacobi1(
        &mut self,
        uniforms: &KernelUniforms,
        x1_in: &ScalarField,
        b1_in: &ScalarField,
        x1_out: &mut ScalarField,
    );

    /// Subtracts the pressure gradient.
    fn projection_finish(
        &mut self,
        uniforms: &KernelUniforms,
        w_in: &VectorField,
        p_in: &ScalarField,
        u_out: &mut VectorField,
    );
}

/// One recorded dispatch: which kernel ran, which buffers were bound under
/// which names, and the workgroup counts.
#[derive(Clone, Debug, PartialEq)]
pub struct Dispatch {
    pub kernel: Kernel,
    pub inputs: Vec<(&'static str, BufferSlot)>,
    pub outputs: Vec<(&'static str, BufferSlot)>,
    pub groups: (u32, u32, u32),
}

fn groups_for(width: usize, height: usize) -> (u32, u32, u32) {
    (
        width.div_ceil(TILE_SIZE) as u32,
        height.div_ceil(TILE_SIZE) as u32,
        1,
    )
}

/// Wraps another backend and records every dispatch.
pub struct TracingKernels<K> {
    inner: K,
    dispatches: Vec<Dispatch>,
}

impl<K: ComputeKernels> TracingKernels<K> {
    pub fn new(inner: K) -> Self {
        Self {
            inner,
            dispatches: Vec::new(),
        }
    }

    pub fn dispatches(&self) -> &[Dispatch] {
        &self.dispatches
    }

    pub fn count(&self, kernel: Kernel) -> usize {
        self.dispatches.iter().filter(|d| d.kernel == kernel).count()
    }

    pub fn clear(&mut self) {
        self.dispatches.clear();
    }

    pub fn into_inner(self) -> K {
        self.inner
    }

    fn record(
        &mut self,
        kernel: Kernel,
        uniforms: &KernelUniforms,
        inputs: Vec<(&'static str, BufferSlot)>,
        outputs: Vec<(&'static str, BufferSlot)>,
        groups: (u32, u32, u32),
    ) {
        log::trace!("dispatch {kernel} {groups:?} in={inputs:?} out={outputs:?} [{uniforms}]");
        self.dispatches.push(Dispatch {
            kernel,
            inputs,
            outputs,
            groups,
        });
    }
}

impl<K: ComputeKernels> ComputeKernels for TracingKernels<K> {
    fn offset(&mut self, uniforms: &KernelUniforms, w_in: &VectorField, w_out: &mut VectorField) {
        self.inner.offset(uniforms, w_in, w_out);
        self.record(
            Kernel::Offset,
            uniforms,
            vec![(names::W_IN, w_in.slot())],
            vec![(names::W_OUT, w_out.slot())],
            groups_for(w_out.width(), w_out.height()),
        );
    }

    fn advect(&mut self, uniforms: &KernelUniforms, u_in: &VectorField, w_out: &mut VectorField) {
        self.inner.advect(uniforms, u_in, w_out);
        self.record(
            Kernel::Advect,
            uniforms,
            vec![(names::U_IN, u_in.slot())],
            vec![(names::W_OUT, w_out.slot())],
            groups_for(w_out.width(), w_out.height()),
        );
    }

    fn jacobi2(
        &mut self,
        uniforms: &KernelUniforms,
        x2_in: &VectorField,
        b2_in: &VectorField,
        x2_out: &mut VectorField,
    ) {
        self.inner.jacobi2(uniforms, x2_in, b2_in, x2_out);
        self.record(
            Kernel::Jacobi2,
            uniforms,
            vec![(names::X2_IN, x2_in.slot()), (names::B2_IN, b2_in.slot())],
            vec![(names::X2_OUT, x2_out.slot())],
            groups_for(x2_out.width(), x2_out.height()),
        );
    }

    fn force(
        &mut self,
        uniforms: &KernelUniforms,
        w_in: &VectorField,
        fluid_input: &[ObstacleRecord],
        w_out: &mut VectorField,
    ) {
        self.inner.force(uniforms, w_in, fluid_input, w_out);
        self.record(
            Kernel::Force,
            uniforms,
            vec![(names::W_IN, w_in.slot())],
            vec![(names::W_OUT, w_out.slot())],
            groups_for(w_out.width(), w_out.height()),
        );
    }

    fn projection_setup(
        &mut self,
        uniforms: &KernelUniforms,
        w_in: &VectorField,
        div_w_out: &mut ScalarField,
        p_out: &mut ScalarField,
    ) {
        self.inner.projection_setup(uniforms, w_in, div_w_out, p_out);
        self.record(
            Kernel::PSetup,
            uniforms,
            vec![(names::W_IN, w_in.slot())],
            vec![
                (names::DIV_W_OUT, div_w_out.slot()),
                (names::P_OUT, p_out.slot()),
            ],
            groups_for(p_out.width(), p_out.height()),
        );
    }

    fn jacobi1(
        &mut self,
        uniforms: &KernelUniforms,
        x1_in: &ScalarField,
        b1_in: &ScalarField,
        x1_out: &mut ScalarField,
    ) {
        self.inner.jacobi1(uniforms, x1_in, b1_in, x1_out);
        self.record(
            Kernel::Jacobi1,
            uniforms,
            vec![(names::X1_IN, x1_in.slot()), (names::B1_IN, b1_in.slot())],
            vec![(names::X1_OUT, x1_out.slot())],
            groups_for(x1_out.width(), x1_out.height()),
        );
    }

    fn projection_finish(
        &mut self,
        uniforms: &KernelUniforms,
        w_in: &VectorField,
        p_in: &ScalarField,
        u_out: &mut VectorField,
    ) {
        self.inner.projection_finish(uniforms, w_in, p_in, u_out);
        self.record(
            Kernel::PFinish,
            uniforms,
            vec![(names::W_IN, w_in.slot()), (names::P_IN, p_in.slot())],
            vec![(names::U_OUT, u_out.slot())],
            groups_for(u_out.width(), u_out.height()),
        );
    }
}
