use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use stablefluids::driver::FieldFrame;
use stablefluids::{
    CpuKernels, FluidConfig, MetricsRecorder, ObstacleSnapshot, ObstacleTransform, PngPreview,
    SimulationDriver, Visualizer,
};
use std::path::{Path, PathBuf};

const FRAME_DT: f32 = 1.0 / 60.0;

struct Options {
    config: Option<PathBuf>,
    frames: usize,
    out_dir: Option<PathBuf>,
    every: u64,
    seed: u64,
}

fn parse_args() -> Result<Options, Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();
    let mut options = Options {
        config: None,
        frames: 240,
        out_dir: None,
        every: 30,
        seed: 7,
    };

    let mut i = 1;
    while i < args.len() {
        let value = args.get(i + 1).ok_or_else(|| format!("missing value for {}", args[i]));
        match args[i].as_str() {
            "--config" => options.config = Some(PathBuf::from(value?)),
            "--frames" => options.frames = value?.parse()?,
            "--out" => options.out_dir = Some(PathBuf::from(value?)),
            "--every" => options.every = value?.parse()?,
            "--seed" => options.seed = value?.parse()?,
            other => return Err(format!("unknown argument {other}").into()),
        }
        i += 2;
    }

    Ok(options)
}

/// Records metrics every step and optionally forwards to a PNG writer.
struct HeadlessSink {
    recorder: MetricsRecorder,
    preview: Option<PngPreview>,
    every: u64,
}

impl Visualizer for HeadlessSink {
    fn present(&mut self, frame: &FieldFrame<'_>) -> stablefluids::Result<()> {
        let metrics = self.recorder.record(frame.velocity, frame.step);
        if frame.step % self.every == 0 {
            metrics.log_summary();
        }
        if frame.step % self.every == 0 && frame.step > 0 {
            self.recorder.log_trends();
        }
        match &mut self.preview {
            Some(preview) => preview.present(frame),
            None => Ok(()),
        }
    }
}

/// A player walking a circle with spheres orbiting around it.
struct Scenario {
    centre: Vec3,
    radius: f32,
    speed: f32,
    spheres: Vec<(f32, f32, f32)>,
}

impl Scenario {
    fn new(rng: &mut StdRng, count: usize) -> Self {
        let spheres = (0..count)
            .map(|_| {
                (
                    rng.gen_range(1.5..4.0),
                    rng.gen_range(0.0..std::f32::consts::TAU),
                    rng.gen_range(0.5..1.5),
                )
            })
            .collect();
        Self {
            centre: Vec3::new(10.0, 0.0, -4.0),
            radius: 6.0,
            speed: 0.6,
            spheres,
        }
    }

    fn player(&self, t: f32) -> Vec3 {
        let a = t * self.speed;
        self.centre + Vec3::new(a.cos(), 0.0, a.sin()) * self.radius
    }

    fn snapshot(&self, t: f32) -> ObstacleSnapshot {
        let player = self.player(t);
        let secondary = self
            .spheres
            .iter()
            .map(|&(orbit, phase, scale)| {
                let a = phase + t * 1.5;
                let position = player + Vec3::new(a.cos(), 0.5, a.sin()) * orbit;
                ObstacleTransform::sphere(position, 0.5, scale)
            })
            .collect();
        ObstacleSnapshot {
            primary: Some(ObstacleTransform::primary(player, 0.5)),
            secondary,
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<FluidConfig, Box<dyn std::error::Error>> {
    let config = match path {
        Some(path) => FluidConfig::from_json_file(path)?,
        None => FluidConfig {
            resolution: 128,
            ..FluidConfig::default()
        },
    };
    Ok(config)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let options = parse_args()?;
    let config = load_config(options.config.as_deref())?;
    let grid_extent = config.world_extent();

    let preview = match &options.out_dir {
        Some(dir) => Some(PngPreview::new(dir, "fluid", 512, 512)?.every(options.every)),
        None => None,
    };
    let sink = HeadlessSink {
        recorder: MetricsRecorder::new(),
        preview,
        every: options.every.max(1),
    };

    let mut driver = SimulationDriver::builder(config.clone())
        .kernels(CpuKernels::new(config.edge_policy))
        .visualizer(sink)
        .build()?;

    let mut rng = StdRng::seed_from_u64(options.seed);
    let scenario = Scenario::new(&mut rng, 3);

    log::info!(
        "Running {} frames on a {:.1}m grid ({} cells per side)",
        options.frames,
        grid_extent,
        driver.grid().width()
    );

    driver.init(scenario.player(0.0), &scenario.snapshot(0.0))?;
    for frame in 1..=options.frames {
        let t = frame as f32 * FRAME_DT;
        driver.step(FRAME_DT, scenario.player(t), &scenario.snapshot(t))?;
    }
    driver.shutdown();

    log::info!(
        "Finished {} steps, grid origin {:?}",
        driver.steps(),
        driver.origin()
    );
    Ok(())
}
