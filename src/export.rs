use crate::driver::{FieldFrame, Visualizer};
use crate::error::Result;
use crate::render::Renderer;
use std::path::{Path, PathBuf};

/// Visualizer that writes the selected field to a PNG every `every` steps.
pub struct PngPreview {
    renderer: Renderer,
    output_dir: PathBuf,
    prefix: String,
    every: u64,
    written: Vec<PathBuf>,
}

impl PngPreview {
    pub fn new(output_dir: &Path, prefix: &str, width: u32, height: u32) -> Result<Self> {
        std::fs::create_dir_all(output_dir)?;
        Ok(Self {
            renderer: Renderer::new(width, height),
            output_dir: output_dir.to_path_buf(),
            prefix: prefix.to_string(),
            every: 1,
            written: Vec::new(),
        })
    }

    pub fn every(mut self, every: u64) -> Self {
        self.every = every.max(1);
        self
    }

    pub fn gain(mut self, gain: f32) -> Self {
        self.renderer = self.renderer.with_gain(gain);
        self
    }

    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    pub fn frame_path(&self, frame: &FieldFrame<'_>) -> PathBuf {
        let filename = format!(
            "{}_{}_frame_{:04}.png",
            self.prefix,
            frame.selected.slot(),
            frame.step
        );
        self.output_dir.join(filename)
    }
}

impl Visualizer for PngPreview {
    fn present(&mut self, frame: &FieldFrame<'_>) -> Result<()> {
        if frame.step % self.every != 0 {
            return Ok(());
        }
        let path = self.frame_path(frame);
        self.renderer.render(frame.selected).save(&path)?;
        log::debug!("Wrote preview {:?}", path);
        self.written.push(path);
        Ok(())
    }
}
