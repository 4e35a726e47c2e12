use crate::field::{FieldRef, ScalarField, VectorField};
use image::{ImageBuffer, Rgb, RgbImage};

pub struct Renderer {
    width: u32,
    height: u32,
    /// Field magnitude that maps to full colour intensity.
    gain: f32,
}

impl Renderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            gain: 1.0,
        }
    }

    pub fn with_gain(mut self, gain: f32) -> Self {
        self.gain = gain;
        self
    }

    pub fn render(&self, field: FieldRef<'_>) -> RgbImage {
        match field {
            FieldRef::Vector(field) => self.render_velocity_field(field),
            FieldRef::Scalar(field) => self.render_scalar_field(field),
        }
    }

    /// Maps each pixel back to a cell. Row 0 of the field is drawn at the
    /// bottom of the image.
    fn cell_for(&self, x: u32, y: u32, cols: usize, rows: usize) -> (usize, usize) {
        let cx = (x as f32 / self.width as f32 * cols as f32) as usize;
        let cy = (y as f32 / self.height as f32 * rows as f32) as usize;
        (cx.min(cols - 1), rows - 1 - cy.min(rows - 1))
    }

    pub fn render_velocity_field(&self, field: &VectorField) -> RgbImage {
        let mut img = ImageBuffer::new(self.width, self.height);

        for (x, y, pixel) in img.enumerate_pixels_mut() {
            let (cx, cy) = self.cell_for(x, y, field.width(), field.height());
            let v = field.get(cx, cy) / self.gain;

            // red for x, green for y, blue for sign
            let r = ((v.x.abs() * 255.0).min(255.0)) as u8;
            let g = ((v.y.abs() * 255.0).min(255.0)) as u8;
            let b = if v.x + v.y >= 0.0 { 128 } else { 64 };

            *pixel = Rgb([r, g, b]);
        }

        img
    }

    pub fn render_scalar_field(&self, field: &ScalarField) -> RgbImage {
        let mut img = ImageBuffer::new(self.width, self.height);

        for (x, y, pixel) in img.enumerate_pixels_mut() {
            let (cx, cy) = self.cell_for(x, y, field.width(), field.height());
            let value = (field.get(cx, cy) / self.gain).clamp(-1.0, 1.0);

            // Diverging map: blue negative, red positive
            let intensity = (value.abs() * 255.0) as u8;
            *pixel = if value >= 0.0 {
                Rgb([255, 255 - intensity, 255 - intensity])
            } else {
                Rgb([255 - intensity, 255 - intensity, 255])
            };
        }

        img
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::BufferSlot;
    use glam::Vec2;

    #[test]
    fn velocity_colours_follow_components() {
        let mut field = VectorField::new(BufferSlot::V1, 2, 2);
        field.set(0, 0, Vec2::new(1.0, 0.0));
        let img = Renderer::new(2, 2).render(FieldRef::Vector(&field));
        // Cell (0,0) is drawn bottom-left.
        assert_eq!(img.get_pixel(0, 1).0[0], 255);
        assert_eq!(img.get_pixel(0, 0).0[0], 0);
    }

    #[test]
    fn scalar_sign_picks_hue() {
        let field = ScalarField::from_fn(BufferSlot::P1, 2, 1, |x, _| if x == 0 { -1.0 } else { 1.0 });
        let img = Renderer::new(2, 1).render(FieldRef::Scalar(&field));
        assert_eq!(img.get_pixel(0, 0), &Rgb([0, 0, 255]));
        assert_eq!(img.get_pixel(1, 0), &Rgb([255, 0, 0]));
    }
}
