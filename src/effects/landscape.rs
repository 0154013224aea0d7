use super::Effect;
use crate::surface::Surface;
use std::io::{BufWriter, Stdout};

const GRID_ROWS: usize = 20;
const GRID_COLUMNS: usize = 30;
const SKY: (u8, u8, u8) = (0x6a, 0xa2, 0xef);
const GROUND: (u8, u8, u8) = (0x4a, 0xaf, 0x4a);

/// Endless scroll over a curved sky/ground perspective grid. Drawn clean,
/// without the CRT pass.
pub struct LandscapeEffect {
    surface: Surface,
    time: f32,
}

impl LandscapeEffect {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            surface: Surface::new(width, height),
            time: 0.0,
        }
    }

    fn draw_grid(&mut self) {
        let surface = &mut self.surface;
        let w = surface.width() as f32;
        let h = surface.height() as f32;
        let horizon_y = h * 0.5;
        let horizon_x = w * 0.5;
        let movement = (self.time % 100.0) / 100.0;

        // Horizontal lines bunch up toward the horizon on both halves.
        for i in 0..=GRID_ROWS {
            let row = (i as f32 + movement) / GRID_ROWS as f32;
            if row > 1.0 {
                continue;
            }
            let ground_y = horizon_y + (h - horizon_y) * row * row;
            surface.line(0.0, ground_y, w, ground_y, (255, 255, 255), 1.0, 1.0);
            let sky_y = horizon_y - horizon_y * row * row;
            surface.line(0.0, sky_y, w, sky_y, (255, 255, 255), 1.0, 1.0);
        }

        // Vertical lines fan out from a pulled-in vanishing point and
        // curve harder the further they sit from the center.
        let extended = GRID_COLUMNS * 2;
        let column_width = w / (GRID_COLUMNS as f32 / 2.0);
        let start = -column_width * (extended as f32 / 2.0 - GRID_COLUMNS as f32 / 4.0);

        for j in 0..=extended {
            let base_x = start + j as f32 * column_width;
            if base_x < -column_width * 2.0 || base_x > w + column_width * 2.0 {
                continue;
            }
            let from_center = ((base_x - horizon_x) / horizon_x).abs();
            let horizon_offset = from_center * h * 0.04;
            let vanishing_x = horizon_x + (base_x - horizon_x) * 0.1;
            let curve = 0.8 + from_center * 0.4;

            let steps = 20;
            // Ground half.
            let mut prev = (vanishing_x, horizon_y - horizon_offset);
            for step in 1..=steps {
                let t = step as f32 / steps as f32;
                let y = horizon_y + (h - horizon_y) * t.powf(1.5);
                let x = vanishing_x + (base_x - vanishing_x) * t.powf(curve);
                surface.line(prev.0, prev.1, x, y, (255, 255, 255), 1.0, 1.0);
                prev = (x, y);
            }
            // Sky half, mirrored.
            let mut prev = (vanishing_x, horizon_y + horizon_offset);
            for step in 1..=steps {
                let t = step as f32 / steps as f32;
                let y = horizon_y - horizon_y * t.powf(1.5);
                let x = vanishing_x + (base_x - vanishing_x) * t.powf(curve);
                surface.line(prev.0, prev.1, x, y, (255, 255, 255), 1.0, 1.0);
                prev = (x, y);
            }
        }
    }
}

impl Effect for LandscapeEffect {
    fn update(&mut self, dt: f32) {
        self.time += dt * 200.0;
        if self.time > 10000.0 {
            self.time -= 10000.0;
        }
    }

    fn render(&mut self, stdout: &mut BufWriter<Stdout>) -> std::io::Result<()> {
        let w = self.surface.width() as i32;
        let h = self.surface.height() as i32;
        self.surface.fill_rect(0, 0, w, h / 2, SKY, 1.0);
        self.surface.fill_rect(0, h / 2, w, h - h / 2, GROUND, 1.0);
        self.draw_grid();
        self.surface.present(stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scroll_offset_wraps_instead_of_growing() {
        let mut effect = LandscapeEffect::new(40, 24);
        for _ in 0..60 * 60 {
            effect.update(1.0 / 60.0);
        }
        assert!(effect.time <= 10000.0);
    }

    #[test]
    fn a_frame_paints_sky_over_ground() {
        let mut effect = LandscapeEffect::new(40, 24);
        effect.update(1.0 / 60.0);
        let w = effect.surface.width() as i32;
        let h = effect.surface.height() as i32;
        effect.surface.fill_rect(0, 0, w, h / 2, SKY, 1.0);
        effect.surface.fill_rect(0, h / 2, w, h - h / 2, GROUND, 1.0);
        effect.draw_grid();
        // Top rows keep a sky tint, bottom rows a ground tint, except where
        // a white grid line landed.
        let top = effect.surface.pixel(1, 1);
        let bottom = effect.surface.pixel(1, 22);
        assert!(top.2 >= top.1 || top == (255.0, 255.0, 255.0));
        assert!(bottom.1 >= bottom.2 || bottom == (255.0, 255.0, 255.0));
    }
}
