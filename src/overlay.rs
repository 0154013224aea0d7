/// Static CRT screen texture: scanlines, phosphor triads, vignette and a
/// curved/bordered screen edge, baked once per resize and multiplied onto
/// every rendered frame. Factors are per-channel 0..=1.
pub struct Overlay {
    width: usize,
    height: usize,
    texels: Vec<(f32, f32, f32)>,
}

/// Scanline density differs between the effects; the rest of the texture
/// is shared.
pub struct OverlayConfig {
    pub scanline_step: usize,
    pub scanline_alpha: f32,
    pub scanline_bleed: f32,
}

impl OverlayConfig {
    /// Tight, heavy scanlines (net and tunnel screens).
    pub fn dense() -> Self {
        Self {
            scanline_step: 3,
            scanline_alpha: 0.7,
            scanline_bleed: 0.35,
        }
    }

    /// Wider, lighter scanlines (flight screen).
    pub fn sparse() -> Self {
        Self {
            scanline_step: 6,
            scanline_alpha: 0.3,
            scanline_bleed: 0.0,
        }
    }
}

const PHOSPHOR_PX: usize = 3;
const PHOSPHOR_ALPHA: f32 = 0.3;
const BORDER_PX: usize = 2;
const CURVE_INSET: f32 = 3.0;
const CURVE_DEPTH: f32 = 4.0;

impl Overlay {
    pub fn generate(width: usize, height: usize, config: &OverlayConfig) -> Self {
        let mut overlay = Self {
            width,
            height,
            texels: vec![(1.0, 1.0, 1.0); width * height],
        };
        if width == 0 || height == 0 {
            return overlay;
        }
        overlay.scanlines(config);
        overlay.phosphor_mask();
        overlay.vignette();
        overlay.screen_curvature();
        overlay.screen_border();
        overlay
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn texels(&self) -> &[(f32, f32, f32)] {
        &self.texels
    }

    fn darken(&mut self, x: usize, y: usize, alpha: f32) {
        if x >= self.width || y >= self.height {
            return;
        }
        let t = &mut self.texels[y * self.width + x];
        t.0 *= 1.0 - alpha;
        t.1 *= 1.0 - alpha;
        t.2 *= 1.0 - alpha;
    }

    /// Pull the factor toward a phosphor tint without going brighter than 1.
    fn tint(&mut self, x: usize, y: usize, color: (f32, f32, f32), alpha: f32) {
        if x >= self.width || y >= self.height {
            return;
        }
        let t = &mut self.texels[y * self.width + x];
        t.0 += (color.0 - t.0) * alpha;
        t.1 += (color.1 - t.1) * alpha;
        t.2 += (color.2 - t.2) * alpha;
    }

    fn scanlines(&mut self, config: &OverlayConfig) {
        for y in (0..self.height).step_by(config.scanline_step) {
            for x in 0..self.width {
                self.darken(x, y, config.scanline_alpha);
            }
            if config.scanline_bleed > 0.0 && y + 1 < self.height {
                for x in 0..self.width {
                    self.darken(x, y + 1, config.scanline_bleed);
                }
            }
        }
    }

    /// Tiled RGB subpixel triads with a half-tile offset second row.
    fn phosphor_mask(&mut self) {
        const RED: (f32, f32, f32) = (1.0, 0.12, 0.12);
        const GREEN: (f32, f32, f32) = (0.12, 1.0, 0.12);
        const BLUE: (f32, f32, f32) = (0.12, 0.12, 1.0);

        let tile = 3 * PHOSPHOR_PX;
        let mut y = 0;
        while y < self.height {
            let mut x = 0;
            while x < self.width {
                self.subpixel(x, y, RED);
                self.subpixel(x + PHOSPHOR_PX, y, GREEN);
                self.subpixel(x + 2 * PHOSPHOR_PX, y, BLUE);

                // Second row, offset by half a tile, triad rotated so the
                // blue wraps back to the tile origin.
                let offset_y = y + tile / 2;
                if offset_y < self.height {
                    self.subpixel(x + tile / 2, offset_y, RED);
                    self.subpixel(x + tile / 2 + PHOSPHOR_PX, offset_y, GREEN);
                    self.subpixel(x, offset_y, BLUE);
                }
                x += tile;
            }
            y += tile;
        }
    }

    fn subpixel(&mut self, x: usize, y: usize, color: (f32, f32, f32)) {
        for dy in 0..PHOSPHOR_PX {
            for dx in 0..PHOSPHOR_PX {
                self.tint(x + dx, y + dy, color, PHOSPHOR_ALPHA);
            }
        }
    }

    /// Radial darkening toward the corners: stops 0 -> 0, 0.4 -> 0.2,
    /// 0.7 -> 0.4, 1.0 -> 0.7.
    fn vignette(&mut self) {
        let cx = self.width as f32 / 2.0;
        let cy = self.height as f32 / 2.0;
        let radius = self.width as f32 / 2.2;
        for y in 0..self.height {
            for x in 0..self.width {
                let dx = x as f32 - cx;
                let dy = y as f32 - cy;
                let t = ((dx * dx + dy * dy).sqrt() / radius).min(1.0);
                let alpha = if t < 0.4 {
                    t / 0.4 * 0.2
                } else if t < 0.7 {
                    0.2 + (t - 0.4) / 0.3 * 0.2
                } else {
                    0.4 + (t - 0.7) / 0.3 * 0.3
                };
                self.darken(x, y, alpha);
            }
        }
    }

    /// Parabolic shading bands along each edge, bowing inward at the
    /// midpoints to suggest curved glass.
    fn screen_curvature(&mut self) {
        const ALPHA: f32 = 0.2;
        let w = self.width as f32;
        let h = self.height as f32;

        for x in 0..self.width {
            let t = x as f32 / w.max(1.0);
            let dip = CURVE_INSET - CURVE_DEPTH * 4.0 * t * (1.0 - t);
            for y in 0..self.height {
                let fy = y as f32;
                if (fy - dip).abs() <= 1.0 || (fy - (h - 1.0 - dip)).abs() <= 1.0 {
                    self.darken(x, y, ALPHA);
                }
            }
        }
        for y in 0..self.height {
            let t = y as f32 / h.max(1.0);
            let dip = CURVE_INSET - CURVE_DEPTH * 4.0 * t * (1.0 - t);
            for x in 0..self.width {
                let fx = x as f32;
                if (fx - dip).abs() <= 1.0 || (fx - (w - 1.0 - dip)).abs() <= 1.0 {
                    self.darken(x, y, ALPHA);
                }
            }
        }
    }

    fn screen_border(&mut self) {
        const ALPHA: f32 = 0.8;
        for y in 0..self.height {
            for x in 0..self.width {
                let edge = x.min(y).min(self.width - 1 - x).min(self.height - 1 - y);
                if edge < BORDER_PX {
                    self.darken(x, y, ALPHA);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn texture_matches_requested_dimensions() {
        for (w, h) in [(80, 48), (200, 112), (1, 1), (0, 10)] {
            let overlay = Overlay::generate(w, h, &OverlayConfig::dense());
            assert_eq!(overlay.width(), w);
            assert_eq!(overlay.height(), h);
            assert_eq!(overlay.texels().len(), w * h);
        }
    }

    #[test]
    fn factors_stay_in_unit_range() {
        let overlay = Overlay::generate(60, 40, &OverlayConfig::sparse());
        for t in overlay.texels() {
            assert!(t.0 >= 0.0 && t.0 <= 1.0);
            assert!(t.1 >= 0.0 && t.1 <= 1.0);
            assert!(t.2 >= 0.0 && t.2 <= 1.0);
        }
    }

    #[test]
    fn scanline_rows_are_darker_than_their_neighbors() {
        let overlay = Overlay::generate(90, 60, &OverlayConfig::sparse());
        // Row 30 is a scanline (step 6); row 32 is not. Compare away from
        // the border and phosphor-averaged across a full tile width.
        let avg = |y: usize| -> f32 {
            (20..29)
                .map(|x| {
                    let t = overlay.texels()[y * 90 + x];
                    t.0 + t.1 + t.2
                })
                .sum::<f32>()
                / 9.0
        };
        assert!(avg(30) < avg(32));
    }

    #[test]
    fn corners_are_darker_than_center() {
        let overlay = Overlay::generate(100, 60, &OverlayConfig::dense());
        let lum = |x: usize, y: usize| {
            let t = overlay.texels()[y * 100 + x];
            t.0 + t.1 + t.2
        };
        assert!(lum(0, 0) < lum(50, 30));
        assert!(lum(99, 59) < lum(50, 30));
    }
}
