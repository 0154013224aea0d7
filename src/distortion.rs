use crate::overlay::Overlay;
use crate::surface::Surface;

/// One per-frame perturbation. Magnitudes that the original tuned per
/// effect are carried in the variant payloads.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Glitch {
    /// Red/blue edge fringing, lighten-blended at a fixed 2px offset.
    ColorFringe,
    Flicker { max_alpha: f32 },
    RowShift { max_shift: i32, max_band: i32 },
    ColShift { max_shift: i32, max_band: i32 },
    Jitter,
    NoiseLineH { alpha: f32 },
    NoiseLineV { alpha: f32 },
    ColorBleed { alpha: f32 },
    Aberration { offset: i32, alpha: f32 },
    BlankingBar,
    RollingBar,
    Glare { alpha: f32 },
}

/// A glitch and the per-frame probability of applying it.
pub struct Step {
    pub chance: f32,
    pub glitch: Glitch,
}

const fn step(chance: f32, glitch: Glitch) -> Step {
    Step { chance, glitch }
}

/// Steps run in table order; the cached overlay is multiplied in between
/// the two tables, so post-overlay glitches sit on top of the mask.
pub struct Profile {
    pre: &'static [Step],
    post: &'static [Step],
}

/// Tuning used by the flight and tunnel screens.
pub const HEAVY: Profile = Profile {
    pre: &[
        step(1.0, Glitch::ColorFringe),
        step(0.15, Glitch::Flicker { max_alpha: 0.15 }),
        step(0.2, Glitch::RowShift { max_shift: 12, max_band: 40 }),
        step(0.2, Glitch::ColShift { max_shift: 12, max_band: 40 }),
        step(0.05, Glitch::Jitter),
        step(0.2, Glitch::NoiseLineH { alpha: 0.3 }),
        step(0.15, Glitch::NoiseLineV { alpha: 0.25 }),
        step(0.15, Glitch::ColorBleed { alpha: 0.12 }),
        step(0.3, Glitch::Aberration { offset: 2, alpha: 0.2 }),
    ],
    post: &[
        step(0.04, Glitch::BlankingBar),
        step(0.03, Glitch::RollingBar),
        step(1.0, Glitch::Glare { alpha: 0.12 }),
    ],
};

/// Gentler tuning used by the net screen.
pub const SOFT: Profile = Profile {
    pre: &[
        step(0.08, Glitch::Flicker { max_alpha: 0.08 }),
        step(0.03, Glitch::RowShift { max_shift: 4, max_band: 20 }),
        step(0.05, Glitch::NoiseLineH { alpha: 0.15 }),
        step(0.03, Glitch::ColorBleed { alpha: 0.06 }),
        step(0.04, Glitch::Aberration { offset: 1, alpha: 0.1 }),
    ],
    post: &[step(1.0, Glitch::Glare { alpha: 0.06 })],
};

pub struct DistortionPass {
    profile: &'static Profile,
    rng: fastrand::Rng,
}

impl DistortionPass {
    pub fn new(profile: &'static Profile) -> Self {
        Self {
            profile,
            rng: fastrand::Rng::new(),
        }
    }

    #[cfg(test)]
    pub fn with_seed(profile: &'static Profile, seed: u64) -> Self {
        Self {
            profile,
            rng: fastrand::Rng::with_seed(seed),
        }
    }

    /// Full post-draw pipeline: gated pre-overlay glitches, overlay
    /// multiply, gated post-overlay glitches. Region ops that miss the
    /// surface are skipped for the frame.
    pub fn apply(&mut self, surface: &mut Surface, overlay: &Overlay, time: f32) {
        let pre = self.profile.pre;
        let post = self.profile.post;
        for s in pre {
            if self.rng.f32() < s.chance {
                self.run(s.glitch, surface, time);
            }
        }
        surface.multiply(overlay.texels());
        for s in post {
            if self.rng.f32() < s.chance {
                self.run(s.glitch, surface, time);
            }
        }
    }

    fn run(&mut self, glitch: Glitch, surface: &mut Surface, time: f32) {
        let w = surface.width() as i32;
        let h = surface.height() as i32;
        match glitch {
            Glitch::ColorFringe => {
                surface.lighten_rect(2, 0, w, h, (100, 0, 0), 0.03);
                surface.lighten_rect(-2, 0, w, h, (0, 0, 100), 0.03);
            }
            Glitch::Flicker { max_alpha } => {
                let alpha = self.rng.f32() * max_alpha;
                surface.fill_rect(0, 0, w, h, (255, 255, 255), alpha);
            }
            Glitch::RowShift { max_shift, max_band } => {
                let shift = self.rng.i32(-max_shift..=max_shift);
                let y = (self.rng.f32() * h as f32) as i32;
                let band = 5 + self.rng.i32(0..=max_band);
                let _ = surface.shift_rows(y, band, shift);
            }
            Glitch::ColShift { max_shift, max_band } => {
                let shift = self.rng.i32(-max_shift..=max_shift);
                let x = (self.rng.f32() * w as f32) as i32;
                let band = 5 + self.rng.i32(0..=max_band);
                let _ = surface.shift_cols(x, band, shift);
            }
            Glitch::Jitter => {
                let dx = self.rng.i32(-3..=3);
                let dy = self.rng.i32(-3..=3);
                surface.shift_frame(dx, dy);
            }
            Glitch::NoiseLineH { alpha } => {
                let line_h = 1 + self.rng.i32(0..=3);
                let y = (self.rng.f32() * h as f32) as i32;
                surface.fill_rect(0, y, w, line_h, (255, 255, 255), alpha);
            }
            Glitch::NoiseLineV { alpha } => {
                let line_w = 1 + self.rng.i32(0..=2);
                let x = (self.rng.f32() * w as f32) as i32;
                surface.fill_rect(x, 0, line_w, h, (255, 255, 255), alpha);
            }
            Glitch::ColorBleed { alpha } => {
                let tint = match self.rng.u8(0..3) {
                    0 => (255, 50, 50),
                    1 => (50, 255, 50),
                    _ => (50, 50, 255),
                };
                surface.fill_rect(0, 0, w, h, tint, alpha);
            }
            Glitch::Aberration { offset, alpha } => {
                surface.chromatic_aberration(offset, alpha);
            }
            Glitch::BlankingBar => {
                let bar_h = 5 + self.rng.i32(0..=9);
                let y = ((time * 50.0) % h.max(1) as f32) as i32;
                surface.fill_rect(0, y, w, bar_h, (0, 0, 0), 0.9);
            }
            Glitch::RollingBar => {
                let bar_h = 20 + self.rng.i32(0..=40);
                let y = ((time * 50.0) % (h.max(1) * 2) as f32) as i32 - bar_h;
                surface.fill_rect(0, y, w, bar_h, (255, 255, 255), 0.1);
            }
            Glitch::Glare { alpha } => {
                glare(surface, alpha);
            }
        }
    }
}

/// Fixed-position reflection: radial white falloff centered high-right.
fn glare(surface: &mut Surface, max_alpha: f32) {
    let w = surface.width() as f32;
    let h = surface.height() as f32;
    let cx = w * 0.75;
    let cy = h * 0.2;
    let radius = w * 0.3;
    let x0 = ((cx - radius).floor() as i32).max(0);
    let x1 = ((cx + radius).ceil() as i32).min(w as i32);
    let y0 = ((cy - radius).floor() as i32).max(0);
    let y1 = ((cy + radius).ceil() as i32).min(h as i32);
    for y in y0..y1 {
        for x in x0..x1 {
            let dx = x as f32 - cx;
            let dy = y as f32 - cy;
            let t = (dx * dx + dy * dy).sqrt() / radius;
            if t < 1.0 {
                surface.blend_pixel(x, y, (255, 255, 255), max_alpha * (1.0 - t));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::OverlayConfig;

    fn run_frame(seed: u64, size: (usize, usize)) -> Surface {
        let mut surface = Surface::new(size.0, size.1);
        surface.fill((80, 120, 160));
        let overlay = Overlay::generate(size.0, size.1, &OverlayConfig::dense());
        let mut pass = DistortionPass::with_seed(&HEAVY, seed);
        pass.apply(&mut surface, &overlay, 1.25);
        surface
    }

    #[test]
    fn seeded_passes_are_reproducible() {
        let a = run_frame(7, (40, 24));
        let b = run_frame(7, (40, 24));
        for y in 0..24 {
            for x in 0..40 {
                assert_eq!(a.pixel(x, y), b.pixel(x, y));
            }
        }
    }

    #[test]
    fn different_seeds_diverge() {
        let a = run_frame(1, (40, 24));
        let b = run_frame(2, (40, 24));
        let mut differs = false;
        'outer: for y in 0..24 {
            for x in 0..40 {
                if a.pixel(x, y) != b.pixel(x, y) {
                    differs = true;
                    break 'outer;
                }
            }
        }
        assert!(differs);
    }

    #[test]
    fn every_glitch_survives_a_tiny_surface() {
        let mut surface = Surface::new(1, 1);
        let overlay = Overlay::generate(1, 1, &OverlayConfig::sparse());
        let mut pass = DistortionPass::with_seed(&HEAVY, 3);
        let glitches = [
            Glitch::ColorFringe,
            Glitch::Flicker { max_alpha: 0.15 },
            Glitch::RowShift { max_shift: 12, max_band: 40 },
            Glitch::ColShift { max_shift: 12, max_band: 40 },
            Glitch::Jitter,
            Glitch::NoiseLineH { alpha: 0.3 },
            Glitch::NoiseLineV { alpha: 0.25 },
            Glitch::ColorBleed { alpha: 0.12 },
            Glitch::Aberration { offset: 2, alpha: 0.2 },
            Glitch::BlankingBar,
            Glitch::RollingBar,
            Glitch::Glare { alpha: 0.12 },
        ];
        for glitch in glitches {
            pass.run(glitch, &mut surface, 0.5);
        }
        surface.multiply(overlay.texels());
        let p = surface.pixel(0, 0);
        assert!(p.0.is_finite() && p.1.is_finite() && p.2.is_finite());
    }

    #[test]
    fn step_tables_keep_their_fixed_order() {
        assert_eq!(HEAVY.pre[0].glitch, Glitch::ColorFringe);
        assert_eq!(HEAVY.pre[0].chance, 1.0);
        assert!(matches!(HEAVY.post[0].glitch, Glitch::BlankingBar));
        assert!(matches!(HEAVY.post[1].glitch, Glitch::RollingBar));
        assert!(matches!(HEAVY.post[2].glitch, Glitch::Glare { .. }));
        assert!(matches!(SOFT.post.last().unwrap().glitch, Glitch::Glare { .. }));
    }
}
