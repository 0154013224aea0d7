use super::Effect;
use crate::distortion::{DistortionPass, SOFT};
use crate::overlay::{Overlay, OverlayConfig};
use crate::sequencer::{self, CYCLE_LENGTH, Frame, Phase, Sequencer};
use crate::surface::Surface;
use std::io::{BufWriter, Stdout};

/// Cells start this fraction of the short viewport edge wide.
const BASE_CELL: f32 = 0.001;
/// The zoom restarts once a cell outgrows the viewport by this factor.
const RESET_FACTOR: f32 = 10.0;

/// Infinite zoom into a glowing net of cells, restarting through static.
pub struct NetEffect {
    surface: Surface,
    overlay: Overlay,
    distortion: DistortionPass,
    sequencer: Sequencer,
    rng: fastrand::Rng,
    frame: Frame,
    zoom: f32,
}

impl NetEffect {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            surface: Surface::new(width, height),
            overlay: Overlay::generate(width, height, &OverlayConfig::dense()),
            distortion: DistortionPass::new(&SOFT),
            sequencer: Sequencer::new(),
            rng: fastrand::Rng::new(),
            frame: Frame::Running {
                time: 0.0,
                cycle_progress: 0.0,
            },
            zoom: 1.0,
        }
    }

    fn cell_size(&self) -> f32 {
        let short = self.surface.width().min(self.surface.height()) as f32;
        short * BASE_CELL * self.zoom * 4.0
    }

    fn draw_grid(&mut self) {
        let surface = &mut self.surface;
        let w = surface.width() as f32;
        let h = surface.height() as f32;
        let cx = w / 2.0;
        let cy = h / 2.0;

        let cell = (w.min(h) * BASE_CELL * self.zoom * 4.0).max(0.5);
        let offset_x = (cx - cell / 2.0).rem_euclid(cell);
        let offset_y = (cy - cell / 2.0).rem_euclid(cell);
        let thickness = (2.0 * (1.0 - (self.zoom - 1.0))).clamp(1.0, 3.0);

        let mut x = offset_x;
        while x <= w {
            let opacity = line_opacity(x, cx, cell);
            // Soft side pair stands in for the canvas glow.
            surface.line(x - 1.0, 0.0, x - 1.0, h, (255, 255, 255), opacity * 0.2, 1.0);
            surface.line(x + 1.0, 0.0, x + 1.0, h, (255, 255, 255), opacity * 0.2, 1.0);
            surface.line(x, 0.0, x, h, (255, 255, 255), opacity, thickness);
            x += cell;
        }

        let mut y = offset_y;
        while y <= h {
            let opacity = line_opacity(y, cy, cell);
            surface.line(0.0, y - 1.0, w, y - 1.0, (255, 255, 255), opacity * 0.2, 1.0);
            surface.line(0.0, y + 1.0, w, y + 1.0, (255, 255, 255), opacity * 0.2, 1.0);
            surface.line(0.0, y, w, y, (255, 255, 255), opacity, thickness);
            y += cell;
        }
    }
}

/// Lines near the screen center read stronger.
fn line_opacity(position: f32, center: f32, cell: f32) -> f32 {
    (1.0 - (position - center).abs() / (cell * 3.0)).max(0.2)
}

impl Effect for NetEffect {
    fn update(&mut self, dt: f32) {
        let frame = self.sequencer.advance(dt);
        if let Frame::Running { time, .. } = frame {
            self.zoom = 2.0_f32.powf((time % CYCLE_LENGTH) * 4.0);
            let long = self.surface.width().max(self.surface.height()) as f32;
            if self.cell_size() > long * RESET_FACTOR {
                self.sequencer.begin_transition();
            }
        }
        self.frame = frame;
    }

    fn render(&mut self, stdout: &mut BufWriter<Stdout>) -> std::io::Result<()> {
        self.surface.fill((0, 0, 0));
        match self.frame {
            Frame::Running { .. } => {
                self.draw_grid();
                self.distortion
                    .apply(&mut self.surface, &self.overlay, self.sequencer.time());
            }
            Frame::Transitioning {
                phase,
                static_intensity,
                gray_level,
            } => {
                if gray_level > 0.0 {
                    let g = gray_level as u8;
                    self.surface.fill((g, g, g));
                }
                sequencer::draw_static(&mut self.surface, &mut self.rng, static_intensity);
                if phase != Phase::Flash {
                    self.distortion
                        .apply(&mut self.surface, &self.overlay, self.sequencer.time());
                }
            }
        }
        self.surface.present(stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runaway_zoom_triggers_the_transition() {
        let mut effect = NetEffect::new(40, 24);
        let mut transitioned = false;
        for _ in 0..4000 {
            effect.update(1.0 / 60.0);
            if effect.sequencer.is_transitioning() {
                transitioned = true;
                break;
            }
        }
        assert!(transitioned);
    }

    #[test]
    fn transition_runs_to_completion_and_zoom_restarts() {
        let mut effect = NetEffect::new(40, 24);
        while !effect.sequencer.is_transitioning() {
            effect.update(1.0 / 60.0);
        }
        // Ride the transition out; afterwards the clock is back at zero.
        for _ in 0..200 {
            effect.update(1.0 / 60.0);
            if !effect.sequencer.is_transitioning() {
                break;
            }
        }
        assert!(!effect.sequencer.is_transitioning());
        assert!(effect.zoom < 2.0);
    }

    #[test]
    fn overlay_always_matches_the_surface() {
        for (w, h) in [(40, 24), (81, 55), (200, 112)] {
            let effect = NetEffect::new(w, h);
            assert_eq!(effect.overlay.width(), effect.surface.width());
            assert_eq!(effect.overlay.height(), effect.surface.height());
        }
    }

    #[test]
    fn center_lines_are_strongest() {
        assert_eq!(line_opacity(50.0, 50.0, 10.0), 1.0);
        assert!(line_opacity(50.0, 50.0, 10.0) > line_opacity(75.0, 50.0, 10.0));
        assert_eq!(line_opacity(500.0, 50.0, 10.0), 0.2);
    }
}
