use super::Effect;
use crate::distortion::{DistortionPass, HEAVY};
use crate::overlay::{Overlay, OverlayConfig};
use crate::sequencer::{self, CYCLE_LENGTH, Frame, Phase, Sequencer};
use crate::surface::{Surface, hsl_to_rgb};
use std::io::{BufWriter, Stdout};

const SEGMENTS: usize = 20;
const SIDES: usize = 8;
/// The cycle restarts through static this close to its end.
const RESET_PROGRESS: f32 = 3.8;

/// Flight down a rotating polygonal tunnel with drifting hues.
pub struct TunnelEffect {
    surface: Surface,
    overlay: Overlay,
    distortion: DistortionPass,
    sequencer: Sequencer,
    rng: fastrand::Rng,
    frame: Frame,
}

impl TunnelEffect {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            surface: Surface::new(width, height),
            overlay: Overlay::generate(width, height, &OverlayConfig::dense()),
            distortion: DistortionPass::new(&HEAVY),
            sequencer: Sequencer::new(),
            rng: fastrand::Rng::new(),
            frame: Frame::Running {
                time: 0.0,
                cycle_progress: 0.0,
            },
        }
    }

    fn ring_point(
        &self,
        angle: f32,
        radius: f32,
        oscillation: f32,
        perspective: f32,
        time: f32,
    ) -> (f32, f32) {
        let cx = self.surface.width() as f32 / 2.0;
        let cy = self.surface.height() as f32 / 2.0;
        let wave = 0.1 * (angle * 3.0 + time).sin();
        let r = radius * (1.0 + wave);
        // Slightly oval for a deeper look.
        (
            cx + r * angle.cos() + oscillation * perspective,
            cy + r * angle.sin() * 0.8,
        )
    }

    fn draw_tunnel(&mut self, time: f32) {
        let w = self.surface.width() as f32;
        let h = self.surface.height() as f32;
        let cx = w / 2.0;
        let cy = h / 2.0;
        let max_radius = w.max(h) * 0.6;
        let progress = (time % 1.0) * 15.0;
        let oscillation = time.sin() * w * 0.02;
        let rotation = time * 0.2;

        // Back to front so near rings draw over far ones.
        for i in (0..SEGMENTS).rev() {
            let depth = (i as f32 + progress) / SEGMENTS as f32;
            let perspective = depth.powf(1.5);
            let radius = max_radius * perspective;
            let brightness = (255.0 * (1.0 - perspective * 0.8)).max(0.0);
            let hue = (time * 50.0 + i as f32 * 10.0) % 360.0;

            let (color, alpha, thickness) = if i % 3 == 0 {
                let lightness = ((brightness * 0.7 + 30.0) / 100.0).clamp(0.0, 1.0);
                (hsl_to_rgb(hue, 1.0, lightness), 0.9, (3.0 - 2.0 * perspective).max(1.0))
            } else {
                let b = brightness as u8;
                ((b, b, b), (0.9 - perspective * 0.6).max(0.05), (2.0 - perspective).max(1.0))
            };

            let mut prev: Option<(f32, f32)> = None;
            for j in 0..=SIDES {
                let angle = j as f32 / SIDES as f32 * std::f32::consts::TAU
                    + rotation
                    + i as f32 * 0.05;
                let point = self.ring_point(angle, radius, oscillation, perspective, time);
                if let Some(p) = prev {
                    self.surface
                        .line(p.0, p.1, point.0, point.1, color, alpha, thickness);
                }
                prev = Some(point);
            }

            // Diagonal cross lines on alternating far rings.
            if i % 2 == 0 && i < SEGMENTS - 5 {
                for j in 0..SIDES / 2 {
                    let angle1 = j as f32 / SIDES as f32 * std::f32::consts::TAU
                        + rotation
                        + i as f32 * 0.05;
                    let angle2 = angle1 + std::f32::consts::PI;
                    let p1 = self.ring_point(angle1, radius, oscillation, perspective, time);
                    let p2 = self.ring_point(angle2, radius, oscillation, perspective, time);
                    self.surface
                        .line(p1.0, p1.1, p2.0, p2.1, color, alpha * 0.6, 1.0);
                }
            }

            // Point light at the mouth and halfway down.
            if i == 0 || i == SEGMENTS / 2 {
                let glow_size = (20.0 - perspective * 15.0).max(1.0);
                let glow_color = hsl_to_rgb(hue, 1.0, 0.65);
                self.surface.glow(
                    cx + oscillation * perspective,
                    cy,
                    glow_size,
                    glow_color,
                    0.9,
                );
            }
        }
    }
}

impl Effect for TunnelEffect {
    fn update(&mut self, dt: f32) {
        let frame = self.sequencer.advance(dt);
        if let Frame::Running { time, .. } = frame {
            if time % CYCLE_LENGTH > RESET_PROGRESS {
                self.sequencer.begin_transition();
            }
        }
        self.frame = frame;
    }

    fn render(&mut self, stdout: &mut BufWriter<Stdout>) -> std::io::Result<()> {
        self.surface.fill((0, 0, 0));
        match self.frame {
            Frame::Running { time, .. } => {
                self.draw_tunnel(time);
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
    fn cycle_end_triggers_the_transition() {
        let mut effect = TunnelEffect::new(40, 24);
        let mut transitioned = false;
        for _ in 0..4000 {
            effect.update(1.0 / 60.0);
            if effect.sequencer.is_transitioning() {
                transitioned = true;
                break;
            }
        }
        assert!(transitioned);
        assert!(effect.sequencer.time() % CYCLE_LENGTH > RESET_PROGRESS);
    }

    #[test]
    fn after_the_transition_the_clock_restarts() {
        let mut effect = TunnelEffect::new(40, 24);
        while !effect.sequencer.is_transitioning() {
            effect.update(1.0 / 60.0);
        }
        for _ in 0..200 {
            effect.update(1.0 / 60.0);
            if !effect.sequencer.is_transitioning() {
                break;
            }
        }
        assert!(!effect.sequencer.is_transitioning());
        assert!(effect.sequencer.time() < 1.0);
    }

    #[test]
    fn ring_points_stay_finite_across_a_cycle() {
        let effect = TunnelEffect::new(60, 40);
        for step in 0..100 {
            let time = step as f32 * 0.1;
            for i in 0..SEGMENTS {
                let depth = (i as f32 + (time % 1.0) * 15.0) / SEGMENTS as f32;
                let perspective = depth.powf(1.5);
                let p = effect.ring_point(1.3, 30.0 * perspective, 2.0, perspective, time);
                assert!(p.0.is_finite() && p.1.is_finite());
            }
        }
    }
}
