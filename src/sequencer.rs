use crate::surface::Surface;

pub const CYCLE_LENGTH: f32 = 4.0;
pub const BASE_SPEED: f32 = 0.003;
pub const MAX_SPEED: f32 = 0.01;

/// Transition progress advances by dt * this (full transition ~1.66 s).
const TRANSITION_RATE: f32 = 0.6;

/// Sub-intervals of a transition's normalized progress.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    NoiseFadeIn,
    NoiseHold,
    NoiseFadeOut,
    Flash,
}

impl Phase {
    pub fn of(progress: f32) -> Self {
        if progress < 0.35 {
            Phase::NoiseFadeIn
        } else if progress < 0.65 {
            Phase::NoiseHold
        } else if progress < 0.9 {
            Phase::NoiseFadeOut
        } else {
            Phase::Flash
        }
    }
}

/// Static intensity over a transition: sinusoidal ease in, hold at 0.9,
/// cosine ease out, none during the flash.
pub fn static_intensity(progress: f32) -> f32 {
    match Phase::of(progress) {
        Phase::NoiseFadeIn => ((progress / 0.35) * std::f32::consts::FRAC_PI_2).sin() * 0.9,
        Phase::NoiseHold => 0.9,
        Phase::NoiseFadeOut => {
            0.9 * (((progress - 0.65) / 0.25) * std::f32::consts::FRAC_PI_2).cos()
        }
        Phase::Flash => 0.0,
    }
}

/// Background gray over a transition: absent, ramp to 20, ramp to 60,
/// then a fast ramp to full white.
pub fn gray_level(progress: f32) -> f32 {
    match Phase::of(progress) {
        Phase::NoiseFadeIn => 0.0,
        Phase::NoiseHold => (progress - 0.35) / 0.3 * 20.0,
        Phase::NoiseFadeOut => 20.0 + (progress - 0.65) / 0.25 * 40.0,
        Phase::Flash => (60.0 + (progress - 0.9) / 0.1 * 195.0).min(255.0),
    }
}

#[derive(Clone, Copy)]
pub enum Frame {
    Running { time: f32, cycle_progress: f32 },
    Transitioning { phase: Phase, static_intensity: f32, gray_level: f32 },
}

/// Drives the cyclical zoom animations: an accelerating clock while
/// Running, a four-phase static transition when a cycle ends, then a full
/// reset back to the initial clock and speed.
pub struct Sequencer {
    time: f32,
    speed: f32,
    transition: Option<f32>,
}

impl Sequencer {
    pub fn new() -> Self {
        Self {
            time: 0.0,
            speed: BASE_SPEED,
            transition: None,
        }
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn is_transitioning(&self) -> bool {
        self.transition.is_some()
    }

    pub fn begin_transition(&mut self) {
        if self.transition.is_none() {
            self.transition = Some(0.0);
        }
    }

    pub fn advance(&mut self, dt: f32) -> Frame {
        match self.transition {
            None => {
                let cycle_progress = (self.time % CYCLE_LENGTH) / CYCLE_LENGTH;
                self.speed = BASE_SPEED + (MAX_SPEED - BASE_SPEED) * cycle_progress;
                // The original advanced the clock by `speed` once per
                // 60 Hz frame; scale by dt to stay frame-rate independent.
                self.time += self.speed * dt * 60.0;
                Frame::Running {
                    time: self.time,
                    cycle_progress,
                }
            }
            Some(progress) => {
                let progress = progress + dt * TRANSITION_RATE;
                if progress >= 1.0 {
                    self.time = 0.0;
                    self.speed = BASE_SPEED;
                    self.transition = None;
                    return Frame::Running {
                        time: 0.0,
                        cycle_progress: 0.0,
                    };
                }
                self.transition = Some(progress);
                Frame::Transitioning {
                    phase: Phase::of(progress),
                    static_intensity: static_intensity(progress),
                    gray_level: gray_level(progress),
                }
            }
        }
    }
}

/// TV static/snow drawn during transitions. Intensity in 0..=1 scales
/// coverage, brightness, scanline chance and the vertical-hold roll.
pub fn draw_static(surface: &mut Surface, rng: &mut fastrand::Rng, intensity: f32) {
    if intensity <= 0.0 {
        return;
    }
    let w = surface.width();
    let h = surface.height();

    // Dim background wash under the snow.
    let wash = 40.0 * 0.3 * intensity;
    for y in 0..h as i32 {
        for x in 0..w as i32 {
            surface.add_pixel(x, y, wash, wash, wash);
        }
    }

    let particles = (w as f32 * h as f32 * 0.6 * intensity) as usize;
    for _ in 0..particles {
        let x = rng.i32(0..w.max(1) as i32);
        let y = rng.i32(0..h.max(1) as i32);
        let brightness = 100.0 + rng.f32() * 155.0 * (intensity * 1.2).min(1.0);
        let g = if rng.f32() > 0.3 { brightness } else { brightness * 0.7 };
        let b = if rng.f32() > 0.3 { brightness } else { brightness * 0.7 };
        surface.blend_pixel(x, y, (brightness as u8, g as u8, b as u8), 1.0);
    }

    // Scan lines riding on the static.
    for y in (0..h as i32).step_by(3) {
        if rng.f32() < intensity * 0.2 {
            let alpha = rng.f32() * 0.25 * intensity;
            surface.fill_rect(0, y, w as i32, 1, (255, 255, 255), alpha);
        }
    }

    // A few wider glitch streaks.
    let glitches = (12.0 * intensity) as usize;
    for _ in 0..glitches {
        if rng.f32() < 0.3 {
            let x = (rng.f32() * w as f32) as i32;
            let y = (rng.f32() * h as f32) as i32;
            let gw = 5 + rng.i32(0..=30);
            let gh = 1 + rng.i32(0..=2);
            surface.fill_rect(x, y, gw, gh, (255, 255, 255), rng.f32() * 0.5 * intensity);
        }
    }

    // Vertical hold slipping.
    if rng.f32() < intensity * 0.1 {
        let roll = (rng.f32() * 15.0 * intensity - 7.0 * intensity) as i32;
        surface.shift_frame(0, roll);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_are_exhaustive_and_ordered() {
        let mut last = Phase::NoiseFadeIn;
        for i in 0..=1000 {
            let p = i as f32 / 1000.0;
            let phase = Phase::of(p);
            // Monotonic: phases only move forward as progress grows.
            let rank = |ph: Phase| match ph {
                Phase::NoiseFadeIn => 0,
                Phase::NoiseHold => 1,
                Phase::NoiseFadeOut => 2,
                Phase::Flash => 3,
            };
            assert!(rank(phase) >= rank(last));
            last = phase;
        }
        assert_eq!(Phase::of(0.0), Phase::NoiseFadeIn);
        assert_eq!(Phase::of(0.35), Phase::NoiseHold);
        assert_eq!(Phase::of(0.65), Phase::NoiseFadeOut);
        assert_eq!(Phase::of(0.9), Phase::Flash);
        assert_eq!(Phase::of(1.0), Phase::Flash);
    }

    #[test]
    fn intensity_is_continuous_at_phase_boundaries() {
        let eps = 1e-3;
        assert!((static_intensity(0.35 - eps) - 0.9).abs() < 0.01);
        assert!((static_intensity(0.35) - 0.9).abs() < 1e-6);
        assert!((static_intensity(0.65) - 0.9).abs() < 1e-6);
        assert!(static_intensity(0.9 - eps) < 0.01);
        assert_eq!(static_intensity(0.9), 0.0);
    }

    #[test]
    fn gray_is_continuous_at_phase_boundaries() {
        let eps = 1e-3;
        assert!((gray_level(0.65 - eps) - 20.0).abs() < 0.1);
        assert!((gray_level(0.65) - 20.0).abs() < 1e-4);
        assert!((gray_level(0.9 - eps) - 60.0).abs() < 0.1);
        assert!((gray_level(0.9) - 60.0).abs() < 1e-4);
        assert!(gray_level(1.0) <= 255.0);
    }

    #[test]
    fn clock_accelerates_within_a_cycle() {
        let mut seq = Sequencer::new();
        seq.advance(1.0 / 60.0);
        let early = seq.speed();
        while seq.time() < CYCLE_LENGTH * 0.9 {
            seq.advance(1.0 / 60.0);
        }
        assert!(seq.speed() > early);
    }

    #[test]
    fn full_transition_resets_clock_and_speed() {
        let mut seq = Sequencer::new();
        for _ in 0..240 {
            seq.advance(1.0 / 60.0);
        }
        assert!(seq.time() > 0.0);
        seq.begin_transition();
        assert!(seq.is_transitioning());

        let mut saw_flash = false;
        for _ in 0..400 {
            match seq.advance(1.0 / 60.0) {
                Frame::Transitioning { phase, .. } => {
                    if phase == Phase::Flash {
                        saw_flash = true;
                    }
                }
                Frame::Running { time, cycle_progress } => {
                    assert_eq!(time, 0.0);
                    assert_eq!(cycle_progress, 0.0);
                    break;
                }
            }
        }
        assert!(saw_flash);
        assert!(!seq.is_transitioning());
        assert_eq!(seq.time(), 0.0);
        assert_eq!(seq.speed(), BASE_SPEED);
    }

    #[test]
    fn begin_transition_does_not_restart_one_in_flight() {
        let mut seq = Sequencer::new();
        seq.begin_transition();
        seq.advance(0.5);
        let before = match seq.transition {
            Some(p) => p,
            None => panic!("still transitioning"),
        };
        seq.begin_transition();
        assert_eq!(seq.transition, Some(before));
    }

    #[test]
    fn static_noise_never_panics_on_small_surfaces() {
        let mut rng = fastrand::Rng::with_seed(11);
        for (w, h) in [(1, 1), (2, 3), (40, 24)] {
            let mut surface = Surface::new(w, h);
            draw_static(&mut surface, &mut rng, 0.9);
            draw_static(&mut surface, &mut rng, 0.0);
        }
    }
}
