use super::Effect;
use crate::distortion::{DistortionPass, HEAVY};
use crate::overlay::{Overlay, OverlayConfig};
use crate::projector::{MIN_DEPTH, Projector};
use crate::surface::{Surface, hsl_to_rgb};
use noise::{NoiseFn, Perlin};
use std::collections::VecDeque;
use std::io::{BufWriter, Stdout};

/// Lateral extent of the star field in simulation units.
const FIELD_EXTENT: f32 = 2000.0;
/// Recycled entities respawn this far out.
const RESET_DEPTH: f32 = 2000.0;
/// Forward flight speed in depth units per second.
const FLIGHT_SPEED: f32 = 900.0;
/// One star per this many surface pixels.
const STAR_DENSITY: usize = 20;

const COMET_COUNT: usize = 3;
pub const MAX_TAIL_LEN: usize = 24;
const CLOUD_COUNT: usize = 4;

struct Star {
    x: f32,
    y: f32,
    z: f32,
    hue: f32,
    brightness: f32,
    size: f32,
}

impl Star {
    fn spawn() -> Self {
        Self {
            x: (fastrand::f32() * 2.0 - 1.0) * FIELD_EXTENT,
            y: (fastrand::f32() * 2.0 - 1.0) * FIELD_EXTENT,
            z: fastrand::f32() * 1000.0 + 1.0,
            hue: Self::roll_hue(),
            brightness: 50.0 + fastrand::f32() * 50.0,
            size: 1.0 + fastrand::f32() * 3.0,
        }
    }

    // Blues through purples.
    fn roll_hue() -> f32 {
        fastrand::f32() * 60.0 + 220.0
    }

    /// Move toward the viewer; respawn in place once past the depth floor.
    fn advance(&mut self, dz: f32) {
        self.z -= dz;
        if self.z < MIN_DEPTH {
            self.x = (fastrand::f32() * 2.0 - 1.0) * FIELD_EXTENT;
            self.y = (fastrand::f32() * 2.0 - 1.0) * FIELD_EXTENT;
            self.z = RESET_DEPTH;
            self.hue = Self::roll_hue();
            self.brightness = 50.0 + fastrand::f32() * 50.0;
        }
    }
}

struct Comet {
    x: f32,
    y: f32,
    z: f32,
    vx: f32,
    vy: f32,
    hue: f32,
    tail: VecDeque<(f32, f32)>,
}

impl Comet {
    fn spawn() -> Self {
        Self {
            x: (fastrand::f32() * 2.0 - 1.0) * FIELD_EXTENT,
            y: (fastrand::f32() * 2.0 - 1.0) * FIELD_EXTENT,
            z: 500.0 + fastrand::f32() * (RESET_DEPTH - 500.0),
            vx: (fastrand::f32() * 2.0 - 1.0) * 300.0,
            vy: (fastrand::f32() * 2.0 - 1.0) * 300.0,
            hue: 170.0 + fastrand::f32() * 50.0,
            tail: VecDeque::with_capacity(MAX_TAIL_LEN + 1),
        }
    }

    fn advance(&mut self, dz: f32, dt: f32) {
        self.z -= dz * 1.2;
        self.x += self.vx * dt;
        self.y += self.vy * dt;
        if self.z < MIN_DEPTH {
            *self = Self::spawn();
            self.z = RESET_DEPTH;
        }
    }

    /// Remember the latest screen position, evicting the oldest once the
    /// tail is full.
    fn record(&mut self, x: f32, y: f32) {
        self.tail.push_back((x, y));
        while self.tail.len() > MAX_TAIL_LEN {
            self.tail.pop_front();
        }
    }
}

struct Cloud {
    x: f32,
    y: f32,
    z: f32,
    radius: f32,
    hue: f32,
    seed: f64,
}

impl Cloud {
    fn spawn() -> Self {
        Self {
            x: (fastrand::f32() * 2.0 - 1.0) * FIELD_EXTENT * 0.6,
            y: (fastrand::f32() * 2.0 - 1.0) * FIELD_EXTENT * 0.6,
            z: 400.0 + fastrand::f32() * (RESET_DEPTH - 400.0),
            radius: 300.0 + fastrand::f32() * 500.0,
            hue: 250.0 + fastrand::f32() * 60.0,
            seed: fastrand::f64() * 100.0,
        }
    }

    fn advance(&mut self, dz: f32) {
        // Nebulae drift, they don't rush past.
        self.z -= dz * 0.25;
        if self.z < 50.0 {
            *self = Self::spawn();
            self.z = RESET_DEPTH * 0.9;
        }
    }
}

/// Space flight through a star field, with comets and nebula haze.
pub struct FlightEffect {
    surface: Surface,
    overlay: Overlay,
    distortion: DistortionPass,
    projector: Projector,
    perlin: Perlin,
    stars: Vec<Star>,
    comets: Vec<Comet>,
    clouds: Vec<Cloud>,
    time: f32,
}

impl FlightEffect {
    pub fn new(width: usize, height: usize) -> Self {
        let star_count = (width * height / STAR_DENSITY).max(64);
        Self {
            surface: Surface::new(width, height),
            overlay: Overlay::generate(width, height, &OverlayConfig::sparse()),
            distortion: DistortionPass::new(&HEAVY),
            projector: Projector::new(width, height),
            perlin: Perlin::new(fastrand::u32(0..1000)),
            stars: (0..star_count).map(|_| Star::spawn()).collect(),
            comets: (0..COMET_COUNT).map(|_| Comet::spawn()).collect(),
            clouds: (0..CLOUD_COUNT).map(|_| Cloud::spawn()).collect(),
            time: 0.0,
        }
    }

    fn draw_clouds(&mut self) {
        let surface = &mut self.surface;
        let projector = &self.projector;
        let perlin = &self.perlin;
        let time = self.time;
        for cloud in &self.clouds {
            let Some(proj) = projector.project(cloud.x, cloud.y, cloud.z) else {
                continue;
            };
            let radius = (proj.scale * cloud.radius).clamp(4.0, 45.0);
            let base_alpha = projector.opacity(proj.scale) * 0.25;
            let color = hsl_to_rgb(cloud.hue, 0.7, 0.4);
            let x0 = ((proj.x - radius) as i32).max(0);
            let x1 = ((proj.x + radius) as i32).min(surface.width() as i32 - 1);
            let y0 = ((proj.y - radius) as i32).max(0);
            let y1 = ((proj.y + radius) as i32).min(surface.height() as i32 - 1);
            for py in y0..=y1 {
                for px in x0..=x1 {
                    let dx = px as f32 - proj.x;
                    let dy = py as f32 - proj.y;
                    let dist = (dx * dx + dy * dy).sqrt() / radius;
                    if dist >= 1.0 {
                        continue;
                    }
                    let wisp = perlin.get([
                        px as f64 * 0.12 + cloud.seed,
                        py as f64 * 0.12,
                        time as f64 * 0.05,
                    ]) as f32;
                    let alpha = base_alpha * (1.0 - dist) * (0.5 + wisp * 0.5).max(0.0);
                    if alpha > 0.003 {
                        surface.blend_pixel(px, py, color, alpha);
                    }
                }
            }
        }
    }

    fn draw_stars(&mut self) {
        let surface = &mut self.surface;
        let projector = &self.projector;
        for star in &self.stars {
            let Some(proj) = projector.project(star.x, star.y, star.z) else {
                continue;
            };
            let size = projector.size(proj.scale, star.size);
            let opacity = projector.opacity(proj.scale);
            let lightness = star.brightness / 100.0;

            if star.z < 200.0 {
                let color = hsl_to_rgb(star.hue, 1.0, lightness);
                surface.glow(proj.x, proj.y, size * 3.0, color, opacity * 0.2);
                surface.disc(proj.x, proj.y, size, color, opacity);
            } else {
                let color = hsl_to_rgb(star.hue, 0.8, lightness);
                surface.disc(proj.x, proj.y, size, color, opacity * 0.8);
            }

            // Motion streak back toward where the star was a frame ago.
            if star.z < 100.0 && size > 1.5 {
                if let Some(prev) = projector.project(star.x, star.y, star.z + FLIGHT_SPEED / 60.0)
                {
                    let color = hsl_to_rgb(star.hue, 1.0, lightness);
                    surface.line(
                        proj.x,
                        proj.y,
                        prev.x,
                        prev.y,
                        color,
                        opacity * 0.3,
                        size * 0.7,
                    );
                }
            }
        }
    }

    fn draw_comets(&mut self) {
        let surface = &mut self.surface;
        let projector = &self.projector;
        for comet in &mut self.comets {
            let Some(proj) = projector.project(comet.x, comet.y, comet.z) else {
                continue;
            };
            comet.record(proj.x, proj.y);

            let color = hsl_to_rgb(comet.hue, 0.9, 0.7);
            let opacity = projector.opacity(proj.scale);
            let len = comet.tail.len();
            for (i, pair) in comet.tail.iter().zip(comet.tail.iter().skip(1)).enumerate() {
                let fade = (i + 1) as f32 / len as f32;
                surface.line(
                    pair.0.0,
                    pair.0.1,
                    pair.1.0,
                    pair.1.1,
                    color,
                    opacity * 0.5 * fade,
                    1.0,
                );
            }
            let size = projector.size(proj.scale, 2.0);
            surface.glow(proj.x, proj.y, size * 2.5, color, opacity * 0.3);
            surface.disc(proj.x, proj.y, size, (255, 255, 255), opacity);
        }
    }

    /// Occasional radial grid flash for depth perception.
    fn draw_grid_flash(&mut self) {
        if fastrand::f32() >= 0.05 {
            return;
        }
        let surface = &mut self.surface;
        let projector = &self.projector;
        let cx = projector.center_x + projector.wobble_x;
        let cy = projector.center_y + projector.wobble_y;
        let grid_scale = projector.focal / (500.0 + fastrand::f32() * 500.0);
        let base_angle = fastrand::f32() * std::f32::consts::TAU;

        let lines = 10;
        let length = 1000.0 * grid_scale;
        for i in 0..lines {
            let angle = base_angle + i as f32 / lines as f32 * std::f32::consts::TAU;
            surface.line(
                cx,
                cy,
                cx + angle.cos() * length,
                cy + angle.sin() * length,
                (255, 255, 255),
                0.15,
                1.0,
            );
        }

        let mut radius = 100.0;
        while radius < 1000.0 {
            let r = radius * grid_scale;
            let segments = 48;
            let mut prev = (cx + r, cy);
            for s in 1..=segments {
                let angle = s as f32 / segments as f32 * std::f32::consts::TAU;
                let next = (cx + angle.cos() * r, cy + angle.sin() * r);
                surface.line(prev.0, prev.1, next.0, next.1, (255, 255, 255), 0.15, 1.0);
                prev = next;
            }
            radius += 200.0;
        }
    }
}

impl Effect for FlightEffect {
    fn update(&mut self, dt: f32) {
        self.time += dt;
        if self.time > 10000.0 {
            self.time -= 10000.0;
        }

        let w = self.surface.width() as f32;
        let h = self.surface.height() as f32;
        self.projector.set_wobble(self.time, w * 0.01, h * 0.01);

        let dz = FLIGHT_SPEED * dt;
        for star in &mut self.stars {
            star.advance(dz);
        }
        for comet in &mut self.comets {
            comet.advance(dz, dt);
        }
        for cloud in &mut self.clouds {
            cloud.advance(dz);
        }
    }

    fn render(&mut self, stdout: &mut BufWriter<Stdout>) -> std::io::Result<()> {
        self.surface.fill((0, 0, 0));
        self.draw_clouds();
        self.draw_grid_flash();
        self.draw_stars();
        self.draw_comets();
        self.distortion
            .apply(&mut self.surface, &self.overlay, self.time);
        self.surface.present(stdout)
    }
}
