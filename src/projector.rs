/// Entities are recycled before their depth reaches this, so the
/// perspective divide never sees a zero or negative z.
pub const MIN_DEPTH: f32 = 1.0;

const MIN_SIZE: f32 = 0.1;

pub struct Projection {
    pub x: f32,
    pub y: f32,
    /// focal / depth; callers derive size and opacity from it.
    pub scale: f32,
}

/// Pinhole perspective: screen = center + pos.xy * focal / depth + wobble.
pub struct Projector {
    pub focal: f32,
    pub center_x: f32,
    pub center_y: f32,
    pub wobble_x: f32,
    pub wobble_y: f32,
}

impl Projector {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            focal: width.min(height) as f32 * 0.4,
            center_x: width as f32 / 2.0,
            center_y: height as f32 / 2.0,
            wobble_x: 0.0,
            wobble_y: 0.0,
        }
    }

    /// Subtle scene oscillation, updated once per frame by the effect.
    pub fn set_wobble(&mut self, time: f32, amp_x: f32, amp_y: f32) {
        self.wobble_x = (time * 0.5).sin() * amp_x;
        self.wobble_y = (time * 0.7).cos() * amp_y;
    }

    pub fn project(&self, x: f32, y: f32, z: f32) -> Option<Projection> {
        if z < MIN_DEPTH {
            return None;
        }
        let scale = self.focal / z;
        Some(Projection {
            x: self.center_x + x * scale + self.wobble_x,
            y: self.center_y + y * scale + self.wobble_y,
            scale,
        })
    }

    /// Perceived radius: nearer means larger, floored so a draw is never
    /// invisible or negative.
    pub fn size(&self, scale: f32, base: f32) -> f32 {
        (scale * base * 2.0).max(MIN_SIZE)
    }

    /// Perceived opacity: nearer means more opaque, capped at 1.
    pub fn opacity(&self, scale: f32) -> f32 {
        (scale * 1.5).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_below_minimum_is_rejected() {
        let p = Projector::new(100, 100);
        assert!(p.project(0.0, 0.0, 0.5).is_none());
        assert!(p.project(0.0, 0.0, 0.0).is_none());
        assert!(p.project(0.0, 0.0, -5.0).is_none());
        assert!(p.project(0.0, 0.0, MIN_DEPTH).is_some());
    }

    #[test]
    fn size_and_opacity_are_positive_and_finite() {
        let p = Projector::new(200, 112);
        for z in [1.0_f32, 2.0, 50.0, 999.0, 2000.0] {
            let proj = p.project(100.0, -40.0, z).unwrap();
            let size = p.size(proj.scale, 1.0);
            let opacity = p.opacity(proj.scale);
            assert!(size > 0.0 && size.is_finite());
            assert!(opacity >= 0.0 && opacity <= 1.0 && opacity.is_finite());
            assert!(proj.x.is_finite() && proj.y.is_finite());
        }
    }

    #[test]
    fn nearer_points_project_larger() {
        let p = Projector::new(200, 112);
        let near = p.project(10.0, 10.0, 10.0).unwrap();
        let far = p.project(10.0, 10.0, 500.0).unwrap();
        assert!(near.scale > far.scale);
        assert!(p.size(near.scale, 1.0) > p.size(far.scale, 1.0));
    }

    #[test]
    fn wobble_offsets_the_projection() {
        let mut p = Projector::new(100, 100);
        let plain = p.project(0.0, 0.0, 10.0).unwrap();
        p.set_wobble(1.3, 4.0, 3.0);
        let wobbled = p.project(0.0, 0.0, 10.0).unwrap();
        assert!((wobbled.x - plain.x).abs() > 0.0 || (wobbled.y - plain.y).abs() > 0.0);
    }
}
