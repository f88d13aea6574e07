use image::{DynamicImage, Rgb, RgbImage};

use crate::detect::Detection;

/// Eye positions of the ArcFace 112×112 reference template.
const REF_LEFT_EYE: (f32, f32) = (38.3, 51.7);
const REF_RIGHT_EYE: (f32, f32) = (73.5, 51.5);
const REF_SIZE: f32 = 112.0;

/// Rotation + uniform scale + translation: `out = M * src + t`.
#[derive(Debug, Clone, Copy)]
struct Similarity {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    tx: f32,
    ty: f32,
}

impl Similarity {
    /// Level the eyes and map their midpoint onto the template midpoint.
    fn from_eyes(left: (f32, f32), right: (f32, f32), size: u32) -> Self {
        let out_scale = size as f32 / REF_SIZE;
        let (dx, dy) = (right.0 - left.0, right.1 - left.1);
        let angle = dy.atan2(dx);

        let ref_dist = (REF_RIGHT_EYE.0 - REF_LEFT_EYE.0).hypot(REF_RIGHT_EYE.1 - REF_LEFT_EYE.1);
        let scale = out_scale * ref_dist / dx.hypot(dy);

        let centre = ((left.0 + right.0) / 2.0, (left.1 + right.1) / 2.0);
        let target = (
            (REF_LEFT_EYE.0 + REF_RIGHT_EYE.0) / 2.0 * out_scale,
            (REF_LEFT_EYE.1 + REF_RIGHT_EYE.1) / 2.0 * out_scale,
        );

        let (a, b) = (scale * angle.cos(), scale * angle.sin());
        let (c, d) = (-b, a);
        Self {
            a,
            b,
            c,
            d,
            tx: target.0 - (a * centre.0 + b * centre.1),
            ty: target.1 - (c * centre.0 + d * centre.1),
        }
    }

    fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.b * y + self.tx,
            self.c * x + self.d * y + self.ty,
        )
    }

    fn invert(&self, x: f32, y: f32) -> (f32, f32) {
        let det = self.a * self.d - self.b * self.c;
        let (px, py) = (x - self.tx, y - self.ty);
        (
            (self.d * px - self.b * py) / det,
            (-self.c * px + self.a * py) / det,
        )
    }
}

/// Warp the detected face into a `size`×`size` crop with the eyes placed
/// where the recognizer expects them. Pixels falling outside the source stay
/// black.
pub fn align_face(img: &DynamicImage, detection: &Detection, size: u32) -> DynamicImage {
    let src = img.to_rgb8();
    let transform = Similarity::from_eyes(detection.left_eye(), detection.right_eye(), size);
    let mut out = RgbImage::new(size, size);

    for y in 0..size {
        for x in 0..size {
            let (sx, sy) = transform.invert(x as f32, y as f32);
            if let Some(px) = bilinear(&src, sx, sy) {
                out.put_pixel(x, y, px);
            }
        }
    }
    DynamicImage::ImageRgb8(out)
}

fn bilinear(src: &RgbImage, x: f32, y: f32) -> Option<Rgb<u8>> {
    let (w, h) = src.dimensions();
    if !(x >= 0.0 && x < w as f32 && y >= 0.0 && y < h as f32) {
        return None;
    }
    let (x0, y0) = (x.floor() as u32, y.floor() as u32);
    let (x1, y1) = ((x0 + 1).min(w - 1), (y0 + 1).min(h - 1));
    let (fx, fy) = (x - x0 as f32, y - y0 as f32);

    let weights = [
        (src.get_pixel(x0, y0), (1.0 - fx) * (1.0 - fy)),
        (src.get_pixel(x1, y0), fx * (1.0 - fy)),
        (src.get_pixel(x0, y1), (1.0 - fx) * fy),
        (src.get_pixel(x1, y1), fx * fy),
    ];
    let mut px = [0u8; 3];
    for (ch, value) in px.iter_mut().enumerate() {
        let v: f32 = weights.iter().map(|(p, wt)| p[ch] as f32 * wt).sum();
        *value = v.round().clamp(0.0, 255.0) as u8;
    }
    Some(Rgb(px))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eyes_at(left: (f32, f32), right: (f32, f32)) -> Detection {
        let mut landmarks = [0.0; 10];
        landmarks[..4].copy_from_slice(&[left.0, left.1, right.0, right.1]);
        Detection {
            bbox: [0.0; 4],
            score: 1.0,
            landmarks,
        }
    }

    #[test]
    fn eye_midpoint_lands_on_template() {
        let t = Similarity::from_eyes((100.0, 120.0), (180.0, 140.0), 112);
        let (x, y) = t.apply(140.0, 130.0);
        assert!((x - (38.3 + 73.5) / 2.0).abs() < 1e-3);
        assert!((y - (51.7 + 51.5) / 2.0).abs() < 1e-3);
    }

    #[test]
    fn invert_undoes_apply() {
        let t = Similarity::from_eyes((30.0, 40.0), (70.0, 35.0), 112);
        let (ox, oy) = t.apply(12.5, 80.0);
        let (x, y) = t.invert(ox, oy);
        assert!((x - 12.5).abs() < 1e-3);
        assert!((y - 80.0).abs() < 1e-3);
    }

    #[test]
    fn uniform_image_stays_uniform_inside() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(200, 200, Rgb([90, 120, 200])));
        let face = align_face(&img, &eyes_at((80.0, 90.0), (120.0, 90.0)), 112);
        assert_eq!((face.width(), face.height()), (112, 112));
        assert_eq!(face.to_rgb8().get_pixel(56, 56).0, [90, 120, 200]);
    }

    #[test]
    fn bilinear_outside_is_none() {
        let img = RgbImage::new(4, 4);
        assert!(bilinear(&img, -0.5, 1.0).is_none());
        assert!(bilinear(&img, 1.0, 4.0).is_none());
    }
}
