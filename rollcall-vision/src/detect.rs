//! YuNet face detection.
//!
//! YuNet is anchor-free. For each stride (8, 16, 32) it emits four heads over
//! the stride's grid:
//! - cls: `[1, H*W, 1]` classification logits
//! - obj: `[1, H*W, 1]` objectness logits
//! - bbox: `[1, H*W, 4]` deltas `(dx, dy, dw, dh)` in stride units
//! - kps: `[1, H*W, 10]` landmark deltas, 5 points
//!
//! Output order is `cls_8, cls_16, cls_32, obj_8, ..., kps_32`.
//! A cell `(i, j)` decodes to centre `((j + dx) * stride, (i + dy) * stride)`
//! and size `(dw * stride, dh * stride)`, in input pixels.

use anyhow::{bail, Context, Result};
use image::{imageops, DynamicImage, RgbImage};
use ndarray::{Array2, Array4};
use ort::{session::Session, value::Value};

/// YuNet is exported with a fixed square input.
pub const INPUT_SIZE: u32 = 640;

const STRIDES: [usize; 3] = [8, 16, 32];

#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// x, y, w, h
    pub bbox: [f32; 4],
    pub score: f32,
    /// left eye, right eye, nose, left mouth corner, right mouth corner as x,y pairs
    pub landmarks: [f32; 10],
}

impl Detection {
    pub fn left_eye(&self) -> (f32, f32) {
        (self.landmarks[0], self.landmarks[1])
    }

    pub fn right_eye(&self) -> (f32, f32) {
        (self.landmarks[2], self.landmarks[3])
    }
}

pub struct FaceDetector {
    session: Session,
}

impl FaceDetector {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    /// Detect faces, returning boxes and landmarks in source image pixels.
    pub fn detect(
        &mut self,
        img: &DynamicImage,
        score_threshold: f32,
        nms_threshold: f32,
    ) -> Result<Vec<Detection>> {
        let (canvas, placement) = letterbox(img, INPUT_SIZE);
        let side = INPUT_SIZE as usize;
        let input = Array4::from_shape_vec((1, 3, side, side), bgr_planes(&canvas))?;
        let tensor = Value::from_array(input)?;

        let outputs = self.session.run(ort::inputs![tensor])?;
        let mut raw = Vec::with_capacity(12);
        for (_name, output) in outputs.iter() {
            let (shape, data) = output.try_extract_tensor::<f32>()?;
            raw.push((shape.iter().copied().collect::<Vec<i64>>(), data.to_vec()));
        }

        let heads = Heads::parse(&raw, side).context("parsing YuNet outputs")?;
        let mut detections: Vec<Detection> = heads
            .decode(score_threshold, side)?
            .into_iter()
            .map(|d| placement.to_source(&d))
            .collect();
        log::debug!(
            "{} candidate face(s) above score {:.2}",
            detections.len(),
            score_threshold
        );

        if nms_threshold < 1.0 {
            detections = nms(&detections, nms_threshold);
        }
        Ok(detections)
    }
}

/// Where the source image sits inside the square detector canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Letterbox {
    scale: f32,
    offset_x: f32,
    offset_y: f32,
    side: f32,
}

impl Letterbox {
    fn fit(width: u32, height: u32, side: u32) -> (Self, u32, u32) {
        let scale = side as f32 / width.max(height) as f32;
        let new_w = ((width as f32 * scale) as u32).clamp(1, side);
        let new_h = ((height as f32 * scale) as u32).clamp(1, side);
        let placement = Self {
            scale,
            offset_x: ((side - new_w) / 2) as f32,
            offset_y: ((side - new_h) / 2) as f32,
            side: side as f32,
        };
        (placement, new_w, new_h)
    }

    /// Map a detection normalized to the canvas back to source pixels.
    fn to_source(&self, d: &Detection) -> Detection {
        let point = |x: f32, y: f32| {
            (
                (x * self.side - self.offset_x) / self.scale,
                (y * self.side - self.offset_y) / self.scale,
            )
        };
        let (x, y) = point(d.bbox[0], d.bbox[1]);
        let mut landmarks = [0.0f32; 10];
        for k in 0..5 {
            let (lx, ly) = point(d.landmarks[k * 2], d.landmarks[k * 2 + 1]);
            landmarks[k * 2] = lx;
            landmarks[k * 2 + 1] = ly;
        }
        Detection {
            bbox: [
                x,
                y,
                d.bbox[2] * self.side / self.scale,
                d.bbox[3] * self.side / self.scale,
            ],
            score: d.score,
            landmarks,
        }
    }
}

/// Resize preserving aspect ratio and pad to a centered `side`×`side` canvas.
fn letterbox(img: &DynamicImage, side: u32) -> (RgbImage, Letterbox) {
    let (placement, new_w, new_h) = Letterbox::fit(img.width(), img.height(), side);
    let resized = imageops::resize(&img.to_rgb8(), new_w, new_h, imageops::FilterType::Triangle);
    let mut canvas = RgbImage::new(side, side);
    imageops::overlay(
        &mut canvas,
        &resized,
        placement.offset_x as i64,
        placement.offset_y as i64,
    );
    (canvas, placement)
}

/// Planar BGR in `[0, 255]`, the layout both YuNet and SFace expect.
pub(crate) fn bgr_planes(rgb: &RgbImage) -> Vec<f32> {
    let n = (rgb.width() * rgb.height()) as usize;
    let mut planes = vec![0.0f32; 3 * n];
    let (b, rest) = planes.split_at_mut(n);
    let (g, r) = rest.split_at_mut(n);
    for (i, px) in rgb.pixels().enumerate() {
        r[i] = px[0] as f32;
        g[i] = px[1] as f32;
        b[i] = px[2] as f32;
    }
    planes
}

/// Per-stride head outputs.
struct Heads {
    scores: Vec<Array2<f32>>,
    boxes: Vec<Array2<f32>>,
    landmarks: Vec<Array2<f32>>,
}

impl Heads {
    fn parse(outputs: &[(Vec<i64>, Vec<f32>)], input_size: usize) -> Result<Self> {
        let counts: Vec<usize> = STRIDES
            .iter()
            .map(|s| (input_size / s) * (input_size / s))
            .collect();

        let head = |index: usize, count: usize, width: usize, name: &str| -> Result<Array2<f32>> {
            let Some((shape, data)) = outputs.get(index) else {
                bail!("missing {name} output at index {index}");
            };
            if shape.as_slice() != [1, count as i64, width as i64] {
                bail!("unexpected {name} shape at index {index}: {shape:?}, expected [1, {count}, {width}]");
            }
            Ok(Array2::from_shape_vec((count, width), data.clone())?)
        };

        let mut heads = Self {
            scores: Vec::with_capacity(3),
            boxes: Vec::with_capacity(3),
            landmarks: Vec::with_capacity(3),
        };
        for (s, &count) in counts.iter().enumerate() {
            let cls = head(s, count, 1, "cls")?;
            let obj = head(s + 3, count, 1, "obj")?;
            let mut score = cls * obj;
            score.mapv_inplace(sigmoid);
            heads.scores.push(score);
            heads.boxes.push(head(s + 6, count, 4, "bbox")?);
            heads.landmarks.push(head(s + 9, count, 10, "kps")?);
        }
        Ok(heads)
    }

    /// Decode cells scoring at least `score_threshold`, normalized to `[0, 1]`.
    fn decode(&self, score_threshold: f32, input_size: usize) -> Result<Vec<Detection>> {
        let size = input_size as f32;
        let mut out = Vec::new();

        for (s, &stride) in STRIDES.iter().enumerate() {
            let (scores, boxes, kps) = (&self.scores[s], &self.boxes[s], &self.landmarks[s]);
            let grid = input_size / stride;
            if scores.nrows() != grid * grid {
                bail!(
                    "expected {} cells for stride {stride}, got {}",
                    grid * grid,
                    scores.nrows()
                );
            }
            let step = stride as f32;

            for i in 0..grid {
                for j in 0..grid {
                    let idx = i * grid + j;
                    let score = scores[[idx, 0]];
                    if score < score_threshold {
                        continue;
                    }

                    let cx = (j as f32 + boxes[[idx, 0]]) * step / size;
                    let cy = (i as f32 + boxes[[idx, 1]]) * step / size;
                    let w = boxes[[idx, 2]] * step / size;
                    let h = boxes[[idx, 3]] * step / size;

                    let mut landmarks = [0.0f32; 10];
                    for k in 0..5 {
                        landmarks[k * 2] = (j as f32 + kps[[idx, k * 2]]) * step / size;
                        landmarks[k * 2 + 1] = (i as f32 + kps[[idx, k * 2 + 1]]) * step / size;
                    }

                    out.push(Detection {
                        bbox: [cx - w / 2.0, cy - h / 2.0, w, h],
                        score,
                        landmarks,
                    });
                }
            }
        }
        Ok(out)
    }
}

pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Greedy non-maximum suppression, highest score first.
pub fn nms(detections: &[Detection], iou_threshold: f32) -> Vec<Detection> {
    let mut sorted = detections.to_vec();
    sorted.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut keep: Vec<Detection> = Vec::new();
    for candidate in sorted {
        if keep
            .iter()
            .all(|kept| iou(&kept.bbox, &candidate.bbox) <= iou_threshold)
        {
            keep.push(candidate);
        }
    }
    keep
}

fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = (a[0] + a[2]).min(b[0] + b[2]);
    let y2 = (a[1] + a[3]).min(b[1] + b[3]);
    if x2 <= x1 || y2 <= y1 {
        return 0.0;
    }
    let inter = (x2 - x1) * (y2 - y1);
    inter / (a[2] * a[3] + b[2] * b[3] - inter)
}
