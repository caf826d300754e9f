//! Line segment extraction
//!
//! `imageproc` only provides the standard Hough transform, which returns
//! infinite polar lines. Segments are recovered by walking each detected
//! line across the edge map, bridging gaps up to `max_gap` and keeping runs
//! at least `min_length` long. Edge pixels claimed by an accepted segment,
//! plus one pixel either side of them, are not reused, so near-duplicate
//! accumulator peaks and two-pixel-thick Canny edges yield one segment.

use image::GrayImage;
use imageproc::hough::{detect_lines, LineDetectionOptions, PolarLine};
use tracing::trace;

use crate::geometry::LineSegment;

/// Accumulator non-maximum suppression radius. Kept below the width of a
/// painted line so both of its edges survive.
const SUPPRESSION_RADIUS: u32 = 2;

/// Probabilistic-style segment detector over a binary edge image
#[derive(Debug, Clone, Copy)]
pub struct SegmentDetector {
    pub vote_threshold: u32,
    pub min_length: u32,
    pub max_gap: u32,
}

impl SegmentDetector {
    pub fn new(vote_threshold: u32, min_length: u32, max_gap: u32) -> Self {
        Self {
            vote_threshold,
            min_length,
            max_gap,
        }
    }

    /// Detect segments on `edges` (non-zero pixels are edges)
    pub fn detect(&self, edges: &GrayImage) -> Vec<LineSegment> {
        let lines = detect_lines(
            edges,
            LineDetectionOptions {
                vote_threshold: self.vote_threshold,
                suppression_radius: SUPPRESSION_RADIUS,
            },
        );

        let mut claimed = ClaimMap::new(edges.width(), edges.height());
        let mut segments = Vec::new();
        for line in &lines {
            self.walk(edges, line, &mut claimed, &mut segments);
        }
        trace!("{} polar lines -> {} segments", lines.len(), segments.len());
        segments
    }

    fn walk(
        &self,
        edges: &GrayImage,
        line: &PolarLine,
        claimed: &mut ClaimMap,
        out: &mut Vec<LineSegment>,
    ) {
        let (width, height) = edges.dimensions();
        let theta = (line.angle_in_degrees as f32).to_radians();
        let (cos, sin) = (theta.cos(), theta.sin());
        // The accumulator truncates r toward zero, the one pixel tolerance
        // below absorbs it.
        let r = line.r;

        // Step along the major axis of the line, tolerate one pixel of jitter
        // across it.
        let steep = cos.abs() >= sin.abs();
        let steps = if steep { height } else { width };

        let mut run = Run::new(steep);
        for step in 0..steps {
            let t = step as f32;
            let hit = if steep {
                let x = ((r - t * sin) / cos).round() as i64;
                [x, x - 1, x + 1]
                    .into_iter()
                    .map(|x| (x, step as i64))
                    .find(|&(x, y)| is_free_edge(edges, claimed, x, y))
            } else {
                let y = ((r - t * cos) / sin).round() as i64;
                [y, y - 1, y + 1]
                    .into_iter()
                    .map(|y| (step as i64, y))
                    .find(|&(x, y)| is_free_edge(edges, claimed, x, y))
            };

            match hit {
                Some((x, y)) => run.extend(x as u32, y as u32),
                None if run.is_open() => {
                    run.gap += 1;
                    if run.gap > self.max_gap {
                        self.close(&mut run, claimed, out);
                    }
                }
                None => {}
            }
        }
        self.close(&mut run, claimed, out);
    }

    fn close(&self, run: &mut Run, claimed: &mut ClaimMap, out: &mut Vec<LineSegment>) {
        let steep = run.steep;
        let finished = std::mem::replace(run, Run::new(steep));
        let (Some(start), Some(end)) = (finished.pixels.first(), finished.pixels.last()) else {
            return;
        };
        let dx = end.0 as f32 - start.0 as f32;
        let dy = end.1 as f32 - start.1 as f32;
        if (dx * dx + dy * dy).sqrt() < self.min_length as f32 {
            return;
        }
        for &(x, y) in &finished.pixels {
            if finished.steep {
                claimed.claim_span(x.saturating_sub(1)..=x + 1, y..=y);
            } else {
                claimed.claim_span(x..=x, y.saturating_sub(1)..=y + 1);
            }
        }
        out.push(LineSegment::new(
            start.0 as i32,
            start.1 as i32,
            end.0 as i32,
            end.1 as i32,
        ));
    }
}

fn is_free_edge(edges: &GrayImage, claimed: &ClaimMap, x: i64, y: i64) -> bool {
    if x < 0 || y < 0 || x >= i64::from(edges.width()) || y >= i64::from(edges.height()) {
        return false;
    }
    let (x, y) = (x as u32, y as u32);
    edges.get_pixel(x, y).0[0] > 0 && !claimed.is_claimed(x, y)
}

/// Edge pixels already used by an accepted segment
struct ClaimMap {
    width: u32,
    height: u32,
    bits: Vec<bool>,
}

impl ClaimMap {
    fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            bits: vec![false; (width as usize) * (height as usize)],
        }
    }

    fn claim_span(
        &mut self,
        xs: std::ops::RangeInclusive<u32>,
        ys: std::ops::RangeInclusive<u32>,
    ) {
        for y in ys.filter(|&y| y < self.height) {
            for x in xs.clone().filter(|&x| x < self.width) {
                self.bits[(y * self.width + x) as usize] = true;
            }
        }
    }

    fn is_claimed(&self, x: u32, y: u32) -> bool {
        self.bits[(y * self.width + x) as usize]
    }
}

/// Edge pixels collected along one line since the last long gap
struct Run {
    steep: bool,
    pixels: Vec<(u32, u32)>,
    gap: u32,
}

impl Run {
    fn new(steep: bool) -> Self {
        Self {
            steep,
            pixels: Vec::new(),
            gap: 0,
        }
    }

    fn is_open(&self) -> bool {
        !self.pixels.is_empty()
    }

    fn extend(&mut self, x: u32, y: u32) {
        self.pixels.push((x, y));
        self.gap = 0;
    }
}
