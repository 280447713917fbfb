//! Shape features from the largest external contour of the binarized image:
//! seven Hu invariant moments plus aspect ratio, extent, and contour area.

use image::GrayImage;

use cbir_core::types::ShapeFeatures;

/// Binarization threshold: strictly greater is foreground.
const THRESHOLD: u8 = 127;
const AREA_EPS: f64 = 1e-12;

pub fn shape_features(gray: &GrayImage) -> ShapeFeatures {
    let (w, h) = (gray.width() as usize, gray.height() as usize);
    if w == 0 || h == 0 {
        return ShapeFeatures::zeroed();
    }

    let mask: Vec<bool> = gray.pixels().map(|p| p[0] > THRESHOLD).collect();
    let contours = external_contours(&mask, w, h);

    let Some(contour) = contours
        .iter()
        .max_by(|a, b| {
            contour_area(a)
                .partial_cmp(&contour_area(b))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
    else {
        return ShapeFeatures::zeroed();
    };

    let moments = polygon_moments(contour);
    let hu_moments = hu_invariants(&moments);

    let area = moments.m00.abs();
    let (min_x, max_x) = min_max(contour.iter().map(|p| p.0));
    let (min_y, max_y) = min_max(contour.iter().map(|p| p.1));
    let box_w = f64::from(max_x - min_x + 1);
    let box_h = f64::from(max_y - min_y + 1);
    let aspect_ratio = if box_h != 0.0 { box_w / box_h } else { 0.0 };
    let box_area = box_w * box_h;
    let extent = if box_area != 0.0 { area / box_area } else { 0.0 };

    ShapeFeatures { hu_moments, shape_descriptors: vec![aspect_ratio, extent, area] }
}

fn min_max(values: impl Iterator<Item = i32>) -> (i32, i32) {
    values.fold((i32::MAX, i32::MIN), |(lo, hi), v| (lo.min(v), hi.max(v)))
}

/// Shoelace area of the closed contour polygon.
fn contour_area(contour: &[(i32, i32)]) -> f64 {
    if contour.len() < 3 {
        return 0.0;
    }
    let mut twice_area = 0.0;
    let mut prev = contour[contour.len() - 1];
    for &p in contour {
        twice_area += f64::from(prev.0) * f64::from(p.1) - f64::from(p.0) * f64::from(prev.1);
        prev = p;
    }
    (twice_area * 0.5).abs()
}

/// Neighborhood in clockwise order (y grows downward): E, SE, S, SW, W, NW,
/// N, NE.
const DIRS: [(i32, i32); 8] =
    [(1, 0), (1, 1), (0, 1), (-1, 1), (-1, 0), (-1, -1), (0, -1), (1, -1)];

/// One boundary polygon per 8-connected foreground component, traced from
/// its topmost-leftmost pixel with Moore neighbor following.
fn external_contours(mask: &[bool], w: usize, h: usize) -> Vec<Vec<(i32, i32)>> {
    let mut visited = vec![false; w * h];
    let mut contours = Vec::new();

    for y in 0..h {
        for x in 0..w {
            let idx = y * w + x;
            if !mask[idx] || visited[idx] {
                continue;
            }
            // Row-major scan: (x, y) is the topmost-leftmost pixel of a new
            // component. Flood the component so it is not traced twice.
            flood_component(mask, &mut visited, w, h, x, y);
            contours.push(trace_boundary(mask, w, h, (x as i32, y as i32)));
        }
    }
    contours
}

fn flood_component(mask: &[bool], visited: &mut [bool], w: usize, h: usize, x: usize, y: usize) {
    let mut stack = vec![(x, y)];
    visited[y * w + x] = true;
    while let Some((cx, cy)) = stack.pop() {
        for (dx, dy) in DIRS {
            let nx = cx as i32 + dx;
            let ny = cy as i32 + dy;
            if nx < 0 || ny < 0 || nx >= w as i32 || ny >= h as i32 {
                continue;
            }
            let nidx = ny as usize * w + nx as usize;
            if mask[nidx] && !visited[nidx] {
                visited[nidx] = true;
                stack.push((nx as usize, ny as usize));
            }
        }
    }
}

/// Moore boundary following. The walk terminates when it reproduces its
/// first move (same pixel entered from the same side); a lone pixel yields
/// a single point.
fn trace_boundary(mask: &[bool], w: usize, h: usize, start: (i32, i32)) -> Vec<(i32, i32)> {
    let advance = |cur: (i32, i32), backtrack: usize| -> Option<((i32, i32), usize)> {
        for i in 1..=8 {
            let dir = (backtrack + i) % 8;
            let next = (cur.0 + DIRS[dir].0, cur.1 + DIRS[dir].1);
            if next.0 >= 0
                && next.1 >= 0
                && next.0 < w as i32
                && next.1 < h as i32
                && mask[next.1 as usize * w + next.0 as usize]
            {
                return Some((next, (dir + 4) % 8));
            }
        }
        None
    };

    // The row-major scan reached `start` from the west.
    let Some(first_move) = advance(start, 4) else {
        return vec![start];
    };
    let mut contour = vec![start, first_move.0];
    let (mut cur, mut backtrack) = first_move;

    let step_cap = 4 * w * h + 8;
    for _ in 0..step_cap {
        let Some(step) = advance(cur, backtrack) else {
            break;
        };
        if step == first_move {
            break;
        }
        contour.push(step.0);
        (cur, backtrack) = step;
    }
    contour
}

struct Moments {
    m00: f64,
    m10: f64,
    m01: f64,
    m20: f64,
    m11: f64,
    m02: f64,
    m30: f64,
    m21: f64,
    m12: f64,
    m03: f64,
}

/// Geometric moments of the closed contour polygon via Green's theorem.
fn polygon_moments(contour: &[(i32, i32)]) -> Moments {
    let mut a00 = 0.0;
    let mut a10 = 0.0;
    let mut a01 = 0.0;
    let mut a20 = 0.0;
    let mut a11 = 0.0;
    let mut a02 = 0.0;
    let mut a30 = 0.0;
    let mut a21 = 0.0;
    let mut a12 = 0.0;
    let mut a03 = 0.0;

    let mut prev = contour[contour.len() - 1];
    for &p in contour {
        let (xp, yp) = (f64::from(prev.0), f64::from(prev.1));
        let (xc, yc) = (f64::from(p.0), f64::from(p.1));
        let dxy = xp * yc - xc * yp;
        a00 += dxy;
        a10 += dxy * (xp + xc);
        a01 += dxy * (yp + yc);
        a20 += dxy * (xp * xp + xp * xc + xc * xc);
        a11 += dxy * (xp * (2.0 * yp + yc) + xc * (yp + 2.0 * yc));
        a02 += dxy * (yp * yp + yp * yc + yc * yc);
        a30 += dxy * (xp + xc) * (xp * xp + xc * xc);
        a21 += dxy
            * (xp * xp * (3.0 * yp + yc) + 2.0 * xp * xc * (yp + yc) + xc * xc * (yp + 3.0 * yc));
        a12 += dxy
            * (yp * yp * (3.0 * xp + xc) + 2.0 * yp * yc * (xp + xc) + yc * yc * (xp + 3.0 * xc));
        a03 += dxy * (yp + yc) * (yp * yp + yc * yc);
        prev = p;
    }

    // Orient so the area term is non-negative.
    let sign = if a00 < 0.0 { -1.0 } else { 1.0 };
    Moments {
        m00: sign * a00 / 2.0,
        m10: sign * a10 / 6.0,
        m01: sign * a01 / 6.0,
        m20: sign * a20 / 12.0,
        m11: sign * a11 / 24.0,
        m02: sign * a02 / 12.0,
        m30: sign * a30 / 20.0,
        m21: sign * a21 / 60.0,
        m12: sign * a12 / 60.0,
        m03: sign * a03 / 20.0,
    }
}

/// The seven Hu invariants from the normalized central moments. A contour
/// with no enclosed area has no defined invariants; those come back zeroed.
fn hu_invariants(m: &Moments) -> Vec<f64> {
    if m.m00.abs() < AREA_EPS {
        return vec![0.0; 7];
    }

    let cx = m.m10 / m.m00;
    let cy = m.m01 / m.m00;
    let mu20 = m.m20 - m.m10 * cx;
    let mu11 = m.m11 - m.m10 * cy;
    let mu02 = m.m02 - m.m01 * cy;
    let mu30 = m.m30 - cx * (3.0 * mu20 + cx * m.m10);
    let mu21 = m.m21 - cx * (2.0 * mu11 + cx * m.m01) - cy * mu20;
    let mu12 = m.m12 - cy * (2.0 * mu11 + cy * m.m10) - cx * mu02;
    let mu03 = m.m03 - cy * (3.0 * mu02 + cy * m.m01);

    let s2 = m.m00 * m.m00;
    let s3 = s2 * m.m00.abs().sqrt();
    let nu20 = mu20 / s2;
    let nu11 = mu11 / s2;
    let nu02 = mu02 / s2;
    let nu30 = mu30 / s3;
    let nu21 = mu21 / s3;
    let nu12 = mu12 / s3;
    let nu03 = mu03 / s3;

    let t0 = nu30 + nu12;
    let t1 = nu21 + nu03;
    let q0 = nu30 - 3.0 * nu12;
    let q1 = 3.0 * nu21 - nu03;

    vec![
        nu20 + nu02,
        (nu20 - nu02).powi(2) + 4.0 * nu11 * nu11,
        q0 * q0 + q1 * q1,
        t0 * t0 + t1 * t1,
        q0 * t0 * (t0 * t0 - 3.0 * t1 * t1) + q1 * t1 * (3.0 * t0 * t0 - t1 * t1),
        (nu20 - nu02) * (t0 * t0 - t1 * t1) + 4.0 * nu11 * t0 * t1,
        q1 * t0 * (t0 * t0 - 3.0 * t1 * t1) - q0 * t1 * (3.0 * t0 * t0 - t1 * t1),
    ]
}
