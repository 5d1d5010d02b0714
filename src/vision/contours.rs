//! Contour extraction and polygon simplification on binary images.

use image::GrayImage;

/// A closed boundary, in tracing order.
pub type Contour = Vec<(i32, i32)>;

// Moore neighbourhood, clockwise on screen starting east.
const DIRS: [(i32, i32); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];
const WEST: usize = 4;

struct Component {
    label: u32,
    start: (i32, i32),
    size: usize,
    touches_border: bool,
}

/// Traces every foreground outline and every enclosed hole.
///
/// Outer boundaries come first, in raster order of their topmost pixel,
/// followed by hole boundaries in the same order.
pub fn find_contours(binary: &GrayImage) -> Vec<Contour> {
    let (width, height) = binary.dimensions();
    let w = width as i32;
    let h = height as i32;
    let raw = binary.as_raw();

    let (fg_labels, fg_components) = label_components(w, h, |i| raw[i] > 0, true);
    let (bg_labels, bg_components) = label_components(w, h, |i| raw[i] == 0, false);

    let mut contours = Vec::new();

    for component in &fg_components {
        let inside = |x: i32, y: i32| {
            x >= 0 && y >= 0 && x < w && y < h && fg_labels[(y * w + x) as usize] == component.label
        };
        contours.push(trace_boundary(inside, component.start, component.size));
    }

    for component in bg_components.iter().filter(|c| !c.touches_border) {
        let inside = |x: i32, y: i32| {
            x >= 0 && y >= 0 && x < w && y < h && bg_labels[(y * w + x) as usize] == component.label
        };
        contours.push(trace_boundary(inside, component.start, component.size));
    }

    contours
}

fn label_components<F>(w: i32, h: i32, member: F, eight: bool) -> (Vec<u32>, Vec<Component>)
where
    F: Fn(usize) -> bool,
{
    let mut labels = vec![0u32; (w * h).max(0) as usize];
    let mut components = Vec::new();
    let mut stack = Vec::new();
    let reach: &[(i32, i32)] = if eight {
        &DIRS
    } else {
        &[(1, 0), (0, 1), (-1, 0), (0, -1)]
    };

    for y in 0..h {
        for x in 0..w {
            let idx = (y * w + x) as usize;
            if labels[idx] != 0 || !member(idx) {
                continue;
            }

            let label = components.len() as u32 + 1;
            let mut component = Component {
                label,
                start: (x, y),
                size: 0,
                touches_border: false,
            };
            labels[idx] = label;
            stack.push((x, y));

            while let Some((cx, cy)) = stack.pop() {
                component.size += 1;
                if cx == 0 || cy == 0 || cx == w - 1 || cy == h - 1 {
                    component.touches_border = true;
                }
                for (dx, dy) in reach {
                    let nx = cx + dx;
                    let ny = cy + dy;
                    if nx < 0 || ny < 0 || nx >= w || ny >= h {
                        continue;
                    }
                    let nidx = (ny * w + nx) as usize;
                    if labels[nidx] == 0 && member(nidx) {
                        labels[nidx] = label;
                        stack.push((nx, ny));
                    }
                }
            }

            components.push(component);
        }
    }

    (labels, components)
}

fn direction_of(dx: i32, dy: i32) -> usize {
    DIRS.iter()
        .position(|d| *d == (dx, dy))
        .unwrap_or(WEST)
}

/// One Moore step: from `current`, with the last outside pixel in direction
/// `back`, sweep clockwise to the next region pixel.
fn next_boundary<F>(inside: &F, current: (i32, i32), back: usize) -> Option<((i32, i32), usize)>
where
    F: Fn(i32, i32) -> bool,
{
    for i in 1..=8 {
        let d = (back + i) % 8;
        let next = (current.0 + DIRS[d].0, current.1 + DIRS[d].1);
        if inside(next.0, next.1) {
            let prev = DIRS[(d + 7) % 8];
            let back_from_next = direction_of(prev.0 - DIRS[d].0, prev.1 - DIRS[d].1);
            return Some((next, back_from_next));
        }
    }
    None
}

/// Moore-neighbour tracing with Jacob's stopping criterion. `start` must be
/// the region's first pixel in raster order.
fn trace_boundary<F>(inside: F, start: (i32, i32), region_size: usize) -> Contour
where
    F: Fn(i32, i32) -> bool,
{
    let mut contour = vec![start];
    let Some(first) = next_boundary(&inside, start, WEST) else {
        return contour;
    };

    let mut current = first;
    let max_steps = 4 * region_size + 8;
    for _ in 0..max_steps {
        if current.0 == start {
            match next_boundary(&inside, start, current.1) {
                Some(next) if next.0 == first.0 => break,
                Some(next) => {
                    contour.push(start);
                    current = next;
                    continue;
                }
                None => break,
            }
        }
        contour.push(current.0);
        match next_boundary(&inside, current.0, current.1) {
            Some(next) => current = next,
            None => break,
        }
    }

    contour
}

/// Perimeter of a polyline, closing it back to the start when `closed`.
pub fn arc_length(points: &[(i32, i32)], closed: bool) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    let mut total: f64 = points.windows(2).map(|w| dist(w[0], w[1])).sum();
    if closed {
        total += dist(points[points.len() - 1], points[0]);
    }
    total
}

fn dist(a: (i32, i32), b: (i32, i32)) -> f64 {
    let dx = (a.0 - b.0) as f64;
    let dy = (a.1 - b.1) as f64;
    (dx * dx + dy * dy).sqrt()
}

fn distance_to_segment(p: (i32, i32), a: (i32, i32), b: (i32, i32)) -> f64 {
    let (ax, ay) = (a.0 as f64, a.1 as f64);
    let (bx, by) = (b.0 as f64, b.1 as f64);
    let (px, py) = (p.0 as f64, p.1 as f64);
    let len = ((bx - ax).powi(2) + (by - ay).powi(2)).sqrt();
    if len == 0.0 {
        return dist(p, a);
    }
    ((bx - ax) * (ay - py) - (ax - px) * (by - ay)).abs() / len
}

fn simplify_chain(chain: &[(i32, i32)], epsilon: f64, out: &mut Vec<(i32, i32)>) {
    let n = chain.len();
    if n < 3 {
        out.extend_from_slice(&chain[..n.saturating_sub(1)]);
        return;
    }

    let (first, last) = (chain[0], chain[n - 1]);
    let mut max_dist = 0.0;
    let mut split = 0;
    for (i, p) in chain.iter().enumerate().take(n - 1).skip(1) {
        let d = distance_to_segment(*p, first, last);
        if d > max_dist {
            max_dist = d;
            split = i;
        }
    }

    if max_dist > epsilon {
        simplify_chain(&chain[..=split], epsilon, out);
        simplify_chain(&chain[split..], epsilon, out);
    } else {
        out.push(first);
    }
}

/// Douglas-Peucker simplification.
///
/// Closed curves are split at two mutually distant points first, so the
/// result never keeps an arbitrary starting pixel as a vertex.
pub fn approx_poly_dp(points: &[(i32, i32)], epsilon: f64, closed: bool) -> Vec<(i32, i32)> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }

    let mut out = Vec::new();
    if !closed {
        simplify_chain(points, epsilon, &mut out);
        out.push(points[n - 1]);
        return out;
    }

    let farthest_from = |origin: (i32, i32)| {
        let mut best = 0;
        for (i, p) in points.iter().enumerate() {
            if dist(*p, origin) > dist(points[best], origin) {
                best = i;
            }
        }
        best
    };
    let a = farthest_from(points[0]);
    let b = farthest_from(points[a]);
    let (lo, hi) = (a.min(b), a.max(b));
    if lo == hi {
        return vec![points[lo]];
    }

    let forward: Vec<(i32, i32)> = points[lo..=hi].to_vec();
    let mut backward: Vec<(i32, i32)> = points[hi..].to_vec();
    backward.extend_from_slice(&points[..=lo]);

    simplify_chain(&forward, epsilon, &mut out);
    simplify_chain(&backward, epsilon, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn square(size: u32, from: u32, to: u32) -> GrayImage {
        GrayImage::from_fn(size, size, |x, y| {
            let on = (from..=to).contains(&x) && (from..=to).contains(&y);
            Luma([if on { 255 } else { 0 }])
        })
    }

    #[test]
    fn test_single_pixel_contour() {
        let mut img = GrayImage::new(5, 5);
        img.put_pixel(2, 2, Luma([255]));
        assert_eq!(find_contours(&img), vec![vec![(2, 2)]]);
    }

    #[test]
    fn test_square_boundary_is_traced_once() {
        let img = square(12, 2, 6);
        let contours = find_contours(&img);

        assert_eq!(contours.len(), 1);
        let contour = &contours[0];
        assert_eq!(contour.len(), 16, "a 5x5 square has 16 border pixels");
        assert_eq!(contour[0], (2, 2));
        assert_eq!(contour[1], (3, 2), "tracing runs clockwise on screen");
        assert!(contour.contains(&(6, 6)));
        assert!(!contour.contains(&(4, 4)));
    }

    #[test]
    fn test_ring_yields_outer_and_hole() {
        let mut img = square(20, 3, 15);
        for y in 6..=12 {
            for x in 6..=12 {
                img.put_pixel(x, y, Luma([0]));
            }
        }

        let contours = find_contours(&img);

        assert_eq!(contours.len(), 2);
        assert_eq!(contours[0][0], (3, 3));
        assert_eq!(contours[1][0], (6, 6));
    }

    #[test]
    fn test_background_touching_border_is_not_a_hole() {
        let mut img = square(10, 0, 9);
        img.put_pixel(0, 5, Luma([0]));
        assert_eq!(find_contours(&img).len(), 1);
    }

    #[test]
    fn test_arc_length() {
        let pts = [(0, 0), (3, 0), (3, 4)];
        assert_eq!(arc_length(&pts, false), 7.0);
        assert_eq!(arc_length(&pts, true), 12.0);
    }

    #[test]
    fn test_approx_square_boundary_to_corners() {
        let img = square(30, 5, 24);
        let contour = &find_contours(&img)[0];
        let epsilon = 0.02 * arc_length(contour, true);

        let mut poly = approx_poly_dp(contour, epsilon, true);
        poly.sort();

        assert_eq!(poly, vec![(5, 5), (5, 24), (24, 5), (24, 24)]);
    }

    #[test]
    fn test_approx_open_line_drops_midpoints() {
        let pts: Vec<(i32, i32)> = (0..10).map(|i| (i, 0)).collect();
        assert_eq!(approx_poly_dp(&pts, 1.0, false), vec![(0, 0), (9, 0)]);
    }
}
