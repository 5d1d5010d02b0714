//! Indicator colours and the "odd one out" selection that finds the active slot.

use image::Rgba;

/// An RGB colour with channels in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayColor {
    pub red: f32,
    pub green: f32,
    pub blue: f32,
}

impl DisplayColor {
    pub fn new(red: f32, green: f32, blue: f32) -> Self {
        Self { red, green, blue }
    }

    pub fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0)
    }

    /// Packs `0xRRGGBB`.
    #[cfg(test)]
    pub fn from_hex(rgb: u32) -> Self {
        Self::from_rgb8((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8)
    }

    pub fn to_rgba8(self) -> Rgba<u8> {
        let channel = |v: f32| (v * 255.0).round().clamp(0.0, 255.0) as u8;
        Rgba([channel(self.red), channel(self.green), channel(self.blue), 255])
    }

    /// Euclidean distance in RGB space.
    pub fn distance(&self, other: &DisplayColor) -> f32 {
        let dr = self.red - other.red;
        let dg = self.green - other.green;
        let db = self.blue - other.blue;
        (dr * dr + dg * dg + db * db).sqrt()
    }
}

/// Converts a mean HSV reading (hue 0-179, saturation and value 0-255) to RGB.
pub fn hue_to_color(h: i32, s: i32, v: i32) -> DisplayColor {
    let hue = h as f32 * 2.0;
    let sat = (s as f32 / 255.0).clamp(0.0, 1.0);
    let val = (v as f32 / 255.0).clamp(0.0, 1.0);

    let to_byte = |x: f32| (x * 255.0).round().clamp(0.0, 255.0) as u8;

    if sat <= 0.0 {
        let gray = to_byte(val);
        return DisplayColor::from_rgb8(gray, gray, gray);
    }

    let hx = if (0.0..360.0).contains(&hue) { hue / 60.0 } else { 0.0 };
    let sector = hx.floor();
    let f = hx - sector;

    let p = val * (1.0 - sat);
    let q = val * (1.0 - sat * f);
    let t = val * (1.0 - sat * (1.0 - f));

    let (r, g, b) = match sector as i32 {
        0 => (val, t, p),
        1 => (q, val, p),
        2 => (p, val, t),
        3 => (p, q, val),
        4 => (t, p, val),
        _ => (val, p, q),
    };

    DisplayColor::from_rgb8(to_byte(r), to_byte(g), to_byte(b))
}

/// Index of the colour that stands out from the rest, if one clearly does.
///
/// Each colour is scored by its mean distance to all the others. The best
/// score wins only when it exceeds both 0.1 and 1.5 times the runner-up.
/// Fewer than three colours never produce a winner.
pub fn find_most_distinct_color_index(colors: &[DisplayColor]) -> Option<usize> {
    let n = colors.len();
    if n < 3 {
        return None;
    }

    let means: Vec<f32> = colors
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let total: f32 = colors
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, other)| c.distance(other))
                .sum();
            total / (n - 1) as f32
        })
        .collect();

    let mut best = 0;
    for (i, mean) in means.iter().enumerate() {
        if *mean > means[best] {
            best = i;
        }
    }

    let second = means
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != best)
        .map(|(_, m)| *m)
        .fold(f32::MIN, f32::max);

    if means[best] > 0.1_f32.max(second * 1.5) {
        Some(best)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distinct_color_dark_slots_one_lit() {
        let colors = [
            DisplayColor::from_hex(0x262624),
            DisplayColor::from_hex(0x262624),
            DisplayColor::from_hex(0x262624),
            DisplayColor::from_hex(0x1b3c4c),
        ];
        assert_eq!(find_most_distinct_color_index(&colors), Some(3));
    }

    #[test]
    fn test_distinct_color_outlier_in_middle() {
        let colors = [
            DisplayColor::from_hex(0x303030),
            DisplayColor::from_hex(0x313131),
            DisplayColor::from_hex(0x40a0e0),
            DisplayColor::from_hex(0x2f2f2f),
            DisplayColor::from_hex(0x303131),
        ];
        assert_eq!(find_most_distinct_color_index(&colors), Some(2));
    }

    #[test]
    fn test_distinct_color_none_when_uniform() {
        let colors = [
            DisplayColor::from_hex(0x303030),
            DisplayColor::from_hex(0x313131),
            DisplayColor::from_hex(0x2f2f2f),
            DisplayColor::from_hex(0x303131),
        ];
        assert_eq!(find_most_distinct_color_index(&colors), None);
    }

    #[test]
    fn test_distinct_color_needs_three() {
        let colors = [
            DisplayColor::from_hex(0x000000),
            DisplayColor::from_hex(0xffffff),
        ];
        assert_eq!(find_most_distinct_color_index(&colors), None);
        assert_eq!(find_most_distinct_color_index(&[]), None);
    }

    #[test]
    fn test_distinct_color_two_groups_is_ambiguous() {
        let colors = [
            DisplayColor::from_hex(0x000000),
            DisplayColor::from_hex(0x000000),
            DisplayColor::from_hex(0xffffff),
            DisplayColor::from_hex(0xffffff),
        ];
        assert_eq!(find_most_distinct_color_index(&colors), None);
    }

    #[test]
    fn test_hue_to_color() {
        assert_eq!(hue_to_color(0, 255, 255), DisplayColor::from_rgb8(255, 0, 0));
        assert_eq!(hue_to_color(60, 255, 255), DisplayColor::from_rgb8(0, 255, 0));
        assert_eq!(hue_to_color(120, 255, 255), DisplayColor::from_rgb8(0, 0, 255));
        assert_eq!(hue_to_color(30, 0, 128), DisplayColor::from_rgb8(128, 128, 128));
    }

    #[test]
    fn test_rgba_round_trip() {
        let c = DisplayColor::from_rgb8(12, 200, 99);
        assert_eq!(c.to_rgba8(), Rgba([12, 200, 99, 255]));
    }
}
