//! Browser color strings → ffmpeg color tokens.
//!
//! Color pickers report `rgba(r, g, b, a)` with r/g/b in [0, 255] and a in
//! [0, 1].  ffmpeg's `drawtext` wants `0xRRGGBBAA`.

use once_cell::sync::Lazy;
use regex::Regex;

static RGBA: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*rgba\(\s*([^,()]+),\s*([^,()]+),\s*([^,()]+),\s*([^,()]+)\)\s*$")
        .expect("valid regex")
});

/// Convert a color picker value into the form ffmpeg expects.
///
/// `rgba(...)` input is converted to `0xrrggbbaa` (lowercase).  Channels are
/// clamped and rounded half-up; alpha is scaled by 255 first.  Any other
/// input, including `rgba(` strings that do not parse, is returned unchanged
/// so that ffmpeg itself reports invalid tokens.
///
/// ```
/// use qa_video::format::to_ffmpeg_color;
///
/// assert_eq!(to_ffmpeg_color("rgba(255, 0, 0, 1)"), "0xff0000ff");
/// assert_eq!(to_ffmpeg_color("#000000"), "#000000");
/// ```
pub fn to_ffmpeg_color(input: &str) -> String {
    match parse_rgba(input) {
        Some([r, g, b, a]) => format!("0x{r:02x}{g:02x}{b:02x}{a:02x}"),
        None => input.to_string(),
    }
}

fn parse_rgba(input: &str) -> Option<[u8; 4]> {
    let caps = RGBA.captures(input)?;
    let mut values = [0.0f64; 4];
    for (slot, idx) in values.iter_mut().zip(1..=4) {
        let v: f64 = caps.get(idx)?.as_str().trim().parse().ok()?;
        if !v.is_finite() {
            return None;
        }
        *slot = v;
    }
    let [r, g, b, a] = values;
    Some([
        channel(r),
        channel(g),
        channel(b),
        channel(a.clamp(0.0, 1.0) * 255.0),
    ])
}

/// Clamp to [0, 255] and round half-up (all inputs are non-negative after
/// clamping, so `f64::round` is half-up here).
fn channel(v: f64) -> u8 {
    v.clamp(0.0, 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opaque_red() {
        assert_eq!(to_ffmpeg_color("rgba(255, 0, 0, 1)"), "0xff0000ff");
    }

    #[test]
    fn half_alpha_rounds_up() {
        assert_eq!(to_ffmpeg_color("rgba(0,128,255,0.5)"), "0x0080ff80");
    }

    #[test]
    fn fractional_channels_round_half_up() {
        assert_eq!(to_ffmpeg_color("rgba(0.5, 10.4, 254.6, 0)"), "0x010aff00");
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        assert_eq!(to_ffmpeg_color("rgba(300, -5, 12, 2)"), "0xff000cff");
    }

    #[test]
    fn hex_passes_through() {
        assert_eq!(to_ffmpeg_color("#000000"), "#000000");
        assert_eq!(to_ffmpeg_color("white"), "white");
        assert_eq!(to_ffmpeg_color("0x00ff00"), "0x00ff00");
    }

    #[test]
    fn malformed_rgba_passes_through() {
        for input in [
            "rgba(",
            "rgba(1, 2, 3)",
            "rgba(a, b, c, d)",
            "rgba(1, 2, 3, 4, 5)",
            "rgba(1, 2, 3, NaN)",
            "rgb(1, 2, 3)",
        ] {
            assert_eq!(to_ffmpeg_color(input), input);
        }
    }
}
