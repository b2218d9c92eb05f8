//! Diverging colormap and value normalization.

use crate::error::{RenderError, Result};

/// Moreland's coolwarm table, 33 evenly spaced entries.
const COOLWARM: [[u8; 3]; 33] = [
    [59, 76, 192],
    [68, 90, 204],
    [77, 104, 215],
    [87, 117, 225],
    [98, 130, 234],
    [108, 142, 241],
    [119, 154, 247],
    [130, 165, 251],
    [141, 176, 254],
    [152, 185, 255],
    [163, 194, 255],
    [174, 201, 253],
    [184, 208, 249],
    [194, 213, 244],
    [204, 217, 238],
    [213, 219, 230],
    [221, 221, 221],
    [229, 216, 209],
    [236, 211, 197],
    [241, 204, 185],
    [245, 196, 173],
    [247, 187, 160],
    [247, 177, 148],
    [247, 166, 135],
    [244, 154, 123],
    [241, 141, 111],
    [236, 127, 99],
    [229, 112, 88],
    [222, 96, 77],
    [213, 80, 66],
    [203, 62, 56],
    [192, 40, 47],
    [180, 4, 38],
];

/// Linear map of `[center - half_range, center + half_range]` onto `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CenteredNorm {
    /// Value mapped to 0.5.
    pub center: f64,
    /// Distance from the center to either end of the range.
    pub half_range: f64,
}

impl CenteredNorm {
    /// Create a norm. `half_range` must be positive.
    pub fn new(center: f64, half_range: f64) -> Result<Self> {
        if !(half_range > 0.0) || !center.is_finite() {
            return Err(RenderError::invalid_param(
                "half_range",
                half_range,
                "must be positive",
            ));
        }
        Ok(Self { center, half_range })
    }

    /// Normalize a value, clamped to `[0, 1]`. NaN maps to the center.
    #[inline]
    pub fn apply(&self, x: f64) -> f64 {
        let t = (x - (self.center - self.half_range)) / (2.0 * self.half_range);
        if t.is_nan() {
            0.5
        } else {
            t.clamp(0.0, 1.0)
        }
    }
}

/// Prepare an energy field for coloring and return its norm.
///
/// Energies are replaced by their absolute value. For `scale > 0` the norm
/// is centered at `0.5 * scale` with half-range `0.6 * scale`; otherwise the
/// energies are zeroed and the norm is `(0, 1)`.
pub fn energy_norm(scale: f64, energies: &mut [f64]) -> CenteredNorm {
    if scale > 0.0 {
        for e in energies.iter_mut() {
            *e = e.abs();
        }
        CenteredNorm {
            center: 0.5 * scale,
            half_range: 0.6 * scale,
        }
    } else {
        energies.fill(0.0);
        CenteredNorm {
            center: 0.0,
            half_range: 1.0,
        }
    }
}

/// Available colormaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Colormap {
    /// Blue to grey to red.
    #[default]
    CoolWarm,
}

impl Colormap {
    /// RGB color in `[0, 1]` for `t` in `[0, 1]`.
    pub fn rgb(&self, t: f64) -> [f64; 3] {
        let table = match self {
            Colormap::CoolWarm => &COOLWARM,
        };
        let t = if t.is_nan() { 0.5 } else { t.clamp(0.0, 1.0) };
        let x = t * (table.len() - 1) as f64;
        let i = (x.floor() as usize).min(table.len() - 2);
        let s = x - i as f64;

        let (lo, hi) = (table[i], table[i + 1]);
        [0, 1, 2].map(|c| ((1.0 - s) * lo[c] as f64 + s * hi[c] as f64) / 255.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_norm_positive_scale() {
        let mut e = vec![-0.5, 0.25, 2.0];
        let norm = energy_norm(1.0, &mut e);
        assert_eq!(e, vec![0.5, 0.25, 2.0]);
        assert!((norm.center - 0.5).abs() < 1e-12);
        assert!((norm.half_range - 0.6).abs() < 1e-12);
        assert!((norm.apply(0.5) - 0.5).abs() < 1e-12);
        assert_eq!(norm.apply(2.0), 1.0);
    }

    #[test]
    fn test_norm_non_positive_scale_zeroes() {
        for scale in [0.0, -2.0] {
            let mut e = vec![-0.5, 3.0];
            let norm = energy_norm(scale, &mut e);
            assert_eq!(e, vec![0.0, 0.0]);
            assert_eq!(norm, CenteredNorm { center: 0.0, half_range: 1.0 });
            assert_eq!(norm.apply(0.0), 0.5);
        }
    }

    #[test]
    fn test_norm_validation() {
        assert!(CenteredNorm::new(0.0, 0.0).is_err());
        assert!(CenteredNorm::new(0.0, f64::NAN).is_err());
        assert!(CenteredNorm::new(1.0, 2.0).is_ok());
    }

    #[test]
    fn test_coolwarm_endpoints() {
        let cmap = Colormap::CoolWarm;
        let low = cmap.rgb(0.0);
        let mid = cmap.rgb(0.5);
        let high = cmap.rgb(1.0);
        assert!((low[0] - 59.0 / 255.0).abs() < 1e-12);
        assert!((low[2] - 192.0 / 255.0).abs() < 1e-12);
        assert!(mid.iter().all(|&c| (c - 221.0 / 255.0).abs() < 1e-12));
        assert!((high[0] - 180.0 / 255.0).abs() < 1e-12);
        assert_eq!(cmap.rgb(-1.0), low);
        assert_eq!(cmap.rgb(7.0), high);
    }
}
