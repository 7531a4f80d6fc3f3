use std::ops::{Add, Mul, Sub};

use crate::error::{ParseError, PdfResult};

/// A closed range `[min, max]`.
///
/// `Domain` and `Range` intervals are always ordered, but `Encode` and `Decode` pairs are
/// allowed to run backwards in order to flip a mapping, so `min <= max` is only checked
/// by [`Interval::ordered_pairs`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub min: f32,
    pub max: f32,
}

impl Interval {
    pub const UNIT: Self = Self::new(0.0, 1.0);

    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub const fn point(value: f32) -> Self {
        Self::new(value, value)
    }

    /// Builds intervals from a flat `[min0 max0 min1 max1 ...]` array
    pub fn pairs(values: &[f32], key: &'static str) -> PdfResult<Vec<Self>> {
        if values.len() % 2 != 0 {
            anyhow::bail!(ParseError::InvalidFunction(format!(
                "/{} must have an even number of entries, found {}",
                key,
                values.len()
            )));
        }

        Ok(values
            .chunks_exact(2)
            .map(|pair| Self::new(pair[0], pair[1]))
            .collect())
    }

    /// Like [`Interval::pairs`], but additionally requires `min <= max` for every pair
    pub fn ordered_pairs(values: &[f32], key: &'static str) -> PdfResult<Vec<Self>> {
        let intervals = Self::pairs(values, key)?;

        if let Some(bad) = intervals.iter().find(|i| !(i.min <= i.max)) {
            anyhow::bail!(ParseError::InvalidFunction(format!(
                "/{} contains the inverted interval [{} {}]",
                key, bad.min, bad.max
            )));
        }

        Ok(intervals)
    }

    pub fn is_degenerate(self) -> bool {
        self.min == self.max
    }

    /// NaN is passed through unchanged, matching what a pair of `<`/`>` comparisons does
    pub fn clamp(self, value: f32) -> f32 {
        if value < self.min {
            self.min
        } else if value > self.max {
            self.max
        } else {
            value
        }
    }

    /// Linearly maps `x` from `from` onto `to`.
    ///
    /// A degenerate `from` divides by zero and yields NaN or infinity; callers that can
    /// see one must guard against it themselves.
    pub fn interpolate(x: f32, from: Self, to: Self) -> f32 {
        to.min + (x - from.min) * (to.max - to.min) / (from.max - from.min)
    }

    /// The interval of `min(x, bound)` for every `x` in `self`
    pub fn min_with(self, bound: f32) -> Self {
        Self::new(self.min.min(bound), self.max.min(bound))
    }
}

impl Add for Interval {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.min + rhs.min, self.max + rhs.max)
    }
}

impl Sub for Interval {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.min - rhs.max, self.max - rhs.min)
    }
}

impl Mul for Interval {
    type Output = Self;

    /// Either operand may straddle zero, so every corner has to be considered
    fn mul(self, rhs: Self) -> Self {
        let corners = [
            self.min * rhs.min,
            self.min * rhs.max,
            self.max * rhs.min,
            self.max * rhs.max,
        ];

        Self::new(
            corners.iter().copied().fold(f32::INFINITY, f32::min),
            corners.iter().copied().fold(f32::NEG_INFINITY, f32::max),
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn arithmetic() {
        let a = Interval::new(-1.0, 2.0);
        let b = Interval::new(3.0, 4.0);

        assert_eq!(a + b, Interval::new(2.0, 6.0));
        assert_eq!(a - b, Interval::new(-5.0, -1.0));
        assert_eq!(a * b, Interval::new(-4.0, 8.0));
        assert_eq!(
            Interval::new(-2.0, -1.0) * Interval::new(-3.0, 1.0),
            Interval::new(-2.0, 6.0)
        );
    }

    #[test]
    fn clamp() {
        let unit = Interval::UNIT;

        assert_eq!(unit.clamp(-0.5), 0.0);
        assert_eq!(unit.clamp(1.5), 1.0);
        assert_eq!(unit.clamp(0.25), 0.25);
        assert!(unit.clamp(f32::NAN).is_nan());
    }

    #[test]
    fn interpolate_maps_endpoints() {
        let from = Interval::new(0.0, 10.0);
        let to = Interval::new(1.0, 0.0);

        assert_eq!(Interval::interpolate(0.0, from, to), 1.0);
        assert_eq!(Interval::interpolate(10.0, from, to), 0.0);
        assert_eq!(Interval::interpolate(5.0, from, to), 0.5);
        assert!(!Interval::interpolate(1.0, Interval::point(1.0), to).is_finite());
    }

    #[test]
    fn pairs_validation() {
        assert!(Interval::pairs(&[0.0, 1.0, 2.0], "Domain").is_err());
        assert!(Interval::ordered_pairs(&[1.0, 0.0], "Domain").is_err());
        assert_eq!(
            Interval::pairs(&[1.0, 0.0], "Decode").unwrap(),
            vec![Interval::new(1.0, 0.0)]
        );
    }
}
