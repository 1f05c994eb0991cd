use fixed::types::I32F32;
use std::fmt;

/// A CSS pixel length stored as fixed point.
///
/// Values are rounded to whole milli-pixels on construction so that height
/// comparisons made during a placement pass do not depend on float drift.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Px(I32F32);

impl Px {
    pub const ZERO: Px = Px(I32F32::from_bits(0));

    pub fn from_f32(value: f32) -> Px {
        if !value.is_finite() {
            return Px::ZERO;
        }
        let milli = (value as f64 * 1000.0).round();
        let milli = milli.clamp(i64::MIN as f64, i64::MAX as f64) as i64;
        Px::from_milli_i64(milli)
    }

    pub fn from_i32(value: i32) -> Px {
        Px::from_milli_i64((value as i64) * 1000)
    }

    /// CSS points are 4/3 of a pixel.
    pub fn from_pt(value: f32) -> Px {
        Px::from_f32(value * 4.0 / 3.0)
    }

    pub fn to_f32(self) -> f32 {
        self.0.to_num()
    }

    pub fn to_milli_i64(self) -> i64 {
        let bits = self.0.to_bits() as i128;
        let denom = 1i128 << 32;
        let scaled = bits * 1000;
        let adj = if scaled >= 0 { denom / 2 } else { -denom / 2 };
        let milli = (scaled + adj) / denom;
        milli.clamp(i64::MIN as i128, i64::MAX as i128) as i64
    }

    pub fn from_milli_i64(milli: i64) -> Px {
        let denom = 1i128 << 32;
        let milli = milli as i128;
        let adj = if milli >= 0 { 500 } else { -500 };
        let bits = (milli * denom + adj) / 1000;
        let bits = bits.clamp(i64::MIN as i128, i64::MAX as i128) as i64;
        Px(I32F32::from_bits(bits))
    }

    pub fn max(self, other: Px) -> Px {
        if self >= other { self } else { other }
    }

    pub fn min(self, other: Px) -> Px {
        if self <= other { self } else { other }
    }

    pub fn is_negative(self) -> bool {
        self.to_milli_i64() < 0
    }

    pub fn is_zero(self) -> bool {
        self.to_milli_i64() == 0
    }

    /// Scale by `num / denom`, rounding half away from zero in milli-pixels.
    pub fn mul_ratio(self, num: i64, denom: i64) -> Px {
        if denom == 0 {
            return Px::ZERO;
        }
        let milli = self.to_milli_i64() as i128;
        let scaled = milli.saturating_mul(num as i128);
        let den = denom as i128;
        let half = den.abs() / 2;
        let value = if scaled >= 0 {
            (scaled + half) / den
        } else {
            -(((-scaled) + half) / den)
        };
        Px::from_milli_i64(value.clamp(i64::MIN as i128, i64::MAX as i128) as i64)
    }

    /// CSS serialization: `0` for zero, otherwise the shortest decimal with a
    /// `px` unit.
    pub fn css(self) -> String {
        let milli = self.to_milli_i64();
        if milli == 0 {
            return "0".to_string();
        }
        let sign = if milli < 0 { "-" } else { "" };
        let abs = milli.unsigned_abs();
        let whole = abs / 1000;
        let frac = abs % 1000;
        if frac == 0 {
            format!("{sign}{whole}px")
        } else {
            let digits = format!("{frac:03}");
            format!("{sign}{whole}.{}px", digits.trim_end_matches('0'))
        }
    }
}

impl Default for Px {
    fn default() -> Self {
        Px::ZERO
    }
}

impl fmt::Display for Px {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.css())
    }
}

impl std::ops::Add for Px {
    type Output = Px;
    fn add(self, rhs: Px) -> Px {
        Px::from_milli_i64(self.to_milli_i64().saturating_add(rhs.to_milli_i64()))
    }
}

impl std::ops::AddAssign for Px {
    fn add_assign(&mut self, rhs: Px) {
        *self = *self + rhs;
    }
}

impl std::ops::Sub for Px {
    type Output = Px;
    fn sub(self, rhs: Px) -> Px {
        Px::from_milli_i64(self.to_milli_i64().saturating_sub(rhs.to_milli_i64()))
    }
}

impl std::ops::SubAssign for Px {
    fn sub_assign(&mut self, rhs: Px) {
        *self = *self - rhs;
    }
}

impl std::ops::Mul<i32> for Px {
    type Output = Px;
    fn mul(self, rhs: i32) -> Px {
        Px::from_milli_i64(self.to_milli_i64().saturating_mul(rhs as i64))
    }
}

impl std::ops::Mul<f32> for Px {
    type Output = Px;
    fn mul(self, rhs: f32) -> Px {
        if !rhs.is_finite() {
            return Px::ZERO;
        }
        Px::from_f32(self.to_f32() * rhs)
    }
}

impl std::ops::Neg for Px {
    type Output = Px;
    fn neg(self) -> Px {
        Px::from_milli_i64(-self.to_milli_i64())
    }
}

impl std::iter::Sum for Px {
    fn sum<I: Iterator<Item = Px>>(iter: I) -> Px {
        iter.fold(Px::ZERO, |acc, v| acc + v)
    }
}

/// Four box sides in CSS order.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Edges {
    pub top: Px,
    pub right: Px,
    pub bottom: Px,
    pub left: Px,
}

impl Edges {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn all(value: Px) -> Self {
        Self {
            top: value,
            right: value,
            bottom: value,
            left: value,
        }
    }

    pub fn new(top: Px, right: Px, bottom: Px, left: Px) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }

    pub fn vertical(&self) -> Px {
        self.top + self.bottom
    }

    pub fn horizontal(&self) -> Px {
        self.left + self.right
    }

    /// Serialize as a four-value `padding`/`margin` shorthand.
    pub fn css(&self) -> String {
        format!(
            "{} {} {} {}",
            self.top.css(),
            self.right.css(),
            self.bottom.css(),
            self.left.css()
        )
    }

    /// Expand a one to four value shorthand the way CSS does.
    pub fn from_shorthand(values: &[Px]) -> Option<Self> {
        match values {
            [all] => Some(Self::all(*all)),
            [v, h] => Some(Self::new(*v, *h, *v, *h)),
            [t, h, b] => Some(Self::new(*t, *h, *b, *h)),
            [t, r, b, l] => Some(Self::new(*t, *r, *b, *l)),
            _ => None,
        }
    }
}
