//! 有理数类型, 用于时间基 (time_base) 和帧率.

use std::fmt;

/// 有理数, 由分子和分母组成
///
/// 时间基 1/48000 表示每个刻度为 1/48000 秒; 帧率 30000/1001 表示 29.97fps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rational {
    /// 分子
    pub num: i32,
    /// 分母
    pub den: i32,
}

impl Rational {
    /// 创建新的有理数
    pub const fn new(num: i32, den: i32) -> Self {
        Self { num, den }
    }

    /// 零值
    pub const ZERO: Self = Self { num: 0, den: 1 };

    /// 未定义 (分母为 0)
    pub const UNDEFINED: Self = Self { num: 0, den: 0 };

    /// 判断是否可用作时间基 (分子分母均为正)
    pub const fn is_valid(&self) -> bool {
        self.num > 0 && self.den > 0
    }

    /// 转换为 f64, 分母为 0 时返回 `f64::NAN`
    pub fn to_f64(self) -> f64 {
        if self.den == 0 {
            return f64::NAN;
        }
        f64::from(self.num) / f64::from(self.den)
    }

    /// 约分, 并保证分母为正
    pub fn reduce(self) -> Self {
        if self.den == 0 {
            return self;
        }
        let g = gcd(self.num.unsigned_abs(), self.den.unsigned_abs());
        if g == 0 {
            return self;
        }
        let g = g as i32;
        let sign = if self.den < 0 { -1 } else { 1 };
        Self {
            num: sign * self.num / g,
            den: sign * self.den / g,
        }
    }

    /// 求倒数 (帧率 <-> 时间基)
    pub const fn invert(self) -> Self {
        Self {
            num: self.den,
            den: self.num,
        }
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

impl From<(i32, i32)> for Rational {
    fn from((num, den): (i32, i32)) -> Self {
        Self { num, den }
    }
}

fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    a
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rational_validity() {
        assert!(Rational::new(1, 48000).is_valid());
        assert!(!Rational::UNDEFINED.is_valid());
        assert!(!Rational::ZERO.is_valid());
        assert!(Rational::UNDEFINED.to_f64().is_nan());
    }

    #[test]
    fn test_rational_reduce() {
        assert_eq!(Rational::new(30, 60).reduce(), Rational::new(1, 2));
        assert_eq!(Rational::new(3, -6).reduce(), Rational::new(-1, 2));
    }

    #[test]
    fn test_rational_帧率转时间基() {
        let tb = Rational::new(30000, 1001).invert();
        assert_eq!(tb, Rational::new(1001, 30000));
        assert_eq!(format!("{tb}"), "1001/30000");
    }
}
