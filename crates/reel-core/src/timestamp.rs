//! 时间戳与时间基换算.
//!
//! 一条转码链路上同时存在四种时间基: 输入流、解码/编码工作时间基、输出流.
//! 所有换算都经由 [`rescale_q`] 完成, 它是纯函数, 对 `NOPTS_VALUE` 透传.

use crate::rational::Rational;
use std::fmt;

/// 表示"未定义"的时间戳值
pub const NOPTS_VALUE: i64 = i64::MIN;

/// 将 `value` 从时间基 `from` 换算到时间基 `to`
///
/// new = value * from.num * to.den / (from.den * to.num), 以 128 位整数计算,
/// 就近舍入 (恰好一半时远离零). 舍入函数单调, 因此单调不减的输入换算后仍单调不减.
///
/// - `value == NOPTS_VALUE` 时原样返回
/// - 任一时间基无效时返回 `NOPTS_VALUE`
pub fn rescale_q(value: i64, from: Rational, to: Rational) -> i64 {
    if value == NOPTS_VALUE {
        return NOPTS_VALUE;
    }
    if !from.is_valid() || !to.is_valid() {
        return NOPTS_VALUE;
    }
    if from == to {
        return value;
    }
    let num = i128::from(value) * i128::from(from.num) * i128::from(to.den);
    let den = i128::from(from.den) * i128::from(to.num);
    let half = den / 2;
    let q = if num >= 0 {
        (num + half) / den
    } else {
        (num - half) / den
    };
    // 结果不能与 NOPTS_VALUE 混淆
    q.clamp(i128::from(i64::MIN) + 1, i128::from(i64::MAX)) as i64
}

/// 时间戳: 整数刻度 + 时间基
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timestamp {
    /// 刻度值, `NOPTS_VALUE` 表示未定义
    pub pts: i64,
    /// 时间基
    pub time_base: Rational,
}

impl Timestamp {
    pub const fn new(pts: i64, time_base: Rational) -> Self {
        Self { pts, time_base }
    }

    /// 未定义的时间戳
    pub const fn none() -> Self {
        Self {
            pts: NOPTS_VALUE,
            time_base: Rational::UNDEFINED,
        }
    }

    pub const fn is_valid(&self) -> bool {
        self.pts != NOPTS_VALUE && self.time_base.is_valid()
    }

    /// 转换为秒, 无效时间戳返回 `f64::NAN`
    pub fn to_seconds(&self) -> f64 {
        if !self.is_valid() {
            return f64::NAN;
        }
        self.pts as f64 * self.time_base.to_f64()
    }

    /// 换算到新的时间基
    pub fn rescale(&self, new_time_base: Rational) -> Self {
        if !self.is_valid() || !new_time_base.is_valid() {
            return Self::none();
        }
        Self {
            pts: rescale_q(self.pts, self.time_base, new_time_base),
            time_base: new_time_base,
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "{:.6}s", self.to_seconds())
        } else {
            write!(f, "NOPTS")
        }
    }
}
