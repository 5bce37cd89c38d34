//! 压缩数据包 (Packet).

use bytes::Bytes;
use reel_core::{NOPTS_VALUE, Rational, rescale_q};

/// 压缩数据包
///
/// 由解封装器产生, 被恰好一个解码器消费, 或在流复制路径上原样交给封装器.
/// 除时间戳换算外内容不可变.
#[derive(Debug, Clone)]
pub struct Packet {
    /// 压缩数据
    pub data: Bytes,
    /// 显示时间戳 (PTS)
    pub pts: i64,
    /// 解码时间戳 (DTS)
    pub dts: i64,
    /// 时长 (以 time_base 为单位)
    pub duration: i64,
    /// 时间戳所用的时间基
    pub time_base: Rational,
    /// 所属流的索引
    pub stream_index: usize,
    pub is_keyframe: bool,
}

impl Packet {
    /// 创建空数据包, 送入解码器表示冲洗
    pub fn empty() -> Self {
        Self {
            data: Bytes::new(),
            pts: NOPTS_VALUE,
            dts: NOPTS_VALUE,
            duration: 0,
            time_base: Rational::UNDEFINED,
            stream_index: 0,
            is_keyframe: false,
        }
    }

    pub fn from_data(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            ..Self::empty()
        }
    }

    /// 数据大小 (字节)
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// 是否为空包 (冲洗信号)
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// 将 pts/dts/duration 从 `from` 换算到 `to`, 并记录新的时间基
    ///
    /// 未定义的时间戳保持未定义. 时长为 0 表示未知, 保持不变.
    pub fn rescale_ts(&mut self, from: Rational, to: Rational) {
        self.pts = rescale_q(self.pts, from, to);
        self.dts = rescale_q(self.dts, from, to);
        if self.duration > 0 {
            self.duration = rescale_q(self.duration, from, to).max(0);
        }
        self.time_base = to;
    }
}
