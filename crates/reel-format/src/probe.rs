//! 格式探测.

use crate::format_id::FormatId;

/// 探测置信度, 越高越可信
pub type ProbeScore = u32;

/// 仅扩展名匹配
pub const SCORE_EXTENSION: ProbeScore = 50;

/// 魔数完全匹配
pub const SCORE_MAX: ProbeScore = 100;

/// 探测结果
#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub format_id: FormatId,
    pub score: ProbeScore,
}

/// 格式探测器
pub trait FormatProbe {
    /// 根据文件开头的若干字节与文件名判断格式, 不是此格式时返回 `None`
    fn probe(&self, data: &[u8], filename: Option<&str>) -> Option<ProbeScore>;

    fn format_id(&self) -> FormatId;
}
