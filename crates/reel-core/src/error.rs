//! 统一错误类型定义.
//!
//! 所有 reel crate 共用一个错误枚举. 其中 `NeedMoreData` 与 `Eof` 只是流控信号,
//! 由转码管线的适配层就地消化, 不会作为任务级错误向上传播.

use thiserror::Error;

/// reel 框架统一错误类型
#[derive(Debug, Error)]
pub enum ReelError {
    /// 无效参数
    #[error("无效参数: {0}")]
    InvalidArgument(String),

    /// 不支持的操作
    #[error("不支持的操作: {0}")]
    Unsupported(String),

    /// 编解码器内部错误
    #[error("编解码器错误: {0}")]
    Codec(String),

    /// 容器格式错误
    #[error("格式错误: {0}")]
    Format(String),

    /// I/O 错误
    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),

    /// 数据不足, 需要更多输入 (流控信号)
    #[error("数据不足, 需要更多输入")]
    NeedMoreData,

    /// 已到达流末尾 (流控信号)
    #[error("已到达流末尾")]
    Eof,

    /// 内存分配失败
    #[error("内存分配失败: {0}")]
    OutOfMemory(String),

    /// 未找到指定的编解码器
    #[error("未找到编解码器: {0}")]
    CodecNotFound(String),

    /// 未找到指定的容器格式
    #[error("未找到容器格式: {0}")]
    FormatNotFound(String),

    /// 未找到指定的流
    #[error("未找到流: 索引 {0}")]
    StreamNotFound(usize),

    /// 无效数据 (损坏的压缩单元等)
    #[error("无效数据: {0}")]
    InvalidData(String),

    /// 从重组缓冲区读取的采样数超过了缓冲量
    #[error("缓冲区下溢: 请求 {requested} 个采样, 仅有 {available} 个")]
    Underflow {
        /// 请求的采样数
        requested: usize,
        /// 实际可读的采样数
        available: usize,
    },

    /// 内部错误 (不应发生)
    #[error("内部错误: {0}")]
    Internal(String),
}

impl ReelError {
    /// 是否为流控信号 (`NeedMoreData` / `Eof`), 而非真正的错误
    pub const fn is_flow_control(&self) -> bool {
        matches!(self, Self::NeedMoreData | Self::Eof)
    }
}

impl From<std::collections::TryReserveError> for ReelError {
    fn from(e: std::collections::TryReserveError) -> Self {
        Self::OutOfMemory(e.to_string())
    }
}

/// reel 框架统一 Result 类型
pub type ReelResult<T> = Result<T, ReelError>;
