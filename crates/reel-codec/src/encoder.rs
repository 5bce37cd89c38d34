//! 编码器 trait 定义.

use bitflags::bitflags;
use reel_core::{PixelFormat, ReelResult, SampleFormat};

use crate::codec_id::CodecId;
use crate::codec_parameters::CodecParameters;
use crate::frame::Frame;
use crate::packet::Packet;

bitflags! {
    /// 编码器能力标志
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CodecCapabilities: u32 {
        /// 接受任意采样数的音频帧
        const VARIABLE_FRAME_SIZE = 1 << 0;
        /// 内部有延迟, 冲洗时仍会吐出数据包
        const DELAY = 1 << 1;
    }
}

/// 编码器
///
/// 编码流程:
/// 1. `send_frame(Some(..))` 送入原始帧
/// 2. 循环 `receive_packet()` 取出数据包, 直到返回 `NeedMoreData`
/// 3. 输入结束后送入 `None`, 再循环取包直到返回 `Eof`
pub trait Encoder: Send {
    fn codec_id(&self) -> CodecId;

    fn name(&self) -> &str;

    /// 使用参数配置编码器
    fn open(&mut self, _params: &CodecParameters) -> ReelResult<()> {
        Ok(())
    }

    /// 能力标志, 默认无
    fn capabilities(&self) -> CodecCapabilities {
        CodecCapabilities::empty()
    }

    /// 要求的每帧采样数, 仅对音频编码器有意义; 0 表示不限
    ///
    /// 在 `open()` 之后才可靠.
    fn frame_size(&self) -> u32 {
        0
    }

    /// 首选采样格式, 上游滤镜据此归一化音频帧
    fn preferred_sample_format(&self) -> Option<SampleFormat> {
        None
    }

    /// 首选像素格式, 上游滤镜据此校验视频帧
    fn preferred_pixel_format(&self) -> Option<PixelFormat> {
        None
    }

    /// 送入一帧, `None` 表示冲洗
    ///
    /// - `Err(ReelError::NeedMoreData)`: 内部缓冲已满, 需要先取出数据包
    fn send_frame(&mut self, frame: Option<&Frame>) -> ReelResult<()>;

    /// 取出一个数据包
    ///
    /// - `Err(ReelError::NeedMoreData)`: 需要送入更多帧
    /// - `Err(ReelError::Eof)`: 冲洗后所有数据包已取出
    fn receive_packet(&mut self) -> ReelResult<Packet>;

    /// 丢弃内部状态
    fn flush(&mut self);
}
