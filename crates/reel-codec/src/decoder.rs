//! 解码器 trait 定义.

use reel_core::ReelResult;

use crate::codec_id::CodecId;
use crate::codec_parameters::CodecParameters;
use crate::frame::Frame;
use crate::packet::Packet;

/// 解码器
///
/// 解码流程:
/// 1. `send_packet()` 送入压缩数据
/// 2. 循环 `receive_frame()` 取出帧, 直到返回 `NeedMoreData`
/// 3. 输入结束后送入空包, 再循环取帧直到返回 `Eof`
pub trait Decoder: Send {
    fn codec_id(&self) -> CodecId;

    fn name(&self) -> &str;

    /// 使用参数配置解码器
    ///
    /// PCM/RawVideo 等无头部信息的编解码器必须先调用此方法.
    fn open(&mut self, _params: &CodecParameters) -> ReelResult<()> {
        Ok(())
    }

    /// 送入一个数据包, 空包表示冲洗
    ///
    /// - `Err(ReelError::NeedMoreData)`: 内部缓冲已满, 需要先取出帧
    /// - `Err(ReelError::InvalidData)`: 数据包损坏
    fn send_packet(&mut self, packet: &Packet) -> ReelResult<()>;

    /// 取出一帧
    ///
    /// - `Err(ReelError::NeedMoreData)`: 需要送入更多数据包
    /// - `Err(ReelError::Eof)`: 冲洗后所有帧已取出
    fn receive_frame(&mut self) -> ReelResult<Frame>;

    /// 丢弃内部状态, 回到可重新送包的初始状态
    fn flush(&mut self);
}
