//! 解封装器 trait 定义.

use reel_codec::Packet;
use reel_core::ReelResult;

use crate::format_id::FormatId;
use crate::io::IoContext;
use crate::stream::Stream;

/// 解封装器
///
/// 使用流程:
/// 1. `open()` 解析容器头部
/// 2. `streams()` 获取每条流的编解码器与时间基
/// 3. 循环 `read_packet()`, 直到返回 `Err(ReelError::Eof)`
pub trait Demuxer: Send {
    fn format_id(&self) -> FormatId;

    fn name(&self) -> &str;

    /// 打开容器并解析头部
    fn open(&mut self, io: &mut IoContext) -> ReelResult<()>;

    /// 所有流的描述, 下标即流索引
    fn streams(&self) -> &[Stream];

    /// 读取下一个数据包, 时间戳以所属流的时间基表示
    ///
    /// 输入结束时返回 `Err(ReelError::Eof)`.
    fn read_packet(&mut self, io: &mut IoContext) -> ReelResult<Packet>;

    /// 容器时长 (秒), 未知时为 `None`
    fn duration(&self) -> Option<f64> {
        None
    }
}
