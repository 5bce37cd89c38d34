//! 封装器 trait 定义.

use reel_codec::Packet;
use reel_core::{Rational, ReelResult};

use crate::format_id::FormatId;
use crate::io::IoContext;
use crate::stream::Stream;

/// 封装器
///
/// 使用流程:
/// 1. `write_header()` 写入头部, 此后可通过 `stream_time_base()` 查询最终时间基
/// 2. 按到达顺序 `write_packet()`
/// 3. `write_trailer()` 完成封装; 之后不得再写数据包
pub trait Muxer: Send {
    fn format_id(&self) -> FormatId;

    fn name(&self) -> &str;

    fn write_header(&mut self, io: &mut IoContext, streams: &[Stream]) -> ReelResult<()>;

    /// 写入一个数据包, 时间戳必须以该输出流的时间基表示
    fn write_packet(&mut self, io: &mut IoContext, packet: &Packet) -> ReelResult<()>;

    fn write_trailer(&mut self, io: &mut IoContext) -> ReelResult<()>;

    /// 写入头部后封装器为输出流选定的时间基
    ///
    /// `None` 表示沿用调用方在 `write_header()` 中给出的时间基.
    fn stream_time_base(&self, _index: usize) -> Option<Rational> {
        None
    }
}
