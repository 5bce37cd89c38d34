//! WAV (RIFF WAVE) 封装器.
//!
//! 头部先写入占位的大小字段, 尾部回填 RIFF 与 data 大小.

use std::io::SeekFrom;

use log::debug;
use reel_codec::Packet;
use reel_core::{Rational, ReelError, ReelResult};

use crate::demuxers::wav::wav_format_for;
use crate::format_id::FormatId;
use crate::io::IoContext;
use crate::muxer::Muxer;
use crate::stream::{Stream, StreamParams};

/// RIFF 大小字段的偏移
const RIFF_SIZE_OFFSET: u64 = 4;
/// data 大小字段的偏移: 12 (RIFF 头) + 24 (fmt 块) + 4 ("data")
const DATA_SIZE_OFFSET: u64 = 40;

/// WAV 封装器, 只接受单个 PCM 音频流
pub struct WavMuxer {
    sample_rate: u32,
    data_written: u64,
}

impl WavMuxer {
    pub fn create() -> ReelResult<Box<dyn Muxer>> {
        Ok(Box::new(Self {
            sample_rate: 0,
            data_written: 0,
        }))
    }
}

impl Muxer for WavMuxer {
    fn format_id(&self) -> FormatId {
        FormatId::Wav
    }

    fn name(&self) -> &str {
        "wav"
    }

    fn write_header(&mut self, io: &mut IoContext, streams: &[Stream]) -> ReelResult<()> {
        let [stream] = streams else {
            return Err(ReelError::InvalidArgument(format!(
                "WAV 只能包含一条音频流, 收到 {} 条",
                streams.len()
            )));
        };
        let StreamParams::Audio(audio) = &stream.params else {
            return Err(ReelError::InvalidArgument("WAV 只能包含音频流".into()));
        };
        let (format_tag, bits) = wav_format_for(stream.codec_id)?;
        let channels = u16::try_from(audio.channel_layout.channels)
            .map_err(|_| ReelError::InvalidArgument("声道数过多".into()))?;
        let block_align = channels * (bits / 8);

        io.write_tag(b"RIFF")?;
        io.write_u32_le(0)?;
        io.write_tag(b"WAVE")?;
        io.write_tag(b"fmt ")?;
        io.write_u32_le(16)?;
        io.write_u16_le(format_tag)?;
        io.write_u16_le(channels)?;
        io.write_u32_le(audio.sample_rate)?;
        io.write_u32_le(audio.sample_rate * u32::from(block_align))?;
        io.write_u16_le(block_align)?;
        io.write_u16_le(bits)?;
        io.write_tag(b"data")?;
        io.write_u32_le(0)?;

        self.sample_rate = audio.sample_rate;
        self.data_written = 0;
        debug!(
            "WAV 写入头部: {}, {} Hz, {} 声道",
            stream.codec_id, audio.sample_rate, channels
        );
        Ok(())
    }

    fn write_packet(&mut self, io: &mut IoContext, packet: &Packet) -> ReelResult<()> {
        if packet.stream_index != 0 {
            return Err(ReelError::StreamNotFound(packet.stream_index));
        }
        io.write_all(&packet.data)?;
        self.data_written += packet.size() as u64;
        Ok(())
    }

    fn write_trailer(&mut self, io: &mut IoContext) -> ReelResult<()> {
        if self.data_written % 2 == 1 {
            io.write_all(&[0])?;
        }
        if !io.is_seekable() {
            debug!("WAV 输出不可定位, 保留占位的大小字段");
            return Ok(());
        }
        let data_size = u32::try_from(self.data_written)
            .map_err(|_| ReelError::Format("WAV 数据超过 4 GiB".into()))?;
        let riff_size = 36 + data_size + data_size % 2;

        io.seek(SeekFrom::Start(RIFF_SIZE_OFFSET))?;
        io.write_u32_le(riff_size)?;
        io.seek(SeekFrom::Start(DATA_SIZE_OFFSET))?;
        io.write_u32_le(data_size)?;
        io.seek(SeekFrom::End(0))?;

        debug!("WAV 写入尾部: data {data_size} 字节");
        Ok(())
    }

    fn stream_time_base(&self, index: usize) -> Option<Rational> {
        (index == 0 && self.sample_rate > 0).then(|| Rational::new(1, self.sample_rate as i32))
    }
}
