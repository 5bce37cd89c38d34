//! WAV (RIFF WAVE) 解封装器.
//!
//! ```text
//! "RIFF" <riff_size> "WAVE"
//! "fmt " <size> format_tag channels sample_rate byte_rate block_align bits [扩展]
//! "data" <size> PCM 采样...
//! ```
//! 其余块跳过. 块大小为奇数时后跟一个填充字节.

use log::{debug, warn};
use reel_codec::{CodecId, Packet};
use reel_core::{ChannelLayout, MediaType, Rational, ReelError, ReelResult, SampleFormat};

use crate::demuxer::Demuxer;
use crate::format_id::FormatId;
use crate::io::IoContext;
use crate::probe::{FormatProbe, ProbeScore, SCORE_EXTENSION, SCORE_MAX};
use crate::stream::{AudioStreamParams, Stream, StreamParams};

pub(crate) const WAVE_FORMAT_PCM: u16 = 0x0001;
pub(crate) const WAVE_FORMAT_IEEE_FLOAT: u16 = 0x0003;
const WAVE_FORMAT_EXTENSIBLE: u16 = 0xFFFE;

/// 每个数据包包含的采样数
const SAMPLES_PER_PACKET: u64 = 4096;

/// 格式码 + 位深 -> 编解码器
fn codec_for(format_tag: u16, bits: u16) -> ReelResult<CodecId> {
    match (format_tag, bits) {
        (WAVE_FORMAT_PCM, 8) => Ok(CodecId::PcmU8),
        (WAVE_FORMAT_PCM, 16) => Ok(CodecId::PcmS16le),
        (WAVE_FORMAT_PCM, 24) => Ok(CodecId::PcmS24le),
        (WAVE_FORMAT_PCM, 32) => Ok(CodecId::PcmS32le),
        (WAVE_FORMAT_IEEE_FLOAT, 32) => Ok(CodecId::PcmF32le),
        _ => Err(ReelError::Unsupported(format!(
            "不支持的 WAV 格式: 格式码 0x{format_tag:04X}, {bits} 位"
        ))),
    }
}

/// 编解码器 -> (格式码, 位深), 封装器使用
pub(crate) fn wav_format_for(codec_id: CodecId) -> ReelResult<(u16, u16)> {
    match codec_id {
        CodecId::PcmU8 => Ok((WAVE_FORMAT_PCM, 8)),
        CodecId::PcmS16le => Ok((WAVE_FORMAT_PCM, 16)),
        CodecId::PcmS24le => Ok((WAVE_FORMAT_PCM, 24)),
        CodecId::PcmS32le => Ok((WAVE_FORMAT_PCM, 32)),
        CodecId::PcmF32le => Ok((WAVE_FORMAT_IEEE_FLOAT, 32)),
        _ => Err(ReelError::Unsupported(format!("WAV 不能承载 {codec_id}"))),
    }
}

fn sample_format_for(codec_id: CodecId) -> SampleFormat {
    match codec_id {
        CodecId::PcmU8 => SampleFormat::U8,
        CodecId::PcmS16le => SampleFormat::S16,
        CodecId::PcmS24le | CodecId::PcmS32le => SampleFormat::S32,
        CodecId::PcmF32le => SampleFormat::F32,
        _ => SampleFormat::None,
    }
}

/// fmt 块中解析出的字段
struct WavFmt {
    format_tag: u16,
    channels: u16,
    sample_rate: u32,
    block_align: u16,
    bits: u16,
}

fn read_fmt(io: &mut IoContext, size: u64) -> ReelResult<WavFmt> {
    if size < 16 {
        return Err(ReelError::InvalidData(format!("fmt 块只有 {size} 字节")));
    }
    let mut format_tag = io.read_u16_le()?;
    let channels = io.read_u16_le()?;
    let sample_rate = io.read_u32_le()?;
    let _byte_rate = io.read_u32_le()?;
    let block_align = io.read_u16_le()?;
    let bits = io.read_u16_le()?;
    let mut consumed = 16;
    // WAVE_FORMAT_EXTENSIBLE: 真正的格式码在子格式 GUID 的前两个字节
    if format_tag == WAVE_FORMAT_EXTENSIBLE && size >= 40 {
        let _cb_size = io.read_u16_le()?;
        let _valid_bits = io.read_u16_le()?;
        let _channel_mask = io.read_u32_le()?;
        format_tag = io.read_u16_le()?;
        consumed += 10;
    }
    io.skip((size - consumed) as usize)?;
    Ok(WavFmt {
        format_tag,
        channels,
        sample_rate,
        block_align,
        bits,
    })
}

/// WAV 解封装器
pub struct WavDemuxer {
    streams: Vec<Stream>,
    /// data 块大小 (字节)
    data_size: u64,
    /// 已读取的 data 字节数
    data_pos: u64,
    block_align: u64,
    sample_rate: u32,
}

impl WavDemuxer {
    pub fn create() -> ReelResult<Box<dyn Demuxer>> {
        Ok(Box::new(Self {
            streams: Vec::new(),
            data_size: 0,
            data_pos: 0,
            block_align: 0,
            sample_rate: 0,
        }))
    }
}

impl Demuxer for WavDemuxer {
    fn format_id(&self) -> FormatId {
        FormatId::Wav
    }

    fn name(&self) -> &str {
        "wav"
    }

    fn open(&mut self, io: &mut IoContext) -> ReelResult<()> {
        if &io.read_tag()? != b"RIFF" {
            return Err(ReelError::InvalidData("缺少 RIFF 标记".into()));
        }
        let _riff_size = io.read_u32_le()?;
        if &io.read_tag()? != b"WAVE" {
            return Err(ReelError::InvalidData("缺少 WAVE 标记".into()));
        }

        let mut fmt: Option<WavFmt> = None;
        let data_size = loop {
            let tag = match io.read_tag() {
                Ok(tag) => tag,
                Err(ReelError::Eof) => return Err(ReelError::InvalidData("未找到 data 块".into())),
                Err(e) => return Err(e),
            };
            let size = u64::from(io.read_u32_le()?);
            match &tag {
                b"fmt " => fmt = Some(read_fmt(io, size)?),
                b"data" => break size,
                _ => {
                    warn!("跳过 WAV 块 '{}', {} 字节", String::from_utf8_lossy(&tag), size);
                    io.skip(size as usize)?;
                }
            }
            if size % 2 == 1 {
                io.skip(1)?;
            }
        };
        let fmt = fmt.ok_or_else(|| ReelError::InvalidData("data 块之前没有 fmt 块".into()))?;
        if fmt.channels == 0 || fmt.sample_rate == 0 || fmt.block_align == 0 {
            return Err(ReelError::InvalidData(format!(
                "无效的 fmt 块: {} 声道, {} Hz, 块对齐 {}",
                fmt.channels, fmt.sample_rate, fmt.block_align
            )));
        }

        let codec_id = codec_for(fmt.format_tag, fmt.bits)?;
        // 写入未完成的文件里 data 大小可能是 0 或超出实际长度
        let data_offset = io.position()?;
        let available = io.size().map(|s| s.saturating_sub(data_offset));
        self.data_size = match available {
            Some(avail) if data_size == 0 || data_size > avail => {
                warn!("data 块声明 {data_size} 字节, 实际可读 {avail} 字节");
                avail
            }
            _ => data_size,
        };
        self.data_pos = 0;
        self.block_align = u64::from(fmt.block_align);
        self.sample_rate = fmt.sample_rate;

        let total_samples = self.data_size / self.block_align;
        let channels = u32::from(fmt.channels);
        self.streams = vec![Stream {
            index: 0,
            media_type: MediaType::Audio,
            codec_id,
            time_base: Rational::new(1, fmt.sample_rate as i32),
            duration: total_samples as i64,
            start_time: 0,
            extra_data: Vec::new(),
            params: StreamParams::Audio(AudioStreamParams {
                sample_rate: fmt.sample_rate,
                channel_layout: ChannelLayout::from_channels(channels),
                sample_format: sample_format_for(codec_id),
                bit_rate: u64::from(fmt.sample_rate) * u64::from(channels) * u64::from(fmt.bits),
                frame_size: 0,
            }),
            metadata: Vec::new(),
        }];

        debug!(
            "打开 WAV: {}, {} Hz, {} 声道, {} 个采样",
            codec_id, fmt.sample_rate, channels, total_samples
        );
        Ok(())
    }

    fn streams(&self) -> &[Stream] {
        &self.streams
    }

    fn read_packet(&mut self, io: &mut IoContext) -> ReelResult<Packet> {
        let remaining_samples = (self.data_size - self.data_pos) / self.block_align.max(1);
        let nb_samples = remaining_samples.min(SAMPLES_PER_PACKET);
        if nb_samples == 0 {
            return Err(ReelError::Eof);
        }
        let data = io.read_bytes((nb_samples * self.block_align) as usize)?;

        let mut pkt = Packet::from_data(data);
        pkt.stream_index = 0;
        pkt.pts = (self.data_pos / self.block_align) as i64;
        pkt.dts = pkt.pts;
        pkt.duration = nb_samples as i64;
        pkt.time_base = Rational::new(1, self.sample_rate as i32);
        pkt.is_keyframe = true;
        self.data_pos += nb_samples * self.block_align;
        Ok(pkt)
    }

    fn duration(&self) -> Option<f64> {
        (self.sample_rate > 0 && self.block_align > 0)
            .then(|| (self.data_size / self.block_align) as f64 / f64::from(self.sample_rate))
    }
}

/// WAV 格式探测器
pub struct WavProbe;

impl FormatProbe for WavProbe {
    fn probe(&self, data: &[u8], filename: Option<&str>) -> Option<ProbeScore> {
        if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WAVE" {
            return Some(SCORE_MAX);
        }
        filename
            .and_then(FormatId::from_filename)
            .filter(|id| *id == FormatId::Wav)
            .map(|_| SCORE_EXTENSION)
    }

    fn format_id(&self) -> FormatId {
        FormatId::Wav
    }
}
