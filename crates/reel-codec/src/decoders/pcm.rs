//! PCM 音频解码器.
//!
//! 六种 PCM 变体共用一张变体表 [`PcmVariant`], 编码器也从这张表取转换函数.

use log::debug;
use reel_core::{ChannelLayout, ReelError, ReelResult, SampleFormat};

use crate::codec_id::CodecId;
use crate::codec_parameters::{CodecParameters, CodecParamsType};
use crate::decoder::Decoder;
use crate::frame::{AudioFrame, Frame};
use crate::packet::Packet;

/// 字节转换函数
type Convert = fn(&[u8], &mut Vec<u8>);

/// PCM 变体: 码流字节布局与内存采样格式之间的对应关系
pub(crate) struct PcmVariant {
    pub codec_id: CodecId,
    /// 码流中每个采样的字节数
    pub wire_bytes: u32,
    /// 内存中的交错采样格式
    pub sample_format: SampleFormat,
    /// 码流 -> 内存
    pub unpack: Convert,
    /// 内存 -> 码流
    pub pack: Convert,
}

fn copy_bytes(src: &[u8], dst: &mut Vec<u8>) {
    dst.extend_from_slice(src);
}

/// 16 位字节序互换, 两个方向相同
fn swap16(src: &[u8], dst: &mut Vec<u8>) {
    for pair in src.chunks_exact(2) {
        dst.extend_from_slice(&[pair[1], pair[0]]);
    }
}

/// 24 位小端 -> 32 位, 高字节做符号扩展
fn unpack_s24le(src: &[u8], dst: &mut Vec<u8>) {
    for s in src.chunks_exact(3) {
        let ext = if s[2] & 0x80 != 0 { 0xFF } else { 0x00 };
        dst.extend_from_slice(&[s[0], s[1], s[2], ext]);
    }
}

/// 32 位 -> 24 位小端, 丢弃最高字节
fn pack_s24le(src: &[u8], dst: &mut Vec<u8>) {
    for s in src.chunks_exact(4) {
        dst.extend_from_slice(&s[..3]);
    }
}

pub(crate) fn pcm_variant(codec_id: CodecId) -> Option<PcmVariant> {
    let (wire_bytes, sample_format, unpack, pack): (u32, SampleFormat, Convert, Convert) =
        match codec_id {
            CodecId::PcmU8 => (1, SampleFormat::U8, copy_bytes, copy_bytes),
            CodecId::PcmS16le => (2, SampleFormat::S16, copy_bytes, copy_bytes),
            CodecId::PcmS16be => (2, SampleFormat::S16, swap16, swap16),
            CodecId::PcmS24le => (3, SampleFormat::S32, unpack_s24le, pack_s24le),
            CodecId::PcmS32le => (4, SampleFormat::S32, copy_bytes, copy_bytes),
            CodecId::PcmF32le => (4, SampleFormat::F32, copy_bytes, copy_bytes),
            _ => return None,
        };
    Some(PcmVariant {
        codec_id,
        wire_bytes,
        sample_format,
        unpack,
        pack,
    })
}

/// PCM 音频解码器, 每个数据包解出一帧交错格式音频
pub struct PcmDecoder {
    variant: PcmVariant,
    sample_rate: u32,
    channel_layout: ChannelLayout,
    /// 一个采样时刻 (所有声道) 在码流中的字节数
    block_align: usize,
    pending: Option<Frame>,
    opened: bool,
    draining: bool,
}

impl PcmDecoder {
    fn create(codec_id: CodecId) -> ReelResult<Box<dyn Decoder>> {
        let variant = pcm_variant(codec_id)
            .ok_or_else(|| ReelError::CodecNotFound(format!("{codec_id} 不是 PCM 格式")))?;
        Ok(Box::new(Self {
            variant,
            sample_rate: 0,
            channel_layout: ChannelLayout::MONO,
            block_align: 0,
            pending: None,
            opened: false,
            draining: false,
        }))
    }

    pub fn new_u8() -> ReelResult<Box<dyn Decoder>> {
        Self::create(CodecId::PcmU8)
    }

    pub fn new_s16le() -> ReelResult<Box<dyn Decoder>> {
        Self::create(CodecId::PcmS16le)
    }

    pub fn new_s16be() -> ReelResult<Box<dyn Decoder>> {
        Self::create(CodecId::PcmS16be)
    }

    pub fn new_s24le() -> ReelResult<Box<dyn Decoder>> {
        Self::create(CodecId::PcmS24le)
    }

    pub fn new_s32le() -> ReelResult<Box<dyn Decoder>> {
        Self::create(CodecId::PcmS32le)
    }

    pub fn new_f32le() -> ReelResult<Box<dyn Decoder>> {
        Self::create(CodecId::PcmF32le)
    }
}

impl Decoder for PcmDecoder {
    fn codec_id(&self) -> CodecId {
        self.variant.codec_id
    }

    fn name(&self) -> &str {
        self.variant.codec_id.name()
    }

    fn open(&mut self, params: &CodecParameters) -> ReelResult<()> {
        let CodecParamsType::Audio(audio) = &params.params else {
            return Err(ReelError::InvalidArgument(format!(
                "{} 解码器需要音频参数",
                self.name()
            )));
        };
        if audio.sample_rate == 0 || audio.channel_layout.channels == 0 {
            return Err(ReelError::InvalidArgument(format!(
                "无效的音频参数: {} Hz, {} 声道",
                audio.sample_rate, audio.channel_layout.channels
            )));
        }

        self.sample_rate = audio.sample_rate;
        self.channel_layout = audio.channel_layout;
        self.block_align = (self.variant.wire_bytes * audio.channel_layout.channels) as usize;
        self.pending = None;
        self.opened = true;
        self.draining = false;

        debug!(
            "打开 {} 解码器: {} Hz, {}, 输出 {}",
            self.name(),
            self.sample_rate,
            self.channel_layout,
            self.variant.sample_format,
        );
        Ok(())
    }

    fn send_packet(&mut self, packet: &Packet) -> ReelResult<()> {
        if !self.opened {
            return Err(ReelError::Codec("解码器未打开".into()));
        }
        if self.pending.is_some() {
            return Err(ReelError::NeedMoreData);
        }
        if packet.is_empty() {
            self.draining = true;
            return Ok(());
        }
        if self.draining {
            return Err(ReelError::InvalidArgument("冲洗之后不能再送入数据包".into()));
        }
        if packet.size() % self.block_align != 0 {
            return Err(ReelError::InvalidData(format!(
                "数据包大小 {} 不是块对齐 {} 的整数倍",
                packet.size(),
                self.block_align
            )));
        }

        let nb_samples = (packet.size() / self.block_align) as u32;
        let mut frame = AudioFrame::new(
            nb_samples,
            self.sample_rate,
            self.variant.sample_format,
            self.channel_layout,
        );
        frame.pts = packet.pts;
        frame.time_base = packet.time_base;
        frame.duration = packet.duration;
        let mut samples = Vec::with_capacity(frame.plane_size());
        (self.variant.unpack)(&packet.data, &mut samples);
        frame.data[0] = samples;

        self.pending = Some(Frame::Audio(frame));
        Ok(())
    }

    fn receive_frame(&mut self) -> ReelResult<Frame> {
        match self.pending.take() {
            Some(frame) => Ok(frame),
            None if self.draining => Err(ReelError::Eof),
            None => Err(ReelError::NeedMoreData),
        }
    }

    fn flush(&mut self) {
        self.pending = None;
        self.draining = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec_parameters::AudioCodecParams;
    use reel_core::Rational;

    fn audio_params(codec_id: CodecId, channels: u32) -> CodecParameters {
        CodecParameters {
            codec_id,
            extra_data: Vec::new(),
            bit_rate: 0,
            params: CodecParamsType::Audio(AudioCodecParams {
                sample_rate: 48000,
                channel_layout: ChannelLayout::from_channels(channels),
                sample_format: SampleFormat::None,
                frame_size: 0,
            }),
        }
    }

    fn decode_one(codec_id: CodecId, channels: u32, data: Vec<u8>) -> AudioFrame {
        let mut dec = crate::CodecRegistry::with_builtin()
            .create_decoder(codec_id)
            .unwrap();
        dec.open(&audio_params(codec_id, channels)).unwrap();
        dec.send_packet(&Packet::from_data(data)).unwrap();
        match dec.receive_frame().unwrap() {
            Frame::Audio(af) => af,
            Frame::Video(_) => panic!("期望音频帧"),
        }
    }

    #[test]
    fn test_s16le_copy() {
        let data = vec![0x00, 0x01, 0xFF, 0x7F, 0x00, 0x80, 0x01, 0x00];
        let af = decode_one(CodecId::PcmS16le, 2, data.clone());
        assert_eq!(af.nb_samples, 2);
        assert_eq!(af.sample_format, SampleFormat::S16);
        assert_eq!(af.data[0], data);
    }

    #[test]
    fn test_s16be_byte_swap() {
        let af = decode_one(CodecId::PcmS16be, 1, vec![0x01, 0x00, 0x7F, 0xFF]);
        assert_eq!(af.data[0], vec![0x00, 0x01, 0xFF, 0x7F]);
    }

    #[test]
    fn test_s24le_符号扩展() {
        let af = decode_one(CodecId::PcmS24le, 1, vec![0x56, 0x34, 0x12, 0x00, 0x00, 0x80]);
        assert_eq!(af.nb_samples, 2);
        assert_eq!(af.sample_format, SampleFormat::S32);
        assert_eq!(af.data[0], vec![0x56, 0x34, 0x12, 0x00, 0x00, 0x00, 0x80, 0xFF]);
    }

    #[test]
    fn test_pts_carried_to_frame() {
        let mut dec = PcmDecoder::new_u8().unwrap();
        dec.open(&audio_params(CodecId::PcmU8, 1)).unwrap();
        let mut pkt = Packet::from_data(vec![128u8; 16]);
        pkt.pts = 1024;
        pkt.time_base = Rational::new(1, 48000);
        dec.send_packet(&pkt).unwrap();
        let frame = dec.receive_frame().unwrap();
        assert_eq!(frame.pts(), 1024);
        assert_eq!(frame.nb_samples(), 16);
    }

    #[test]
    fn test_unaligned_packet_is_invalid() {
        let mut dec = PcmDecoder::new_s16le().unwrap();
        dec.open(&audio_params(CodecId::PcmS16le, 2)).unwrap();
        let err = dec.send_packet(&Packet::from_data(vec![0u8; 3])).unwrap_err();
        assert!(matches!(err, ReelError::InvalidData(_)));
    }

    #[test]
    fn test_full_slot_needs_receive() {
        let mut dec = PcmDecoder::new_u8().unwrap();
        dec.open(&audio_params(CodecId::PcmU8, 1)).unwrap();
        dec.send_packet(&Packet::from_data(vec![1u8])).unwrap();
        let err = dec.send_packet(&Packet::from_data(vec![2u8])).unwrap_err();
        assert!(matches!(err, ReelError::NeedMoreData));
    }

    #[test]
    fn test_eof_after_flush() {
        let mut dec = PcmDecoder::new_u8().unwrap();
        dec.open(&audio_params(CodecId::PcmU8, 1)).unwrap();
        assert!(matches!(dec.receive_frame(), Err(ReelError::NeedMoreData)));
        dec.send_packet(&Packet::empty()).unwrap();
        assert!(matches!(dec.receive_frame(), Err(ReelError::Eof)));
        assert!(matches!(dec.receive_frame(), Err(ReelError::Eof)));
    }

    #[test]
    fn test_not_opened() {
        let mut dec = PcmDecoder::new_s16le().unwrap();
        let err = dec.send_packet(&Packet::from_data(vec![0u8; 4])).unwrap_err();
        assert!(matches!(err, ReelError::Codec(_)));
    }
}
