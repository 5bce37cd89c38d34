//! 容器格式注册表.

use std::collections::HashMap;
use std::io::SeekFrom;

use reel_core::{ReelError, ReelResult};

use crate::demuxer::Demuxer;
use crate::format_id::FormatId;
use crate::io::IoContext;
use crate::muxer::Muxer;
use crate::probe::{FormatProbe, ProbeResult};

/// 解封装器工厂函数
pub type DemuxerFactory = fn() -> ReelResult<Box<dyn Demuxer>>;

/// 封装器工厂函数
pub type MuxerFactory = fn() -> ReelResult<Box<dyn Muxer>>;

/// 探测时最多读取的字节数
const PROBE_SIZE: u64 = 8192;

/// 容器格式注册表
pub struct FormatRegistry {
    demuxers: HashMap<FormatId, (String, DemuxerFactory)>,
    muxers: HashMap<FormatId, (String, MuxerFactory)>,
    probes: Vec<Box<dyn FormatProbe + Send>>,
}

impl FormatRegistry {
    pub fn new() -> Self {
        Self {
            demuxers: HashMap::new(),
            muxers: HashMap::new(),
            probes: Vec::new(),
        }
    }

    /// 创建已注册全部内置格式的注册表
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        crate::register_all(&mut registry);
        registry
    }

    pub fn register_demuxer(
        &mut self,
        format_id: FormatId,
        name: impl Into<String>,
        factory: DemuxerFactory,
    ) {
        self.demuxers.insert(format_id, (name.into(), factory));
    }

    pub fn register_muxer(
        &mut self,
        format_id: FormatId,
        name: impl Into<String>,
        factory: MuxerFactory,
    ) {
        self.muxers.insert(format_id, (name.into(), factory));
    }

    pub fn register_probe(&mut self, probe: Box<dyn FormatProbe + Send>) {
        self.probes.push(probe);
    }

    pub fn create_demuxer(&self, format_id: FormatId) -> ReelResult<Box<dyn Demuxer>> {
        let (_, factory) = self
            .demuxers
            .get(&format_id)
            .ok_or_else(|| ReelError::FormatNotFound(format!("没有 {format_id} 的解封装器")))?;
        factory()
    }

    pub fn create_muxer(&self, format_id: FormatId) -> ReelResult<Box<dyn Muxer>> {
        let (_, factory) = self
            .muxers
            .get(&format_id)
            .ok_or_else(|| ReelError::FormatNotFound(format!("没有 {format_id} 的封装器")))?;
        factory()
    }

    /// 返回置信度最高的探测结果, 同分时先注册者优先
    pub fn probe(&self, data: &[u8], filename: Option<&str>) -> Option<ProbeResult> {
        self.probes
            .iter()
            .filter_map(|p| {
                p.probe(data, filename).map(|score| ProbeResult {
                    format_id: p.format_id(),
                    score,
                })
            })
            .fold(None, |best: Option<ProbeResult>, cur| match best {
                Some(b) if b.score >= cur.score => Some(b),
                _ => Some(cur),
            })
    }

    /// 读取输入开头的数据探测格式, 然后回到起始位置
    pub fn probe_input(
        &self,
        io: &mut IoContext,
        filename: Option<&str>,
    ) -> ReelResult<ProbeResult> {
        let probe_size = io.size().unwrap_or(PROBE_SIZE).min(PROBE_SIZE) as usize;
        let head = io.read_bytes(probe_size)?;
        io.seek(SeekFrom::Start(0))?;
        self.probe(&head, filename)
            .ok_or_else(|| ReelError::FormatNotFound("无法识别输入格式".into()))
    }

    /// 探测格式, 创建解封装器并解析头部
    pub fn open_input(
        &self,
        io: &mut IoContext,
        filename: Option<&str>,
    ) -> ReelResult<Box<dyn Demuxer>> {
        let result = self.probe_input(io, filename)?;
        log::debug!("探测到输入格式 {} (置信度 {})", result.format_id, result.score);
        let mut demuxer = self.create_demuxer(result.format_id)?;
        demuxer.open(io)?;
        Ok(demuxer)
    }

    pub fn list_demuxers(&self) -> Vec<(FormatId, &str)> {
        let mut out: Vec<_> = self
            .demuxers
            .iter()
            .map(|(id, (name, _))| (*id, name.as_str()))
            .collect();
        out.sort_by(|a, b| a.1.cmp(b.1));
        out
    }

    pub fn list_muxers(&self) -> Vec<(FormatId, &str)> {
        let mut out: Vec<_> = self
            .muxers
            .iter()
            .map(|(id, (name, _))| (*id, name.as_str()))
            .collect();
        out.sort_by(|a, b| a.1.cmp(b.1));
        out
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemoryBackend;
    use crate::probe::{SCORE_EXTENSION, SCORE_MAX};

    fn tiny_wav() -> Vec<u8> {
        let mut wav = b"RIFF".to_vec();
        wav.extend_from_slice(&38u32.to_le_bytes());
        wav.extend_from_slice(b"WAVEfmt ");
        wav.extend_from_slice(&16u32.to_le_bytes());
        for v in [1u16, 1] {
            wav.extend_from_slice(&v.to_le_bytes());
        }
        wav.extend_from_slice(&8000u32.to_le_bytes());
        wav.extend_from_slice(&16000u32.to_le_bytes());
        for v in [2u16, 16] {
            wav.extend_from_slice(&v.to_le_bytes());
        }
        wav.extend_from_slice(b"data");
        wav.extend_from_slice(&2u32.to_le_bytes());
        wav.extend_from_slice(&[0x34, 0x12]);
        wav
    }

    #[test]
    fn test_probe_and_open_input() {
        let registry = FormatRegistry::with_builtin();
        let mut io = IoContext::new(Box::new(MemoryBackend::from_data(tiny_wav())));
        let result = registry.probe_input(&mut io, None).unwrap();
        assert_eq!(result.format_id, FormatId::Wav);
        assert_eq!(result.score, SCORE_MAX);
        // 探测后回到起始位置
        assert_eq!(io.position().unwrap(), 0);

        let mut demuxer = registry.open_input(&mut io, Some("x.wav")).unwrap();
        let pkt = demuxer.read_packet(&mut io).unwrap();
        assert_eq!(pkt.data.as_ref(), &[0x34, 0x12]);
    }

    #[test]
    fn test_probe_by_extension() {
        let registry = FormatRegistry::with_builtin();
        let result = registry.probe(b"garbage", Some("clip.wav")).unwrap();
        assert_eq!(result.score, SCORE_EXTENSION);
        assert!(registry.probe(b"garbage", Some("clip.bin")).is_none());
    }

    #[test]
    fn test_format_not_found() {
        let registry = FormatRegistry::with_builtin();
        assert!(matches!(
            registry.create_muxer(FormatId::Matroska),
            Err(ReelError::FormatNotFound(_))
        ));
        assert_eq!(registry.list_muxers(), vec![(FormatId::Wav, "wav")]);
    }
}
