//! 编解码器注册表.
//!
//! 按 [`CodecId`] 或名称查找并实例化编解码器. 同一 `CodecId` 可以注册多个实现,
//! 先注册者优先.

use std::collections::HashMap;

use reel_core::{ReelError, ReelResult};

use crate::codec_id::CodecId;
use crate::decoder::Decoder;
use crate::encoder::Encoder;

/// 解码器工厂函数
pub type DecoderFactory = fn() -> ReelResult<Box<dyn Decoder>>;

/// 编码器工厂函数
pub type EncoderFactory = fn() -> ReelResult<Box<dyn Encoder>>;

struct Entry<F> {
    name: String,
    factory: F,
}

/// 编解码器注册表
pub struct CodecRegistry {
    decoders: HashMap<CodecId, Vec<Entry<DecoderFactory>>>,
    encoders: HashMap<CodecId, Vec<Entry<EncoderFactory>>>,
}

impl CodecRegistry {
    /// 创建空注册表
    pub fn new() -> Self {
        Self {
            decoders: HashMap::new(),
            encoders: HashMap::new(),
        }
    }

    /// 创建已注册全部内置编解码器的注册表
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        crate::register_all(&mut registry);
        registry
    }

    pub fn register_decoder(
        &mut self,
        codec_id: CodecId,
        name: impl Into<String>,
        factory: DecoderFactory,
    ) {
        self.decoders.entry(codec_id).or_default().push(Entry {
            name: name.into(),
            factory,
        });
    }

    pub fn register_encoder(
        &mut self,
        codec_id: CodecId,
        name: impl Into<String>,
        factory: EncoderFactory,
    ) {
        self.encoders.entry(codec_id).or_default().push(Entry {
            name: name.into(),
            factory,
        });
    }

    /// 创建 `codec_id` 优先级最高的解码器
    pub fn create_decoder(&self, codec_id: CodecId) -> ReelResult<Box<dyn Decoder>> {
        let entry = self
            .decoders
            .get(&codec_id)
            .and_then(|entries| entries.first())
            .ok_or_else(|| ReelError::CodecNotFound(format!("没有 {codec_id} 的解码器")))?;
        (entry.factory)()
    }

    /// 创建 `codec_id` 优先级最高的编码器
    pub fn create_encoder(&self, codec_id: CodecId) -> ReelResult<Box<dyn Encoder>> {
        let entry = self
            .encoders
            .get(&codec_id)
            .and_then(|entries| entries.first())
            .ok_or_else(|| ReelError::CodecNotFound(format!("没有 {codec_id} 的编码器")))?;
        (entry.factory)()
    }

    /// 按注册名称创建编码器, 如 `pcm_f32le`
    pub fn create_encoder_by_name(&self, name: &str) -> ReelResult<Box<dyn Encoder>> {
        let entry = self
            .encoders
            .values()
            .flatten()
            .find(|e| e.name == name)
            .ok_or_else(|| ReelError::CodecNotFound(format!("没有名为 {name} 的编码器")))?;
        (entry.factory)()
    }

    /// 已注册的解码器 (按名称排序)
    pub fn list_decoders(&self) -> Vec<(CodecId, &str)> {
        list(&self.decoders)
    }

    /// 已注册的编码器 (按名称排序)
    pub fn list_encoders(&self) -> Vec<(CodecId, &str)> {
        list(&self.encoders)
    }
}

fn list<F>(map: &HashMap<CodecId, Vec<Entry<F>>>) -> Vec<(CodecId, &str)> {
    let mut out: Vec<_> = map
        .iter()
        .flat_map(|(id, entries)| entries.iter().map(move |e| (*id, e.name.as_str())))
        .collect();
    out.sort_by(|a, b| a.1.cmp(b.1));
    out
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::new()
    }
}
