//! # reel-codec
//!
//! 编解码器框架: Packet/Frame 抽象, `Decoder`/`Encoder` trait 与注册表.
//!
//! 内置编解码器只有 PCM 与 RawVideo 两类, 其余编解码器 (H.264, AAC 等) 通过
//! [`CodecRegistry`] 的工厂函数从外部注册.
//!
//! ```rust
//! use reel_codec::{CodecId, CodecRegistry};
//!
//! let mut reg = CodecRegistry::new();
//! reel_codec::register_all(&mut reg);
//!
//! let decoder = reg.create_decoder(CodecId::PcmS16le).unwrap();
//! let encoder = reg.create_encoder_by_name("pcm_f32le").unwrap();
//! assert_eq!(decoder.codec_id(), CodecId::PcmS16le);
//! assert_eq!(encoder.codec_id(), CodecId::PcmF32le);
//! ```

pub mod codec_id;
pub mod codec_parameters;
pub mod decoder;
pub mod decoders;
pub mod encoder;
pub mod encoders;
pub mod frame;
pub mod packet;
pub mod registry;

pub use codec_id::CodecId;
pub use codec_parameters::{AudioCodecParams, CodecParameters, CodecParamsType, VideoCodecParams};
pub use decoder::Decoder;
pub use encoder::{CodecCapabilities, Encoder};
pub use frame::{AudioFrame, Frame, VideoFrame};
pub use packet::Packet;
pub use registry::CodecRegistry;

/// 注册所有内置编解码器
pub fn register_all(registry: &mut CodecRegistry) {
    decoders::register_all_decoders(registry);
    encoders::register_all_encoders(registry);
}
