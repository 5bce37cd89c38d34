//! 容器格式标识符.

use std::fmt;

/// 容器格式标识符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum FormatId {
    /// RIFF WAVE
    Wav,
    /// Matroska
    Matroska,
    /// MPEG-4 Part 14
    Mp4,
}

const ALL: &[FormatId] = &[FormatId::Wav, FormatId::Matroska, FormatId::Mp4];

impl FormatId {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Matroska => "matroska",
            Self::Mp4 => "mp4",
        }
    }

    /// 常见文件扩展名 (小写, 不含点)
    pub const fn extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Wav => &["wav", "wave"],
            Self::Matroska => &["mkv", "mka"],
            Self::Mp4 => &["mp4", "m4a", "mov"],
        }
    }

    /// 按格式名查找, 如 `wav`
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.to_ascii_lowercase();
        ALL.iter().copied().find(|id| id.name() == name)
    }

    /// 按文件扩展名推断格式
    pub fn from_filename(filename: &str) -> Option<Self> {
        let ext = std::path::Path::new(filename)
            .extension()?
            .to_str()?
            .to_ascii_lowercase();
        ALL.iter()
            .copied()
            .find(|id| id.extensions().contains(&ext.as_str()))
    }
}

impl fmt::Display for FormatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_filename() {
        assert_eq!(FormatId::from_filename("out/a.WAV"), Some(FormatId::Wav));
        assert_eq!(FormatId::from_filename("movie.mkv"), Some(FormatId::Matroska));
        assert_eq!(FormatId::from_filename("noext"), None);
        assert_eq!(FormatId::from_filename("a.xyz"), None);
    }

    #[test]
    fn test_from_name() {
        assert_eq!(FormatId::from_name("WAV"), Some(FormatId::Wav));
        assert_eq!(FormatId::from_name("avi"), None);
    }
}
