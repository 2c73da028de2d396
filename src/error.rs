use std::path::{Path, PathBuf};

use thiserror::Error;

/// 聚类流程中的所有错误，均会中止本次运行
#[derive(Debug, Error)]
pub enum Error {
    /// 配置错误，如滤波器尺寸、聚类数量不合法
    #[error("无效的配置: {0}")]
    InvalidConfiguration(String),

    /// 输入数据错误，如图片集为空、图片小于滤波器窗口
    #[error("[{stage}] 无效的输入: {reason}")]
    InvalidInput { stage: &'static str, reason: String },

    /// 图片无法解码
    #[error("无法读取图片 {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// 在错误的流程状态下调用
    #[error("无法在 {state} 状态下执行 {operation}")]
    IllegalState { operation: &'static str, state: &'static str },

    #[error("读写文件失败 {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub fn invalid_input(stage: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidInput { stage, reason: reason.into() }
    }

    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io { path: path.as_ref().to_path_buf(), source }
    }

    /// 为输入错误附加出错的图片路径
    pub fn at_path(self, path: &Path) -> Self {
        match self {
            Self::InvalidInput { stage, reason } => {
                Self::InvalidInput { stage, reason: format!("{}: {reason}", path.display()) }
            }
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_at_path_keeps_stage() {
        let err = Error::invalid_input("vectorize", "图片过小").at_path(Path::new("/a/b.png"));
        match err {
            Error::InvalidInput { stage, reason } => {
                assert_eq!(stage, "vectorize");
                assert_eq!(reason, "/a/b.png: 图片过小");
            }
            _ => panic!("unexpected variant"),
        }
    }

    #[test]
    fn test_at_path_ignores_other_variants() {
        let err = Error::InvalidConfiguration("k = 0".into()).at_path(Path::new("x"));
        assert!(matches!(err, Error::InvalidConfiguration(_)));
    }
}
