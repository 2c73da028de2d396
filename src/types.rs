use std::path::{Path, PathBuf};

use ndarray::Array2;

/// 聚类标签，`NOISE` 表示未归入任何聚类的离群点
pub type Label = i32;

pub const NOISE: Label = -1;

/// 单张图片及其聚类结果
///
/// 像素取值范围为 `[0, 1]`（灰度）或 `{0, 1}`（二值掩码），1 表示墨迹，0 表示背景
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRecord {
    pub name: String,
    pub path: PathBuf,
    pub image: Array2<f32>,
    pub cluster: Option<Label>,
}

impl ImageRecord {
    pub fn new(path: impl Into<PathBuf>, image: Array2<f32>) -> Self {
        let path = path.into();
        Self { name: file_name(&path), path, image, cluster: None }
    }

    /// 图片尺寸 (行, 列)
    pub fn shape(&self) -> (usize, usize) {
        self.image.dim()
    }
}

/// 一个聚类及其包含的图片，图片顺序与输入顺序一致
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterRecord {
    pub id: Label,
    pub images: Vec<ImageRecord>,
}

impl ClusterRecord {
    pub fn is_noise(&self) -> bool {
        self.id == NOISE
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_name_from_path() {
        let record = ImageRecord::new("/data/scans/page-01.png", Array2::zeros((2, 3)));
        assert_eq!(record.name, "page-01.png");
        assert_eq!(record.shape(), (2, 3));
        assert_eq!(record.cluster, None);
    }
}
