//! 元数据与图片读取
//!
//! 元数据文件每行一个图片路径。图片读取后转换为墨迹强度：1 为墨迹，0 为背景。

use std::fs;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use image::GrayImage;
use imageproc::contrast::otsu_level;
use log::info;
use ndarray::Array2;
use rayon::prelude::*;
use regex::Regex;
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::progress::ProgressSink;
use crate::types::{ImageRecord, file_name};

/// 元数据中的一条记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageEntry {
    pub name: String,
    pub path: PathBuf,
}

impl ImageEntry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self { name: file_name(&path), path }
    }
}

/// 读取元数据文件，忽略空行，保持原有顺序
pub fn read_metadata(path: impl AsRef<Path>) -> Result<Vec<ImageEntry>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    let entries = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ImageEntry::new)
        .collect::<Vec<_>>();
    info!("从 {} 读取了 {} 条记录", path.display(), entries.len());
    Ok(entries)
}

/// 递归扫描目录，返回后缀名匹配的文件，按路径排序
///
/// `suffix` 为逗号分隔的后缀列表，不区分大小写，例如 `png,jpg`
pub fn scan_images(dir: impl AsRef<Path>, suffix: &str) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let alternatives = suffix.split(',').map(|s| regex::escape(s.trim())).collect::<Vec<_>>();
    let re_suf = Regex::new(&format!("(?i)^({})$", alternatives.join("|")))
        .map_err(|e| Error::InvalidConfiguration(format!("无效的后缀名 {suffix}: {e}")))?;

    info!("开始扫描目录: {}", dir.display());
    let mut paths = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            Error::io(&path, e.into())
        })?;
        let path = entry.path();
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(ext) = path.extension() else {
            continue;
        };
        if re_suf.is_match(&ext.to_string_lossy()) {
            paths.push(path.to_path_buf());
        }
    }
    info!("扫描完成，共 {} 张图片", paths.len());
    Ok(paths)
}

/// 图片的读取方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ImageReader {
    /// 灰度化后按 Otsu 阈值二值化，得到 {0, 1} 掩码
    #[default]
    Mask,
    /// 灰度值反转并缩放到 [0, 1]
    Greyscale,
}

impl ImageReader {
    pub fn decode(&self, image: &GrayImage) -> Array2<f32> {
        match self {
            ImageReader::Mask => decode_mask(image),
            ImageReader::Greyscale => decode_greyscale(image),
        }
    }

    pub fn read(&self, entry: &ImageEntry) -> Result<ImageRecord> {
        let gray = image::open(&entry.path)
            .map_err(|source| Error::Decode { path: entry.path.clone(), source })?
            .to_luma8();
        let mut record = ImageRecord::new(&entry.path, self.decode(&gray));
        record.name = entry.name.clone();
        Ok(record)
    }

    /// 并行读取所有图片，结果顺序与输入一致，任何一张失败则整体失败
    pub fn read_all(
        &self,
        entries: &[ImageEntry],
        progress: &dyn ProgressSink,
    ) -> Result<Vec<ImageRecord>> {
        progress.begin("读取图片", entries.len());
        let images = entries
            .par_iter()
            .map(|entry| {
                let record = self.read(entry);
                progress.advance();
                record
            })
            .collect::<Result<Vec<_>>>()?;
        progress.finish("读取完成");
        Ok(images)
    }
}

fn to_array(image: &GrayImage, f: impl Fn(u8) -> f32) -> Array2<f32> {
    let (w, h) = image.dimensions();
    Array2::from_shape_fn((h as usize, w as usize), |(r, c)| {
        f(image.get_pixel(c as u32, r as u32).0[0])
    })
}

/// 不高于 Otsu 阈值的像素为墨迹
pub fn decode_mask(image: &GrayImage) -> Array2<f32> {
    let level = otsu_level(image);
    to_array(image, |p| if p <= level { 1.0 } else { 0.0 })
}

pub fn decode_greyscale(image: &GrayImage) -> Array2<f32> {
    to_array(image, |p| 1.0 - p as f32 / 255.0)
}

#[cfg(test)]
mod tests {
    use image::Luma;
    use tempfile::tempdir;

    use super::*;
    use crate::progress::testing::CountingProgress;

    fn stripes() -> GrayImage {
        GrayImage::from_fn(4, 2, |x, _| if x < 2 { Luma([10]) } else { Luma([240]) })
    }

    #[test]
    fn test_decode_mask() {
        let mask = decode_mask(&stripes());
        assert_eq!(mask.dim(), (2, 4));
        assert_eq!(mask.row(0).to_vec(), vec![1.0, 1.0, 0.0, 0.0]);
        assert_eq!(mask.row(1).to_vec(), vec![1.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_decode_greyscale() {
        let image = GrayImage::from_fn(2, 1, |x, _| Luma([if x == 0 { 0 } else { 255 }]));
        let grey = decode_greyscale(&image);
        assert_eq!(grey.row(0).to_vec(), vec![1.0, 0.0]);
    }

    #[test]
    fn test_read_metadata_skips_blank_lines() {
        let tmp = tempdir().unwrap();
        let meta = tmp.path().join("meta.txt");
        fs::write(&meta, "/a/1.png\n\n  /b/2.png  \n\n").unwrap();
        let entries = read_metadata(&meta).unwrap();
        assert_eq!(entries, vec![ImageEntry::new("/a/1.png"), ImageEntry::new("/b/2.png")]);
        assert_eq!(entries[1].name, "2.png");
    }

    #[test]
    fn test_read_metadata_missing_file() {
        assert!(matches!(read_metadata("/definitely/not/here.txt"), Err(Error::Io { .. })));
    }

    #[test]
    fn test_read_all_preserves_order() {
        let tmp = tempdir().unwrap();
        let entries = (0..6)
            .map(|i| {
                let path = tmp.path().join(format!("{i}.png"));
                GrayImage::from_fn(3, 3, |x, _| Luma([if x as usize == i % 3 { 0 } else { 255 }]))
                    .save(&path)
                    .unwrap();
                ImageEntry::new(path)
            })
            .collect::<Vec<_>>();

        let progress = CountingProgress::default();
        let images = ImageReader::Greyscale.read_all(&entries, &progress).unwrap();
        assert_eq!(progress.advanced(), 6);
        for (i, record) in images.iter().enumerate() {
            assert_eq!(record.name, format!("{i}.png"));
            assert_eq!(record.image[[0, i % 3]], 1.0);
        }
    }

    #[test]
    fn test_read_invalid_image() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("broken.png");
        fs::write(&path, b"not an image").unwrap();
        let err = ImageReader::Mask.read(&ImageEntry::new(&path)).unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
    }

    #[test]
    fn test_scan_images() {
        let tmp = tempdir().unwrap();
        fs::create_dir(tmp.path().join("sub")).unwrap();
        for name in ["b.png", "a.JPG", "notes.txt", "sub/c.png"] {
            fs::write(tmp.path().join(name), b"").unwrap();
        }
        let found = scan_images(tmp.path(), "png,jpg").unwrap();
        let names = found.iter().map(|p| file_name(p)).collect::<Vec<_>>();
        assert_eq!(names, vec!["a.JPG", "b.png", "c.png"]);
    }
}
