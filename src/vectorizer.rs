//! 图片到特征向量的转换
//!
//! [`WindowVectorizer`] 用滤波器组中的每个滤波器在图片上滑动比较，
//! 将所有窗口位置上的得分累加为每个滤波器一个数值。

use std::fmt;
use std::str::FromStr;

use ndarray::ArrayView2;

use crate::error::{Error, Result};
use crate::filter::FilterBank;
use crate::utils::minmax_scale;

/// 单张图片的特征提取器，输出宽度固定
pub trait FeatureExtractor: Send + Sync {
    /// 用于日志和进度显示的名称
    fn name(&self) -> String;
    /// 输出向量的长度
    fn width(&self) -> usize;
    fn extract(&self, image: ArrayView2<'_, f32>) -> Result<Vec<f64>>;
}

/// 窗口与滤波器的相似度计算方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Similarity {
    /// 窗口与滤波器完全相同时计 1
    ExactMatch,
    /// 交并比，灰度数据使用乘积作为交集、概率和作为并集
    Iou,
}

impl fmt::Display for Similarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Similarity::ExactMatch => write!(f, "match"),
            Similarity::Iou => write!(f, "iou"),
        }
    }
}

impl FromStr for Similarity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "match" => Ok(Self::ExactMatch),
            "iou" => Ok(Self::Iou),
            _ => Err(format!("无效的相似度: {}", s)),
        }
    }
}

pub struct WindowVectorizer {
    bank: FilterBank,
    similarity: Similarity,
    augment_with_scaled: bool,
}

impl WindowVectorizer {
    pub fn new(
        rows: usize,
        cols: usize,
        similarity: Similarity,
        augment_with_scaled: bool,
    ) -> Result<Self> {
        let bank = FilterBank::generate(rows, cols)?;
        Ok(Self { bank, similarity, augment_with_scaled })
    }

    pub fn bank(&self) -> &FilterBank {
        &self.bank
    }

    pub fn similarity(&self) -> Similarity {
        self.similarity
    }

    /// 计算单张图片的特征向量，长度为滤波器数量（附加缩放副本时翻倍）
    pub fn vectorize(&self, image: ArrayView2<'_, f32>) -> Result<Vec<f64>> {
        let (rows, cols) = self.bank.shape();
        let (height, width) = image.dim();
        if height < rows || width < cols {
            return Err(Error::invalid_input(
                "vectorize",
                format!("图片尺寸 {height}x{width} 小于滤波器窗口 {rows}x{cols}"),
            ));
        }

        let mut vector = vec![0.0; self.bank.len()];
        match self.similarity {
            Similarity::ExactMatch => self.accumulate_matches(image, &mut vector),
            Similarity::Iou => self.accumulate_iou(image, &mut vector),
        }

        if self.augment_with_scaled {
            let scaled = minmax_scale(&vector);
            vector.extend(scaled);
        }
        Ok(vector)
    }

    /// 二值窗口只可能与一个滤波器完全相同，直接由窗口内容计算出滤波器序号
    fn accumulate_matches(&self, image: ArrayView2<'_, f32>, vector: &mut [f64]) {
        'windows: for window in image.windows(self.bank.shape()) {
            let mut index = 0usize;
            for &v in window.iter() {
                index <<= 1;
                if v == 1.0 {
                    index |= 1;
                } else if v != 0.0 {
                    // 非二值窗口不匹配任何滤波器
                    continue 'windows;
                }
            }
            vector[index] += 1.0;
        }
    }

    fn accumulate_iou(&self, image: ArrayView2<'_, f32>, vector: &mut [f64]) {
        let mut chunk = Vec::with_capacity(self.bank.cells());
        for window in image.windows(self.bank.shape()) {
            chunk.clear();
            chunk.extend(window.iter().map(|&v| v as f64));
            for (i, slot) in vector.iter_mut().enumerate() {
                *slot += iou(self.bank.flat(i), &chunk);
            }
        }
    }
}

impl FeatureExtractor for WindowVectorizer {
    fn name(&self) -> String {
        let (rows, cols) = self.bank.shape();
        format!("{}:{rows}x{cols}", self.similarity)
    }

    fn width(&self) -> usize {
        if self.augment_with_scaled { self.bank.len() * 2 } else { self.bank.len() }
    }

    fn extract(&self, image: ArrayView2<'_, f32>) -> Result<Vec<f64>> {
        self.vectorize(image)
    }
}

/// 滤波器与窗口的交并比，两者均为空时定义为 1
#[inline]
pub fn iou(filter: &[u8], chunk: &[f64]) -> f64 {
    let (mut intersection, mut union) = (0.0, 0.0);
    for (&f, &c) in filter.iter().zip(chunk) {
        let f = f as f64;
        intersection += f * c;
        union += f + c - f * c;
    }
    if union == 0.0 { 1.0 } else { intersection / union }
}

/// 图片尺寸 (行, 列)
#[derive(Debug, Clone, Copy, Default)]
pub struct ShapeExtractor;

impl FeatureExtractor for ShapeExtractor {
    fn name(&self) -> String {
        "shape".to_string()
    }

    fn width(&self) -> usize {
        2
    }

    fn extract(&self, image: ArrayView2<'_, f32>) -> Result<Vec<f64>> {
        let (rows, cols) = image.dim();
        Ok(vec![rows as f64, cols as f64])
    }
}

/// 墨迹密度，即像素平均值
#[derive(Debug, Clone, Copy, Default)]
pub struct DensityExtractor;

impl FeatureExtractor for DensityExtractor {
    fn name(&self) -> String {
        "density".to_string()
    }

    fn width(&self) -> usize {
        1
    }

    fn extract(&self, image: ArrayView2<'_, f32>) -> Result<Vec<f64>> {
        if image.is_empty() {
            return Err(Error::invalid_input("density", "图片为空"));
        }
        let sum: f64 = image.iter().map(|&v| v as f64).sum();
        Ok(vec![sum / image.len() as f64])
    }
}
