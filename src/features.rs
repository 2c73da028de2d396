//! 特征组合与按列缩放
//!
//! 多个提取器的输出按列拼接为特征矩阵，随后每一列按整批图片的最小值/最大值缩放到 [0, 1]。
//! 缩放后每张图片的特征依赖于同批次的其他图片。

use std::fmt;
use std::str::FromStr;

use log::debug;
use ndarray::{Array1, Array2, ArrayView2, Axis};
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::pipeline::Stage;
use crate::progress::ProgressSink;
use crate::types::ImageRecord;
use crate::vectorizer::*;

/// 提取器描述，命令行中写作 `match:2x2`、`iou:3x3`、`shape` 或 `density`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractorSpec {
    Window { similarity: Similarity, rows: usize, cols: usize },
    Shape,
    Density,
}

impl ExtractorSpec {
    pub fn build(&self, augment_with_scaled: bool) -> Result<Box<dyn FeatureExtractor>> {
        Ok(match *self {
            ExtractorSpec::Window { similarity, rows, cols } => {
                Box::new(WindowVectorizer::new(rows, cols, similarity, augment_with_scaled)?)
            }
            ExtractorSpec::Shape => Box::new(ShapeExtractor),
            ExtractorSpec::Density => Box::new(DensityExtractor),
        })
    }
}

impl FromStr for ExtractorSpec {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "shape" => Ok(Self::Shape),
            "density" => Ok(Self::Density),
            _ => {
                let (similarity, shape) =
                    s.split_once(':').ok_or_else(|| format!("无效的特征提取器: {}", s))?;
                let similarity = similarity.parse()?;
                let (rows, cols) = parse_shape(shape)?;
                Ok(Self::Window { similarity, rows, cols })
            }
        }
    }
}

impl fmt::Display for ExtractorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractorSpec::Window { similarity, rows, cols } => {
                write!(f, "{similarity}:{rows}x{cols}")
            }
            ExtractorSpec::Shape => write!(f, "shape"),
            ExtractorSpec::Density => write!(f, "density"),
        }
    }
}

/// 解析 `ROWSxCOLS` 形式的尺寸
pub fn parse_shape(s: &str) -> std::result::Result<(usize, usize), String> {
    let parts: Vec<&str> = s.split('x').collect();
    if parts.len() != 2 {
        return Err(format!("无效的尺寸: {}", s));
    }
    let rows = parts[0].parse().map_err(|_| format!("无效的尺寸: {}", s))?;
    let cols = parts[1].parse().map_err(|_| format!("无效的尺寸: {}", s))?;
    Ok((rows, cols))
}

/// 按列缩放到 [0, 1]，常数列缩放为 0
#[derive(Debug, Clone, PartialEq)]
pub struct MinMaxScaler {
    min: Array1<f64>,
    max: Array1<f64>,
}

impl MinMaxScaler {
    pub fn fit(x: ArrayView2<'_, f64>) -> Self {
        let ncols = x.ncols();
        if x.nrows() == 0 {
            return Self { min: Array1::zeros(ncols), max: Array1::zeros(ncols) };
        }
        let min = x.fold_axis(Axis(0), f64::INFINITY, |&acc, &v| acc.min(v));
        let max = x.fold_axis(Axis(0), f64::NEG_INFINITY, |&acc, &v| acc.max(v));
        Self { min, max }
    }

    pub fn transform(&self, x: ArrayView2<'_, f64>) -> Array2<f64> {
        let mut out = x.to_owned();
        for (j, mut column) in out.axis_iter_mut(Axis(1)).enumerate() {
            let (min, range) = (self.min[j], self.max[j] - self.min[j]);
            if range > 0.0 {
                column.mapv_inplace(|v| (v - min) / range);
            } else {
                column.fill(0.0);
            }
        }
        out
    }
}

/// 拟合结果：原始特征矩阵和按列缩放参数
#[derive(Debug, Clone)]
pub struct FittedFeatures {
    pub raw: Array2<f64>,
    pub scaler: MinMaxScaler,
}

pub struct FeatureComposer {
    extractors: Vec<Box<dyn FeatureExtractor>>,
}

impl FeatureComposer {
    pub fn new(extractors: Vec<Box<dyn FeatureExtractor>>) -> Self {
        Self { extractors }
    }

    pub fn from_specs(specs: &[ExtractorSpec], augment_with_scaled: bool) -> Result<Self> {
        if specs.is_empty() {
            return Err(Error::InvalidConfiguration("至少需要一个特征提取器".to_string()));
        }
        let extractors =
            specs.iter().map(|spec| spec.build(augment_with_scaled)).collect::<Result<_>>()?;
        Ok(Self::new(extractors))
    }

    /// 特征总宽度
    pub fn width(&self) -> usize {
        self.extractors.iter().map(|e| e.width()).sum()
    }

    /// 提取并缩放整批图片的特征，行顺序与图片顺序一致
    pub fn compose(
        &self,
        images: &[ImageRecord],
        progress: &dyn ProgressSink,
    ) -> Result<Array2<f64>> {
        let (_, features) = self.fit_transform(images, progress)?;
        Ok(features)
    }

    /// 提取未缩放的特征矩阵
    pub fn extract(
        &self,
        images: &[ImageRecord],
        progress: &dyn ProgressSink,
    ) -> Result<Array2<f64>> {
        if images.is_empty() {
            return Err(Error::invalid_input("features", "图片集为空"));
        }
        if self.extractors.is_empty() {
            return Err(Error::InvalidConfiguration("至少需要一个特征提取器".to_string()));
        }
        let names = self.extractors.iter().map(|e| e.name()).collect::<Vec<_>>();
        debug!("特征提取器: {:?}，特征宽度 {}", names, self.width());

        progress.begin("提取特征", images.len());
        let rows = images
            .par_iter()
            .map(|record| {
                let row = self.extract_one(record).map_err(|e| e.at_path(&record.path));
                progress.advance();
                row
            })
            .collect::<Result<Vec<_>>>()?;
        progress.finish("特征提取完成");

        let width = self.width();
        let data = rows.into_iter().flatten().collect::<Vec<_>>();
        Array2::from_shape_vec((images.len(), width), data)
            .map_err(|e| Error::invalid_input("features", e.to_string()))
    }

    fn extract_one(&self, record: &ImageRecord) -> Result<Vec<f64>> {
        let mut row = Vec::with_capacity(self.width());
        for extractor in &self.extractors {
            let v = extractor.extract(record.image.view())?;
            if v.len() != extractor.width() {
                return Err(Error::invalid_input(
                    "features",
                    format!("{} 输出长度 {}，应为 {}", extractor.name(), v.len(), extractor.width()),
                ));
            }
            row.extend(v);
        }
        Ok(row)
    }
}

impl Stage<[ImageRecord]> for FeatureComposer {
    type Fitted = FittedFeatures;
    type Output = Array2<f64>;

    fn fit(&self, input: &[ImageRecord], progress: &dyn ProgressSink) -> Result<FittedFeatures> {
        let raw = self.extract(input, progress)?;
        let scaler = MinMaxScaler::fit(raw.view());
        Ok(FittedFeatures { raw, scaler })
    }

    fn transform(
        &self,
        fitted: &FittedFeatures,
        input: &[ImageRecord],
        _progress: &dyn ProgressSink,
    ) -> Result<Array2<f64>> {
        if fitted.raw.nrows() != input.len() {
            return Err(Error::invalid_input(
                "features",
                format!("特征矩阵有 {} 行，图片有 {} 张", fitted.raw.nrows(), input.len()),
            ));
        }
        Ok(fitted.scaler.transform(fitted.raw.view()))
    }
}
