//! 聚类流程
//!
//! 提取特征 → 聚类 → 归类并输出，每完成一步推进一次状态。评估只能在聚类完成之后进行。

use std::fmt;
use std::time::Instant;

use log::{info, warn};
use ndarray::Array2;

use crate::assembler::ClusterAssembler;
use crate::error::{Error, Result};
use crate::features::FeatureComposer;
use crate::model::ClusterModelAdapter;
use crate::progress::ProgressSink;
use crate::score::{Score, ScoreCalculator};
use crate::types::{ClusterRecord, ImageRecord, Label};
use crate::writer::ClusterWriter;

/// 可拟合的处理步骤
///
/// `fit` 从输入中学习参数，`transform` 使用这些参数处理同一输入
pub trait Stage<I: ?Sized> {
    type Fitted;
    type Output;

    fn fit(&self, input: &I, progress: &dyn ProgressSink) -> Result<Self::Fitted>;

    fn transform(
        &self,
        fitted: &Self::Fitted,
        input: &I,
        progress: &dyn ProgressSink,
    ) -> Result<Self::Output>;

    fn fit_transform(
        &self,
        input: &I,
        progress: &dyn ProgressSink,
    ) -> Result<(Self::Fitted, Self::Output)> {
        let fitted = self.fit(input, progress)?;
        let output = self.transform(&fitted, input, progress)?;
        Ok((fitted, output))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PipelineState {
    Unfit,
    Preprocessed,
    Clustered,
    Postprocessed,
}

impl PipelineState {
    pub fn name(&self) -> &'static str {
        match self {
            PipelineState::Unfit => "unfit",
            PipelineState::Preprocessed => "preprocessed",
            PipelineState::Clustered => "clustered",
            PipelineState::Postprocessed => "postprocessed",
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub struct Pipeline {
    composer: FeatureComposer,
    model: ClusterModelAdapter,
    assembler: ClusterAssembler,
    writer: Box<dyn ClusterWriter>,
    scorer: ScoreCalculator,
    progress: Box<dyn ProgressSink>,

    state: PipelineState,
    features: Option<Array2<f64>>,
    labels: Option<Vec<Label>>,
    clusters: Option<Vec<ClusterRecord>>,
    score: Option<Score>,
}

impl Pipeline {
    pub fn new(
        composer: FeatureComposer,
        model: ClusterModelAdapter,
        assembler: ClusterAssembler,
        writer: Box<dyn ClusterWriter>,
        progress: Box<dyn ProgressSink>,
    ) -> Self {
        Self {
            composer,
            model,
            assembler,
            writer,
            scorer: ScoreCalculator::default(),
            progress,
            state: PipelineState::Unfit,
            features: None,
            labels: None,
            clusters: None,
            score: None,
        }
    }

    pub fn with_scorer(mut self, scorer: ScoreCalculator) -> Self {
        self.scorer = scorer;
        self
    }

    /// 对一批图片完整执行一次聚类流程，之前的结果会被清空
    ///
    /// 输出失败时流程停留在 `Clustered` 状态，仍可进行评估
    pub fn fit(&mut self, images: Vec<ImageRecord>) -> Result<&[ClusterRecord]> {
        self.reset();
        let total = Instant::now();
        info!("开始聚类 {} 张图片", images.len());

        let start = Instant::now();
        let features = self.composer.compose(&images, self.progress.as_ref())?;
        info!("特征矩阵 {:?}，耗时 {:.2?}", features.dim(), start.elapsed());
        let features = self.features.insert(features);
        self.state = PipelineState::Preprocessed;

        let start = Instant::now();
        let labels = self.model.fit_predict(features.view())?;
        info!("聚类完成，耗时 {:.2?}", start.elapsed());
        let labels = self.labels.insert(labels);
        self.state = PipelineState::Clustered;

        let clusters = self.assembler.assemble(&images, labels, self.progress.as_ref())?;
        info!("共 {} 个聚类", clusters.len());
        let clusters = self.clusters.insert(clusters);
        if let Err(e) = self.writer.write(clusters) {
            warn!("输出聚类结果失败: {}", e);
            return Err(e);
        }
        self.state = PipelineState::Postprocessed;

        info!("聚类流程完成，总耗时 {:.2?}", total.elapsed());
        Ok(clusters.as_slice())
    }

    /// 评估最近一次聚类结果
    pub fn score(&mut self) -> Result<&Score> {
        let (Some(features), Some(labels)) = (&self.features, &self.labels) else {
            return Err(Error::IllegalState { operation: "score", state: self.state.name() });
        };
        if self.state < PipelineState::Clustered {
            return Err(Error::IllegalState { operation: "score", state: self.state.name() });
        }
        let score = self.scorer.score(features.view(), labels)?;
        Ok(&*self.score.insert(score))
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn features(&self) -> Option<&Array2<f64>> {
        self.features.as_ref()
    }

    pub fn labels(&self) -> Option<&[Label]> {
        self.labels.as_deref()
    }

    pub fn clusters(&self) -> Option<&[ClusterRecord]> {
        self.clusters.as_deref()
    }

    pub fn last_score(&self) -> Option<&Score> {
        self.score.as_ref()
    }

    fn reset(&mut self) {
        self.state = PipelineState::Unfit;
        self.features = None;
        self.labels = None;
        self.clusters = None;
        self.score = None;
    }
}
