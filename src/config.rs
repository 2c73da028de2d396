use clap::{Parser, Subcommand, ValueEnum};

use crate::advisor::ClusterCountAdvisor;
use crate::cli::*;
use crate::dbscan::{Dbscan, MinSamplesPolicy};
use crate::error::Result;
use crate::features::{ExtractorSpec, FeatureComposer};
use crate::model::{ClusterModelAdapter, CountPolicy, CountedAlgorithm};
use crate::reader::ImageReader;
use crate::score::ScoreCalculator;

#[derive(Parser, Debug, Clone)]
pub struct FeatureOptions {
    /// 特征提取器，可以指定多次，按顺序拼接
    /// 例：`iou:3x3`、`match:2x2`、`shape`、`density`
    #[arg(short, long = "feature", value_name = "EXTRACTOR", default_value = "iou:3x3", verbatim_doc_comment)]
    pub features: Vec<ExtractorSpec>,
    /// 在每个窗口特征向量之后附加一份按最小值/最大值缩放到 [0, 1] 的副本，窗口特征宽度翻倍
    #[arg(long)]
    pub augment_scaled: bool,
    /// 图片读取方式
    #[arg(long, value_enum, default_value_t = ImageReader::Mask)]
    pub reader: ImageReader,
}

impl FeatureOptions {
    pub fn composer(&self) -> Result<FeatureComposer> {
        FeatureComposer::from_specs(&self.features, self.augment_scaled)
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    /// Ward 层次聚类
    Ward,
    /// k-means 聚类
    Kmeans,
    /// DBSCAN 密度聚类，不需要聚类数量
    Dbscan,
}

#[derive(Parser, Debug, Clone)]
pub struct ModelOptions {
    /// 聚类算法
    #[arg(short, long, value_enum, default_value_t = Algorithm::Ward)]
    pub algorithm: Algorithm,
    /// 聚类数量，不指定时根据图片数量推荐
    #[arg(short = 'k', long, value_name = "K")]
    pub clusters: Option<usize>,
    /// 推荐聚类数量时的下限
    #[arg(long, value_name = "N", default_value_t = ClusterCountAdvisor::DEFAULT_BASE)]
    pub advisor_base: usize,
    /// 推荐聚类数量时 log10(max(n / DIVISOR, 1)) 的系数
    #[arg(long, value_name = "SCALE", default_value_t = ClusterCountAdvisor::DEFAULT_SCALE)]
    pub advisor_scale: f64,
    /// 推荐聚类数量时 n 的除数
    #[arg(long, value_name = "DIVISOR", default_value_t = ClusterCountAdvisor::DEFAULT_DIVISOR)]
    pub advisor_divisor: f64,
    /// k-means 最大迭代次数
    #[arg(long, value_name = "N", default_value_t = 300)]
    pub max_iter: usize,
    /// k-means 初始化使用的随机种子
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
    /// DBSCAN 邻域半径
    #[arg(long, default_value_t = 0.5)]
    pub eps: f64,
    /// DBSCAN 核心点的最少邻居数量（包含自身）
    #[arg(long, value_name = "N", default_value_t = 5)]
    pub min_samples: usize,
    /// 按图片数量的比例确定 DBSCAN 最少邻居数量（向上取整），指定后忽略 --min-samples
    /// 例：0.02 表示每 50 张图片需要 1 个邻居
    #[arg(long, value_name = "RATIO", conflicts_with = "min_samples", verbatim_doc_comment)]
    pub min_samples_ratio: Option<f64>,
    /// DBSCAN 聚类前将每一列特征标准化为均值 0、标准差 1
    #[arg(long)]
    pub standardize: bool,
    /// 计算轮廓系数和 CH 指数时排除离群点
    #[arg(long)]
    pub exclude_noise: bool,
}

impl ModelOptions {
    pub fn model(&self) -> Result<ClusterModelAdapter> {
        let policy = match self.clusters {
            Some(k) => CountPolicy::Fixed(k),
            None => CountPolicy::Advised(ClusterCountAdvisor::new(
                self.advisor_base,
                self.advisor_scale,
                self.advisor_divisor,
            )?),
        };
        match self.algorithm {
            Algorithm::Ward => ClusterModelAdapter::counted(CountedAlgorithm::Ward, policy),
            Algorithm::Kmeans => ClusterModelAdapter::counted(
                CountedAlgorithm::KMeans { max_iter: self.max_iter, seed: self.seed },
                policy,
            ),
            Algorithm::Dbscan => {
                let min_samples = match self.min_samples_ratio {
                    Some(ratio) => MinSamplesPolicy::PerSamples(ratio),
                    None => MinSamplesPolicy::Fixed(self.min_samples),
                };
                let dbscan = Dbscan::with_policy(self.eps, min_samples)?.standardized(self.standardize);
                Ok(ClusterModelAdapter::density(dbscan))
            }
        }
    }

    pub fn scorer(&self) -> ScoreCalculator {
        ScoreCalculator::new(!self.exclude_noise)
    }
}

#[derive(Parser, Debug, Clone)]
#[command(name = "imcluster", version)]
pub struct Opts {
    #[command(subcommand)]
    pub subcmd: SubCommand,
    /// 并行处理使用的线程数量
    #[arg(short, long, value_name = "N", default_value_t = num_cpus::get())]
    pub jobs: usize,
    /// 显示进度条
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum SubCommand {
    /// 对元数据文件中的图片聚类
    Cluster(ClusterCommand),
    /// 扫描目录，生成元数据文件
    Meta(MetaCommand),
    /// 导出特征矩阵为 npy 文件
    Export(ExportCommand),
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// 表格格式
    Table,
    /// JSON 格式
    Json,
}
