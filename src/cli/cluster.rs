use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::info;

use crate::assembler::ClusterAssembler;
use crate::cli::SubCommandExtend;
use crate::config::{FeatureOptions, ModelOptions, OutputFormat};
use crate::pipeline::Pipeline;
use crate::progress::progress_sink;
use crate::reader::read_metadata;
use crate::writer::{ClusterWriter, CompositeWriter};
use crate::Opts;

#[derive(Parser, Debug, Clone)]
pub struct ClusterCommand {
    #[command(flatten)]
    pub feature: FeatureOptions,
    #[command(flatten)]
    pub model: ModelOptions,
    /// 元数据文件，每行一个图片路径
    #[arg(short, long, value_name = "FILE")]
    pub input_file: PathBuf,
    /// 输出目录，不指定时不输出文件
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,
    /// 不输出 HTML 预览
    #[arg(long)]
    pub no_html: bool,
    /// 跳过聚类质量评估
    #[arg(long)]
    pub no_score: bool,
    /// 评估结果的输出格式
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub output_format: OutputFormat,
}

impl SubCommandExtend for ClusterCommand {
    fn run(&self, opts: &Opts) -> Result<()> {
        let composer = self.feature.composer()?;
        let model = self.model.model()?;
        let writer: Box<dyn ClusterWriter> = match &self.output_dir {
            Some(dir) => Box::new(CompositeWriter::new(dir, !self.no_html)?),
            None => Box::new(CompositeWriter::empty()),
        };

        let entries = read_metadata(&self.input_file)?;
        let progress = progress_sink(opts.verbose);
        let images = self.feature.reader.read_all(&entries, progress.as_ref())?;

        let mut pipeline = Pipeline::new(composer, model, ClusterAssembler, writer, progress)
            .with_scorer(self.model.scorer());
        for cluster in pipeline.fit(images)? {
            info!("聚类 {}: {} 张图片", cluster.id, cluster.len());
        }

        if self.no_score {
            return Ok(());
        }
        let score = pipeline.score()?;
        match self.output_format {
            OutputFormat::Table => println!("{}", score),
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(score)?),
        }
        Ok(())
    }
}
