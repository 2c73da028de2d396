use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::info;
use ndarray_npy::write_npy;

use crate::cli::SubCommandExtend;
use crate::config::FeatureOptions;
use crate::progress::progress_sink;
use crate::reader::read_metadata;
use crate::Opts;

#[derive(Parser, Debug, Clone)]
pub struct ExportCommand {
    #[command(flatten)]
    pub feature: FeatureOptions,
    /// 元数据文件，每行一个图片路径
    #[arg(short, long, value_name = "FILE")]
    pub input_file: PathBuf,
    /// 输出的 npy 文件
    #[arg(short, long, value_name = "FILE", default_value = "features.npy")]
    pub output: PathBuf,
    /// 导出未缩放的原始特征
    #[arg(long)]
    pub raw: bool,
}

impl SubCommandExtend for ExportCommand {
    fn run(&self, opts: &Opts) -> Result<()> {
        let composer = self.feature.composer()?;
        let entries = read_metadata(&self.input_file)?;
        let progress = progress_sink(opts.verbose);
        let images = self.feature.reader.read_all(&entries, progress.as_ref())?;

        let data = if self.raw {
            composer.extract(&images, progress.as_ref())?
        } else {
            composer.compose(&images, progress.as_ref())?
        };
        write_npy(&self.output, &data)?;
        info!("已导出 {:?} 特征矩阵到 {}", data.dim(), self.output.display());
        Ok(())
    }
}
