use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::index::sample;

use crate::cli::SubCommandExtend;
use crate::reader::scan_images;
use crate::Opts;

#[derive(Parser, Debug, Clone)]
pub struct MetaCommand {
    /// 图片所在目录
    pub images_dir: PathBuf,
    /// 输出的元数据文件
    #[arg(short, long, value_name = "FILE", default_value = "metadata.txt")]
    pub output_file: PathBuf,
    /// 随机抽取的图片数量，不指定时保留全部图片
    #[arg(short, long, value_name = "N")]
    pub n_images: Option<usize>,
    /// 扫描的文件后缀名，多个后缀用逗号分隔
    #[arg(short, long, default_value = "jpg,png")]
    pub suffix: String,
    /// 抽样使用的随机种子
    #[arg(long)]
    pub seed: Option<u64>,
}

impl SubCommandExtend for MetaCommand {
    fn run(&self, _opts: &Opts) -> Result<()> {
        let dir = fs::canonicalize(&self.images_dir)
            .with_context(|| format!("无法访问目录 {}", self.images_dir.display()))?;
        let paths = scan_images(&dir, &self.suffix)?;

        let paths = match self.n_images {
            Some(n) => {
                if n > paths.len() {
                    warn!("图片只有 {} 张，少于要求的 {} 张", paths.len(), n);
                }
                let mut rng = match self.seed {
                    Some(seed) => StdRng::seed_from_u64(seed),
                    None => StdRng::from_os_rng(),
                };
                sample_paths(paths, n, &mut rng)
            }
            None => paths,
        };

        let text = paths.iter().map(|p| format!("{}\n", p.display())).collect::<String>();
        fs::write(&self.output_file, text)
            .with_context(|| format!("无法写入 {}", self.output_file.display()))?;
        info!("已写入 {} 条记录到 {}", paths.len(), self.output_file.display());
        Ok(())
    }
}

/// 随机抽取至多 `n` 个路径，保持原有顺序
pub fn sample_paths(paths: Vec<PathBuf>, n: usize, rng: &mut StdRng) -> Vec<PathBuf> {
    if n >= paths.len() {
        return paths;
    }
    let mut picked = sample(rng, paths.len(), n).into_vec();
    picked.sort_unstable();
    picked.into_iter().map(|i| paths[i].clone()).collect()
}
