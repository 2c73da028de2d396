use clap::Parser;
use log::debug;

use imcluster::cli::SubCommandExtend;
use imcluster::config::{Opts, SubCommand};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let opts = Opts::parse();
    rayon::ThreadPoolBuilder::new().num_threads(opts.jobs).build_global()?;
    debug!("使用 {} 个线程", opts.jobs);

    match &opts.subcmd {
        SubCommand::Cluster(config) => config.run(&opts),
        SubCommand::Meta(config) => config.run(&opts),
        SubCommand::Export(config) => config.run(&opts),
    }
}
