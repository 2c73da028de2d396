mod cluster;
mod export;
mod meta;

pub use cluster::*;
pub use export::*;
pub use meta::*;

use crate::config::Opts;

pub trait SubCommandExtend {
    fn run(&self, opts: &Opts) -> anyhow::Result<()>;
}
