mod build;
mod import;
mod info;
mod search;

pub use build::*;
pub use import::*;
pub use info::*;
pub use search::*;

use crate::config::Opts;

pub trait SubCommandExtend {
    fn run(&self, opts: &Opts) -> anyhow::Result<()>;
}
