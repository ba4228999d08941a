use anyhow::Result;
use clap::Parser;

use crate::cli::SubCommandExtend;
use crate::config::Opts;
use crate::index::FrameIndex;

#[derive(Parser, Debug, Clone)]
pub struct InfoCommand {}

impl SubCommandExtend for InfoCommand {
    fn run(&self, opts: &Opts) -> Result<()> {
        let index = FrameIndex::load_file(&opts.index)?;
        println!("索引: {}", opts.index.display());
        println!("记录总数: {}", index.len());
        for (title_id, episode_id, count) in index.episodes() {
            println!("title={title_id} episode={episode_id}\t{count} 帧");
        }
        Ok(())
    }
}
