use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use indicatif::ProgressBar;
use log::info;

use crate::builder::IndexBuilder;
use crate::cli::SubCommandExtend;
use crate::config::Opts;
use crate::error::Error;
use crate::index::FrameIndex;
use crate::utils::pb_style;
use crate::video::{FrameSource, VideoSource};

#[derive(Parser, Debug, Clone)]
pub struct BuildCommand {
    /// 视频文件路径
    pub video: PathBuf,
    /// 作品 ID
    #[arg(short, long, value_name = "ID")]
    pub title_id: u16,
    /// 话数 ID
    #[arg(short, long, value_name = "ID")]
    pub episode_id: u16,
    /// 并行哈希的批大小，默认为可用核心数
    #[arg(short, long, value_name = "N")]
    pub jobs: Option<usize>,
}

impl SubCommandExtend for BuildCommand {
    fn run(&self, opts: &Opts) -> Result<()> {
        let index = if opts.index.exists() {
            let index = FrameIndex::load_file(&opts.index)?;
            info!("{} 中已有 {} 条记录", opts.index.display(), index.len());
            index
        } else {
            FrameIndex::empty()
        };

        // 构建开销很大，重复的 (title, episode) 在开工前拒绝
        let count = index.count_episode(self.title_id, self.episode_id);
        if count > 0 {
            return Err(Error::DuplicateEpisode {
                title_id: self.title_id,
                episode_id: self.episode_id,
                count,
            }
            .into());
        }

        let mut source = VideoSource::open(&self.video)?;
        let pb = match source.total_frames() {
            Some(total) => ProgressBar::new(total),
            None => ProgressBar::no_length(),
        };
        pb.set_style(pb_style());

        let mut builder = IndexBuilder::new(self.title_id, self.episode_id);
        if let Some(jobs) = self.jobs {
            builder = builder.workers(jobs);
        }
        let records = builder.build(&mut source, |(done, _)| pb.set_position(done))?;
        pb.finish_with_message("哈希计算完成");

        let merged = index.merge(records);
        merged.save_file(&opts.index)?;
        info!("索引已写入 {}，共 {} 条记录", opts.index.display(), merged.len());
        Ok(())
    }
}
