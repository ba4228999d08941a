use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ParallelProgressIterator, ProgressBar};
use log::info;
use rayon::prelude::*;
use regex::Regex;
use walkdir::WalkDir;

use crate::cli::SubCommandExtend;
use crate::config::Opts;
use crate::error::Error;
use crate::index::{FrameIndex, FrameRecord};
use crate::utils::pb_style;
use crate::{decode, dhash};

#[derive(Parser, Debug, Clone)]
pub struct ImportCommand {
    /// 帧图片所在目录，文件名须为 <title>_<episode>_<frame>.<后缀>
    pub path: PathBuf,
    /// 扫描的文件后缀名，多个后缀用逗号分隔
    #[arg(short, long, default_value = "jpg,png")]
    pub suffix: String,
}

impl SubCommandExtend for ImportCommand {
    fn run(&self, opts: &Opts) -> Result<()> {
        let re_suf = format!("(?i)({})", self.suffix.replace(',', "|"));
        let re_suf = Regex::new(&re_suf).expect("failed to build regex");
        let re_name = Regex::new(r"^(\d+)_(\d+)_(\d+)$").expect("failed to build regex");

        info!("开始扫描目录: {}", self.path.display());
        let entries: Vec<PathBuf> = WalkDir::new(&self.path)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                entry.file_type().is_file()
                    && entry
                        .path()
                        .extension()
                        .is_some_and(|ext| re_suf.is_match(&ext.to_string_lossy()))
            })
            .map(|entry| entry.into_path())
            .collect();
        info!("扫描完成，共 {} 张图片", entries.len());

        let pb = ProgressBar::new(entries.len() as u64).with_style(pb_style());
        let records = entries
            .par_iter()
            .progress_with(pb)
            .map(|path| {
                let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
                let caps = re_name
                    .captures(stem)
                    .with_context(|| format!("文件名无法解析: {}", path.display()))?;

                let pixels = decode::decode_file(path)
                    .with_context(|| format!("解码失败: {}", path.display()))?;
                let hash = dhash::compute_hash(&pixels)?;
                Ok(FrameRecord {
                    hash,
                    title_id: caps[1].parse()?,
                    episode_id: caps[2].parse()?,
                    frame: caps[3].parse()?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let index = if opts.index.exists() {
            FrameIndex::load_file(&opts.index)?
        } else {
            FrameIndex::empty()
        };

        // 与 build 相同的前置检查: 不允许重复的 (title, episode)
        let imported: BTreeSet<(u16, u16)> =
            records.iter().map(|r| (r.title_id, r.episode_id)).collect();
        for (title_id, episode_id) in imported {
            let count = index.count_episode(title_id, episode_id);
            if count > 0 {
                return Err(Error::DuplicateEpisode { title_id, episode_id, count }.into());
            }
        }

        let merged = index.merge(records);
        merged.save_file(&opts.index)?;
        info!("索引已写入 {}，共 {} 条记录", opts.index.display(), merged.len());
        Ok(())
    }
}
