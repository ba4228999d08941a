use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use log::debug;

use crate::cli::SubCommandExtend;
use crate::config::{Opts, SearchOptions};
use crate::index::FrameIndex;
use crate::scene::{self, Scene};
use crate::story::StoryBook;
use crate::{decode, dhash, search};

#[derive(Parser, Debug, Clone)]
pub struct SearchCommand {
    /// 被搜索的图片路径
    pub image: PathBuf,
    #[command(flatten)]
    pub search: SearchOptions,
    /// 番组元数据文件，提供后结果会显示标题与播放时刻
    #[arg(long, value_name = "FILE")]
    pub story: Option<PathBuf>,
    /// 输出格式
    #[arg(long, value_name = "FORMAT", value_enum, default_value_t = OutputFormat::Table)]
    pub output_format: OutputFormat,
}

impl SubCommandExtend for SearchCommand {
    fn run(&self, opts: &Opts) -> Result<()> {
        let pixels = decode::decode_file(&self.image)?;
        let hash = dhash::compute_hash(&pixels)?;
        debug!("查询哈希: {hash:016x}");

        let index = FrameIndex::load_file(&opts.index)?;
        let matches =
            search::search_with_crossover(&index, hash, self.search.level, self.search.crossover);
        debug!("命中 {} 条记录", matches.len());

        let mut scenes = scene::group_scenes(matches, self.search.scene_gap);
        scenes.truncate(self.search.count);

        let book = self.story.as_ref().map(StoryBook::load).transpose()?;
        print_result(&scenes, book.as_ref(), self)
    }
}

fn print_result(scenes: &[Scene], book: Option<&StoryBook>, opts: &SearchCommand) -> Result<()> {
    match opts.output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(scenes)?)
        }
        OutputFormat::Table => {
            if scenes.is_empty() {
                println!("未找到匹配结果");
                return Ok(());
            }
            for scene in scenes {
                let r = scene.representative();
                let story = book.and_then(|b| b.find(r.title_id, r.episode_id));
                match (book, story) {
                    (Some(book), Some(story)) => {
                        let second = (story.seconds_at(r.frame) as i64
                            + book.offset_seconds as i64)
                            .max(0);
                        println!(
                            "{}\t{}:{:02}\t({} 帧命中)",
                            story.display_title(r.frame),
                            second / 60,
                            second % 60,
                            scene.len()
                        );
                    }
                    _ => println!(
                        "title={} episode={} frame={}\t({} 帧命中)",
                        r.title_id,
                        r.episode_id,
                        r.frame,
                        scene.len()
                    ),
                }
            }
        }
    }
    Ok(())
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Table,
}
