use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::cli::*;
use crate::scene::DEFAULT_SCENE_GAP;
use crate::search::DEFAULT_PROBE_LEVEL;

#[derive(Parser, Debug, Clone)]
#[command(name = "framesearch", version)]
pub struct Opts {
    #[command(subcommand)]
    pub subcmd: SubCommand,
    /// 索引文件路径
    #[arg(short, long, value_name = "FILE", default_value = "index.db")]
    pub index: PathBuf,
}

#[derive(Subcommand, Debug, Clone)]
pub enum SubCommand {
    /// 逐帧解码视频，把每帧的哈希并入索引
    Build(BuildCommand),
    /// 扫描帧图片目录并并入索引
    Import(ImportCommand),
    /// 用一张图片在索引中搜索出处
    Search(SearchCommand),
    /// 显示索引的统计信息
    Info(InfoCommand),
}

#[derive(Parser, Debug, Clone)]
pub struct SearchOptions {
    /// 允许的最大汉明距离，0 为完全一致
    #[arg(short, long, value_name = "N", default_value_t = 0, value_parser = clap::value_parser!(u32).range(0..=10))]
    pub level: u32,
    /// 组合探测与全量扫描的切换阈值
    #[arg(long, value_name = "N", default_value_t = DEFAULT_PROBE_LEVEL)]
    pub crossover: u32,
    /// 同一场景内相邻命中帧允许的最大帧号间隔
    #[arg(long, value_name = "N", default_value_t = DEFAULT_SCENE_GAP)]
    pub scene_gap: u32,
    /// 显示的场景数量
    #[arg(long, value_name = "COUNT", default_value_t = 10)]
    pub count: usize,
}
