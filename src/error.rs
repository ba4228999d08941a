use std::path::PathBuf;

use thiserror::Error;

/// 引擎统一错误类型
///
/// "没有命中" 不是错误，搜索返回空列表即可
#[derive(Debug, Error)]
pub enum Error {
    /// 输入无法解码为位图
    #[error("无法解码图像: {0}")]
    Decode(String),

    /// 宽或高为 0 的退化图像
    #[error("非法的图像尺寸: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    /// 索引文件损坏或被截断，属于致命格式错误，不会返回部分结果
    #[error("索引文件损坏: {0}")]
    CorruptIndex(String),

    /// 视频源无法打开，在任何帧处理开始之前返回
    #[error("无法打开视频源: {}", .0.display())]
    SourceUnavailable(PathBuf),

    /// 构建前检查发现该 (title_id, episode_id) 组合已在索引中
    #[error("TitleId={title_id}, EpisodeId={episode_id} 已存在 {count} 条记录，无法继续构建")]
    DuplicateEpisode { title_id: u16, episode_id: u16, count: usize },

    /// 番组元数据文件格式错误
    #[error("番组数据格式错误: {0}")]
    StoryFormat(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
