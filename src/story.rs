//! 番组元数据
//!
//! 逗号分隔的文本文件，首行为 `name,offsetSeconds,seekUrlTemplate`，
//! 数据行为 `titleId,episodeId,frameRate,title,url` 或追加任意个
//! `,chapterStartFrame,chapterSubtitle,chapterUrl` 三元组。
//! 引擎只依赖 (title_id, episode_id) -> frame_rate 的映射把帧号换算
//! 为秒，URL 拼装完全由外部负责

use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// 一个章节(合集类视频里的一话)
#[derive(Debug, Clone)]
pub struct Chapter {
    pub start_frame: u32,
    pub subtitle: String,
    pub url: String,
}

/// 一话的元数据
#[derive(Debug, Clone)]
pub struct StoryInfo {
    pub title_id: u16,
    pub episode_id: u16,
    pub frame_rate: f32,
    pub title: String,
    pub chapters: Vec<Chapter>,
}

impl StoryInfo {
    /// frame 所属的章节下标，第 0 章为兜底
    fn chapter_index(&self, frame: u32) -> usize {
        for i in (1..self.chapters.len()).rev() {
            if frame >= self.chapters[i].start_frame {
                return i;
            }
        }
        0
    }

    /// 帧号换算为章节内经过的秒数
    pub fn seconds_at(&self, frame: u32) -> u32 {
        let start = self.chapters[self.chapter_index(frame)].start_frame;
        let relative = frame.saturating_sub(start);
        (relative as f64 / self.frame_rate as f64) as u32
    }

    /// 带章节副标题的显示名
    pub fn display_title(&self, frame: u32) -> String {
        let subtitle = &self.chapters[self.chapter_index(frame)].subtitle;
        if subtitle.is_empty() {
            self.title.clone()
        } else {
            format!("{} {}", self.title, subtitle)
        }
    }
}

/// 一个番组元数据文件的全部内容
#[derive(Debug, Clone)]
pub struct StoryBook {
    pub name: String,
    pub offset_seconds: i32,
    pub seek_format: String,
    stories: Vec<StoryInfo>,
}

impl StoryBook {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut lines = text.lines().filter(|l| !l.trim().is_empty());

        let header = lines.next().ok_or_else(|| Error::StoryFormat("文件为空".to_string()))?;
        let header: Vec<&str> = header.split(',').collect();
        if header.len() < 3 {
            return Err(Error::StoryFormat(format!("首行字段不足: {header:?}")));
        }
        let name = header[0].to_string();
        let offset_seconds = header[1]
            .parse()
            .map_err(|_| Error::StoryFormat(format!("非法的偏移秒数: {}", header[1])))?;
        let seek_format = header[2].to_string();

        let mut stories = Vec::new();
        for line in lines {
            stories.push(Self::parse_story(line)?);
        }
        Ok(Self { name, offset_seconds, seek_format, stories })
    }

    fn parse_story(line: &str) -> Result<StoryInfo> {
        let bad = || Error::StoryFormat(format!("无法解析数据行: {line}"));
        let data: Vec<&str> = line.split(',').collect();
        if data.len() < 5 {
            return Err(bad());
        }

        let title_id = data[0].parse().map_err(|_| bad())?;
        let episode_id = data[1].parse().map_err(|_| bad())?;
        let frame_rate = data[2].parse().map_err(|_| bad())?;
        let title = data[3].to_string();

        let chapters = if data.len() == 5 {
            vec![Chapter { start_frame: 0, subtitle: String::new(), url: data[4].to_string() }]
        } else {
            // 第 5 列之后是 (起始帧, 副标题, URL) 三元组
            data[4..]
                .chunks(3)
                .map(|chunk| {
                    if chunk.len() != 3 {
                        return Err(bad());
                    }
                    Ok(Chapter {
                        start_frame: chunk[0].parse().map_err(|_| bad())?,
                        subtitle: chunk[1].to_string(),
                        url: chunk[2].to_string(),
                    })
                })
                .collect::<Result<Vec<_>>>()?
        };

        Ok(StoryInfo { title_id, episode_id, frame_rate, title, chapters })
    }

    pub fn find(&self, title_id: u16, episode_id: u16) -> Option<&StoryInfo> {
        self.stories.iter().find(|s| s.title_id == title_id && s.episode_id == episode_id)
    }

    pub fn stories(&self) -> &[StoryInfo] {
        &self.stories
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
sample,-1,?t=<sss>
1,1,29.97,第一季 第1话,http://example.com/1-1
1,2,23.976,第一季 第2话,0,前半,http://example.com/1-2a,17000,后半,http://example.com/1-2b
";

    #[test]
    fn test_parse_header() {
        let book = StoryBook::parse(SAMPLE).unwrap();
        assert_eq!(book.name, "sample");
        assert_eq!(book.offset_seconds, -1);
        assert_eq!(book.seek_format, "?t=<sss>");
        assert_eq!(book.stories().len(), 2);
    }

    #[test]
    fn test_plain_line() {
        let book = StoryBook::parse(SAMPLE).unwrap();
        let story = book.find(1, 1).unwrap();
        assert_eq!(story.title, "第一季 第1话");
        assert_eq!(story.chapters.len(), 1);
        assert_eq!(story.chapters[0].start_frame, 0);
        // 29.97fps 下第 2997 帧约为 100 秒
        assert_eq!(story.seconds_at(2997), 100);
    }

    #[test]
    fn test_chaptered_line() {
        let book = StoryBook::parse(SAMPLE).unwrap();
        let story = book.find(1, 2).unwrap();
        assert_eq!(story.chapters.len(), 2);

        // 第 17000 帧起属于后半章，秒数从章节起点重新计算
        assert_eq!(story.display_title(0), "第一季 第2话 前半");
        assert_eq!(story.display_title(17000), "第一季 第2话 后半");
        assert_eq!(story.seconds_at(17000), 0);
        assert_eq!(story.seconds_at(16999), (16999.0 / 23.976) as u32);
    }

    #[test]
    fn test_find_missing() {
        let book = StoryBook::parse(SAMPLE).unwrap();
        assert!(book.find(9, 9).is_none());
    }

    #[test]
    fn test_malformed() {
        assert!(matches!(StoryBook::parse(""), Err(Error::StoryFormat(_))));
        assert!(matches!(StoryBook::parse("name,x,url\n1,1,24,t,u"), Err(Error::StoryFormat(_))));
        assert!(matches!(
            StoryBook::parse("name,0,url\n1,1,24,missing-url"),
            Err(Error::StoryFormat(_))
        ));
        assert!(matches!(
            StoryBook::parse("name,0,url\nabc,1,24,t,u"),
            Err(Error::StoryFormat(_))
        ));
    }
}
