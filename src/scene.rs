//! 场景分组
//!
//! 视频的感知哈希会让命中的瞬间附近出现大量连续帧，把按
//! (title, episode, frame) 排序后的连续段折叠成一个 "场景"，
//! 每个命中的瞬间只产生一条结果

use serde::Serialize;

use crate::index::FrameRecord;

/// 同一场景内相邻命中帧允许的最大帧号间隔
pub const DEFAULT_SCENE_GAP: u32 = 100;

/// 一段时间上连续的命中，同一 (title_id, episode_id)，帧号升序
#[derive(Debug, Clone, Serialize)]
pub struct Scene {
    pub records: Vec<FrameRecord>,
}

impl Scene {
    /// 场景的代表帧，约定取最早命中的一帧
    pub fn representative(&self) -> &FrameRecord {
        &self.records[0]
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// 把平坦的命中列表切分为场景
///
/// title 或 episode 变化，或与前一条记录的帧号差超过 gap 时开启
/// 新场景，最后一组无条件收尾。空输入返回空列表，不是错误
pub fn group_scenes(mut records: Vec<FrameRecord>, gap: u32) -> Vec<Scene> {
    records.sort_unstable_by_key(|r| (r.title_id, r.episode_id, r.frame));

    let mut scenes = Vec::new();
    let mut current: Vec<FrameRecord> = Vec::new();
    for r in records {
        if let Some(prev) = current.last() {
            if r.title_id != prev.title_id
                || r.episode_id != prev.episode_id
                || r.frame - prev.frame > gap
            {
                scenes.push(Scene { records: std::mem::take(&mut current) });
            }
        }
        current.push(r);
    }
    if !current.is_empty() {
        scenes.push(Scene { records: current });
    }
    scenes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(hash: u64, title_id: u16, episode_id: u16, frame: u32) -> FrameRecord {
        FrameRecord { hash, title_id, episode_id, frame }
    }

    #[test]
    fn test_empty_input() {
        assert!(group_scenes(vec![], DEFAULT_SCENE_GAP).is_empty());
    }

    #[test]
    fn test_gap_splits() {
        // 40 -> 200 间隔 160 > 100，切为两个场景
        let scenes = group_scenes(
            vec![rec(1, 1, 1, 10), rec(2, 1, 1, 40), rec(3, 1, 1, 200)],
            DEFAULT_SCENE_GAP,
        );
        assert_eq!(scenes.len(), 2);
        assert_eq!(scenes[0].records.iter().map(|r| r.frame).collect::<Vec<_>>(), vec![10, 40]);
        assert_eq!(scenes[1].records.iter().map(|r| r.frame).collect::<Vec<_>>(), vec![200]);
    }

    #[test]
    fn test_gap_boundary_stays_together() {
        // 间隔恰好等于 gap 不分组
        let scenes = group_scenes(vec![rec(1, 1, 1, 0), rec(2, 1, 1, 100)], DEFAULT_SCENE_GAP);
        assert_eq!(scenes.len(), 1);
    }

    #[test]
    fn test_episode_change_splits() {
        let scenes = group_scenes(
            vec![rec(1, 1, 1, 10), rec(2, 1, 2, 11), rec(3, 2, 2, 12)],
            DEFAULT_SCENE_GAP,
        );
        assert_eq!(scenes.len(), 3);
    }

    #[test]
    fn test_unsorted_input() {
        // 输入乱序，分组前先排序
        let scenes = group_scenes(
            vec![rec(1, 1, 1, 200), rec(2, 1, 1, 40), rec(3, 1, 1, 10)],
            DEFAULT_SCENE_GAP,
        );
        assert_eq!(scenes.len(), 2);
        assert_eq!(scenes[0].representative().frame, 10);
        assert_eq!(scenes[1].representative().frame, 200);
    }

    #[test]
    fn test_custom_gap() {
        let records = vec![rec(1, 1, 1, 0), rec(2, 1, 1, 50)];
        assert_eq!(group_scenes(records.clone(), 10).len(), 2);
        assert_eq!(group_scenes(records, 50).len(), 1);
    }
}
