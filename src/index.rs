//! 帧哈希索引与磁盘格式
//!
//! 磁盘格式为 gzip 压缩的小端二进制流:
//!
//! ```text
//! i32            记录数
//! 重复 记录数 次:
//!   u64          hash
//!   u16          title_id
//!   u16          episode_id
//!   u32          frame
//! ```
//!
//! 索引加载后不可变，更新统一表达为 "旧记录 + 新记录重新排序后
//! 另存"，因此查询路径不需要任何锁

use std::collections::BTreeMap;
use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use log::debug;
use serde::Serialize;

use crate::error::{Error, Result};

/// 单条记录序列化后的字节数: 8 + 2 + 2 + 4
pub const RECORD_SIZE: usize = 16;

/// 一个采样帧的索引记录，创建后不再修改
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct FrameRecord {
    pub hash: u64,
    pub title_id: u16,
    pub episode_id: u16,
    pub frame: u32,
}

impl FrameRecord {
    /// 持久化与二分查找使用的全序: hash 升序，其余字段决定并列次序
    fn sort_key(&self) -> (u64, u16, u16, u32) {
        (self.hash, self.title_id, self.episode_id, self.frame)
    }
}

/// 按 hash 排序的只读索引
///
/// 所有构造路径都经过排序，二分查找的正确性不依赖外部输入
#[derive(Debug)]
pub struct FrameIndex {
    records: Vec<FrameRecord>,
}

impl FrameIndex {
    pub fn empty() -> Self {
        Self { records: Vec::new() }
    }

    /// 由记录列表构建索引，按 (hash, title, episode, frame) 重排
    pub fn from_records(mut records: Vec<FrameRecord>) -> Self {
        records.sort_unstable_by_key(FrameRecord::sort_key);
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[FrameRecord] {
        &self.records
    }

    /// 解压并解析索引字节流
    ///
    /// 解压失败、流被截断、记录数与剩余长度不符都视为致命的
    /// 格式错误，不返回部分结果
    pub fn load(bytes: &[u8]) -> Result<Self> {
        let mut raw = Vec::new();
        GzDecoder::new(bytes)
            .read_to_end(&mut raw)
            .map_err(|e| Error::CorruptIndex(format!("解压失败: {e}")))?;

        if raw.len() < 4 {
            return Err(Error::CorruptIndex("文件过短，缺少记录数".to_string()));
        }
        let count = LittleEndian::read_i32(&raw[..4]);
        if count < 0 {
            return Err(Error::CorruptIndex(format!("非法的记录数: {count}")));
        }
        let body = &raw[4..];
        if body.len() != count as usize * RECORD_SIZE {
            return Err(Error::CorruptIndex(format!(
                "记录数为 {} 但数据长度为 {} 字节",
                count,
                body.len()
            )));
        }

        let records = body
            .chunks_exact(RECORD_SIZE)
            .map(|chunk| FrameRecord {
                hash: LittleEndian::read_u64(&chunk[..8]),
                title_id: LittleEndian::read_u16(&chunk[8..10]),
                episode_id: LittleEndian::read_u16(&chunk[10..12]),
                frame: LittleEndian::read_u32(&chunk[12..16]),
            })
            .collect();

        // 重新排序而非信任文件内容，保证二分查找的不变式
        Ok(Self::from_records(records))
    }

    /// 序列化并压缩为索引字节流
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut raw = Vec::with_capacity(4 + self.records.len() * RECORD_SIZE);
        raw.write_i32::<LittleEndian>(self.records.len() as i32)?;
        for r in &self.records {
            raw.write_u64::<LittleEndian>(r.hash)?;
            raw.write_u16::<LittleEndian>(r.title_id)?;
            raw.write_u16::<LittleEndian>(r.episode_id)?;
            raw.write_u32::<LittleEndian>(r.frame)?;
        }

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&raw)?;
        Ok(encoder.finish()?)
    }

    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = fs::read(path.as_ref())?;
        let index = Self::load(&bytes)?;
        debug!("从 {} 加载了 {} 条记录", path.as_ref().display(), index.len());
        Ok(index)
    }

    /// 先写临时文件再原子替换，构建中途失败不会破坏旧索引
    pub fn save_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let bytes = self.to_bytes()?;
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// 二分查找 hash 完全相等的所有记录
    ///
    /// 相邻的近似帧经常坍缩为同一个哈希，等值段可能很长，
    /// 复杂度 O(log n + k)
    pub fn find_exact(&self, hash: u64) -> &[FrameRecord] {
        let start = self.records.partition_point(|r| r.hash < hash);
        let len = self.records[start..].partition_point(|r| r.hash == hash);
        &self.records[start..start + len]
    }

    /// 合并新记录，产生一个重新排序的新索引
    pub fn merge(mut self, extra: Vec<FrameRecord>) -> Self {
        self.records.extend(extra);
        Self::from_records(self.records)
    }

    /// 该 (title_id, episode_id) 组合已有的记录数
    pub fn count_episode(&self, title_id: u16, episode_id: u16) -> usize {
        self.records
            .iter()
            .filter(|r| r.title_id == title_id && r.episode_id == episode_id)
            .count()
    }

    /// 按 (title_id, episode_id) 统计各话的记录数
    pub fn episodes(&self) -> Vec<(u16, u16, usize)> {
        let mut counts = BTreeMap::new();
        for r in &self.records {
            *counts.entry((r.title_id, r.episode_id)).or_insert(0usize) += 1;
        }
        counts.into_iter().map(|((t, e), c)| (t, e, c)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(hash: u64, title_id: u16, episode_id: u16, frame: u32) -> FrameRecord {
        FrameRecord { hash, title_id, episode_id, frame }
    }

    #[test]
    fn test_roundtrip() {
        let records = vec![
            rec(0xFF, 2, 1, 1),
            rec(0xAA, 1, 1, 5),
            rec(0xAB, 1, 1, 6),
            rec(0xAA, 1, 2, 30),
        ];
        let index = FrameIndex::from_records(records.clone());
        let loaded = FrameIndex::load(&index.to_bytes().unwrap()).unwrap();

        let mut expected = records;
        expected.sort_unstable_by_key(FrameRecord::sort_key);
        assert_eq!(loaded.records(), &expected[..]);
    }

    #[test]
    fn test_roundtrip_empty() {
        let index = FrameIndex::empty();
        let loaded = FrameIndex::load(&index.to_bytes().unwrap()).unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_load_not_gzip() {
        let err = FrameIndex::load(b"definitely not gzip").unwrap_err();
        assert!(matches!(err, Error::CorruptIndex(_)));
    }

    #[test]
    fn test_load_truncated() {
        let index = FrameIndex::from_records(vec![rec(1, 1, 1, 0), rec(2, 1, 1, 1)]);
        let raw = index.to_bytes().unwrap();

        // 解压出的数据被截断，记录数与长度不再匹配
        let mut decompressed = Vec::new();
        GzDecoder::new(&raw[..]).read_to_end(&mut decompressed).unwrap();
        decompressed.truncate(decompressed.len() - 7);

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&decompressed).unwrap();
        let err = FrameIndex::load(&encoder.finish().unwrap()).unwrap_err();
        assert!(matches!(err, Error::CorruptIndex(_)));
    }

    #[test]
    fn test_load_count_mismatch() {
        // 声明 3 条记录但只有 1 条的数据
        let mut raw = Vec::new();
        raw.write_i32::<LittleEndian>(3).unwrap();
        raw.extend_from_slice(&[0u8; RECORD_SIZE]);

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&raw).unwrap();
        let err = FrameIndex::load(&encoder.finish().unwrap()).unwrap_err();
        assert!(matches!(err, Error::CorruptIndex(_)));
    }

    #[test]
    fn test_load_too_short() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&[1, 2]).unwrap();
        let err = FrameIndex::load(&encoder.finish().unwrap()).unwrap_err();
        assert!(matches!(err, Error::CorruptIndex(_)));
    }

    #[test]
    fn test_find_exact_run() {
        let index = FrameIndex::from_records(vec![
            rec(5, 1, 1, 0),
            rec(7, 1, 1, 10),
            rec(7, 1, 1, 11),
            rec(7, 2, 3, 4),
            rec(9, 1, 1, 20),
        ]);
        assert_eq!(index.find_exact(7).len(), 3);
        assert_eq!(index.find_exact(5).len(), 1);
        assert!(index.find_exact(6).is_empty());
        assert!(index.find_exact(0).is_empty());
        assert!(index.find_exact(u64::MAX).is_empty());
        assert!(FrameIndex::empty().find_exact(7).is_empty());
    }

    #[test]
    fn test_merge_resorts() {
        let index = FrameIndex::from_records(vec![rec(9, 1, 1, 0), rec(3, 1, 1, 1)]);
        let merged = index.merge(vec![rec(5, 2, 1, 0)]);
        let hashes: Vec<u64> = merged.records().iter().map(|r| r.hash).collect();
        assert_eq!(hashes, vec![3, 5, 9]);
    }

    #[test]
    fn test_episode_counts() {
        let index = FrameIndex::from_records(vec![
            rec(1, 1, 1, 0),
            rec(2, 1, 1, 1),
            rec(3, 1, 2, 0),
            rec(4, 7, 1, 0),
        ]);
        assert_eq!(index.count_episode(1, 1), 2);
        assert_eq!(index.count_episode(1, 3), 0);
        assert_eq!(index.episodes(), vec![(1, 1, 2), (1, 2, 1), (7, 1, 1)]);
    }

    #[test]
    fn test_save_file_atomic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.db");

        let index = FrameIndex::from_records(vec![rec(1, 1, 1, 0)]);
        index.save_file(&path).unwrap();
        let loaded = FrameIndex::load_file(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(!path.with_extension("tmp").exists());
    }
}
