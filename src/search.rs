//! 近邻搜索
//!
//! 按允许的最大汉明距离(level)返回索引中的候选记录，内部根据
//! level 在两种策略间切换:
//!
//! - 组合探测: 枚举大小不超过 level 的所有位置子集，逐一翻转后
//!   二分查找。半径 r 的汉明球恰好等于翻转不超过 r 个位能到达的
//!   值集合，因此结果是精确的。代价为 ΣC(64,i) 次二分查找，
//!   level=3 时约 43745 次，是该策略的实用上限
//! - 全量扫描: 对每条记录做 XOR + popcount。O(n)，但避免了
//!   level=4 时 C(64,4)=635376 次探测的组合爆炸

use crate::index::{FrameIndex, FrameRecord};

/// 组合探测与全量扫描的默认切换阈值
///
/// 对几万到几百万条记录的索引，两种策略的开销大约在这里交叉
pub const DEFAULT_PROBE_LEVEL: u32 = 3;

/// 搜索与查询哈希汉明距离不超过 level 的所有记录
///
/// 结果内部不保证顺序，排序由场景分组完成
pub fn search(index: &FrameIndex, hash: u64, level: u32) -> Vec<FrameRecord> {
    search_with_crossover(index, hash, level, DEFAULT_PROBE_LEVEL)
}

/// 同 [`search`]，但显式指定策略切换阈值
pub fn search_with_crossover(
    index: &FrameIndex,
    hash: u64,
    level: u32,
    crossover: u32,
) -> Vec<FrameRecord> {
    if level <= crossover {
        probe(index, hash, level)
    } else {
        scan(index, hash, level)
    }
}

/// 组合探测
fn probe(index: &FrameIndex, hash: u64, level: u32) -> Vec<FrameRecord> {
    let mut out = Vec::new();
    probe_subsets(index, hash, 0, level, &mut out);
    out
}

/// 从 start 位开始枚举剩余翻转预算内的所有位置子集
///
/// 每个子集恰好访问一次，size 0 对应入口处的精确查找
fn probe_subsets(
    index: &FrameIndex,
    hash: u64,
    start: u32,
    budget: u32,
    out: &mut Vec<FrameRecord>,
) {
    out.extend_from_slice(index.find_exact(hash));
    if budget == 0 {
        return;
    }
    for i in start..64 {
        probe_subsets(index, hash ^ (1 << i), i + 1, budget - 1, out);
    }
}

/// 全量扫描
fn scan(index: &FrameIndex, hash: u64, level: u32) -> Vec<FrameRecord> {
    index
        .records()
        .iter()
        .filter(|r| (r.hash ^ hash).count_ones() <= level)
        .copied()
        .collect()
}
