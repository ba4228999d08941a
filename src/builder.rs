//! 离线索引构建流水线
//!
//! 帧源的读取是串行的，哈希计算按批并行: 先顺序读满一批并在
//! 读入时分配帧号，再对整批并行求哈希，最后按读取顺序落盘。
//! 帧号与哈希完成的先后无关，输出顺序恒等于读取顺序

use log::info;
use rayon::prelude::*;

use crate::dhash;
use crate::dhash::RawPixels;
use crate::error::Result;
use crate::index::FrameRecord;
use crate::video::FrameSource;

/// 构建进度: (已处理帧数, 总帧数)，总数未知时为 0
pub type Progress = (u64, u64);

/// 为一话视频生成帧记录的构建器
pub struct IndexBuilder {
    title_id: u16,
    episode_id: u16,
    workers: usize,
}

impl IndexBuilder {
    pub fn new(title_id: u16, episode_id: u16) -> Self {
        Self { title_id, episode_id, workers: num_cpus::get() }
    }

    /// 覆盖并行哈希的批大小，默认为可用核心数
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// 逐帧消费帧源，为每帧计算 dHash 并产出记录
    ///
    /// 任何一帧的解码或哈希失败都会使整次构建失败，调用方负责
    /// 把结果并入已有索引(重复的话应在调用本方法之前拒绝，
    /// 构建的开销很大)
    pub fn build<S, F>(&self, source: &mut S, mut progress: F) -> Result<Vec<FrameRecord>>
    where
        S: FrameSource,
        F: FnMut(Progress),
    {
        let total = source.total_frames().unwrap_or(0);
        let mut records = Vec::new();
        let mut batch: Vec<(u32, RawPixels)> = Vec::with_capacity(self.workers);
        let mut next_frame = 0u32;

        loop {
            // 帧号在读入时分配，保证与读取顺序一致
            batch.clear();
            while batch.len() < self.workers {
                match source.next_frame()? {
                    Some(pixels) => {
                        batch.push((next_frame, pixels));
                        next_frame += 1;
                    }
                    None => break,
                }
            }
            if batch.is_empty() {
                break;
            }

            // 批内并行，collect 保持批内顺序
            let hashed = batch
                .par_iter()
                .map(|(frame, pixels)| dhash::compute_hash(pixels).map(|hash| (*frame, hash)))
                .collect::<Result<Vec<_>>>()?;

            for (frame, hash) in hashed {
                records.push(FrameRecord {
                    hash,
                    title_id: self.title_id,
                    episode_id: self.episode_id,
                    frame,
                });
            }
            progress((records.len() as u64, total));
        }

        info!("共处理 {} 帧", records.len());
        Ok(records)
    }
}
