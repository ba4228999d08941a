//! dHash (差值哈希) 计算
//!
//! 参考: http://www.hackerfactor.com/blog/?/archives/529-Kind-of-Like-That.html
//!
//! 哈希编码的是局部亮度梯度的符号而非绝对亮度，因此对整体亮度、
//! 对比度变化以及压缩伪影不敏感。同一镜头内的相邻帧经常得到完全
//! 相同的哈希，这由搜索层的场景分组来处理。

use crate::error::{Error, Result};

/// 缩小后的网格宽度，比输出位宽多一列用于横向差分
const GRID_W: usize = 9;
/// 缩小后的网格高度
const GRID_H: usize = 8;
/// 每个目标像素的采样边长，s*s = 每像素采样点数
const SAMPLES: usize = 12;

/// 解码后的原始像素，每像素 4 字节按 A, R, G, B 交错存储
///
/// 预乘与否由调用方在解码时统一，这里不做归一化
#[derive(Debug, Clone)]
pub struct RawPixels {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl RawPixels {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidDimensions { width, height });
        }
        debug_assert_eq!(data.len(), width as usize * height as usize * 4);
        Ok(Self { width, height, data })
    }
}

/// 图像解码能力接口，由具体解码库实现，哈希计算只依赖该接口
pub trait ImageDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<RawPixels>;
}

/// 计算 64 位 dHash
///
/// 先把输入区域平均缩小到 9x8，转为整数亮度后在每行内比较相邻
/// 像素，左侧严格更亮记 1，否则记 0，按行主序高位在前打包
pub fn compute_hash(image: &RawPixels) -> Result<u64> {
    if image.width == 0 || image.height == 0 {
        return Err(Error::InvalidDimensions { width: image.width, height: image.height });
    }

    let small = shrink(image);

    // 整数权重的亮度，不做除法，后续只关心相对大小
    let mut mono = [0u32; GRID_W * GRID_H];
    for (m, px) in mono.iter_mut().zip(small.chunks_exact(4)) {
        *m = 29 * px[1] as u32 + 150 * px[2] as u32 + 77 * px[3] as u32;
    }

    let mut hash = 0u64;
    for row in mono.chunks_exact(GRID_W) {
        for x in 0..GRID_W - 1 {
            hash = (hash << 1) | u64::from(row[x] > row[x + 1]);
        }
    }
    Ok(hash)
}

/// 区域平均缩小到 9x8
///
/// 每个目标像素按比例映射回源图，取 12x12 个采样点对 4 个通道
/// 分别求平均(整数截断)
fn shrink(image: &RawPixels) -> [u8; GRID_W * GRID_H * 4] {
    let w = image.width as usize;
    let h = image.height as usize;
    let mut out = [0u8; GRID_W * GRID_H * 4];

    let mut pos = 0;
    for y in 0..GRID_H {
        for x in 0..GRID_W {
            let src_x0 = x * w / GRID_W;
            let src_y0 = y * h / GRID_H;

            let mut sum = [0u32; 4];
            for yy in 0..SAMPLES {
                let dy = yy * h / GRID_H / SAMPLES;
                for xx in 0..SAMPLES {
                    let dx = xx * w / GRID_W / SAMPLES;
                    let p = ((src_y0 + dy) * w + src_x0 + dx) * 4;
                    for (s, &v) in sum.iter_mut().zip(&image.data[p..p + 4]) {
                        *s += v as u32;
                    }
                }
            }
            for s in sum {
                out[pos] = (s / (SAMPLES * SAMPLES) as u32) as u8;
                pos += 1;
            }
        }
    }
    out
}
