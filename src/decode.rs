//! 图像解码
//!
//! 哈希计算只依赖 [`ImageDecoder`] 接口，这里提供基于 image crate
//! 的默认实现，并把像素统一为 ARGB 交错格式

use std::fs;
use std::path::Path;

use crate::dhash::{ImageDecoder, RawPixels};
use crate::error::{Error, Result};

/// 基于 image crate 的位图解码器，支持 png / jpg / gif 等常见格式
#[derive(Debug, Default, Clone, Copy)]
pub struct RasterDecoder;

impl ImageDecoder for RasterDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<RawPixels> {
        let img = image::load_from_memory(bytes).map_err(|e| Error::Decode(e.to_string()))?;
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();

        // RGBA -> ARGB
        let mut data = Vec::with_capacity(width as usize * height as usize * 4);
        for px in rgba.pixels() {
            data.extend_from_slice(&[px[3], px[0], px[1], px[2]]);
        }
        RawPixels::new(width, height, data)
    }
}

/// 读取并解码一个图像文件
pub fn decode_file<P: AsRef<Path>>(path: P) -> Result<RawPixels> {
    let bytes = fs::read(path)?;
    RasterDecoder.decode(&bytes)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use image::{DynamicImage, RgbaImage};

    use super::*;
    use crate::dhash;

    fn encode_png(img: &RgbaImage) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img.clone())
            .write_to(&mut buf, image::ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_decode_roundtrip() {
        let img = RgbaImage::from_fn(32, 16, |x, y| {
            image::Rgba([x as u8 * 8, y as u8 * 16, 7, 255])
        });
        let pixels = RasterDecoder.decode(&encode_png(&img)).unwrap();
        assert_eq!((pixels.width, pixels.height), (32, 16));
        // 首像素 ARGB 顺序
        assert_eq!(&pixels.data[..4], &[255, 0, 0, 7]);
    }

    #[test]
    fn test_decode_then_hash_is_stable() {
        // png 无损，编码解码不应改变哈希
        let img = RgbaImage::from_fn(108, 96, |x, _| {
            image::Rgba([x as u8 * 2, x as u8 * 2, x as u8 * 2, 255])
        });
        let pixels = RasterDecoder.decode(&encode_png(&img)).unwrap();
        assert_eq!(dhash::compute_hash(&pixels).unwrap(), 0);
    }

    #[test]
    fn test_decode_garbage_fails() {
        let err = RasterDecoder.decode(b"not an image at all").unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }
}
