//! 基于 ffmpeg 的视频帧源
//!
//! 视频解码是有状态的串行过程，读取无法并行，并行发生在
//! 下游的哈希计算(见 builder)

use std::path::Path;

use ffmpeg_next as ffmpeg;
use log::debug;

use crate::dhash::RawPixels;
use crate::error::{Error, Result};

/// 按读取顺序逐帧产出原始像素的帧源
pub trait FrameSource {
    /// 总帧数，容器未声明时为 None
    fn total_frames(&self) -> Option<u64>;

    /// 读取下一帧，流结束返回 Ok(None)
    ///
    /// 中途的解码失败是整次构建的失败，单话的不完整索引不是
    /// 受支持的产物
    fn next_frame(&mut self) -> Result<Option<RawPixels>>;
}

/// ffmpeg 解码的视频文件帧源，输出统一缩放为 ARGB
pub struct VideoSource {
    ictx: ffmpeg::format::context::Input,
    decoder: ffmpeg::decoder::Video,
    scaler: ffmpeg::software::scaling::context::Context,
    stream_index: usize,
    total: Option<u64>,
    eof_sent: bool,
}

impl VideoSource {
    /// 打开视频文件并定位最佳视频流
    ///
    /// 任何打开阶段的失败都在帧处理开始之前以 SourceUnavailable
    /// 返回
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let unavailable = || Error::SourceUnavailable(path.to_path_buf());

        ffmpeg::init().map_err(|_| unavailable())?;
        let ictx = ffmpeg::format::input(&path).map_err(|_| unavailable())?;

        let (stream_index, total, parameters) = {
            let stream =
                ictx.streams().best(ffmpeg::media::Type::Video).ok_or_else(unavailable)?;
            let total = u64::try_from(stream.frames()).ok().filter(|&n| n > 0);
            (stream.index(), total, stream.parameters())
        };

        let decoder = ffmpeg::codec::context::Context::from_parameters(parameters)
            .and_then(|ctx| ctx.decoder().video())
            .map_err(|_| unavailable())?;

        let scaler = ffmpeg::software::scaling::context::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            ffmpeg::format::Pixel::ARGB,
            decoder.width(),
            decoder.height(),
            ffmpeg::software::scaling::flag::Flags::BILINEAR,
        )
        .map_err(|_| unavailable())?;

        debug!("打开视频 {}，声明帧数 {:?}", path.display(), total);

        Ok(Self { ictx, decoder, scaler, stream_index, total, eof_sent: false })
    }

    /// 把解码帧缩放为 ARGB 并按行拷出(每行按 stride 对齐，可能有
    /// 填充字节)
    fn to_pixels(&mut self, frame: &ffmpeg::frame::Video) -> Result<RawPixels> {
        let mut argb = ffmpeg::frame::Video::empty();
        self.scaler.run(frame, &mut argb).map_err(|e| Error::Decode(e.to_string()))?;

        let width = argb.width();
        let height = argb.height();
        let stride = argb.stride(0);
        let data = argb.data(0);
        let row_len = width as usize * 4;

        let mut out = Vec::with_capacity(row_len * height as usize);
        for y in 0..height as usize {
            let offset = y * stride;
            out.extend_from_slice(&data[offset..offset + row_len]);
        }
        RawPixels::new(width, height, out)
    }

    /// 向解码器喂入下一个属于视频流的包，包耗尽后发送 EOF
    fn feed(&mut self) -> Result<()> {
        let stream_index = self.stream_index;
        let packet = self
            .ictx
            .packets()
            .find(|(stream, _)| stream.index() == stream_index)
            .map(|(_, packet)| packet);

        match packet {
            Some(packet) => {
                self.decoder.send_packet(&packet).map_err(|e| Error::Decode(e.to_string()))?;
            }
            None => {
                self.decoder.send_eof().map_err(|e| Error::Decode(e.to_string()))?;
                self.eof_sent = true;
            }
        }
        Ok(())
    }
}

impl FrameSource for VideoSource {
    fn total_frames(&self) -> Option<u64> {
        self.total
    }

    fn next_frame(&mut self) -> Result<Option<RawPixels>> {
        let mut decoded = ffmpeg::frame::Video::empty();
        loop {
            match self.decoder.receive_frame(&mut decoded) {
                Ok(()) => return Ok(Some(self.to_pixels(&decoded)?)),
                Err(ffmpeg::Error::Eof) => return Ok(None),
                // 解码器要更多输入
                Err(ffmpeg::Error::Other { errno }) if errno == ffmpeg::util::error::EAGAIN => {}
                Err(e) => return Err(Error::Decode(e.to_string())),
            }
            if self.eof_sent {
                return Ok(None);
            }
            self.feed()?;
        }
    }
}
