use indicatif::ProgressStyle;

/// 统一的进度条样式
pub fn pb_style() -> ProgressStyle {
    ProgressStyle::with_template("{wide_bar} {pos}/{len} ({eta}) {msg}")
        .expect("failed to build progress style")
}
