// normalize.rs — 壁纸体积处理
// 超过系统上限的图片会被重新编码为 JPEG，分辨率保持不变

use crate::error::NormalizeError;
use crate::selector::IMAGE_EXTENSIONS;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageReader};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// Windows 桌面壁纸的体积上限
pub const MAX_WALLPAPER_BYTES: u64 = 16 * 1024 * 1024;

/// 重新编码时使用的 JPEG 质量 (0-100)
pub const COMPRESSION_QUALITY: u8 = 85;

/// 压缩产物的文件名后缀
const COMPRESSED_SUFFIX: &str = "_compressed";

/// 体积约束（静态配置）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeConstraint {
    pub max_bytes: u64,
    pub quality: u8,
}

impl Default for SizeConstraint {
    fn default() -> Self {
        Self {
            max_bytes: MAX_WALLPAPER_BYTES,
            quality: COMPRESSION_QUALITY,
        }
    }
}

/// 压缩产物路径：`<原文件名去掉扩展名>_compressed.jpg`，与原文件同目录
pub fn compressed_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{stem}{COMPRESSED_SUFFIX}.jpg"))
}

/// 判断文件是否已经是压缩产物
pub fn is_compressed_artifact(path: &Path) -> bool {
    path.file_stem()
        .and_then(|s| s.to_str())
        .is_some_and(|s| s.ends_with(COMPRESSED_SUFFIX))
}

/// 列出目录中可以压缩的图片（跳过已有的压缩产物），按文件名排序
pub fn batch_targets(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut targets = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() || is_compressed_artifact(&path) {
            continue;
        }
        let is_image = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()));
        if is_image {
            targets.push(path);
        }
    }
    targets.sort();
    Ok(targets)
}

/// 按约束处理图片，返回最终应使用的路径
///
/// 体积未超限时原样返回输入路径，不读取也不改写图片内容。
/// 超限时解码后以固定质量写出 JPEG，不做缩放；结果不保证一定低于上限。
pub fn normalize(path: &Path, constraint: SizeConstraint) -> Result<PathBuf, NormalizeError> {
    let original_size = fs::metadata(path)
        .map_err(|source| NormalizeError::Inspect {
            path: path.to_path_buf(),
            source,
        })?
        .len();

    if original_size <= constraint.max_bytes {
        tracing::debug!(
            bytes = original_size,
            limit = constraint.max_bytes,
            "image within size limit, no compression needed"
        );
        return Ok(path.to_path_buf());
    }

    tracing::info!(
        bytes = original_size,
        limit = constraint.max_bytes,
        quality = constraint.quality,
        "image exceeds size limit, re-encoding as JPEG"
    );

    let image = decode(path)?;
    tracing::debug!(
        width = image.width(),
        height = image.height(),
        "keeping original resolution"
    );

    let output = compressed_path(path);
    encode_jpeg(&image, &output, constraint.quality)?;

    let compressed_size = fs::metadata(&output)
        .map_err(|source| NormalizeError::Inspect {
            path: output.clone(),
            source,
        })?
        .len();
    let reduction =
        (original_size as f64 - compressed_size as f64) / original_size as f64 * 100.0;
    tracing::info!(
        before = original_size,
        after = compressed_size,
        "compression finished ({reduction:.1}% reduction)"
    );

    Ok(output)
}

/// 按文件内容识别格式并解码，不依赖扩展名
fn decode(path: &Path) -> Result<DynamicImage, NormalizeError> {
    ImageReader::open(path)
        .map_err(|source| NormalizeError::Inspect {
            path: path.to_path_buf(),
            source,
        })?
        .with_guessed_format()
        .map_err(|source| NormalizeError::Inspect {
            path: path.to_path_buf(),
            source,
        })?
        .decode()
        .map_err(|source| NormalizeError::Decode {
            path: path.to_path_buf(),
            source,
        })
}

fn encode_jpeg(image: &DynamicImage, output: &Path, quality: u8) -> Result<(), NormalizeError> {
    let file = File::create(output).map_err(|source| NormalizeError::Write {
        path: output.to_path_buf(),
        source,
    })?;
    let mut writer = BufWriter::new(file);

    // JPEG 没有透明通道，先转成 RGB
    let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
    let encoder = JpegEncoder::new_with_quality(&mut writer, quality);
    rgb.write_with_encoder(encoder)
        .map_err(|source| NormalizeError::Encode {
            path: output.to_path_buf(),
            source,
        })?;

    writer
        .into_inner()
        .map_err(|e| NormalizeError::Write {
            path: output.to_path_buf(),
            source: e.into_error(),
        })?
        .sync_all()
        .map_err(|source| NormalizeError::Write {
            path: output.to_path_buf(),
            source,
        })
}
