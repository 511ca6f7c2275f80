// setter.rs — 系统壁纸设置模块

use crate::error::ApplyError;
use std::path::Path;

/// 设置桌面壁纸的能力接口
///
/// 不同平台可以提供自己的实现，流水线只依赖这个 Trait。
pub trait WallpaperApplier: Send + Sync {
    /// 将指定路径的图片设置为壁纸
    fn apply(&self, path: &Path) -> Result<(), ApplyError>;
}

/// 调用 `wallpaper` 库的系统实现，会自动识别操作系统并调用相应的 API
pub struct SystemApplier;

impl WallpaperApplier for SystemApplier {
    fn apply(&self, path: &Path) -> Result<(), ApplyError> {
        let path_str = path
            .to_str()
            .ok_or_else(|| ApplyError::NonUtf8Path(path.to_path_buf()))?;

        wallpaper::set_from_path(path_str).map_err(|e| ApplyError::Rejected {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        tracing::info!(path = %path.display(), "wallpaper set");
        Ok(())
    }
}
