// download.rs — 图片下载与本地保存
// 文件名格式：<YYYYMMDD>_<清理后的标题>.<扩展名>

use crate::error::PipelineError;
use crate::selector::IMAGE_EXTENSIONS;
use crate::source::{Candidate, WallpaperSource};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tokio::fs::File; // tokio 提供的异步文件操作
use tokio::io::AsyncWriteExt; // 异步写入 trait，提供 write_all() 等方法

/// 标题清理后的最大字符数
const MAX_TITLE_CHARS: usize = 50;

/// 标题清理后为空时使用的文件名
const FALLBACK_TITLE: &str = "redpaper";

/// 文件名中不允许出现的字符（按 Windows 规则，最严格）
const ILLEGAL_CHARS: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// 已下载到本地的图片
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedArtifact {
    pub path: PathBuf,
    pub size: u64,
}

/// 去掉非法字符和首尾空白，空结果用默认名，最长 50 个字符
pub fn sanitize_title(title: &str) -> String {
    let cleaned: String = title.chars().filter(|c| !ILLEGAL_CHARS.contains(c)).collect();
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        return FALLBACK_TITLE.to_string();
    }
    trimmed.chars().take(MAX_TITLE_CHARS).collect()
}

/// 从 URL 推断扩展名，不在允许列表中时回退为 jpg
pub fn infer_extension(url: &str) -> &'static str {
    let Some((_, tail)) = url.rsplit_once('.') else {
        return "jpg";
    };
    let tail = tail.to_ascii_lowercase();
    IMAGE_EXTENSIONS
        .iter()
        .find(|ext| **ext == tail)
        .copied()
        .unwrap_or("jpg")
}

/// 组合出本地文件名
pub fn artifact_filename(candidate: &Candidate, date: NaiveDate) -> String {
    format!(
        "{}_{}.{}",
        date.format("%Y%m%d"),
        sanitize_title(&candidate.title),
        infer_extension(&candidate.url)
    )
}

/// 下载候选图片并原样写入 `save_dir` 下的新文件
///
/// 网络失败时不会创建文件；写入失败时返回的错误里带有出问题的路径。
pub async fn download(
    source: &dyn WallpaperSource,
    candidate: &Candidate,
    save_dir: &Path,
    date: NaiveDate,
) -> Result<DownloadedArtifact, PipelineError> {
    let bytes = source.fetch(&candidate.url).await?;

    let save_path = save_dir.join(artifact_filename(candidate, date));
    write_file(&save_path, &bytes)
        .await
        .map_err(|source| PipelineError::Save {
            path: save_path.clone(),
            source,
        })?;

    tracing::info!(path = %save_path.display(), bytes = bytes.len(), "downloaded wallpaper");
    Ok(DownloadedArtifact {
        path: save_path,
        size: bytes.len() as u64,
    })
}

async fn write_file(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path).await?;
    file.write_all(bytes).await?;
    // tokio 的 File 在后台写入，flush 才能拿到真正的写入错误
    file.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NetworkError;
    use crate::source::FeedQuery;
    use async_trait::async_trait;

    struct StaticSource(Result<Vec<u8>, u16>);

    #[async_trait]
    impl WallpaperSource for StaticSource {
        async fn top(&self, _query: &FeedQuery) -> Result<Vec<Candidate>, NetworkError> {
            Ok(Vec::new())
        }

        async fn fetch(&self, url: &str) -> Result<Vec<u8>, NetworkError> {
            self.0.clone().map_err(|status| NetworkError::Status {
                url: url.to_string(),
                status,
            })
        }
    }

    fn candidate(title: &str, url: &str) -> Candidate {
        Candidate {
            title: title.to_string(),
            url: url.to_string(),
            score: 10,
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()
    }

    #[test]
    fn illegal_characters_are_stripped() {
        assert_eq!(sanitize_title("My:Cool/Wallpaper?"), "MyCoolWallpaper");
        assert_eq!(sanitize_title(r#"a<b>c"d\e|f*g"#), "abcdefg");
    }

    #[test]
    fn empty_title_falls_back() {
        assert_eq!(sanitize_title(""), "redpaper");
        assert_eq!(sanitize_title(" ??? "), "redpaper");
    }

    #[test]
    fn long_titles_are_capped_by_characters() {
        let title = "é".repeat(80);
        let cleaned = sanitize_title(&title);
        assert_eq!(cleaned.chars().count(), 50);
    }

    #[test]
    fn extension_defaults_to_jpg() {
        assert_eq!(infer_extension("https://host/a.PNG"), "png");
        assert_eq!(infer_extension("https://host/a.gif"), "gif");
        assert_eq!(infer_extension("https://host/a.webp"), "jpg");
        assert_eq!(infer_extension("no-dot"), "jpg");
    }

    #[test]
    fn filename_starts_with_date_stamp() {
        let name = artifact_filename(&candidate("Sunset [3840x2160]", "https://i/x.jpeg"), date());
        assert_eq!(name, "20240309_Sunset [3840x2160].jpeg");
    }

    #[tokio::test]
    async fn download_writes_body_verbatim() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let body = vec![1u8, 2, 3, 4, 5];
        let source = StaticSource(Ok(body.clone()));

        let artifact =
            download(&source, &candidate("Lake", "https://i/lake.png"), dir.path(), date()).await?;

        assert_eq!(artifact.path, dir.path().join("20240309_Lake.png"));
        assert_eq!(artifact.size, 5);
        assert_eq!(std::fs::read(&artifact.path)?, body);
        Ok(())
    }

    #[tokio::test]
    async fn failed_fetch_creates_no_file() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let source = StaticSource(Err(503));

        let result = download(&source, &candidate("Lake", "https://i/lake.png"), dir.path(), date()).await;

        assert!(matches!(
            result,
            Err(PipelineError::Network(NetworkError::Status { status: 503, .. }))
        ));
        assert_eq!(std::fs::read_dir(dir.path())?.count(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn missing_directory_reports_save_error() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let missing = dir.path().join("nope");
        let source = StaticSource(Ok(vec![0u8; 3]));

        let result = download(&source, &candidate("Lake", "https://i/lake.png"), &missing, date()).await;

        match result {
            Err(PipelineError::Save { path, .. }) => assert!(path.starts_with(&missing)),
            other => panic!("expected save error, got {other:?}"),
        }
        Ok(())
    }
}
