// error.rs — 错误类型定义
// 每个关注点一个枚举；只有 PipelineError 会作为一次运行的最终错误返回给调用方

use std::path::PathBuf;
use thiserror::Error;

/// 网络层错误：信息流查询和图片下载共用
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} responded with HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("could not read response body from {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// 图片压缩阶段的错误，对一次运行来说总是可恢复的
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("could not inspect {}: {source}", path.display())]
    Inspect {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not decode {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("could not encode {}: {source}", path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("could not write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// 上次运行时间戳文件的读写错误，同样不会中断运行
#[derive(Debug, Error)]
pub enum StateError {
    #[error("could not read run state {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("run state {} is corrupt: {content:?}", path.display())]
    Parse { path: PathBuf, content: String },
    #[error("could not write run state {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// 系统拒绝设置壁纸
#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("wallpaper path is not valid UTF-8: {}", .0.display())]
    NonUtf8Path(PathBuf),
    #[error("system refused wallpaper {}: {reason}", path.display())]
    Rejected { path: PathBuf, reason: String },
}

/// 一次运行的致命错误
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error("no suitable wallpaper found")]
    NoCandidate,
    #[error("could not save {}: {source}", path.display())]
    Save {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Apply(#[from] ApplyError),
}

/// 可恢复错误：记录警告后用回退值继续
#[derive(Debug, Error)]
pub enum RecoverableError {
    #[error(transparent)]
    Normalize(#[from] NormalizeError),
    #[error(transparent)]
    State(#[from] StateError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_mentions_url_and_code() {
        let err = NetworkError::Status {
            url: "https://example.com/a.jpg".into(),
            status: 404,
        };
        assert_eq!(
            err.to_string(),
            "https://example.com/a.jpg responded with HTTP 404"
        );
    }

    #[test]
    fn network_error_passes_through_pipeline_error() {
        let err: PipelineError = NetworkError::Status {
            url: "u".into(),
            status: 500,
        }
        .into();
        assert_eq!(err.to_string(), "u responded with HTTP 500");
    }

    #[test]
    fn no_candidate_message_is_user_readable() {
        assert_eq!(
            PipelineError::NoCandidate.to_string(),
            "no suitable wallpaper found"
        );
    }
}
