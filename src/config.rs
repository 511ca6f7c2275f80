// config.rs — 配置管理模块
// 遵循 Unix 风格：优先从 ~/.config/redpaper/config.toml 读取配置

use crate::gate::{DEFAULT_INTERVAL_HOURS, StateStore};
use crate::normalize::{COMPRESSION_QUALITY, MAX_WALLPAPER_BYTES, SizeConstraint};
use crate::source::FeedQuery;
use crate::source::reddit::DEFAULT_USER_AGENT;
use chrono::TimeDelta;
use schemars::JsonSchema; // 引入用于生成 JSON Schema 的 trait
use serde::{Deserialize, Serialize}; // 引入序列化与反序列化 trait
use shellexpand::tilde; // 用于展开 ~ 和环境变量
use std::env; // 环境变量模块
use std::fs; // 文件系统模块
use std::path::{Path, PathBuf}; // 路径处理类型
use std::time::Duration;

/// 展开路径中的 ~ 和环境变量
fn expand_path(path_str: &str) -> PathBuf {
    PathBuf::from(tilde(path_str).into_owned())
}

/// 展开后仍是相对路径的，视为相对于 $HOME
fn resolve_dir(configured: Option<&str>, home: &Path, default: PathBuf) -> PathBuf {
    match configured {
        Some(dir_str) => {
            let p = expand_path(dir_str);
            if p.is_absolute() { p } else { home.join(p) }
        }
        None => default,
    }
}

/// 映射 config.toml 文件内容的嵌套结构体
#[derive(Debug, Deserialize, Serialize, Default, JsonSchema)]
struct ConfigFile {
    #[serde(default)]
    common: CommonConfig,
    #[serde(default)]
    feed: FeedConfig,
    #[serde(default)]
    normalize: NormalizeConfig,
    #[serde(default)]
    schedule: ScheduleConfig,
}

#[derive(Debug, Deserialize, Serialize, Default, JsonSchema)]
struct CommonConfig {
    /// 壁纸下载目录 (支持 ~、$HOME 等环境变量，相对路径则相对于 $HOME)
    download_dir: Option<String>,
    /// 保存上次运行时间戳的数据目录
    data_dir: Option<String>,
}

/// 信息流查询参数
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct FeedConfig {
    /// 子版块名称
    #[serde(default = "default_subreddit")]
    pub subreddit: String,
    /// 热门榜时间窗口 (hour/day/week/month/year/all)
    #[serde(default = "default_time_window")]
    pub time_window: String,
    /// 每次查询的帖子数量
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// 单个请求的超时秒数
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            subreddit: default_subreddit(),
            time_window: default_time_window(),
            limit: default_limit(),
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// 压缩参数
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct NormalizeConfig {
    /// 超过该字节数才会重新编码
    #[serde(default = "default_max_bytes")]
    pub max_bytes: u64,
    /// JPEG 质量 (0-100)
    #[serde(default = "default_quality")]
    pub quality: u8,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            max_bytes: default_max_bytes(),
            quality: default_quality(),
        }
    }
}

/// 运行间隔配置
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct ScheduleConfig {
    /// 两次更换之间的最小小时数
    #[serde(default = "default_interval_hours")]
    pub interval_hours: i64,
    /// `--test` 强制运行成功后是否也记录时间戳
    #[serde(default = "default_true")]
    pub commit_forced_runs: bool,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_hours: default_interval_hours(),
            commit_forced_runs: true,
        }
    }
}

fn default_subreddit() -> String {
    "wallpaper".to_string()
}
fn default_time_window() -> String {
    "day".to_string()
}
fn default_limit() -> u32 {
    10
}
fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_bytes() -> u64 {
    MAX_WALLPAPER_BYTES
}
fn default_quality() -> u8 {
    COMPRESSION_QUALITY
}
fn default_interval_hours() -> i64 {
    DEFAULT_INTERVAL_HOURS
}
fn default_true() -> bool {
    true
}

/// 应用全局配置项
pub struct AppConfig {
    /// 壁纸下载目录
    pub download_dir: PathBuf,
    /// 数据目录（时间戳文件所在）
    pub data_dir: PathBuf,
    /// 配置文件所在路径
    pub config_path: PathBuf,
    pub feed: FeedConfig,
    pub normalize: NormalizeConfig,
    pub schedule: ScheduleConfig,
}

impl AppConfig {
    /// 初始化配置
    pub fn new() -> Self {
        // 拿不到 $HOME 时退回当前目录
        let home_path = env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."));
        let config_path = home_path.join(".config").join("redpaper").join("config.toml");

        let config_file = Self::load_config_from_file(&config_path).unwrap_or_default();
        Self::from_file(config_file, &home_path, config_path, env::var("REDPAPER_SUBREDDIT").ok())
    }

    fn from_file(
        config_file: ConfigFile,
        home_path: &Path,
        config_path: PathBuf,
        subreddit_override: Option<String>,
    ) -> Self {
        let download_dir = resolve_dir(
            config_file.common.download_dir.as_deref(),
            home_path,
            home_path.join("Pictures").join("redpaper"),
        );
        let data_dir = resolve_dir(
            config_file.common.data_dir.as_deref(),
            home_path,
            home_path.join(".local").join("share").join("redpaper"),
        );

        // 优先级：环境变量 > 配置文件内容
        let mut feed = config_file.feed;
        if let Some(subreddit) = subreddit_override.filter(|s| !s.is_empty()) {
            feed.subreddit = subreddit;
        }

        Self {
            download_dir,
            data_dir,
            config_path,
            feed,
            normalize: config_file.normalize,
            schedule: config_file.schedule,
        }
    }

    /// 辅助函数：解析 TOML 配置文件
    fn load_config_from_file(path: &Path) -> Option<ConfigFile> {
        fs::read_to_string(path)
            .ok()
            .and_then(|content| toml::from_str(&content).ok())
    }

    /// 确保所有必要的目录都存在
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::create_dir_all(&self.download_dir)?;
        fs::create_dir_all(&self.data_dir)?;
        Ok(())
    }

    pub fn state_store(&self) -> StateStore {
        StateStore::new(self.data_dir.join("last_run.txt"))
    }

    pub fn feed_query(&self) -> FeedQuery {
        FeedQuery {
            category: self.feed.subreddit.clone(),
            time_window: self.feed.time_window.clone(),
            limit: self.feed.limit,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.feed.timeout_secs)
    }

    pub fn size_constraint(&self) -> SizeConstraint {
        SizeConstraint {
            max_bytes: self.normalize.max_bytes,
            quality: self.normalize.quality.min(100),
        }
    }

    pub fn interval(&self) -> TimeDelta {
        TimeDelta::try_hours(self.schedule.interval_hours.max(0))
            .unwrap_or_else(|| TimeDelta::hours(DEFAULT_INTERVAL_HOURS))
    }

    fn to_file(&self) -> ConfigFile {
        ConfigFile {
            common: CommonConfig {
                download_dir: Some(self.download_dir.to_string_lossy().to_string()),
                data_dir: Some(self.data_dir.to_string_lossy().to_string()),
            },
            feed: self.feed.clone(),
            normalize: self.normalize.clone(),
            schedule: self.schedule.clone(),
        }
    }

    /// 将配置保存回文件
    pub fn save(&self) -> std::io::Result<()> {
        let toml_str = toml::to_string_pretty(&self.to_file()).map_err(std::io::Error::other)?;
        // 不执行 ensure_dirs 的命令也可能写配置
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.config_path, toml_str)
    }

    /// 修改单个配置项（不保存）
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), String> {
        let invalid = |_: std::num::ParseIntError| format!("invalid value for {key}: {value}");
        match key {
            "subreddit" => self.feed.subreddit = value.to_string(),
            "window" | "time_window" => self.feed.time_window = value.to_string(),
            "limit" => self.feed.limit = value.parse().map_err(invalid)?,
            "quality" => {
                let quality: u8 = value.parse().map_err(invalid)?;
                if quality > 100 {
                    return Err(format!("invalid value for {key}: {value}"));
                }
                self.normalize.quality = quality;
            }
            "interval" | "interval_hours" => {
                self.schedule.interval_hours = value.parse().map_err(invalid)?
            }
            _ => return Err(format!("unknown config key: {key}")),
        }
        Ok(())
    }

    /// 获取配置文件的 JSON Schema
    pub fn get_schema() -> String {
        let schema = schemars::schema_for!(ConfigFile);
        serde_json::to_string_pretty(&schema)
            .unwrap_or_else(|_| "{}".to_string())
    }

    /// 将当前配置转换为 TOML 字符串
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(&self.to_file())
            .unwrap_or_else(|_| "# Error serializing config".to_string())
    }
}
