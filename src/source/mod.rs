// source/mod.rs — 壁纸源模块入口
// 定义信息流客户端必须实现的通用 Trait，以及上层使用的候选项结构
pub mod reddit;

use crate::error::NetworkError;
use async_trait::async_trait; // 异步 Trait 支持宏

/// 信息流中的一个候选壁纸
/// 不论来自哪个站点，都转换成这个结构体供上层使用；解析后不再修改
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// 帖子标题，用于生成本地文件名
    pub title: String,
    /// 资源地址（期望是图片直链）
    pub url: String,
    /// 信息流给出的得分
    pub score: i64,
}

/// 查询参数：分类、时间窗口、结果数量
#[derive(Debug, Clone)]
pub struct FeedQuery {
    pub category: String,
    pub time_window: String,
    pub limit: u32,
}

/// 壁纸源的抽象 Trait
///
/// `top` 返回按排名排好序的候选列表，`fetch` 只负责取回字节，不关心内容含义。
#[async_trait]
pub trait WallpaperSource: Send + Sync {
    /// 查询排名靠前的候选项
    async fn top(&self, query: &FeedQuery) -> Result<Vec<Candidate>, NetworkError>;

    /// 下载指定地址的完整响应体
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, NetworkError>;
}
