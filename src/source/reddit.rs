// reddit.rs — Reddit 信息流异步客户端模块
// 负责查询子版块的热门帖子并下载图片

use super::{Candidate, FeedQuery, WallpaperSource};
use crate::error::NetworkError;
use async_trait::async_trait;
use serde::Deserialize; // 反序列化 trait，用于将 JSON 转为 Rust 结构体
use std::time::Duration;

/// Reddit 拒绝不带 User-Agent 的匿名请求
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// 列表响应的顶层结构：`{"data": {"children": [...]}}`
///
/// 只提取我们需要的字段，JSON 中多余的字段会被 serde 自动忽略
#[derive(Deserialize, Debug)]
pub struct Listing {
    pub data: ListingData,
}

#[derive(Deserialize, Debug)]
pub struct ListingData {
    #[serde(default)]
    pub children: Vec<Child>,
}

#[derive(Deserialize, Debug)]
pub struct Child {
    pub data: Post,
}

/// 单个帖子
#[derive(Deserialize, Debug)]
pub struct Post {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub score: i64,
}

impl Listing {
    /// 展开信息流信封，保持原有排名顺序
    pub fn into_candidates(self) -> Vec<Candidate> {
        self.data
            .children
            .into_iter()
            .map(|child| Candidate {
                title: child.data.title,
                url: child.data.url,
                score: child.data.score,
            })
            .collect()
    }
}

/// Reddit 异步客户端
///
/// 封装了 reqwest::Client（内部有连接池，应复用）和基础 URL。
/// 所有请求共享同一个超时上限。
pub struct RedditClient {
    client: reqwest::Client,
    base_url: String,
}

impl RedditClient {
    /// 创建新的 Reddit 客户端
    ///
    /// # 参数
    /// - `user_agent`: 请求头中的 User-Agent
    /// - `timeout`: 单个请求的超时上限
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, NetworkError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(NetworkError::Client)?;

        Ok(Self {
            client,
            base_url: String::from("https://www.reddit.com"),
        })
    }

    fn listing_url(&self, category: &str) -> String {
        format!("{}/r/{}/top/.json", self.base_url, category)
    }

    /// 发送 GET 请求并检查状态码
    async fn get(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<reqwest::Response, NetworkError> {
        let response = self
            .client
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(|source| NetworkError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(NetworkError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl WallpaperSource for RedditClient {
    async fn top(&self, query: &FeedQuery) -> Result<Vec<Candidate>, NetworkError> {
        let url = self.listing_url(&query.category);
        let params = [
            ("t", query.time_window.clone()),
            ("limit", query.limit.to_string()),
        ];

        tracing::debug!(%url, window = %query.time_window, limit = query.limit, "querying feed");
        let response = self.get(&url, &params).await?;

        let listing: Listing = response
            .json()
            .await
            .map_err(|source| NetworkError::Body { url, source })?;

        Ok(listing.into_candidates())
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, NetworkError> {
        let response = self.get(url, &[]).await?;
        let bytes = response.bytes().await.map_err(|source| NetworkError::Body {
            url: url.to_string(),
            source,
        })?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_envelope_keeps_feed_order() -> Result<(), Box<dyn std::error::Error>> {
        let body = r#"{
            "kind": "Listing",
            "data": {
                "after": "t3_x",
                "children": [
                    {"kind": "t3", "data": {"title": "First", "url": "https://i.redd.it/a.png", "score": 900, "ups": 1}},
                    {"kind": "t3", "data": {"title": "Second", "url": "https://v.redd.it/b", "score": 400}}
                ]
            }
        }"#;

        let candidates = serde_json::from_str::<Listing>(body)?.into_candidates();
        assert_eq!(
            candidates,
            vec![
                Candidate {
                    title: "First".into(),
                    url: "https://i.redd.it/a.png".into(),
                    score: 900,
                },
                Candidate {
                    title: "Second".into(),
                    url: "https://v.redd.it/b".into(),
                    score: 400,
                },
            ]
        );
        Ok(())
    }

    #[test]
    fn empty_listing_has_no_candidates() -> Result<(), Box<dyn std::error::Error>> {
        let listing: Listing = serde_json::from_str(r#"{"data": {}}"#)?;
        assert!(listing.into_candidates().is_empty());
        Ok(())
    }

    #[test]
    fn listing_url_is_templated_by_category() -> Result<(), Box<dyn std::error::Error>> {
        let client = RedditClient::new(DEFAULT_USER_AGENT, Duration::from_secs(30))?;
        assert_eq!(
            client.listing_url("wallpaper"),
            "https://www.reddit.com/r/wallpaper/top/.json"
        );
        Ok(())
    }
}
