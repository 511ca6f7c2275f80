// selector.rs — 候选项挑选
// 从排好序的信息流里挑出第一个图片直链

use crate::source::Candidate;

/// 可直接作为壁纸的图片扩展名（小写，不含点）
pub const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "bmp", "gif"];

/// 判断 URL 是否以允许的图片扩展名结尾（忽略大小写）
pub fn is_image_url(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    IMAGE_EXTENSIONS
        .iter()
        .any(|ext| lower.ends_with(&format!(".{ext}")))
}

/// 返回第一个资源地址是图片直链的候选项，没有则返回 None
pub fn select(candidates: &[Candidate]) -> Option<&Candidate> {
    candidates.iter().find(|c| is_image_url(&c.url))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(title: &str, url: &str) -> Candidate {
        Candidate {
            title: title.to_string(),
            url: url.to_string(),
            score: 1,
        }
    }

    #[test]
    fn picks_first_image_in_feed_order() {
        let feed = vec![
            candidate("a", "https://host/a.txt"),
            candidate("b", "https://host/b.PNG"),
            candidate("c", "https://host/c.jpg"),
        ];
        assert_eq!(select(&feed).map(|c| c.title.as_str()), Some("b"));
    }

    #[test]
    fn every_allowed_extension_matches() {
        for url in [
            "x.jpg", "x.JPEG", "x.png", "x.Bmp", "x.gif",
        ] {
            assert!(is_image_url(url), "{url} should match");
        }
    }

    #[test]
    fn gallery_and_video_links_are_skipped() {
        let feed = vec![
            candidate("gallery", "https://www.reddit.com/gallery/abc"),
            candidate("video", "https://v.redd.it/xyz"),
            candidate("query", "https://host/img.jpg?width=640"),
            candidate("webp", "https://host/img.webp"),
        ];
        assert!(select(&feed).is_none());
    }

    #[test]
    fn bare_extension_without_dot_does_not_match() {
        assert!(!is_image_url("https://host/notajpg"));
    }

    #[test]
    fn empty_feed_yields_nothing() {
        assert!(select(&[]).is_none());
    }
}
