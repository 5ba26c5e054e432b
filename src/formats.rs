use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use url::Url;

/// Per-article JSON written by the scraper: `{title, subtitle, content, url}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub section: String,
    pub content: Vec<String>,
    pub url: Url,
}

impl ArticleRecord {
    /// Section identifier, falling back to the first URL path segment.
    pub fn section(&self) -> String {
        if !self.section.is_empty() {
            return self.section.clone();
        }
        first_path_segment(&self.url).unwrap_or_default().to_owned()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleMeta {
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    pub filename: String,
    #[serde(default)]
    pub section: String,
}

/// Scrape progress snapshot (`state.json`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectionState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default)]
    pub urls: Vec<String>,
    #[serde(default)]
    pub articles: BTreeMap<String, ArticleMeta>,
}

impl CollectionState {
    /// `urls` in canonical order with duplicates removed.
    pub fn unique_urls(&self) -> impl Iterator<Item = &str> {
        let mut seen = HashSet::new();
        self.urls
            .iter()
            .map(String::as_str)
            .filter(move |url| seen.insert(*url))
    }

    /// Articles that are both listed in `urls` and present in `articles`, in `urls` order.
    pub fn resolved(&self) -> impl Iterator<Item = (&str, &ArticleMeta)> {
        self.unique_urls()
            .filter_map(|url| self.articles.get(url).map(|meta| (url, meta)))
    }

    /// `articles` keys that `urls` never mentions.
    pub fn orphans(&self) -> Vec<&str> {
        let listed: HashSet<&str> = self.urls.iter().map(String::as_str).collect();
        self.articles
            .keys()
            .map(String::as_str)
            .filter(|url| !listed.contains(url))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MagazineStructure {
    pub title: Option<String>,
    pub date: Option<String>,
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    pub id: String,
    pub title: String,
    pub articles: Vec<SectionArticle>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionArticle {
    pub title: String,
    pub subtitle: String,
    pub source_url: String,
    /// Path of the article document relative to `OEBPS/`.
    pub epub_href: String,
}

pub fn first_path_segment(url: &Url) -> Option<&str> {
    url.path_segments()?.next().filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(title: &str) -> ArticleMeta {
        ArticleMeta {
            title: title.to_owned(),
            subtitle: String::new(),
            filename: format!("{title}.json"),
            section: String::new(),
        }
    }

    #[test]
    fn resolved_follows_urls_order_and_skips_unknown() {
        let mut state = CollectionState {
            urls: vec![
                "https://x.test/b/1".to_owned(),
                "https://x.test/a/2".to_owned(),
                "https://x.test/b/1".to_owned(),
                "https://x.test/c/3".to_owned(),
            ],
            ..Default::default()
        };
        state.articles.insert("https://x.test/a/2".to_owned(), meta("two"));
        state.articles.insert("https://x.test/b/1".to_owned(), meta("one"));
        state.articles.insert("https://x.test/z/9".to_owned(), meta("orphan"));

        let resolved = state.resolved().map(|(url, _)| url).collect::<Vec<_>>();
        assert_eq!(resolved, vec!["https://x.test/b/1", "https://x.test/a/2"]);
        assert_eq!(state.orphans(), vec!["https://x.test/z/9"]);
    }

    #[test]
    fn article_record_tolerates_missing_subtitle() -> anyhow::Result<()> {
        let record: ArticleRecord = serde_json::from_str(
            r#"{"title":"T","content":["<p>x</p>"],"url":"https://x.test/europe/2024/01/01/t"}"#,
        )?;
        assert_eq!(record.subtitle, "");
        assert_eq!(record.section(), "europe");
        Ok(())
    }

    #[test]
    fn state_decodes_with_defaults() -> anyhow::Result<()> {
        let state: CollectionState = serde_json::from_str("{}")?;
        assert_eq!(state, CollectionState::default());
        Ok(())
    }
}
