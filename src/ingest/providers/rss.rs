// src/ingest/providers/rss.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use quick_xml::de::from_str;
use serde::Deserialize;

use crate::ingest::clean_snippet;
use crate::ingest::providers::get_text;
use crate::ingest::types::{NewsItem, NewsProvider};

pub const NEWS_SNIPPET_MAX_CHARS: usize = 300;
const ITEMS_PER_FEED: usize = 10;

pub const DEFAULT_FEEDS: &[(&str, &str)] = &[
    ("TechCrunch Layoffs", "https://techcrunch.com/tag/layoffs/feed/"),
    (
        "Hacker News Best",
        "https://hnrss.org/best?q=hiring+OR+layoffs+OR+AI+jobs&count=15",
    ),
    ("Dice Insights", "https://www.dice.com/career-advice/feed"),
    ("The Verge Tech", "https://www.theverge.com/rss/tech/index.xml"),
];

/// An item is kept only if its title or description mentions one of these.
pub const NEWS_KEYWORDS: &[&str] = &[
    "tech", "ai", "layoff", "hiring", "job", "engineer", "developer", "software", "data",
    "machine learning", "startup", "cloud", "cyber", "openai", "google", "meta", "amazon",
    "microsoft", "salary", "remote",
];

/* RSS 2.0 */

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}
#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}
#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

/* Atom */

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entry: Vec<Entry>,
}
#[derive(Debug, Deserialize)]
struct Entry {
    title: Option<AtomText>,
    #[serde(default)]
    link: Vec<AtomLink>,
    published: Option<String>,
    updated: Option<String>,
    summary: Option<AtomText>,
    content: Option<AtomText>,
}
#[derive(Debug, Deserialize)]
struct AtomText {
    #[serde(rename = "$text", default)]
    value: String,
}
#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href", default)]
    href: String,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

pub struct RssFeedProvider {
    name: String,
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http {
        url: String,
        client: reqwest::Client,
    },
}

impl RssFeedProvider {
    pub fn from_url(name: &str, url: &str, client: reqwest::Client) -> Self {
        Self {
            name: name.to_string(),
            mode: Mode::Http {
                url: url.to_string(),
                client,
            },
        }
    }

    pub fn from_fixture(name: &str, xml: &str) -> Self {
        Self {
            name: name.to_string(),
            mode: Mode::Fixture(xml.to_string()),
        }
    }

    /// Parse an RSS 2.0 or Atom document into keyword-matching news items.
    pub fn parse_feed(xml: &str, source: &str) -> Result<Vec<NewsItem>> {
        let xml_clean = scrub_html_entities_for_xml(xml);

        let raw: Vec<(String, String, String, String)> = match from_str::<Rss>(&xml_clean) {
            Ok(rss) => rss
                .channel
                .item
                .into_iter()
                .take(ITEMS_PER_FEED)
                .map(|it| {
                    (
                        it.title.unwrap_or_default(),
                        it.link.unwrap_or_default(),
                        it.pub_date.unwrap_or_default(),
                        it.description.unwrap_or_default(),
                    )
                })
                .collect(),
            // Atom has no required fields, so only try it on an Atom-looking document.
            Err(rss_err) if !xml_clean.contains("<feed") => {
                return Err(rss_err).context("feed is neither RSS nor Atom");
            }
            Err(rss_err) => {
                let atom: AtomFeed = from_str(&xml_clean)
                    .with_context(|| format!("feed is neither RSS ({rss_err}) nor Atom"))?;
                atom.entry
                    .into_iter()
                    .take(ITEMS_PER_FEED)
                    .map(|e| {
                        let link = e
                            .link
                            .iter()
                            .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
                            .or_else(|| e.link.first())
                            .map(|l| l.href.clone())
                            .unwrap_or_default();
                        let published = e
                            .published
                            .filter(|s| !s.trim().is_empty())
                            .or(e.updated)
                            .unwrap_or_default();
                        let desc = e
                            .summary
                            .map(|t| t.value)
                            .filter(|s| !s.trim().is_empty())
                            .or(e.content.map(|t| t.value))
                            .unwrap_or_default();
                        (
                            e.title.map(|t| t.value).unwrap_or_default(),
                            link,
                            published,
                            desc,
                        )
                    })
                    .collect()
            }
        };

        let out = raw
            .into_iter()
            .filter(|(title, _, _, desc)| mentions_keyword(&format!("{title} {desc}")))
            .map(|(title, link, published, desc)| NewsItem {
                title: title.trim().to_string(),
                url: link.trim().to_string(),
                published: published.trim().to_string(),
                source: source.to_string(),
                snippet: clean_snippet(&desc, NEWS_SNIPPET_MAX_CHARS),
            })
            .collect();
        Ok(out)
    }
}

#[async_trait]
impl NewsProvider for RssFeedProvider {
    async fn fetch_news(&self) -> Result<Vec<NewsItem>> {
        match &self.mode {
            Mode::Fixture(s) => Self::parse_feed(s, &self.name),
            Mode::Http { url, client } => {
                let body = get_text(client, url).await?;
                Self::parse_feed(&body, &self.name)
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

fn mentions_keyword(text: &str) -> bool {
    let t = text.to_lowercase();
    NEWS_KEYWORDS.iter().any(|k| t.contains(k))
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
        .replace("&hellip;", "...")
}
