//! Markdown rendering for post bodies.
//!
//! Hashtags become tag links and `@handle` mentions become profile links before
//! the markdown is parsed; the HTML is sanitised afterwards.

use std::borrow::Cow;

use ammonia::Builder as AmmoniaBuilder;
use comrak::{Options, markdown_to_html};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;

use crate::domain::entities::PostRecord;
use crate::domain::tags::{TAG_CAPTURE, TagExtractor};

pub const MENTION_BASE_URL: &str = "https://twitter.com";

static MENTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(^|\s)@(\w+)").expect("mention pattern compiles"));

/// A post together with the values derived from it for display.
#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    #[serde(flatten)]
    pub post: PostRecord,
    pub summary: String,
    pub read_time_seconds: u32,
    pub uri: String,
    pub html: String,
}

pub struct PostRenderer {
    options: Options<'static>,
    sanitizer: AmmoniaBuilder<'static>,
    extractor: TagExtractor,
    base_url: String,
}

impl PostRenderer {
    pub fn new(extractor: TagExtractor, base_url: impl Into<String>) -> Self {
        Self {
            options: default_options(),
            sanitizer: build_sanitizer(),
            extractor,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn view(&self, post: &PostRecord) -> PostView {
        PostView {
            summary: post.summary().to_string(),
            read_time_seconds: post.read_time_seconds(),
            uri: post.uri(&self.base_url),
            html: self.render_markdown(&post.content),
            post: post.clone(),
        }
    }

    pub fn render_markdown(&self, markdown: &str) -> String {
        let linked = self.link_mentions(&self.link_hashtags(markdown)).into_owned();
        let html = markdown_to_html(&linked, &self.options);
        self.sanitizer.clean(&html).to_string()
    }

    fn link_hashtags<'a>(&self, text: &'a str) -> Cow<'a, str> {
        let pattern = self.extractor.rules().pattern();
        pattern.replace_all(text, |captures: &Captures<'_>| {
            let whole = captures.get_match();
            let Some(tag) = captures.name(TAG_CAPTURE) else {
                return whole.as_str().to_string();
            };
            let prefix = &text[whole.start()..tag.start()];
            let marker = prefix.trim_start();
            let leading = &prefix[..prefix.len() - marker.len()];
            let suffix = &text[tag.end()..whole.end()];
            format!(
                "{leading}[{marker}{word}]({base}/tags/{slug}){suffix}",
                word = tag.as_str(),
                base = self.base_url,
                slug = tag.as_str().to_lowercase(),
            )
        })
    }

    fn link_mentions<'a>(&self, text: &'a str) -> Cow<'a, str> {
        MENTION.replace_all(text, format!("${{1}}[@${{2}}]({MENTION_BASE_URL}/${{2}})").as_str())
    }
}

fn default_options() -> Options<'static> {
    let mut options = Options::default();
    let ext = &mut options.extension;
    ext.strikethrough = true;
    ext.table = true;
    ext.autolink = true;
    ext.tasklist = true;
    ext.footnotes = true;
    options.render.github_pre_lang = true;
    options
}

fn build_sanitizer() -> AmmoniaBuilder<'static> {
    let mut builder = AmmoniaBuilder::default();
    builder.add_generic_attributes(&["class"]);
    builder.add_tag_attributes("input", &["type", "checked", "disabled"]);
    builder.add_tags(&["input"]);
    builder.add_url_schemes(["http", "https", "mailto"].iter().copied());
    builder
}
