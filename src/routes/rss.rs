use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};

use crate::config::AppConfig;
use crate::db::models::BlogPost;
use crate::error::ApiError;
use crate::AppState;

const FEED_LIMIT: usize = 50;

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn rfc822(dt: &DateTime<Utc>) -> String {
    dt.format("%a, %d %b %Y %H:%M:%S +0000").to_string()
}

fn published(post: &BlogPost) -> DateTime<Utc> {
    post.published_at.unwrap_or(post.created_at)
}

fn render_feed(config: &AppConfig, posts: &[BlogPost]) -> String {
    let base_url = config.site_url.trim_end_matches('/');

    let mut items = String::new();
    for post in posts {
        let post_url = format!("{}/blog/{}", base_url, post.slug);
        let desc = post.excerpt.as_deref().unwrap_or("");
        items.push_str(&format!(
            "    <item>\n\
                   <title>{}</title>\n\
                   <link>{}</link>\n\
                   <description>{}</description>\n\
                   <pubDate>{}</pubDate>\n\
                   <guid isPermaLink=\"true\">{}</guid>\n\
                 </item>\n",
            escape_xml(&post.title),
            escape_xml(&post_url),
            escape_xml(desc),
            rfc822(&published(post)),
            escape_xml(&post_url),
        ));
    }

    let feed_url = format!("{}/rss.xml", base_url);
    let blog_url = format!("{}/blog", base_url);

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:atom="http://www.w3.org/2005/Atom">
  <channel>
    <title>{}</title>
    <link>{}</link>
    <description>{}</description>
    <language>en-us</language>
    <atom:link href="{}" rel="self" type="application/rss+xml"/>
    <lastBuildDate>{}</lastBuildDate>
{}  </channel>
</rss>"#,
        escape_xml(&config.site_title),
        escape_xml(&blog_url),
        escape_xml(&config.site_description),
        escape_xml(&feed_url),
        posts.first().map(|p| rfc822(&published(p))).unwrap_or_default(),
        items,
    )
}

/// GET /rss.xml - the 50 most recent live posts
pub async fn rss_feed(State(state): State<AppState>) -> Result<Response, ApiError> {
    let mut posts = state.store.list_live_posts(Utc::now()).await?;
    posts.truncate(FEED_LIMIT);

    let xml = render_feed(&state.config, &posts);
    Ok((
        [
            (header::CONTENT_TYPE, "application/rss+xml; charset=utf-8"),
            (
                header::CACHE_CONTROL,
                "public, max-age=3600, stale-while-revalidate=600",
            ),
        ],
        xml,
    )
        .into_response())
}
