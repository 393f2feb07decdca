//! RSS 2.0 feed of the most recent stories.

use crate::error::Result;
use crate::models::Article;
use crate::store::write_atomic;
use chrono::{DateTime, Utc};
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Write;
use std::path::Path;
use tracing::{info, instrument};

pub const CHANNEL_TITLE: &str = "Horn Updates";
pub const CHANNEL_DESCRIPTION: &str =
    "News from the Horn of Africa. Short summaries with links to the original publishers.";
pub const MAX_ITEMS: usize = 50;

fn text_element<W: Write>(w: &mut Writer<W>, name: &str, text: &str) -> Result<()> {
    w.write_event(Event::Start(BytesStart::new(name)))?;
    w.write_event(Event::Text(BytesText::new(text)))?;
    w.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

/// Render the channel. Items without a title or link are skipped; the rest
/// are ordered newest first and capped at [`MAX_ITEMS`].
pub fn render_rss(articles: &[Article], site: &str, now: DateTime<Utc>) -> Result<String> {
    let mut items: Vec<&Article> = articles
        .iter()
        .filter(|a| !a.title.trim().is_empty() && !item_link(a).is_empty())
        .collect();
    items.sort_by(|a, b| b.published_at.cmp(&a.published_at));

    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    let mut rss = BytesStart::new("rss");
    rss.push_attribute(("version", "2.0"));
    writer.write_event(Event::Start(rss))?;
    writer.write_event(Event::Start(BytesStart::new("channel")))?;
    text_element(&mut writer, "title", CHANNEL_TITLE)?;
    text_element(&mut writer, "link", site)?;
    text_element(&mut writer, "description", CHANNEL_DESCRIPTION)?;
    text_element(&mut writer, "lastBuildDate", &now.to_rfc2822())?;

    for article in items.into_iter().take(MAX_ITEMS) {
        let link = item_link(article);
        writer.write_event(Event::Start(BytesStart::new("item")))?;
        text_element(&mut writer, "title", article.title.trim())?;
        text_element(&mut writer, "link", link)?;

        let mut guid = BytesStart::new("guid");
        guid.push_attribute(("isPermaLink", "true"));
        writer.write_event(Event::Start(guid))?;
        writer.write_event(Event::Text(BytesText::new(link)))?;
        writer.write_event(Event::End(BytesEnd::new("guid")))?;

        text_element(&mut writer, "pubDate", &article.published_at.to_rfc2822())?;

        // A literal "]]>" would end the section early.
        let description = article.summary.trim().replace("]]>", "]]&gt;");
        writer.write_event(Event::Start(BytesStart::new("description")))?;
        writer.write_event(Event::CData(BytesCData::new(description.as_str())))?;
        writer.write_event(Event::End(BytesEnd::new("description")))?;
        writer.write_event(Event::End(BytesEnd::new("item")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("channel")))?;
    writer.write_event(Event::End(BytesEnd::new("rss")))?;
    let mut xml = String::from_utf8_lossy(&writer.into_inner()).into_owned();
    xml.push('\n');
    Ok(xml)
}

fn item_link(article: &Article) -> &str {
    let url = article.source_url.trim();
    if url.is_empty() { article.link.trim() } else { url }
}

#[instrument(level = "info", skip(articles), fields(articles = articles.len(), path = %path.display()))]
pub async fn write_rss(articles: &[Article], site: &str, path: &Path) -> Result<usize> {
    let xml = render_rss(articles, site, Utc::now())?;
    write_atomic(path, xml.as_bytes()).await?;
    let items = xml.matches("<item>").count();
    info!(items, "Wrote RSS feed");
    Ok(items)
}
