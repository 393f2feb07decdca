//! Reader sitemap generation.
//!
//! Every story gets one `<url>` whose `<loc>` is the site's reader page with
//! the percent-encoded source URL as its `url` parameter:
//!
//! ```text
//! https://hornupdates.com/reader.html?url=https%3A%2F%2Fwww.hiiraan.com%2Fnews%2Fa.html
//! ```
//!
//! `<lastmod>` is the story's publish date (`YYYY-MM-DD`). A gzip copy is
//! written next to the XML file.

use crate::error::Result;
use crate::models::Article;
use crate::store::write_atomic;
use flate2::write::GzEncoder;
use flate2::Compression;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// Search engines stop reading a single sitemap after this many URLs.
pub const MAX_URLS: usize = 50_000;

const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

/// Reader deep link for a story.
pub fn reader_url(site: &str, source_url: &str) -> String {
    format!(
        "{}/reader.html?url={}",
        site.trim_end_matches('/'),
        urlencoding::encode(source_url.trim())
    )
}

fn text_element<W: Write>(w: &mut Writer<W>, name: &str, text: &str) -> Result<()> {
    w.write_event(Event::Start(BytesStart::new(name)))?;
    w.write_event(Event::Text(BytesText::new(text)))?;
    w.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

/// Render the sitemap XML. Returns the document and the number of URLs in it.
pub fn render_sitemap(articles: &[Article], site: &str, max_urls: usize) -> Result<(String, usize)> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    let mut urlset = BytesStart::new("urlset");
    urlset.push_attribute(("xmlns", SITEMAP_NS));
    writer.write_event(Event::Start(urlset))?;

    let mut count = 0;
    for article in articles
        .iter()
        .filter(|a| !a.source_url.trim().is_empty() || !a.link.trim().is_empty())
        .take(max_urls)
    {
        let source = if article.source_url.trim().is_empty() {
            &article.link
        } else {
            &article.source_url
        };
        writer.write_event(Event::Start(BytesStart::new("url")))?;
        text_element(&mut writer, "loc", &reader_url(site, source))?;
        text_element(&mut writer, "lastmod", &article.published_at.date_naive().to_string())?;
        writer.write_event(Event::End(BytesEnd::new("url")))?;
        count += 1;
    }

    writer.write_event(Event::End(BytesEnd::new("urlset")))?;
    let mut xml = String::from_utf8_lossy(&writer.into_inner()).into_owned();
    xml.push('\n');
    Ok((xml, count))
}

pub fn gzip_bytes(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// `sitemap-reader.xml` → `sitemap-reader.xml.gz`
pub fn gz_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".gz");
    PathBuf::from(name)
}

/// Write the sitemap and its gzip copy; returns the URL count.
#[instrument(level = "info", skip(articles), fields(articles = articles.len(), path = %path.display()))]
pub async fn write_sitemap(articles: &[Article], site: &str, path: &Path) -> Result<usize> {
    let (xml, count) = render_sitemap(articles, site, MAX_URLS)?;
    write_atomic(path, xml.as_bytes()).await?;
    let gz = gz_path(path);
    write_atomic(&gz, &gzip_bytes(xml.as_bytes())?).await?;
    info!(urls = count, gz = %gz.display(), "Wrote reader sitemap");
    Ok(count)
}
