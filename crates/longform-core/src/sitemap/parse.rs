//! Sitemap XML parsing. Both `sitemapindex` and `urlset` documents use the
//! same flat `<tag><loc>URL</loc></tag>` shape, so a single streaming pass
//! over `<loc>` elements (scoped to whichever top-level wrapper is present)
//! is sufficient — no DOM tree is needed.

use quick_xml::events::Event;
use quick_xml::reader::Reader;

/// The two document shapes a sitemap fetch may return, plus the degraded
/// "could not parse at all" case.
pub enum ParsedSitemap {
    /// A `<urlset>` of page URLs.
    UrlSet(Vec<String>),
    /// A `<sitemapindex>` of child sitemap URLs to recurse into.
    Index(Vec<String>),
    /// Neither tag was found, or the XML did not parse.
    Unrecognized,
}

/// Parse a sitemap XML document, returning its locs and whether it was a
/// `urlset` or a `sitemapindex`.
pub fn parse_sitemap(xml: &str) -> ParsedSitemap {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut locs = Vec::new();
    let mut is_index = false;
    let mut is_urlset = false;
    let mut in_loc = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match local_name(e.name().as_ref()) {
                "sitemapindex" => is_index = true,
                "urlset" => is_urlset = true,
                "loc" => in_loc = true,
                _ => {}
            },
            Ok(Event::End(e)) => {
                if local_name(e.name().as_ref()) == "loc" {
                    in_loc = false;
                }
            }
            Ok(Event::Text(t)) => {
                if in_loc {
                    if let Ok(text) = t.unescape() {
                        let trimmed = text.trim();
                        if !trimmed.is_empty() {
                            locs.push(trimmed.to_string());
                        }
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(_) => return ParsedSitemap::Unrecognized,
            _ => {}
        }
        buf.clear();
    }

    if is_index {
        ParsedSitemap::Index(locs)
    } else if is_urlset || !locs.is_empty() {
        ParsedSitemap::UrlSet(locs)
    } else {
        ParsedSitemap::Unrecognized
    }
}

fn local_name(qualified: &[u8]) -> &str {
    let s = std::str::from_utf8(qualified).unwrap_or("");
    s.rsplit(':').next().unwrap_or(s)
}

/// Extract every `Sitemap:` directive URL from a `robots.txt` body
/// (§4.3 step 1), case-insensitive on the directive keyword.
pub fn robots_txt_sitemaps(body: &str) -> Vec<String> {
    const DIRECTIVE: &str = "sitemap:";
    body.lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.len() < DIRECTIVE.len() || !line[..DIRECTIVE.len()].eq_ignore_ascii_case(DIRECTIVE) {
                return None;
            }
            let url = line[DIRECTIVE.len()..].trim();
            (!url.is_empty()).then(|| url.to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_urlset() {
        let xml = r#"<?xml version="1.0"?>
            <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
              <url><loc>https://x.com/a</loc></url>
              <url><loc>https://x.com/b</loc></url>
            </urlset>"#;
        match parse_sitemap(xml) {
            ParsedSitemap::UrlSet(urls) => assert_eq!(urls, vec!["https://x.com/a", "https://x.com/b"]),
            _ => panic!("expected UrlSet"),
        }
    }

    #[test]
    fn parses_sitemap_index() {
        let xml = r#"<?xml version="1.0"?>
            <sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
              <sitemap><loc>https://x.com/sitemap-1.xml</loc></sitemap>
            </sitemapindex>"#;
        match parse_sitemap(xml) {
            ParsedSitemap::Index(urls) => assert_eq!(urls, vec!["https://x.com/sitemap-1.xml"]),
            _ => panic!("expected Index"),
        }
    }

    #[test]
    fn unrecognized_on_garbage() {
        assert!(matches!(parse_sitemap("not xml at all"), ParsedSitemap::Unrecognized));
    }

    #[test]
    fn robots_txt_extracts_sitemap_directives() {
        let body = "User-agent: *\nDisallow: /admin\nSitemap: https://x.com/sitemap.xml\nsitemap: https://x.com/sitemap2.xml\n";
        let sitemaps = robots_txt_sitemaps(body);
        assert_eq!(sitemaps, vec!["https://x.com/sitemap.xml", "https://x.com/sitemap2.xml"]);
    }

    #[test]
    fn robots_txt_empty_without_directive() {
        assert!(robots_txt_sitemaps("User-agent: *\nDisallow: /\n").is_empty());
    }
}
