//! Minimal, dependency-light HTML scraping for the research engine.
//! Grounded on the original website parser's title/meta/contact extraction,
//! re-expressed as cheap regex passes rather than a full DOM parse — the
//! source pages are marketing sites, not hostile input we need to render.

use std::sync::OnceLock;

use regex::Regex;

use crate::collaborators::WebsiteData;

fn title_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").unwrap())
}

fn meta_description_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?is)<meta\s+[^>]*name=["']description["'][^>]*content=["'](.*?)["']"#)
            .unwrap()
    })
}

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap())
}

fn phone_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\+?\d[\d\s().-]{7,}\d").unwrap())
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<[^>]+>").unwrap())
}

/// Extracts whatever structured signal is cheaply recoverable from a raw
/// HTML document: page title, meta description, and the first email/phone
/// pair found anywhere in the markup.
pub fn extract(url: &str, html: &str) -> WebsiteData {
    let title = title_re()
        .captures(html)
        .map(|c| clean_text(&c[1]))
        .filter(|s| !s.is_empty());

    let description = meta_description_re()
        .captures(html)
        .map(|c| clean_text(&c[1]))
        .filter(|s| !s.is_empty());

    let contact_email = email_re().find(html).map(|m| m.as_str().to_string());
    let contact_phone = phone_re()
        .find(html)
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| s.chars().filter(|c| c.is_ascii_digit()).count() >= 7);

    WebsiteData {
        url: url.to_string(),
        title,
        description,
        services: Vec::new(),
        contact_phone,
        contact_email,
    }
}

fn clean_text(raw: &str) -> String {
    let without_tags = tag_re().replace_all(raw, " ");
    without_tags.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_title_and_description() {
        let html = r#"<html><head><title>Acme Corp</title>
            <meta name="description" content="We build things."></head>
            <body>Call us at +1 415-555-0101 or mail hello@acme.test</body></html>"#;
        let data = extract("https://acme.test", html);
        assert_eq!(data.title.as_deref(), Some("Acme Corp"));
        assert_eq!(data.description.as_deref(), Some("We build things."));
        assert_eq!(data.contact_email.as_deref(), Some("hello@acme.test"));
        assert!(data.contact_phone.is_some());
    }

    #[test]
    fn missing_fields_are_none() {
        let data = extract("https://acme.test", "<html><body>nothing here</body></html>");
        assert!(data.title.is_none());
        assert!(data.description.is_none());
        assert!(data.contact_email.is_none());
    }
}
