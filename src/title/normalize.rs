use crate::title::Title;
use crate::{TitleError, TitleResult};
use url::Url;

/// Characters MediaWiki never allows inside a page title
const ILLEGAL_CHARACTERS: &[char] = &['[', ']', '{', '}', '|', '<', '>'];

/// Namespace prefixes (lowercased) whose pages are not articles
const NON_ARTICLE_NAMESPACES: &[&str] = &[
    "book",
    "category",
    "draft",
    "file",
    "help",
    "image",
    "media",
    "mediawiki",
    "module",
    "portal",
    "special",
    "talk",
    "template",
    "timedtext",
    "user",
    "wikipedia",
    "wp",
];

/// Normalizes a raw title according to DisamGraph's canonicalization rules
///
/// # Normalization Steps
///
/// 1. Drop the fragment (everything after `#`); a fragment-only link is rejected
/// 2. Drop one leading `:` (wikitext escape for namespace links)
/// 3. Replace underscores with spaces and collapse runs of whitespace
/// 4. Reject empty titles and titles containing `[ ] { } | < >`
/// 5. Reject titles in a non-article namespace (`File:`, `Category:`, any `... talk:`)
/// 6. Upper-case the first character; the rest stays case-sensitive
///
/// # Examples
///
/// ```
/// use disamgraph::title::normalize_title;
///
/// let title = normalize_title("  shot_glass#Uses ").unwrap();
/// assert_eq!(title.as_str(), "Shot glass");
/// ```
pub fn normalize_title(raw: &str) -> TitleResult<Title> {
    let trimmed = raw.trim();
    if trimmed.starts_with('#') {
        return Err(TitleError::FragmentOnly(raw.to_string()));
    }

    let without_fragment = match trimmed.split_once('#') {
        Some((page, _)) => page,
        None => trimmed,
    };
    let without_escape = without_fragment
        .trim_start()
        .strip_prefix(':')
        .unwrap_or(without_fragment);

    let collapsed = without_escape
        .replace('_', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    if collapsed.is_empty() {
        return Err(TitleError::Empty);
    }

    if collapsed.contains(ILLEGAL_CHARACTERS) {
        return Err(TitleError::IllegalCharacters(collapsed));
    }

    if let Some((prefix, _)) = collapsed.split_once(':') {
        let namespace = prefix.trim().to_lowercase();
        if NON_ARTICLE_NAMESPACES.contains(&namespace.as_str()) || namespace.ends_with(" talk") {
            return Err(TitleError::NonArticle(collapsed));
        }
    }

    Ok(Title::from_normalized(capitalize_first(&collapsed)))
}

/// Resolves an `href` against the article base URL and normalizes the title it names
///
/// Accepts `/wiki/Title`, `./Title` and absolute links under the same host.
/// Links carrying a query string (edit links, red links) are rejected.
///
/// # Examples
///
/// ```
/// use disamgraph::title::title_from_href;
/// use url::Url;
///
/// let base = Url::parse("https://en.wikipedia.org/wiki/").unwrap();
/// let title = title_from_href("/wiki/Shot_(filmmaking)", &base).unwrap();
/// assert_eq!(title.as_str(), "Shot (filmmaking)");
/// ```
pub fn title_from_href(href: &str, base_url: &Url) -> TitleResult<Title> {
    let href = href.trim();

    if href.is_empty() {
        return Err(TitleError::Empty);
    }

    if href.starts_with('#') {
        return Err(TitleError::FragmentOnly(href.to_string()));
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return Err(TitleError::Malformed(href.to_string()));
    }

    let resolved = base_url
        .join(href)
        .map_err(|e| TitleError::Malformed(format!("{}: {}", href, e)))?;

    if resolved.host_str() != base_url.host_str() || resolved.query().is_some() {
        return Err(TitleError::Malformed(format!(
            "not an article link: {}",
            href
        )));
    }

    let encoded = resolved
        .path()
        .strip_prefix(base_url.path())
        .ok_or_else(|| TitleError::Malformed(format!("not an article link: {}", href)))?;

    let decoded = urlencoding::decode(encoded)
        .map_err(|e| TitleError::Malformed(format!("{}: {}", href, e)))?;

    normalize_title(&decoded)
}

fn capitalize_first(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
