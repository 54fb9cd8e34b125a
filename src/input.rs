//! URL list parsing for batch submission.

use tracing::{debug, instrument, trace};

/// Scheme prepended to bare `www` lines.
const DEFAULT_SCHEME: &str = "https://";

/// URLs accepted from a text list, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlList {
    pub urls: Vec<String>,
    /// Non-blank lines that did not look like URLs.
    pub skipped: usize,
}

impl UrlList {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

/// Parses one URL per line.
///
/// Lines are trimmed; blank lines are ignored. A line is accepted when it
/// starts with `http` or `www`, and `www` lines get an `https://` prefix.
/// Anything else counts as skipped. No further validation happens here;
/// malformed URLs fail later at fetch time.
///
/// # Examples
///
/// ```
/// use formscan_core::parse_url_list;
///
/// let list = parse_url_list("https://a.example/x.pdf\n\nwww.b.example/y.pdf\nnotes\n");
/// assert_eq!(list.urls, vec!["https://a.example/x.pdf", "https://www.b.example/y.pdf"]);
/// assert_eq!(list.skipped, 1);
/// ```
#[instrument(skip(text), fields(input_len = text.len()))]
#[must_use]
pub fn parse_url_list(text: &str) -> UrlList {
    let mut list = UrlList::default();

    for line in text.lines().map(str::trim).filter(|line| !line.is_empty()) {
        if line.starts_with("www") {
            list.urls.push(format!("{DEFAULT_SCHEME}{line}"));
        } else if line.starts_with("http") {
            list.urls.push(line.to_string());
        } else {
            trace!(line, "skipping non-URL line");
            list.skipped += 1;
        }
    }

    debug!(
        accepted = list.urls.len(),
        skipped = list.skipped,
        "parsed URL list"
    );
    list
}
