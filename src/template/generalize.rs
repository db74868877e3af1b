use regex::Regex;

/// Rewrites concrete path segments into class placeholders before template
/// matching.
///
/// Rules are ordered, first match wins: UUIDs, hex-like hashes, numeric ids,
/// version strings, then a low-letter-count fallback. Everything else is
/// left verbatim and treated as fixed vocabulary (e.g. `issues`). The
/// fallback deliberately trades precision for recall: a short real word like
/// `ab` is misclassified as `{id}`, and that is accepted behavior.
#[derive(Debug)]
pub struct Generalizer {
    uuid: Regex,
    hex: Regex,
    digits: Regex,
    version: Regex,
}

impl Generalizer {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            uuid: Regex::new(
                r"^[a-f0-9]{8}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{12}$",
            )?,
            hex: Regex::new(r"^[a-f0-9]{8,}$")?,
            digits: Regex::new(r"^\d+$")?,
            version: Regex::new(r"^v?\d+(\.\d+)*$")?,
        })
    }

    /// Apply segment classification to every path segment of a URL,
    /// preserving the scheme prefix and empty segments (so trailing slashes
    /// survive)
    pub fn generalize_url(&self, url: &str) -> String {
        let (prefix, rest) = match url.split_once("://") {
            Some((scheme, rest)) => (format!("{}://", scheme), rest),
            None => (String::new(), url),
        };

        let rewritten: Vec<&str> = rest
            .split('/')
            .map(|segment| {
                if segment.is_empty() {
                    segment
                } else {
                    self.classify(segment).unwrap_or(segment)
                }
            })
            .collect();

        format!("{}{}", prefix, rewritten.join("/"))
    }

    /// Classify a single segment, returning its placeholder if any rule
    /// matches
    fn classify(&self, segment: &str) -> Option<&'static str> {
        if self.uuid.is_match(segment) {
            return Some("{uuid}");
        }

        // Hex-like tokens (commit hashes, session ids). Must carry at least
        // one letter, otherwise long numbers would land here instead of {id}.
        if self.hex.is_match(segment) && segment.chars().any(|c| c.is_ascii_alphabetic()) {
            return Some("{hash}");
        }

        if self.digits.is_match(segment) {
            return Some("{id}");
        }

        if self.version.is_match(segment) {
            return Some("{version}");
        }

        // Fallback: segments with fewer than 3 letters are opaque tokens.
        // The regex crate has no lookahead, so this is a plain count.
        let letters = segment.chars().filter(|c| c.is_ascii_alphabetic()).count();
        if letters < 3 {
            return Some("{id}");
        }

        None
    }
}
