use std::sync::LazyLock;

use regex::Regex;

use crate::error::AssemblyError;
use crate::xhtml;

/// Boilerplate fragments that never belong in the book, matched against the raw markup.
pub static NOISE_PATTERNS: LazyLock<Vec<NoisePattern>> = LazyLock::new(|| {
    [
        (r"(?i)your browser does not support", "unsupported browser/video notice"),
        (r"(?i)for subscribers only", "subscribers-only notice"),
        (r"(?i)<iframe\b", "embedded frame"),
    ]
    .into_iter()
    .map(|(pattern, reason)| NoisePattern {
        regex: Regex::new(pattern).expect("noise pattern must compile"),
        reason,
    })
    .collect()
});

#[derive(Debug)]
pub struct NoisePattern {
    pub regex: Regex,
    pub reason: &'static str,
}

/// Returns the reason `fragment` is noise, if it is.
pub fn noise_reason(fragment: &str) -> Option<&'static str> {
    NOISE_PATTERNS
        .iter()
        .find(|pattern| pattern.regex.is_match(fragment))
        .map(|pattern| pattern.reason)
}

#[derive(Debug, Default)]
pub struct Sanitized {
    pub fragments: Vec<String>,
    pub dropped: Vec<DroppedFragment>,
}

#[derive(Debug)]
pub struct DroppedFragment {
    pub index: usize,
    pub cause: DropCause,
}

#[derive(Debug)]
pub enum DropCause {
    Noise(&'static str),
    Malformed(AssemblyError),
}

pub fn sanitize(fragments: &[String]) -> Vec<String> {
    sanitize_with_report(fragments).fragments
}

pub fn sanitize_with_report(fragments: &[String]) -> Sanitized {
    let mut out = Sanitized::default();
    for (index, raw) in fragments.iter().enumerate() {
        if let Some(reason) = noise_reason(raw) {
            tracing::debug!(index, reason, "drop noise fragment");
            out.dropped.push(DroppedFragment {
                index,
                cause: DropCause::Noise(reason),
            });
            continue;
        }

        match normalize(index, raw) {
            // Entity-encoded notices only show their text once parsed.
            Ok(xhtml) => match noise_reason(&xhtml) {
                Some(reason) => {
                    tracing::debug!(index, reason, "drop noise fragment after parsing");
                    out.dropped.push(DroppedFragment {
                        index,
                        cause: DropCause::Noise(reason),
                    });
                }
                None => out.fragments.push(xhtml),
            },
            Err(err) => {
                tracing::warn!(index, %err, "drop malformed fragment");
                out.dropped.push(DroppedFragment {
                    index,
                    cause: DropCause::Malformed(err),
                });
            }
        }
    }
    out
}

/// Re-render one fragment as XHTML.
pub fn normalize(index: usize, raw: &str) -> Result<String, AssemblyError> {
    let body = xhtml::parse_fragment(raw).ok_or_else(|| AssemblyError::MalformedFragment {
        index,
        reason: "parser produced no document body".to_owned(),
    })?;
    let out = xhtml::serialize_children(&body);
    if out.trim().is_empty() && !raw.trim().is_empty() && !only_markup_noise(raw) {
        return Err(AssemblyError::MalformedFragment {
            index,
            reason: "fragment has no body content after parsing".to_owned(),
        });
    }
    Ok(out)
}

// Comment-only input legitimately renders to nothing.
fn only_markup_noise(raw: &str) -> bool {
    let trimmed = raw.trim();
    trimmed.starts_with("<!--") && trimmed.ends_with("-->")
}
