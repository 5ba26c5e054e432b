use std::collections::HashMap;
use std::sync::LazyLock;

use kuchikikiki::{Attribute, ExpandedName, NodeRef};
use url::Url;

use crate::paths::EpubPath;
use crate::xhtml;

/// Articles live at `OEBPS/<section>/<yyyy>/<mm>/<dd>/<slug>.xhtml`, so every sibling article is
/// reached by climbing this many directories.
pub const LINK_DEPTH: usize = 4;

static RELATIVE_BASE: LazyLock<Url> =
    LazyLock::new(|| Url::parse("https://relative.invalid/").expect("static base url"));

/// Pathnames of the in-collection articles, the only link targets that survive.
///
/// Each pathname maps to the [`EpubPath`] its document is written to, so a rewritten link always
/// names the file the assembler produces.
#[derive(Debug, Clone, Default)]
pub struct KnownArticles {
    pathnames: HashMap<String, EpubPath>,
}

impl KnownArticles {
    /// Known articles from bare URLs; URLs without a usable document path are left out.
    pub fn new<'a>(urls: impl IntoIterator<Item = &'a Url>) -> Self {
        Self::from_paths(urls.into_iter().filter_map(|url| match EpubPath::from_url(url) {
            Ok(path) => Some((url, path)),
            Err(err) => {
                tracing::warn!(url = %url, %err, "not a link target");
                None
            }
        }))
    }

    pub fn from_paths<'a>(paths: impl IntoIterator<Item = (&'a Url, EpubPath)>) -> Self {
        Self {
            pathnames: paths
                .into_iter()
                .map(|(url, path)| (url.path().to_owned(), path))
                .collect(),
        }
    }

    pub fn contains_pathname(&self, pathname: &str) -> bool {
        self.pathnames.contains_key(pathname)
    }

    pub fn len(&self) -> usize {
        self.pathnames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pathnames.is_empty()
    }

    /// Relative href for `href` when it points at a known article.
    pub fn internal_href(&self, href: &str) -> Option<String> {
        let target = RELATIVE_BASE.join(href.trim()).ok()?;
        let path = self.pathnames.get(target.path())?;
        Some(format!("{}{}", "../".repeat(LINK_DEPTH), path.href()))
    }
}

pub fn rewrite_links(fragments: &[String], known: &KnownArticles) -> Vec<String> {
    fragments
        .iter()
        .map(|fragment| rewrite_fragment(fragment, known))
        .collect()
}

pub fn rewrite_fragment(fragment: &str, known: &KnownArticles) -> String {
    let Some(body) = xhtml::parse_fragment(fragment) else {
        return fragment.to_owned();
    };

    let anchors = body
        .descendants()
        .filter(|node| xhtml::is_element(node, "a"))
        .collect::<Vec<_>>();
    for anchor in anchors {
        let href = anchor
            .as_element()
            .and_then(|element| element.attributes.borrow().get("href").map(str::to_owned));
        match href.and_then(|href| known.internal_href(&href)) {
            Some(internal) => {
                if let Some(element) = anchor.as_element() {
                    element.attributes.borrow_mut().insert("href", internal);
                }
            }
            None => degrade_to_emphasis(&anchor),
        }
    }

    xhtml::serialize_children(&body)
}

/// Replace `<a ...>text</a>` with `<b>text</b>`.
fn degrade_to_emphasis(anchor: &NodeRef) {
    let Some(element) = anchor.as_element() else {
        return;
    };
    let mut name = element.name.clone();
    name.local = "b".into();
    let bold = NodeRef::new_element(name, Vec::<(ExpandedName, Attribute)>::new());
    bold.append(NodeRef::new_text(anchor.text_contents()));
    anchor.insert_before(bold);
    anchor.detach();
}
