use percent_encoding::percent_decode_str;
use url::Url;

use crate::formats::{
    CollectionState, MagazineStructure, Section, SectionArticle, first_path_segment,
};
use crate::paths::EpubPath;

/// Group the resolved articles of `state` into sections, in first-seen order.
pub fn build_structure(state: &CollectionState) -> MagazineStructure {
    let mut sections: Vec<Section> = Vec::new();

    for url_str in state.unique_urls() {
        let Ok(url) = Url::parse(url_str) else {
            tracing::warn!(url = %url_str, "skip unparseable url");
            continue;
        };
        let section_id = first_path_segment(&url).unwrap_or_default().to_owned();

        // Section order is fixed by first appearance in `urls`, resolved or not.
        let idx = match sections.iter().position(|s| s.id == section_id) {
            Some(idx) => idx,
            None => {
                sections.push(Section {
                    title: section_title(&section_id),
                    id: section_id,
                    articles: Vec::new(),
                });
                sections.len() - 1
            }
        };

        let Some(meta) = state.articles.get(url_str) else {
            tracing::debug!(url = %url_str, "article not scraped; skipping");
            continue;
        };
        let epub_href = match EpubPath::from_url(&url) {
            Ok(path) => path.href(),
            Err(err) => {
                tracing::warn!(url = %url_str, %err, "skip article without document path");
                continue;
            }
        };
        sections[idx].articles.push(SectionArticle {
            title: meta.title.clone(),
            subtitle: meta.subtitle.clone(),
            source_url: url_str.to_owned(),
            epub_href,
        });
    }

    sections.retain(|section| !section.articles.is_empty());

    MagazineStructure {
        title: state.title.clone(),
        date: state.date.clone(),
        sections,
    }
}

/// `united-states` becomes `United States`; percent-escapes are decoded first.
pub fn section_title(id: &str) -> String {
    percent_decode_str(id)
        .decode_utf8_lossy()
        .split('-')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
