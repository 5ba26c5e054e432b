use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use sha2::Digest as _;
use url::Url;

use crate::config::AssemblyConfig;
use crate::error::{AssemblyError, Result, Stage};
use crate::formats::{ArticleMeta, ArticleRecord, CollectionState};
use crate::links::{KnownArticles, rewrite_links};
use crate::package::list_files_recursively_sorted;
use crate::paths::{CONTENT_DIR, EpubPath};
use crate::render::{ArticleView, ManifestView, Renderer};
use crate::sanitize::sanitize_with_report;
use crate::state::StateSource;
use crate::structure::build_structure;

pub const TOC_XHTML: &str = "toc.xhtml";
pub const TOC_NCX: &str = "toc.ncx";
pub const MANIFEST_OPF: &str = "manifest.opf";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyReport {
    pub out_dir: PathBuf,
    pub articles: usize,
    pub sections: usize,
    pub fragments_dropped: usize,
    pub orphans: usize,
}

/// An article that is both listed in `urls` and scraped.
#[derive(Debug)]
struct ResolvedArticle<'a> {
    source_url: &'a str,
    url: Url,
    meta: &'a ArticleMeta,
    path: EpubPath,
}

pub struct Assembler<S> {
    source: S,
    config: AssemblyConfig,
}

impl<S: StateSource> Assembler<S> {
    pub fn new(source: S, config: AssemblyConfig) -> Self {
        Self { source, config }
    }

    pub fn run(&self) -> Result<AssemblyReport> {
        self.run_at(Utc::now())
    }

    /// Assemble the container, stamping the manifest with `modified`.
    pub fn run_at(&self, modified: DateTime<Utc>) -> Result<AssemblyReport> {
        let out_dir = &self.config.out_dir;
        let renderer = Renderer::from_dir(&self.config.resources.template_dir)?;

        tracing::info!("assemble: sync");
        let state = self.source.sync()?;
        let orphans = state.orphans();
        for url in &orphans {
            tracing::warn!(url = %url, "article is not listed in urls; leaving it out");
        }
        let articles = resolve_articles(&state)?;
        if articles.is_empty() {
            tracing::info!("no resolved articles; assembling an empty book");
        }

        tracing::info!(out = %out_dir.display(), "assemble: scaffold");
        self.scaffold()?;

        tracing::info!(count = articles.len(), "assemble: articles");
        let known = KnownArticles::from_paths(
            articles
                .iter()
                .map(|article| (&article.url, article.path.clone())),
        );
        let mut fragments_dropped = 0;
        for article in &articles {
            fragments_dropped += self.write_article(&renderer, &known, article)?;
        }

        tracing::info!("assemble: toc");
        let structure = build_structure(&state);
        let toc = renderer.toc(&structure)?;
        write_content(out_dir, TOC_XHTML, &toc, Stage::Toc)?;

        tracing::info!("assemble: manifest");
        let hrefs = articles
            .iter()
            .map(|article| article.path.href())
            .collect::<Vec<_>>();
        let identifier = book_identifier(&state, &hrefs);
        let modified = manifest_timestamp(modified);
        let manifest = renderer.manifest(&ManifestView::new(
            state.title.as_deref(),
            state.date.as_deref(),
            &identifier,
            &modified,
            &hrefs,
        ))?;
        write_content(out_dir, MANIFEST_OPF, &manifest, Stage::Manifest)?;

        tracing::info!("assemble: navigation");
        let ncx = renderer.toc_ncx(&structure, &identifier)?;
        write_content(out_dir, TOC_NCX, &ncx, Stage::Navigation)?;

        Ok(AssemblyReport {
            out_dir: out_dir.clone(),
            articles: articles.len(),
            sections: structure.sections.len(),
            fragments_dropped,
            orphans: orphans.len(),
        })
    }

    fn scaffold(&self) -> Result<()> {
        let skeleton = &self.config.resources.skeleton_dir;
        if !skeleton.is_dir() {
            return Err(AssemblyError::MissingSkeleton {
                path: skeleton.clone(),
            });
        }

        let out_dir = &self.config.out_dir;
        if out_dir.exists() {
            if !self.config.force {
                return Err(AssemblyError::OutputExists {
                    path: out_dir.clone(),
                });
            }
            std::fs::remove_dir_all(out_dir)
                .map_err(|err| AssemblyError::io(Stage::Scaffold, out_dir, err))?;
        }

        for file in list_files_recursively_sorted(skeleton, Stage::Scaffold)? {
            let rel = file.strip_prefix(skeleton).map_err(|err| {
                AssemblyError::io(Stage::Scaffold, &file, std::io::Error::other(err))
            })?;
            let dest = out_dir.join(rel);
            create_parent_dir(&dest, Stage::Scaffold)?;
            std::fs::copy(&file, &dest)
                .map_err(|err| AssemblyError::io(Stage::Scaffold, &dest, err))?;
        }

        let content_dir = out_dir.join(CONTENT_DIR);
        std::fs::create_dir_all(&content_dir)
            .map_err(|err| AssemblyError::io(Stage::Scaffold, &content_dir, err))?;
        Ok(())
    }

    /// Render one article; returns how many fragments the sanitizer dropped.
    fn write_article(
        &self,
        renderer: &Renderer,
        known: &KnownArticles,
        article: &ResolvedArticle<'_>,
    ) -> Result<usize> {
        let record = load_article(&self.config.articles_dir, article)?;
        if record.url.path() != article.url.path() {
            tracing::warn!(
                url = %article.source_url,
                recorded = %record.url,
                "article file records a different url"
            );
        }

        let sanitized = sanitize_with_report(&record.content);
        let content = rewrite_links(&sanitized.fragments, known);
        let view = ArticleView::new(
            &record.title,
            &record.subtitle,
            content,
            article.path.root_prefix(),
        );
        let xhtml = renderer
            .article(&view)
            .map_err(|err| err.for_article(article.source_url))?;

        let out_path = article.path.file_path(&self.config.out_dir);
        create_parent_dir(&out_path, Stage::Articles)?;
        std::fs::write(&out_path, xhtml)
            .map_err(|err| AssemblyError::io(Stage::Articles, &out_path, err))?;
        tracing::info!(
            url = %article.source_url,
            path = %out_path.display(),
            title = %record.title,
            dropped = sanitized.dropped.len(),
            "wrote article"
        );
        Ok(sanitized.dropped.len())
    }
}

/// Resolved articles in `urls` order, with their container paths checked for collisions.
fn resolve_articles(state: &CollectionState) -> Result<Vec<ResolvedArticle<'_>>> {
    let mut seen: HashMap<String, &str> = HashMap::new();
    let mut resolved = Vec::new();
    for (source_url, meta) in state.resolved() {
        let url = Url::parse(source_url)
            .map_err(|err| AssemblyError::invalid_url(source_url, err.to_string()))?;
        let path = EpubPath::from_url(&url)?;
        if let Some(first) = seen.insert(path.file_key(), source_url) {
            return Err(AssemblyError::PathCollision {
                path: path.file_key(),
                first: first.to_owned(),
                second: source_url.to_owned(),
            });
        }
        resolved.push(ResolvedArticle {
            source_url,
            url,
            meta,
            path,
        });
    }
    Ok(resolved)
}

fn load_article(articles_dir: &Path, article: &ResolvedArticle<'_>) -> Result<ArticleRecord> {
    let filename = Path::new(&article.meta.filename);
    let missing = |path: PathBuf, source: Box<dyn std::error::Error + Send + Sync>| {
        AssemblyError::MissingArticleData {
            url: article.source_url.to_owned(),
            path,
            source,
        }
    };
    if filename.as_os_str().is_empty()
        || !filename
            .components()
            .all(|component| matches!(component, Component::Normal(_)))
    {
        return Err(missing(
            filename.to_path_buf(),
            "article filename must be a relative path inside the articles directory".into(),
        ));
    }

    let path = articles_dir.join(filename);
    let bytes = match std::fs::read(&path) {
        Ok(bytes) => bytes,
        Err(err) => return Err(missing(path, err.into())),
    };
    serde_json::from_slice(&bytes).map_err(|err| missing(path, err.into()))
}

fn write_content(out_dir: &Path, name: &str, contents: &str, stage: Stage) -> Result<()> {
    let path = out_dir.join(CONTENT_DIR).join(name);
    std::fs::write(&path, contents).map_err(|err| AssemblyError::io(stage, &path, err))?;
    tracing::debug!(path = %path.display(), "wrote {name}");
    Ok(())
}

fn create_parent_dir(path: &Path, stage: Stage) -> Result<()> {
    let parent = path.parent().ok_or_else(|| {
        AssemblyError::io(
            stage,
            path,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "path must have parent"),
        )
    })?;
    std::fs::create_dir_all(parent).map_err(|err| AssemblyError::io(stage, parent, err))
}

/// ISO-8601 in UTC with the sub-second part dropped, e.g. `2024-01-06T09:30:00Z`.
pub fn manifest_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Stable package identifier so unchanged inputs yield an unchanged book.
pub fn book_identifier(state: &CollectionState, hrefs: &[String]) -> String {
    let mut hasher = sha2::Sha256::new();
    hasher.update(state.title.as_deref().unwrap_or_default().as_bytes());
    hasher.update(b"\n");
    hasher.update(state.date.as_deref().unwrap_or_default().as_bytes());
    for href in hrefs {
        hasher.update(b"\n");
        hasher.update(href.as_bytes());
    }
    format!("urn:sha256:{}", hex::encode(hasher.finalize()))
}
