use std::path::{Path, PathBuf};

use minijinja::{AutoEscape, Environment, UndefinedBehavior};
use serde::Serialize;

use crate::error::{AssemblyError, Result, Stage};
use crate::formats::MagazineStructure;
use crate::xhtml::xml_escape;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateName {
    Article,
    Toc,
    Manifest,
    TocNcx,
}

impl TemplateName {
    pub const ALL: [TemplateName; 4] = [
        TemplateName::Article,
        TemplateName::Toc,
        TemplateName::Manifest,
        TemplateName::TocNcx,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TemplateName::Article => "article",
            TemplateName::Toc => "toc",
            TemplateName::Manifest => "manifest",
            TemplateName::TocNcx => "toc_ncx",
        }
    }

    /// Pipeline stage that renders this template.
    pub fn stage(self) -> Stage {
        match self {
            TemplateName::Article => Stage::Articles,
            TemplateName::Toc => Stage::Toc,
            TemplateName::Manifest => Stage::Manifest,
            TemplateName::TocNcx => Stage::Navigation,
        }
    }

    pub fn file_name(self) -> &'static str {
        match self {
            TemplateName::Article => "article.xhtml.j2",
            TemplateName::Toc => "toc.xhtml.j2",
            TemplateName::Manifest => "manifest.opf.j2",
            TemplateName::TocNcx => "toc.ncx.j2",
        }
    }
}

/// The four document templates, compiled up front.
pub struct Renderer {
    env: Environment<'static>,
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer").finish_non_exhaustive()
    }
}

impl Renderer {
    /// Load every template from `template_dir`; any missing file is an error.
    pub fn from_dir(template_dir: &Path) -> Result<Self> {
        let mut env = new_environment();
        for template in TemplateName::ALL {
            let path = template_dir.join(template.file_name());
            let source = std::fs::read_to_string(&path).map_err(|source| {
                AssemblyError::MissingTemplate {
                    name: template.name(),
                    path: path.clone(),
                    source,
                }
            })?;
            add_template(&mut env, template, source)?;
        }
        Ok(Self { env })
    }

    /// Build a renderer from in-memory sources, keyed by template.
    pub fn from_sources(sources: impl IntoIterator<Item = (TemplateName, String)>) -> Result<Self> {
        let mut env = new_environment();
        let mut loaded = Vec::new();
        for (template, source) in sources {
            add_template(&mut env, template, source)?;
            loaded.push(template);
        }
        if let Some(missing) = TemplateName::ALL.into_iter().find(|t| !loaded.contains(t)) {
            return Err(AssemblyError::MissingTemplate {
                name: missing.name(),
                path: PathBuf::from(missing.file_name()),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no source given"),
            });
        }
        Ok(Self { env })
    }

    pub fn render<S: Serialize>(&self, template: TemplateName, data: S) -> Result<String> {
        let wrap = |source| AssemblyError::Template {
            name: template.name(),
            stage: Some(template.stage()),
            url: None,
            source,
        };
        self.env
            .get_template(template.name())
            .map_err(wrap)?
            .render(data)
            .map_err(wrap)
    }

    pub fn article(&self, view: &ArticleView) -> Result<String> {
        self.render(TemplateName::Article, view)
    }

    pub fn toc(&self, structure: &MagazineStructure) -> Result<String> {
        self.render(TemplateName::Toc, TocView::new(structure, None))
    }

    pub fn toc_ncx(&self, structure: &MagazineStructure, identifier: &str) -> Result<String> {
        self.render(TemplateName::TocNcx, TocView::new(structure, Some(identifier)))
    }

    pub fn manifest(&self, view: &ManifestView) -> Result<String> {
        self.render(TemplateName::Manifest, view)
    }
}

fn new_environment() -> Environment<'static> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Lenient);
    env.set_keep_trailing_newline(true);
    // Views are escaped when built; content fragments are already XHTML.
    env.set_auto_escape_callback(|_| AutoEscape::None);
    env
}

fn add_template(
    env: &mut Environment<'static>,
    template: TemplateName,
    source: String,
) -> Result<()> {
    env.add_template_owned(template.name(), source)
        .map_err(|source| AssemblyError::Template {
            name: template.name(),
            stage: None,
            url: None,
            source,
        })
}

#[derive(Debug, Clone, Serialize)]
pub struct ArticleView {
    pub title: String,
    pub subtitle: String,
    pub content: Vec<String>,
    /// Relative prefix from the article back to `OEBPS/`.
    pub root: String,
}

impl ArticleView {
    pub fn new(title: &str, subtitle: &str, content: Vec<String>, root: String) -> Self {
        Self {
            title: xml_escape(title),
            subtitle: xml_escape(subtitle),
            content,
            root,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ManifestView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    pub identifier: String,
    pub modified: String,
    pub hrefs: Vec<String>,
}

impl ManifestView {
    pub fn new(
        title: Option<&str>,
        date: Option<&str>,
        identifier: &str,
        modified: &str,
        hrefs: &[String],
    ) -> Self {
        Self {
            title: title.map(xml_escape),
            date: date.map(xml_escape),
            identifier: xml_escape(identifier),
            modified: xml_escape(modified),
            hrefs: hrefs.iter().map(|href| xml_escape(href)).collect(),
        }
    }
}

/// Table of contents as bound to the `toc` and `toc_ncx` templates.
#[derive(Debug, Clone, Serialize)]
struct TocView {
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    identifier: Option<String>,
    sections: Vec<SectionView>,
}

#[derive(Debug, Clone, Serialize)]
struct SectionView {
    id: String,
    title: String,
    href: String,
    play_order: usize,
    articles: Vec<ArticleLinkView>,
}

#[derive(Debug, Clone, Serialize)]
struct ArticleLinkView {
    title: String,
    subtitle: String,
    href: String,
    play_order: usize,
}

impl TocView {
    fn new(structure: &MagazineStructure, identifier: Option<&str>) -> Self {
        // NCX play order counts sections and articles in one sequence.
        let mut play_order = 0;
        let sections = structure
            .sections
            .iter()
            .map(|section| {
                play_order += 1;
                let section_order = play_order;
                let articles = section
                    .articles
                    .iter()
                    .map(|article| {
                        play_order += 1;
                        ArticleLinkView {
                            title: xml_escape(&article.title),
                            subtitle: xml_escape(&article.subtitle),
                            href: xml_escape(&article.epub_href),
                            play_order,
                        }
                    })
                    .collect::<Vec<_>>();
                SectionView {
                    id: xml_escape(&section.id),
                    title: xml_escape(&section.title),
                    href: articles.first().map(|a| a.href.clone()).unwrap_or_default(),
                    play_order: section_order,
                    articles,
                }
            })
            .collect();

        Self {
            title: structure.title.as_deref().map(xml_escape),
            date: structure.date.as_deref().map(xml_escape),
            identifier: identifier.map(xml_escape),
            sections,
        }
    }
}
