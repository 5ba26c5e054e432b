use std::path::{Path, PathBuf};

/// Where the document templates and the container skeleton live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resources {
    pub template_dir: PathBuf,
    pub skeleton_dir: PathBuf,
}

impl Resources {
    /// `<base>/templates` and `<base>/skeleton`.
    pub fn new(base: impl AsRef<Path>) -> Self {
        let base = base.as_ref();
        Self {
            template_dir: base.join("templates"),
            skeleton_dir: base.join("skeleton"),
        }
    }

    /// The `resources/` directory shipped with this crate.
    pub fn bundled() -> Self {
        Self::new(Path::new(env!("CARGO_MANIFEST_DIR")).join("resources"))
    }
}

#[derive(Debug, Clone)]
pub struct AssemblyConfig {
    pub resources: Resources,
    /// Directory holding the per-article JSON files named in the state.
    pub articles_dir: PathBuf,
    /// Container root; receives `mimetype`, `META-INF/` and `OEBPS/`.
    pub out_dir: PathBuf,
    /// Replace an existing output directory instead of failing.
    pub force: bool,
}

impl AssemblyConfig {
    pub fn new(articles_dir: impl Into<PathBuf>, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            resources: Resources::bundled(),
            articles_dir: articles_dir.into(),
            out_dir: out_dir.into(),
            force: false,
        }
    }

    pub fn with_resources(mut self, resources: Resources) -> Self {
        self.resources = resources;
        self
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }
}
