use std::path::{Path, PathBuf};

use percent_encoding::percent_decode_str;
use url::Url;

use crate::error::{AssemblyError, Result};

pub const XHTML_EXTENSION: &str = "xhtml";

/// Directory under the output root that holds every generated document.
pub const CONTENT_DIR: &str = "OEBPS";

/// Location of an article document inside the container, relative to `OEBPS/`.
///
/// `segments` stay percent-encoded as in the URL and form the href; `names` are the decoded
/// segments used for the files on disk, which is what readers resolve an href to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EpubPath {
    segments: Vec<String>,
    names: Vec<String>,
}

impl EpubPath {
    /// `/europe/2024/01/01/slug` becomes `europe/2024/01/01/slug.xhtml`.
    pub fn from_url(url: &Url) -> Result<Self> {
        Self::from_pathname(url.path())
            .map_err(|reason| AssemblyError::invalid_url(url.as_str(), reason))
    }

    pub fn parse(url: &str) -> Result<Self> {
        let parsed =
            Url::parse(url).map_err(|err| AssemblyError::invalid_url(url, err.to_string()))?;
        Self::from_url(&parsed)
    }

    fn from_pathname(pathname: &str) -> std::result::Result<Self, &'static str> {
        let mut segments = Vec::new();
        let mut names = Vec::new();
        for segment in pathname.split('/') {
            if segment.is_empty() || segment == "." {
                continue;
            }
            if segment == ".." {
                return Err("url path must not contain '..'");
            }
            let name = percent_decode_str(segment)
                .decode_utf8()
                .map_err(|_| "url path segment is not valid UTF-8 once decoded")?;
            if name == "." || name == ".." || name.contains(['/', '\\', '\0']) {
                return Err("url path segment decodes to an unsafe file name");
            }
            names.push(name.into_owned());
            segments.push(segment.to_owned());
        }
        if segments.is_empty() {
            return Err("url has no path to derive a document name from");
        }
        Ok(Self { segments, names })
    }

    /// Path relative to `OEBPS/`, with the document extension.
    pub fn href(&self) -> String {
        format!("{}.{XHTML_EXTENSION}", self.segments.join("/"))
    }

    /// Decoded path relative to `OEBPS/`; two articles sharing it would share a file.
    pub fn file_key(&self) -> String {
        format!("{}.{XHTML_EXTENSION}", self.names.join("/"))
    }

    /// Number of directories between `OEBPS/` and the document.
    pub fn depth(&self) -> usize {
        self.segments.len() - 1
    }

    /// Relative prefix from the document back to `OEBPS/` (`../../` or empty).
    pub fn root_prefix(&self) -> String {
        "../".repeat(self.depth())
    }

    pub fn file_path(&self, out_dir: &Path) -> PathBuf {
        let mut path = out_dir.join(CONTENT_DIR);
        if let Some((last, dirs)) = self.names.split_last() {
            for dir in dirs {
                path = path.join(dir);
            }
            path = path.join(format!("{last}.{XHTML_EXTENSION}"));
        }
        path
    }
}
