use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::{AssemblyConfig, Resources};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Assemble an EPUB container directory from scraped articles.
    BuildEpub(BuildEpubArgs),
    /// Zip an assembled container directory into an `.epub` file.
    Pack(PackArgs),
    /// Print the sanitized fragments of one article file as JSON.
    DebugCleanArticle(DebugCleanArticleArgs),
    /// Print the section/article structure derived from a state file as JSON.
    Structure(StructureArgs),
}

#[derive(Debug, Args)]
pub struct BuildEpubArgs {
    /// Collection state file (`urls` + `articles`).
    #[arg(long)]
    pub state: PathBuf,

    /// Directory holding the per-article JSON files.
    #[arg(long)]
    pub articles: PathBuf,

    /// Output directory for the EPUB container.
    #[arg(long)]
    pub out: PathBuf,

    /// Directory with `templates/` and `skeleton/` (default: bundled resources).
    #[arg(long)]
    pub resources: Option<PathBuf>,

    /// Replace the output directory (and `--epub` file) if they exist.
    #[arg(long, default_value_t = false)]
    pub force: bool,

    /// Also pack the container into this `.epub` file.
    #[arg(long)]
    pub epub: Option<PathBuf>,
}

impl BuildEpubArgs {
    pub fn config(&self) -> AssemblyConfig {
        let resources = self
            .resources
            .as_ref()
            .map(Resources::new)
            .unwrap_or_else(Resources::bundled);
        AssemblyConfig::new(&self.articles, &self.out)
            .with_resources(resources)
            .with_force(self.force)
    }
}

#[derive(Debug, Args)]
pub struct PackArgs {
    /// Assembled container directory (created by `build-epub`).
    #[arg(long)]
    pub dir: PathBuf,

    /// Output `.epub` file.
    #[arg(long)]
    pub out: PathBuf,

    /// Overwrite the output file if it exists.
    #[arg(long, default_value_t = false)]
    pub force: bool,
}

#[derive(Debug, Args)]
pub struct DebugCleanArticleArgs {
    /// Article JSON file (`title`, `subtitle`, `content`, `url`).
    pub article: PathBuf,
}

#[derive(Debug, Args)]
pub struct StructureArgs {
    /// Collection state file.
    #[arg(long)]
    pub state: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_epub_defaults_to_bundled_resources() {
        let cli = Cli::parse_from([
            "magazine-epub",
            "build-epub",
            "--state",
            "state.json",
            "--articles",
            "articles",
            "--out",
            "out",
        ]);
        let Command::BuildEpub(args) = cli.command else {
            panic!("expected build-epub");
        };
        let config = args.config();
        assert_eq!(config.resources, Resources::bundled());
        assert_eq!(config.out_dir, PathBuf::from("out"));
        assert!(!config.force);
        assert!(args.epub.is_none());
    }

    #[test]
    fn resources_flag_overrides_base() {
        let cli = Cli::parse_from([
            "magazine-epub",
            "build-epub",
            "--state",
            "s.json",
            "--articles",
            "a",
            "--out",
            "o",
            "--resources",
            "res",
            "--force",
        ]);
        let Command::BuildEpub(args) = cli.command else {
            panic!("expected build-epub");
        };
        let config = args.config();
        assert_eq!(config.resources.template_dir, PathBuf::from("res/templates"));
        assert!(config.force);
    }
}
