use std::io::Write as _;
use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;
use magazine_epub::assemble::Assembler;
use magazine_epub::cli::{BuildEpubArgs, Cli, Command};
use magazine_epub::state::{JsonStateStore, StateSource as _};

fn main() -> ExitCode {
    if let Err(err) = try_main() {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn try_main() -> anyhow::Result<()> {
    magazine_epub::logging::init().context("init logging")?;

    let cli = Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    match cli.command {
        Command::BuildEpub(args) => build_epub(args).context("build-epub")?,
        Command::Pack(args) => {
            magazine_epub::package::pack(&args.dir, &args.out, args.force).context("pack")?;
        }
        Command::DebugCleanArticle(args) => {
            let bytes = std::fs::read(&args.article)
                .with_context(|| format!("read article: {}", args.article.display()))?;
            let record: magazine_epub::formats::ArticleRecord = serde_json::from_slice(&bytes)
                .with_context(|| format!("parse article: {}", args.article.display()))?;
            let cleaned = magazine_epub::sanitize::sanitize(&record.content);
            print_json(&cleaned).context("debug-clean-article")?;
        }
        Command::Structure(args) => {
            let state = JsonStateStore::new(&args.state).sync().context("structure")?;
            let structure = magazine_epub::structure::build_structure(&state);
            print_json(&structure).context("structure")?;
        }
    }

    Ok(())
}

fn build_epub(args: BuildEpubArgs) -> anyhow::Result<()> {
    let config = args.config();
    let assembler = Assembler::new(JsonStateStore::new(&args.state), config);
    let report = assembler.run()?;
    tracing::info!(
        out = %report.out_dir.display(),
        articles = report.articles,
        sections = report.sections,
        dropped = report.fragments_dropped,
        orphans = report.orphans,
        "assembled epub container"
    );

    if let Some(epub) = &args.epub {
        magazine_epub::package::pack(&report.out_dir, epub, args.force)
            .with_context(|| format!("pack {}", epub.display()))?;
    }
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value).context("serialize json")?;
    writeln!(stdout).context("write stdout")?;
    Ok(())
}
