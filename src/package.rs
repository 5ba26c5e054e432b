use std::fs::{self, OpenOptions};
use std::io::Write as _;
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;

use crate::error::{AssemblyError, Result, Stage};

const MIMETYPE: &str = "mimetype";

/// Zip an assembled container directory into a single `.epub` file.
pub fn pack(container_dir: &Path, out_path: &Path, force: bool) -> Result<usize> {
    if !container_dir.is_dir() {
        return Err(AssemblyError::io(
            Stage::Package,
            container_dir,
            std::io::Error::new(std::io::ErrorKind::NotFound, "container directory not found"),
        ));
    }
    let mimetype_path = container_dir.join(MIMETYPE);
    let mimetype = fs::read(&mimetype_path).map_err(|err| io(&mimetype_path, err))?;

    if let Some(parent) = out_path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|err| io(parent, err))?;
    }

    let mut out_options = OpenOptions::new();
    out_options.write(true);
    if force {
        out_options.create(true).truncate(true);
    } else {
        out_options.create_new(true);
    }
    let out_file = out_options.open(out_path).map_err(|err| io(out_path, err))?;

    let mut zip = zip::ZipWriter::new(out_file);

    // `mimetype` must be the first entry and stored without compression.
    let stored = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Stored)
        .unix_permissions(0o644);
    zip.start_file(MIMETYPE, stored).map_err(|err| zip_err(out_path, err))?;
    zip.write_all(&mimetype).map_err(|err| io(out_path, err))?;

    let deflated = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .unix_permissions(0o644);

    let mut entries = 1;
    for path in list_files_recursively_sorted(container_dir, Stage::Package)? {
        let rel_path = path
            .strip_prefix(container_dir)
            .map_err(|err| io(&path, std::io::Error::other(err)))?;
        let name = rel_path.to_string_lossy().replace('\\', "/");
        if name == MIMETYPE {
            continue;
        }
        let mut f = fs::File::open(&path).map_err(|err| io(&path, err))?;
        zip.start_file(name.as_str(), deflated)
            .map_err(|err| zip_err(out_path, err))?;
        std::io::copy(&mut f, &mut zip).map_err(|err| io(&path, err))?;
        entries += 1;
    }

    zip.finish().map_err(|err| zip_err(out_path, err))?;
    tracing::info!(out = %out_path.display(), entries, "packed epub");
    Ok(entries)
}

fn io(path: &Path, err: std::io::Error) -> AssemblyError {
    AssemblyError::io(Stage::Package, path, err)
}

fn zip_err(path: &Path, err: zip::result::ZipError) -> AssemblyError {
    AssemblyError::io(Stage::Package, path, std::io::Error::other(err))
}

pub(crate) fn list_files_recursively_sorted(dir: &Path, stage: Stage) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut stack = vec![dir.to_path_buf()];

    while let Some(current) = stack.pop() {
        let mut entries = fs::read_dir(&current)
            .and_then(|entries| entries.collect::<std::io::Result<Vec<_>>>())
            .map_err(|err| AssemblyError::io(stage, &current, err))?;
        entries.sort_by_key(|e| e.file_name());

        for entry in entries {
            let path = entry.path();
            let file_type = entry
                .file_type()
                .map_err(|err| AssemblyError::io(stage, &path, err))?;
            if file_type.is_dir() {
                stack.push(path);
                continue;
            }
            if file_type.is_file() {
                files.push(path);
            }
        }
    }

    files.sort();
    Ok(files)
}
