//! Filesystem helpers shared by the directory adapters.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use walkdir::WalkDir;

use crate::error::WaffleError;

pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, WaffleError> {
    let file = File::open(path).map_err(WaffleError::Io)?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| WaffleError::JsonParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes pretty JSON, creating parent directories as needed.
pub(crate) fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), WaffleError> {
    create_parent_dir(path)?;
    let file = File::create(path).map_err(WaffleError::Io)?;
    serde_json::to_writer_pretty(BufWriter::new(file), value).map_err(|source| {
        WaffleError::JsonWrite {
            path: path.to_path_buf(),
            source,
        }
    })
}

pub(crate) fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<T, WaffleError> {
    let data = fs::read_to_string(path).map_err(WaffleError::Io)?;
    serde_yaml::from_str(&data).map_err(|source| WaffleError::YamlParse {
        path: path.to_path_buf(),
        source,
    })
}

pub(crate) fn write_yaml<T: Serialize>(path: &Path, value: &T) -> Result<(), WaffleError> {
    let yaml = serde_yaml::to_string(value).map_err(|source| WaffleError::YamlWrite {
        path: path.to_path_buf(),
        source,
    })?;
    create_parent_dir(path)?;
    fs::write(path, yaml).map_err(WaffleError::Io)
}

/// Copies `src` to `dst`, creating the destination's parent directories.
pub(crate) fn copy_file(src: &Path, dst: &Path) -> Result<(), WaffleError> {
    create_parent_dir(dst)?;
    fs::copy(src, dst).map_err(WaffleError::Io)?;
    Ok(())
}

pub(crate) fn create_parent_dir(path: &Path) -> Result<(), WaffleError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(WaffleError::Io)?;
        }
    }
    Ok(())
}

/// Recursively lists files under `root` whose extension is in `extensions`,
/// sorted by their path relative to `root`.
pub(crate) fn collect_files_with_extensions(
    root: &Path,
    extensions: &[&str],
) -> Result<Vec<PathBuf>, WaffleError> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root).follow_links(true) {
        let entry = entry.map_err(|source| {
            let message = format!("failed while traversing {}: {source}", root.display());
            WaffleError::Io(std::io::Error::other(message))
        })?;

        if entry.file_type().is_file() && has_extension(entry.path(), extensions) {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_by_cached_key(|path| rel_string(root, path));
    Ok(files)
}

fn has_extension(path: &Path, allowed: &[&str]) -> bool {
    let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
        return false;
    };

    allowed
        .iter()
        .any(|allowed_ext| ext.eq_ignore_ascii_case(allowed_ext))
}

/// `path` relative to `root`, with forward slashes.
pub(crate) fn rel_string(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.to_string_lossy().replace('\\', "/")
}

/// Reads `(width, height)` from the image header without decoding pixels.
pub(crate) fn read_image_dimensions(path: &Path) -> Result<(u32, u32), WaffleError> {
    let size = imagesize::size(path).map_err(|source| WaffleError::ImageDimensionRead {
        path: path.to_path_buf(),
        source,
    })?;

    let to_u32 = |value: usize, axis: &str| {
        u32::try_from(value).map_err(|_| {
            WaffleError::Io(std::io::Error::other(format!(
                "image {axis} {value} of {} does not fit in u32",
                path.display()
            )))
        })
    };

    Ok((to_u32(size.width, "width")?, to_u32(size.height, "height")?))
}
