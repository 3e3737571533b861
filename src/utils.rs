use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Create a progress bar with the given length and label
pub fn create_progress_bar(len: u64, label: &str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::default_bar().template(&format!(
        "{{spinner:.green}} [{}] [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} ({{eta}})",
        label
    )) {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

/// Create the output directory if needed and return its path.
/// Existing contents are kept; converted files overwrite same-named ones.
pub fn create_output_directory(path: &Path) -> std::io::Result<std::path::PathBuf> {
    if path.is_dir() {
        log::debug!("Writing into existing directory {:?}", path);
    } else {
        fs::create_dir_all(path)?;
    }
    Ok(path.to_path_buf())
}

/// Sanitized file stem used to name the converted label file
pub fn output_stem(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| sanitize_filename::sanitize(s.to_string_lossy()))
        .unwrap_or_default();
    if stem.is_empty() {
        "labels".to_string()
    } else {
        stem
    }
}

/// Output path of `path` relative to the output directory.
///
/// Subdirectories below `input_root` are mirrored with each component
/// sanitized, and the file extension is replaced by `extension`. A file given
/// directly as input maps to its own name.
pub fn output_relative_path(input_root: &Path, path: &Path, extension: &str) -> PathBuf {
    let relative = match path.strip_prefix(input_root) {
        Ok(rel) if !rel.as_os_str().is_empty() => rel,
        _ => path.file_name().map(Path::new).unwrap_or(path),
    };

    let mut output = PathBuf::new();
    if let Some(parent) = relative.parent() {
        for component in parent.components() {
            if let Component::Normal(name) = component {
                let name = sanitize_filename::sanitize(name.to_string_lossy());
                if !name.is_empty() {
                    output.push(name);
                }
            }
        }
    }
    output.push(format!("{}.{}", output_stem(relative), extension));
    output
}
