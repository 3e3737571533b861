use glob::glob;
use log::warn;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use crate::class_map::ClassMap;
use crate::config::{Args, Format};
use crate::conversion::labels_to_box_lines;
use crate::crs::CrsTransformer;
use crate::error::Result;
use crate::label_store::ObjectDetectionGeoJsonFile;
use crate::storage::FileStorage;
use crate::types::LABEL_FORMATS;
use crate::utils::output_relative_path;

/// Everything a single file conversion needs besides the file itself
pub struct ConversionContext<'a> {
    pub storage: &'a dyn FileStorage,
    pub crs_transformer: &'a dyn CrsTransformer,
    pub class_map: &'a ClassMap,
    pub output_dir: &'a Path,
}

/// Label files to convert: the input itself, or every label file below it
pub fn collect_label_files(input: &Path) -> Vec<PathBuf> {
    if !input.is_dir() {
        return vec![input.to_path_buf()];
    }

    let mut files = BTreeSet::new();
    for ext in LABEL_FORMATS {
        let pattern = format!("{}/**/*.{}", input.display(), ext);
        match glob(&pattern) {
            Ok(paths) => files.extend(paths.filter_map(|entry| entry.ok())),
            Err(e) => warn!("Invalid glob pattern {}: {}", pattern, e),
        }
    }
    files.into_iter().collect()
}

/// Input files paired with their output paths, relative to the output directory.
pub struct OutputPlan {
    pub jobs: Vec<(PathBuf, PathBuf)>,
    /// Inputs that would write to the same output as another input
    pub collisions: Vec<PathBuf>,
}

/// Assign every file its output path. Files that share an output path are all
/// set aside so that none of them silently overwrites another.
pub fn plan_outputs(files: Vec<PathBuf>, input_root: &Path, format: Format) -> OutputPlan {
    let outputs: Vec<PathBuf> = files
        .iter()
        .map(|path| output_relative_path(input_root, path, format.extension()))
        .collect();
    let mut counts: HashMap<&Path, usize> = HashMap::new();
    for output in &outputs {
        *counts.entry(output.as_path()).or_default() += 1;
    }

    let mut plan = OutputPlan {
        jobs: Vec::with_capacity(files.len()),
        collisions: Vec::new(),
    };
    for (path, output) in files.iter().zip(&outputs) {
        if counts[output.as_path()] > 1 {
            warn!(
                "{} shares output {} with another input, skipping",
                path.display(),
                output.display()
            );
            plan.collisions.push(path.clone());
        } else {
            plan.jobs.push((path.clone(), output.clone()));
        }
    }
    plan
}

/// Convert one GeoJSON file and write the result to `output` below the output
/// directory. Returns the number of labels written.
pub fn process_label_file(
    path: &Path,
    output: &Path,
    args: &Args,
    ctx: &ConversionContext,
) -> Result<usize> {
    let uri = path.to_string_lossy().into_owned();
    let mut store = ObjectDetectionGeoJsonFile::new(
        uri,
        ctx.storage,
        ctx.crs_transformer,
        ctx.class_map,
        args.extent,
        true,
        false,
    )?;
    let labels = store.get_labels()?;

    let output_path = ctx.output_dir.join(output);
    let output_uri = output_path.to_string_lossy().into_owned();

    match args.output_format {
        Format::Boxes => {
            ctx.storage
                .write_bytes(&output_uri, labels_to_box_lines(&labels).as_bytes())?;
        }
        Format::Geojson => {
            let mut output = ObjectDetectionGeoJsonFile::new(
                output_uri.as_str(),
                ctx.storage,
                ctx.crs_transformer,
                ctx.class_map,
                None,
                false,
                true,
            )?;
            output.set_labels(labels.clone());
            output.save()?;
        }
    }

    Ok(labels.len())
}
