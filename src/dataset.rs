use log::{error, info};
use rayon::prelude::*;
use std::path::Path;

use crate::class_map::ClassMap;
use crate::config::Args;
use crate::crs::{CrsTransformer, IdentityTransformer};
use crate::io::{collect_label_files, plan_outputs, process_label_file, ConversionContext};
use crate::storage::LocalStorage;
use crate::types::ProcessingStats;
use crate::utils::{create_output_directory, create_progress_bar};

/// Convert every label file found under `args.input` in parallel
pub fn process_dataset(args: &Args) -> Result<ProcessingStats, Box<dyn std::error::Error>> {
    let class_map = ClassMap::from_names(args.class_list.iter().cloned())?;
    let output_dir = create_output_directory(Path::new(&args.output_dir))?;

    let crs_transformer = match &args.geo_transform {
        Some(gt) => gt as &dyn CrsTransformer,
        None => &IdentityTransformer as &dyn CrsTransformer,
    };
    let ctx = ConversionContext {
        storage: &LocalStorage,
        crs_transformer,
        class_map: &class_map,
        output_dir: &output_dir,
    };

    let input = Path::new(&args.input);
    let files = collect_label_files(input);
    info!("Found {} label files.", files.len());
    let plan = plan_outputs(files, input, args.output_format);

    let mut collided = ProcessingStats::new();
    for path in &plan.collisions {
        error!("Failed to convert {}: output name is not unique", path.display());
        collided.record_failure();
    }

    let pb = create_progress_bar(plan.jobs.len() as u64, "Convert");
    let stats = plan
        .jobs
        .par_iter()
        .map(|(path, output)| {
            let mut stats = ProcessingStats::new();
            match process_label_file(path, output, args, &ctx) {
                Ok(count) => stats.record_success(count),
                Err(e) => {
                    error!("Failed to convert {}: {}", path.display(), e);
                    stats.record_failure();
                }
            }
            pb.inc(1);
            stats
        })
        .reduce(ProcessingStats::new, ProcessingStats::merge)
        .merge(collided);
    pb.finish_with_message("Conversion complete");

    stats.print_summary();
    Ok(stats)
}
