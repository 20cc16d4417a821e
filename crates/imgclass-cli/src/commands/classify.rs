//! Classify every candidate image in a folder.

use std::time::Instant;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use imgclass_core::{ClassifyConfig, FileStatus, Pipeline, ReportWriter};

use super::summary::write_summary;
use crate::Cli;

pub fn run(cli: &Cli, config: &ClassifyConfig) -> anyhow::Result<()> {
    let start = Instant::now();

    // Device first: nothing is written when no device can be acquired
    let pipeline = Pipeline::from_config(config)?;
    let device = pipeline.context().device();
    info!(
        "Classifying {} into {} classes on {} ({} devices found)",
        cli.input_folder.display(),
        config.model.class_count,
        device.name,
        pipeline.context().device_count()
    );

    let mut report = ReportWriter::create(&cli.output_file)?;

    let bar_style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} images")?
        .progress_chars("=>-");

    let result = pipeline.candidates(&cli.input_folder).and_then(|candidates| {
        let progress = ProgressBar::new(candidates.len() as u64).with_style(bar_style);
        let summary = pipeline.run(&candidates, &mut report, |outcome| {
            debug!("Finished {} in {:?}", outcome.path.display(), outcome.elapsed);
            progress.inc(1);
        });
        progress.finish_and_clear();
        summary
    });

    // Teardown happens whether or not the batch completed
    let stats = pipeline.shutdown();
    debug!(
        "Device memory: {} allocations, {} releases, peak {} bytes",
        stats.allocations, stats.releases, stats.peak_bytes
    );
    let records = report.records();
    report.finish()?;

    let summary = result?;

    if let Some(path) = &cli.summary {
        write_summary(path, &summary)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            path.display()
        );
    }

    println!(
        "{} Classified {} images in {:?}",
        style("✓").green(),
        summary.outcomes.len(),
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed, {} records written to {}",
        style(summary.classified()).green(),
        style(summary.failed()).red(),
        records,
        cli.output_file.display()
    );

    if summary.failed() > 0 {
        println!();
        println!("{}", style("Failed files:").red());
        for outcome in &summary.outcomes {
            if let FileStatus::Failed { error } = &outcome.status {
                println!("  - {}: {}", outcome.path.display(), error);
            }
        }
    }

    Ok(())
}
