//! End-to-end runs of the visualization pipeline on scratch directories.

use image::codecs::gif::GifDecoder;
use image::AnimationDecoder;
use sedlab_core::snapshot::{snapshot_file_name, write_snapshot};
use sedlab_core::{run_pipeline, PipelineConfig, RenderStyle, SnapshotRecord};
use sedlab_env::{ProgressEvent, RecordingProgress, VizError};
use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;

fn config(input: &Path, output: &Path, basename: &str) -> PipelineConfig {
    PipelineConfig::new(basename)
        .with_input_dir(input)
        .with_output_dir(output)
        .with_style(RenderStyle::plain().with_size(200, 160))
}

fn pngs_in(dir: &Path) -> usize {
    fs::read_dir(dir)
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().map_or(false, |ext| ext == "png"))
        .count()
}

#[test]
fn test_three_cycle_run() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();

    write_snapshot(&input.path().join(snapshot_file_name("t", 1)), &[]).unwrap();
    write_snapshot(
        &input.path().join(snapshot_file_name("t", 2)),
        &[SnapshotRecord::new(1.0, 1.0, 1.0, 2.0, 0.5)],
    )
    .unwrap();
    write_snapshot(&input.path().join(snapshot_file_name("t", 3)), &[]).unwrap();

    let progress = RecordingProgress::new();
    let report = run_pipeline(&config(input.path(), output.path(), "t"), &progress).unwrap();

    assert_eq!(report.frames, 3);
    let points: Vec<(u64, usize)> = report.cycles.iter().map(|c| (c.cycle, c.alive)).collect();
    assert_eq!(points, vec![(1, 0), (2, 1), (3, 0)]);
    assert!(report.skipped.is_empty());

    assert_eq!(report.artifact, output.path().join("t_animation.gif"));
    let reader = BufReader::new(File::open(&report.artifact).unwrap());
    let frames = GifDecoder::new(reader)
        .unwrap()
        .into_frames()
        .collect_frames()
        .unwrap();
    assert_eq!(frames.len(), 3);

    assert_eq!(pngs_in(output.path()), 0);
    assert_eq!(
        progress.latest_status().unwrap(),
        format!("Done! GIF saved to {}", report.artifact.display())
    );
}

#[test]
fn test_numeric_cycle_order_across_digit_counts() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    for cycle in [100, 9, 10] {
        write_snapshot(
            &input.path().join(snapshot_file_name("n", cycle)),
            &[SnapshotRecord::new(0.0, 1.0, 2.0, 1.0, 1.0)],
        )
        .unwrap();
    }

    let report = run_pipeline(
        &config(input.path(), output.path(), "n").with_parallel(true),
        &sedlab_env::NullProgress,
    )
    .unwrap();

    let order: Vec<u64> = report.cycles.iter().map(|c| c.cycle).collect();
    assert_eq!(order, vec![9, 10, 100]);
}

#[test]
fn test_default_style_run_with_labels() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    for cycle in [1, 2] {
        write_snapshot(
            &input.path().join(snapshot_file_name("a", cycle)),
            &[
                SnapshotRecord::new(0.0, 0.0, 0.0, cycle as f64, 0.2),
                SnapshotRecord::new(2.0, 1.0, 3.0, 0.5, 1.0),
            ],
        )
        .unwrap();
    }

    let config = PipelineConfig::new("a")
        .with_input_dir(input.path())
        .with_output_dir(output.path())
        .with_style(RenderStyle::default().with_size(400, 400))
        .with_parallel(true);
    let report = run_pipeline(&config, &sedlab_env::NullProgress).unwrap();

    assert_eq!(report.frames, 2);
    assert!(report.failed_cycles.is_empty());
    assert!(report.artifact.exists());
}

#[test]
fn test_missing_input_produces_nothing() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let out_dir = output.path().join("visualisations");

    let progress = RecordingProgress::new();
    let err = run_pipeline(&config(input.path(), &out_dir, "absent"), &progress).unwrap_err();

    assert!(matches!(err, VizError::NotFound { .. }));
    assert!(!out_dir.exists());
    assert!(matches!(
        progress.events().last(),
        Some(ProgressEvent::Failed { .. })
    ));
}
