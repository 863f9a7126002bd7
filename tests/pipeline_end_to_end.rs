use std::path::Path;

use image::{Rgb, RgbImage};
use tempfile::TempDir;

use crowdtrack_rs::{
    run, run_pipelined, CancelFlag, FrameProcessor, ImageSequenceSink, ImageSequenceSource,
    PipelineConfig, ReplaySession, RunEnd,
};

const GREEN: [u8; 3] = [0, 255, 0];
const RED: [u8; 3] = [255, 0, 0];

const TRACKS: &str = r#"{"frame":0,"detections":[{"class_id":0,"bbox":[10,40,30,70],"confidence":0.91,"track_id":1},{"class_id":0,"bbox":[60,40,80,70],"track_id":2},{"class_id":2,"bbox":[40,50,50,75],"track_id":3},{"class_id":0,"bbox":[5,5,15,15]}]}

{"frame":2,"detections":[{"class_id":0,"bbox":[12,41,32,71],"track_id":1}]}
"#;

struct Fixture {
    _root: TempDir,
    frames: std::path::PathBuf,
    tracks: std::path::PathBuf,
    output: std::path::PathBuf,
}

fn fixture() -> Fixture {
    let root = tempfile::tempdir().expect("temp dir");
    let frames = root.path().join("crowd");
    std::fs::create_dir_all(&frames).expect("frames dir");
    for i in 0..3 {
        RgbImage::from_pixel(100, 80, Rgb([0, 0, 0]))
            .save(frames.join(format!("frame_{:03}.png", i)))
            .expect("write frame");
    }
    let tracks = root.path().join("crowd.tracks.jsonl");
    std::fs::write(&tracks, TRACKS).expect("write tracks");
    let output = root.path().join("tracked_crowd");
    Fixture {
        frames,
        tracks,
        output,
        _root: root,
    }
}

fn processor(tracks: &Path) -> FrameProcessor {
    let session = ReplaySession::from_path(tracks).expect("replay session");
    FrameProcessor::from_config(Box::new(session), &PipelineConfig::default())
        .expect("processor")
}

fn written_frames(dir: &Path) -> Vec<std::path::PathBuf> {
    let mut files: Vec<_> = std::fs::read_dir(dir)
        .expect("output dir")
        .map(|e| e.expect("entry").path())
        .collect();
    files.sort();
    files
}

#[test]
fn annotates_sequence_and_reports_statistics() {
    let fx = fixture();
    let mut source = ImageSequenceSource::open(&fx.frames, 30.0).expect("open source");
    let mut sink = ImageSequenceSink::create(&fx.output).expect("create sink");
    let mut processor = processor(&fx.tracks);

    let end = run(&mut source, &mut processor, &mut sink, &CancelFlag::new());
    assert!(matches!(end, RunEnd::Exhausted));

    let report = processor.report();
    assert_eq!(report.total_frames, 3);
    assert_eq!(report.max_count, 2);
    assert!((report.avg_count - 1.0).abs() < 1e-9);
    assert_eq!(
        report.to_string(),
        "Total Frames: 3 | Max Persons: 2 | Avg Persons: 1.00"
    );

    let files = written_frames(&fx.output);
    assert_eq!(files.len(), 3);

    let first = image::open(&files[0]).expect("decode").into_rgb8();
    assert_eq!(first.dimensions(), (100, 80));
    // 两个人的框
    assert_eq!(first.get_pixel(10, 55).0, GREEN);
    assert_eq!(first.get_pixel(80, 55).0, GREEN);
    // 汽车和未跟踪的人不画
    assert_eq!(first.get_pixel(45, 50).0, [0, 0, 0]);
    assert!(first.pixels().any(|p| p.0 == RED));

    // 第二帧没有检测: 只有计数
    let second = image::open(&files[1]).expect("decode").into_rgb8();
    assert!(second.pixels().all(|p| p.0 != GREEN));
    assert!(second.pixels().any(|p| p.0 == RED));
}

#[test]
fn pipelined_run_matches_sequential() {
    let fx = fixture();
    let mut source = ImageSequenceSource::open(&fx.frames, 30.0).expect("open source");
    let mut sink = ImageSequenceSink::create(&fx.output).expect("create sink");
    let mut processor = processor(&fx.tracks);

    let end = run_pipelined(&mut source, &mut processor, &mut sink, &CancelFlag::new(), 2);
    assert!(end.is_complete());

    let report = processor.report();
    assert_eq!(report.total_frames, 3);
    assert_eq!(report.max_count, 2);
    assert_eq!(written_frames(&fx.output).len(), 3);
}

#[test]
fn cancelled_before_start_processes_nothing() {
    let fx = fixture();
    let mut source = ImageSequenceSource::open(&fx.frames, 30.0).expect("open source");
    let mut sink = ImageSequenceSink::create(&fx.output).expect("create sink");
    let mut processor = processor(&fx.tracks);

    let cancel = CancelFlag::new();
    cancel.cancel();
    let end = run(&mut source, &mut processor, &mut sink, &cancel);

    assert!(matches!(end, RunEnd::Cancelled));
    assert_eq!(processor.stats().frames_processed, 0);
    assert_eq!(processor.report().avg_count, 0.0);
    assert!(written_frames(&fx.output).is_empty());
}

#[test]
fn malformed_tracks_file_is_rejected() {
    let fx = fixture();
    std::fs::write(&fx.tracks, "{\"frame\":0,\"detections\":[{\"class_id\":0}]}\n")
        .expect("write tracks");
    assert!(ReplaySession::from_path(&fx.tracks).is_err());
}
