use super::*;
use crate::backup::manager::BackupManager;
use crate::foundation::error::FailureKind;
use crate::transform::gateway::TransformGateway;
use crate::transform::params::{RadiusUnit, TransformParams};
use crate::vault::memory::MemoryVault;
use crate::vault::{AssetHandle, Vault};
use std::sync::Arc;

fn png_bytes() -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(12, 8, image::Rgba([0, 0, 255, 255]));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

#[test]
fn zero_concurrency_is_rejected() {
    let err = BatchScheduler::new(0).unwrap_err();
    assert!(matches!(err, RounderError::Validation(_)));
}

#[test]
fn failures_are_isolated_and_counted() {
    let vault: Arc<dyn Vault> = Arc::new(MemoryVault::with_files([
        ("a.png", png_bytes()),
        ("b.png", b"garbage".to_vec()),
        ("c.png", png_bytes()),
        ("d.png", png_bytes()),
    ]));
    let backups = BackupManager::new(vault.clone(), ".image-rounding-backups");
    let gateway = TransformGateway::in_process();
    let params = TransformParams::new(4.0, RadiusUnit::Px);
    let ctx = BatchContext {
        vault: vault.as_ref(),
        backups: &backups,
        gateway: &gateway,
        params: &params,
    };
    let jobs: Vec<AssetJob> = ["a.png", "b.png", "c.png", "missing.png", "d.png"]
        .into_iter()
        .map(|p| AssetJob {
            asset: AssetHandle::new(p),
            output_path: params.output_path(p),
        })
        .collect();

    let report = BatchScheduler::new(3).unwrap().run(&jobs, &ctx);

    assert_eq!(report.total, 5);
    assert_eq!(report.succeeded, 3);
    assert_eq!(report.failed, 2);
    let order: Vec<&str> = report
        .outcomes
        .iter()
        .map(|o| o.job.asset.path.as_str())
        .collect();
    assert_eq!(order, vec!["a.png", "b.png", "c.png", "missing.png", "d.png"]);
    assert_eq!(
        report.outcomes[1].result.as_ref().unwrap_err().kind,
        FailureKind::TransformFailed
    );
    assert_eq!(
        report.outcomes[3].result.as_ref().unwrap_err().kind,
        FailureKind::FileNotFound
    );
    assert_eq!(report.successes().count(), 3);
    assert!(vault.exists("d-rounded-4px.png"));
}

#[test]
fn counters_track_completion() {
    let counters = BatchCounters::default();
    counters.record(true);
    counters.record(false);
    counters.record(true);
    assert_eq!(
        counters.snapshot(),
        CounterSnapshot {
            done: 3,
            succeeded: 2,
            failed: 1
        }
    );
}
