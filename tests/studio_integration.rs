#![cfg(feature = "gemini")]

mod common;

use common::{config_for, image_answer, FakeHost};
use posterkit::platform::RecordingPrintHost;
use posterkit::{PosterPatch, SessionStatus, SettleResult, Studio, StudioConfig};
use std::io::Cursor;
use std::sync::Arc;

fn tiny_png() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(2, 3, image::Rgb([200, 10, 10]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

#[tokio::test]
async fn studio_generates_and_exports() {
    let upstream = FakeHost::json(200, image_answer(&tiny_png()));
    let studio = Studio::from_config(config_for(&upstream)).await.unwrap();

    let res = studio.generate_background("human").await.unwrap();
    assert_eq!(res, SettleResult::Applied);

    let record = studio
        .update_fields(PosterPatch {
            title: Some("Soporte sin pausas".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(record.title, "Soporte sin pausas");
    assert!(record.featured_image_url.starts_with("data:image/png;base64,"));

    let dir = tempfile::tempdir().unwrap();
    let path = studio.export_image(dir.path()).await.unwrap().unwrap();
    assert!(path.starts_with(dir.path()));

    let snap = studio.snapshot().await.unwrap();
    assert_eq!(snap.status, SessionStatus::Idle);
    assert!(!snap.capturing);
    assert_eq!(snap.error, None);
    assert_eq!(upstream.hits(), 1);

    studio.close().await.unwrap();
}

#[tokio::test]
async fn studio_reports_missing_key_in_snapshot() {
    let upstream = FakeHost::json(200, image_answer(&[1]));
    let config = StudioConfig {
        api_key: None,
        api_key_env: vec!["POSTERKIT_TEST_KEY_THAT_IS_NEVER_SET".into()],
        ..config_for(&upstream)
    };
    let studio = Studio::from_config(config).await.unwrap();

    let res = studio.generate_background("modern").await.unwrap();
    assert!(matches!(res, SettleResult::Failed(_)));

    let snap = studio.snapshot().await.unwrap();
    assert_eq!(snap.status, SessionStatus::Idle);
    let err = snap.error.unwrap();
    assert!(err.starts_with("Error al generar el fondo: La API KEY"), "{}", err);
    assert_eq!(upstream.hits(), 0);
}

#[tokio::test]
async fn studio_hands_print_page_to_host() {
    let upstream = FakeHost::json(200, image_answer(&tiny_png()));
    let studio = Studio::from_config(config_for(&upstream)).await.unwrap();
    studio.generate_background("minimal").await.unwrap();

    let host = Arc::new(RecordingPrintHost::new());
    studio.print(host.clone()).await.unwrap();

    let jobs = host.jobs();
    assert_eq!(jobs.len(), 1);
    let page = image::open(&jobs[0]).unwrap();
    assert_eq!((page.width(), page.height()), (1240, 1754));
    host.finish();
    assert!(!jobs[0].exists());
}
