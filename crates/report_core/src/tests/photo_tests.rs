use super::*;
use crate::{error::ReportError, test_support::png_bytes};
use anyhow::Context as _;
use shared::error::ErrorCode;
use chrono::TimeZone;

#[tokio::test]
async fn wide_images_are_scaled_to_max_width() {
    let raw = RawImage {
        file_name: "panneau.png".into(),
        bytes: png_bytes(2400, 600),
    };

    let compressed = JpegPipeline
        .compress(raw, DEFAULT_MAX_WIDTH, DEFAULT_QUALITY)
        .await
        .expect("compress");

    assert_eq!(compressed.width, 1200);
    assert_eq!(compressed.height, 300);
    assert_eq!(compressed.mime_type, "image/jpeg");
    assert_eq!(compressed.file_name, "panneau.png");
    let decoded = image::load_from_memory(&compressed.bytes).expect("decode jpeg");
    assert_eq!(decoded.width(), 1200);
}

#[tokio::test]
async fn narrow_images_keep_their_size() {
    let raw = RawImage {
        file_name: "small.png".into(),
        bytes: png_bytes(640, 480),
    };

    let compressed = JpegPipeline
        .compress(raw, DEFAULT_MAX_WIDTH, DEFAULT_QUALITY)
        .await
        .expect("compress");

    assert_eq!((compressed.width, compressed.height), (640, 480));
}

#[tokio::test]
async fn undecodable_bytes_are_rejected() {
    let raw = RawImage {
        file_name: "notes.txt".into(),
        bytes: b"not an image".to_vec(),
    };

    let err = JpegPipeline
        .compress(raw, DEFAULT_MAX_WIDTH, DEFAULT_QUALITY)
        .await
        .expect_err("should fail");
    assert!(err.to_string().contains("notes.txt"));
    assert_eq!(ReportError::photo(err).code(), ErrorCode::Validation);
}

#[tokio::test]
async fn panicked_compression_task_is_an_internal_error() {
    let join_error = tokio::task::spawn_blocking(|| panic!("decoder crashed"))
        .await
        .expect_err("task panics");
    let err = Err::<(), _>(join_error)
        .context("image compression task panicked")
        .expect_err("wrapped");

    assert_eq!(ReportError::photo(err).code(), ErrorCode::Internal);
}

#[tokio::test]
async fn empty_upload_is_rejected() {
    let raw = RawImage {
        file_name: "empty.jpg".into(),
        bytes: Vec::new(),
    };

    assert!(JpegPipeline.compress(raw, 1200, 0.8).await.is_err());
}

#[test]
fn quality_maps_to_jpeg_scale() {
    assert_eq!(jpeg_quality(0.8), 80);
    assert_eq!(jpeg_quality(1.5), 100);
    assert_eq!(jpeg_quality(0.0), 1);
}

#[test]
fn photo_key_is_scoped_by_owner_and_timestamp() {
    let at = Utc.with_ymd_and_hms(2024, 1, 15, 9, 30, 0).unwrap();

    let key = photo_key(InspectorId(42), "C:\\Photos\\mon panneau.jpg", at);

    let prefix = format!("signalisations/42/{}_", at.timestamp_millis());
    let rest = key.as_str().strip_prefix(&prefix).expect("owner and millis prefix");
    let (nonce, name) = rest.split_once('_').expect("nonce separator");
    assert_eq!(nonce.len(), 8);
    assert!(nonce.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(name, "mon_panneau.jpg");
}

#[test]
fn photo_keys_differ_for_same_name_and_instant() {
    let at = Utc.with_ymd_and_hms(2024, 1, 15, 9, 30, 0).unwrap();

    let first = photo_key(InspectorId(42), "image.jpg", at);
    let second = photo_key(InspectorId(42), "image.jpg", at);

    assert_ne!(first, second);
}

#[test]
fn photo_key_falls_back_for_blank_names() {
    let at = Utc.with_ymd_and_hms(2024, 1, 15, 9, 30, 0).unwrap();

    let key = photo_key(InspectorId(3), "uploads/", at);

    assert!(key.as_str().ends_with("_photo.jpg"));
}
