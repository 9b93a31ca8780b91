use std::io::Cursor;

use image::{DynamicImage, ImageBuffer, ImageFormat, Rgba};

use profile_image::cropper::{CropCallbacks, CropConfig};
use profile_image::image_handler::{
    CompressOptions, ImageConfig, ImageError, ImageHandler, ImageSource, OutputFormat,
};
use profile_image::settings::{PipelineSettings, load_settings, save_settings};

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = ImageBuffer::from_fn(width, height, |x, y| Rgba([(x % 255) as u8, (y % 255) as u8, 90, 255]));
    let mut cursor = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(img)
        .write_to(&mut cursor, ImageFormat::Png)
        .expect("encode png");
    cursor.into_inner()
}

#[test]
fn compress_from_file_keeps_small_images_untouched() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("small.png");
    std::fs::write(&path, png_bytes(320, 180)).expect("write");

    let handler = ImageHandler::new(ImageConfig::default()).expect("handler");
    let encoded = handler
        .compress(
            ImageSource::FilePath(path.to_string_lossy().into_owned()),
            &CompressOptions::default(),
        )
        .expect("compress");

    assert_eq!(encoded.decode().expect("decode").dimensions(), (320, 180));
}

#[test]
fn compress_large_image_preserves_aspect() {
    let handler = ImageHandler::new(ImageConfig::default()).expect("handler");
    let options = CompressOptions {
        max_width: 1200,
        max_height: 400,
        format: OutputFormat::Webp,
        ..CompressOptions::default()
    };

    let encoded = handler
        .compress(ImageSource::Bytes(png_bytes(3000, 2000)), &options)
        .expect("compress");

    assert_eq!(encoded.mime_type(), "image/webp");
    assert_eq!(encoded.decode().expect("decode").dimensions(), (600, 400));
}

#[test]
fn zero_bounds_are_a_validation_error() {
    let handler = ImageHandler::new(ImageConfig::default()).expect("handler");
    let options = CompressOptions {
        max_width: 0,
        ..CompressOptions::default()
    };

    let result = handler.compress(ImageSource::Bytes(png_bytes(10, 10)), &options);
    assert!(matches!(result, Err(ImageError::Validation(_))));
}

#[test]
fn settings_file_tightens_upload_limit() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("settings.json");
    save_settings(
        &path,
        &PipelineSettings {
            max_file_size: Some(64),
            ..PipelineSettings::default()
        },
    )
    .expect("save");

    let handler = ImageHandler::new(ImageConfig::default()).expect("handler");
    let settings = load_settings(&path).expect("load").expect("present");
    handler.apply_settings(&settings).expect("apply");

    let bytes = png_bytes(200, 200);
    assert!(bytes.len() > 64);
    assert!(matches!(
        handler.validate_upload(&bytes, "image/png"),
        Err(ImageError::Validation(_))
    ));
    assert!(matches!(
        handler.validate_upload(&bytes[..16], "text/plain"),
        Err(ImageError::Validation(_))
    ));
}

#[tokio::test]
async fn async_cropper_reports_decode_failure() {
    let handler = ImageHandler::new(ImageConfig::default()).expect("handler");
    let callbacks = CropCallbacks::new(|_| panic!("no output expected"), || {});

    let result = handler
        .open_cropper_async(
            ImageSource::Bytes(b"definitely not an image".to_vec()),
            &CropConfig::default(),
            callbacks,
        )
        .await;

    assert!(matches!(result, Err(ImageError::Decode(_))));
}
