//! Export pipeline: format conversion and archive assembly
//!
//! Converts stored output images to a user-chosen encoding and delivers a
//! single file or a zip of the current selection. Export never touches job
//! state; a codec failure is scoped to the export action.

use std::collections::HashMap;
use std::io::{Cursor, Write};

use image::ImageEncoder;
use serde::{Deserialize, Serialize};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::error::{Error, Result};
use crate::types::{ImageBlob, ImageJob};

/// Suffix appended to the original filename stem
pub const EXPORT_SUFFIX: &str = "-removed";

/// Fixed name of the batch export archive
pub const ARCHIVE_NAME: &str = "retouched-images.zip";

/// Fixed JPEG quality factor, not user-tunable
const JPEG_QUALITY: u8 = 92;

/// Target encoding for an export
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Lossless default
    #[default]
    Png,
    /// Lossy at a fixed quality factor; alpha is flattened
    Jpeg,
    /// Lossless alternative
    Webp,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Jpeg => "jpg",
            ExportFormat::Webp => "webp",
        }
    }

    pub fn media_type(&self) -> &'static str {
        match self {
            ExportFormat::Png => "image/png",
            ExportFormat::Jpeg => "image/jpeg",
            ExportFormat::Webp => "image/webp",
        }
    }
}

/// Build the download filename: stem of the original, suffix, new extension
///
/// An extensionless original keeps its whole name as the stem.
pub fn export_filename(original: &str, format: ExportFormat) -> String {
    let stem = match original.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => original,
    };
    format!("{}{}.{}", stem, EXPORT_SUFFIX, format.extension())
}

/// Decode a stored output and re-encode it at the requested format
pub fn convert_image(blob: &ImageBlob, format: ExportFormat) -> Result<ImageBlob> {
    let img = image::load_from_memory(&blob.data)
        .map_err(|e| Error::Codec(format!("Failed to decode image: {}", e)))?;

    let mut out = Vec::new();
    match format {
        ExportFormat::Png => {
            let encoder = image::codecs::png::PngEncoder::new_with_quality(
                Cursor::new(&mut out),
                image::codecs::png::CompressionType::Default,
                image::codecs::png::FilterType::Adaptive,
            );
            encoder
                .write_image(img.as_bytes(), img.width(), img.height(), img.color().into())
                .map_err(|e| Error::Codec(format!("Failed to encode PNG: {}", e)))?;
        }
        ExportFormat::Jpeg => {
            // JPEG has no alpha channel; flatten before encoding
            let rgb = img.to_rgb8();
            let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(
                Cursor::new(&mut out),
                JPEG_QUALITY,
            );
            encoder
                .encode_image(&rgb)
                .map_err(|e| Error::Codec(format!("Failed to encode JPEG: {}", e)))?;
        }
        ExportFormat::Webp => {
            img.write_to(&mut Cursor::new(&mut out), image::ImageFormat::WebP)
                .map_err(|e| Error::Codec(format!("Failed to encode WebP: {}", e)))?;
        }
    }

    Ok(ImageBlob::new(out, format.media_type()))
}

/// Package the given jobs' outputs into one zip archive
///
/// Jobs without an output are ignored; a conversion failure is logged and
/// skipped so one bad image never aborts the rest. An empty input yields a
/// valid zero-entry archive. Duplicate member names get a numeric
/// disambiguator.
pub fn build_archive(jobs: &[&ImageJob], format: ExportFormat) -> Result<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    let mut used_names: HashMap<String, usize> = HashMap::new();

    for job in jobs {
        let Some(output) = &job.output else {
            continue;
        };
        let converted = match convert_image(output, format) {
            Ok(converted) => converted,
            Err(e) => {
                tracing::warn!("Skipping '{}' in archive: {}", job.filename, e);
                continue;
            }
        };

        let name = disambiguate(&mut used_names, export_filename(&job.filename, format));
        writer
            .start_file(&name, options)
            .map_err(|e| Error::Archive(format!("Failed to add '{}': {}", name, e)))?;
        writer
            .write_all(&converted.data)
            .map_err(|e| Error::Archive(format!("Failed to write '{}': {}", name, e)))?;
    }

    let cursor = writer
        .finish()
        .map_err(|e| Error::Archive(format!("Failed to finalize archive: {}", e)))?;
    Ok(cursor.into_inner())
}

/// Keep archive member names unique: second `photo-removed.png` becomes
/// `photo-removed (2).png`
fn disambiguate(used: &mut HashMap<String, usize>, name: String) -> String {
    let count = used.entry(name.clone()).or_insert(0);
    *count += 1;
    if *count == 1 {
        return name;
    }
    match name.rsplit_once('.') {
        Some((stem, ext)) => format!("{} ({}).{}", stem, count, ext),
        None => format!("{} ({})", name, count),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ImageJob, JobStatus};

    /// A tiny valid image to round through the codecs
    fn sample_png() -> ImageBlob {
        let img = image::RgbaImage::from_pixel(2, 2, image::Rgba([120, 30, 60, 200]));
        let mut data = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut data), image::ImageFormat::Png)
            .unwrap();
        ImageBlob::new(data, "image/png")
    }

    fn done_job(filename: &str) -> ImageJob {
        let mut job = ImageJob::new(filename.to_string(), sample_png());
        job.status = JobStatus::Done;
        job.output = Some(sample_png());
        job
    }

    #[test]
    fn test_export_filename_strips_extension_and_appends_suffix() {
        assert_eq!(
            export_filename("photo.png", ExportFormat::Jpeg),
            "photo-removed.jpg"
        );
        assert_eq!(
            export_filename("my.vacation.webp", ExportFormat::Png),
            "my.vacation-removed.png"
        );
        // extensionless names keep the whole name as the stem
        assert_eq!(
            export_filename("photo", ExportFormat::Webp),
            "photo-removed.webp"
        );
    }

    #[test]
    fn test_convert_to_each_format() {
        let source = sample_png();
        for format in [ExportFormat::Png, ExportFormat::Jpeg, ExportFormat::Webp] {
            let converted = convert_image(&source, format).unwrap();
            assert_eq!(converted.media_type, format.media_type());
            assert!(!converted.is_empty());
            // the result must itself decode
            image::load_from_memory(&converted.data).unwrap();
        }
    }

    #[test]
    fn test_jpeg_conversion_flattens_alpha() {
        let converted = convert_image(&sample_png(), ExportFormat::Jpeg).unwrap();
        let decoded = image::load_from_memory(&converted.data).unwrap();
        assert!(!decoded.color().has_alpha());
    }

    #[test]
    fn test_convert_garbage_is_a_codec_error() {
        let blob = ImageBlob::new(vec![0u8; 16], "image/png");
        let err = convert_image(&blob, ExportFormat::Png).unwrap_err();
        assert!(matches!(err, Error::Codec(_)));
    }

    #[test]
    fn test_empty_selection_yields_zero_entry_archive() {
        let bytes = build_archive(&[], ExportFormat::Png).unwrap();
        let archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 0);
    }

    #[test]
    fn test_archive_contains_renamed_members() {
        let a = done_job("first.png");
        let b = done_job("second.jpg");
        let bytes = build_archive(&[&a, &b], ExportFormat::Webp).unwrap();

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        assert_eq!(names, vec!["first-removed.webp", "second-removed.webp"]);
    }

    #[test]
    fn test_archive_skips_broken_outputs() {
        let good = done_job("good.png");
        let mut bad = done_job("bad.png");
        bad.output = Some(ImageBlob::new(vec![1u8, 2, 3], "image/png"));

        let bytes = build_archive(&[&bad, &good], ExportFormat::Png).unwrap();
        let archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 1);
    }

    #[test]
    fn test_duplicate_names_get_disambiguated() {
        let a = done_job("dup.png");
        let b = done_job("dup.png");
        let c = done_job("dup.png");
        let bytes = build_archive(&[&a, &b, &c], ExportFormat::Png).unwrap();

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "dup-removed.png",
                "dup-removed (2).png",
                "dup-removed (3).png"
            ]
        );
    }
}
