use std::fmt;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use image::imageops::{self, FilterType};
use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageFormat, ImageReader, Rgba, RgbaImage};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{ImageTransformer, ResizeSpec, TransformedImage, sniff_mime};
use crate::error::TransformError;

const FILTER: FilterType = FilterType::Lanczos3;

/// `image`-crate backed transformer running on the blocking pool, with at
/// most `workers` transforms in flight.
pub struct ResizeTransformer {
    spec: ResizeSpec,
    permits: Arc<Semaphore>,
    workers: usize,
}

impl fmt::Debug for ResizeTransformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResizeTransformer")
            .field("spec", &self.spec)
            .field("workers", &self.workers)
            .field("available", &self.permits.available_permits())
            .finish()
    }
}

impl ResizeTransformer {
    pub fn new(spec: ResizeSpec, workers: usize) -> Self {
        let workers = workers.max(1);
        Self {
            spec,
            permits: Arc::new(Semaphore::new(workers)),
            workers,
        }
    }

    /// One worker per CPU.
    pub fn with_default_workers(spec: ResizeSpec) -> Self {
        Self::new(spec, num_cpus::get())
    }
}

#[async_trait]
impl ImageTransformer for ResizeTransformer {
    async fn transform(
        &self,
        path: &Path,
        cancel: CancellationToken,
    ) -> Result<TransformedImage, TransformError> {
        let permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(TransformError::Cancelled),
            permit = Arc::clone(&self.permits).acquire_owned() => {
                permit.map_err(|err| TransformError::Worker(err.to_string()))?
            }
        };

        let path = path.to_path_buf();
        let spec = self.spec;
        tokio::task::spawn_blocking(move || {
            // Held until the blocking work ends, even if the caller gave up.
            let _permit = permit;
            run_pipeline(path, spec, &cancel)
        })
        .await
        .map_err(|err| TransformError::Worker(err.to_string()))?
    }
}

fn run_pipeline(
    path: PathBuf,
    spec: ResizeSpec,
    cancel: &CancellationToken,
) -> Result<TransformedImage, TransformError> {
    let reader = ImageReader::open(&path)?.with_guessed_format()?;
    let source_format = reader.format();

    let decode_err = |source| TransformError::Decode {
        path: path.clone(),
        source,
    };
    let mut decoder = reader.into_decoder().map_err(decode_err)?;
    let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);
    let mut img = DynamicImage::from_decoder(decoder).map_err(decode_err)?;
    ensure_live(cancel)?;

    img.apply_orientation(orientation);
    let output = output_format(source_format);
    let resized = resize(img, spec, keeps_alpha(output));
    ensure_live(cancel)?;

    let bytes = encode(&resized, output).map_err(|source| TransformError::Encode {
        path: path.clone(),
        source,
    })?;
    let mime = sniff_mime(&bytes);
    debug!(
        path = %path.display(),
        bytes = bytes.len(),
        mime = %mime,
        ?orientation,
        "transformed image"
    );

    Ok(TransformedImage { path, bytes, mime })
}

fn ensure_live(cancel: &CancellationToken) -> Result<(), TransformError> {
    if cancel.is_cancelled() {
        Err(TransformError::Cancelled)
    } else {
        Ok(())
    }
}

/// JPEG, PNG and WebP keep their format; everything else becomes JPEG.
fn output_format(source: Option<ImageFormat>) -> ImageFormat {
    match source {
        Some(format @ (ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::WebP)) => format,
        _ => ImageFormat::Jpeg,
    }
}

fn keeps_alpha(format: ImageFormat) -> bool {
    matches!(format, ImageFormat::Png | ImageFormat::WebP)
}

fn resize(img: DynamicImage, spec: ResizeSpec, transparent_padding: bool) -> DynamicImage {
    match spec {
        ResizeSpec::Proportional { width } => {
            let width = width.max(1);
            let ratio = f64::from(width) / f64::from(img.width().max(1));
            let height = (f64::from(img.height()) * ratio).round().max(1.0) as u32;
            img.resize_exact(width, height, FILTER)
        }
        ResizeSpec::Contain { width, height } => {
            let (width, height) = (width.max(1), height.max(1));
            let fitted = img.resize(width, height, FILTER);
            let alpha = if transparent_padding { 0 } else { 255 };
            let mut canvas = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, alpha]));
            let x = i64::from((width - fitted.width()) / 2);
            let y = i64::from((height - fitted.height()) / 2);
            imageops::overlay(&mut canvas, &fitted.to_rgba8(), x, y);
            DynamicImage::ImageRgba8(canvas)
        }
    }
}

fn encode(img: &DynamicImage, format: ImageFormat) -> image::ImageResult<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut cursor = Cursor::new(&mut buffer);
    match format {
        // JPEG has no alpha channel.
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(img.to_rgb8()).write_to(&mut cursor, format)?,
        _ => DynamicImage::ImageRgba8(img.to_rgba8()).write_to(&mut cursor, format)?,
    }
    Ok(buffer)
}
