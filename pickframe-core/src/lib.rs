//! # Pickframe Core
//!
//! Core library for the Pickframe photo server: serves one not-yet-served
//! image at random from a scanned folder tree, resized and auto-rotated,
//! with capture-date and album-name hints.
//!
//! ## Overview
//!
//! - **Sampling**: a shared draw-without-replacement pool with TTL and
//!   generation tracking
//! - **Scanning**: recursive inventory of image files, skipping thumbnails
//! - **Transform**: decode, orient, resize and re-encode on a bounded worker pool
//! - **Metadata**: best-effort EXIF capture date and name header derivation
//! - **Refill**: coalesced background rescans on low watermark or expiry
//! - **Draw**: the per-request retry and deadline loop tying it together
//!
//! ## Architecture
//!
//! - [`sampling`]: [`SamplingCache`] with `draw`, `remaining` and `replace`
//! - [`scanner`]: [`InventoryScanner`] and the `walkdir` implementation
//! - [`transform`]: [`ImageTransformer`] and the `image` implementation
//! - [`metadata`]: [`MetadataExtractor`], [`MetadataEnricher`], [`ResponseHeaders`]
//! - [`refill`]: [`RefillCoordinator`]
//! - [`draw`]: [`DrawService`]
//! - [`error`]: error types for every stage
//!
//! ## Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use pickframe_core::{
//!     DrawPolicy, DrawService, ExifExtractor, MetadataEnricher, RefillCoordinator,
//!     ResizeSpec, ResizeTransformer, SamplingCache, WalkdirScanner,
//! };
//!
//! async fn serve_one() -> Result<(), Box<dyn std::error::Error>> {
//!     let cache = Arc::new(SamplingCache::new(Vec::new(), Duration::from_secs(120)));
//!     let refill = Arc::new(RefillCoordinator::new(
//!         Arc::clone(&cache),
//!         Arc::new(WalkdirScanner::default()),
//!         "/srv/photos",
//!         155,
//!     ));
//!     refill.initial_fill().await?;
//!
//!     let service = DrawService::new(
//!         cache,
//!         Arc::new(ResizeTransformer::with_default_workers(ResizeSpec::default())),
//!         MetadataEnricher::new(Arc::new(ExifExtractor), "/srv/photos"),
//!         refill,
//!         DrawPolicy::default(),
//!     );
//!     let served = service.serve_random().await?;
//!     println!("{} ({})", served.path.display(), served.headers.content_type);
//!     Ok(())
//! }
//! ```

#![allow(missing_docs)]

pub mod draw;
pub mod error;
pub mod metadata;
pub mod refill;
pub mod sampling;
pub mod scanner;
pub mod transform;

pub use draw::{DrawPolicy, DrawService, ServedImage};
pub use error::{DrawError, MetadataError, ScanError, TransformError};
pub use metadata::{
    Enrichment, ExifExtractor, HEADER_IMAGE_DATE, HEADER_IMAGE_NAME, ImageMetadata,
    MetadataEnricher, MetadataExtractor, ResponseHeaders,
};
pub use refill::{RefillCoordinator, RefillReason};
pub use sampling::{Candidate, Generation, PoolStats, SamplingCache};
pub use scanner::{ExclusionRules, InventoryScanner, WalkdirScanner};
pub use transform::{ImageTransformer, ResizeSpec, ResizeTransformer, TransformedImage};
