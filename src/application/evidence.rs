//! Per-step screenshot capture and review-grid composition.

use std::io::Cursor;
use std::sync::Arc;

use image::{imageops, DynamicImage, ImageFormat, RgbaImage};

use crate::domain::error::EngineError;
use crate::infrastructure::browser::BrowserDriver;

/// Number of snapshot columns in the composed review image.
const GRID_COLUMNS: u32 = 2;

/// Accumulates viewport snapshots over a run and composes them into a
/// single review image at the end.
#[derive(Default)]
pub struct EvidenceCollector {
    snapshots: Vec<Vec<u8>>,
}

impl EvidenceCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Capture the current viewport. Capture failures are logged and
    /// swallowed; evidence is best-effort and never aborts a run.
    pub async fn capture(&mut self, driver: &Arc<dyn BrowserDriver>, label: &str) {
        match driver.capture_screen().await {
            Ok(png) => {
                tracing::debug!(snapshot = label, bytes = png.len(), "Snapshot captured");
                self.snapshots.push(png);
            }
            Err(e) => {
                tracing::warn!(snapshot = label, "Snapshot capture failed: {}", e);
            }
        }
    }

    /// Compose all captured snapshots into one PNG, two columns wide,
    /// filled left to right then top to bottom. Cell size comes from the
    /// first snapshot. Returns `None` when nothing was captured.
    pub fn compose(&self) -> Result<Option<Vec<u8>>, EngineError> {
        if self.snapshots.is_empty() {
            return Ok(None);
        }

        let mut images = Vec::with_capacity(self.snapshots.len());
        for (idx, png) in self.snapshots.iter().enumerate() {
            let image = image::load_from_memory(png)
                .map_err(|e| EngineError::Evidence(format!("decoding snapshot {idx}: {e}")))?;
            images.push(image);
        }

        let cell_width = images[0].width();
        let cell_height = images[0].height();
        let rows = (images.len() as u32).div_ceil(GRID_COLUMNS);

        let mut canvas = RgbaImage::new(cell_width * GRID_COLUMNS, cell_height * rows);
        for (idx, image) in images.iter().enumerate() {
            let col = idx as u32 % GRID_COLUMNS;
            let row = idx as u32 / GRID_COLUMNS;
            imageops::replace(
                &mut canvas,
                &image.to_rgba8(),
                (col * cell_width) as i64,
                (row * cell_height) as i64,
            );
        }

        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(canvas)
            .write_to(&mut out, ImageFormat::Png)
            .map_err(|e| EngineError::Evidence(format!("encoding review image: {e}")))?;
        Ok(Some(out.into_inner()))
    }
}
