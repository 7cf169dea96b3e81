//! Document and asset I/O for embedding
//!
//! Parsing, serializing and image decoding are CPU-bound; they run on the
//! blocking pool so callers on an async runtime stay responsive.

use super::canvas::{LopdfCanvas, PdfCanvas};
use crate::model::{Asset, AssetId};
use crate::types::*;
use image::RgbaImage;
use std::collections::HashMap;
use std::path::Path;

/// Read a PDF from disk
pub async fn read_pdf_bytes(path: impl AsRef<Path>) -> Result<Vec<u8>> {
    let bytes = tokio::fs::read(path.as_ref()).await?;
    Ok(bytes)
}

/// Write generated PDF bytes to disk
pub async fn write_pdf_bytes(path: impl AsRef<Path>, bytes: &[u8]) -> Result<()> {
    tokio::fs::write(path.as_ref(), bytes).await?;
    Ok(())
}

/// Parse a PDF into a drawable canvas
pub async fn load_canvas(bytes: Vec<u8>) -> Result<LopdfCanvas> {
    let canvas = tokio::task::spawn_blocking(move || LopdfCanvas::load(&bytes)).await??;
    Ok(canvas)
}

/// Serialize a canvas, flushing everything drawn on it
pub async fn save_canvas(mut canvas: LopdfCanvas) -> Result<Vec<u8>> {
    let bytes = tokio::task::spawn_blocking(move || canvas.save()).await??;
    Ok(bytes)
}

/// Page geometry of a PDF, for setting up a preview before generating
pub async fn inspect_pages(bytes: Vec<u8>) -> Result<Vec<PageGeometry>> {
    let pages = tokio::task::spawn_blocking(move || {
        let canvas = LopdfCanvas::load(&bytes)?;
        canvas.page_geometries()
    })
    .await??;
    Ok(pages)
}

/// Decode the given assets to RGBA, one blocking task per asset
pub async fn decode_assets(assets: Vec<Asset>) -> Result<HashMap<AssetId, RgbaImage>> {
    let mut handles = Vec::with_capacity(assets.len());
    for asset in assets {
        let id = asset.id();
        handles.push((id, tokio::task::spawn_blocking(move || asset.decode())));
    }

    let mut decoded = HashMap::with_capacity(handles.len());
    for (id, handle) in handles {
        let image = handle.await??;
        log::debug!("Decoded {} ({}x{} px)", id, image.width(), image.height());
        decoded.insert(id, image);
    }
    Ok(decoded)
}
