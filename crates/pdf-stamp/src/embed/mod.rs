//! Embedding placed assets into the output PDF
//!
//! A run loads the document, resolves the model into placement jobs, decodes
//! the assets those jobs need, rasterizes and draws each job, then saves.
//! Pages are never added, removed, reordered or resized.

mod canvas;
mod io;
mod raster;

pub use canvas::{DrawRect, EmbeddedImage, LopdfCanvas, PdfCanvas};
pub use io::{
    decode_assets, inspect_pages, load_canvas, read_pdf_bytes, save_canvas, write_pdf_bytes,
};
pub use raster::{rasterize, split_straddle};

use crate::geometry::{OrientationNormalizer, PageFrame};
use crate::model::{AssetId, JobKind, Placement, PlacementJob, PlacementModel, Target};
use crate::options::GenerationOptions;
use crate::types::*;
use image::RgbaImage;
use std::fmt;

// =============================================================================
// Run State
// =============================================================================

/// Where a generation run currently is
#[derive(Debug, Clone, PartialEq, Default)]
pub enum GenerationState {
    #[default]
    Idle,
    Loading,
    /// Drawing job `current` (1-based) of `total`
    Rendering { current: usize, total: usize },
    Saving,
    Done,
    Failed(String),
}

impl GenerationState {
    /// The run has finished, successfully or not
    pub fn is_finished(&self) -> bool {
        matches!(self, GenerationState::Done | GenerationState::Failed(_))
    }
}

impl fmt::Display for GenerationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationState::Idle => write!(f, "idle"),
            GenerationState::Loading => write!(f, "loading document"),
            GenerationState::Rendering { current, total } => {
                write!(f, "rendering placement {}/{}", current, total)
            }
            GenerationState::Saving => write!(f, "saving document"),
            GenerationState::Done => write!(f, "done"),
            GenerationState::Failed(msg) => write!(f, "failed: {}", msg),
        }
    }
}

/// A placement that was skipped without failing the run
#[derive(Debug, Clone, PartialEq)]
pub enum EmbedWarning {
    /// The placement targets a page the document does not have
    PageOutOfRange {
        source: Target,
        page_number: u32,
        page_count: usize,
    },
    /// The straddle stamp is narrower than the page count, so this page gets nothing
    EmptyStraddleSlice { source: Target, page_number: u32 },
}

impl fmt::Display for EmbedWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmbedWarning::PageOutOfRange {
                source,
                page_number,
                page_count,
            } => write!(
                f,
                "{} targets page {} but the document has {} pages",
                source, page_number, page_count
            ),
            EmbedWarning::EmptyStraddleSlice {
                source,
                page_number,
            } => write!(f, "{} has no visible slice on page {}", source, page_number),
        }
    }
}

/// Output of a successful run
#[derive(Debug, Clone)]
pub struct GeneratedPdf {
    pub bytes: Vec<u8>,
    pub warnings: Vec<EmbedWarning>,
    pub page_count: usize,
}

// =============================================================================
// Generator
// =============================================================================

/// Produces a new PDF with every placement of a model drawn into it.
///
/// Generation takes `&mut self`, so a generator runs at most one job at a time.
#[derive(Debug, Default)]
pub struct EmbeddingGenerator {
    options: GenerationOptions,
    state: GenerationState,
}

impl EmbeddingGenerator {
    pub fn new(options: GenerationOptions) -> Self {
        Self {
            options,
            state: GenerationState::Idle,
        }
    }

    pub fn options(&self) -> &GenerationOptions {
        &self.options
    }

    pub fn state(&self) -> &GenerationState {
        &self.state
    }

    /// Embed every placement of `model` into the PDF in `pdf_bytes`
    pub async fn generate(
        &mut self,
        pdf_bytes: Vec<u8>,
        model: &PlacementModel,
    ) -> Result<GeneratedPdf> {
        self.generate_with_progress(pdf_bytes, model, |_| {}).await
    }

    /// Like [`generate`](Self::generate), reporting every state change
    pub async fn generate_with_progress<F>(
        &mut self,
        pdf_bytes: Vec<u8>,
        model: &PlacementModel,
        mut progress: F,
    ) -> Result<GeneratedPdf>
    where
        F: FnMut(&GenerationState) + Send,
    {
        match self.run(pdf_bytes, model, &mut progress).await {
            Ok(output) => {
                self.transition(GenerationState::Done, &mut progress);
                Ok(output)
            }
            Err(e) => {
                log::error!("Generation failed: {}", e);
                self.transition(GenerationState::Failed(e.to_string()), &mut progress);
                Err(e)
            }
        }
    }

    fn transition<F>(&mut self, state: GenerationState, progress: &mut F)
    where
        F: FnMut(&GenerationState),
    {
        log::debug!("Generation state: {}", state);
        self.state = state;
        progress(&self.state);
    }

    async fn run<F>(
        &mut self,
        pdf_bytes: Vec<u8>,
        model: &PlacementModel,
        progress: &mut F,
    ) -> Result<GeneratedPdf>
    where
        F: FnMut(&GenerationState) + Send,
    {
        self.options.validate()?;

        self.transition(GenerationState::Loading, progress);
        let mut canvas = load_canvas(pdf_bytes).await?;
        if canvas.page_count() == 0 {
            return Err(StampError::NoPages);
        }

        let jobs = model.resolve_jobs();

        // Every referenced asset must exist before anything is drawn
        let mut needed: Vec<AssetId> = Vec::new();
        for job in &jobs {
            if !needed.contains(&job.asset_id) {
                needed.push(job.asset_id);
            }
        }
        let assets = needed
            .iter()
            .map(|&id| {
                model
                    .asset(id)
                    .cloned()
                    .ok_or(StampError::MissingAsset { asset: id.0 })
            })
            .collect::<Result<Vec<_>>>()?;
        let images = decode_assets(assets).await?;

        let normalizer = self.options.normalizer(canvas.page_geometries()?);

        let total = jobs.len();
        let mut warnings = Vec::new();
        for (index, job) in jobs.iter().enumerate() {
            self.transition(
                GenerationState::Rendering {
                    current: index + 1,
                    total,
                },
                progress,
            );
            let source = images
                .get(&job.asset_id)
                .ok_or(StampError::MissingAsset {
                    asset: job.asset_id.0,
                })?;
            warnings.extend(render_job(
                &mut canvas,
                &normalizer,
                job,
                source,
                &self.options,
            )?);
        }

        self.transition(GenerationState::Saving, progress);
        let page_count = canvas.page_count();
        let bytes = save_canvas(canvas).await?;

        log::info!(
            "Embedded {} placements into {} pages ({} skipped)",
            total,
            page_count,
            warnings.len()
        );
        Ok(GeneratedPdf {
            bytes,
            warnings,
            page_count,
        })
    }
}

// =============================================================================
// Job Rendering
// =============================================================================

/// Where a placement lands on a page, in points from the MediaBox origin
pub fn page_rect(frame: &PageFrame, placement: &Placement, opacity: f32) -> DrawRect {
    let on_page = frame.to_page(placement.position(), placement.size_mm());
    let (cw, ch) = placement.container_dimensions();
    displayed_rect(
        frame,
        frame.mm_to_pt(on_page.x),
        frame.mm_to_pt(on_page.y),
        frame.mm_to_pt(cw),
        frame.mm_to_pt(ch),
        opacity,
    )
}

/// Map a box given in the displayed page (points, y-down from the top-left
/// corner as the viewer shows it) into unrotated MediaBox space (y-up).
///
/// On pages with `/Rotate` the returned box is the MediaBox footprint and
/// `page_rotation` tells the canvas to counter-rotate the image so it reads
/// upright once the viewer applies the page rotation.
pub fn displayed_rect(
    frame: &PageFrame,
    left: f64,
    top: f64,
    width: f64,
    height: f64,
    opacity: f32,
) -> DrawRect {
    let media_w = frame.width_pt();
    let media_h = frame.height_pt();
    let rotation = frame.geometry.rotation_angle;

    let (x, y, w, h) = match rotation {
        90 => (top, left, height, width),
        180 => (media_w - left - width, top, width, height),
        270 => (media_w - top - height, media_h - left - width, height, width),
        _ => (left, media_h - top - height, width, height),
    };

    DrawRect {
        x,
        y,
        width: w,
        height: h,
        opacity,
        page_rotation: rotation,
    }
}

/// Draw one job onto the canvas.
///
/// Out-of-range pages and empty straddle slices are skipped and reported as
/// warnings; canvas failures abort.
pub fn render_job<C: PdfCanvas>(
    canvas: &mut C,
    normalizer: &OrientationNormalizer,
    job: &PlacementJob,
    source: &RgbaImage,
    options: &GenerationOptions,
) -> Result<Vec<EmbedWarning>> {
    match job.kind {
        JobKind::Page { page_number } => {
            let Some(frame) = normalizer.frame(page_number) else {
                log::warn!(
                    "Skipping {}: page {} is outside the document ({} pages)",
                    job.source,
                    page_number,
                    normalizer.page_count()
                );
                return Ok(vec![EmbedWarning::PageOutOfRange {
                    source: job.source,
                    page_number,
                    page_count: normalizer.page_count(),
                }]);
            };

            let raster = rasterize(source, &job.placement, options.raster_dpi);
            let image = canvas.embed_raster(&raster)?;
            canvas.draw_image(
                page_number,
                image,
                page_rect(&frame, &job.placement, options.opacity),
            )?;
            Ok(Vec::new())
        }
        JobKind::Straddle { y_mm } => {
            render_straddle(canvas, normalizer, job, source, y_mm, options)
        }
    }
}

fn render_straddle<C: PdfCanvas>(
    canvas: &mut C,
    normalizer: &OrientationNormalizer,
    job: &PlacementJob,
    source: &RgbaImage,
    y_mm: f64,
    options: &GenerationOptions,
) -> Result<Vec<EmbedWarning>> {
    let total_pages = u32::try_from(normalizer.page_count())
        .map_err(|_| StampError::Config("Too many pages for a straddle stamp".to_string()))?;

    let raster = rasterize(source, &job.placement, options.raster_dpi);
    let (cw, ch) = job.placement.container_dimensions();
    let mut warnings = Vec::new();

    for (slice, part) in split_straddle(&raster, total_pages) {
        let page_number = slice.page_number;
        let Some(part) = part else {
            log::warn!("{} has no visible slice on page {}", job.source, page_number);
            warnings.push(EmbedWarning::EmptyStraddleSlice {
                source: job.source,
                page_number,
            });
            continue;
        };
        let Some(frame) = normalizer.frame(page_number) else {
            continue;
        };

        let width = frame.mm_to_pt(cw) * slice.width_fraction();
        let height = frame.mm_to_pt(ch);
        let rect = displayed_rect(
            &frame,
            frame.display_width_pt() - width,
            frame.mm_to_pt(y_mm),
            width,
            height,
            options.opacity,
        );

        let image = canvas.embed_raster(&part)?;
        canvas.draw_image(page_number, image, rect)?;
    }

    Ok(warnings)
}
