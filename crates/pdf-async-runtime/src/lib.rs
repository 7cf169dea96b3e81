use std::path::PathBuf;

mod worker;

pub use worker::worker_task;

// Re-export types from library crates
pub use pdf_stamp::{
    EmbedWarning, GenerationOptions, GenerationState, PageGeometry, PlacementModel,
};

/// Commands sent from the front end to the worker
#[derive(Debug)]
pub enum StampCommand {
    /// Read page sizes so the front end can lay out its preview
    Inspect { input_path: PathBuf },
    /// Embed every placement of `model` and write the result.
    ///
    /// When several of these are queued only the newest one runs.
    Generate {
        input_path: PathBuf,
        model: PlacementModel,
        options: GenerationOptions,
        output_path: PathBuf,
    },
}

/// Updates sent from the worker to the front end
#[derive(Debug, Clone)]
pub enum StampUpdate {
    Inspected {
        path: PathBuf,
        pages: Vec<PageGeometry>,
    },
    Progress {
        state: GenerationState,
    },
    Complete {
        path: PathBuf,
        page_count: usize,
        warnings: Vec<EmbedWarning>,
    },
    Error {
        message: String,
    },
}
