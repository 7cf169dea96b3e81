use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use pdf_async_runtime::{StampCommand, StampUpdate, worker_task};
use pdf_stamp::geometry::rotated_bounds;
use pdf_stamp::{
    ConfigSpec, GenerationOptions, GenerationState, PlacementMode, PlacementModel, Point,
};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

mod logger;
mod plan;

use logger::StderrLogger;
use plan::PlacementPlan;

#[derive(Parser)]
#[command(name = "pdft", about = "Stamp and sign PDF pages", version)]
struct Cli {
    /// More log output (repeat for debug/trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stamp a seal image onto selected pages (or across all pages)
    Stamp {
        /// Input PDF file
        #[arg(short, long)]
        input: PathBuf,

        /// Output PDF file
        #[arg(short, long)]
        output: PathBuf,

        /// Seal image (PNG, JPEG, ...)
        #[arg(long)]
        image: PathBuf,

        /// Longest edge of the seal in mm (10-100)
        #[arg(long, default_value = "40")]
        size: f64,

        /// Clockwise rotation in degrees
        #[arg(long, default_value = "0")]
        rotation: f64,

        /// Left edge in mm from the page's top-left corner
        #[arg(short, long, default_value = "0")]
        x: f64,

        /// Top edge in mm from the page's top-left corner
        #[arg(short, long, default_value = "0")]
        y: f64,

        /// Pages to stamp (1-based, comma separated); defaults to every page
        #[arg(long, value_delimiter = ',')]
        pages: Vec<u32>,

        /// Split the seal across all pages along their right edges
        #[arg(long)]
        straddle: bool,

        /// Top edge of the straddle seal in mm (defaults to --y)
        #[arg(long)]
        straddle_y: Option<f64>,

        /// Generation options JSON file
        #[arg(long)]
        options: Option<PathBuf>,
    },

    /// Place signatures from a JSON placement plan
    Sign {
        /// Input PDF file
        #[arg(short, long)]
        input: PathBuf,

        /// Output PDF file
        #[arg(short, long)]
        output: PathBuf,

        /// Placement plan JSON file
        #[arg(long)]
        plan: PathBuf,
    },

    /// Show page sizes and orientation
    Inspect {
        /// Input PDF file
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Print the bounding box of a rotated rectangle
    Bounds {
        /// Width in mm
        width: f64,

        /// Height in mm
        height: f64,

        /// Clockwise rotation in degrees
        #[arg(allow_negative_numbers = true)]
        rotation: f64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    StderrLogger::new(StderrLogger::level_for(cli.verbose, cli.quiet))
        .init()
        .context("Failed to install logger")?;

    match cli.command {
        Commands::Stamp {
            input,
            output,
            image,
            size,
            rotation,
            x,
            y,
            pages,
            straddle,
            straddle_y,
            options,
        } => {
            let options = match options {
                Some(path) => GenerationOptions::load(&path)
                    .await
                    .with_context(|| format!("Failed to load options {}", path.display()))?,
                None => GenerationOptions::default(),
            };

            let page_count = inspect(&input).await?.len() as u32;
            let pages = if pages.is_empty() {
                (1..=page_count).collect()
            } else {
                pages
            };

            let bytes = tokio::fs::read(&image)
                .await
                .with_context(|| format!("Failed to read image {}", image.display()))?;
            let mut model = PlacementModel::new(PlacementMode::Stamp);
            let asset = model.add_asset(bytes)?;
            let spec = ConfigSpec {
                size_mm: size,
                rotation,
                position: Point::new(x, y),
                straddle,
                straddle_y_mm: straddle_y,
            };
            let config = model
                .create_config(asset, spec)
                .context("Failed to create stamp")?;
            model.set_selected_pages(config, pages);

            generate(input, model, options, output).await?;
        }

        Commands::Sign {
            input,
            output,
            plan,
        } => {
            let placement_plan = PlacementPlan::load(&plan).await?;
            let base_dir = plan.parent().unwrap_or_else(|| Path::new("."));
            let model = placement_plan.build_model(base_dir).await?;
            let options = placement_plan.options.unwrap_or_default();
            options.validate()?;

            println!(
                "Placing {} signatures from {} assets",
                model.instances().len(),
                placement_plan.assets.len()
            );
            generate(input, model, options, output).await?;
        }

        Commands::Inspect { input } => {
            let pages = inspect(&input).await?;
            println!("{}: {} pages", input.display(), pages.len());
            for (index, page) in pages.iter().enumerate() {
                println!(
                    "  {:>4}: {:.1} x {:.1} mm, rotate {}, {}",
                    index + 1,
                    page.width_mm,
                    page.height_mm,
                    page.rotation_angle,
                    if page.is_landscape() {
                        "landscape"
                    } else {
                        "portrait"
                    }
                );
            }
        }

        Commands::Bounds {
            width,
            height,
            rotation,
        } => {
            let bounds = rotated_bounds(width, height, rotation);
            println!("Container: {:.3} x {:.3} mm", bounds.width, bounds.height);
            println!(
                "Asset offset: {:.3}, {:.3} mm",
                bounds.offset_x, bounds.offset_y
            );
        }
    }

    Ok(())
}

/// Start a worker, send it one command and wait for it to drain
async fn run_worker(command: StampCommand) -> mpsc::UnboundedReceiver<StampUpdate> {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (update_tx, update_rx) = mpsc::unbounded_channel();
    let worker = tokio::spawn(worker_task(command_rx, update_tx));

    // The worker exits once the channel closes after this command
    let _ = command_tx.send(command);
    drop(command_tx);
    if let Err(e) = worker.await {
        log::error!("Worker task failed: {}", e);
    }
    update_rx
}

async fn inspect(input: &Path) -> Result<Vec<pdf_stamp::PageGeometry>> {
    let mut updates = run_worker(StampCommand::Inspect {
        input_path: input.to_path_buf(),
    })
    .await;

    while let Some(update) = updates.recv().await {
        match update {
            StampUpdate::Inspected { pages, .. } => return Ok(pages),
            StampUpdate::Error { message } => bail!(message),
            _ => {}
        }
    }
    bail!("Worker stopped without inspecting {}", input.display())
}

async fn generate(
    input: PathBuf,
    model: PlacementModel,
    options: GenerationOptions,
    output: PathBuf,
) -> Result<()> {
    let mut updates = run_worker(StampCommand::Generate {
        input_path: input,
        model,
        options,
        output_path: output,
    })
    .await;

    while let Some(update) = updates.recv().await {
        match update {
            StampUpdate::Progress { state } => match state {
                GenerationState::Rendering { .. } => log::info!("{}", state),
                _ => log::debug!("{}", state),
            },
            StampUpdate::Complete {
                path,
                page_count,
                warnings,
            } => {
                for warning in &warnings {
                    eprintln!("warning: {}", warning);
                }
                println!("Stamped {} pages → {}", page_count, path.display());
                return Ok(());
            }
            StampUpdate::Error { message } => bail!(message),
            StampUpdate::Inspected { .. } => {}
        }
    }
    bail!("Worker stopped before finishing")
}
