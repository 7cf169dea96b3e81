use crate::{StampCommand, StampUpdate};
use pdf_stamp::embed::{inspect_pages, read_pdf_bytes, write_pdf_bytes};
use pdf_stamp::{EmbeddingGenerator, GenerationOptions, PlacementModel};
use std::path::PathBuf;
use tokio::sync::mpsc;

/// Async worker task that processes stamp commands and sends updates
pub async fn worker_task(
    mut command_rx: mpsc::UnboundedReceiver<StampCommand>,
    update_tx: mpsc::UnboundedSender<StampUpdate>,
) {
    while let Some(cmd) = command_rx.recv().await {
        process_command(cmd, &mut command_rx, &update_tx).await;
    }
    log::debug!("Command channel closed, stopping worker");
}

async fn process_command(
    cmd: StampCommand,
    command_rx: &mut mpsc::UnboundedReceiver<StampCommand>,
    update_tx: &mpsc::UnboundedSender<StampUpdate>,
) {
    match cmd {
        StampCommand::Inspect { input_path } => {
            handle_inspect(input_path, update_tx).await;
        }
        StampCommand::Generate {
            mut input_path,
            mut model,
            mut options,
            mut output_path,
        } => {
            // Drain any queued generations, keeping only the most recent
            while let Ok(next_cmd) = command_rx.try_recv() {
                if let StampCommand::Generate {
                    input_path: new_input,
                    model: new_model,
                    options: new_options,
                    output_path: new_output,
                } = next_cmd
                {
                    log::debug!("Discarding queued generation, using newer request");
                    input_path = new_input;
                    model = new_model;
                    options = new_options;
                    output_path = new_output;
                } else {
                    // Non-generate command found; it cannot be put back, so run it first
                    Box::pin(process_command(next_cmd, command_rx, update_tx)).await;
                }
            }

            handle_generate(input_path, model, options, output_path, update_tx).await;
        }
    }
}

async fn handle_inspect(input_path: PathBuf, update_tx: &mpsc::UnboundedSender<StampUpdate>) {
    let result = match read_pdf_bytes(&input_path).await {
        Ok(bytes) => inspect_pages(bytes).await,
        Err(e) => Err(e),
    };

    let update = match result {
        Ok(pages) => StampUpdate::Inspected {
            path: input_path,
            pages,
        },
        Err(e) => StampUpdate::Error {
            message: format!("Failed to read {}: {}", input_path.display(), e),
        },
    };
    let _ = update_tx.send(update);
}

async fn handle_generate(
    input_path: PathBuf,
    model: PlacementModel,
    options: GenerationOptions,
    output_path: PathBuf,
    update_tx: &mpsc::UnboundedSender<StampUpdate>,
) {
    let bytes = match read_pdf_bytes(&input_path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            let _ = update_tx.send(StampUpdate::Error {
                message: format!("Failed to read {}: {}", input_path.display(), e),
            });
            return;
        }
    };

    let mut generator = EmbeddingGenerator::new(options);
    let progress_tx = update_tx.clone();
    let result = generator
        .generate_with_progress(bytes, &model, move |state| {
            let _ = progress_tx.send(StampUpdate::Progress {
                state: state.clone(),
            });
        })
        .await;

    // Nothing is written unless the whole run succeeded
    let output = match result {
        Ok(output) => output,
        Err(e) => {
            let _ = update_tx.send(StampUpdate::Error {
                message: format!("Generation failed: {}", e),
            });
            return;
        }
    };

    if let Err(e) = write_pdf_bytes(&output_path, &output.bytes).await {
        let _ = update_tx.send(StampUpdate::Error {
            message: format!("Failed to write {}: {}", output_path.display(), e),
        });
        return;
    }

    log::info!("Wrote {}", output_path.display());
    let _ = update_tx.send(StampUpdate::Complete {
        path: output_path,
        page_count: output.page_count,
        warnings: output.warnings,
    });
}
