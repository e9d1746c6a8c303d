use std::sync::Arc;

use batch::BatchCoordinator;
use entry::{Entry, FileHandle, LocalDirectoryReader};
use error::AppError;
use model::{snapshot::BatchReport, UploadItem};
use settings::Settings;
use task::http::{HttpTransport, HttpUrlIssuer};

mod action;
pub mod batch;
pub mod entry;
pub mod error;
pub mod event;
pub mod model;
pub mod path;
pub mod settings;
pub mod task;
mod update;
pub mod view;

/// Uploads the configured sources and renders progress until the batch is
/// finished or stopped. Ctrl-C stops every open transfer.
pub async fn run(settings: Settings) -> Result<BatchReport, AppError> {
    let files = collect_files(&settings).await?;
    if files.is_empty() {
        return Err(AppError::NothingToUpload);
    }

    tracing::debug!("collected {} files for upload", files.len());

    let client = reqwest::Client::builder().build()?;
    let mut coordinator = BatchCoordinator::new(
        Arc::new(HttpUrlIssuer::new(client.clone(), &settings.endpoint)),
        Arc::new(HttpTransport::new(client)),
        settings.batch.clone(),
    );

    coordinator.add_items(files.into_iter().map(UploadItem::from).collect())?;

    let renderer = tokio::spawn(view::run(coordinator.subscribe()));

    let controller = coordinator.controller();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, stopping all transfers");
            controller.cancel_all();
        }
    });

    let report = coordinator
        .run_batch(&settings.destination_folder, || {
            tracing::info!("upload batch finished");
        })
        .await;

    interrupt.abort();
    drop(coordinator);

    let mut errors = Vec::new();
    match renderer.await {
        Ok(Ok(())) => {}
        Ok(Err(error)) => errors.push(error),
        Err(error) => tracing::error!("renderer failed: {:?}", error),
    }

    if errors.is_empty() {
        Ok(report)
    } else {
        Err(AppError::Aggregate(errors))
    }
}

async fn collect_files(settings: &Settings) -> Result<Vec<FileHandle>, AppError> {
    let reader = LocalDirectoryReader;

    if settings.flat {
        let mut files = Vec::new();
        for source in &settings.sources {
            files.push(reader.file(source).await?);
        }
        return Ok(entry::flatten(files));
    }

    let mut entries: Vec<Entry> = Vec::new();
    for source in &settings.sources {
        entries.push(reader.entry(source).await?);
    }

    Ok(entry::scan(entries, &reader).await)
}
