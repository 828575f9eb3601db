//! Subcommand handlers.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::DateTime;
use thiserror::Error;

use super::args::{Args, Command, ConfigAction, PhotosAction, StripsAction};
use super::enums::Filter;
use crate::archive::{self, ArchiveError};
use crate::camera::{CameraError, CaptureLoop, FrameSource, StillImageSource, TestPatternSource};
use crate::config::{default_path, Config, ConfigError, DEFAULT_CONFIG};
use crate::store::{EntityStore, StoreError};
use crate::strip::{StripComposer, StripError};

/// How long `capture` waits for the first processed frame.
const FIRST_FRAME_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Camera(#[from] CameraError),

    #[error(transparent)]
    Strip(#[from] StripError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("Config file already exists: {}", .0.display())]
    ConfigExists(PathBuf),

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Load config, open the store and run the requested command.
pub async fn run(args: Args) -> Result<(), CommandError> {
    let config_path = args.config.clone().unwrap_or_else(default_path);

    if let Command::Config { action } = &args.command {
        return handle_config_action(action.clone(), &config_path);
    }

    let config = Config::load(Some(&config_path))?;
    let data_dir = args.data_dir.clone().unwrap_or_else(|| config.data_dir());
    let store = EntityStore::open(&data_dir)?;

    match args.command {
        Command::Capture {
            input,
            test_pattern,
            filter,
            mirror,
            count,
        } => {
            let source: Box<dyn FrameSource> = match input {
                Some(path) if !test_pattern => Box::new(StillImageSource::open(&path)?),
                _ => Box::new(TestPatternSource::default()),
            };
            capture(&store, &config, source, filter, mirror, count).await
        }
        Command::Photos { action } => handle_photos_action(&store, action).await,
        Command::Strips { action } => handle_strips_action(&store, &config, action).await,
        Command::Status => print_status(&store).await,
        Command::Config { .. } => Ok(()),
    }
}

/// Run the capture loop on `source` just long enough to take `count` photos.
pub async fn capture(
    store: &EntityStore,
    config: &Config,
    source: Box<dyn FrameSource>,
    filter: Option<Filter>,
    mirror: bool,
    count: u32,
) -> Result<(), CommandError> {
    let mut settings = config.capture_settings();
    if let Some(filter) = filter {
        settings.mode = filter.into();
    }
    settings.mirror |= mirror;

    let mut camera = CaptureLoop::new(settings);
    camera.start(source)?;

    let result = take_photos(&camera, store, count).await;
    camera.stop().await;
    result
}

async fn take_photos(
    camera: &CaptureLoop,
    store: &EntityStore,
    count: u32,
) -> Result<(), CommandError> {
    if camera.wait_for_frame(FIRST_FRAME_TIMEOUT).await.is_none() {
        return Err(CameraError::NoFrame.into());
    }

    for _ in 0..count {
        let photo = camera.capture(store).await?;
        println!("Saved photo {} ({})", photo.id, photo.filter);
    }
    Ok(())
}

async fn handle_photos_action(
    store: &EntityStore,
    action: PhotosAction,
) -> Result<(), CommandError> {
    match action {
        PhotosAction::List => {
            let photos = store.photos().get_all().await?;
            if photos.is_empty() {
                println!("No photos yet.");
                println!();
                println!("Take one with 'gbcam capture --test-pattern'.");
                return Ok(());
            }
            println!("{:<16} {:<20} {:<8} {:>8}", "ID", "TAKEN", "FILTER", "BYTES");
            for photo in photos {
                println!(
                    "{:<16} {:<20} {:<8} {:>8}",
                    photo.id,
                    format_timestamp(photo.captured_at),
                    photo.filter,
                    photo.pixels.len()
                );
            }
        }
        PhotosAction::Delete { id } => match store.photos().delete(id).await {
            Ok(()) => println!("Deleted photo {}", id),
            Err(StoreError::NotFound(_)) => println!("No photo with id {}", id),
            Err(e) => return Err(e.into()),
        },
        PhotosAction::Clear => {
            store.photos().clear().await?;
            println!("Deleted all photos");
        }
        PhotosAction::Save { id, path } => {
            let photo = store.photos().get(id).await?;
            let path = path.unwrap_or_else(|| PathBuf::from(format!("gameboy-photo-{}.png", id)));
            write_file(&path, &photo.pixels).await?;
            println!("Wrote {}", path.display());
        }
        PhotosAction::Export { path } => {
            let count = archive::export_to_file(store, &path).await?;
            println!("Exported {} photos to {}", count, path.display());
        }
        PhotosAction::Import { path } => {
            let count = archive::import_from_file(store, &path).await?;
            println!("Imported {} photos", count);
        }
    }
    Ok(())
}

async fn handle_strips_action(
    store: &EntityStore,
    config: &Config,
    action: StripsAction,
) -> Result<(), CommandError> {
    match action {
        StripsAction::List => {
            let strips = store.strips().get_all().await?;
            if strips.is_empty() {
                println!("No strips yet.");
                println!();
                println!("Compose one with 'gbcam strips create <photo-id>...'.");
                return Ok(());
            }
            println!("{:<16} {:<20} {}", "ID", "COMPOSED", "PHOTOS");
            for strip in strips {
                let ids: Vec<String> = strip
                    .source_photo_ids()
                    .iter()
                    .map(|id| id.to_string())
                    .collect();
                println!(
                    "{:<16} {:<20} {}",
                    strip.id,
                    format_timestamp(strip.composed_at),
                    ids.join(", ")
                );
            }
        }
        StripsAction::Create { ids } => {
            let composer = StripComposer::new(store, config.strip_layout());
            let strip = composer.compose_ids(&ids).await?;
            println!(
                "Created strip {} from {} photos",
                strip.id,
                strip.photo_count()
            );
        }
        StripsAction::Delete { id } => match store.strips().delete(id).await {
            Ok(()) => println!("Deleted strip {}", id),
            Err(StoreError::NotFound(_)) => println!("No strip with id {}", id),
            Err(e) => return Err(e.into()),
        },
        StripsAction::Clear => {
            store.strips().clear().await?;
            println!("Deleted all strips");
        }
        StripsAction::Save { id, path } => {
            let strip = store.strips().get(id).await?;
            let path = path.unwrap_or_else(|| {
                PathBuf::from(format!("photostrip-{}.png", strip.composed_at))
            });
            write_file(&path, &strip.pixels).await?;
            println!("Wrote {}", path.display());
        }
    }
    Ok(())
}

async fn print_status(store: &EntityStore) -> Result<(), CommandError> {
    let summary = store.summary().await?;
    if let Some(dir) = store.data_dir() {
        println!("Data directory: {}", dir.display());
    }
    println!("Photos: {} ({} storage)", summary.photos, summary.photo_engine);
    println!("Strips: {} ({} storage)", summary.strips, summary.strip_engine);
    Ok(())
}

/// Handle config subcommand actions.
pub fn handle_config_action(action: ConfigAction, config_path: &Path) -> Result<(), CommandError> {
    match action {
        ConfigAction::Show => {
            let config = Config::load(Some(config_path))?;
            let layout = config.strip_layout();

            println!("Current configuration:");
            println!("  Filter: {}", config.camera.filter);
            println!("  Mirror: {}", if config.camera.mirror { "yes" } else { "no" });
            println!("  Refresh rate: {} Hz", config.camera.refresh_hz);
            println!("  Data directory: {}", config.data_dir().display());
            println!(
                "  Strip: {}px wide, {}px slots, {}px spacing",
                layout.width, layout.slot_height, layout.spacing
            );
            println!();

            if config_path.exists() {
                println!("Config file: {} (exists)", config_path.display());
            } else {
                println!("Config file: {} (not found)", config_path.display());
            }
        }
        ConfigAction::Init => {
            if config_path.exists() {
                return Err(CommandError::ConfigExists(config_path.to_path_buf()));
            }

            // Create parent directories if needed
            if let Some(parent) = config_path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| CommandError::Write {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }

            std::fs::write(config_path, DEFAULT_CONFIG).map_err(|e| CommandError::Write {
                path: config_path.to_path_buf(),
                source: e,
            })?;

            println!("Created config file: {}", config_path.display());
        }
    }
    Ok(())
}

async fn write_file(path: &Path, bytes: &[u8]) -> Result<(), CommandError> {
    tokio::fs::write(path, bytes)
        .await
        .map_err(|e| CommandError::Write {
            path: path.to_path_buf(),
            source: e,
        })
}

/// `YYYY-MM-DD HH:MM:SS` in UTC for a millisecond timestamp.
fn format_timestamp(millis: i64) -> String {
    DateTime::from_timestamp_millis(millis)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| millis.to_string())
}
