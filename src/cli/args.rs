//! CLI argument parsing with clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::enums::Filter;

/// Game Boy style camera: 4-color photos and photostrips
#[derive(Parser, Debug)]
#[command(name = "gbcam")]
#[command(version, about = "Game Boy style camera with photostrips", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Config file path
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Directory for the photo database (overrides config)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Capture photos from an image file or the test pattern
    Capture {
        /// Image file to use as the camera
        #[arg(long, short, required_unless_present = "test_pattern")]
        input: Option<PathBuf>,

        /// Use the built-in test pattern as the camera
        #[arg(long, conflicts_with = "input")]
        test_pattern: bool,

        /// Palette (default from config)
        #[arg(long, short)]
        filter: Option<Filter>,

        /// Mirror horizontally
        #[arg(long)]
        mirror: bool,

        /// Number of photos to take
        #[arg(long, short = 'n', default_value = "1")]
        count: u32,
    },
    /// Manage saved photos
    Photos {
        #[command(subcommand)]
        action: PhotosAction,
    },
    /// Manage photostrips
    Strips {
        #[command(subcommand)]
        action: StripsAction,
    },
    /// Show photo and strip counts and storage state
    Status,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum PhotosAction {
    /// List photos, newest first
    List,
    /// Delete one photo
    Delete { id: u64 },
    /// Delete all photos
    Clear,
    /// Write a photo to a PNG file
    Save {
        id: u64,
        /// Output file (default: gameboy-photo-<id>.png)
        path: Option<PathBuf>,
    },
    /// Export all photos to a JSON archive
    Export { path: PathBuf },
    /// Import photos from a JSON archive
    Import { path: PathBuf },
}

#[derive(Subcommand, Debug, Clone)]
pub enum StripsAction {
    /// List strips, newest first
    List,
    /// Compose a strip from 1 to 4 photo ids, top to bottom
    Create {
        #[arg(required = true, num_args = 1..=4)]
        ids: Vec<u64>,
    },
    /// Delete one strip
    Delete { id: u64 },
    /// Delete all strips
    Clear,
    /// Write a strip to a PNG file
    Save {
        id: u64,
        /// Output file (default: photostrip-<timestamp>.png)
        path: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Show current configuration
    Show,
    /// Create default config file
    Init,
}
