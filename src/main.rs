//! Mediadeck - a local audio/video playlist player
//! Console front-end over a persistent media library

mod app;
mod audio;
mod database;
mod features;
mod library;
mod playback;
mod utils;

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use app::{App, Control, Message, Notice};
use audio::{RodioElement, open_output};
use features::import::ScanHandle;
use features::{DirectoryPicker, FixedPicker, RfdPicker, Settings, StorageBackend};
use playback::PlaybackController;

/// Action requested at launch
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LaunchAction {
    /// Scan for media when the library is empty
    Scan,
}

#[derive(Parser, Debug)]
#[command(name = "mediadeck", version, about = "Local audio/video playlist player")]
struct Cli {
    /// Run an action right after startup
    #[arg(long, value_enum)]
    action: Option<LaunchAction>,

    /// Directory to scan instead of asking with a folder dialog
    #[arg(long, value_name = "DIR")]
    scan_dir: Option<PathBuf>,

    /// Storage backend for the library
    #[arg(long, value_enum)]
    backend: Option<StorageBackend>,

    /// Where the library database and blobs live
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Settings file to use instead of the default location
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

/// Folder dialog, or a fixed directory given on the command line
enum Picker {
    Dialog(RfdPicker),
    Fixed(FixedPicker),
}

impl DirectoryPicker for Picker {
    async fn pick_directory(&mut self) -> Option<PathBuf> {
        match self {
            Picker::Dialog(picker) => picker.pick_directory().await,
            Picker::Fixed(picker) => picker.pick_directory().await,
        }
    }
}

/// Run `work`, cancelling any scan it starts when Ctrl-C arrives
async fn with_interrupt<F: Future>(handle: ScanHandle, work: F) -> F::Output {
    tokio::pin!(work);
    loop {
        tokio::select! {
            output = &mut work => return output,
            result = tokio::signal::ctrl_c() => {
                if result.is_ok() {
                    tracing::info!("Interrupted, cancelling scan");
                    handle.cancel();
                }
            }
        }
    }
}

fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{}", line);
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("mediadeck=info,sqlx=warn,warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut settings = match &cli.config {
        Some(path) => Settings::load_or_default(path),
        None => Settings::load(),
    };
    if let Some(backend) = cli.backend {
        settings.storage.backend = backend;
    }
    if let Some(dir) = &cli.data_dir {
        settings.storage.data_dir = Some(dir.clone());
    }

    let data_dir = settings
        .storage
        .data_dir
        .clone()
        .unwrap_or_else(utils::default_data_dir);
    let (library, notices) = app::helpers::open_library(&settings, &data_dir).await;

    // The stream must outlive both elements
    let stream = open_output();
    let mixer = stream.as_ref().map(|stream| stream.mixer().clone());
    let volume = settings.playback.volume;
    let player = PlaybackController::new(
        RodioElement::new("audio", mixer.clone(), volume),
        RodioElement::new("video", mixer, volume),
    );

    let picker = match &cli.scan_dir {
        Some(dir) => Picker::Fixed(FixedPicker::directory(dir.clone())),
        None => Picker::Dialog(RfdPicker),
    };

    let tick_interval = Duration::from_millis(settings.playback.tick_interval_ms);
    let mut app = App::new(library, player, picker, settings);

    if stream.is_none() {
        app.notify(Notice::error("No audio output device found. Playback is disabled."));
    }
    for notice in notices {
        app.notify(notice);
    }

    if cli.action == Some(LaunchAction::Scan) {
        with_interrupt(app.scan_handle(), app.launch_scan()).await;
    }
    app.update(Message::List).await;
    println!("Type 'help' for commands.");
    print_lines(app.take_output());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = tokio::time::interval(tick_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read from stdin")? else {
                    break;
                };
                match Message::parse(&line) {
                    Ok(Some(message)) => {
                        let control = with_interrupt(app.scan_handle(), app.update(message)).await;
                        print_lines(app.take_output());
                        if control == Control::Quit {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => println!("! {}", e),
                }
            }
            _ = ticker.tick() => {
                app.tick();
                print_lines(app.take_output());
            }
            result = tokio::signal::ctrl_c() => {
                result.context("Failed to listen for Ctrl-C")?;
                break;
            }
        }
    }

    tracing::info!("Shutting down");
    Ok(())
}
