//! Main application module
//!
//! Wires the library, the import pipeline and the playback controller
//! together, and turns console commands into calls on them. Output is queued
//! as text lines for the caller to print.

pub mod helpers;
mod message;
mod view;

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::watch;

use crate::audio::MediaElement;
use crate::database::MediaStore;
use crate::features::import::{
    BatchReport, ProgressReceiver, ProgressSender, ScanConfig, ScanHandle, ScanState, auto_scan,
    ingest_batch, progress_channel, scan_directory,
};
use crate::features::{DirectoryPicker, Settings};
use crate::library::{Library, LibrarySnapshot};
use crate::playback::{PlaybackController, PlaybackError, PlaybackStatus};

pub use message::{Control, Message, Notice};

/// What the status line last showed; progress alone does not trigger a redraw
type StatusKey = (
    crate::playback::SessionState,
    Option<crate::playback::NowPlaying>,
    bool,
);

pub struct App<S, E, P> {
    library: Library<S>,
    player: PlaybackController<E>,
    picker: P,
    settings: Settings,
    scan_state: Arc<ScanState>,
    progress_tx: ProgressSender,
    progress_rx: ProgressReceiver,
    library_rx: watch::Receiver<LibrarySnapshot>,
    status_rx: watch::Receiver<PlaybackStatus>,
    last_status: Option<StatusKey>,
    output: Vec<String>,
}

impl<S: MediaStore, E: MediaElement, P: DirectoryPicker> App<S, E, P> {
    pub fn new(
        library: Library<S>,
        mut player: PlaybackController<E>,
        picker: P,
        settings: Settings,
    ) -> Self {
        player.set_volume(settings.playback.volume);
        player.on_library_changed(library.entries());

        let (progress_tx, progress_rx) = progress_channel();
        let library_rx = library.subscribe();
        let status_rx = player.subscribe();

        Self {
            library,
            player,
            picker,
            settings,
            scan_state: Arc::new(ScanState::new()),
            progress_tx,
            progress_rx,
            library_rx,
            status_rx,
            last_status: None,
            output: Vec::new(),
        }
    }

    pub fn library(&self) -> &Library<S> {
        &self.library
    }

    pub fn player(&self) -> &PlaybackController<E> {
        &self.player
    }

    /// Handle that cancels whichever scan is running
    pub fn scan_handle(&self) -> ScanHandle {
        ScanHandle::new(self.scan_state.clone())
    }

    /// Lines rendered since the last call
    pub fn take_output(&mut self) -> Vec<String> {
        std::mem::take(&mut self.output)
    }

    pub fn notify(&mut self, notice: Notice) {
        if let Notice::Error(text) = &notice {
            tracing::debug!("User notice: {}", text);
        }
        self.output.push(view::render_notice(&notice));
    }

    /// Handle one console command
    pub async fn update(&mut self, message: Message) -> Control {
        match message {
            Message::AddFiles(paths) => self.add_files(paths).await,
            Message::Scan(dir) => self.scan(dir).await,
            Message::List => {
                self.render_playlist();
                self.last_status = None;
            }
            Message::Play(index) => {
                let result = self.player.play(self.library.entries(), index);
                self.report(result);
            }
            Message::Toggle => {
                let result = self.player.toggle(self.library.entries());
                self.report(result);
            }
            Message::Next => {
                let result = self.player.next(self.library.entries());
                self.report(result);
            }
            Message::Prev => {
                let result = self.player.prev(self.library.entries());
                self.report(result);
            }
            Message::Seek(fraction) => self.player.seek(fraction),
            Message::Remove(index) => self.remove(index).await,
            Message::Clear => self.clear().await,
            Message::Close => self.player.close(),
            Message::Help => self.output.push(view::HELP.to_string()),
            Message::Quit => return Control::Quit,
        }

        self.refresh();
        Control::Continue
    }

    /// Periodic tick from the event loop
    pub fn tick(&mut self) {
        let result = self.player.tick(self.library.entries());
        self.report(result);
        self.refresh();
    }

    /// Launch-time scan, re-prompting when the picker is dismissed
    pub async fn launch_scan(&mut self) {
        if !self.library.is_empty() {
            tracing::info!("Library not empty, skipping launch scan");
            return;
        }

        self.scan_state.rearm();
        let config = self.scan_config();
        let report = auto_scan(
            &mut self.library,
            &mut self.picker,
            self.settings.scan.auto_scan_attempts,
            &config,
            &self.scan_state,
            &self.progress_tx,
        )
        .await;

        self.drain_progress();
        if report.quota_exceeded {
            self.notify(quota_notice(report.imported));
        } else if report.imported == 0 && self.library.is_empty() {
            self.notify(Notice::info(
                "No media added. Use 'add <file>' or 'scan <dir>' to build your playlist.",
            ));
        }
        self.finish_batch();
        self.refresh();
    }

    async fn add_files(&mut self, paths: Vec<PathBuf>) {
        let (files, notices) = helpers::collect_files(&paths);
        for notice in notices {
            self.notify(notice);
        }
        if files.is_empty() {
            return;
        }

        self.output.push(format!("Adding {} file(s)...", files.len()));
        let report = ingest_batch(&mut self.library, files).await;
        self.report_batch(&report);
        self.finish_batch();
    }

    async fn scan(&mut self, dir: Option<PathBuf>) {
        let root = match dir {
            Some(dir) => dir,
            None => match self.picker.pick_directory().await {
                Some(dir) => dir,
                None => {
                    self.notify(Notice::info("Scan cancelled"));
                    return;
                }
            },
        };

        self.scan_state.rearm();
        let config = self.scan_config();
        let result = scan_directory(
            &mut self.library,
            root,
            &config,
            &self.scan_state,
            &self.progress_tx,
        )
        .await;
        self.drain_progress();

        match result {
            Ok(summary) if summary.quota_exceeded => self.notify(quota_notice(summary.imported)),
            Ok(_) => {}
            Err(e) => self.notify(Notice::error(format!("Scan failed: {}", e))),
        }
        self.finish_batch();
    }

    async fn remove(&mut self, index: usize) {
        match self.library.remove_at(index).await {
            Ok(Some(entry)) => {
                self.player.on_entry_removed(self.library.entries(), index);
                self.notify(Notice::info(format!("Removed {}", entry.name)));
            }
            Ok(None) => {}
            Err(e) => {
                tracing::error!("Failed to remove entry: {}", e);
                self.notify(Notice::error(format!("Could not remove entry: {}", e)));
            }
        }
    }

    async fn clear(&mut self) {
        match self.library.clear().await {
            Ok(()) => self.player.on_cleared(),
            Err(e) => {
                tracing::error!("Failed to clear library: {}", e);
                self.notify(Notice::error(format!("Could not clear playlist: {}", e)));
            }
        }
    }

    fn scan_config(&self) -> ScanConfig {
        ScanConfig::with_max_depth(self.settings.scan.max_depth)
    }

    fn report_batch(&mut self, report: &BatchReport) {
        if report.quota_exceeded {
            self.notify(quota_notice(report.added));
        }
        if report.unreadable + report.failed > 0 {
            self.notify(Notice::error(format!(
                "{} file(s) could not be added",
                report.unreadable + report.failed
            )));
        }
        tracing::info!(
            added = report.added,
            duplicates = report.duplicates,
            not_attempted = report.not_attempted,
            "Batch finished"
        );
    }

    /// After a selection or scan: sync the controller and start the first item
    fn finish_batch(&mut self) {
        self.player.on_library_changed(self.library.entries());
        let result = self.player.autoplay_first(self.library.entries()).map(|_| ());
        self.report(result);
    }

    fn report(&mut self, result: Result<(), PlaybackError>) {
        match result {
            Ok(()) => {}
            Err(e) if e.is_silent() => {}
            Err(e) => self.notify(Notice::error(e.to_string())),
        }
    }

    fn drain_progress(&mut self) {
        while let Ok(progress) = self.progress_rx.try_recv() {
            if let Some(line) = view::render_progress(&progress) {
                self.output.push(line);
            }
        }
    }

    fn render_playlist(&mut self) {
        let snapshot = self.library_rx.borrow_and_update().clone();
        let status = self.status_rx.borrow().clone();
        self.output.push(view::render_playlist(&snapshot, &status));
    }

    /// Redraw whatever changed since the last command
    fn refresh(&mut self) {
        if self.library_rx.has_changed().unwrap_or(false) {
            self.render_playlist();
        }

        let status = self.status_rx.borrow_and_update().clone();
        let key = (status.state, status.now_playing.clone(), status.player_visible);
        if self.last_status.as_ref() != Some(&key) {
            self.output.push(view::render_status(&status));
            self.last_status = Some(key);
        }
    }
}

fn quota_notice(added: usize) -> Notice {
    Notice::error(format!(
        "Storage full after adding {} file(s). Remove some songs to make room.",
        added
    ))
}
