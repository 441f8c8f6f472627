mod ass_renderer;
mod library_events;
mod settings;
mod subtitle;

pub use ass_renderer::AssRenderer;
pub use library_events::{
    start_library_events, AssOptions, DanmuDownloader, DanmuRenderer, DownloadError,
    DownloadOutcome, EngineOptions, LibraryEventsHandle, ReconcileError, Reconciler,
    SettingsProvider, FETCHER_NAME,
};
pub use settings::{SettingsError, SettingsService};
pub use subtitle::{DanmuService, DanmuServiceError, DEFAULT_FORCE_WAIT};
