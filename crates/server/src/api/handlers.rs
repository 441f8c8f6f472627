pub mod danmu;
pub mod scrapers;
pub mod settings;
pub mod webhook;

pub use danmu::{download_danmu, search_danmu};
pub use scrapers::list_scrapers;
pub use settings::{get_settings, reset_settings, update_settings};
pub use webhook::library_webhook;
