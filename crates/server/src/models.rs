mod danmu;
mod settings;

pub use danmu::{
    DanmuCandidate, DanmuSearchQuery, DownloadDanmuRequest, ForceAck, ForceStatus, ScraperInfo,
};
pub use settings::{
    AssSettings, DanmuApiSettings, DownloadSettings, Settings, UpdateAssSettings,
    UpdateDanmuApiSettings, UpdateDownloadSettings, UpdateSettings,
};
