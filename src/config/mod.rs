mod settings;

pub use settings::{
    EnrichConfig, Settings, StorageConfig, WatchConfig, WatchSource, load_settings,
    parse_watch_sources,
};
