pub mod settings;

pub use settings::{
    AppSettings, CacheSettings, CodeforcesSettings, RetrySettings, ServerSettings, Settings,
};
