pub mod client;
pub mod domain;
pub mod orchestrator;
pub mod storage;

pub mod config {
    use std::path::PathBuf;

    const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
    const DEFAULT_DATA_DIR: &str = ".pioni";

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub api_base_url: Option<String>,
        pub data_dir: Option<PathBuf>,
        pub sentry_dsn: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                api_base_url: std::env::var("PIONI_API_BASE_URL")
                    .ok()
                    .filter(|s| !s.trim().is_empty()),
                data_dir: std::env::var("PIONI_DATA_DIR")
                    .ok()
                    .filter(|s| !s.trim().is_empty())
                    .map(PathBuf::from),
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
            })
        }

        pub fn api_base_url(&self) -> &str {
            self.api_base_url.as_deref().unwrap_or(DEFAULT_API_BASE_URL)
        }

        pub fn data_dir(&self) -> PathBuf {
            self.data_dir
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
        }
    }
}
