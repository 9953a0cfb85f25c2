use docqa::Settings;
use reqwest::Client;

pub struct AppState {
    pub settings: Settings,
    pub client: Client,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            client: Client::new(),
        }
    }

    /// The key typed into the page wins over the configured fallback.
    pub fn resolve_api_key(&self, submitted: Option<&str>) -> Option<String> {
        submitted
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(str::to_string)
            .or_else(|| self.settings.api_key.clone())
    }
}
