use std::time::Duration;

use crate::config::HttpSettings;
use crate::Result;

/// One client per run, shared by feed fetching and article extraction.
pub fn build_client(settings: &HttpSettings) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(settings.user_agent.as_str())
        .timeout(Duration::from_secs(settings.timeout_secs))
        .build()?;
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_client_with_defaults() {
        assert!(build_client(&HttpSettings::default()).is_ok());
    }
}
