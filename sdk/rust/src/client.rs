use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

pub type Error = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Serialize, Deserialize)]
struct ControlValue<T> {
    value: T,
}

/// Client for a blocking proxy's control commands.
#[derive(Debug, Clone)]
pub struct ProxyClient {
    client: Client,
    proxy_url: String,
}

impl ProxyClient {
    /// `proxy_url` is the proxy's base address, e.g. `http://localhost:8111`.
    pub fn new(proxy_url: &str) -> Self {
        Self {
            client: Client::new(),
            proxy_url: proxy_url.trim_end_matches('/').to_string(),
        }
    }

    fn command_url(&self, command: &str) -> String {
        format!("{}/stabilize_proxy/{}", self.proxy_url, command)
    }

    async fn get<T: for<'de> Deserialize<'de>>(&self, command: &str) -> Result<T, Error> {
        let resp = self.client.get(self.command_url(command)).send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        if status != StatusCode::OK {
            return Err(format!("Proxy returned error status {}: {}", status, text).into());
        }
        let body: ControlValue<T> = serde_json::from_str(&text)?;
        Ok(body.value)
    }

    async fn set<T: Serialize>(&self, command: &str, value: T) -> Result<(), Error> {
        let resp = self
            .client
            .post(self.command_url(command))
            .json(&ControlValue { value })
            .send()
            .await?;
        let status = resp.status();

        if status != StatusCode::OK {
            let text = resp.text().await.unwrap_or_default();
            return Err(format!("Proxy returned error status {}: {}", status, text).into());
        }
        Ok(())
    }

    /// Turn waiting for page stability on or off.
    pub async fn set_synchronization(&self, enabled: bool) -> Result<(), Error> {
        self.set("enabled", enabled).await
    }

    /// Whether the proxy currently waits for page stability.
    pub async fn is_sync_enabled(&self) -> Result<bool, Error> {
        self.get("enabled").await
    }

    /// The WebDriver server the proxy forwards to.
    pub async fn selenium_address(&self) -> Result<String, Error> {
        self.get("selenium_address").await
    }

    /// Point the proxy at a different WebDriver server. Commands already in
    /// flight finish against the old one.
    pub async fn set_selenium_address(&self, address: &str) -> Result<(), Error> {
        self.set("selenium_address", address).await
    }
}
