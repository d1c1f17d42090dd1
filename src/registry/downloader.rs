use std::fs::File;
use std::path::Path;

use reqwest::blocking::Client;
use reqwest::Proxy;

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::registry::Downloader;

/// Blocking HTTP(S) transport for dataset downloads.
///
/// No client-side timeout is configured: a stalled transfer blocks the caller
/// until the connection drops. Callers wanting a bound impose it externally.
pub struct HttpDownloader {
    client: Client,
    proxy_client: Option<Client>,
}

impl HttpDownloader {
    pub fn new(proxy_url: Option<&str>) -> Result<Self> {
        let client = Client::builder()
            .timeout(None)
            .build()
            .map_err(|e| Error::Transport(e.to_string()))?;

        let proxy_client = match proxy_url {
            Some(url) => {
                let proxy = Proxy::all(url).map_err(|e| Error::Transport(e.to_string()))?;
                Some(
                    Client::builder()
                        .timeout(None)
                        .proxy(proxy)
                        .build()
                        .map_err(|e| Error::Transport(e.to_string()))?,
                )
            }
            None => None,
        };

        Ok(HttpDownloader {
            client,
            proxy_client,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(settings.proxy_url.as_deref())
    }
}

impl Downloader for HttpDownloader {
    fn fetch_file(&self, url: &str, destination: &Path, use_proxy: bool) -> Result<()> {
        let client = if use_proxy {
            self.proxy_client.as_ref().unwrap_or(&self.client)
        } else {
            &self.client
        };

        let mut response = client
            .get(url)
            .send()
            .map_err(|e| Error::Transport(format!("GET {}: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(Error::Transport(format!(
                "GET {} returned {}",
                url,
                response.status()
            )));
        }

        let mut file = File::create(destination)?;
        response
            .copy_to(&mut file)
            .map_err(|e| Error::Transport(format!("GET {}: {}", url, e)))?;
        Ok(())
    }
}
