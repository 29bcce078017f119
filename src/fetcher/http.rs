use super::{ImageSource, TransportError};
use crate::error::Result;
use reqwest::blocking::Client;
use std::time::Duration;

/// HTTP GET で画像を取得する
pub struct HttpSource {
    client: Client,
}

impl HttpSource {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("order-enricher/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

impl ImageSource for HttpSource {
    fn get(&self, url: &str) -> std::result::Result<Vec<u8>, TransportError> {
        let response = self.client.get(url).send().map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        let bytes = response.bytes().map_err(classify)?;
        Ok(bytes.to_vec())
    }
}

fn classify(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout(error.to_string())
    } else if error.is_connect() {
        TransportError::Connect(error.to_string())
    } else {
        TransportError::Other(error.to_string())
    }
}
