// Imgur image hosting
// API Documentation: https://apidocs.imgur.com/

use super::ImageHost;
use anyhow::{Context, Result};
use attohttpc::{MultipartBuilder, MultipartFile};
use serde::Deserialize;

const UPLOAD_URL: &str = "https://api.imgur.com/3/image";

#[derive(Debug, Deserialize)]
struct UploadResponse {
    data: UploadData,
    #[serde(default)]
    success: bool,
}

#[derive(Debug, Deserialize)]
struct UploadData {
    link: Option<String>,
    error: Option<serde_json::Value>,
}

pub struct Imgur {
    client_id: String,
}

impl Imgur {
    pub fn new(client_id: String) -> Self {
        Self { client_id }
    }
}

impl ImageHost for Imgur {
    fn upload(&self, image: &[u8], file_name: &str) -> Result<String> {
        log::debug!("Uploading {} ({} bytes) to Imgur", file_name, image.len());

        let file = MultipartFile::new("image", image).with_filename(file_name);
        let form = MultipartBuilder::new()
            .with_file(file)
            .build()
            .context("Failed to build Imgur upload form")?;

        let response = attohttpc::post(UPLOAD_URL)
            .header("Authorization", format!("Client-ID {}", self.client_id))
            .body(form)
            .send()
            .context("Failed to send request to Imgur")?;

        if !response.is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            anyhow::bail!("Imgur API error ({}): {}", status, body);
        }

        let parsed: UploadResponse = response.json().context("Failed to parse Imgur response")?;

        link_from(parsed)
    }
}

fn link_from(response: UploadResponse) -> Result<String> {
    if !response.success {
        anyhow::bail!(
            "Imgur rejected the upload: {}",
            response.data.error.unwrap_or_default()
        );
    }

    let link = response
        .data
        .link
        .context("Imgur response carried no link")?;

    log::info!("Uploaded album artwork to {}", link);

    Ok(link)
}
