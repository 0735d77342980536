//! `ApiImageSynthesizer`: backgrounds from an OpenAI-compatible
//! `/images/generations` endpoint.
//!
//! Images are requested as base64 JSON so no second download is needed.
//! The endpoint only accepts a few fixed sizes; the frame's aspect ratio picks
//! the closest one and the video stage scales it to the frame.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use base64::Engine;

use super::{check_status, http_client, with_auth, ImageSynthesizer, ProviderError};
use crate::config::ImageConfig;

/// Sizes accepted by `dall-e-3`.
const SUPPORTED_SIZES: [(u32, u32); 3] = [(1024, 1024), (1792, 1024), (1024, 1792)];

pub struct ApiImageSynthesizer {
    client: reqwest::Client,
    config: ImageConfig,
    image_dir: PathBuf,
}

impl ApiImageSynthesizer {
    /// Images are written into `image_dir`.
    pub fn from_config(config: &ImageConfig, image_dir: &Path) -> Self {
        Self {
            client: http_client(config.timeout_secs),
            config: config.clone(),
            image_dir: image_dir.to_path_buf(),
        }
    }

    fn styled_prompt(&self, prompt: &str) -> String {
        let suffix = self.config.style_suffix.trim();
        if suffix.is_empty() {
            prompt.trim().to_string()
        } else {
            format!("{}, {suffix}", prompt.trim().trim_end_matches(&['.', ','][..]))
        }
    }

    /// `config.size` when set, else the supported size whose aspect ratio is
    /// closest to `width`×`height`.
    fn api_size(&self, width: u32, height: u32) -> String {
        let configured = self.config.size.trim();
        if !configured.is_empty() {
            return configured.to_string();
        }
        let ratio = |w: u32, h: u32| (f64::from(w.max(1)) / f64::from(h.max(1))).ln();
        let target = ratio(width, height);
        let (w, h) = SUPPORTED_SIZES
            .iter()
            .copied()
            .min_by(|a, b| {
                let da = (ratio(a.0, a.1) - target).abs();
                let db = (ratio(b.0, b.1) - target).abs();
                da.total_cmp(&db)
            })
            .unwrap_or(SUPPORTED_SIZES[0]);
        format!("{w}x{h}")
    }

    fn request_body(&self, prompt: &str, width: u32, height: u32) -> serde_json::Value {
        serde_json::json!({
            "model": self.config.model,
            "prompt": self.styled_prompt(prompt),
            "n": 1,
            "size": self.api_size(width, height),
            "response_format": "b64_json",
        })
    }
}

/// Decode `data[0].b64_json` from an image-generation response.
fn decode_image(json: &serde_json::Value) -> Result<Vec<u8>, ProviderError> {
    let encoded = json["data"][0]["b64_json"]
        .as_str()
        .ok_or(ProviderError::EmptyResponse)?;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| ProviderError::Parse(format!("invalid base64 image: {e}")))?;
    if bytes.is_empty() {
        return Err(ProviderError::EmptyResponse);
    }
    Ok(bytes)
}

#[async_trait]
impl ImageSynthesizer for ApiImageSynthesizer {
    async fn synthesize(
        &self,
        prompt: &str,
        output_name: &str,
        width: u32,
        height: u32,
    ) -> Result<PathBuf, ProviderError> {
        let url = format!("{}/images/generations", self.config.base_url.trim_end_matches('/'));
        let body = self.request_body(prompt, width, height);
        log::info!(
            "image: generating {} background for a {width}x{height} frame: {}",
            body["size"],
            body["prompt"]
        );

        let req = self.client.post(&url).json(&body);
        let response = with_auth(req, self.config.api_key.as_deref()).send().await?;
        let response = check_status(response).await?;

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;
        let bytes = decode_image(&json)?;

        tokio::fs::create_dir_all(&self.image_dir).await?;
        let path = self.image_dir.join(output_name);
        tokio::fs::write(&path, &bytes).await?;

        log::info!("image: saved {}", path.display());
        Ok(path)
    }
}
