//! Gateway backed by the Gemini `generateContent` REST endpoint.
//!
//! One blocking POST per operation. The credential is resolved before
//! anything else so a missing key never produces network traffic, and the
//! first inline image part of the answer is the result.

use crate::fetch::{normalize, HttpImageFetcher, ImageFetcher};
use crate::image_ref::{truncate, ImageRef};
use crate::{Error, ImageGateway, Result, StudioConfig};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart {
    Text {
        text: String,
    },
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: Blob,
    },
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Blob {
    #[serde(alias = "mime_type", default)]
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: Vec<&'static str>,
    image_config: ImageConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageConfig {
    aspect_ratio: String,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Default, Deserialize)]
struct ResponsePart {
    #[serde(rename = "inlineData", alias = "inline_data", default)]
    inline_data: Option<Blob>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

fn background_prompt(topic: &str, style: &str) -> String {
    format!(
        "Generate a professional high-quality advertising poster background for a business. \
The topic is: \"{topic}\". \
The style should be: {style}. \
The background should be clean, leaving space for text overlays. \
Include abstract tech elements, friendly 3D AI characters or smooth customer service interfaces. \
NO TEXT in the image itself. High resolution, 4k aesthetic."
    )
}

fn edit_prompt(instruction: &str) -> String {
    format!(
        "You are a professional graphic designer. \
Modify this image strictly following this instruction: \"{instruction}\". \
Preserve the general layout but apply the requested changes in style, color, lighting or elements. \
Ensure the result looks high-end and suitable for a business advertisement."
    )
}

/// Gemini-backed [`ImageGateway`]
pub struct GeminiGateway {
    client: Client,
    config: StudioConfig,
    fetcher: Box<dyn ImageFetcher>,
}

impl GeminiGateway {
    pub fn new(config: StudioConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| Error::Other(format!("Failed to build HTTP client: {}", e)))?;
        let fetcher = HttpImageFetcher::with_client(client.clone(), config.user_agent.clone());
        Ok(Self {
            client,
            config,
            fetcher: Box::new(fetcher),
        })
    }

    /// Replace the fetcher used to normalize remote images before an edit
    pub fn with_fetcher(mut self, fetcher: Box<dyn ImageFetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn config(&self) -> &StudioConfig {
        &self.config
    }

    fn endpoint_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model
        )
    }

    fn request(&self, parts: Vec<RequestPart>) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content { parts }],
            generation_config: GenerationConfig {
                response_modalities: vec!["TEXT", "IMAGE"],
                image_config: ImageConfig {
                    aspect_ratio: self.config.aspect_ratio.clone(),
                },
            },
        }
    }

    fn send(&self, api_key: &str, body: &GenerateContentRequest) -> Result<Option<ImageRef>> {
        let url = self.endpoint_url();
        log::debug!("POST {} (model {})", url, self.config.model);

        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .header("User-Agent", self.config.user_agent.clone())
            .json(body)
            .send()
            .map_err(|e| {
                log::warn!("image service request failed: {}", e);
                Error::UpstreamError(e.to_string())
            })?;

        let status = resp.status();
        let text = resp
            .text()
            .map_err(|e| Error::UpstreamError(format!("No se pudo leer la respuesta: {}", e)))?;

        if !status.is_success() {
            let detail = serde_json::from_str::<ErrorEnvelope>(&text)
                .map(|env| env.error.message)
                .ok()
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| truncate(text.trim(), 200));
            log::warn!("image service returned HTTP {}: {}", status, detail);
            return Err(Error::UpstreamError(format!(
                "HTTP {}: {}",
                status.as_u16(),
                detail
            )));
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&text)
            .map_err(|e| Error::UpstreamError(format!("Respuesta con formato inválido: {}", e)))?;
        first_inline_image(parsed)
    }
}

/// Scan the first candidate for an inline image part and re-tag it as PNG.
fn first_inline_image(resp: GenerateContentResponse) -> Result<Option<ImageRef>> {
    let parts = resp
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts)
        .unwrap_or_default();

    for part in parts {
        if let Some(blob) = part.inline_data {
            let data = BASE64
                .decode(blob.data.trim())
                .map_err(|e| Error::UpstreamError(format!("La imagen recibida no es base64 válido: {}", e)))?;
            return Ok(Some(ImageRef::inline_png(data)));
        }
    }
    log::debug!("image service answered without an image part");
    Ok(None)
}

impl ImageGateway for GeminiGateway {
    fn generate_background(&self, topic: &str, style: &str) -> Result<Option<ImageRef>> {
        let api_key = self.config.resolve_api_key()?;
        let prompt = background_prompt(topic, style);
        log::debug!("generating background ({} prompt chars)", prompt.len());
        let body = self.request(vec![RequestPart::Text { text: prompt }]);
        self.send(&api_key, &body)
    }

    fn edit_image(&self, current: &ImageRef, instruction: &str) -> Result<Option<ImageRef>> {
        let api_key = self.config.resolve_api_key()?;
        let source = normalize(current, self.fetcher.as_ref())?;
        log::debug!(
            "editing image ({} bytes, {}) with instruction of {} chars",
            source.data.len(),
            source.mime_type,
            instruction.len()
        );
        let body = self.request(vec![
            RequestPart::Inline {
                inline_data: Blob {
                    mime_type: source.mime_type,
                    data: BASE64.encode(&source.data),
                },
            },
            RequestPart::Text {
                text: edit_prompt(instruction),
            },
        ]);
        self.send(&api_key, &body)
    }
}
