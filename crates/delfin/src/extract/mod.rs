//! Record extraction: image in, candidate order out.
//!
//! The extractor sends the image and a fixed instruction to a multimodal
//! model, then parses whatever JSON object it finds in the reply. Missing
//! fields never fail extraction; they are defaulted.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, info_span, Instrument};

use crate::order::{NewOrder, DATE_FORMAT};

pub mod gemini;
pub mod image;
pub mod parse;

pub use gemini::{GeminiClient, GeminiConfig};
pub use image::CapturedImage;
pub use parse::{find_json_object, parse_reply};

/// Instruction sent with every image.
pub const PROMPT: &str = "Analiza esta imagen de un pedido y extrae la siguiente información en formato JSON:
{
  \"clientName\": \"nombre del cliente\",
  \"clientNumber\": \"número de cliente\",
  \"orderNumber\": \"número de pedido\",
  \"date\": \"fecha en formato YYYY-MM-DD\",
  \"referenceNumber\": \"número de referencia del producto\",
  \"denomination\": \"denominación o descripción del producto\",
  \"quantityMeters\": \"cantidad en metros lineales (solo el número)\",
  \"status\": \"pendiente\",
  \"notes\": \"notas adicionales si las hay\"
}

Si no puedes encontrar algún campo, usa valores por defecto razonables. Responde SOLO con el JSON, sin texto adicional.";

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("API error ({status}): {message}")]
    Upstream { status: u16, message: String },

    #[error("The model returned no text")]
    EmptyResponse,

    #[error("No se pudo extraer JSON de la respuesta")]
    NoJsonObject,

    #[error("Invalid JSON in model reply: {0}")]
    InvalidJson(String),

    #[error("Unsupported file type '{mime_type}': only images are accepted")]
    UnsupportedImage { mime_type: String },

    #[error("Image is empty")]
    EmptyImage,

    #[error("Failed to read image '{path}': {source}")]
    ReadImage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A multimodal model that answers an instruction about an image.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Returns the reply text for `prompt` applied to `image`.
    async fn generate(&self, prompt: &str, image: &CapturedImage)
        -> Result<String, ExtractionError>;

    /// Model identifier, for logs.
    fn model_name(&self) -> &str;
}

/// Turns images into candidate orders.
#[derive(Clone)]
pub struct OrderExtractor {
    client: Arc<dyn InferenceClient>,
}

impl OrderExtractor {
    pub fn new(client: Arc<dyn InferenceClient>) -> Self {
        Self { client }
    }

    /// Extracts a candidate from `image`. Dates default to `today`.
    pub async fn extract(
        &self,
        image: &CapturedImage,
        today: NaiveDate,
    ) -> Result<NewOrder, ExtractionError> {
        let span = info_span!(
            "extract",
            model = self.client.model_name(),
            image = %image.reference(),
            mime_type = %image.mime_type(),
        );

        async {
            let reply = self.client.generate(PROMPT, image).await?;
            debug!(reply_len = reply.len(), "model replied");

            let mut candidate = parse_reply(&reply, today)?;
            candidate.image_data = Some(image.reference().to_string());
            Ok(candidate)
        }
        .instrument(span)
        .await
    }
}

/// A fixed, valid candidate produced without calling the model.
pub fn example_order(today: NaiveDate) -> NewOrder {
    NewOrder {
        order_number: "PED-2024-001".to_string(),
        client_name: "Empresa Ejemplo S.L.".to_string(),
        client_number: "CLI-12345".to_string(),
        reference_number: "REF-ABC-789".to_string(),
        denomination: "Perfil de Aluminio Premium".to_string(),
        notes: "Entrega urgente - Cliente preferente".to_string(),
        date: today.format(DATE_FORMAT).to_string(),
        quantity_meters: 125.5,
        status: crate::order::STATUS_PENDING.to_string(),
        image_data: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct CannedClient {
        reply: Option<String>,
        prompts: Mutex<Vec<String>>,
    }

    impl CannedClient {
        fn replying(text: &str) -> Self {
            Self {
                reply: Some(text.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl InferenceClient for CannedClient {
        async fn generate(
            &self,
            prompt: &str,
            _image: &CapturedImage,
        ) -> Result<String, ExtractionError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.reply.clone().ok_or(ExtractionError::EmptyResponse)
        }

        fn model_name(&self) -> &str {
            "canned"
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 14).unwrap()
    }

    fn image() -> CapturedImage {
        CapturedImage::from_bytes(vec![1, 2, 3], "image/png", "foto.png").unwrap()
    }

    #[tokio::test]
    async fn test_extract_sends_fixed_prompt_and_keeps_image_reference() {
        let client = Arc::new(CannedClient::replying(
            "Claro: {\"orderNumber\": \"PED-7\", \"quantityMeters\": \"12.5\"}",
        ));
        let extractor = OrderExtractor::new(client.clone());

        let candidate = extractor.extract(&image(), today()).await.unwrap();
        assert_eq!(candidate.order_number, "PED-7");
        assert_eq!(candidate.quantity_meters, 12.5);
        assert_eq!(candidate.date, "2026-03-14");
        assert_eq!(candidate.image_data.as_deref(), Some("foto.png"));
        assert_eq!(client.prompts.lock().unwrap().as_slice(), &[PROMPT.to_string()]);
    }

    #[tokio::test]
    async fn test_extract_without_json_fails() {
        let extractor = OrderExtractor::new(Arc::new(CannedClient::replying("no veo nada")));
        let err = extractor.extract(&image(), today()).await.unwrap_err();
        assert!(matches!(err, ExtractionError::NoJsonObject));
    }

    #[tokio::test]
    async fn test_client_error_propagates() {
        let client = CannedClient {
            reply: None,
            prompts: Mutex::new(Vec::new()),
        };
        let extractor = OrderExtractor::new(Arc::new(client));
        let err = extractor.extract(&image(), today()).await.unwrap_err();
        assert!(matches!(err, ExtractionError::EmptyResponse));
    }

    #[test]
    fn test_prompt_lists_every_field() {
        for field in [
            "clientName",
            "clientNumber",
            "orderNumber",
            "date",
            "referenceNumber",
            "denomination",
            "quantityMeters",
            "status",
            "notes",
        ] {
            assert!(PROMPT.contains(&format!("\"{}\"", field)), "missing {}", field);
        }
        assert!(!PROMPT.contains("\"id\""));
        assert!(!PROMPT.contains("timestamp"));
    }

    #[test]
    fn test_example_order() {
        let order = example_order(today());
        assert_eq!(order.client_name, "Empresa Ejemplo S.L.");
        assert_eq!(order.order_number, "PED-2024-001");
        assert_eq!(order.date, "2026-03-14");
        assert_eq!(order.quantity_meters, 125.5);
        assert_eq!(order.status, "pendiente");
        assert_eq!(order.clone().normalized(today()), order);
    }
}
