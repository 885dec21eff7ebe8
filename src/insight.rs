use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Trade;

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const DEFAULT_MODEL: &str = "gemini-1.5-flash";

#[derive(Error, Debug)]
pub enum InsightError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid API response: {0}")]
    Parse(String),

    #[error("insight API error: {code} - {message}")]
    Api { code: u16, message: String },
}

/// Opaque insight generator: consumes a trade, returns review text. The
/// result may be written back into the trade's notes.
#[async_trait]
pub trait InsightGenerator: Send + Sync {
    async fn generate(&self, trade: &Trade) -> Result<String, InsightError>;
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

/// Gemini-backed insight generator.
pub struct GeminiClient {
    http_client: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            api_key,
            model: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }
}

/// Short Portuguese summary of the trade for the prompt.
fn build_prompt(trade: &Trade) -> String {
    format!(
        "Você é um mentor de trading. Analise em até três frases o seguinte \
         trade de mini-dólar e aponte um acerto e um ponto de atenção.\n\
         Ativo: {} | Lado: {} | Data: {}\n\
         Contratos: {} | Entrada: {} | Saída: {}\n\
         Pontos: {} | Resultado: R$ {}\n\
         Região: {} | Estrutura: {} | Gatilho: {}",
        trade.asset,
        trade.side,
        trade.date,
        trade.lots,
        trade.entry_price,
        trade.exit_price,
        trade.points,
        trade.result,
        trade.region,
        trade.structure,
        trade.trigger,
    )
}

#[async_trait]
impl InsightGenerator for GeminiClient {
    async fn generate(&self, trade: &Trade) -> Result<String, InsightError> {
        let url = format!(
            "{}/{}:generateContent?key={}",
            GEMINI_API_URL, self.model, self.api_key
        );

        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: build_prompt(trade),
                }],
            }],
        };

        let response = self.http_client.post(&url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(InsightError::Api {
                code: status.as_u16(),
                message,
            });
        }

        let parsed: GenerateResponse = response.json().await?;
        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| InsightError::Parse("empty response from generator".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Side;

    #[test]
    fn prompt_carries_the_trade_fields() {
        let trade = Trade {
            id: 1,
            trade_number: 1,
            asset: "WDOFUT".to_string(),
            side: Side::Sell,
            date: "2024-03-11".to_string(),
            lots: 2.0,
            entry_price: 5432.5,
            exit_price: 5430.0,
            points: 2.5,
            result: 50.0,
            notes: String::new(),
            region: "Resistência".to_string(),
            structure: "Reversão".to_string(),
            trigger: "Engolfo".to_string(),
        };
        let prompt = build_prompt(&trade);
        assert!(prompt.contains("WDOFUT"));
        assert!(prompt.contains("Venda"));
        assert!(prompt.contains("5432.5"));
        assert!(prompt.contains("Engolfo"));
    }

    #[test]
    fn response_envelope_deserializes() {
        let json = r#"{"candidates":[{"content":{"parts":[{"text":"Bom trade."}]}}]}"#;
        let parsed: GenerateResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.candidates[0].content.parts[0].text, "Bom trade.");
    }
}
