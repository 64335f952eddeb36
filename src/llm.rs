use crate::regional::RegionStats;
use crate::scoring::RiskTier;
use serde::{Deserialize, Serialize};

const DEFAULT_ENDPOINT: &str = "https://api.groq.com/openai/v1/chat/completions";
const DEFAULT_MODEL: &str = "llama3-8b-8192";

/// Thin client for the optional chat-completion enhancement.
///
/// No timeout is applied beyond the transport default; callers that need a
/// bound must provide their own. Failures here never propagate past the
/// explanation boundary.
#[derive(Debug, Clone)]
pub struct LlmClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl LlmClient {
    pub fn new(api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }

    /// Send one prompt and return the assistant's reply.
    pub async fn chat(&self, prompt: &str) -> Result<String, LlmError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: "You are a helpful assistant that assesses loan risks.".to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: prompt.to_string(),
                },
            ],
        };

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?
            .error_for_status()?;

        let body: ChatResponse = response.json().await?;
        body.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or(LlmError::EmptyResponse)
    }
}

/// Prompt handed to the model when enhancing an explanation.
pub fn explanation_prompt(
    name: &str,
    region: &str,
    loan_amount: f64,
    repayment_rate: f64,
    stats: &RegionStats,
    score: f64,
    tier: RiskTier,
) -> String {
    let unemployment = stats.unemployment_rate.unwrap_or(0.0);
    let income = stats.avg_income.unwrap_or(0.0);
    format!(
        "Explain why this microloan application received a {tier} risk rating:\n\
         \n\
         Borrower: {name}\n\
         Region: {region}\n\
         Loan Amount: ${loan_amount}\n\
         Repayment History Score: {repayment_rate}\n\
         Regional Unemployment: {:.1}%\n\
         Regional Average Income: ${income}\n\
         \n\
         Calculated Risk Score: {score:.3}\n\
         Risk Classification: {tier}\n\
         \n\
         Provide a clear, concise explanation suitable for loan officers.",
        unemployment * 100.0
    )
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("chat completion request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("chat completion response contained no choices")]
    EmptyResponse,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_carries_assessment_context() {
        let stats = RegionStats::new(0.18, 150.0);
        let prompt = explanation_prompt(
            "James Cooper",
            "Bong",
            1200.0,
            0.9,
            &stats,
            0.822,
            RiskTier::High,
        );

        assert!(prompt.contains("James Cooper"));
        assert!(prompt.contains("Region: Bong"));
        assert!(prompt.contains("Loan Amount: $1200"));
        assert!(prompt.contains("Regional Unemployment: 18.0%"));
        assert!(prompt.contains("Calculated Risk Score: 0.822"));
        assert!(prompt.contains("High risk rating"));
    }

    #[tokio::test]
    async fn unreachable_endpoint_surfaces_transport_error() {
        // Reserved port with nothing listening; the connection is refused
        // without leaving the host.
        let client = LlmClient::new("test-key".to_string()).with_endpoint("http://127.0.0.1:1/v1");
        let err = client.chat("explain").await.expect_err("must fail");
        assert!(matches!(err, LlmError::Transport(_)));
    }
}
