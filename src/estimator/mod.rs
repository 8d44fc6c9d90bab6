use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Deserialize;
use thiserror::Error;

use crate::config::EstimatorConfig;
use crate::nutrition::{Macros, MAX_COMPONENT_G};

pub mod retry;

#[derive(Debug, Error)]
pub enum EstimatorError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("estimator api error: {0}")]
    Api(String),

    #[error("estimate parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("implausible estimate: {0}")]
    Implausible(String),
}

/// External nutrition estimation call. One attempt per invocation; retry policy
/// lives in [`retry`].
#[async_trait]
pub trait NutritionEstimator: Send + Sync {
    async fn estimate(&self, image: &[u8]) -> Result<Macros, EstimatorError>;
}

const ANALYSIS_PROMPT: &str = "Analyze the food shown in the image and return a JSON object \
containing the amounts of protein (in grams), carbohydrates (in grams), and fat (in grams). \
Be as accurate as possible and only return the nutritional information in the specified format.";

/// Vision chat-completions client for an OpenAI-compatible API.
pub struct OpenAiEstimator {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiEstimator {
    pub fn new(cfg: &EstimatorConfig) -> Result<Self, EstimatorError> {
        Self::with_base_url(
            &cfg.api_key,
            &cfg.model,
            Duration::from_secs(cfg.request_timeout_secs),
            &cfg.base_url,
        )
    }

    /// Constructor with an explicit base URL so tests can point at a mock server.
    pub fn with_base_url(
        api_key: &str,
        model: &str,
        request_timeout: Duration,
        base_url: &str,
    ) -> Result<Self, EstimatorError> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            http,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct RawEstimate {
    protein: f64,
    carbohydrates: f64,
    fat: f64,
}

impl RawEstimate {
    /// Rounds to whole grams, rejecting components outside `0..=MAX_COMPONENT_G`
    /// so a hallucinated figure never enters the accounting.
    fn rounded(&self) -> Result<Macros, EstimatorError> {
        fn component(name: &str, value: f64) -> Result<i32, EstimatorError> {
            let grams = value.round();
            if !(0.0..=MAX_COMPONENT_G as f64).contains(&grams) {
                return Err(EstimatorError::Implausible(format!("{name} {value} g")));
            }
            Ok(grams as i32)
        }
        Ok(Macros::new(
            component("protein", self.protein)?,
            component("carbohydrates", self.carbohydrates)?,
            component("fat", self.fat)?,
        ))
    }
}

#[async_trait]
impl NutritionEstimator for OpenAiEstimator {
    async fn estimate(&self, image: &[u8]) -> Result<Macros, EstimatorError> {
        let encoded = BASE64.encode(image);
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": ANALYSIS_PROMPT },
                    {
                        "type": "image_url",
                        "image_url": { "url": format!("data:image/jpeg;base64,{encoded}") }
                    },
                ],
            }],
            "max_tokens": 300,
            "response_format": { "type": "json_object" },
        });

        let url = format!("{}/chat/completions", self.base_url);
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            return Err(EstimatorError::Api(format!("status {status}: {detail}")));
        }

        let completion: ChatCompletion = resp.json().await?;
        let content = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| EstimatorError::Api("completion contained no choices".into()))?
            .message
            .content;

        let raw: RawEstimate = serde_json::from_str(&content)?;
        raw.rounded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_estimator(base_url: &str) -> OpenAiEstimator {
        OpenAiEstimator::with_base_url("test-key", "gpt-4o", Duration::from_secs(5), base_url)
            .expect("client construction should not fail")
    }

    fn completion_body(content: &str) -> serde_json::Value {
        serde_json::json!({
            "choices": [ { "message": { "role": "assistant", "content": content } } ]
        })
    }

    #[tokio::test]
    async fn estimate_parses_macros_from_completion() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(
                r#"{"protein": 25, "carbohydrates": 30, "fat": 15}"#,
            )))
            .mount(&server)
            .await;

        let est = test_estimator(&server.uri());
        let macros = est.estimate(b"fake-jpeg").await.expect("should parse");
        assert_eq!(macros, Macros::new(25, 30, 15));
    }

    #[tokio::test]
    async fn estimate_rounds_fractional_grams() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(
                r#"{"protein": 24.6, "carbohydrates": 30.2, "fat": 14.5}"#,
            )))
            .mount(&server)
            .await;

        let est = test_estimator(&server.uri());
        let macros = est.estimate(b"fake-jpeg").await.expect("should parse");
        assert_eq!(macros, Macros::new(25, 30, 15));
    }

    #[tokio::test]
    async fn estimate_rejects_absurd_gram_counts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(
                r#"{"protein": 9000000000.0, "carbohydrates": 30, "fat": 15}"#,
            )))
            .mount(&server)
            .await;

        let est = test_estimator(&server.uri());
        let err = est.estimate(b"fake-jpeg").await.unwrap_err();
        assert!(matches!(err, EstimatorError::Implausible(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn estimate_rejects_negative_grams() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(
                r#"{"protein": 25, "carbohydrates": -4, "fat": 15}"#,
            )))
            .mount(&server)
            .await;

        let est = test_estimator(&server.uri());
        let err = est.estimate(b"fake-jpeg").await.unwrap_err();
        assert!(matches!(err, EstimatorError::Implausible(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn estimate_rejects_malformed_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(completion_body("the meal looks delicious")),
            )
            .mount(&server)
            .await;

        let est = test_estimator(&server.uri());
        let err = est.estimate(b"fake-jpeg").await.unwrap_err();
        assert!(matches!(err, EstimatorError::Parse(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn estimate_surfaces_api_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
            .mount(&server)
            .await;

        let est = test_estimator(&server.uri());
        let err = est.estimate(b"fake-jpeg").await.unwrap_err();
        assert!(matches!(err, EstimatorError::Api(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn estimate_rejects_empty_choices() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "choices": [] })),
            )
            .mount(&server)
            .await;

        let est = test_estimator(&server.uri());
        let err = est.estimate(b"fake-jpeg").await.unwrap_err();
        assert!(matches!(err, EstimatorError::Api(_)), "got {err:?}");
    }
}
