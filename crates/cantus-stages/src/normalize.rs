//! Text normalization via the normalizer service.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use cantus_core::record::{SynthesisMode, Utterance};
use cantus_core::{Result, SynthError};
use cantus_synth::RecordStage;

use crate::http::ServiceClient;

#[derive(Debug, Serialize)]
struct NormalizeRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct NormalizeReply {
    #[serde(default)]
    text: String,
    #[serde(default)]
    err: String,
}

/// Rewrites cleaned text into its spoken normal form, entry by entry.
///
/// The service reports refusals in-band through `err`; those abort the
/// pipeline as [`SynthError::Refused`]. Pre-accented entries are not sent.
#[derive(Debug, Clone)]
pub struct Normalizer {
    client: ServiceClient,
}

impl Normalizer {
    /// A normalizer stage over the given client.
    #[must_use]
    pub fn new(client: ServiceClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RecordStage for Normalizer {
    fn name(&self) -> &'static str {
        "normalizer"
    }

    #[instrument(skip_all, fields(request_id = %record.request_id))]
    async fn process(&self, record: &mut Utterance) -> Result<()> {
        if record.mode == SynthesisMode::AcousticOnly {
            return Ok(());
        }
        for i in 0..record.cleaned_text.len() {
            if record.chunk_is_fixed(i) {
                continue;
            }
            let reply: NormalizeReply = self
                .client
                .invoke_json(&NormalizeRequest {
                    text: &record.cleaned_text[i],
                })
                .await?;
            if !reply.err.is_empty() {
                return Err(SynthError::refused(self.client.service(), reply.err));
            }
            record.cleaned_text[i] = reply.text;
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use assert_matches::assert_matches;

    use cantus_core::RetryConfig;
    use cantus_core::api::SynthesisRequest;
    use cantus_core::ssml::TextChunk;

    use super::*;

    fn client(server: &wiremock::MockServer) -> ServiceClient {
        ServiceClient::new(
            "normalizer",
            server.uri(),
            Duration::from_secs(5),
            RetryConfig {
                max_attempts: 1,
                ..RetryConfig::default()
            },
        )
        .unwrap()
    }

    fn record_with_entries(entries: &[&str]) -> Utterance {
        let mut record = Utterance::new(Arc::new(SynthesisRequest::text("x")));
        record.cleaned_text = entries.iter().map(|e| (*e).to_string()).collect();
        record
    }

    #[tokio::test]
    async fn rewrites_entries_in_place() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::body_json(
                serde_json::json!({"text": "5 proc."}),
            ))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(
                serde_json::json!({"text": "penki procentai", "err": ""}),
            ))
            .expect(1)
            .mount(&server)
            .await;

        let mut record = record_with_entries(&["5 proc."]);
        Normalizer::new(client(&server)).process(&mut record).await.unwrap();
        assert_eq!(record.cleaned_text, vec!["penki procentai".to_string()]);
    }

    #[tokio::test]
    async fn service_refusal_becomes_an_error() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(
                serde_json::json!({"text": "", "err": "unknown abbreviation"}),
            ))
            .mount(&server)
            .await;

        let mut record = record_with_entries(&["kžn."]);
        let err = Normalizer::new(client(&server))
            .process(&mut record)
            .await
            .unwrap_err();
        assert_matches!(err, SynthError::Refused { .. });
        assert_eq!(
            err.to_string(),
            "service 'normalizer' refused: unknown abbreviation"
        );
    }

    #[tokio::test]
    async fn fixed_entries_are_not_sent() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"text": "du", "err": ""})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let mut record = record_with_entries(&["v{a~}karas", "2"]);
        record.text_chunks = vec![
            TextChunk {
                accented: Some("v{a~}karas".into()),
                ..TextChunk::plain("vakaras")
            },
            TextChunk::plain("2"),
        ];
        Normalizer::new(client(&server)).process(&mut record).await.unwrap();
        assert_eq!(
            record.cleaned_text,
            vec!["v{a~}karas".to_string(), "du".to_string()]
        );
    }

    #[tokio::test]
    async fn skips_acoustic_only_records() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .respond_with(wiremock::ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut record = record_with_entries(&["a - b"]);
        record.mode = SynthesisMode::AcousticOnly;
        Normalizer::new(client(&server)).process(&mut record).await.unwrap();
        assert_eq!(record.cleaned_text, vec!["a - b".to_string()]);
    }
}
