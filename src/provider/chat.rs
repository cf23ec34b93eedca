use std::io::{BufRead, BufReader};

use anyhow::{Context, Result, bail};
use serde_json::{Value, json};

use crate::store::ApiConfig;

use super::parse::{StreamDecoder, extract_text, parse_solutions};
use super::{Prompt, SolutionProvider, with_fallback};

/// OpenAI-style chat-completions endpoint, streamed over server-sent events.
pub struct ChatCompletionsProvider {
    config: ApiConfig,
    agent: ureq::Agent,
}

impl ChatCompletionsProvider {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let missing = config.missing_fields();
        if !missing.is_empty() {
            bail!("API configuration is incomplete, missing: {}", missing.join(", "));
        }

        let agent: ureq::Agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .into();

        Ok(Self {
            config: config.trimmed(),
            agent,
        })
    }

    fn post(&self, body: &Value) -> Result<ureq::http::Response<ureq::Body>> {
        let payload = serde_json::to_string(body).context("failed to encode request body")?;
        log::info!(
            "calling {} with model {}",
            self.config.api_url,
            self.config.model_name
        );

        let mut response = self
            .agent
            .post(self.config.api_url.as_str())
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .send(payload.as_str())
            .with_context(|| format!("request to {} failed", self.config.api_url))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.body_mut().read_to_string().unwrap_or_default();
            bail!("API request failed: {} - {}", status.as_u16(), detail.trim());
        }
        Ok(response)
    }
}

impl SolutionProvider for ChatCompletionsProvider {
    fn request_solutions(
        &self,
        prompt: &Prompt,
        on_partial: &mut dyn FnMut(&str),
    ) -> Result<Vec<String>> {
        let body = json!({
            "model": self.config.model_name,
            "messages": [{ "role": "user", "content": prompt.instruction() }],
            "temperature": 0.7,
            "stream": true,
        });
        let response = self.post(&body)?;

        let mut decoder = StreamDecoder::default();
        let reader = BufReader::new(response.into_body().into_reader());
        for line in reader.lines() {
            let line = line.context("response stream was interrupted")?;
            if decoder.push_line(&line) {
                on_partial(decoder.content());
            }
        }

        let content = decoder.into_content();
        let solutions = with_fallback(parse_solutions(&content));
        log::info!(
            "received {} characters, {} solutions",
            content.chars().count(),
            solutions.len()
        );
        Ok(solutions)
    }

    fn check_connection(&self) -> Result<String> {
        let body = json!({
            "model": self.config.model_name,
            "messages": [{ "role": "user", "content": "ping" }],
            "stream": false,
            "max_tokens": 10,
        });
        let mut response = self.post(&body)?;

        let raw = response
            .body_mut()
            .read_to_string()
            .context("failed to read the test response")?;
        let reply = serde_json::from_str::<Value>(&raw)
            .ok()
            .and_then(|value| extract_text(&value).map(str::to_owned))
            .unwrap_or_default();

        Ok(if reply.trim().is_empty() {
            "connected".to_owned()
        } else {
            format!("connected, model replied: {}", reply.trim())
        })
    }
}
