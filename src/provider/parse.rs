use serde_json::Value;

use super::MAX_SOLUTIONS;

const DELTA_POINTERS: [&str; 5] = [
    "/choices/0/delta/content",
    "/choices/0/message/content",
    "/data/choices/0/delta/content",
    "/data/choices/0/message/content",
    "/content",
];

/// Accumulates assistant text from a chat-completion response read line by line.
///
/// Accepts server-sent events (`data: {...}`) as well as bare JSON lines. Comments, `[DONE]`
/// markers and lines that are not JSON are skipped.
#[derive(Default)]
pub struct StreamDecoder {
    content: String,
}

impl StreamDecoder {
    /// Returns whether the accumulated content grew.
    pub fn push_line(&mut self, line: &str) -> bool {
        let line = line.trim_end_matches(['\r', '\n']);

        if let Some(data) = line.strip_prefix("data:") {
            let data = data.trim();
            if data.is_empty() || data == "[DONE]" {
                return false;
            }
            return self.absorb(data);
        }

        let line = line.trim();
        if !line.starts_with('{') {
            return false;
        }
        self.absorb(line)
    }

    fn absorb(&mut self, payload: &str) -> bool {
        let value = match serde_json::from_str::<Value>(payload) {
            Ok(value) => value,
            Err(error) => {
                log::debug!("skipping malformed stream chunk: {error}");
                return false;
            }
        };

        match extract_text(&value) {
            Some(delta) if !delta.is_empty() => {
                self.content.push_str(delta);
                true
            }
            _ => false,
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn into_content(self) -> String {
        self.content
    }
}

pub(super) fn extract_text(value: &Value) -> Option<&str> {
    DELTA_POINTERS
        .iter()
        .find_map(|pointer| value.pointer(pointer).and_then(Value::as_str))
}

/// Splits a response into at most five solution lines, dropping blank lines and list markers.
pub fn parse_solutions(content: &str) -> Vec<String> {
    content
        .lines()
        .map(|line| strip_enumerator(line.trim()).trim())
        .filter(|line| !line.is_empty())
        .take(MAX_SOLUTIONS)
        .map(ToOwned::to_owned)
        .collect()
}

fn strip_enumerator(line: &str) -> &str {
    let rest = line.trim_start_matches(|ch: char| ch.is_ascii_digit());
    if rest.len() != line.len() {
        return rest
            .strip_prefix(['.', '、', ')', '）'])
            .unwrap_or(line);
    }
    line.strip_prefix(['-', '*', '•']).unwrap_or(line)
}
