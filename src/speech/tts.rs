//! Cloud text-to-speech request URIs.
//!
//! ```text
//! <endpoint>?ie=UTF-8&client=tw-ob&tl=<lang>&q=<url-encoded text>[&ttsspeed=<f>]
//! ```
//!
//! The response body is an mp3 stream, played through `playbin` or saved by
//! the phrase cache.

use reqwest::Url;

use super::SpeechError;

/// One synthesis request.
#[derive(Debug, Clone, PartialEq)]
pub struct TtsRequest<'a> {
    pub endpoint: &'a str,
    pub language: &'a str,
    pub text: &'a str,
    pub speed: Option<f32>,
}

impl TtsRequest<'_> {
    /// Build the request URI.  Spaces in the text become `+`.
    pub fn uri(&self) -> Result<String, SpeechError> {
        if self.text.trim().is_empty() {
            return Err(SpeechError::EmptyText);
        }

        let mut query: Vec<(&str, String)> = vec![
            ("ie", "UTF-8".into()),
            ("client", "tw-ob".into()),
            ("tl", self.language.into()),
            ("q", self.text.trim().into()),
        ];
        if let Some(speed) = self.speed {
            query.push(("ttsspeed", speed.to_string()));
        }

        let url = Url::parse_with_params(self.endpoint, &query)
            .map_err(|e| SpeechError::InvalidUri(format!("{}: {e}", self.endpoint)))?;
        Ok(url.into())
    }
}
