//! Declarative pipeline descriptions.
//!
//! A [`PipelineDescription`] is an ordered list of [`StageSpec`]s.  It can be
//! assembled in code with the builder methods or parsed from gst-launch style
//! text:
//!
//! ```text
//! filesrc location=hello.mp3 ! decodebin ! audioresample ! audioconvert
//!   ! audio/x-raw,format=S24LE,rate=48000 ! wavenc ! filesink location=hello.wav
//! ```
//!
//! Two shorthand stage forms are recognised: a media-type token
//! (`audio/x-raw,…`) becomes `capsfilter caps=…`, and a URI token
//! (`https://…`) becomes `urisrc uri=…`.
//!
//! ```
//! use pipeplay::media::PipelineDescription;
//!
//! let desc: PipelineDescription = "audiotestsrc num-buffers=4 ! fakesink".parse().unwrap();
//! assert_eq!(desc.len(), 2);
//! assert_eq!(desc.stages()[0].name, "audiotestsrc");
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use super::error::ConstructionError;

// ---------------------------------------------------------------------------
// ParamValue
// ---------------------------------------------------------------------------

/// A scalar stage parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Str(String),
    Int(i64),
    Bool(bool),
    Float(f64),
}

impl ParamValue {
    /// Human-readable type name used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            ParamValue::Str(_) => "string",
            ParamValue::Int(_) => "integer",
            ParamValue::Bool(_) => "boolean",
            ParamValue::Float(_) => "float",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ParamValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric view: integers widen to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Int(v) => Some(*v as f64),
            ParamValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Type an unquoted token the way the description parser does.
    fn infer(raw: &str) -> Self {
        match raw {
            "true" => return ParamValue::Bool(true),
            "false" => return ParamValue::Bool(false),
            _ => {}
        }
        if let Ok(v) = raw.parse::<i64>() {
            return ParamValue::Int(v);
        }
        if raw.contains('.') {
            if let Ok(v) = raw.parse::<f64>() {
                if v.is_finite() {
                    return ParamValue::Float(v);
                }
            }
        }
        ParamValue::Str(raw.to_string())
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Str(s) => {
                let plain = !s.is_empty()
                    && !s.chars().any(|c| c.is_whitespace() || matches!(c, '"' | '!' | '\\'))
                    && matches!(ParamValue::infer(s), ParamValue::Str(_));
                if plain {
                    f.write_str(s)
                } else {
                    f.write_str("\"")?;
                    for c in s.chars() {
                        if matches!(c, '"' | '\\') {
                            f.write_str("\\")?;
                        }
                        write!(f, "{c}")?;
                    }
                    f.write_str("\"")
                }
            }
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::Bool(v) => write!(f, "{v}"),
            ParamValue::Float(v) => write!(f, "{v:?}"),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Str(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Str(v)
    }
}

impl From<&Path> for ParamValue {
    fn from(v: &Path) -> Self {
        ParamValue::Str(v.display().to_string())
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        ParamValue::Int(v as i64)
    }
}

impl From<u32> for ParamValue {
    fn from(v: u32) -> Self {
        ParamValue::Int(v as i64)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

// ---------------------------------------------------------------------------
// StageSpec
// ---------------------------------------------------------------------------

/// Parameters of one stage, ordered by name.
pub type Params = BTreeMap<String, ParamValue>;

/// One named stage of a description.
#[derive(Debug, Clone, PartialEq)]
pub struct StageSpec {
    /// Factory name (`filesrc`, `decodebin`, …).
    pub name: String,
    pub params: Params,
}

impl StageSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Params::new(),
        }
    }

    /// Builder-style parameter setter.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// A `capsfilter` stage for a caps string such as `audio/x-raw,rate=48000`.
    pub fn caps(caps: impl Into<String>) -> Self {
        Self::new("capsfilter").with("caps", caps.into())
    }

    pub fn param(&self, key: &str) -> Option<&ParamValue> {
        self.params.get(key)
    }
}

impl fmt::Display for StageSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Shorthand forms render back the way they were written.
        if self.params.len() == 1 {
            if let Some(ParamValue::Str(caps)) = self.params.get("caps") {
                if self.name == "capsfilter" && is_caps_token(caps) {
                    return f.write_str(caps);
                }
            }
            if let Some(ParamValue::Str(uri)) = self.params.get("uri") {
                if self.name == "urisrc" && is_uri_token(uri) && !uri.contains(char::is_whitespace) {
                    return f.write_str(uri);
                }
            }
        }

        f.write_str(&self.name)?;
        for (key, value) in &self.params {
            write!(f, " {key}={value}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// PipelineDescription
// ---------------------------------------------------------------------------

/// An immutable, ordered chain of stages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineDescription {
    stages: Vec<StageSpec>,
}

impl PipelineDescription {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage (builder style).
    pub fn stage(mut self, stage: StageSpec) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn stages(&self) -> &[StageSpec] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Parse gst-launch style text.
    pub fn parse(text: &str) -> Result<Self, ConstructionError> {
        let tokens = tokenize(text)?;

        let mut stages = Vec::new();
        let mut group: Vec<Token> = Vec::new();
        let mut last_bang = None;

        for token in tokens {
            match token {
                Token::Bang(offset) => {
                    if group.is_empty() {
                        return Err(syntax(offset, "empty stage before '!'"));
                    }
                    stages.push(stage_from_tokens(std::mem::take(&mut group))?);
                    last_bang = Some(offset);
                }
                word => group.push(word),
            }
        }

        if group.is_empty() {
            return match last_bang {
                Some(offset) => Err(syntax(offset, "dangling '!' at end of description")),
                None => Err(ConstructionError::EmptyPipeline),
            };
        }
        stages.push(stage_from_tokens(group)?);

        Ok(Self { stages })
    }
}

impl FromStr for PipelineDescription {
    type Err = ConstructionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for PipelineDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, stage) in self.stages.iter().enumerate() {
            if i > 0 {
                f.write_str(" ! ")?;
            }
            write!(f, "{stage}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

#[derive(Debug)]
enum Token {
    Word {
        text: String,
        /// Set when any part of the word came from a quoted run.
        quoted: bool,
        offset: usize,
    },
    Bang(usize),
}

fn syntax(offset: usize, message: &str) -> ConstructionError {
    ConstructionError::Syntax {
        offset,
        message: message.to_string(),
    }
}

fn tokenize(text: &str) -> Result<Vec<Token>, ConstructionError> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some(&(offset, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        if c == '!' {
            chars.next();
            tokens.push(Token::Bang(offset));
            continue;
        }

        let mut word = String::new();
        let mut quoted = false;
        while let Some(&(pos, c)) = chars.peek() {
            if c.is_whitespace() || c == '!' {
                break;
            }
            chars.next();
            if c != '"' {
                word.push(c);
                continue;
            }

            quoted = true;
            let mut closed = false;
            while let Some((_, q)) = chars.next() {
                match q {
                    '"' => {
                        closed = true;
                        break;
                    }
                    '\\' => match chars.next() {
                        Some((_, escaped)) => word.push(escaped),
                        None => break,
                    },
                    other => word.push(other),
                }
            }
            if !closed {
                return Err(syntax(pos, "unterminated quoted value"));
            }
        }

        tokens.push(Token::Word {
            text: word,
            quoted,
            offset,
        });
    }

    Ok(tokens)
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn is_uri_token(s: &str) -> bool {
    match s.split_once("://") {
        Some((scheme, _)) => {
            !scheme.is_empty()
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}

fn is_caps_token(s: &str) -> bool {
    let media_type = s.split(',').next().unwrap_or("");
    match media_type.split_once('/') {
        Some((major, minor)) => is_identifier(major) && !minor.is_empty() && !media_type.contains('='),
        None => false,
    }
}

fn stage_from_tokens(tokens: Vec<Token>) -> Result<StageSpec, ConstructionError> {
    let mut iter = tokens.into_iter();

    let mut stage = match iter.next() {
        Some(Token::Word { text, offset, .. }) => {
            if is_uri_token(&text) {
                StageSpec::new("urisrc").with("uri", text)
            } else if is_caps_token(&text) {
                StageSpec::caps(text)
            } else if is_identifier(&text) {
                StageSpec::new(text)
            } else {
                return Err(syntax(offset, &format!("invalid stage name \"{text}\"")));
            }
        }
        _ => return Err(ConstructionError::EmptyPipeline),
    };

    for token in iter {
        let Token::Word {
            text,
            quoted,
            offset,
        } = token
        else {
            continue;
        };

        let Some((key, raw)) = text.split_once('=') else {
            return Err(syntax(offset, &format!("expected key=value, found \"{text}\"")));
        };
        if !is_identifier(key) {
            return Err(syntax(offset, &format!("invalid property name \"{key}\"")));
        }

        let value = if quoted {
            ParamValue::Str(raw.to_string())
        } else {
            ParamValue::infer(raw)
        };
        stage.params.insert(key.to_string(), value);
    }

    Ok(stage)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
