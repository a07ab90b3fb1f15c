//! RouterOS API word and sentence framing.
//!
//! A word is a length prefix followed by that many bytes; a sentence is a run
//! of words closed by a zero-length word. Length prefixes use a
//! variable-width encoding keyed on the high bits of the first byte.

use std::collections::HashMap;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::ApiError;

/// Upper bound on a single word; anything larger is treated as corruption.
pub const MAX_WORD_LEN: usize = 16 * 1024 * 1024;

/// One key-value row returned by the device.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: HashMap<String, String>,
}

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw value for `key`, if the device sent it.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Raw value for `key`, or the empty string when absent.
    pub fn value(&self, key: &str) -> &str {
        self.get(key).unwrap_or("")
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(key.into(), value.into());
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Result of a single command: data rows plus the completion sentence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reply {
    /// `!re` rows in arrival order.
    pub re: Vec<Record>,
    /// Attributes of the `!done` sentence. `None` if no completion was seen.
    pub done: Option<Record>,
}

impl Reply {
    /// A completed reply with no rows and no attributes.
    pub fn completed() -> Self {
        Self {
            re: Vec::new(),
            done: Some(Record::new()),
        }
    }

    /// A completed reply carrying completion attributes.
    pub fn completed_with<I, K, V>(attrs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            re: Vec::new(),
            done: Some(attrs.into_iter().collect()),
        }
    }

    /// A completed reply with the given rows.
    pub fn with_rows(rows: Vec<Record>) -> Self {
        Self {
            re: rows,
            done: Some(Record::new()),
        }
    }

    /// Attribute from the completion sentence (e.g. `ret` of a count-only query).
    pub fn done_value(&self, key: &str) -> Option<&str> {
        self.done.as_ref().and_then(|d| d.get(key))
    }
}

/// A decoded reply sentence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentence {
    /// Reply word such as `!re` or `!done`.
    pub word: String,
    /// Value of the `.tag=` word, if any.
    pub tag: Option<String>,
    /// `=key=value` attributes.
    pub record: Record,
    /// Words that are neither attributes nor tags (e.g. a `!fatal` reason).
    pub extra: Vec<String>,
}

impl Sentence {
    /// Decode a sentence from its words.
    pub fn from_words(words: Vec<String>) -> Result<Self, ApiError> {
        let mut iter = words.into_iter();
        let word = iter
            .next()
            .ok_or_else(|| ApiError::Protocol("empty sentence".to_string()))?;

        let mut tag = None;
        let mut record = Record::new();
        let mut extra = Vec::new();
        for w in iter {
            if let Some(attr) = w.strip_prefix('=') {
                match attr.split_once('=') {
                    Some((k, v)) => record.insert(k, v),
                    None => record.insert(attr, ""),
                }
            } else if let Some(t) = w.strip_prefix(".tag=") {
                tag = Some(t.to_string());
            } else {
                extra.push(w);
            }
        }

        Ok(Self {
            word,
            tag,
            record,
            extra,
        })
    }
}

/// Append the encoded length prefix for a word of `len` bytes.
pub fn encode_length(len: usize, out: &mut Vec<u8>) {
    let l = len as u32;
    if len < 0x80 {
        out.push(l as u8);
    } else if len < 0x4000 {
        out.extend_from_slice(&((l | 0x8000) as u16).to_be_bytes());
    } else if len < 0x20_0000 {
        out.extend_from_slice(&(l | 0xC0_0000).to_be_bytes()[1..]);
    } else if len < 0x1000_0000 {
        out.extend_from_slice(&(l | 0xE000_0000).to_be_bytes());
    } else {
        out.push(0xF0);
        out.extend_from_slice(&l.to_be_bytes());
    }
}

/// Encode a full sentence including the terminating empty word.
pub fn encode_sentence<S: AsRef<str>>(words: &[S]) -> Vec<u8> {
    let mut out = Vec::new();
    for word in words {
        let bytes = word.as_ref().as_bytes();
        encode_length(bytes.len(), &mut out);
        out.extend_from_slice(bytes);
    }
    out.push(0);
    out
}

/// Read one length prefix.
pub async fn read_length<R: AsyncRead + Unpin>(reader: &mut R) -> Result<usize, ApiError> {
    let first = reader.read_u8().await?;
    let (extra, mut len) = match first {
        b if b & 0x80 == 0x00 => (0, u32::from(b)),
        b if b & 0xC0 == 0x80 => (1, u32::from(b & 0x3F)),
        b if b & 0xE0 == 0xC0 => (2, u32::from(b & 0x1F)),
        b if b & 0xF0 == 0xE0 => (3, u32::from(b & 0x0F)),
        0xF0 => (4, 0),
        b => {
            return Err(ApiError::Protocol(format!(
                "invalid length prefix 0x{b:02x}"
            )));
        }
    };
    for _ in 0..extra {
        len = (len << 8) | u32::from(reader.read_u8().await?);
    }
    Ok(len as usize)
}

/// Read one sentence as raw words.
pub async fn read_sentence<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Vec<String>, ApiError> {
    let mut words = Vec::new();
    loop {
        let len = read_length(reader).await?;
        if len == 0 {
            return Ok(words);
        }
        if len > MAX_WORD_LEN {
            return Err(ApiError::Protocol(format!("word of {len} bytes exceeds limit")));
        }
        let mut buf = vec![0u8; len];
        reader.read_exact(&mut buf).await?;
        words.push(String::from_utf8_lossy(&buf).into_owned());
    }
}

/// Write one sentence and flush.
pub async fn write_sentence<W, S>(writer: &mut W, words: &[S]) -> Result<(), ApiError>
where
    W: AsyncWrite + Unpin,
    S: AsRef<str>,
{
    writer.write_all(&encode_sentence(words)).await?;
    writer.flush().await?;
    Ok(())
}
