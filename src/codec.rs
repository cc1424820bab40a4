use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Byte encodings a book's text codec can name.
///
/// Names are matched the way the e-book tooling reports them (`utf8`,
/// `cp1252`, `latin-1`, ...), case-insensitively and with `_` treated as `-`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TextCodec {
    Utf8,
    Cp1252,
    Latin1,
    Ascii,
}

impl TextCodec {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Utf8 => "utf-8",
            Self::Cp1252 => "cp1252",
            Self::Latin1 => "latin-1",
            Self::Ascii => "ascii",
        }
    }

    /// Encodes `text`, or returns `None` when a character has no mapping.
    pub fn encode(self, text: &str) -> Option<Vec<u8>> {
        match self {
            Self::Utf8 => Some(text.as_bytes().to_vec()),
            Self::Ascii => text
                .chars()
                .map(|ch| if ch.is_ascii() { Some(ch as u8) } else { None })
                .collect(),
            Self::Latin1 => text
                .chars()
                .map(|ch| u8::try_from(u32::from(ch)).ok())
                .collect(),
            Self::Cp1252 => text.chars().map(cp1252_byte).collect(),
        }
    }
}

fn cp1252_byte(ch: char) -> Option<u8> {
    let code = u32::from(ch);
    if code < 0x80 || (0xA0..=0xFF).contains(&code) {
        return Some(code as u8);
    }

    CP1252_HIGH
        .iter()
        .position(|mapped| *mapped == Some(ch))
        .map(|offset| 0x80 + offset as u8)
}

// 0x80..=0x9F; the five unassigned slots stay `None`.
const CP1252_HIGH: [Option<char>; 32] = [
    Some('\u{20AC}'),
    None,
    Some('\u{201A}'),
    Some('\u{0192}'),
    Some('\u{201E}'),
    Some('\u{2026}'),
    Some('\u{2020}'),
    Some('\u{2021}'),
    Some('\u{02C6}'),
    Some('\u{2030}'),
    Some('\u{0160}'),
    Some('\u{2039}'),
    Some('\u{0152}'),
    None,
    Some('\u{017D}'),
    None,
    None,
    Some('\u{2018}'),
    Some('\u{2019}'),
    Some('\u{201C}'),
    Some('\u{201D}'),
    Some('\u{2022}'),
    Some('\u{2013}'),
    Some('\u{2014}'),
    Some('\u{02DC}'),
    Some('\u{2122}'),
    Some('\u{0161}'),
    Some('\u{203A}'),
    Some('\u{0153}'),
    None,
    Some('\u{017E}'),
    Some('\u{0178}'),
];

impl fmt::Display for TextCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TextCodec {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "utf8" | "utf-8" => Ok(Self::Utf8),
            "cp1252" | "windows-1252" => Ok(Self::Cp1252),
            "latin-1" | "latin1" | "iso-8859-1" | "iso8859-1" => Ok(Self::Latin1),
            "ascii" | "us-ascii" => Ok(Self::Ascii),
            _ => Err(format!("unsupported text codec: {value}")),
        }
    }
}

impl TryFrom<String> for TextCodec {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TextCodec> for String {
    fn from(codec: TextCodec) -> Self {
        codec.as_str().to_string()
    }
}
