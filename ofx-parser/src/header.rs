//! Разделение документа OFX на блок заголовков и тело.
//!
//! OFX 1.x начинается со строк вида `КЛЮЧ:ЗНАЧЕНИЕ`, OFX 2.x - с XML-пролога и
//! инструкции обработки `<?OFX КЛЮЧ="ЗНАЧЕНИЕ" ...?>`. В обоих случаях тело
//! начинается с корневого тега `<OFX>`.

use crate::error::{Error, Result};
use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use std::borrow::Cow;

/// Ключ заголовка с номером версии.
pub const HEADER_VERSION: &str = "VERSION";
/// Ключ заголовка с версией самого блока заголовков.
pub const HEADER_OFXHEADER: &str = "OFXHEADER";
/// Ключ заголовка с кодировкой (OFX 1.x).
pub const HEADER_ENCODING: &str = "ENCODING";
/// Ключ заголовка с кодовой страницей (OFX 1.x).
pub const HEADER_CHARSET: &str = "CHARSET";

/// Стиль блока заголовков.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderStyle {
    /// Строки `КЛЮЧ:ЗНАЧЕНИЕ` (OFX 1.x).
    Sgml,
    /// XML-пролог и `<?OFX ...?>` (OFX 2.x).
    Xml,
}

/// Упорядоченный набор заголовков документа.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Headers {
    style: HeaderStyle,
    entries: Vec<(String, String)>,
    prolog_encoding: Option<String>,
}

impl Headers {
    fn new(style: HeaderStyle) -> Self {
        Self {
            style,
            entries: Vec::new(),
            prolog_encoding: None,
        }
    }

    /// Добавляет заголовок. При повторе ключа сохраняется последнее значение.
    fn insert(&mut self, key: &str, value: &str) {
        let value = value.to_string();
        match self
            .entries
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
        {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key.to_string(), value)),
        }
    }

    /// Возвращает значение заголовка (ключ без учета регистра).
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Итератор по заголовкам в порядке появления.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Стиль, в котором был записан блок заголовков.
    pub fn style(&self) -> HeaderStyle {
        self.style
    }

    /// Числовое значение `VERSION` (например, 102 или 211).
    pub fn version(&self) -> Option<u32> {
        self.get(HEADER_VERSION).and_then(|v| v.trim().parse().ok())
    }

    /// Числовое значение `OFXHEADER` (100 для 1.x, 200 для 2.x).
    pub fn ofx_header(&self) -> Option<u32> {
        self.get(HEADER_OFXHEADER).and_then(|v| v.trim().parse().ok())
    }

    /// Подсказка о кодировке: `CHARSET` для 1.x или `encoding` из XML-пролога.
    pub fn charset(&self) -> Option<&str> {
        match self.style {
            HeaderStyle::Sgml => self.get(HEADER_CHARSET),
            HeaderStyle::Xml => self.prolog_encoding.as_deref(),
        }
    }

    /// Кодировка тела согласно заголовкам.
    pub(crate) fn encoding(&self) -> &'static Encoding {
        if self.style == HeaderStyle::Sgml
            && self
                .get(HEADER_ENCODING)
                .is_some_and(|e| e.trim().eq_ignore_ascii_case("UTF-8"))
        {
            return UTF_8;
        }

        match self.charset().map(str::trim) {
            None => UTF_8,
            Some(c) if c.eq_ignore_ascii_case("NONE") => UTF_8,
            Some("1252") => WINDOWS_1252,
            Some(label) => Encoding::for_label(label.as_bytes()).unwrap_or(UTF_8),
        }
    }
}

/// Разделяет документ на заголовки и тело.
///
/// Тело начинается с корневого тега `<OFX>`; если его нет, документ
/// считается некорректным.
pub fn split(content: &str) -> Result<(Headers, &str)> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);

    let body_start = find_root_tag(content).ok_or_else(|| {
        Error::malformed("не найден корневой тег <OFX>, граница заголовка и тела отсутствует")
    })?;

    let headers = parse_header_block(&content[..body_start])?;
    tracing::debug!(
        count = headers.len(),
        style = ?headers.style(),
        "заголовки OFX разобраны"
    );

    Ok((headers, &content[body_start..]))
}

/// Декодирует байты документа с учетом подсказки о кодировке из заголовка.
pub fn decode(bytes: &[u8]) -> Result<Cow<'_, str>> {
    let header_end = find_root_tag_bytes(bytes).unwrap_or(bytes.len());
    let prefix = String::from_utf8_lossy(&bytes[..header_end]);
    let prefix = prefix.strip_prefix('\u{feff}').unwrap_or(&prefix);

    let encoding = parse_header_block(prefix)
        .map(|h| h.encoding())
        .unwrap_or(UTF_8);

    if encoding == UTF_8 {
        let bytes = bytes.strip_prefix(b"\xef\xbb\xbf").unwrap_or(bytes);
        return std::str::from_utf8(bytes)
            .map(Cow::Borrowed)
            .map_err(|e| Error::malformed(format!("тело не является корректным UTF-8: {}", e)));
    }

    tracing::debug!(encoding = encoding.name(), "декодирование по подсказке заголовка");
    let (text, _, _) = encoding.decode(bytes);
    Ok(text)
}

fn find_root_tag(content: &str) -> Option<usize> {
    find_root_tag_bytes(content.as_bytes())
}

fn find_root_tag_bytes(bytes: &[u8]) -> Option<usize> {
    bytes.windows(5).position(|w| {
        w[0] == b'<'
            && w[1..4].eq_ignore_ascii_case(b"OFX")
            && (w[4] == b'>' || w[4] == b'/' || w[4].is_ascii_whitespace())
    })
}

fn parse_header_block(block: &str) -> Result<Headers> {
    if block.trim_start().starts_with("<?") {
        parse_xml_headers(block)
    } else {
        parse_sgml_headers(block)
    }
}

fn parse_sgml_headers(block: &str) -> Result<Headers> {
    let mut headers = Headers::new(HeaderStyle::Sgml);

    for line in block.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (key, value) = line.split_once(':').ok_or_else(|| {
            Error::malformed(format!("строка заголовка без двоеточия: {}", line))
        })?;
        headers.insert(key.trim(), value.trim());
    }

    Ok(headers)
}

fn parse_xml_headers(block: &str) -> Result<Headers> {
    let mut headers = Headers::new(HeaderStyle::Xml);
    let mut rest = block.trim_start();

    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix("<!--") {
            let end = after
                .find("-->")
                .ok_or_else(|| Error::malformed("незакрытый комментарий в заголовке"))?;
            rest = after[end + 3..].trim_start();
            continue;
        }

        let after = rest.strip_prefix("<?").ok_or_else(|| {
            Error::malformed(format!(
                "неожиданное содержимое в XML-заголовке: {}",
                rest.lines().next().unwrap_or_default()
            ))
        })?;
        let end = after
            .find("?>")
            .ok_or_else(|| Error::malformed("незакрытая инструкция обработки в заголовке"))?;
        let instruction = &after[..end];
        rest = after[end + 2..].trim_start();

        let (target, attributes) = instruction
            .split_once(char::is_whitespace)
            .unwrap_or((instruction, ""));
        let attributes = parse_attributes(attributes)?;

        if target.eq_ignore_ascii_case("xml") {
            headers.prolog_encoding = attributes
                .into_iter()
                .find(|(k, _)| k.eq_ignore_ascii_case("encoding"))
                .map(|(_, v)| v.to_string());
        } else if target.eq_ignore_ascii_case("OFX") {
            for (key, value) in attributes {
                headers.insert(key, value);
            }
        } else {
            tracing::warn!(instruction = target, "пропущена неизвестная инструкция обработки");
        }
    }

    Ok(headers)
}

/// Разбирает атрибуты вида `KEY="VALUE"` или `KEY='VALUE'`.
fn parse_attributes(input: &str) -> Result<Vec<(&str, &str)>> {
    let mut attributes = Vec::new();
    let mut rest = input.trim();

    while !rest.is_empty() {
        let eq = rest
            .find('=')
            .ok_or_else(|| Error::malformed(format!("атрибут без значения: {}", rest)))?;
        let key = rest[..eq].trim();
        let value_part = rest[eq + 1..].trim_start();

        let quote = value_part
            .chars()
            .next()
            .filter(|c| *c == '"' || *c == '\'')
            .ok_or_else(|| Error::malformed(format!("значение атрибута {} без кавычек", key)))?;
        let close = value_part[1..]
            .find(quote)
            .ok_or_else(|| Error::malformed(format!("незакрытое значение атрибута {}", key)))?;

        if key.is_empty() {
            return Err(Error::malformed("атрибут с пустым именем"));
        }

        attributes.push((key, &value_part[1..close + 1]));
        rest = value_part[close + 2..].trim_start();
    }

    Ok(attributes)
}
