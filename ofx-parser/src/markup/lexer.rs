//! Лексер тела OFX: теги и текст между ними.

use crate::error::{Error, Result};
use std::borrow::Cow;

/// Лексема тела документа.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    /// `<NAME>` (атрибуты отбрасываются).
    Open(&'a str),
    /// `</NAME>`
    Close(&'a str),
    /// `<NAME/>`
    SelfClosing(&'a str),
    /// Текст между тегами, обрезанный по краям, с раскрытыми сущностями.
    Text(Cow<'a, str>),
}

/// Лексема и ее смещение в байтах от начала тела.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spanned<'a> {
    pub token: Token<'a>,
    pub offset: usize,
}

/// Итератор лексем по телу документа.
pub struct Lexer<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn err(&self, msg: &str, offset: usize) -> Error {
        let end = (offset + 20).min(self.src.len());
        let end = (end..=self.src.len())
            .find(|i| self.src.is_char_boundary(*i))
            .unwrap_or(self.src.len());
        Error::malformed(format!(
            "{} (смещение {}): '{}'",
            msg,
            offset,
            &self.src[offset..end]
        ))
    }

    /// Пропускает конструкцию `<open ... close>`; возвращает false, если она не закрыта.
    fn skip_until(&mut self, close: &str) -> bool {
        match self.src[self.pos..].find(close) {
            Some(end) => {
                self.pos += end + close.len();
                true
            }
            None => false,
        }
    }

    fn read_tag(&mut self, start: usize) -> Result<Token<'a>> {
        let src = self.src;
        let rest = &src[start + 1..];
        let end = rest
            .find(['>', '<'])
            .filter(|i| rest.as_bytes()[*i] == b'>')
            .ok_or_else(|| self.err("незакрытый тег", start))?;
        self.pos = start + 1 + end + 1;

        let inner = rest[..end].trim();
        let (inner, closing, self_closing) = if let Some(name) = inner.strip_prefix('/') {
            (name, true, false)
        } else if let Some(name) = inner.strip_suffix('/') {
            (name, false, true)
        } else {
            (inner, false, false)
        };

        let name = inner.split_whitespace().next().unwrap_or_default();
        if name.is_empty() {
            return Err(self.err("пустое имя тега", start));
        }

        Ok(if closing {
            Token::Close(name)
        } else if self_closing {
            Token::SelfClosing(name)
        } else {
            Token::Open(name)
        })
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Spanned<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        let src = self.src;
        loop {
            let rest = &src[self.pos..];
            if rest.is_empty() {
                return None;
            }

            let start = self.pos;

            if !rest.starts_with('<') {
                let end = rest.find('<').unwrap_or(rest.len());
                self.pos += end;
                let text = rest[..end].trim();
                if text.is_empty() {
                    continue;
                }
                let offset = start + (rest.len() - rest.trim_start().len());
                return Some(Ok(Spanned {
                    token: Token::Text(decode_entities(text)),
                    offset,
                }));
            }

            if rest.starts_with("<!--") {
                self.pos += 4;
                if !self.skip_until("-->") {
                    self.pos = src.len();
                    return Some(Err(self.err("незакрытый комментарий", start)));
                }
                continue;
            }

            if rest.starts_with("<?") || rest.starts_with("<!") {
                let close = if rest.starts_with("<?") { "?>" } else { ">" };
                self.pos += 2;
                if !self.skip_until(close) {
                    self.pos = src.len();
                    return Some(Err(self.err("незакрытая инструкция", start)));
                }
                continue;
            }

            let result = self.read_tag(start);
            if result.is_err() {
                self.pos = src.len();
            }
            return Some(result.map(|token| Spanned {
                token,
                offset: start,
            }));
        }
    }
}

/// Раскрывает стандартные сущности SGML/XML и числовые ссылки на символы.
///
/// Нераспознанные сущности остаются в тексте как есть.
pub fn decode_entities(text: &str) -> Cow<'_, str> {
    if !text.contains('&') {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];

        let decoded = after.find(';').and_then(|semi| {
            let entity = &after[..semi];
            let ch = match entity {
                "lt" => Some('<'),
                "gt" => Some('>'),
                "amp" => Some('&'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|d| d.parse().ok()))
                    .and_then(char::from_u32),
            };
            ch.map(|c| (c, semi))
        });

        match decoded {
            Some((ch, semi)) => {
                out.push(ch);
                rest = &after[semi + 1..];
            }
            None => {
                out.push('&');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    Cow::Owned(out)
}
