//! Выбор грамматики разметки по версии документа.
//!
//! OFX 1.x (SGML) допускает незакрытые листовые теги, OFX 2.x (XML) требует
//! явного закрытия каждого тега.

use crate::header::{HeaderStyle, Headers};
use crate::markup::containment::{Containment, OFX_CONTAINMENT};
use crate::markup::lexer::{Lexer, Token};
use std::fmt;

/// Первая версия OFX с XML-синтаксисом (2.0.0).
pub const FIRST_XML_VERSION: u32 = 200;

/// Грамматика построения дерева.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grammar {
    /// SGML-подобная разметка OFX 1.x с неявным закрытием тегов.
    Tolerant,
    /// Строгий XML OFX 2.x.
    Strict,
}

impl Grammar {
    pub fn is_tolerant(self) -> bool {
        self == Grammar::Tolerant
    }

    /// Таблица вложенности, по которой выводится неявное закрытие тегов.
    pub fn containment(self) -> Option<&'static Containment> {
        match self {
            Grammar::Tolerant => Some(&OFX_CONTAINMENT),
            Grammar::Strict => None,
        }
    }

    fn for_version(version: u32) -> Self {
        if version >= FIRST_XML_VERSION {
            Grammar::Strict
        } else {
            Grammar::Tolerant
        }
    }
}

impl std::str::FromStr for Grammar {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tolerant" | "sgml" | "1" => Ok(Grammar::Tolerant),
            "strict" | "xml" | "2" => Ok(Grammar::Strict),
            other => Err(format!("Неизвестная грамматика: {}", other)),
        }
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Grammar::Tolerant => write!(f, "tolerant"),
            Grammar::Strict => write!(f, "strict"),
        }
    }
}

/// Выбирает грамматику по заголовкам, а при их отсутствии - по телу.
///
/// Порядок: `VERSION`, затем `OFXHEADER`, затем сигнатура тела (XML-пролог и
/// строго закрытые теги означают 2.x).
pub fn dispatch(headers: &Headers, body: &str) -> Grammar {
    let grammar = if let Some(version) = headers.version() {
        Grammar::for_version(version)
    } else if let Some(header_version) = headers.ofx_header() {
        Grammar::for_version(header_version)
    } else if headers.style() == HeaderStyle::Xml && is_strictly_closed(body) {
        Grammar::Strict
    } else {
        Grammar::Tolerant
    };

    tracing::debug!(
        version = ?headers.version(),
        ofxheader = ?headers.ofx_header(),
        %grammar,
        "выбрана грамматика"
    );
    grammar
}

/// Каждый открытый тег закрыт парным тегом в правильном порядке.
fn is_strictly_closed(body: &str) -> bool {
    let mut stack = Vec::new();

    for spanned in Lexer::new(body) {
        let Ok(spanned) = spanned else {
            return false;
        };
        match spanned.token {
            Token::Open(name) => stack.push(name),
            Token::Close(name) => {
                if stack.pop() != Some(name) {
                    return false;
                }
            }
            Token::SelfClosing(_) | Token::Text(_) => {}
        }
    }

    stack.is_empty()
}
