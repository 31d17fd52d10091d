//! # OFX Parser
//!
//! Библиотека для разбора файлов Open Financial Exchange (OFX) версий 1.x
//! (SGML-подобная разметка) и 2.x (XML) в типизированную модель счета.
//!
//! ## Этапы разбора
//!
//! 1. **Заголовок** ([`header`]) - отделение пар ключ/значение от тела
//! 2. **Грамматика** ([`grammar`]) - выбор терпимого или строгого режима по версии
//! 3. **Разметка** ([`markup`]) - лексер и построение дерева элементов
//! 4. **Сущности** ([`mapper`]) - счет, транзакции и балансы
//!
//! ## Пример использования
//!
//! ```rust,ignore
//! use std::fs;
//!
//! let bytes = fs::read("statement.ofx")?;
//! let document = ofx_parser::parse_bytes(&bytes)?;
//! for transaction in &document.account().transactions {
//!     println!("{} {}", transaction.amount, transaction.name);
//! }
//! ```

pub mod amount;
pub mod date;
pub mod document;
pub mod error;
pub mod grammar;
pub mod header;
pub mod mapper;
pub mod markup;
pub mod types;

pub use date::ParsedDate;
pub use document::Document;
pub use error::{Error, ErrorKind, Result};
pub use grammar::Grammar;
pub use header::{HeaderStyle, Headers};
pub use markup::{Content, ElementId, ElementRef, Tree};
pub use types::{Account, AccountType, Balance, SignOn, Transaction, TransactionType};

/// Параметры разбора.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Принудительная грамматика; `None` - определить по заголовку.
    pub grammar: Option<Grammar>,
}

impl ParseOptions {
    pub fn with_grammar(grammar: Grammar) -> Self {
        Self {
            grammar: Some(grammar),
        }
    }
}

/// Разбирает документ из строки.
pub fn parse(content: &str) -> Result<Document> {
    parse_with(content, &ParseOptions::default())
}

/// Разбирает документ из строки с заданными параметрами.
pub fn parse_with(content: &str, options: &ParseOptions) -> Result<Document> {
    let (headers, body) = header::split(content)?;
    let grammar = options
        .grammar
        .unwrap_or_else(|| grammar::dispatch(&headers, body));

    let tree = markup::build(body, grammar)?;
    tracing::debug!(
        %grammar,
        headers = headers.len(),
        elements = tree.len(),
        "дерево построено"
    );

    let account = mapper::map_account(&tree)?;
    let sign_on = mapper::map_sign_on(&tree)?;

    Ok(Document {
        headers,
        grammar,
        tree,
        account,
        sign_on,
    })
}

/// Разбирает документ из байтов, учитывая кодировку из заголовка.
pub fn parse_bytes(bytes: &[u8]) -> Result<Document> {
    parse_bytes_with(bytes, &ParseOptions::default())
}

pub fn parse_bytes_with(bytes: &[u8], options: &ParseOptions) -> Result<Document> {
    let content = header::decode(bytes)?;
    parse_with(&content, options)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SGML: &str = "OFXHEADER:100
DATA:OFXSGML
VERSION:102

<OFX>
<BANKMSGSRSV1><STMTTRNRS><STMTRS>
<BANKACCTFROM><BANKID>1<ACCTID>42<ACCTTYPE>SAVINGS</BANKACCTFROM>
<BANKTRANLIST>
<STMTTRN><TRNTYPE>DEP<DTPOSTED>20240301<TRNAMT>10.00<FITID>F1
</BANKTRANLIST>
</STMTRS></STMTTRNRS></BANKMSGSRSV1>
</OFX>";

    #[test]
    fn test_parse_legacy_document() {
        let document = parse(SGML).unwrap();

        assert_eq!(document.grammar(), Grammar::Tolerant);
        assert_eq!(document.headers().get("VERSION"), Some("102"));
        assert_eq!(document.account().id, "42");
        assert_eq!(document.account().transactions.len(), 1);
        assert!(document.sign_on().is_none());
        assert_eq!(document.tree().root().name(), "OFX");
    }

    #[test]
    fn test_grammar_override() {
        let err = parse_with(SGML, &ParseOptions::with_grammar(Grammar::Strict)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedDocument);
    }

    #[test]
    fn test_parse_bytes_matches_parse() {
        assert_eq!(parse_bytes(SGML.as_bytes()).unwrap(), parse(SGML).unwrap());
    }

    #[test]
    fn test_document_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Document>();
        assert_send_sync::<Error>();
    }
}
