//! Результат разбора документа.

use crate::grammar::Grammar;
use crate::header::Headers;
use crate::markup::Tree;
use crate::types::{Account, SignOn};

/// Разобранный документ OFX.
///
/// Создается один раз за вызов [`crate::parse`] и далее не изменяется.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub(crate) headers: Headers,
    pub(crate) grammar: Grammar,
    pub(crate) tree: Tree,
    pub(crate) account: Account,
    pub(crate) sign_on: Option<SignOn>,
}

impl Document {
    /// Заголовки в порядке документа.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Грамматика, по которой строилось дерево.
    pub fn grammar(&self) -> Grammar {
        self.grammar
    }

    /// Дерево элементов тела.
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    /// Ответ на вход в систему; `None`, если в документе нет `SONRS`.
    pub fn sign_on(&self) -> Option<&SignOn> {
        self.sign_on.as_ref()
    }

    /// Забирает счет из документа.
    pub fn into_account(self) -> Account {
        self.account
    }
}
