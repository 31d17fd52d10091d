//! Построение дерева элементов по лексемам тела.

use super::containment::implicit_closes;
use super::lexer::{Lexer, Spanned, Token};
use super::tree::{ElementId, Tree};
use crate::error::{Error, Result};
use crate::grammar::Grammar;

/// Строит дерево элементов из тела документа по выбранной грамматике.
pub fn build(body: &str, grammar: Grammar) -> Result<Tree> {
    let mut builder = Builder::new(grammar);
    for spanned in Lexer::new(body) {
        builder.feed(spanned?)?;
    }
    builder.finish()
}

struct Builder {
    grammar: Grammar,
    tree: Option<Tree>,
    stack: Vec<ElementId>,
}

impl Builder {
    fn new(grammar: Grammar) -> Self {
        Self {
            grammar,
            tree: None,
            stack: Vec::new(),
        }
    }

    fn feed(&mut self, spanned: Spanned<'_>) -> Result<()> {
        let offset = spanned.offset;
        match spanned.token {
            Token::Open(name) => self.open(name, offset, true),
            Token::SelfClosing(name) => self.open(name, offset, false),
            Token::Close(name) => self.close(name, offset),
            Token::Text(text) => self.text(&text, offset),
        }
    }

    fn open(&mut self, name: &str, offset: usize, push: bool) -> Result<()> {
        let Some(tree) = self.tree.as_mut() else {
            self.tree = Some(Tree::new(name));
            if push {
                self.stack.push(ElementId::ROOT);
            }
            return Ok(());
        };

        if self.stack.is_empty() {
            return Err(Error::malformed(format!(
                "второй корневой элемент <{}> (смещение {})",
                name, offset
            )));
        }

        if let Some(table) = self.grammar.containment() {
            let closes = implicit_closes(table, tree, &self.stack, name);
            self.stack.truncate(self.stack.len() - closes);
        }

        let parent = *self.stack.last().unwrap_or(&ElementId::ROOT);
        let id = tree.push_child(parent, name);
        if push {
            self.stack.push(id);
        }
        Ok(())
    }

    fn close(&mut self, name: &str, offset: usize) -> Result<()> {
        let Some(tree) = self.tree.as_ref() else {
            return Err(Error::malformed(format!(
                "закрывающий тег </{}> до корневого элемента (смещение {})",
                name, offset
            )));
        };

        let position = self
            .stack
            .iter()
            .rposition(|id| tree.get(*id).name() == name);

        match self.grammar {
            Grammar::Strict => {
                let top = self.stack.last().map(|id| tree.get(*id).name());
                if top != Some(name) {
                    return Err(Error::malformed(format!(
                        "закрывающий тег </{}> не соответствует открытому <{}> (смещение {})",
                        name,
                        top.unwrap_or_default(),
                        offset
                    )));
                }
                self.stack.pop();
            }
            Grammar::Tolerant => match position {
                Some(index) => self.stack.truncate(index),
                None => {
                    tracing::warn!(tag = name, offset, "пропущен закрывающий тег без пары");
                }
            },
        }

        Ok(())
    }

    fn text(&mut self, value: &str, offset: usize) -> Result<()> {
        match (self.tree.as_mut(), self.stack.last()) {
            (Some(tree), Some(top)) => {
                tree.append_text(*top, value);
                Ok(())
            }
            _ if self.grammar.is_tolerant() => {
                tracing::warn!(offset, "пропущен текст вне корневого элемента");
                Ok(())
            }
            _ => Err(Error::malformed(format!(
                "текст вне корневого элемента (смещение {})",
                offset
            ))),
        }
    }

    fn finish(self) -> Result<Tree> {
        let tree = self
            .tree
            .ok_or_else(|| Error::malformed("тело документа не содержит элементов"))?;

        if self.grammar == Grammar::Strict && !self.stack.is_empty() {
            let open: Vec<&str> = self.stack.iter().map(|id| tree.get(*id).name()).collect();
            return Err(Error::malformed(format!(
                "незакрытые элементы в конце документа: {}",
                open.join("/")
            )));
        }

        tracing::debug!(
            elements = tree.len(),
            grammar = %self.grammar,
            "дерево элементов построено"
        );
        Ok(tree)
    }
}
