//! Разметка тела OFX: лексер, таблица вложенности и дерево элементов.

pub mod builder;
pub mod containment;
pub mod lexer;
pub mod tree;

pub use builder::build;
pub use tree::{Content, ElementId, ElementRef, Tree};
