//! Дерево элементов тела OFX.
//!
//! Элементы хранятся в арене и адресуются через [`ElementId`], поэтому ссылка
//! на родителя не владеющая и не создает циклов владения.

use std::fmt;

/// Индекс элемента в арене дерева.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementId(usize);

impl ElementId {
    /// Корневой элемент дерева.
    pub const ROOT: ElementId = ElementId(0);
}

/// Содержимое элемента.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    /// Лист с текстовым значением.
    Text(String),
    /// Агрегат с дочерними элементами (пустой вектор - пустой элемент).
    Children(Vec<ElementId>),
    /// Смешанное содержимое: встречается только там, где разметка
    /// действительно перемешивает текст и дочерние теги.
    Mixed {
        text: String,
        children: Vec<ElementId>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Node {
    name: String,
    content: Content,
    parent: Option<ElementId>,
}

/// Дерево элементов. Корень всегда существует и имеет индекс 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    /// Создает дерево из одного корневого элемента.
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            nodes: vec![Node {
                name: root.into(),
                content: Content::Children(Vec::new()),
                parent: None,
            }],
        }
    }

    pub fn root(&self) -> ElementRef<'_> {
        self.get(ElementId::ROOT)
    }

    /// Число элементов в дереве.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: ElementId) -> ElementRef<'_> {
        ElementRef { tree: self, id }
    }

    /// Добавляет дочерний элемент в конец списка детей `parent`.
    pub(crate) fn push_child(&mut self, parent: ElementId, name: impl Into<String>) -> ElementId {
        let id = ElementId(self.nodes.len());
        self.nodes.push(Node {
            name: name.into(),
            content: Content::Children(Vec::new()),
            parent: Some(parent),
        });

        let content = &mut self.nodes[parent.0].content;
        *content = match std::mem::replace(content, Content::Children(Vec::new())) {
            Content::Children(mut children) => {
                children.push(id);
                Content::Children(children)
            }
            Content::Text(text) => Content::Mixed {
                text,
                children: vec![id],
            },
            Content::Mixed { text, mut children } => {
                children.push(id);
                Content::Mixed { text, children }
            }
        };

        id
    }

    /// Присоединяет текст к элементу; повторный текст добавляется через пробел.
    pub(crate) fn append_text(&mut self, id: ElementId, value: &str) {
        let content = &mut self.nodes[id.0].content;
        *content = match std::mem::replace(content, Content::Children(Vec::new())) {
            Content::Children(children) if children.is_empty() => Content::Text(value.to_string()),
            Content::Children(children) => Content::Mixed {
                text: value.to_string(),
                children,
            },
            Content::Text(text) => Content::Text(format!("{} {}", text, value)),
            Content::Mixed { text, children } => Content::Mixed {
                text: format!("{} {}", text, value),
                children,
            },
        };
    }
}

/// Заимствованное представление элемента дерева.
#[derive(Clone, Copy)]
pub struct ElementRef<'a> {
    tree: &'a Tree,
    id: ElementId,
}

impl<'a> ElementRef<'a> {
    fn node(&self) -> &'a Node {
        &self.tree.nodes[self.id.0]
    }

    pub fn id(&self) -> ElementId {
        self.id
    }

    /// Имя тега.
    pub fn name(&self) -> &'a str {
        &self.node().name
    }

    pub fn content(&self) -> &'a Content {
        &self.node().content
    }

    /// Текстовое значение элемента, если оно есть.
    pub fn text(&self) -> Option<&'a str> {
        match self.content() {
            Content::Text(text) | Content::Mixed { text, .. } => Some(text),
            Content::Children(_) => None,
        }
    }

    pub fn has_text(&self) -> bool {
        self.text().is_some()
    }

    /// Дочерние элементы в порядке документа.
    pub fn children(&self) -> impl Iterator<Item = ElementRef<'a>> + 'a {
        let tree = self.tree;
        let ids: &'a [ElementId] = match self.content() {
            Content::Children(children) | Content::Mixed { children, .. } => children,
            Content::Text(_) => &[],
        };
        ids.iter().map(move |id| tree.get(*id))
    }

    pub fn parent(&self) -> Option<ElementRef<'a>> {
        self.node().parent.map(|id| self.tree.get(id))
    }

    /// Первый дочерний элемент с заданным именем.
    pub fn child(&self, name: &str) -> Option<ElementRef<'a>> {
        self.children().find(|c| c.name() == name)
    }

    /// Текст первого дочернего элемента с заданным именем.
    pub fn child_text(&self, name: &str) -> Option<&'a str> {
        self.child(name).and_then(|c| c.text())
    }

    /// Все дочерние элементы с заданным именем.
    pub fn children_named(&self, name: &'a str) -> impl Iterator<Item = ElementRef<'a>> + 'a {
        self.children().filter(move |c| c.name() == name)
    }

    /// Первый потомок с заданным именем (обход в прямом порядке).
    pub fn descendant(&self, name: &str) -> Option<ElementRef<'a>> {
        self.descendants().find(|e| e.name() == name)
    }

    /// Все потомки элемента в порядке документа, не включая сам элемент.
    pub fn descendants(&self) -> Descendants<'a> {
        let mut stack: Vec<ElementRef<'a>> = self.children().collect();
        stack.reverse();
        Descendants { stack }
    }

    /// Путь от корня, например `OFX/BANKMSGSRSV1/STMTTRNRS`.
    pub fn path(&self) -> String {
        let mut names = vec![self.name()];
        let mut current = self.parent();
        while let Some(element) = current {
            names.push(element.name());
            current = element.parent();
        }
        names.reverse();
        names.join("/")
    }
}

impl fmt::Debug for ElementRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementRef")
            .field("name", &self.name())
            .field("content", self.content())
            .finish()
    }
}

/// Итератор обхода потомков в прямом порядке.
pub struct Descendants<'a> {
    stack: Vec<ElementRef<'a>>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = ElementRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let element = self.stack.pop()?;
        let start = self.stack.len();
        self.stack.extend(element.children());
        self.stack[start..].reverse();
        Some(element)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Tree {
        let mut tree = Tree::new("OFX");
        let root = ElementId::ROOT;
        let list = tree.push_child(root, "BANKTRANLIST");
        let first = tree.push_child(list, "STMTTRN");
        let amount = tree.push_child(first, "TRNAMT");
        tree.append_text(amount, "-80");
        let second = tree.push_child(list, "STMTTRN");
        let name = tree.push_child(second, "NAME");
        tree.append_text(name, "Interest Charge");
        tree
    }

    #[test]
    fn test_children_in_document_order() {
        let tree = sample();
        let list = tree.root().child("BANKTRANLIST").unwrap();
        let names: Vec<&str> = list.children().map(|c| c.name()).collect();
        assert_eq!(names, vec!["STMTTRN", "STMTTRN"]);
        assert_eq!(list.children_named("STMTTRN").count(), 2);
    }

    #[test]
    fn test_descendants_preorder() {
        let tree = sample();
        let names: Vec<&str> = tree.root().descendants().map(|e| e.name()).collect();
        assert_eq!(
            names,
            vec!["BANKTRANLIST", "STMTTRN", "TRNAMT", "STMTTRN", "NAME"]
        );
    }

    #[test]
    fn test_parent_and_path() {
        let tree = sample();
        let amount = tree.root().descendant("TRNAMT").unwrap();
        assert_eq!(amount.text(), Some("-80"));
        assert_eq!(amount.parent().unwrap().name(), "STMTTRN");
        assert_eq!(amount.path(), "OFX/BANKTRANLIST/STMTTRN/TRNAMT");
        assert!(tree.root().parent().is_none());
    }

    #[test]
    fn test_mixed_content() {
        let mut tree = Tree::new("OFX");
        let root = ElementId::ROOT;
        tree.append_text(root, "note");
        tree.push_child(root, "CHILD");

        let root = tree.root();
        assert_eq!(root.text(), Some("note"));
        assert_eq!(root.children().count(), 1);
        assert!(matches!(root.content(), Content::Mixed { .. }));
    }

    #[test]
    fn test_text_is_joined() {
        let mut tree = Tree::new("MEMO");
        let root = ElementId::ROOT;
        tree.append_text(root, "first");
        tree.append_text(root, "second");
        assert_eq!(tree.root().text(), Some("first second"));
    }
}
