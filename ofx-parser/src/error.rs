//! Модуль обработки ошибок библиотеки.

use thiserror::Error;

/// Основной тип ошибки библиотеки.
///
/// Каждый вариант соответствует отдельному классу сбоя, чтобы вызывающий код
/// мог отличить "документ не читается" от "документ читается, но в нем нет
/// ожидаемых данных".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Не найдена граница заголовка и тела, ошибка лексера или нарушение
    /// строгой грамматики.
    #[error("Некорректный документ: {0}")]
    MalformedDocument(String),
    /// Дата/время не соответствует грамматике OFX или выходит за допустимые пределы.
    #[error("Некорректная дата: {0}")]
    InvalidDate(String),
    /// Отсутствует обязательный элемент дерева.
    #[error("Отсутствует обязательный элемент: {0}")]
    MissingElement(String),
    /// Числовое поле не разбирается как десятичное число.
    #[error("Некорректная сумма: {0}")]
    InvalidAmount(String),
}

/// Вид ошибки без сопутствующего сообщения.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// См. [`Error::MalformedDocument`].
    MalformedDocument,
    /// См. [`Error::InvalidDate`].
    InvalidDate,
    /// См. [`Error::MissingElement`].
    MissingElement,
    /// См. [`Error::InvalidAmount`].
    InvalidAmount,
}

impl Error {
    /// Возвращает вид ошибки.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::MalformedDocument(_) => ErrorKind::MalformedDocument,
            Error::InvalidDate(_) => ErrorKind::InvalidDate,
            Error::MissingElement(_) => ErrorKind::MissingElement,
            Error::InvalidAmount(_) => ErrorKind::InvalidAmount,
        }
    }

    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Error::MalformedDocument(msg.into())
    }

    pub(crate) fn missing(path: impl Into<String>) -> Self {
        Error::MissingElement(path.into())
    }
}

/// Тип Result с ошибкой библиотеки.
pub type Result<T> = std::result::Result<T, Error>;
