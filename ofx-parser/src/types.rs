//! Доменные сущности банковской выписки OFX.

use crate::date::ParsedDate;
use rust_decimal::Decimal;
use std::fmt;

// =============================================================================
// Коды OFX
// =============================================================================

/// Тип счета (`ACCTTYPE`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountType {
    Checking,
    Savings,
    MoneyMarket,
    CreditLine,
    Cd,
    /// Карточный счет (`CCACCTFROM` не содержит `ACCTTYPE`).
    CreditCard,
    /// Код вне стандартного списка OFX.
    Other(String),
}

impl AccountType {
    /// Создает тип счета из кода OFX.
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_uppercase().as_str() {
            "CHECKING" => AccountType::Checking,
            "SAVINGS" => AccountType::Savings,
            "MONEYMRKT" => AccountType::MoneyMarket,
            "CREDITLINE" => AccountType::CreditLine,
            "CD" => AccountType::Cd,
            "CREDITCARD" => AccountType::CreditCard,
            _ => AccountType::Other(code.trim().to_string()),
        }
    }

    /// Код OFX.
    pub fn code(&self) -> &str {
        match self {
            AccountType::Checking => "CHECKING",
            AccountType::Savings => "SAVINGS",
            AccountType::MoneyMarket => "MONEYMRKT",
            AccountType::CreditLine => "CREDITLINE",
            AccountType::Cd => "CD",
            AccountType::CreditCard => "CREDITCARD",
            AccountType::Other(code) => code,
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Тип транзакции (`TRNTYPE`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionType {
    Credit,
    Debit,
    Interest,
    Dividend,
    Fee,
    ServiceCharge,
    Deposit,
    Atm,
    PointOfSale,
    Transfer,
    Check,
    Payment,
    Cash,
    DirectDeposit,
    DirectDebit,
    RepeatPayment,
    Hold,
    Other,
    /// Код вне списка OFX.
    Unknown(String),
}

impl TransactionType {
    /// Создает тип транзакции из кода OFX.
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_uppercase().as_str() {
            "CREDIT" => TransactionType::Credit,
            "DEBIT" => TransactionType::Debit,
            "INT" => TransactionType::Interest,
            "DIV" => TransactionType::Dividend,
            "FEE" => TransactionType::Fee,
            "SRVCHG" => TransactionType::ServiceCharge,
            "DEP" => TransactionType::Deposit,
            "ATM" => TransactionType::Atm,
            "POS" => TransactionType::PointOfSale,
            "XFER" => TransactionType::Transfer,
            "CHECK" => TransactionType::Check,
            "PAYMENT" => TransactionType::Payment,
            "CASH" => TransactionType::Cash,
            "DIRECTDEP" => TransactionType::DirectDeposit,
            "DIRECTDEBIT" => TransactionType::DirectDebit,
            "REPEATPMT" => TransactionType::RepeatPayment,
            "HOLD" => TransactionType::Hold,
            "OTHER" => TransactionType::Other,
            _ => TransactionType::Unknown(code.trim().to_string()),
        }
    }

    /// Код OFX.
    pub fn code(&self) -> &str {
        match self {
            TransactionType::Credit => "CREDIT",
            TransactionType::Debit => "DEBIT",
            TransactionType::Interest => "INT",
            TransactionType::Dividend => "DIV",
            TransactionType::Fee => "FEE",
            TransactionType::ServiceCharge => "SRVCHG",
            TransactionType::Deposit => "DEP",
            TransactionType::Atm => "ATM",
            TransactionType::PointOfSale => "POS",
            TransactionType::Transfer => "XFER",
            TransactionType::Check => "CHECK",
            TransactionType::Payment => "PAYMENT",
            TransactionType::Cash => "CASH",
            TransactionType::DirectDeposit => "DIRECTDEP",
            TransactionType::DirectDebit => "DIRECTDEBIT",
            TransactionType::RepeatPayment => "REPEATPMT",
            TransactionType::Hold => "HOLD",
            TransactionType::Other => "OTHER",
            TransactionType::Unknown(code) => code,
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// =============================================================================
// Структуры данных
// =============================================================================

/// Баланс счета.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Balance {
    /// Сумма баланса (`BALAMT`).
    pub amount: Decimal,
    /// Дата, на которую рассчитан баланс (`DTASOF`).
    pub as_of: Option<ParsedDate>,
}

/// Банковская транзакция (`STMTTRN`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    /// Сумма со знаком как в документе: списания отрицательные.
    pub amount: Decimal,
    /// Идентификатор транзакции в банке (`FITID`).
    pub fit_id: String,
    /// Дата проводки (`DTPOSTED`).
    pub posted_at: ParsedDate,
    /// Дата совершения операции клиентом (`DTUSER`).
    pub occurred_at: Option<ParsedDate>,
    /// Примечание; пустая строка, если отсутствует.
    pub memo: String,
    /// Получатель/описание; пустая строка, если отсутствует.
    pub name: String,
    pub kind: TransactionType,
    /// Номер чека (`CHECKNUM`).
    pub check_number: Option<String>,
    /// Референс (`REFNUM`).
    pub ref_number: Option<String>,
    /// Код категории (`SIC`).
    pub sic: Option<String>,
}

/// Счет вместе с транзакциями и балансами выписки.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    /// Идентификатор банка (`BANKID`); у карточных счетов отсутствует.
    pub bank_id: Option<String>,
    /// Идентификатор отделения (`BRANCHID`).
    pub branch_id: Option<String>,
    /// Номер счета (`ACCTID`).
    pub id: String,
    pub kind: AccountType,
    /// Валюта выписки по умолчанию (`CURDEF`).
    pub currency: Option<String>,
    /// Период выписки (`DTSTART`, `DTEND`).
    pub period: Option<(ParsedDate, ParsedDate)>,
    /// Транзакции в порядке документа.
    pub transactions: Vec<Transaction>,
    /// Бухгалтерский баланс (`LEDGERBAL`).
    pub balance: Option<Balance>,
    /// Доступный баланс (`AVAILBAL`).
    pub available_balance: Option<Balance>,
}

/// Ответ на вход в систему (`SONRS`).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SignOn {
    /// Код статуса (`STATUS/CODE`), 0 - успех.
    pub status_code: Option<String>,
    /// Важность статуса (`STATUS/SEVERITY`).
    pub severity: Option<String>,
    /// Время сервера (`DTSERVER`).
    pub server_time: Option<ParsedDate>,
    pub language: Option<String>,
    /// Организация (`FI/ORG`).
    pub fi_org: Option<String>,
    /// Идентификатор организации (`FI/FID`).
    pub fi_id: Option<String>,
}
