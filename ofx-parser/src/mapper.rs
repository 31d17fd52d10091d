//! Отображение дерева элементов в доменные сущности.
//!
//! Сообщения ошибок содержат путь к элементу от корня. Транзакции
//! нумеруются с единицы: `OFX/.../BANKTRANLIST/STMTTRN[2]/TRNAMT`.

use crate::amount::parse_amount;
use crate::date::{self, ParsedDate};
use crate::error::{Error, Result};
use crate::markup::{ElementRef, Tree};
use crate::types::{Account, AccountType, Balance, SignOn, Transaction, TransactionType};
use rust_decimal::Decimal;

/// Выписка по банковскому счету.
pub const TAG_BANK_STATEMENT: &str = "STMTRS";
/// Выписка по карточному счету.
pub const TAG_CARD_STATEMENT: &str = "CCSTMTRS";
pub const TAG_BANK_ACCOUNT: &str = "BANKACCTFROM";
pub const TAG_CARD_ACCOUNT: &str = "CCACCTFROM";
pub const TAG_TRANSACTION_LIST: &str = "BANKTRANLIST";
pub const TAG_TRANSACTION: &str = "STMTTRN";
pub const TAG_SIGN_ON: &str = "SONRS";

/// Находит первую выписку в дереве и строит по ней счет.
pub fn map_account(tree: &Tree) -> Result<Account> {
    let statement = tree
        .root()
        .descendants()
        .find(|e| e.name() == TAG_BANK_STATEMENT || e.name() == TAG_CARD_STATEMENT)
        .ok_or_else(|| Error::missing(TAG_BANK_STATEMENT))?;
    let fields = Fields::new(statement);

    let mut account = if statement.name() == TAG_CARD_STATEMENT {
        map_card_account(&fields)?
    } else {
        map_bank_account(&fields)?
    };

    let list = Fields::new(fields.required(TAG_TRANSACTION_LIST)?);

    account.period = match (list.element.child("DTSTART"), list.element.child("DTEND")) {
        (Some(_), Some(_)) => Some((list.required_date("DTSTART")?, list.required_date("DTEND")?)),
        _ => None,
    };

    account.transactions = list
        .element
        .children_named(TAG_TRANSACTION)
        .enumerate()
        .map(|(index, element)| map_transaction(Fields::indexed(element, index)))
        .collect::<Result<Vec<_>>>()?;

    account.balance = map_balance(&fields, "LEDGERBAL")?;
    account.available_balance = map_balance(&fields, "AVAILBAL")?;

    tracing::debug!(
        account = %account.id,
        kind = %account.kind,
        transactions = account.transactions.len(),
        "выписка разобрана"
    );

    Ok(account)
}

/// Извлекает ответ на вход в систему, если он есть в документе.
pub fn map_sign_on(tree: &Tree) -> Result<Option<SignOn>> {
    let Some(sonrs) = tree.root().descendant(TAG_SIGN_ON) else {
        return Ok(None);
    };
    let fields = Fields::new(sonrs);
    let status = sonrs.child("STATUS").map(Fields::new);
    let fi = sonrs.child("FI").map(Fields::new);

    Ok(Some(SignOn {
        status_code: status.as_ref().and_then(|s| s.optional("CODE")),
        severity: status.as_ref().and_then(|s| s.optional("SEVERITY")),
        server_time: fields.optional_date("DTSERVER")?,
        language: fields.optional("LANGUAGE"),
        fi_org: fi.as_ref().and_then(|f| f.optional("ORG")),
        fi_id: fi.as_ref().and_then(|f| f.optional("FID")),
    }))
}

fn map_bank_account(statement: &Fields<'_>) -> Result<Account> {
    let from = Fields::new(statement.required(TAG_BANK_ACCOUNT)?);

    Ok(Account {
        bank_id: from.optional("BANKID"),
        branch_id: from.optional("BRANCHID"),
        id: from.required_text("ACCTID")?.to_string(),
        kind: AccountType::from_code(from.required_text("ACCTTYPE")?),
        currency: statement.optional("CURDEF"),
        period: None,
        transactions: Vec::new(),
        balance: None,
        available_balance: None,
    })
}

fn map_card_account(statement: &Fields<'_>) -> Result<Account> {
    let from = Fields::new(statement.required(TAG_CARD_ACCOUNT)?);

    Ok(Account {
        bank_id: None,
        branch_id: None,
        id: from.required_text("ACCTID")?.to_string(),
        kind: AccountType::CreditCard,
        currency: statement.optional("CURDEF"),
        period: None,
        transactions: Vec::new(),
        balance: None,
        available_balance: None,
    })
}

fn map_transaction(trn: Fields<'_>) -> Result<Transaction> {
    // NAME бывает прямо в транзакции или внутри PAYEE.
    let name = trn
        .optional("NAME")
        .or_else(|| {
            trn.element
                .child("PAYEE")
                .and_then(|payee| payee.child_text("NAME"))
                .map(str::to_string)
        })
        .unwrap_or_default();

    Ok(Transaction {
        amount: trn.required_amount("TRNAMT")?,
        fit_id: trn.required_text("FITID")?.to_string(),
        posted_at: trn.required_date("DTPOSTED")?,
        occurred_at: trn.optional_date("DTUSER")?,
        memo: trn.optional("MEMO").unwrap_or_default(),
        name,
        kind: TransactionType::from_code(trn.required_text("TRNTYPE")?),
        check_number: trn.optional("CHECKNUM"),
        ref_number: trn.optional("REFNUM"),
        sic: trn.optional("SIC"),
    })
}

fn map_balance(statement: &Fields<'_>, tag: &str) -> Result<Option<Balance>> {
    let Some(element) = statement.element.child(tag) else {
        return Ok(None);
    };
    let balance = Fields::new(element);

    Ok(Some(Balance {
        amount: balance.required_amount("BALAMT")?,
        as_of: balance.optional_date("DTASOF")?,
    }))
}

/// Доступ к дочерним полям агрегата с путем для сообщений об ошибках.
struct Fields<'a> {
    element: ElementRef<'a>,
    path: String,
}

impl<'a> Fields<'a> {
    fn new(element: ElementRef<'a>) -> Self {
        Self {
            element,
            path: element.path(),
        }
    }

    /// Повторяющийся агрегат: к имени добавляется номер (с единицы).
    fn indexed(element: ElementRef<'a>, index: usize) -> Self {
        Self {
            element,
            path: format!("{}[{}]", element.path(), index + 1),
        }
    }

    fn path_of(&self, tag: &str) -> String {
        format!("{}/{}", self.path, tag)
    }

    fn required(&self, tag: &str) -> Result<ElementRef<'a>> {
        self.element
            .child(tag)
            .ok_or_else(|| Error::missing(self.path_of(tag)))
    }

    /// Текст обязательного элемента; пустой элемент дает пустую строку.
    fn required_text(&self, tag: &str) -> Result<&'a str> {
        Ok(self.required(tag)?.text().unwrap_or_default())
    }

    /// Отсутствующий и пустой элементы дают `None`.
    fn optional(&self, tag: &str) -> Option<String> {
        self.element.child_text(tag).map(str::to_string)
    }

    fn required_amount(&self, tag: &str) -> Result<Decimal> {
        parse_amount(self.required_text(tag)?).map_err(|err| self.locate(err, tag))
    }

    fn required_date(&self, tag: &str) -> Result<ParsedDate> {
        date::parse(self.required_text(tag)?).map_err(|err| self.locate(err, tag))
    }

    fn optional_date(&self, tag: &str) -> Result<Option<ParsedDate>> {
        self.element
            .child_text(tag)
            .map(|value| date::parse(value).map_err(|err| self.locate(err, tag)))
            .transpose()
    }

    fn locate(&self, err: Error, tag: &str) -> Error {
        let path = self.path_of(tag);
        match err {
            Error::InvalidDate(msg) => Error::InvalidDate(format!("{}: {}", path, msg)),
            Error::InvalidAmount(msg) => Error::InvalidAmount(format!("{}: {}", path, msg)),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Grammar;
    use crate::markup::build;
    use rust_decimal_macros::dec;

    fn tree(body: &str) -> Tree {
        build(body, Grammar::Tolerant).unwrap()
    }

    const BANK: &str = "<OFX><BANKMSGSRSV1><STMTTRNRS><STMTRS>
<CURDEF>USD
<BANKACCTFROM><BANKID>121099999<BRANCHID>01<ACCTID>999988<ACCTTYPE>CHECKING</BANKACCTFROM>
<BANKTRANLIST><DTSTART>20240101<DTEND>20240131
<STMTTRN><TRNTYPE>DEBIT<DTPOSTED>20240105<DTUSER>20240104<TRNAMT>-12.34<FITID>A1<NAME>Coffee<MEMO>Morning
<STMTTRN><TRNTYPE>CHECK<DTPOSTED>20240110<TRNAMT>-100<FITID>A2<CHECKNUM>1042<PAYEE><NAME>Landlord</PAYEE>
</BANKTRANLIST>
<LEDGERBAL><BALAMT>1000.50<DTASOF>20240131
<AVAILBAL><BALAMT>900</AVAILBAL>
</STMTRS></STMTTRNRS></BANKMSGSRSV1></OFX>";

    fn statement_with(transactions: &str) -> String {
        format!(
            "<OFX><STMTRS><BANKACCTFROM><ACCTID>1<ACCTTYPE>SAVINGS</BANKACCTFROM>
<BANKTRANLIST>{}</BANKTRANLIST></STMTRS></OFX>",
            transactions
        )
    }

    #[test]
    fn test_map_bank_account() {
        let account = map_account(&tree(BANK)).unwrap();

        assert_eq!(account.bank_id.as_deref(), Some("121099999"));
        assert_eq!(account.branch_id.as_deref(), Some("01"));
        assert_eq!(account.id, "999988");
        assert_eq!(account.kind, AccountType::Checking);
        assert_eq!(account.currency.as_deref(), Some("USD"));
        assert!(account.period.is_some());
        assert_eq!(account.transactions.len(), 2);

        let balance = account.balance.unwrap();
        assert_eq!(balance.amount, dec!(1000.50));
        assert!(balance.as_of.is_some());
        let available = account.available_balance.unwrap();
        assert_eq!(available.amount, dec!(900));
        assert!(available.as_of.is_none());
    }

    #[test]
    fn test_map_transaction_fields() {
        let account = map_account(&tree(BANK)).unwrap();

        let first = &account.transactions[0];
        assert_eq!(first.amount, dec!(-12.34));
        assert_eq!(first.fit_id, "A1");
        assert_eq!(first.name, "Coffee");
        assert_eq!(first.memo, "Morning");
        assert_eq!(first.kind, TransactionType::Debit);
        assert!(first.occurred_at.is_some());

        let second = &account.transactions[1];
        assert_eq!(second.name, "Landlord");
        assert_eq!(second.memo, "");
        assert_eq!(second.kind, TransactionType::Check);
        assert_eq!(second.check_number.as_deref(), Some("1042"));
        assert!(second.occurred_at.is_none());
    }

    #[test]
    fn test_map_credit_card_account() {
        let account = map_account(&tree(
            "<OFX><CREDITCARDMSGSRSV1><CCSTMTTRNRS><CCSTMTRS><CURDEF>EUR
<CCACCTFROM><ACCTID>4111</CCACCTFROM>
<BANKTRANLIST></BANKTRANLIST>
</CCSTMTRS></CCSTMTTRNRS></CREDITCARDMSGSRSV1></OFX>",
        ))
        .unwrap();

        assert_eq!(account.kind, AccountType::CreditCard);
        assert_eq!(account.bank_id, None);
        assert_eq!(account.id, "4111");
        assert_eq!(account.currency.as_deref(), Some("EUR"));
        assert!(account.transactions.is_empty());
    }

    #[test]
    fn test_missing_statement() {
        let err = map_account(&tree(
            "<OFX><SIGNONMSGSRSV1><SONRS></SONRS></SIGNONMSGSRSV1></OFX>",
        ))
        .unwrap_err();
        assert_eq!(err, Error::MissingElement("STMTRS".to_string()));
    }

    #[test]
    fn test_missing_account_id() {
        let err = map_account(&tree(
            "<OFX><STMTRS><BANKACCTFROM><ACCTTYPE>SAVINGS</BANKACCTFROM><BANKTRANLIST></BANKTRANLIST></STMTRS></OFX>",
        ))
        .unwrap_err();
        assert_eq!(
            err,
            Error::MissingElement("OFX/STMTRS/BANKACCTFROM/ACCTID".to_string())
        );
    }

    #[test]
    fn test_missing_transaction_list() {
        let err = map_account(&tree(
            "<OFX><STMTRS><BANKACCTFROM><ACCTID>1<ACCTTYPE>SAVINGS</BANKACCTFROM></STMTRS></OFX>",
        ))
        .unwrap_err();
        assert_eq!(
            err,
            Error::MissingElement("OFX/STMTRS/BANKTRANLIST".to_string())
        );
    }

    #[test]
    fn test_empty_transaction_list() {
        let account = map_account(&tree(&statement_with(""))).unwrap();
        assert!(account.transactions.is_empty());
        assert!(account.period.is_none());
        assert!(account.balance.is_none());
    }

    #[test]
    fn test_missing_field_reports_position() {
        let err = map_account(&tree(&statement_with(
            "<STMTTRN><TRNTYPE>DEBIT<DTPOSTED>20240105<TRNAMT>1<FITID>X</STMTTRN>
<STMTTRN><TRNTYPE>DEBIT<DTPOSTED>20240105<FITID>Y</STMTTRN>",
        )))
        .unwrap_err();
        assert_eq!(
            err,
            Error::MissingElement("OFX/STMTRS/BANKTRANLIST/STMTTRN[2]/TRNAMT".to_string())
        );
    }

    #[test]
    fn test_invalid_amount() {
        let err = map_account(&tree(&statement_with(
            "<STMTTRN><TRNTYPE>DEBIT<DTPOSTED>20240105<TRNAMT>1,50<FITID>X",
        )))
        .unwrap_err();
        match err {
            Error::InvalidAmount(msg) => assert!(msg.contains("STMTTRN[1]/TRNAMT")),
            other => panic!("ожидалась ошибка суммы, получено {:?}", other),
        }
    }

    #[test]
    fn test_invalid_date() {
        let err = map_account(&tree(&statement_with(
            "<STMTTRN><TRNTYPE>DEBIT<DTPOSTED>2024-01-05<TRNAMT>1.50<FITID>X",
        )))
        .unwrap_err();
        match err {
            Error::InvalidDate(msg) => assert!(msg.contains("STMTTRN[1]/DTPOSTED")),
            other => panic!("ожидалась ошибка даты, получено {:?}", other),
        }
    }

    #[test]
    fn test_map_sign_on() {
        let sign_on = map_sign_on(&tree(
            "<OFX><SIGNONMSGSRSV1><SONRS><STATUS><CODE>0<SEVERITY>INFO</STATUS>
<DTSERVER>20240201120000[-5:EST]<LANGUAGE>ENG<FI><ORG>Bank<FID>1001</FI></SONRS></SIGNONMSGSRSV1></OFX>",
        ))
        .unwrap()
        .unwrap();

        assert_eq!(sign_on.status_code.as_deref(), Some("0"));
        assert_eq!(sign_on.severity.as_deref(), Some("INFO"));
        assert_eq!(sign_on.language.as_deref(), Some("ENG"));
        assert_eq!(sign_on.fi_org.as_deref(), Some("Bank"));
        assert_eq!(sign_on.fi_id.as_deref(), Some("1001"));
        assert_eq!(sign_on.server_time.unwrap().offset_minutes(), -300);
    }

    #[test]
    fn test_sign_on_absent() {
        assert_eq!(map_sign_on(&tree("<OFX></OFX>")).unwrap(), None);
    }
}
