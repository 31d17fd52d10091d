//! Таблица вложенности агрегатов OFX.
//!
//! В OFX 1.x листовые теги не закрываются, поэтому конец элемента выводится
//! из того, какие теги может содержать текущий агрегат.

use super::tree::{ElementId, Tree};

/// Таблица "агрегат -> допустимые дочерние теги".
#[derive(Debug)]
pub struct Containment {
    aggregates: &'static [(&'static str, &'static [&'static str])],
}

const STATUS: &[&str] = &["CODE", "SEVERITY", "MESSAGE"];
const ACCT_FROM: &[&str] = &["BANKID", "BRANCHID", "ACCTID", "ACCTTYPE", "ACCTKEY"];
const CC_ACCT_FROM: &[&str] = &["ACCTID", "ACCTKEY"];
const BALANCE: &[&str] = &["BALAMT", "DTASOF"];
const CURRENCY: &[&str] = &["CURRATE", "CURSYM"];

/// Агрегаты банковских и карточных выписок.
pub static OFX_CONTAINMENT: Containment = Containment {
    aggregates: &[
        (
            "OFX",
            &["SIGNONMSGSRSV1", "BANKMSGSRSV1", "CREDITCARDMSGSRSV1"],
        ),
        ("SIGNONMSGSRSV1", &["SONRS"]),
        (
            "SONRS",
            &[
                "STATUS",
                "DTSERVER",
                "USERKEY",
                "TSKEYEXPIRE",
                "LANGUAGE",
                "DTPROFUP",
                "DTACCTUP",
                "FI",
                "SESSCOOKIE",
                "ACCESSKEY",
            ],
        ),
        ("STATUS", STATUS),
        ("FI", &["ORG", "FID"]),
        ("BANKMSGSRSV1", &["STMTTRNRS"]),
        ("STMTTRNRS", &["TRNUID", "STATUS", "CLTCOOKIE", "STMTRS"]),
        (
            "STMTRS",
            &[
                "CURDEF",
                "BANKACCTFROM",
                "BANKTRANLIST",
                "LEDGERBAL",
                "AVAILBAL",
                "CASHADVBALAMT",
                "INTRATE",
                "BALLIST",
                "MKTGINFO",
            ],
        ),
        ("BANKACCTFROM", ACCT_FROM),
        ("BANKACCTTO", ACCT_FROM),
        ("CREDITCARDMSGSRSV1", &["CCSTMTTRNRS"]),
        ("CCSTMTTRNRS", &["TRNUID", "STATUS", "CLTCOOKIE", "CCSTMTRS"]),
        (
            "CCSTMTRS",
            &[
                "CURDEF",
                "CCACCTFROM",
                "BANKTRANLIST",
                "LEDGERBAL",
                "AVAILBAL",
                "CASHADVBALAMT",
                "INTRATEPURCH",
                "INTRATECASH",
                "REWARDINFO",
                "BALLIST",
                "MKTGINFO",
            ],
        ),
        ("CCACCTFROM", CC_ACCT_FROM),
        ("CCACCTTO", CC_ACCT_FROM),
        ("BANKTRANLIST", &["DTSTART", "DTEND", "STMTTRN"]),
        (
            "STMTTRN",
            &[
                "TRNTYPE",
                "DTPOSTED",
                "DTUSER",
                "DTAVAIL",
                "TRNAMT",
                "FITID",
                "CORRECTFITID",
                "CORRECTACTION",
                "SRVRTID",
                "CHECKNUM",
                "REFNUM",
                "SIC",
                "PAYEEID",
                "NAME",
                "EXTDNAME",
                "PAYEE",
                "BANKACCTTO",
                "CCACCTTO",
                "MEMO",
                "IMAGEDATA",
                "CURRENCY",
                "ORIGCURRENCY",
                "INV401KSOURCE",
            ],
        ),
        (
            "PAYEE",
            &[
                "NAME",
                "ADDR1",
                "ADDR2",
                "ADDR3",
                "CITY",
                "STATE",
                "POSTALCODE",
                "COUNTRY",
                "PHONE",
            ],
        ),
        ("CURRENCY", CURRENCY),
        ("ORIGCURRENCY", CURRENCY),
        ("LEDGERBAL", BALANCE),
        ("AVAILBAL", BALANCE),
        ("BALLIST", &["BAL"]),
        (
            "BAL",
            &["NAME", "DESC", "BALTYPE", "VALUE", "DTASOF", "CURRENCY"],
        ),
        ("REWARDINFO", &["NAME", "REWARDBAL", "REWARDEARNED"]),
    ],
};

impl Containment {
    /// Допустимые дочерние теги агрегата, если тег известен как агрегат.
    pub fn children_of(&self, tag: &str) -> Option<&'static [&'static str]> {
        self.aggregates
            .iter()
            .find(|(name, _)| *name == tag)
            .map(|(_, children)| *children)
    }

    /// Известен ли тег таблице - как агрегат или как лист.
    pub fn is_known(&self, tag: &str) -> bool {
        self.aggregates
            .iter()
            .any(|(name, children)| *name == tag || children.contains(&tag))
    }

    /// Известный листовой тег (встречается только как потомок).
    pub fn is_leaf(&self, tag: &str) -> bool {
        self.children_of(tag).is_none() && self.is_known(tag)
    }

    /// Может ли открытый элемент `parent` принять дочерний тег `child`.
    ///
    /// Элемент с уже полученным текстом ничего не содержит. Неизвестные
    /// таблице теги (расширения вроде `INTU.BID`) принимаются любым агрегатом.
    /// Неизвестный элемент не принимает известные листы: они всегда
    /// принадлежат известному агрегату.
    pub fn can_contain(&self, parent: &str, parent_has_text: bool, child: &str) -> bool {
        if parent_has_text || self.is_leaf(parent) {
            return false;
        }

        match self.children_of(parent) {
            Some(children) => children.contains(&child) || !self.is_known(child),
            None => !self.is_known(child) || self.children_of(child).is_some(),
        }
    }
}

/// Сколько элементов с вершины стека нужно неявно закрыть перед открытием `tag`.
///
/// Чистая функция от состояния стека: корень (дно стека) никогда не
/// закрывается неявно.
pub fn implicit_closes(
    table: &Containment,
    tree: &Tree,
    stack: &[ElementId],
    tag: &str,
) -> usize {
    stack
        .iter()
        .skip(1)
        .rev()
        .take_while(|id| {
            let element = tree.get(**id);
            !table.can_contain(element.name(), element.has_text(), tag)
        })
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_tags() {
        assert!(OFX_CONTAINMENT.is_known("STMTTRN"));
        assert!(OFX_CONTAINMENT.is_known("TRNAMT"));
        assert!(!OFX_CONTAINMENT.is_known("INTU.BID"));
        assert!(OFX_CONTAINMENT.is_leaf("MEMO"));
        assert!(!OFX_CONTAINMENT.is_leaf("PAYEE"));
    }

    #[test]
    fn test_can_contain() {
        let t = &OFX_CONTAINMENT;
        assert!(t.can_contain("BANKTRANLIST", false, "STMTTRN"));
        assert!(!t.can_contain("STMTTRN", false, "STMTTRN"));
        assert!(!t.can_contain("MEMO", false, "NAME"));
        assert!(!t.can_contain("UNKNOWN", true, "NAME"));
        assert!(!t.can_contain("UNKNOWN", false, "NAME"));
        assert!(t.can_contain("UNKNOWN", false, "PAYEE"));
        assert!(t.can_contain("UNKNOWN", false, "INTU.BID"));
        assert!(t.can_contain("SONRS", false, "INTU.BID"));
    }

    #[test]
    fn test_name_is_allowed_in_payee_and_transaction() {
        assert!(OFX_CONTAINMENT.can_contain("PAYEE", false, "NAME"));
        assert!(OFX_CONTAINMENT.can_contain("STMTTRN", false, "NAME"));
    }
}
