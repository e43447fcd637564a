use bigdecimal::BigDecimal;
use regex::Regex;
use std::str::FromStr;

use crate::config::FeeConfig;
use crate::models::{CandidateAmount, RawTextBlock};

pub const KEYS_FEE: &str = "Keys Fee";

/// 匹配模式族. 评估顺序固定, 同一金额被多个族重复命中是预期行为, 交给去重处理.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternFamily {
    /// "$45.00"
    CurrencyPrefixed,
    /// "45 dollars"
    SpelledDollars,
    /// "approved fee of $45"
    ExplicitlyApproved,
    /// "45 fee" / "45.00 paid"
    KeywordAdjacent,
    /// "cost of 45" / "fee is 45"
    CostOf,
    /// "authorized for 45"
    Authorization,
    /// "push to start key made for $45"
    KeyPhrase,
}

impl PatternFamily {
    pub const ORDER: [PatternFamily; 7] = [
        PatternFamily::CurrencyPrefixed,
        PatternFamily::SpelledDollars,
        PatternFamily::ExplicitlyApproved,
        PatternFamily::KeywordAdjacent,
        PatternFamily::CostOf,
        PatternFamily::Authorization,
        PatternFamily::KeyPhrase,
    ];

    fn patterns(self) -> &'static [&'static str] {
        match self {
            PatternFamily::CurrencyPrefixed => &[r"\$\s*([0-9,]+(?:\.[0-9]{2})?)"],
            PatternFamily::SpelledDollars => &[r"(?i)([0-9,]+(?:\.[0-9]{2})?)\s*dollars"],
            PatternFamily::ExplicitlyApproved => &[
                r"(?i)approved\s+(?:fee|amount|payment|cost|charge)s?\s+(?:of|for|:)?\s*\$?\s*([0-9,]+(?:\.[0-9]{2})?)",
            ],
            PatternFamily::KeywordAdjacent => {
                &[r"(?i)\b(\d+(?:,\d+)*(?:\.\d+)?)\s*(?:fee|charge|payment|paid|cost|invoice)"]
            }
            PatternFamily::CostOf => {
                &[r"(?i)(?:cost|fee|charge)s?\s+(?:of|is|:)\s*(\d+(?:,\d+)*(?:\.\d+)?)"]
            }
            PatternFamily::Authorization => {
                &[r"(?i)(?:authorized|approved|auth\.?)(?:\s+(?:for|to|:))?\s*(\d+(?:,\d+)*(?:\.\d+)?)"]
            }
            PatternFamily::KeyPhrase => &[
                r"(?i)(?:key made|push to start key|push key|would like a.*?key).*?(?:for)?\s*\$\s*([0-9,]+(?:\.[0-9]{2})?)",
                r"(?i)(?:vehicle|car).*?(?:key|push).*?(?:for)?\s*\$\s*([0-9,]+(?:\.[0-9]{2})?)",
                r"(?i)(?:advise|please).*?(?:key|push).*?(?:for)?\s*\$\s*([0-9,]+(?:\.[0-9]{2})?)",
            ],
        }
    }

    fn explicitly_approved(self) -> bool {
        matches!(
            self,
            PatternFamily::ExplicitlyApproved | PatternFamily::Authorization
        )
    }
}

/// 上下文关键字 -> 类型提示, 按顺序取第一个命中
const HINT_LEXICON: &[(&str, &[&str])] = &[
    ("Mileage/ Fuel", &["mile", "travel", "distance", "fuel", "gas"]),
    ("Flatbed Fees", &["flatbed", "flat bed", "tow", "winch", "rollback"]),
    ("Storage Fee", &["storage", "impound", "lot fee"]),
    (
        "CR AND PHOTOS FEE",
        &["condition report", "photo", "picture", "inspection"],
    ),
    ("Purchase Cost", &["purchase", "expense"]),
    ("Fee To Client", &["client"]),
];

const FEE_KEYWORDS: &[&str] = &[
    "fee", "payment", "amount", "charge", "paid", "invoice", "cost", "approved", "auth", "tow",
    "repo", "storage", "service", "transport", "mileage", "recovery", "dollars",
];

const WEAK_FEE_KEYWORDS: &[&str] = &["total", "key", "admin", "processing"];

struct CompiledFamily {
    family: PatternFamily,
    regexes: Vec<Regex>,
}

/// 文本金额抽取器, 正则只编译一次
pub struct TextFeeExtractor {
    families: Vec<CompiledFamily>,
    cr_word: Regex,
    digit: Regex,
    context_window: usize,
    max_block_chars: usize,
}

impl TextFeeExtractor {
    pub fn new(config: &FeeConfig) -> Result<Self, regex::Error> {
        let mut families = Vec::with_capacity(PatternFamily::ORDER.len());
        for family in PatternFamily::ORDER {
            let regexes = family
                .patterns()
                .iter()
                .map(|p| Regex::new(p))
                .collect::<Result<Vec<_>, _>>()?;
            families.push(CompiledFamily { family, regexes });
        }
        Ok(Self {
            families,
            cr_word: Regex::new(r"(?i)\bcr\b")?,
            digit: Regex::new(r"\d")?,
            context_window: config.context_window,
            max_block_chars: config.max_block_chars,
        })
    }

    /// 快速判断文本是否与费用相关
    pub fn is_fee_related(&self, text: &str) -> bool {
        if text.contains('$') {
            return true;
        }
        let lower = text.to_lowercase();
        if FEE_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
            return true;
        }
        WEAK_FEE_KEYWORDS.iter().any(|kw| lower.contains(kw)) && self.digit.is_match(&lower)
    }

    /// 块级审批标记
    pub fn block_mentions_approval(&self, block: &RawTextBlock) -> bool {
        let lower = block.content.to_lowercase();
        lower.contains("approved") || lower.contains("authorization") || lower.contains("authorize")
    }

    /// 按固定顺序对文本块应用所有模式族
    pub fn extract(&self, block: &RawTextBlock) -> Vec<CandidateAmount> {
        let content = block.content.as_str();
        if content.trim().is_empty() || content.chars().count() > self.max_block_chars {
            return Vec::new();
        }
        if !self.is_fee_related(content) {
            return Vec::new();
        }

        let forced_keys = explicit_mentions_key(block);
        let mut amounts = Vec::new();

        for compiled in &self.families {
            for re in &compiled.regexes {
                for caps in re.captures_iter(content) {
                    let (Some(whole), Some(value)) = (caps.get(0), caps.get(1)) else {
                        continue;
                    };
                    let Some(amount) = parse_amount(value.as_str()) else {
                        tracing::trace!("Skipping malformed amount '{}'", value.as_str());
                        continue;
                    };
                    let context = context_window(content, whole.start(), whole.end(), self.context_window);
                    let type_hint = self.type_hint(forced_keys, &context, compiled.family);
                    if let Some(candidate) = CandidateAmount::new(
                        amount,
                        context,
                        compiled.family.explicitly_approved(),
                        type_hint,
                    ) {
                        amounts.push(candidate);
                    }
                }
            }
        }

        if !amounts.is_empty() {
            tracing::debug!(
                "Extracted {} amounts from {:?} block dated '{}'",
                amounts.len(),
                block.provenance,
                block.date
            );
        }
        amounts
    }

    /// 钥匙规则优先级最高, 其次是上下文词典
    fn type_hint(&self, forced_keys: bool, context: &str, family: PatternFamily) -> Option<String> {
        let lower = context.to_lowercase();
        if forced_keys || family == PatternFamily::KeyPhrase || mentions_key(&lower) {
            return Some(KEYS_FEE.to_string());
        }
        if self.cr_word.is_match(&lower) {
            return Some("CR AND PHOTOS FEE".to_string());
        }
        HINT_LEXICON
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|kw| lower.contains(kw)))
            .map(|(hint, _)| hint.to_string())
    }
}

fn mentions_key(lower: &str) -> bool {
    lower.contains("key") || lower.contains("push")
}

fn explicit_mentions_key(block: &RawTextBlock) -> bool {
    [&block.explicit_type, &block.explicit_label]
        .into_iter()
        .flatten()
        .any(|s| mentions_key(&s.to_lowercase()))
}

/// 去千分位逗号后解析; 非数字或非正数返回 None
pub fn parse_amount(raw: &str) -> Option<BigDecimal> {
    let cleaned: String = raw.chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() || !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    BigDecimal::from_str(&cleaned)
        .ok()
        .filter(|a| *a > BigDecimal::from(0))
}

/// 匹配位置两侧各取 width 个字符
pub fn context_window(text: &str, start: usize, end: usize, width: usize) -> String {
    let before: Vec<(usize, char)> = text[..start].char_indices().collect();
    let from = match before.len().checked_sub(width) {
        Some(skip) => before.get(skip).map_or(start, |(i, _)| *i),
        None => 0,
    };
    let to = text[end..]
        .char_indices()
        .nth(width)
        .map(|(i, _)| end + i)
        .unwrap_or(text.len());
    text[from..to].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Provenance;

    fn extractor() -> TextFeeExtractor {
        TextFeeExtractor::new(&FeeConfig::default()).unwrap()
    }

    fn amounts(xs: &[CandidateAmount]) -> Vec<String> {
        xs.iter().map(|c| c.amount.with_scale(2).to_string()).collect()
    }

    #[test]
    fn push_to_start_key_is_hinted_as_keys_fee() {
        let block = RawTextBlock::new(
            "push to start key made for $45.00 on the vehicle",
            Provenance::UpdateLog,
        );
        let found = extractor().extract(&block);
        assert!(!found.is_empty());
        for c in &found {
            assert_eq!(c.amount, BigDecimal::from_str("45.00").unwrap());
            assert_eq!(c.type_hint.as_deref(), Some(KEYS_FEE));
        }
    }

    #[test]
    fn overlapping_families_each_yield_a_candidate() {
        let block = RawTextBlock::new(
            "Client approved fee of $150.00 for storage",
            Provenance::UpdateLog,
        );
        let found = extractor().extract(&block);
        // CurrencyPrefixed 与 ExplicitlyApproved 都命中同一金额
        assert_eq!(amounts(&found), vec!["150.00", "150.00"]);
        assert!(!found[0].explicitly_approved);
        assert!(found[1].explicitly_approved);
    }

    #[test]
    fn bare_numbers_next_to_fee_words_are_found() {
        let block = RawTextBlock::new("storage cost of 1,250.50 per month", Provenance::ManualSummary);
        let found = extractor().extract(&block);
        assert_eq!(amounts(&found), vec!["1250.50"]);
        assert_eq!(found[0].type_hint.as_deref(), Some("Storage Fee"));
    }

    #[test]
    fn spelled_dollars_and_authorization() {
        let block = RawTextBlock::new("Manager authorized 75 dollars today", Provenance::UpdateLog);
        let found = extractor().extract(&block);
        assert_eq!(amounts(&found), vec!["75.00", "75.00"]);
        assert!(found[1].explicitly_approved);
    }

    #[test]
    fn non_positive_and_malformed_amounts_are_dropped() {
        let block = RawTextBlock::new("fee of $0.00 and $, then $ ,", Provenance::UpdateLog);
        assert!(extractor().extract(&block).is_empty());
        assert_eq!(parse_amount(","), None);
        assert_eq!(parse_amount("0"), None);
        assert_eq!(parse_amount("1,200"), Some(BigDecimal::from(1200)));
    }

    #[test]
    fn explicit_type_mentioning_key_overrides_lexicon() {
        let block = RawTextBlock::new("tow fee $85.00", Provenance::UpdateLog).with_type("Key Update");
        let found = extractor().extract(&block);
        assert!(found.iter().all(|c| c.type_hint.as_deref() == Some(KEYS_FEE)));
    }

    #[test]
    fn lexicon_hints_follow_context() {
        let e = extractor();
        let flatbed = e.extract(&RawTextBlock::new("$120.00 flatbed fee", Provenance::Database));
        assert_eq!(flatbed[0].type_hint.as_deref(), Some("Flatbed Fees"));
        let cr = e.extract(&RawTextBlock::new("CR done, $25.00 billed", Provenance::UpdateLog));
        assert_eq!(cr[0].type_hint.as_deref(), Some("CR AND PHOTOS FEE"));
        let none = e.extract(&RawTextBlock::new("misc $10.00", Provenance::UpdateLog));
        assert_eq!(none[0].type_hint, None);
    }

    #[test]
    fn unrelated_or_oversized_blocks_are_skipped() {
        let e = extractor();
        assert!(e.extract(&RawTextBlock::new("Vehicle located at 12 Main St", Provenance::UpdateLog)).is_empty());
        let long = format!("$5.00 {}", "x".repeat(6000));
        assert!(e.extract(&RawTextBlock::new(long, Provenance::UpdateLog)).is_empty());
        assert!(e.is_fee_related("total 40"));
        assert!(!e.is_fee_related("total due soon"));
    }

    #[test]
    fn context_window_respects_char_boundaries() {
        let text = "ééééé $10.00 ééééé";
        let start = text.find('$').unwrap();
        let ctx = context_window(text, start, start + 6, 3);
        assert_eq!(ctx, "éé $10.00 éé");
    }

    #[test]
    fn zero_width_context_is_just_the_match() {
        let text = "towing fee $85.00 billed";
        let start = text.find('$').unwrap();
        assert_eq!(context_window(text, start, start + 6, 0), "$85.00");

        let config = FeeConfig {
            context_window: 0,
            ..FeeConfig::default()
        };
        let e = TextFeeExtractor::new(&config).unwrap();
        let found = e.extract(&RawTextBlock::new(text, Provenance::UpdateLog));
        assert_eq!(amounts(&found), vec!["85.00"]);
        assert_eq!(found[0].context, "$85.00");
    }
}
