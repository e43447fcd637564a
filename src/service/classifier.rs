use crate::config::FeeConfig;
use crate::models::{Approval, CandidateAmount, FeeRecord, FeeTable, MatchedAs, Provenance, RawTextBlock};
use crate::service::extractor::KEYS_FEE;

pub const UNKNOWN_FEE: &str = "Unknown Fee";

/// 分类来源, 按优先级从高到低
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategorySource {
    ProvenanceForced,
    TypeHint,
    ExplicitLabel,
    Default,
}

/// 白名单匹配结果
#[derive(Debug, Clone, PartialEq)]
pub enum WhitelistMatch {
    Exact(String),
    Partial { name: String, score: f64 },
}

impl WhitelistMatch {
    pub fn canonical(&self) -> &str {
        match self {
            WhitelistMatch::Exact(name) => name,
            WhitelistMatch::Partial { name, .. } => name,
        }
    }
}

/// 将候选金额归类为规范分类并路由到三张表之一
pub struct FeeClassifier<'a> {
    whitelist: &'a [String],
}

impl<'a> FeeClassifier<'a> {
    pub fn new(config: &'a FeeConfig) -> Self {
        Self {
            whitelist: &config.pre_approved_fees,
        }
    }

    /// 分类优先级: 来源强制 > 类型提示 > 显式标签 > 默认
    pub fn resolve_category(
        &self,
        block: &RawTextBlock,
        candidate: &CandidateAmount,
    ) -> (String, CategorySource) {
        if block.provenance == Provenance::PageScan {
            return (KEYS_FEE.to_string(), CategorySource::ProvenanceForced);
        }
        if let Some(hint) = candidate.type_hint.as_deref().filter(|h| !h.trim().is_empty()) {
            return (hint.to_string(), CategorySource::TypeHint);
        }
        if let Some(label) = block.explicit_label.as_deref().filter(|l| !l.trim().is_empty()) {
            return (label.to_string(), CategorySource::ExplicitLabel);
        }
        (UNKNOWN_FEE.to_string(), CategorySource::Default)
    }

    /// 白名单匹配: 先精确 (忽略大小写), 再按包含度评分, 分数需 > 0.5, 同分取靠前者
    pub fn match_whitelist(&self, category: &str) -> Option<WhitelistMatch> {
        let category_lower = category.trim().to_lowercase();
        if category_lower.is_empty() {
            return None;
        }

        if let Some(name) = self
            .whitelist
            .iter()
            .find(|name| name.trim().to_lowercase() == category_lower)
        {
            return Some(WhitelistMatch::Exact(name.clone()));
        }

        let mut best: Option<(&String, f64)> = None;
        for name in self.whitelist {
            let name_lower = name.trim().to_lowercase();
            if name_lower.is_empty() {
                continue;
            }
            if !(name_lower.contains(&category_lower) || category_lower.contains(&name_lower)) {
                continue;
            }
            let a = name_lower.chars().count() as f64;
            let b = category_lower.chars().count() as f64;
            let score = a.min(b) / a.max(b);
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((name, score));
            }
        }

        best.filter(|(_, score)| *score > 0.5)
            .map(|(name, score)| WhitelistMatch::Partial {
                name: name.clone(),
                score,
            })
    }

    /// 生成费用记录
    pub fn classify(
        &self,
        block: &RawTextBlock,
        candidate: &CandidateAmount,
        block_approved: bool,
    ) -> FeeRecord {
        let (resolved, source) = self.resolve_category(block, candidate);
        let original_category = resolved.clone();

        // 钥匙规范化先于白名单: Keys Fee 无论是否在白名单都进 Keys 表
        let is_keys_fee = is_key_category(&resolved);
        let whitelist_match = if is_keys_fee {
            None
        } else {
            self.match_whitelist(&resolved)
        };

        let (category, table, matched_as) = if is_keys_fee {
            (KEYS_FEE.to_string(), FeeTable::Keys, MatchedAs::KeysFee)
        } else if let Some(m) = &whitelist_match {
            (m.canonical().to_string(), FeeTable::Predefined, MatchedAs::PreApproved)
        } else {
            (resolved, FeeTable::Other, MatchedAs::Unmatched)
        };

        let is_database = block.provenance == Provenance::Database;
        let matched_as = if is_database { MatchedAs::RepoFeeMatrix } else { matched_as };
        let approved = Approval::from_signals(&[
            is_database,
            whitelist_match.is_some(),
            candidate.explicitly_approved,
            block_approved,
        ]);

        tracing::debug!(
            "Classified ${} as '{}' ({:?}, from {:?}) -> {:?}",
            candidate.amount,
            category,
            matched_as,
            source,
            table
        );

        FeeRecord {
            date: block.date.clone(),
            amount: candidate.amount.clone(),
            update_type: block.explicit_type.clone().unwrap_or_default(),
            approver: block.user.clone(),
            reference_sentence: candidate.context.trim().to_string(),
            approved,
            category,
            original_category,
            provenance: block.provenance,
            matched: is_database || whitelist_match.is_some() || is_keys_fee,
            matched_as,
            table,
        }
    }
}

/// 分类文本包含 "key" 或等于 "push to start key"
pub fn is_key_category(category: &str) -> bool {
    let lower = category.trim().to_lowercase();
    lower.contains("key") || lower == "push to start key"
}
