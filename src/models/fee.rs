use bigdecimal::{BigDecimal, Zero};
use indexmap::IndexMap;
use serde::{Serialize, Serializer};

use super::block::Provenance;
use super::matrix::FeeMatrixRecord;

/// 审批状态. 一旦任一信号给出 Approved, 不再降级.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Approval {
    #[serde(rename = "Yes")]
    Approved,
    Likely,
}

impl Approval {
    pub fn from_signals(signals: &[bool]) -> Self {
        if signals.iter().any(|s| *s) {
            Approval::Approved
        } else {
            Approval::Likely
        }
    }
}

/// 报表中的三张表
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FeeTable {
    Predefined,
    Keys,
    Other,
}

/// 费用的匹配方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MatchedAs {
    #[serde(rename = "Repo Fee Matrix")]
    RepoFeeMatrix,
    #[serde(rename = "Pre-approved Non-Repo")]
    PreApproved,
    #[serde(rename = "Keys Fee")]
    KeysFee,
    Unmatched,
}

/// 规范化后的费用记录
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeRecord {
    pub date: String,
    #[serde(serialize_with = "serialize_dollars")]
    pub amount: BigDecimal,
    #[serde(rename = "type")]
    pub update_type: String,
    pub approver: String,
    pub reference_sentence: String,
    pub approved: Approval,
    pub category: String,
    pub original_category: String,
    #[serde(rename = "source", serialize_with = "serialize_source")]
    pub provenance: Provenance,
    pub matched: bool,
    pub matched_as: MatchedAs,
    #[serde(skip)]
    pub table: FeeTable,
}

impl FeeRecord {
    /// 报表展示金额, 例如 "$45.00"
    pub fn display_amount(&self) -> String {
        format_dollars(&self.amount)
    }
}

/// 金额四舍五入到分 (两位小数)
pub fn to_cents(amount: &BigDecimal) -> BigDecimal {
    amount.round(2).with_scale(2)
}

pub fn format_dollars(amount: &BigDecimal) -> String {
    format!("${}", to_cents(amount))
}

fn serialize_dollars<S: Serializer>(amount: &BigDecimal, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&format_dollars(amount))
}

fn serialize_source<S: Serializer>(p: &Provenance, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(p.display_name())
}

/// 去重键: (两位小数金额, 规范化分类, 规范化上下文前缀)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub amount: String,
    pub category: String,
    pub context_prefix: String,
}

impl DedupKey {
    pub fn for_record(record: &FeeRecord, prefix_chars: usize) -> Self {
        let context = normalize_text(&record.reference_sentence);
        Self {
            amount: to_cents(&record.amount).to_string(),
            category: normalize_text(&record.category),
            context_prefix: context.chars().take(prefix_chars).collect(),
        }
    }
}

/// 小写, 去首尾空白, 合并连续空白
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// 去重时被丢弃的记录 (诊断事件, 非错误)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DroppedDuplicate {
    #[serde(serialize_with = "serialize_dollars")]
    pub amount: BigDecimal,
    pub category: String,
    #[serde(serialize_with = "serialize_source")]
    pub dropped_source: Provenance,
    #[serde(serialize_with = "serialize_source")]
    pub kept_source: Provenance,
}

/// 按来源汇总
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceSummary {
    pub count: usize,
    #[serde(serialize_with = "serialize_dollars")]
    pub amount: BigDecimal,
}

impl Default for SourceSummary {
    fn default() -> Self {
        Self {
            count: 0,
            amount: BigDecimal::zero(),
        }
    }
}

/// 最终交付给报表层的表格
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeTables {
    pub predefined_fees_table: Vec<FeeRecord>,
    pub keys_fees_table: Vec<FeeRecord>,
    pub other_fees_table: Vec<FeeRecord>,
    pub all_fees_table: Vec<FeeRecord>,
    pub database_fee: Option<FeeMatrixRecord>,
    pub duplicates: Vec<DroppedDuplicate>,
    pub fees_by_source: IndexMap<String, SourceSummary>,
}

impl FeeTables {
    /// 将去重后的记录分配到三张表
    pub fn from_records(records: Vec<FeeRecord>) -> Self {
        let mut tables = FeeTables::default();
        for record in records {
            let entry = tables
                .fees_by_source
                .entry(record.provenance.display_name().to_string())
                .or_default();
            entry.count += 1;
            entry.amount = &entry.amount + &record.amount;

            match record.table {
                FeeTable::Predefined => tables.predefined_fees_table.push(record.clone()),
                FeeTable::Keys => tables.keys_fees_table.push(record.clone()),
                FeeTable::Other => tables.other_fees_table.push(record.clone()),
            }
            tables.all_fees_table.push(record);
        }
        tables
    }

    pub fn total_amount(&self) -> BigDecimal {
        self.all_fees_table
            .iter()
            .fold(BigDecimal::zero(), |acc, r| acc + &r.amount)
    }
}
