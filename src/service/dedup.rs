use indexmap::IndexMap;

use crate::models::{DedupKey, DroppedDuplicate, FeeRecord};

/// 去重结果: 保留的记录与被丢弃记录的诊断
#[derive(Debug, Clone, Default)]
pub struct DedupOutcome {
    pub kept: Vec<FeeRecord>,
    pub dropped: Vec<DroppedDuplicate>,
}

/// 按来源优先级去重: Database > ManualSummary > UpdateLog (PageScan 同 UpdateLog)
pub struct Deduplicator {
    context_prefix: usize,
}

impl Deduplicator {
    pub fn new(context_prefix: usize) -> Self {
        Self { context_prefix }
    }

    pub fn key(&self, record: &FeeRecord) -> DedupKey {
        DedupKey::for_record(record, self.context_prefix)
    }

    /// 先按优先级稳定排序, 同一键只保留第一条, 之后的记录不会覆盖已保留记录
    pub fn dedup(&self, records: Vec<FeeRecord>) -> DedupOutcome {
        let mut ordered = records;
        ordered.sort_by_key(|r| r.provenance.priority());

        let mut seen: IndexMap<DedupKey, FeeRecord> = IndexMap::with_capacity(ordered.len());
        let mut dropped = Vec::new();

        for record in ordered {
            let key = self.key(&record);
            if let Some(kept) = seen.get(&key) {
                tracing::info!(
                    "Skipping duplicate fee: ${} from {} (category: {}, kept {})",
                    key.amount,
                    record.provenance.display_name(),
                    record.category,
                    kept.provenance.display_name()
                );
                dropped.push(DroppedDuplicate {
                    amount: record.amount.clone(),
                    category: record.category.clone(),
                    dropped_source: record.provenance,
                    kept_source: kept.provenance,
                });
                continue;
            }
            seen.insert(key, record);
        }

        DedupOutcome {
            kept: seen.into_values().collect(),
            dropped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Approval, FeeTable, MatchedAs, Provenance};
    use bigdecimal::BigDecimal;
    use std::str::FromStr;

    fn record(p: Provenance, amount: &str, category: &str, context: &str, date: &str) -> FeeRecord {
        FeeRecord {
            date: date.into(),
            amount: BigDecimal::from_str(amount).unwrap(),
            update_type: String::new(),
            approver: String::new(),
            reference_sentence: context.into(),
            approved: Approval::Likely,
            category: category.into(),
            original_category: category.into(),
            provenance: p,
            matched: false,
            matched_as: MatchedAs::Unmatched,
            table: FeeTable::Predefined,
        }
    }

    #[test]
    fn database_beats_update_log_with_same_key() {
        let d = Deduplicator::new(50);
        let out = d.dedup(vec![
            record(Provenance::UpdateLog, "120.00", "Flatbed Fees", "$120.00 flatbed fee", "u"),
            record(Provenance::Database, "120.00", "Flatbed Fees", "$120.00 flatbed fee", "db"),
        ]);
        assert_eq!(out.kept.len(), 1);
        assert_eq!(out.kept[0].provenance, Provenance::Database);
        assert_eq!(out.dropped.len(), 1);
        assert_eq!(out.dropped[0].dropped_source, Provenance::UpdateLog);
        assert_eq!(out.dropped[0].kept_source, Provenance::Database);
    }

    #[test]
    fn manual_summary_beats_page_scan() {
        let d = Deduplicator::new(50);
        let out = d.dedup(vec![
            record(Provenance::PageScan, "45", "Keys Fee", "key made $45", "scan"),
            record(Provenance::ManualSummary, "45.00", "keys fee", "Key made  $45", "summary"),
        ]);
        assert_eq!(out.kept.len(), 1);
        assert_eq!(out.kept[0].date, "summary");
    }

    #[test]
    fn ties_keep_the_first_encountered() {
        let d = Deduplicator::new(50);
        let out = d.dedup(vec![
            record(Provenance::UpdateLog, "10", "Bonus", "bonus $10", "first"),
            record(Provenance::PageScan, "10", "Bonus", "bonus $10", "second"),
        ]);
        assert_eq!(out.kept.len(), 1);
        assert_eq!(out.kept[0].date, "first");
    }

    #[test]
    fn contexts_differing_past_the_prefix_collapse() {
        let d = Deduplicator::new(10);
        let out = d.dedup(vec![
            record(Provenance::UpdateLog, "10", "Bonus", "bonus paid $10 on monday", "a"),
            record(Provenance::UpdateLog, "10", "Bonus", "bonus paid $10 on friday", "b"),
        ]);
        assert_eq!(out.kept.len(), 1);
    }

    #[test]
    fn distinct_keys_are_all_kept_in_priority_order() {
        let d = Deduplicator::new(50);
        let out = d.dedup(vec![
            record(Provenance::UpdateLog, "10", "Bonus", "a", "1"),
            record(Provenance::ManualSummary, "20", "Bonus", "b", "2"),
            record(Provenance::Database, "30", "Bonus", "c", "3"),
        ]);
        let dates: Vec<_> = out.kept.iter().map(|r| r.date.as_str()).collect();
        assert_eq!(dates, vec!["3", "2", "1"]);
        assert!(out.dropped.is_empty());
    }

    #[test]
    fn dedup_is_idempotent() {
        let d = Deduplicator::new(50);
        let input = vec![
            record(Provenance::UpdateLog, "10", "Bonus", "a", "1"),
            record(Provenance::ManualSummary, "10", "Bonus", "a", "2"),
            record(Provenance::UpdateLog, "15", "Dolly Fees", "b", "3"),
            record(Provenance::Database, "15", "dolly fees", "B", "4"),
        ];
        let once = d.dedup(input).kept;
        let twice = d.dedup(once.clone()).kept;
        assert_eq!(once, twice);
        assert_eq!(once.len(), 2);
    }
}
