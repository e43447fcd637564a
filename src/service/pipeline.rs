use chrono::Local;

use crate::config::FeeConfig;
use crate::models::{CaseInfo, FeeMatrixRecord, FeeRecord, FeeTables, RawTextBlock};
use crate::service::classifier::FeeClassifier;
use crate::service::dedup::Deduplicator;
use crate::service::extractor::TextFeeExtractor;

/// 文本块 -> 候选金额 -> 费用记录 -> 去重 -> 三张表
pub struct FeePipeline<'a> {
    config: &'a FeeConfig,
    extractor: TextFeeExtractor,
    classifier: FeeClassifier<'a>,
    dedup: Deduplicator,
}

impl<'a> FeePipeline<'a> {
    pub fn new(config: &'a FeeConfig) -> Result<Self, regex::Error> {
        Ok(Self {
            config,
            extractor: TextFeeExtractor::new(config)?,
            classifier: FeeClassifier::new(config),
            dedup: Deduplicator::new(config.dedup_context_prefix),
        })
    }

    /// 抽取并分类, 不做去重. 块数与金额数都有上限.
    pub fn collect_records(&self, blocks: &[RawTextBlock]) -> Vec<FeeRecord> {
        if blocks.len() > self.config.max_blocks {
            tracing::warn!(
                "Received {} blocks, only the first {} are processed",
                blocks.len(),
                self.config.max_blocks
            );
        }

        let mut records = Vec::new();
        'blocks: for block in blocks.iter().take(self.config.max_blocks) {
            let block_approved = self.extractor.block_mentions_approval(block);
            for candidate in self.extractor.extract(block) {
                if records.len() >= self.config.max_amounts {
                    tracing::warn!("Amount cap of {} reached, remaining text ignored", self.config.max_amounts);
                    break 'blocks;
                }
                records.push(self.classifier.classify(block, &candidate, block_approved));
            }
        }
        records
    }

    /// 权威记录在去重前注入, 以最高优先级参与去重
    pub fn authoritative_record(&self, record: &FeeMatrixRecord, case: &CaseInfo) -> Option<FeeRecord> {
        let now = Local::now().format("%Y-%m-%d %H:%M").to_string();
        let Some((block, candidate)) = record.to_candidate(case, &now) else {
            tracing::warn!("Ignoring non-positive repo fee ${} from record {}", record.amount, record.id);
            return None;
        };
        Some(self.classifier.classify(&block, &candidate, false))
    }

    pub fn run(
        &self,
        blocks: &[RawTextBlock],
        authoritative: Option<(&FeeMatrixRecord, &CaseInfo)>,
    ) -> FeeTables {
        let mut records = self.collect_records(blocks);
        let extracted = records.len();

        if let Some(fee) = authoritative.and_then(|(record, case)| self.authoritative_record(record, case)) {
            records.push(fee);
        }

        let outcome = self.dedup.dedup(records);
        let mut tables = FeeTables::from_records(outcome.kept);
        tables.database_fee = authoritative.map(|(record, _)| record.clone());
        tables.duplicates = outcome.dropped;

        tracing::info!(
            "Fee tables built: {} blocks, {} extracted, {} duplicates dropped, {} predefined / {} keys / {} other",
            blocks.len().min(self.config.max_blocks),
            extracted,
            tables.duplicates.len(),
            tables.predefined_fees_table.len(),
            tables.keys_fees_table.len(),
            tables.other_fees_table.len()
        );
        for (source, summary) in &tables.fees_by_source {
            tracing::debug!("  {}: {} fees, total ${}", source, summary.count, summary.amount);
        }

        tables
    }
}
