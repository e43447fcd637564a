use std::collections::HashMap;

use crate::config::FeeConfig;
use crate::models::{CaseInfo, FeeMatrixRecord, FeeTables, RawTextBlock};
use crate::service::fee_matrix::FeeMatrixResolver;
use crate::service::pipeline::FeePipeline;

/// 单个抓取会话: 同一案件的费率只查询一次, 未命中也缓存
pub struct FeeSession<'a> {
    pipeline: FeePipeline<'a>,
    resolver: Option<FeeMatrixResolver>,
    cache: HashMap<CaseInfo, Option<FeeMatrixRecord>>,
}

impl<'a> FeeSession<'a> {
    pub fn new(config: &'a FeeConfig, resolver: Option<FeeMatrixResolver>) -> Result<Self, regex::Error> {
        if resolver.is_none() {
            tracing::info!("No fee matrix store configured, running on text only");
        }
        Ok(Self {
            pipeline: FeePipeline::new(config)?,
            resolver,
            cache: HashMap::new(),
        })
    }

    /// 查询 (或命中缓存) 案件的权威费用
    pub async fn authoritative_fee(&mut self, case: &CaseInfo) -> Option<FeeMatrixRecord> {
        if let Some(cached) = self.cache.get(case) {
            tracing::debug!("Using cached fee matrix result for {:?}", case);
            return cached.clone();
        }
        let resolver = self.resolver.as_mut()?;
        let record = resolver
            .resolve(&case.client_name, &case.lienholder_name, &case.fee_type)
            .await;
        self.cache.insert(case.clone(), record.clone());
        record
    }

    pub async fn process_case(&mut self, case: &CaseInfo, blocks: &[RawTextBlock]) -> FeeTables {
        let record = self.authoritative_fee(case).await;
        self.pipeline.run(blocks, record.as_ref().map(|r| (r, case)))
    }

    pub fn cached_cases(&self) -> usize {
        self.cache.len()
    }
}
