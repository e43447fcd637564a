use bigdecimal::BigDecimal;
use fee_resolver::config::FeeConfig;
use fee_resolver::models::{Approval, CaseInfo, DedupKey, FeeMatrixRecord, MatchedAs, Provenance, RawTextBlock};
use fee_resolver::service::Deduplicator;
use fee_resolver::FeePipeline;
use std::collections::HashSet;
use std::str::FromStr;

fn dec(s: &str) -> BigDecimal {
    BigDecimal::from_str(s).unwrap()
}

fn case_blocks() -> Vec<RawTextBlock> {
    vec![
        RawTextBlock::new("Flatbed Fees: $120.00", Provenance::ManualSummary)
            .with_label("Flatbed Fees")
            .with_date("2025-03-01"),
        RawTextBlock::new(
            "Agent requested dolly, client approved fee of $75.00 for dolly",
            Provenance::UpdateLog,
        )
        .with_date("2025-03-02 10:00")
        .with_user("jdoe")
        .with_type("Fee Update"),
        RawTextBlock::new("push to start key made for $45.00 on the vehicle", Provenance::UpdateLog)
            .with_date("2025-03-02 11:30"),
        RawTextBlock::new("Key on file, $30.00", Provenance::PageScan),
        RawTextBlock::new("Lot sweep charge 60 paid by agent", Provenance::UpdateLog)
            .with_label("Lot Sweep"),
        RawTextBlock::new("Flatbed Fees: $120.00", Provenance::UpdateLog).with_label("Flatbed Fees"),
    ]
}

#[test]
fn push_to_start_key_lands_in_keys_table() {
    let config = FeeConfig::default();
    let pipeline = FeePipeline::new(&config).unwrap();
    let block = RawTextBlock::new("push to start key made for $45.00 on the vehicle", Provenance::UpdateLog);

    let tables = pipeline.run(&[block], None);
    assert_eq!(tables.keys_fees_table.len(), 1);
    let fee = &tables.keys_fees_table[0];
    assert_eq!(fee.amount, dec("45.00"));
    assert_eq!(fee.category, "Keys Fee");
    assert_eq!(fee.matched_as, MatchedAs::KeysFee);
    assert!(tables.predefined_fees_table.is_empty());
    assert!(tables.other_fees_table.is_empty());
}

#[test]
fn database_copy_survives_identical_update_log_mention() {
    let config = FeeConfig::default();
    let pipeline = FeePipeline::new(&config).unwrap();
    let blocks = vec![
        RawTextBlock::new("$120.00 flatbed fee", Provenance::UpdateLog),
        RawTextBlock::new("$120.00 flatbed fee", Provenance::Database),
    ];

    let tables = pipeline.run(&blocks, None);
    let survivors: Vec<_> = tables
        .all_fees_table
        .iter()
        .filter(|r| r.amount == dec("120") && r.category == "Flatbed Fees")
        .collect();
    assert_eq!(survivors.len(), 1);
    assert_eq!(survivors[0].provenance, Provenance::Database);
    assert_eq!(survivors[0].approved, Approval::Approved);
    assert!(tables
        .duplicates
        .iter()
        .any(|d| d.dropped_source == Provenance::UpdateLog && d.kept_source == Provenance::Database));
}

#[test]
fn full_case_is_routed_into_three_tables() {
    let config = FeeConfig::default();
    let pipeline = FeePipeline::new(&config).unwrap();
    let tables = pipeline.run(&case_blocks(), None);

    // 每条记录只出现在一张表中
    let routed = tables.predefined_fees_table.len() + tables.keys_fees_table.len() + tables.other_fees_table.len();
    assert_eq!(routed, tables.all_fees_table.len());

    // 汇总页的 flatbed 费用优先于更新日志里的同一条
    let flatbed: Vec<_> = tables
        .predefined_fees_table
        .iter()
        .filter(|r| r.category == "Flatbed Fees")
        .collect();
    assert_eq!(flatbed.len(), 1);
    assert_eq!(flatbed[0].provenance, Provenance::ManualSummary);

    // 页面扫描块一律归入钥匙费
    assert!(tables
        .keys_fees_table
        .iter()
        .any(|r| r.provenance == Provenance::PageScan && r.amount == dec("30.00")));
    assert!(tables.keys_fees_table.iter().any(|r| r.amount == dec("45.00")));

    // 显式批准的金额
    let dolly: Vec<_> = tables
        .all_fees_table
        .iter()
        .filter(|r| r.amount == dec("75.00"))
        .collect();
    assert!(!dolly.is_empty());
    assert!(dolly.iter().all(|r| r.approved == Approval::Approved));
    assert!(dolly.iter().all(|r| r.approver == "jdoe"));

    // 未匹配的分类保留原文
    let other = tables
        .other_fees_table
        .iter()
        .find(|r| r.amount == dec("60"))
        .expect("lot sweep charge");
    assert_eq!(other.category, "Lot Sweep");
    assert_eq!(other.approved, Approval::Likely);
    assert!(!other.matched);
}

#[test]
fn no_two_survivors_share_a_dedup_key() {
    let config = FeeConfig::default();
    let pipeline = FeePipeline::new(&config).unwrap();
    let mut blocks = case_blocks();
    blocks.extend(case_blocks());
    let tables = pipeline.run(&blocks, None);

    let dedup = Deduplicator::new(config.dedup_context_prefix);
    let mut seen = HashSet::new();
    for record in &tables.all_fees_table {
        // Other 表展示原始分类, 键按展示后的记录计算
        let key: DedupKey = dedup.key(record);
        assert!(seen.insert(key), "duplicate survivor: {:?}", record);
    }

    let once = pipeline.run(&case_blocks(), None);
    assert_eq!(once.all_fees_table.len(), tables.all_fees_table.len());
}

#[test]
fn database_fee_is_injected_before_dedup() {
    let config = FeeConfig::default();
    let pipeline = FeePipeline::new(&config).unwrap();
    let case = CaseInfo::new("Acme", "Unknown Bank", "Involuntary Repo");
    let record = FeeMatrixRecord {
        id: 1000,
        client_name: "Acme".into(),
        lienholder_name: "Standard (Standard Fallback)".into(),
        fee_type: "Involuntary Repo".into(),
        amount: dec("300.00"),
        is_fallback: true,
        message: Some("Lienholder 'Unknown Bank' specific fee not found. Using Standard amount.".into()),
    };

    let tables = pipeline.run(&case_blocks(), Some((&record, &case)));
    let db: Vec<_> = tables
        .predefined_fees_table
        .iter()
        .filter(|r| r.provenance == Provenance::Database)
        .collect();
    assert_eq!(db.len(), 1);
    assert_eq!(db[0].category, "Involuntary Repo");
    assert_eq!(db[0].matched_as, MatchedAs::RepoFeeMatrix);
    assert_eq!(db[0].reference_sentence, "Database lookup for Involuntary Repo - Acme / Unknown Bank");
    assert_eq!(tables.database_fee.as_ref(), Some(&record));
    assert_eq!(tables.fees_by_source["Database"].count, 1);

    let json = serde_json::to_value(&tables).unwrap();
    assert_eq!(json["databaseFee"]["isFallback"], true);
    assert_eq!(json["predefinedFeesTable"][0]["source"], "Database");
    assert_eq!(json["predefinedFeesTable"][0]["approved"], "Yes");
}
