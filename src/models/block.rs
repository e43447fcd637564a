use bigdecimal::{BigDecimal, Zero};
use serde::{Deserialize, Serialize};

/// 费用提及的来源渠道, 去重时按优先级排序
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Provenance {
    /// 费率矩阵查询结果 (权威来源)
    Database,
    /// 人工汇总页 (My Summary)
    ManualSummary,
    /// 案件更新日志
    UpdateLog,
    /// 页面扫描 (钥匙费专用块)
    PageScan,
}

impl Provenance {
    /// 去重优先级, 数值越小越优先. PageScan 与 UpdateLog 同级.
    pub fn priority(self) -> u8 {
        match self {
            Provenance::Database => 0,
            Provenance::ManualSummary => 1,
            Provenance::UpdateLog | Provenance::PageScan => 2,
        }
    }

    /// 报表中展示的来源名称
    pub fn display_name(self) -> &'static str {
        match self {
            Provenance::Database => "Database",
            Provenance::ManualSummary => "My Summary",
            Provenance::UpdateLog | Provenance::PageScan => "Updates",
        }
    }
}

/// 抓取层交付的原始文本块
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTextBlock {
    pub content: String,
    pub provenance: Provenance,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub user: String,
    /// 更新类型 (例如 "Key Fee Update")
    #[serde(default)]
    pub explicit_type: Option<String>,
    /// 汇总页上的费用标签
    #[serde(default)]
    pub explicit_label: Option<String>,
}

impl RawTextBlock {
    pub fn new(content: impl Into<String>, provenance: Provenance) -> Self {
        Self {
            content: content.into(),
            provenance,
            date: String::new(),
            user: String::new(),
            explicit_type: None,
            explicit_label: None,
        }
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = date.into();
        self
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    pub fn with_type(mut self, explicit_type: impl Into<String>) -> Self {
        self.explicit_type = Some(explicit_type.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.explicit_label = Some(label.into());
        self
    }
}

/// 从文本中抽取出的候选金额. 构造时保证 amount > 0.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateAmount {
    pub amount: BigDecimal,
    pub context: String,
    pub explicitly_approved: bool,
    pub type_hint: Option<String>,
}

impl CandidateAmount {
    /// 非正金额返回 None
    pub fn new(
        amount: BigDecimal,
        context: impl Into<String>,
        explicitly_approved: bool,
        type_hint: Option<String>,
    ) -> Option<Self> {
        if amount <= BigDecimal::zero() {
            return None;
        }
        Some(Self {
            amount,
            context: context.into(),
            explicitly_approved,
            type_hint,
        })
    }
}

/// 当前案件的关键信息, 用于费率矩阵查询
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseInfo {
    pub client_name: String,
    pub lienholder_name: String,
    pub fee_type: String,
}

impl CaseInfo {
    pub fn new(
        client_name: impl Into<String>,
        lienholder_name: impl Into<String>,
        fee_type: impl Into<String>,
    ) -> Self {
        Self {
            client_name: client_name.into(),
            lienholder_name: lienholder_name.into(),
            fee_type: fee_type.into(),
        }
    }
}
