use crate::domain::value_objects::module_location::ModuleLocation;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use validator::{Validate, ValidationError};

/// 作業コピーの更新戦略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateStrategy {
    /// 毎回ワークスペースを空にしてチェックアウトする
    Checkout,
    /// 可能なら `svn update`、URLが変わっていればチェックアウト
    Update,
    /// URLが変わっていれば `svn switch`
    Switch,
    /// `svn revert` の後に switch/update
    UpdateWithRevert,
}

impl Default for UpdateStrategy {
    fn default() -> Self {
        Self::Update
    }
}

impl fmt::Display for UpdateStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Checkout => write!(f, "checkout"),
            Self::Update => write!(f, "update"),
            Self::Switch => write!(f, "switch"),
            Self::UpdateWithRevert => write!(f, "update_with_revert"),
        }
    }
}

impl FromStr for UpdateStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "checkout" => Ok(Self::Checkout),
            "update" => Ok(Self::Update),
            "switch" => Ok(Self::Switch),
            "update_with_revert" | "revert" => Ok(Self::UpdateWithRevert),
            other => Err(format!("Unsupported update strategy '{}'", other)),
        }
    }
}

/// job.yml の内容
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct JobConfig {
    /// ジョブ名
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// モジュールロケーション（設定順に更新される）
    #[validate(
        length(min = 1, message = "at least one module location is required"),
        custom(function = "validate_locations")
    )]
    pub locations: Vec<ModuleLocation>,

    /// 更新戦略
    #[serde(default)]
    pub strategy: UpdateStrategy,

    /// リビジョンポリシー名（queue_time / build_time / head）
    ///
    /// 未知の値はリビジョン解決時に設定エラーとなる。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision_policy: Option<String>,
}

impl JobConfig {
    /// 新しいジョブ設定を作成
    pub fn new(locations: Vec<ModuleLocation>) -> Self {
        Self {
            name: None,
            locations,
            strategy: UpdateStrategy::default(),
            revision_policy: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_strategy(mut self, strategy: UpdateStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_revision_policy(mut self, policy: impl Into<String>) -> Self {
        self.revision_policy = Some(policy.into());
        self
    }
}

// validator requires the exact field type here
#[allow(clippy::ptr_arg)]
fn validate_locations(locations: &Vec<ModuleLocation>) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();

    for location in locations {
        if location.remote().is_empty() {
            return Err(ValidationError::new("empty_remote"));
        }

        let local = location.local();
        if local.split(['/', '\\']).any(|part| part == "..") || local.starts_with('/') {
            let mut error = ValidationError::new("local_outside_workspace");
            error.message = Some(format!("local directory '{}' escapes the workspace", local).into());
            return Err(error);
        }

        if !seen.insert(local.trim_end_matches('/').to_string()) {
            let mut error = ValidationError::new("duplicate_local");
            error.message = Some(format!("local directory '{}' is used twice", local).into());
            return Err(error);
        }
    }

    Ok(())
}
