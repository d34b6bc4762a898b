use crate::common::error::SvnScmError;
use crate::common::result::SvnScmResult;
use crate::domain::entities::authentication::Authentication;
use crate::domain::entities::dir_entry::DirEntry;
use crate::infrastructure::svn::client::{SvnClient, SvnError};
use regex::Regex;
use std::cmp::Reverse;

/// タグ一覧の並び順
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TagOrder {
    /// 名前の昇順
    #[default]
    AToZ,
    /// 名前の降順
    ZToA,
    /// 最終変更リビジョンの降順
    NewestFirst,
}

/// タグディレクトリの一覧からビルドパラメータの選択肢を作る
#[derive(Debug, Clone)]
pub struct TagListing {
    tags_url: String,
    filter: Option<Regex>,
    order: TagOrder,
    max_tags: Option<usize>,
}

impl TagListing {
    pub fn new(tags_url: impl Into<String>) -> Self {
        Self {
            tags_url: tags_url.into(),
            filter: None,
            order: TagOrder::default(),
            max_tags: None,
        }
    }

    /// 名前全体にマッチする正規表現でタグを絞り込む
    pub fn with_filter(mut self, pattern: &str) -> SvnScmResult<Self> {
        let regex = Regex::new(&format!("^(?:{})$", pattern)).map_err(|e| {
            SvnScmError::config_error_with_source(format!("Invalid tag filter '{}'", pattern), e)
        })?;
        self.filter = Some(regex);
        Ok(self)
    }

    pub fn with_order(mut self, order: TagOrder) -> Self {
        self.order = order;
        self
    }

    pub fn with_max_tags(mut self, max_tags: usize) -> Self {
        self.max_tags = Some(max_tags);
        self
    }

    pub fn tags_url(&self) -> &str {
        &self.tags_url
    }

    pub async fn list(
        &self,
        client: &dyn SvnClient,
        auth: Option<&Authentication>,
    ) -> Result<Vec<String>, SvnError> {
        let entries = client.list(&self.tags_url, auth).await?;
        tracing::debug!("{} entries under {}", entries.len(), self.tags_url);
        Ok(self.select(entries))
    }

    /// ディレクトリのみを残し、絞り込み・整列・件数制限を行う
    pub fn select(&self, entries: Vec<DirEntry>) -> Vec<String> {
        let mut dirs: Vec<DirEntry> = entries
            .into_iter()
            .filter(DirEntry::is_dir)
            .map(|mut entry| {
                entry.name = entry.name.trim_end_matches('/').to_string();
                entry
            })
            .filter(|entry| {
                self.filter
                    .as_ref()
                    .map_or(true, |filter| filter.is_match(&entry.name))
            })
            .collect();

        match self.order {
            TagOrder::AToZ => dirs.sort_by(|a, b| a.name.cmp(&b.name)),
            TagOrder::ZToA => dirs.sort_by(|a, b| b.name.cmp(&a.name)),
            TagOrder::NewestFirst => dirs.sort_by_key(|entry| Reverse(entry.revision)),
        }

        let names = dirs.into_iter().map(|entry| entry.name);
        match self.max_tags {
            Some(max) => names.take(max).collect(),
            None => names.collect(),
        }
    }
}
