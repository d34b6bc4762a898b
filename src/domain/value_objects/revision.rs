use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// チェックアウト対象のリビジョン
///
/// 不正なリビジョン文字列はエラーではなく [`Revision::Invalid`] として表現される。
/// 呼び出し側は使用前に [`Revision::is_valid`] を確認すること。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Revision {
    /// リビジョン番号
    Number(u64),
    /// リポジトリの最新
    Head,
    /// 指定時刻時点のリビジョン
    Date(DateTime<Utc>),
    /// ポリシーもパラメータも無い場合のセンチネル
    Unspecified,
    /// 解析できなかったリビジョン文字列
    Invalid(String),
}

impl Revision {
    /// リビジョン文字列を解析する
    ///
    /// 数値、`HEAD`（大文字小文字を区別しない）、`{日付}` を受け付ける。
    /// それ以外は `Invalid` になる。
    pub fn parse(token: &str) -> Self {
        let trimmed = token.trim();

        if trimmed.is_empty() {
            return Self::Invalid(token.to_string());
        }

        if trimmed.eq_ignore_ascii_case("HEAD") {
            return Self::Head;
        }

        if let Ok(number) = trimmed.parse::<u64>() {
            return Self::Number(number);
        }

        if let Some(inner) = trimmed
            .strip_prefix('{')
            .and_then(|rest| rest.strip_suffix('}'))
        {
            if let Some(date) = Self::parse_date(inner) {
                return Self::Date(date);
            }
        }

        Self::Invalid(token.to_string())
    }

    /// svnが受け付ける日付表記のうち代表的なものを解析する
    fn parse_date(value: &str) -> Option<DateTime<Utc>> {
        if let Ok(date) = DateTime::parse_from_rfc3339(value) {
            return Some(date.with_timezone(&Utc));
        }

        for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
                return Some(naive.and_utc());
            }
        }

        NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
    }

    /// 使用可能なリビジョンか
    pub fn is_valid(&self) -> bool {
        !matches!(self, Self::Invalid(_) | Self::Unspecified)
    }

    /// `svn -r` に渡す値。指定なしの場合は `None`
    pub fn to_svn_arg(&self) -> Option<String> {
        match self {
            Self::Number(number) => Some(number.to_string()),
            Self::Head => Some("HEAD".to_string()),
            Self::Date(date) => Some(format!(
                "{{{}}}",
                date.to_rfc3339_opts(SecondsFormat::Secs, true)
            )),
            Self::Unspecified | Self::Invalid(_) => None,
        }
    }

    /// リビジョン番号を取得
    pub fn number(&self) -> Option<u64> {
        match self {
            Self::Number(number) => Some(*number),
            _ => None,
        }
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(number) => write!(f, "{}", number),
            Self::Head => write!(f, "HEAD"),
            Self::Date(date) => write!(
                f,
                "{{{}}}",
                date.to_rfc3339_opts(SecondsFormat::Secs, true)
            ),
            Self::Unspecified => write!(f, "UNSPECIFIED"),
            Self::Invalid(token) => write!(f, "INVALID({})", token),
        }
    }
}
