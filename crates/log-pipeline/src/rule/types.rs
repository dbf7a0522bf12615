//! 분류 규칙 데이터 타입

use std::fmt;

use regex::Regex;

use crate::error::LogPipelineError;

/// 규칙 이름 최대 길이
const MAX_RULE_NAME_LEN: usize = 64;

/// 이름 있는 분류 규칙
///
/// 이름은 이벤트 타입 태그로 쓰이며 메트릭의 `type` 레이블 값이 됩니다.
#[derive(Debug, Clone)]
pub struct MatchRule {
    /// 규칙 이름 (이벤트 타입 태그)
    name: String,
    /// 이름 있는 캡처 그룹을 가진 정규식
    regex: Regex,
}

impl MatchRule {
    /// 패턴을 컴파일하여 규칙을 생성합니다.
    pub fn new(name: impl Into<String>, pattern: &str) -> Result<Self, LogPipelineError> {
        let name = name.into();
        Self::validate_name(&name)?;
        let regex = Regex::new(pattern).map_err(|e| LogPipelineError::RuleValidation {
            rule: name.clone(),
            reason: format!("invalid pattern: {e}"),
        })?;
        Ok(Self { name, regex })
    }

    fn validate_name(name: &str) -> Result<(), LogPipelineError> {
        if name.is_empty() {
            return Err(LogPipelineError::RuleValidation {
                rule: "(empty)".to_owned(),
                reason: "rule name must not be empty".to_owned(),
            });
        }
        if name.len() > MAX_RULE_NAME_LEN {
            return Err(LogPipelineError::RuleValidation {
                rule: name.to_owned(),
                reason: format!("rule name must not exceed {MAX_RULE_NAME_LEN} characters"),
            });
        }
        Ok(())
    }

    /// 규칙 이름을 반환합니다.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 컴파일된 정규식을 반환합니다.
    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    /// 규칙이 선언한 캡처 그룹 이름 목록을 반환합니다.
    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.regex.capture_names().flatten()
    }

    /// 줄에 매칭되면 캡처 필드를 추출합니다.
    ///
    /// 선언된 모든 그룹은 결과에 포함되며, 참여하지 않은 그룹은 빈 문자열입니다.
    pub fn match_line<'a>(&'a self, text: &'a str) -> Option<RuleMatch<'a>> {
        let caps = self.regex.captures(text)?;
        let fields = self
            .regex
            .capture_names()
            .flatten()
            .map(|group| (group, caps.name(group).map_or("", |m| m.as_str())))
            .collect();
        Some(RuleMatch {
            rule: &self.name,
            fields,
        })
    }
}

/// 매칭 결과 -- 규칙 이름과 캡처 필드
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMatch<'a> {
    /// 매칭된 규칙 이름
    pub rule: &'a str,
    /// (그룹 이름, 매칭 텍스트) 목록, 선언 순서
    pub fields: Vec<(&'a str, &'a str)>,
}

impl<'a> RuleMatch<'a> {
    /// 그룹 값을 반환합니다. 규칙이 그룹을 선언하지 않았으면 `None`입니다.
    pub fn get(&self, group: &str) -> Option<&'a str> {
        self.fields
            .iter()
            .find(|(name, _)| *name == group)
            .map(|(_, value)| *value)
    }

    /// 비어 있지 않은 그룹 값만 반환합니다.
    pub fn non_empty(&self, group: &str) -> Option<&'a str> {
        self.get(group).filter(|v| !v.is_empty())
    }
}

/// 한 줄의 분류 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification<'a> {
    /// 이름 있는 규칙과 매칭됨
    Matched(RuleMatch<'a>),
    /// 무시 규칙에 걸림 (메트릭 없음)
    Ignored,
    /// 어떤 규칙과도 매칭되지 않음
    Unmatched,
}

impl Classification<'_> {
    /// 결과 종류 이름 (로그 필드용)
    pub fn outcome(&self) -> &'static str {
        match self {
            Self::Matched(_) => "matched",
            Self::Ignored => "ignored",
            Self::Unmatched => "unmatched",
        }
    }
}

impl fmt::Display for Classification<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Matched(m) => write!(f, "matched({})", m.rule),
            other => f.write_str(other.outcome()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_name_is_rejected() {
        let err = MatchRule::new("", "^x$").unwrap_err();
        assert!(err.to_string().contains("must not be empty"));
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        let err = MatchRule::new("broken", "(?P<open").unwrap_err();
        assert!(matches!(err, LogPipelineError::RuleValidation { .. }));
    }

    #[test]
    fn non_participating_group_resolves_to_empty() {
        let rule = MatchRule::new("closed", r"^closed by (?:user (?P<user>\S+) )?(?P<ip>\S+)$")
            .unwrap();
        let m = rule.match_line("closed by 10.0.0.1").unwrap();
        assert_eq!(m.rule, "closed");
        assert_eq!(m.get("user"), Some(""));
        assert_eq!(m.non_empty("user"), None);
        assert_eq!(m.get("ip"), Some("10.0.0.1"));
        assert_eq!(m.get("undeclared"), None);
    }

    #[test]
    fn fields_follow_declaration_order() {
        let rule = MatchRule::new("kv", r"^(?P<a>\w+)=(?P<b>\w+)$").unwrap();
        let m = rule.match_line("key=value").unwrap();
        assert_eq!(m.fields, vec![("a", "key"), ("b", "value")]);
        assert_eq!(rule.group_names().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn classification_display() {
        assert_eq!(Classification::Ignored.to_string(), "ignored");
        assert_eq!(Classification::Unmatched.outcome(), "unmatched");
    }
}
