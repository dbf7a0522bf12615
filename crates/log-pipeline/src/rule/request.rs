//! 요청 로그 패턴
//!
//! 요청 로그는 사용자가 지정한 정규식 하나로 분류합니다.
//! 패턴은 `domain`, `ip_address`, `status`, `method` 네 그룹을 모두 선언해야 하며,
//! 무시 규칙은 없습니다. 매칭되지 않은 줄은 항상 파싱 불가로 보고됩니다.

use super::matcher::RuleSet;
use crate::error::LogPipelineError;

/// 요청 이벤트의 규칙 이름
pub const REQUEST_RULE_NAME: &str = "request";

/// 요청 패턴이 반드시 선언해야 하는 그룹
pub const REQUIRED_REQUEST_GROUPS: &[&str] = &["domain", "ip_address", "status", "method"];

/// 요청 로그 규칙 집합을 생성합니다.
///
/// 패턴이 컴파일되지 않거나 필수 그룹이 빠져 있으면 에러를 반환합니다.
pub fn request_ruleset(pattern: &str) -> Result<RuleSet, LogPipelineError> {
    let rules = RuleSet::builder()
        .rule(REQUEST_RULE_NAME, pattern)
        .build()
        .map_err(|e| LogPipelineError::RequestPattern(e.to_string()))?;

    let declared: Vec<&str> = rules
        .rules()
        .iter()
        .flat_map(|r| r.group_names())
        .collect();
    let missing: Vec<&str> = REQUIRED_REQUEST_GROUPS
        .iter()
        .copied()
        .filter(|g| !declared.contains(g))
        .collect();
    if !missing.is_empty() {
        return Err(LogPipelineError::RequestPattern(format!(
            "missing named group(s): {}",
            missing.join(", ")
        )));
    }

    Ok(rules)
}

#[cfg(test)]
mod tests {
    use super::*;
    use logmeter_core::config::DEFAULT_REQUEST_PATTERN;

    use crate::rule::Classification;

    #[test]
    fn default_pattern_matches_documented_format() {
        let rules = request_ruleset(DEFAULT_REQUEST_PATTERN).unwrap();
        let line = "[01/Mar/2024:12:00:00 +0000] [example.com] [203.0.113.7] [200] [GET] /index.html 512";
        match rules.classify(line) {
            Classification::Matched(m) => {
                assert_eq!(m.rule, REQUEST_RULE_NAME);
                assert_eq!(m.get("domain"), Some("example.com"));
                assert_eq!(m.get("ip_address"), Some("203.0.113.7"));
                assert_eq!(m.get("status"), Some("200"));
                assert_eq!(m.get("method"), Some("GET"));
            }
            other => panic!("expected match, got {other}"),
        }
    }

    #[test]
    fn non_matching_line_is_unmatched_not_ignored() {
        let rules = request_ruleset(DEFAULT_REQUEST_PATTERN).unwrap();
        assert_eq!(
            rules.classify("garbage line"),
            Classification::Unmatched
        );
    }

    #[test]
    fn pattern_missing_group_is_rejected() {
        let err = request_ruleset(r"^(?P<domain>\S+) (?P<ip_address>\S+) (?P<method>\w+)$")
            .unwrap_err();
        assert!(matches!(err, LogPipelineError::RequestPattern(_)));
        assert!(err.to_string().contains("status"));
    }

    #[test]
    fn invalid_regex_is_rejected() {
        let err = request_ruleset("(?P<domain>").unwrap_err();
        assert!(matches!(err, LogPipelineError::RequestPattern(_)));
    }

    #[test]
    fn custom_pattern_with_extra_groups_is_accepted() {
        let rules = request_ruleset(
            r"^(?P<ip_address>\S+) (?P<domain>\S+) (?P<method>\w+) (?P<path>\S+) (?P<status>\d+)$",
        )
        .unwrap();
        assert!(matches!(
            rules.classify("198.51.100.1 api.example.org POST /v1/items 201"),
            Classification::Matched(_)
        ));
    }
}
