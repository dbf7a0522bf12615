//! 규칙 매칭 로직 -- 순서 있는 이름 규칙과 무시 규칙 집합
//!
//! [`RuleSet`]은 줄 하나를 다음 순서로 분류합니다.
//!
//! 1. 이름 있는 규칙을 선언 순서대로 평가하고, 처음 매칭된 규칙에서 멈춥니다.
//! 2. 매칭된 규칙이 없으면 무시 규칙 집합 중 하나라도 매칭되는지 확인합니다.
//! 3. 둘 다 아니면 `Unmatched`입니다.
//!
//! 정규식은 규칙 집합 생성 시 한 번만 컴파일됩니다.

use regex::RegexSet;

use super::types::{Classification, MatchRule};
use crate::error::LogPipelineError;

/// 분류 규칙 집합
///
/// 생성 후에는 불변이므로 `Arc`로 여러 파이프라인이 공유할 수 있습니다.
///
/// # 사용 예시
/// ```ignore
/// let rules = RuleSet::builder()
///     .rule("login", r"^login (?P<user>\S+)$")
///     .ignore(r"^heartbeat")
///     .build()?;
///
/// match rules.classify("login alice") {
///     Classification::Matched(m) => assert_eq!(m.rule, "login"),
///     _ => unreachable!(),
/// }
/// ```
#[derive(Debug, Clone)]
pub struct RuleSet {
    /// 이름 있는 규칙 (선언 순서)
    rules: Vec<MatchRule>,
    /// 무시 규칙 (순서 무관)
    ignore: RegexSet,
}

impl RuleSet {
    /// 빌더를 생성합니다.
    pub fn builder() -> RuleSetBuilder {
        RuleSetBuilder::default()
    }

    /// 줄 하나를 분류합니다.
    pub fn classify<'a>(&'a self, text: &'a str) -> Classification<'a> {
        for rule in &self.rules {
            if let Some(m) = rule.match_line(text) {
                return Classification::Matched(m);
            }
        }

        if self.ignore.is_match(text) {
            Classification::Ignored
        } else {
            Classification::Unmatched
        }
    }

    /// 이름 있는 규칙 목록을 반환합니다.
    pub fn rules(&self) -> &[MatchRule] {
        &self.rules
    }

    /// 이름 있는 규칙 수를 반환합니다.
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// 무시 규칙 수를 반환합니다.
    pub fn ignore_count(&self) -> usize {
        self.ignore.len()
    }
}

/// 규칙 집합 빌더
///
/// 패턴 문자열을 모아 두었다가 `build()`에서 한꺼번에 컴파일합니다.
#[derive(Debug, Default)]
pub struct RuleSetBuilder {
    rules: Vec<(String, String)>,
    ignore: Vec<String>,
}

impl RuleSetBuilder {
    /// 이름 있는 규칙을 추가합니다. 추가 순서가 평가 순서입니다.
    pub fn rule(mut self, name: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.rules.push((name.into(), pattern.into()));
        self
    }

    /// 무시 규칙을 추가합니다.
    pub fn ignore(mut self, pattern: impl Into<String>) -> Self {
        self.ignore.push(pattern.into());
        self
    }

    /// 모든 패턴을 컴파일하고 규칙 이름 중복을 검사합니다.
    pub fn build(self) -> Result<RuleSet, LogPipelineError> {
        let mut rules: Vec<MatchRule> = Vec::with_capacity(self.rules.len());
        for (name, pattern) in self.rules {
            if rules.iter().any(|r| r.name() == name) {
                return Err(LogPipelineError::RuleValidation {
                    rule: name,
                    reason: "duplicate rule name".to_owned(),
                });
            }
            rules.push(MatchRule::new(name, &pattern)?);
        }

        let ignore = RegexSet::new(&self.ignore).map_err(|e| LogPipelineError::RuleValidation {
            rule: "(ignore)".to_owned(),
            reason: format!("invalid ignore pattern: {e}"),
        })?;

        Ok(RuleSet { rules, ignore })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::RuleMatch;

    fn sample_rules() -> RuleSet {
        RuleSet::builder()
            .rule("specific", r"^GET /admin (?P<user>\w+)$")
            .rule("generic", r"^GET (?P<path>\S+)")
            .ignore(r"^HEAD ")
            .ignore(r"^OPTIONS ")
            .build()
            .unwrap()
    }

    #[test]
    fn first_declared_rule_wins() {
        let rules = sample_rules();
        match rules.classify("GET /admin root") {
            Classification::Matched(RuleMatch { rule, fields }) => {
                assert_eq!(rule, "specific");
                assert_eq!(fields, vec![("user", "root")]);
            }
            other => panic!("expected match, got {other}"),
        }
        match rules.classify("GET /index.html") {
            Classification::Matched(m) => assert_eq!(m.rule, "generic"),
            other => panic!("expected match, got {other}"),
        }
    }

    #[test]
    fn ignore_rules_apply_only_without_named_match() {
        let rules = RuleSet::builder()
            .rule("head", r"^HEAD /important")
            .ignore(r"^HEAD ")
            .build()
            .unwrap();
        assert!(matches!(
            rules.classify("HEAD /important"),
            Classification::Matched(_)
        ));
        assert_eq!(rules.classify("HEAD /other"), Classification::Ignored);
    }

    #[test]
    fn unknown_line_is_unmatched() {
        assert_eq!(
            sample_rules().classify("POST /form"),
            Classification::Unmatched
        );
        assert_eq!(sample_rules().classify(""), Classification::Unmatched);
    }

    #[test]
    fn empty_ignore_set_never_ignores() {
        let rules = RuleSet::builder().rule("any", r"^x$").build().unwrap();
        assert_eq!(rules.ignore_count(), 0);
        assert_eq!(rules.classify("y"), Classification::Unmatched);
    }

    #[test]
    fn duplicate_rule_name_is_rejected() {
        let err = RuleSet::builder()
            .rule("dup", "a")
            .rule("dup", "b")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn invalid_ignore_pattern_is_rejected() {
        let err = RuleSet::builder().ignore("(unclosed").build().unwrap_err();
        assert!(err.to_string().contains("ignore"));
    }

    #[test]
    fn counts() {
        let rules = sample_rules();
        assert_eq!(rules.rule_count(), 2);
        assert_eq!(rules.ignore_count(), 2);
        assert_eq!(rules.rules()[0].name(), "specific");
    }
}
