//! 분류 규칙 엔진 -- 순서 있는 정규식 규칙으로 줄을 이벤트 타입에 매핑
//!
//! 두 종류의 규칙 집합을 제공합니다.
//!
//! - [`auth_ruleset`]: 인증 로그용 내장 테이블 (이름 있는 규칙 9개 + 무시 규칙 10개)
//! - [`request_ruleset`]: 요청 로그용 사용자 정의 패턴 1개 (무시 규칙 없음)
//!
//! 두 집합 모두 [`RuleSet::classify`] 하나로 분류합니다.
//!
//! # 아키텍처
//! - [`matcher`]: `RuleSet`과 빌더 (first-match-wins + 무시 집합)
//! - [`types`]: 규칙, 매칭 결과, 분류 결과 타입
//! - [`auth`]: 인증 로그 규칙 테이블
//! - [`request`]: 요청 로그 패턴 검증

pub mod auth;
pub mod matcher;
pub mod request;
pub mod types;

pub use auth::auth_ruleset;
pub use matcher::{RuleSet, RuleSetBuilder};
pub use request::{REQUEST_RULE_NAME, request_ruleset};
pub use types::{Classification, MatchRule, RuleMatch};

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ipv4() -> impl Strategy<Value = String> {
        (any::<u8>(), any::<u8>(), any::<u8>(), any::<u8>())
            .prop_map(|(a, b, c, d)| format!("{a}.{b}.{c}.{d}"))
    }

    proptest! {
        /// 규칙 패턴으로 만든 줄은 같은 규칙으로 분류되고 주입한 값이 그대로 추출되어야 함
        #[test]
        fn generated_invalid_user_lines_round_trip(
            host in "[a-z][a-z0-9\\-]{0,15}",
            process in "[a-z][a-z_]{1,10}",
            pid in 1u32..4_000_000,
            user in "[a-z_][a-z0-9_]{0,15}",
            ip in ipv4(),
        ) {
            let rules = auth_ruleset().unwrap();
            let line = format!("Mar  1 12:00:00 {host} {process}[{pid}]: Invalid user {user} from {ip}");
            match rules.classify(&line) {
                Classification::Matched(m) => {
                    let pid_text = pid.to_string();
                    prop_assert_eq!(m.rule, "invalidUser");
                    prop_assert_eq!(m.get("hostname"), Some(host.as_str()));
                    prop_assert_eq!(m.get("process"), Some(process.as_str()));
                    prop_assert_eq!(m.get("pid"), Some(pid_text.as_str()));
                    prop_assert_eq!(m.get("username"), Some(user.as_str()));
                    prop_assert_eq!(m.get("ip_address"), Some(ip.as_str()));
                }
                other => prop_assert!(false, "unexpected classification {}", other),
            }
        }

        #[test]
        fn generated_failed_password_lines_round_trip(
            host in "[a-z][a-z0-9]{0,12}",
            user in "[a-z][a-z0-9]{0,12}",
            ip in ipv4(),
            port in 1u16..=u16::MAX,
        ) {
            let rules = auth_ruleset().unwrap();
            let line = format!("Oct 31 23:59:59 {host} sshd[1]: Failed password for {user} from {ip} port {port} ssh2");
            match rules.classify(&line) {
                Classification::Matched(m) => {
                    prop_assert_eq!(m.rule, "failedPassword");
                    prop_assert_eq!(m.get("username"), Some(user.as_str()));
                    prop_assert_eq!(m.get("ip_address"), Some(ip.as_str()));
                }
                other => prop_assert!(false, "unexpected classification {}", other),
            }
        }

        #[test]
        fn generated_request_lines_round_trip(
            domain in "[a-z]{1,10}\\.(com|org|net)",
            ip in ipv4(),
            status in 100u16..600,
            method in "(GET|POST|PUT|DELETE|HEAD)",
        ) {
            let rules = request_ruleset(logmeter_core::config::DEFAULT_REQUEST_PATTERN).unwrap();
            let line = format!("[01/Jan/2024:00:00:00 +0000] [{domain}] [{ip}] [{status}] [{method}] /path 0");
            match rules.classify(&line) {
                Classification::Matched(m) => {
                    let status_text = status.to_string();
                    prop_assert_eq!(m.get("domain"), Some(domain.as_str()));
                    prop_assert_eq!(m.get("ip_address"), Some(ip.as_str()));
                    prop_assert_eq!(m.get("status"), Some(status_text.as_str()));
                    prop_assert_eq!(m.get("method"), Some(method.as_str()));
                }
                other => prop_assert!(false, "unexpected classification {}", other),
            }
        }

        /// 임의 입력에도 패닉 없이 세 결과 중 하나를 반환해야 함
        #[test]
        fn classify_never_panics(line in "\\PC{0,256}") {
            let rules = auth_ruleset().unwrap();
            let _ = rules.classify(&line);
        }
    }
}
