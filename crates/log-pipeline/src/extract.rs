//! 이벤트 추출 -- 매칭 결과를 소스 종류별 이벤트 레코드로 변환
//!
//! 분류가 성공한 뒤에는 실패하지 않습니다. 숫자 필드(PID, HTTP 상태)가
//! 잘못된 형식이면 0으로 대체합니다.

use std::str::FromStr;

use logmeter_core::event::{AuthEvent, LineRecord, RequestEvent};

use crate::rule::RuleMatch;

/// 인증 로그 매칭 결과에서 이벤트를 만듭니다.
///
/// `pid`, `username`, `ip_address`는 그룹이 선언되고 비어 있지 않을 때만 채워집니다.
pub fn extract_auth(m: &RuleMatch<'_>, record: &LineRecord) -> AuthEvent {
    AuthEvent {
        arrived_at: record.arrived_at,
        event_type: m.rule.to_owned(),
        hostname: m.get("hostname").unwrap_or_default().to_owned(),
        process: m.get("process").unwrap_or_default().to_owned(),
        pid: m.non_empty("pid").map(parse_or_zero::<u32>),
        username: m.non_empty("username").map(str::to_owned),
        ip_address: m.non_empty("ip_address").map(str::to_owned),
        raw: record.text.clone(),
        internal: false,
    }
}

/// 요청 로그 매칭 결과에서 이벤트를 만듭니다.
pub fn extract_request(m: &RuleMatch<'_>, record: &LineRecord) -> RequestEvent {
    RequestEvent {
        arrived_at: record.arrived_at,
        domain: m.get("domain").unwrap_or_default().to_owned(),
        ip_address: m.get("ip_address").unwrap_or_default().to_owned(),
        status: parse_or_zero(m.get("status").unwrap_or_default()),
        method: m.get("method").unwrap_or_default().to_owned(),
        raw: record.text.clone(),
        internal: false,
    }
}

fn parse_or_zero<T: FromStr + Default>(text: &str) -> T {
    text.parse().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, SystemTime};

    use super::*;
    use crate::rule::{Classification, RuleSet, auth_ruleset};

    fn record(text: &str) -> LineRecord {
        LineRecord {
            text: text.to_owned(),
            arrived_at: SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000),
        }
    }

    fn matched<'a>(rules: &'a RuleSet, text: &'a str) -> RuleMatch<'a> {
        match rules.classify(text) {
            Classification::Matched(m) => m,
            other => panic!("expected match, got {other}"),
        }
    }

    #[test]
    fn auth_event_from_invalid_user_line() {
        let rules = auth_ruleset().unwrap();
        let rec = record("Mar  1 12:00:00 host1 sshd[123]: Invalid user admin from 203.0.113.5");
        let event = extract_auth(&matched(&rules, &rec.text), &rec);

        assert_eq!(event.event_type, "invalidUser");
        assert_eq!(event.hostname, "host1");
        assert_eq!(event.process, "sshd");
        assert_eq!(event.pid, Some(123));
        assert_eq!(event.username.as_deref(), Some("admin"));
        assert_eq!(event.ip_address.as_deref(), Some("203.0.113.5"));
        assert_eq!(event.raw, rec.text);
        assert_eq!(event.arrived_at, rec.arrived_at);
        assert!(!event.internal);
    }

    #[test]
    fn undeclared_or_empty_groups_are_absent() {
        let rules = auth_ruleset().unwrap();
        let rec = record(
            "Jan 10 09:00:02 web-01 CRON: pam_unix(cron:session): session closed for user root",
        );
        let event = extract_auth(&matched(&rules, &rec.text), &rec);
        assert_eq!(event.pid, None);
        assert_eq!(event.ip_address, None);
        assert_eq!(event.username.as_deref(), Some("root"));
    }

    #[test]
    fn overflowing_pid_degrades_to_zero() {
        let rules = auth_ruleset().unwrap();
        let rec = record(
            "Mar  1 12:00:00 host1 sshd[99999999999]: Invalid user admin from 203.0.113.5",
        );
        let event = extract_auth(&matched(&rules, &rec.text), &rec);
        assert_eq!(event.pid, Some(0));
    }

    #[test]
    fn request_event_and_malformed_status() {
        let rules = RuleSet::builder()
            .rule(
                "request",
                r"^(?P<domain>\S+) (?P<ip_address>\S+) (?P<status>\S+) (?P<method>\w+)$",
            )
            .build()
            .unwrap();

        let rec = record("example.com 198.51.100.9 404 GET");
        let event = extract_request(&matched(&rules, &rec.text), &rec);
        assert_eq!(event.domain, "example.com");
        assert_eq!(event.ip_address, "198.51.100.9");
        assert_eq!(event.status, 404);
        assert_eq!(event.method, "GET");

        let rec = record("example.com 198.51.100.9 4x4 GET");
        let event = extract_request(&matched(&rules, &rec.text), &rec);
        assert_eq!(event.status, 0);
    }
}
