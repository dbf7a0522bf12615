//! 인증 로그 내장 규칙 테이블
//!
//! 모든 규칙은 syslog 형식의 공통 접두어(날짜, 시각, 호스트명, 프로세스명,
//! 선택적 PID)를 공유합니다.
//!
//! ```text
//! Mar  1 12:00:00 host1 sshd[123]: Invalid user admin from 203.0.113.5
//! └─ date ┘└ time ┘└host┘└proc┘└pid┘ └──────── rule body ────────────┘
//! ```

use super::matcher::RuleSet;
use crate::error::LogPipelineError;

/// 공통 접두어
pub const AUTH_LINE_PREFIX: &str = r"^(?P<date>[A-Z][a-z]{2}\s+\d{1,2}) (?P<time>(?:\d{2}:?){3}) (?P<hostname>[a-zA-Z0-9_\-\.]+) (?P<process>[a-zA-Z0-9_\-\.]+)(?:\[(?P<pid>\d+)\])?: ";

/// 이름 있는 규칙 (평가 순서)
pub const AUTH_RULES: &[(&str, &str)] = &[
    (
        "pamSessionClosed",
        r"pam_unix\(.*\): session closed for user (?P<username>[^\s(]+)",
    ),
    (
        "pamSessionOpened",
        r"pam_unix\(.*\): session opened for user (?P<username>[^\s(]+)(?:\(uid=\d+\))? by",
    ),
    (
        "noIdentificationString",
        r"Did not receive identification string from (?P<ip_address>\S+)",
    ),
    (
        "connectionClosed",
        r"Connection closed by (?:(?:authenticating|invalid) user (?P<username>\S+) )?(?P<ip_address>\S+) port \d+",
    ),
    (
        "maxAuthAttempts",
        r"error: maximum authentication attempts exceeded for (?:invalid user )?(?P<username>\S+) from (?P<ip_address>\S+) port \d+",
    ),
    (
        "invalidUser",
        r"Invalid user (?P<username>\S*) from (?P<ip_address>\S+)",
    ),
    (
        "userNotAllowed",
        r"User (?P<username>\S+) from (?P<ip_address>\S+) not allowed because not listed in ",
    ),
    (
        "failedPassword",
        r"Failed password for (?:invalid user )?(?P<username>\S+) from (?P<ip_address>\S+) port \d+",
    ),
    (
        "acceptedPassword",
        r"Accepted password for (?P<username>\S+) from (?P<ip_address>\S+) port \d+",
    ),
];

/// 무시 규칙 -- 매칭되면 메트릭 없이 조용히 버립니다.
pub const AUTH_IGNORE_RULES: &[&str] = &[
    r"(?:error: )?Received disconnect from ",
    r"Disconnected from ",
    r"input_userauth_request: invalid user ",
    r"fatal: Unable to negotiate with ",
    r"Disconnecting: Too many authentication failures",
    r"Connection reset by ",
    r"Bad protocol version identification ",
    r"New session \d+ of user ",
    r"Removed session ",
    r"Accepted publickey for ",
];

/// 내장 인증 로그 규칙 집합을 생성합니다.
///
/// 결과는 불변이므로 호출자는 `Arc`로 감싸 여러 파이프라인에서 공유합니다.
pub fn auth_ruleset() -> Result<RuleSet, LogPipelineError> {
    let builder = AUTH_RULES
        .iter()
        .fold(RuleSet::builder(), |b, (name, body)| {
            b.rule(*name, format!("{AUTH_LINE_PREFIX}{body}"))
        });
    AUTH_IGNORE_RULES
        .iter()
        .fold(builder, |b, body| b.ignore(format!("{AUTH_LINE_PREFIX}{body}")))
        .build()
}
