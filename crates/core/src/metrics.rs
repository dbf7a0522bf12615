//! 메트릭 상수 및 설명 등록
//!
//! 모든 Prometheus 메트릭의 이름, 레이블 키, 설명을 중앙에서 정의합니다.
//! 메트릭 싱크와 파이프라인은 이 상수로 `metrics::counter!()`를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `logmeter_`
//! - 소스: `auth_`, `request_`
//! - 접미어: `_total` (counter)
//!
//! # 카디널리티
//!
//! 레이블 값은 유한한 집합에서만 나옵니다. 원시 IP 주소와 원문은
//! 절대 레이블 값이 되지 않으며, 내부/외부 구분은 `internal` 불리언으로만 표현합니다.
//!
//! # 사용 예시
//!
//! ```ignore
//! use logmeter_core::metrics as m;
//! use metrics::counter;
//!
//! counter!(m::LINES_READ_TOTAL, m::LABEL_SOURCE => "auth").increment(1);
//! ```

use std::sync::Once;

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 호스트명 레이블 키
pub const LABEL_HOSTNAME: &str = "hostname";

/// 프로세스명 레이블 키
pub const LABEL_PROCESS: &str = "process";

/// 이벤트 타입(규칙 이름) 레이블 키
pub const LABEL_TYPE: &str = "type";

/// 사용자명 레이블 키
pub const LABEL_USER: &str = "user";

/// 내부 주소 여부 레이블 키 (`true`, `false`)
pub const LABEL_INTERNAL: &str = "internal";

/// 도메인 레이블 키
pub const LABEL_DOMAIN: &str = "domain";

/// HTTP 메서드 레이블 키
pub const LABEL_METHOD: &str = "method";

/// HTTP 상태 코드 레이블 키
pub const LABEL_STATUS: &str = "status";

/// 대륙 코드 레이블 키
pub const LABEL_CONTINENT_CODE: &str = "continent_code";

/// 대륙 이름 레이블 키
pub const LABEL_CONTINENT_NAME: &str = "continent_name";

/// 국가 코드 레이블 키
pub const LABEL_COUNTRY_CODE: &str = "country_code";

/// 국가 이름 레이블 키
pub const LABEL_COUNTRY_NAME: &str = "country_name";

/// 도시 이름 레이블 키
pub const LABEL_CITY: &str = "city";

/// 소스 종류 레이블 키 (`auth`, `request`)
pub const LABEL_SOURCE: &str = "source";

/// 결과 레이블 키 (`found`, `not_found`, `error`)
pub const LABEL_RESULT: &str = "result";

// ─── 이벤트 메트릭 ─────────────────────────────────────────────────

/// 인증 이벤트 수 (counter, labels: hostname, process, type, user, internal)
pub const AUTH_LINES_TOTAL: &str = "logmeter_auth_lines_total";

/// 인증 이벤트의 지리 위치별 수 (counter, labels: 위치 5종)
pub const AUTH_LOCATIONS_TOTAL: &str = "logmeter_auth_locations_total";

/// 요청 이벤트 수 (counter, labels: domain, method, status, internal)
pub const REQUEST_LINES_TOTAL: &str = "logmeter_request_lines_total";

/// 요청 이벤트의 지리 위치별 수 (counter, labels: domain + 위치 5종)
pub const REQUEST_LOCATIONS_TOTAL: &str = "logmeter_request_locations_total";

// ─── 자체 관측 메트릭 ───────────────────────────────────────────────

/// 읽은 전체 줄 수 (counter, label: source)
pub const LINES_READ_TOTAL: &str = "logmeter_lines_read_total";

/// 무시 규칙에 걸린 줄 수 (counter, label: source)
pub const LINES_IGNORED_TOTAL: &str = "logmeter_lines_ignored_total";

/// 어떤 규칙과도 매칭되지 않은 줄 수 (counter, label: source)
pub const LINES_UNMATCHED_TOTAL: &str = "logmeter_lines_unmatched_total";

/// GeoIP 조회 수 (counter, label: result)
pub const GEOIP_LOOKUPS_TOTAL: &str = "logmeter_geoip_lookups_total";

/// GeoIP 조회 결과: 위치 발견
pub const RESULT_FOUND: &str = "found";
/// GeoIP 조회 결과: DB에 없음
pub const RESULT_NOT_FOUND: &str = "not_found";
/// GeoIP 조회 결과: 조회 에러
pub const RESULT_ERROR: &str = "error";

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

static DESCRIBE: Once = Once::new();

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 프로세스당 한 번만 실제로 등록하며, 이후 호출은 아무 일도 하지 않습니다.
/// 일반적으로 `logmeter-daemon`이 레코더 설치 직후 호출합니다.
pub fn describe_all() {
    DESCRIBE.call_once(|| {
        use metrics::describe_counter;

        describe_counter!(
            AUTH_LINES_TOTAL,
            "Authentication log events by host, process, event type, user and internal flag"
        );
        describe_counter!(
            AUTH_LOCATIONS_TOTAL,
            "Authentication log events by geographic location of the remote address"
        );
        describe_counter!(
            REQUEST_LINES_TOTAL,
            "HTTP request log events by domain, method, status and internal flag"
        );
        describe_counter!(
            REQUEST_LOCATIONS_TOTAL,
            "HTTP request log events by domain and geographic location of the client"
        );

        describe_counter!(LINES_READ_TOTAL, "Total number of log lines read per source");
        describe_counter!(
            LINES_IGNORED_TOTAL,
            "Total number of log lines suppressed by an ignore rule"
        );
        describe_counter!(
            LINES_UNMATCHED_TOTAL,
            "Total number of log lines that matched no rule"
        );
        describe_counter!(GEOIP_LOOKUPS_TOTAL, "GeoIP database lookups by result");
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_METRIC_NAMES: &[&str] = &[
        AUTH_LINES_TOTAL,
        AUTH_LOCATIONS_TOTAL,
        REQUEST_LINES_TOTAL,
        REQUEST_LOCATIONS_TOTAL,
        LINES_READ_TOTAL,
        LINES_IGNORED_TOTAL,
        LINES_UNMATCHED_TOTAL,
        GEOIP_LOOKUPS_TOTAL,
    ];

    #[test]
    fn all_metrics_follow_naming_convention() {
        for name in ALL_METRIC_NAMES {
            assert!(
                name.starts_with("logmeter_") && name.ends_with("_total"),
                "Metric '{}' must be logmeter_*_total",
                name
            );
        }
    }

    #[test]
    fn describe_all_is_idempotent() {
        // 레코더 없이 여러 번 호출해도 패닉하지 않아야 함
        describe_all();
        describe_all();
    }

    #[test]
    fn label_keys_are_lowercase() {
        let labels = [
            LABEL_HOSTNAME,
            LABEL_PROCESS,
            LABEL_TYPE,
            LABEL_USER,
            LABEL_INTERNAL,
            LABEL_DOMAIN,
            LABEL_METHOD,
            LABEL_STATUS,
            LABEL_CONTINENT_CODE,
            LABEL_CONTINENT_NAME,
            LABEL_COUNTRY_CODE,
            LABEL_COUNTRY_NAME,
            LABEL_CITY,
            LABEL_SOURCE,
            LABEL_RESULT,
        ];
        for label in &labels {
            assert_eq!(
                label.to_lowercase(),
                *label,
                "Label key '{}' should be lowercase",
                label
            );
        }
    }
}
