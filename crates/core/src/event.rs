//! 이벤트 타입 -- 소스 파이프라인 한 단계 안에서 생성되고 소비되는 레코드
//!
//! 처리 흐름:
//! ```text
//! LineRecord → classify → Event(Auth | Request) → enrich → GeoLocation?
//! ```
//!
//! [`LineRecord`]와 [`Event`]는 한 번의 처리 단계 안에서만 살아 있습니다.

use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

// ─── SourceKind ──────────────────────────────────────────────────────

/// 로그 소스 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// 인증 로그 (sshd, pam 등)
    Auth,
    /// HTTP 요청 로그
    Request,
}

impl SourceKind {
    /// 메트릭 레이블과 로그 필드에 사용하는 이름을 반환합니다.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auth => "auth",
            Self::Request => "request",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── LineRecord ──────────────────────────────────────────────────────

/// tail에서 읽은 한 줄과 도착 시각
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineRecord {
    /// 줄 내용 (개행 문자 제외)
    pub text: String,
    /// 줄을 읽은 시각
    pub arrived_at: SystemTime,
}

impl LineRecord {
    /// 현재 시각을 도착 시각으로 하는 레코드를 생성합니다.
    pub fn now(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            arrived_at: SystemTime::now(),
        }
    }
}

// ─── AuthEvent ───────────────────────────────────────────────────────

/// 인증 로그에서 추출한 이벤트
///
/// 선택 필드(`pid`, `username`, `ip_address`)는 규칙이 해당 캡처 그룹을
/// 선언했고 비어 있지 않은 텍스트와 매칭됐을 때만 `Some`입니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthEvent {
    /// 줄 도착 시각
    pub arrived_at: SystemTime,
    /// 매칭된 규칙 이름 (예: `invalidUser`)
    pub event_type: String,
    /// 호스트명
    pub hostname: String,
    /// 프로세스명 (예: `sshd`)
    pub process: String,
    /// 프로세스 ID
    pub pid: Option<u32>,
    /// 사용자명
    pub username: Option<String>,
    /// 원격 IP 주소
    pub ip_address: Option<String>,
    /// 원문
    pub raw: String,
    /// 내부 주소 여부 (enrichment에서 설정)
    pub internal: bool,
}

// ─── RequestEvent ────────────────────────────────────────────────────

/// 요청 로그에서 추출한 이벤트
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestEvent {
    /// 줄 도착 시각
    pub arrived_at: SystemTime,
    /// 요청 도메인
    pub domain: String,
    /// 클라이언트 IP 주소
    pub ip_address: String,
    /// HTTP 상태 코드 (파싱 실패 시 0)
    pub status: u16,
    /// HTTP 메서드
    pub method: String,
    /// 원문
    pub raw: String,
    /// 내부 주소 여부 (enrichment에서 설정)
    pub internal: bool,
}

// ─── Event ───────────────────────────────────────────────────────────

/// 소스 종류별로 구분된 이벤트
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    /// 인증 이벤트
    Auth(AuthEvent),
    /// 요청 이벤트
    Request(RequestEvent),
}

impl Event {
    /// 이벤트의 소스 종류를 반환합니다.
    pub fn kind(&self) -> SourceKind {
        match self {
            Self::Auth(_) => SourceKind::Auth,
            Self::Request(_) => SourceKind::Request,
        }
    }

    /// 비어 있지 않은 IP 주소를 반환합니다.
    pub fn ip_address(&self) -> Option<&str> {
        let ip = match self {
            Self::Auth(e) => e.ip_address.as_deref(),
            Self::Request(e) => Some(e.ip_address.as_str()),
        };
        ip.filter(|s| !s.is_empty())
    }

    /// 내부 주소 여부를 반환합니다.
    pub fn is_internal(&self) -> bool {
        match self {
            Self::Auth(e) => e.internal,
            Self::Request(e) => e.internal,
        }
    }

    /// 내부 주소 태그를 설정합니다.
    pub fn set_internal(&mut self, internal: bool) {
        match self {
            Self::Auth(e) => e.internal = internal,
            Self::Request(e) => e.internal = internal,
        }
    }

    /// 원문을 반환합니다.
    pub fn raw(&self) -> &str {
        match self {
            Self::Auth(e) => &e.raw,
            Self::Request(e) => &e.raw,
        }
    }
}

impl From<AuthEvent> for Event {
    fn from(event: AuthEvent) -> Self {
        Self::Auth(event)
    }
}

impl From<RequestEvent> for Event {
    fn from(event: RequestEvent) -> Self {
        Self::Request(event)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auth(e) => write!(
                f,
                "auth type={} host={} process={} user={} ip={}",
                e.event_type,
                e.hostname,
                e.process,
                e.username.as_deref().unwrap_or("-"),
                e.ip_address.as_deref().unwrap_or("-"),
            ),
            Self::Request(e) => write!(
                f,
                "request domain={} method={} status={} ip={}",
                e.domain, e.method, e.status, e.ip_address,
            ),
        }
    }
}

// ─── GeoLocation ─────────────────────────────────────────────────────

/// IP 주소의 지리 정보
///
/// 조회 실패나 enrichment 생략 시에는 값 자체가 없습니다 (에러 아님).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoLocation {
    /// 대륙 코드 (예: `NA`)
    pub continent_code: String,
    /// 대륙 이름 (영문)
    pub continent_name: String,
    /// 국가 ISO 코드 (예: `US`)
    pub country_code: String,
    /// 국가 이름 (영문)
    pub country_name: String,
    /// 도시 이름 (영문, 없으면 빈 문자열)
    pub city: String,
}
