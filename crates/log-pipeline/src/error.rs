//! 로그 파이프라인 에러 타입
//!
//! [`LogPipelineError`]는 로그 파이프라인 내부에서 발생하는 모든 에러를 표현합니다.
//! `From<LogPipelineError> for LogmeterError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.
//!
//! 분류 실패(Unmatched), 선택 필드 파싱 실패, GeoIP 조회 miss는 에러가 아닙니다.
//! 이 타입은 리소스 획득 실패와 설정 오류에만 사용됩니다.

use logmeter_core::error::{ConfigError, LogmeterError, PipelineError};

/// 로그 파이프라인 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum LogPipelineError {
    /// 분류 규칙 유효성 검증 실패
    #[error("rule validation error: rule '{rule}': {reason}")]
    RuleValidation {
        /// 문제가 된 규칙 이름
        rule: String,
        /// 검증 실패 사유
        reason: String,
    },

    /// 요청 로그 패턴이 필수 그룹을 갖지 않음
    #[error("invalid request pattern: {0}")]
    RequestPattern(String),

    /// 소스 파일 열기 실패
    #[error("cannot open source '{path}': {reason}")]
    SourceOpen {
        /// 파일 경로
        path: String,
        /// 실패 사유
        reason: String,
    },

    /// tail 태스크 에러
    #[error("tail error: {path}: {reason}")]
    Tail {
        /// 파일 경로
        path: String,
        /// 에러 사유
        reason: String,
    },

    /// GeoIP DB 열기 실패
    #[error("cannot open geoip database '{path}': {reason}")]
    GeoDatabase {
        /// DB 경로
        path: String,
        /// 실패 사유
        reason: String,
    },

    /// GeoIP 조회 에러 (DB 손상, 이미 닫힘 등)
    #[error("geoip lookup error: {0}")]
    GeoLookup(String),

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// 정규식 컴파일 에러
    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),
}

impl From<LogPipelineError> for LogmeterError {
    fn from(err: LogPipelineError) -> Self {
        match err {
            LogPipelineError::Config { field, reason } => {
                LogmeterError::Config(ConfigError::InvalidValue { field, reason })
            }
            LogPipelineError::RequestPattern(reason) => {
                LogmeterError::Config(ConfigError::InvalidValue {
                    field: "sources.request_pattern".to_owned(),
                    reason,
                })
            }
            other => LogmeterError::Pipeline(PipelineError::StartFailed(other.to_string())),
        }
    }
}
