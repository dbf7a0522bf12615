//! 에러 타입 -- 도메인별 에러 정의

/// logmeter 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum LogmeterError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 파이프라인 처리 에러
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 파이프라인 생명주기 에러
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// 이미 실행 중인 파이프라인을 다시 시작하려 함
    #[error("pipeline already running")]
    AlreadyRunning,

    /// 실행 중이 아닌 파이프라인을 정지하려 함
    #[error("pipeline not running")]
    NotRunning,

    /// 파이프라인 시작 실패 (소스 파일, GeoIP DB 등 리소스 획득 실패)
    #[error("pipeline start failed: {0}")]
    StartFailed(String),

    /// 하나 이상의 파이프라인 정지 실패
    #[error("pipeline stop failed: {0}")]
    StopFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_converts_to_logmeter_error() {
        let err: LogmeterError = ConfigError::InvalidValue {
            field: "general.log_level".to_owned(),
            reason: "unknown".to_owned(),
        }
        .into();
        assert!(matches!(err, LogmeterError::Config(_)));
        assert!(err.to_string().contains("general.log_level"));
    }

    #[test]
    fn pipeline_error_display() {
        let err = PipelineError::StartFailed("auth: file not found".to_owned());
        assert_eq!(
            err.to_string(),
            "pipeline start failed: auth: file not found"
        );
        assert_eq!(PipelineError::NotRunning.to_string(), "pipeline not running");
    }
}
