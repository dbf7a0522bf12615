//! 로그 수집 모듈 -- 로그 파일에서 새 줄을 읽어 파이프라인으로 전달합니다.
//!
//! # 아키텍처
//! [`FileTailer::open`]이 자체 tokio 태스크에서 폴링을 시작하고,
//! 읽은 줄을 `tokio::mpsc::Receiver<LineRecord>` 채널로 전달합니다.
//! [`TailControl`]로 중지 요청과 태스크 회수를 합니다.

pub mod file;

pub use file::{FileTailer, TailConfig, TailControl, TailHandle};
