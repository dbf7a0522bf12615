//! 파일 tail 수집기
//!
//! 로그 파일을 주기적으로 폴링하며 새로 추가된 완전한 줄을 채널로 보냅니다.
//! `tail -F`와 유사한 동작을 비동기 방식으로 구현합니다.
//!
//! # 동작
//! - 파일이 없으면 `open` 시점에 실패
//! - `start_at_end`이면 현재 파일 끝부터, 아니면 처음부터 읽음
//! - 개행으로 끝나지 않은 마지막 줄은 개행이 올 때까지 보류
//! - 최대 길이를 넘는 줄은 잘라서 보내고 나머지는 개행까지 버림
//!
//! # 로테이션 감지
//! - inode 변경 (logrotate 등): 이전 파일을 끝까지 읽고 새 파일을 처음부터 읽음
//! - 파일 크기 축소 (truncation): 처음부터 다시 읽음

use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::time::Duration;

use logmeter_core::event::LineRecord;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::LogPipelineError;

const READ_CHUNK_SIZE: usize = 8 * 1024;

/// tail 설정
#[derive(Debug, Clone)]
pub struct TailConfig {
    /// 파일 상태 확인 주기
    pub poll_interval: Duration,
    /// 최대 줄 길이 (바이트)
    pub max_line_length: usize,
    /// 줄 채널 용량
    pub channel_capacity: usize,
}

impl Default for TailConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(250),
            max_line_length: 64 * 1024, // 64KB
            channel_capacity: 1024,
        }
    }
}

/// 파일 tail 수집기
#[derive(Debug, Clone)]
pub struct FileTailer {
    path: PathBuf,
    config: TailConfig,
}

impl FileTailer {
    /// 새 tail 수집기를 생성합니다.
    pub fn new(path: impl Into<PathBuf>, config: TailConfig) -> Self {
        Self {
            path: path.into(),
            config,
        }
    }

    /// 감시 대상 경로를 반환합니다.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 파일을 열고 폴링 태스크를 시작합니다.
    ///
    /// tokio 런타임 안에서 호출해야 합니다.
    pub async fn open(self, start_at_end: bool) -> Result<TailHandle, LogPipelineError> {
        let source_err = |e: std::io::Error| LogPipelineError::SourceOpen {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        };

        let mut file = File::open(&self.path).await.map_err(source_err)?;
        let meta = file.metadata().await.map_err(source_err)?;
        if !meta.is_file() {
            return Err(LogPipelineError::SourceOpen {
                path: self.path.display().to_string(),
                reason: "not a regular file".to_owned(),
            });
        }

        let offset = if start_at_end { meta.len() } else { 0 };
        file.seek(SeekFrom::Start(offset))
            .await
            .map_err(source_err)?;

        info!(
            path = %self.path.display(),
            offset,
            start_at_end,
            "tailing log file"
        );

        let (tx, rx) = mpsc::channel(self.config.channel_capacity.max(1));
        let cancel = CancellationToken::new();
        let state = TailState {
            inode: inode_of(&meta),
            path: self.path.clone(),
            file,
            offset,
            pending: Vec::new(),
            discarding: false,
            max_line_length: self.config.max_line_length.max(1),
        };
        let task = tokio::spawn(run(
            state,
            tx,
            cancel.clone(),
            self.config.poll_interval,
        ));

        Ok(TailHandle {
            lines: rx,
            control: TailControl {
                path: self.path,
                cancel,
                task: Some(task),
            },
        })
    }
}

/// 열린 tail 핸들
///
/// 줄 수신 채널과 폴링 태스크 제어를 묶습니다.
#[derive(Debug)]
pub struct TailHandle {
    lines: mpsc::Receiver<LineRecord>,
    control: TailControl,
}

impl TailHandle {
    /// 다음 줄을 기다립니다. 태스크가 끝나면 `None`입니다.
    pub async fn recv(&mut self) -> Option<LineRecord> {
        self.lines.recv().await
    }

    /// 폴링 중지를 요청합니다.
    pub fn stop(&self) {
        self.control.stop();
    }

    /// 폴링을 멈추고 태스크 종료를 기다립니다.
    pub async fn release(self) {
        self.control.release().await;
    }

    /// 수신 채널과 제어 핸들로 분리합니다.
    pub fn into_parts(self) -> (mpsc::Receiver<LineRecord>, TailControl) {
        (self.lines, self.control)
    }
}

/// 폴링 태스크 제어 핸들
///
/// drop 시에도 폴링 태스크에 취소를 요청합니다.
#[derive(Debug)]
pub struct TailControl {
    path: PathBuf,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl TailControl {
    /// 폴링 중지를 요청합니다. 여러 번 호출해도 됩니다.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// 폴링 태스크가 끝났는지 확인합니다.
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// 폴링을 멈추고 태스크 종료를 기다립니다.
    pub async fn release(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(path = %self.path.display(), error = %e, "tail task ended abnormally");
            }
        }
        debug!(path = %self.path.display(), "tail released");
    }
}

impl Drop for TailControl {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ─── 폴링 루프 ───────────────────────────────────────────────────────

/// 파일별 추적 상태
struct TailState {
    path: PathBuf,
    file: File,
    /// 마지막 읽기 위치 (바이트 오프셋)
    offset: u64,
    /// 현재 파일의 inode (Unix 전용, 그 외는 None)
    inode: Option<u64>,
    /// 아직 개행을 만나지 못한 줄 조각
    pending: Vec<u8>,
    /// 최대 길이 초과 후 개행까지 버리는 중
    discarding: bool,
    max_line_length: usize,
}

enum Rotation {
    None,
    Truncated,
    Replaced { file: File, inode: Option<u64> },
}

async fn run(
    mut state: TailState,
    tx: mpsc::Sender<LineRecord>,
    cancel: CancellationToken,
    poll_interval: Duration,
) {
    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {
                match state.poll(&tx, &cancel).await {
                    Ok(true) => {}
                    Ok(false) => break,
                    Err(e) => warn!(path = %state.path.display(), error = %e, "tail poll failed"),
                }
            }
        }
    }

    debug!(path = %state.path.display(), offset = state.offset, "tail loop finished");
}

impl TailState {
    /// 새 데이터를 읽고 로테이션을 처리합니다. 계속해야 하면 `true`입니다.
    async fn poll(
        &mut self,
        tx: &mpsc::Sender<LineRecord>,
        cancel: &CancellationToken,
    ) -> Result<bool, LogPipelineError> {
        if !self.read_available(tx, cancel).await? {
            return Ok(false);
        }

        match self.check_rotation().await? {
            Rotation::None => Ok(true),
            Rotation::Truncated => {
                info!(path = %self.path.display(), offset = self.offset, "log file truncated, reading from start");
                self.file
                    .seek(SeekFrom::Start(0))
                    .await
                    .map_err(|e| self.tail_err(e))?;
                self.reset(0);
                self.read_available(tx, cancel).await
            }
            Rotation::Replaced { file, inode } => {
                info!(path = %self.path.display(), "log file rotated, reopening");
                if !self.pending.is_empty() && !self.discarding {
                    let line = self.take_line();
                    if !send(tx, cancel, line).await {
                        return Ok(false);
                    }
                }
                self.file = file;
                self.inode = inode;
                self.reset(0);
                self.read_available(tx, cancel).await
            }
        }
    }

    fn reset(&mut self, offset: u64) {
        self.offset = offset;
        self.pending.clear();
        self.discarding = false;
    }

    /// 현재 파일 끝까지 읽습니다.
    async fn read_available(
        &mut self,
        tx: &mpsc::Sender<LineRecord>,
        cancel: &CancellationToken,
    ) -> Result<bool, LogPipelineError> {
        let mut buf = vec![0u8; READ_CHUNK_SIZE];
        loop {
            let n = self.file.read(&mut buf).await.map_err(|e| self.tail_err(e))?;
            if n == 0 {
                return Ok(true);
            }
            self.offset += n as u64;

            let mut lines = Vec::new();
            self.push_bytes(&buf[..n], &mut lines);
            for line in lines {
                if !send(tx, cancel, line).await {
                    return Ok(false);
                }
            }
        }
    }

    fn push_bytes(&mut self, mut bytes: &[u8], out: &mut Vec<String>) {
        while let Some(pos) = bytes.iter().position(|b| *b == b'\n') {
            self.append(&bytes[..pos], out);
            if self.discarding {
                self.discarding = false;
            } else {
                out.push(self.take_line());
            }
            bytes = &bytes[pos + 1..];
        }
        self.append(bytes, out);
    }

    fn append(&mut self, segment: &[u8], out: &mut Vec<String>) {
        if self.discarding || segment.is_empty() {
            return;
        }
        let room = self.max_line_length.saturating_sub(self.pending.len());
        if segment.len() <= room {
            self.pending.extend_from_slice(segment);
            return;
        }

        self.pending.extend_from_slice(&segment[..room]);
        warn!(
            path = %self.path.display(),
            max_line_length = self.max_line_length,
            "line exceeds maximum length, truncating"
        );
        out.push(self.take_line());
        self.discarding = true;
    }

    fn take_line(&mut self) -> String {
        let mut bytes = std::mem::take(&mut self.pending);
        if bytes.last() == Some(&b'\r') {
            bytes.pop();
        }
        match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        }
    }

    async fn check_rotation(&self) -> Result<Rotation, LogPipelineError> {
        let current = self.file.metadata().await.map_err(|e| self.tail_err(e))?;
        if current.len() < self.offset {
            return Ok(Rotation::Truncated);
        }

        let on_disk = match tokio::fs::metadata(&self.path).await {
            Ok(meta) => meta,
            // 로테이션 직후 새 파일이 아직 없을 수 있음
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Rotation::None),
            Err(e) => return Err(self.tail_err(e)),
        };
        let disk_inode = inode_of(&on_disk);
        if disk_inode.is_none() || disk_inode == self.inode {
            return Ok(Rotation::None);
        }

        match File::open(&self.path).await {
            Ok(file) => {
                let inode = match file.metadata().await {
                    Ok(meta) => inode_of(&meta),
                    Err(_) => disk_inode,
                };
                Ok(Rotation::Replaced { file, inode })
            }
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "rotated file not yet readable");
                Ok(Rotation::None)
            }
        }
    }

    fn tail_err(&self, e: std::io::Error) -> LogPipelineError {
        LogPipelineError::Tail {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        }
    }
}

/// 줄을 보냅니다. 취소되었거나 수신자가 사라졌으면 `false`입니다.
async fn send(tx: &mpsc::Sender<LineRecord>, cancel: &CancellationToken, text: String) -> bool {
    tokio::select! {
        biased;
        () = cancel.cancelled() => false,
        result = tx.send(LineRecord::now(text)) => result.is_ok(),
    }
}

#[cfg(unix)]
fn inode_of(meta: &std::fs::Metadata) -> Option<u64> {
    use std::os::unix::fs::MetadataExt;
    Some(meta.ino())
}

#[cfg(not(unix))]
fn inode_of(_meta: &std::fs::Metadata) -> Option<u64> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(max: usize) -> TailState {
        // 파일 핸들은 push_bytes 테스트에 필요 없으므로 임시 파일을 사용
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let std_file = tmp.reopen().unwrap();
        TailState {
            path: tmp.path().to_path_buf(),
            file: File::from_std(std_file),
            offset: 0,
            inode: None,
            pending: Vec::new(),
            discarding: false,
            max_line_length: max,
        }
    }

    #[tokio::test]
    async fn complete_lines_only() {
        let mut s = state(1024);
        let mut out = Vec::new();
        s.push_bytes(b"first\nsecond\nthi", &mut out);
        assert_eq!(out, ["first", "second"]);
        assert_eq!(s.pending, b"thi");

        out.clear();
        s.push_bytes(b"rd\r\n", &mut out);
        assert_eq!(out, ["third"]);
        assert!(s.pending.is_empty());
    }

    #[tokio::test]
    async fn empty_lines_are_emitted() {
        let mut s = state(1024);
        let mut out = Vec::new();
        s.push_bytes(b"\n\na\n", &mut out);
        assert_eq!(out, ["", "", "a"]);
    }

    #[tokio::test]
    async fn long_line_is_truncated_and_rest_dropped() {
        let mut s = state(4);
        let mut out = Vec::new();
        s.push_bytes(b"abcdefgh", &mut out);
        assert_eq!(out, ["abcd"]);
        assert!(s.discarding);

        s.push_bytes(b"ijk\nnext\n", &mut out);
        assert_eq!(out, ["abcd", "next"]);
        assert!(!s.discarding);
    }

    #[tokio::test]
    async fn invalid_utf8_is_replaced() {
        let mut s = state(1024);
        let mut out = Vec::new();
        s.push_bytes(b"caf\xe9\n", &mut out);
        assert_eq!(out.len(), 1);
        assert!(out[0].starts_with("caf"));
    }

    #[tokio::test]
    async fn open_missing_file_fails() {
        let err = FileTailer::new("/nonexistent/auth.log", TailConfig::default())
            .open(true)
            .await
            .unwrap_err();
        assert!(matches!(err, LogPipelineError::SourceOpen { .. }));
    }

    #[tokio::test]
    async fn open_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileTailer::new(dir.path(), TailConfig::default())
            .open(false)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not a regular file"));
    }

    #[tokio::test]
    async fn release_finishes_task() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let handle = FileTailer::new(tmp.path(), TailConfig::default())
            .open(true)
            .await
            .unwrap();
        let (_rx, control) = handle.into_parts();
        control.stop();
        control.release().await;
    }
}
