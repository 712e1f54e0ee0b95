//! Mock 行数据源
//!
//! 用于无解码器硬件环境的测试：按顺序返回预置的行，
//! 结束时可选择模拟上游异常关闭。

use std::collections::VecDeque;

use contracts::{ContractError, LineSource};
use tracing::trace;

/// 预置内容的内存行数据源
#[derive(Debug, Clone, Default)]
pub struct MockLineSource {
    name: String,
    lines: VecDeque<Vec<u8>>,
    /// 行耗尽后返回的上游错误（None = 正常结束）
    upstream_failure: Option<String>,
    served: u64,
}

impl MockLineSource {
    /// 创建空数据源
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// 从若干行创建
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        let mut source = Self::new("mock");
        for line in lines {
            source.push_line(line);
        }
        source
    }

    /// 追加一行（原始字节，可包含非法 UTF-8）
    pub fn push_line(&mut self, line: impl AsRef<[u8]>) {
        self.lines.push_back(line.as_ref().to_vec());
    }

    /// 行耗尽后以 `UpstreamClosed` 结束，模拟解码器退出
    pub fn with_upstream_failure(mut self, message: impl Into<String>) -> Self {
        self.upstream_failure = Some(message.into());
        self
    }

    /// 已返回行数
    pub fn served(&self) -> u64 {
        self.served
    }
}

impl LineSource for MockLineSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn next_line(&mut self) -> Result<Option<Vec<u8>>, ContractError> {
        if let Some(line) = self.lines.pop_front() {
            self.served += 1;
            trace!(source = %self.name, served = self.served, "mock line");
            return Ok(Some(line));
        }
        match self.upstream_failure.take() {
            Some(message) => Err(ContractError::upstream_closed(&self.name, message)),
            None => Ok(None),
        }
    }
}
