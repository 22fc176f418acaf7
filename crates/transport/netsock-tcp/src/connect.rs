use std::hint;
use std::io;
use std::net::SocketAddr;

use netsock::{Condition, Result, SocketError};
use tracing::debug;

/// 单次建连尝试的结果。
///
/// - `Connected`：平台返回 0 或“已连接”；
/// - `InProgress`：平台报告“进行中”或“已在进行中”，属于瞬态结果；
/// - `Failed`：其余错误，保留原始 IO 错误。
#[derive(Debug)]
pub enum ConnectStatus {
    Connected,
    InProgress(Condition),
    Failed(io::Error),
}

impl ConnectStatus {
    /// 将一次 `connect` 系统调用的结果归一化。
    ///
    /// Windows 上非阻塞建连以 `WSAEWOULDBLOCK` 表示“进行中”，这里统一折算为
    /// [`Condition::InProgress`]。
    pub fn from_io(result: io::Result<()>) -> Self {
        let err = match result {
            Ok(()) => return Self::Connected,
            Err(err) => err,
        };
        match Condition::classify(&err) {
            Condition::AlreadyConnected => Self::Connected,
            condition if condition.is_connect_transient() => Self::InProgress(condition),
            #[cfg(windows)]
            Condition::WouldBlock => Self::InProgress(Condition::InProgress),
            _ => Self::Failed(err),
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::InProgress(_))
    }

    /// 平台错误码；成功时为 0，瞬态结果无原始码时为 `None`。
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            Self::Connected => Some(0),
            Self::InProgress(_) => None,
            Self::Failed(err) => err.raw_os_error(),
        }
    }
}

/// 有界重试的自动建连循环。
///
/// 瞬态结果立即重试且不计入预算；其余失败在预算内递减重试，预算耗尽后返回最后
/// 一次错误。成功时返回非瞬态尝试次数，因此总次数不会超过 `retries + 1`。
pub(crate) fn drive<F>(peer: SocketAddr, retries: u32, mut attempt: F) -> Result<u32>
where
    F: FnMut() -> Result<ConnectStatus>,
{
    let mut remaining = retries;
    let mut attempts = 0u32;
    loop {
        let outcome = loop {
            match attempt()? {
                ConnectStatus::Connected => break Ok(()),
                ConnectStatus::InProgress(_) => hint::spin_loop(),
                ConnectStatus::Failed(err) => break Err(err),
            }
        };
        attempts += 1;

        match outcome {
            Ok(()) => {
                debug!(%peer, attempts, "connected to peer");
                return Ok(attempts);
            }
            Err(source) if remaining == 0 => {
                return Err(SocketError::Connect {
                    peer,
                    attempts,
                    source,
                });
            }
            Err(source) => {
                remaining -= 1;
                debug!(%peer, attempts, remaining, error = %source, "connect failed, retrying");
            }
        }
    }
}
