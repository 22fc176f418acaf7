use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// 描述一次底层操作对应的稳定错误码与默认文案。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OperationKind {
    pub code: &'static str,
    pub message: &'static str,
}

pub const RESOLVE: OperationKind = OperationKind {
    code: "netsock.resolve_failed",
    message: "endpoint resolve",
};
pub const CREATE: OperationKind = OperationKind {
    code: "netsock.create_failed",
    message: "socket create",
};
pub const BIND: OperationKind = OperationKind {
    code: "netsock.bind_failed",
    message: "socket bind",
};
pub const LISTEN: OperationKind = OperationKind {
    code: "netsock.tcp.listen_failed",
    message: "tcp listen",
};
pub const ACCEPT: OperationKind = OperationKind {
    code: "netsock.tcp.accept_failed",
    message: "tcp accept",
};
pub const CONNECT: OperationKind = OperationKind {
    code: "netsock.tcp.connect_failed",
    message: "tcp connect",
};
pub const SEND: OperationKind = OperationKind {
    code: "netsock.send_failed",
    message: "socket send",
};
pub const RECV: OperationKind = OperationKind {
    code: "netsock.recv_failed",
    message: "socket recv",
};
pub const PEER_CLOSED: OperationKind = OperationKind {
    code: "netsock.tcp.peer_closed",
    message: "tcp peer closed",
};
pub const BLOCKING_MODE: OperationKind = OperationKind {
    code: "netsock.blocking_mode_failed",
    message: "socket blocking mode",
};
pub const POLL: OperationKind = OperationKind {
    code: "netsock.tcp.poll_failed",
    message: "tcp readiness poll",
};
pub const SHUTDOWN: OperationKind = OperationKind {
    code: "netsock.shutdown_failed",
    message: "socket shutdown",
};
pub const CONFIGURE: OperationKind = OperationKind {
    code: "netsock.configure_failed",
    message: "socket configure",
};
pub const CLOSED: OperationKind = OperationKind {
    code: "netsock.closed",
    message: "socket closed",
};
pub const BUFFER: OperationKind = OperationKind {
    code: "netsock.buffer_too_small",
    message: "buffer headroom",
};
pub const ADDRESS: OperationKind = OperationKind {
    code: "netsock.invalid_address",
    message: "address parse",
};
pub const NETWORK_STACK: OperationKind = OperationKind {
    code: "netsock.network_stack_failed",
    message: "network stack lifecycle",
};

/// 与平台无关的错误条件。
///
/// # 教案级注释
///
/// ## 意图（Why）
/// - POSIX 与 WinSock 对同一语义使用不同的错误码（`EINPROGRESS` 与 `WSAEINPROGRESS` 等），
///   状态机只关心少数几种条件，因此在这里统一归一化。
///
/// ## 契约（What）
/// - `WouldBlock`：非阻塞模式下操作暂不可完成；
/// - `AlreadyConnected`：连接已建立，`connect` 视为成功；
/// - `InProgress` / `AlreadyInProgress`：连接仍在进行，自动建连循环会立即重试且不消耗预算；
/// - `NetworkDown`：网络子系统不可用；
/// - `Interrupted`：系统调用被信号打断；
/// - `Other`：其余一切错误。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Condition {
    WouldBlock,
    AlreadyConnected,
    InProgress,
    AlreadyInProgress,
    NetworkDown,
    Interrupted,
    Other,
}

impl Condition {
    /// 从 IO 错误推断条件，优先使用原始错误码。
    pub fn classify(error: &io::Error) -> Self {
        if let Some(code) = error.raw_os_error() {
            return Self::from_raw_os_error(code);
        }
        match error.kind() {
            io::ErrorKind::WouldBlock => Self::WouldBlock,
            io::ErrorKind::Interrupted => Self::Interrupted,
            _ => Self::Other,
        }
    }

    /// 将平台原始错误码映射为归一化条件。
    pub fn from_raw_os_error(code: i32) -> Self {
        if code == codes::WOULD_BLOCK || code == codes::AGAIN {
            Self::WouldBlock
        } else if code == codes::ALREADY_CONNECTED {
            Self::AlreadyConnected
        } else if code == codes::IN_PROGRESS {
            Self::InProgress
        } else if code == codes::ALREADY_IN_PROGRESS {
            Self::AlreadyInProgress
        } else if code == codes::NETWORK_DOWN {
            Self::NetworkDown
        } else if code == codes::INTERRUPTED {
            Self::Interrupted
        } else {
            Self::Other
        }
    }

    /// 连接仍在进行中的两种瞬态条件。
    pub fn is_connect_transient(self) -> bool {
        matches!(self, Self::InProgress | Self::AlreadyInProgress)
    }

    /// 非阻塞 IO 的“稍后再试”条件。
    pub fn is_retry_later(self) -> bool {
        matches!(self, Self::WouldBlock | Self::Interrupted)
    }
}

#[cfg(unix)]
mod codes {
    use nix::libc;

    pub(super) const WOULD_BLOCK: i32 = libc::EWOULDBLOCK;
    pub(super) const AGAIN: i32 = libc::EAGAIN;
    pub(super) const ALREADY_CONNECTED: i32 = libc::EISCONN;
    pub(super) const IN_PROGRESS: i32 = libc::EINPROGRESS;
    pub(super) const ALREADY_IN_PROGRESS: i32 = libc::EALREADY;
    pub(super) const NETWORK_DOWN: i32 = libc::ENETDOWN;
    pub(super) const INTERRUPTED: i32 = libc::EINTR;
}

#[cfg(windows)]
mod codes {
    use windows_sys::Win32::Networking::WinSock;

    pub(super) const WOULD_BLOCK: i32 = WinSock::WSAEWOULDBLOCK as i32;
    pub(super) const AGAIN: i32 = WinSock::WSAEWOULDBLOCK as i32;
    pub(super) const ALREADY_CONNECTED: i32 = WinSock::WSAEISCONN as i32;
    pub(super) const IN_PROGRESS: i32 = WinSock::WSAEINPROGRESS as i32;
    pub(super) const ALREADY_IN_PROGRESS: i32 = WinSock::WSAEALREADY as i32;
    pub(super) const NETWORK_DOWN: i32 = WinSock::WSAENETDOWN as i32;
    pub(super) const INTERRUPTED: i32 = WinSock::WSAEINTR as i32;
}

/// 套接字层统一错误类型。
///
/// 所有携带 `io::Error` 的变体都保留原始错误作为 `source`，便于调用方读取
/// 平台错误码；[`SocketError::condition`] 给出归一化后的条件。
#[derive(Debug, Error)]
pub enum SocketError {
    /// 端点解析失败，套接字不可用。
    #[error("无法解析端点 {host}:{service}: {source}")]
    Resolve {
        host: String,
        service: String,
        #[source]
        source: io::Error,
    },
    /// 创建原始句柄失败。
    #[error("无法创建套接字句柄: {0}")]
    Create(#[source] io::Error),
    /// 绑定失败。
    #[error("无法绑定套接字到 {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    /// 监听失败。
    #[error("无法以 backlog={backlog} 开始监听: {source}")]
    Listen {
        backlog: i32,
        #[source]
        source: io::Error,
    },
    /// 接受连接失败（`WouldBlock` 不会产生该错误）。
    #[error("接受入站连接失败: {0}")]
    Accept(#[source] io::Error),
    /// 建连失败；`attempts` 为非瞬态尝试的总次数。
    #[error("连接 {peer} 失败（共尝试 {attempts} 次）: {source}")]
    Connect {
        peer: SocketAddr,
        attempts: u32,
        #[source]
        source: io::Error,
    },
    /// 发送失败。
    #[error("发送数据失败: {0}")]
    Send(#[source] io::Error),
    /// 接收失败。
    #[error("接收数据失败: {0}")]
    Recv(#[source] io::Error),
    /// 流式套接字读到 0 字节。
    #[error("对端已关闭连接")]
    PeerClosed,
    /// 数据报套接字读到空报文。
    #[error("收到空数据报")]
    EmptyDatagram,
    /// 阻塞模式切换失败，套接字已被关闭。
    #[error("无法将阻塞模式设置为 {blocking}: {source}")]
    BlockingMode {
        blocking: bool,
        #[source]
        source: io::Error,
    },
    /// 就绪探测失败。
    #[error("就绪探测失败: {0}")]
    Poll(#[source] io::Error),
    /// 优雅关闭（shutdown）失败。
    #[error("关闭数据流失败: {0}")]
    Shutdown(#[source] io::Error),
    /// 套接字选项写入失败。
    #[error("配置套接字选项失败: {0}")]
    Configure(#[source] io::Error),
    /// 句柄已释放。
    #[error("套接字句柄已关闭")]
    Closed,
    /// 接收缓冲区不足以容纳载荷与终止字节。
    #[error("接收缓冲区过小：至少需要 {required} 字节，实际 {actual} 字节")]
    BufferTooSmall { required: usize, actual: usize },
    /// 数值地址无法解析。
    #[error("无效的 IP 地址: {input}")]
    InvalidAddress { input: String },
    /// 进程级网络栈初始化或清理失败。
    #[error("网络栈{action}失败: {reason}")]
    NetworkStack {
        action: &'static str,
        reason: String,
    },
}

impl SocketError {
    /// 错误对应的操作描述。
    pub fn operation(&self) -> OperationKind {
        match self {
            Self::Resolve { .. } => RESOLVE,
            Self::Create(_) => CREATE,
            Self::Bind { .. } => BIND,
            Self::Listen { .. } => LISTEN,
            Self::Accept(_) => ACCEPT,
            Self::Connect { .. } => CONNECT,
            Self::Send(_) => SEND,
            Self::Recv(_) | Self::EmptyDatagram => RECV,
            Self::PeerClosed => PEER_CLOSED,
            Self::BlockingMode { .. } => BLOCKING_MODE,
            Self::Poll(_) => POLL,
            Self::Shutdown(_) => SHUTDOWN,
            Self::Configure(_) => CONFIGURE,
            Self::Closed => CLOSED,
            Self::BufferTooSmall { .. } => BUFFER,
            Self::InvalidAddress { .. } => ADDRESS,
            Self::NetworkStack { .. } => NETWORK_STACK,
        }
    }

    /// 稳定错误码，适合日志与指标标签。
    pub fn code(&self) -> &'static str {
        self.operation().code
    }

    /// 底层 IO 错误（若有）。
    pub fn io_error(&self) -> Option<&io::Error> {
        match self {
            Self::Resolve { source, .. }
            | Self::Bind { source, .. }
            | Self::Listen { source, .. }
            | Self::Connect { source, .. }
            | Self::BlockingMode { source, .. } => Some(source),
            Self::Create(source)
            | Self::Accept(source)
            | Self::Send(source)
            | Self::Recv(source)
            | Self::Poll(source)
            | Self::Shutdown(source)
            | Self::Configure(source) => Some(source),
            _ => None,
        }
    }

    /// 平台原始错误码（若有）。
    pub fn raw_os_error(&self) -> Option<i32> {
        self.io_error().and_then(io::Error::raw_os_error)
    }

    /// 归一化后的平台条件。
    pub fn condition(&self) -> Option<Condition> {
        self.io_error().map(Condition::classify)
    }

    /// 错误是否意味着套接字已不可继续使用。
    ///
    /// 发送/接收错误、空数据报与缓冲区不足都属于可重试的瞬态失败。
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Resolve { .. }
                | Self::Create(_)
                | Self::Bind { .. }
                | Self::Listen { .. }
                | Self::Accept(_)
                | Self::Connect { .. }
                | Self::PeerClosed
                | Self::BlockingMode { .. }
                | Self::Poll(_)
                | Self::Closed
        )
    }
}

pub type Result<T, E = SocketError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_codes_normalize_to_conditions() {
        assert_eq!(
            Condition::from_raw_os_error(codes::IN_PROGRESS),
            Condition::InProgress
        );
        assert_eq!(
            Condition::from_raw_os_error(codes::ALREADY_IN_PROGRESS),
            Condition::AlreadyInProgress
        );
        assert_eq!(
            Condition::from_raw_os_error(codes::ALREADY_CONNECTED),
            Condition::AlreadyConnected
        );
        assert_eq!(
            Condition::from_raw_os_error(codes::NETWORK_DOWN),
            Condition::NetworkDown
        );
        assert_eq!(
            Condition::from_raw_os_error(codes::AGAIN),
            Condition::WouldBlock
        );
    }

    #[test]
    fn errors_without_os_code_fall_back_to_kind() {
        let err = io::Error::from(io::ErrorKind::WouldBlock);
        assert_eq!(Condition::classify(&err), Condition::WouldBlock);
        let err = io::Error::other("boom");
        assert_eq!(Condition::classify(&err), Condition::Other);
    }

    #[test]
    fn only_in_progress_codes_are_connect_transient() {
        assert!(Condition::InProgress.is_connect_transient());
        assert!(Condition::AlreadyInProgress.is_connect_transient());
        assert!(!Condition::WouldBlock.is_connect_transient());
        assert!(!Condition::AlreadyConnected.is_connect_transient());
    }

    #[test]
    fn datagram_and_io_errors_are_not_fatal() {
        let send = SocketError::Send(io::Error::from_raw_os_error(codes::NETWORK_DOWN));
        assert!(!send.is_fatal());
        assert_eq!(send.condition(), Some(Condition::NetworkDown));
        assert_eq!(send.code(), "netsock.send_failed");
        assert!(!SocketError::EmptyDatagram.is_fatal());
        assert!(SocketError::PeerClosed.is_fatal());
        assert_eq!(SocketError::PeerClosed.condition(), None);
    }
}
