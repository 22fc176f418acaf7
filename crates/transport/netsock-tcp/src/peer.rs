use std::net::{Shutdown, SocketAddr};

use netsock::payload::{receive_window, terminate};
use netsock::{Condition, Result, SocketError, platform};
use socket2::Socket;
use tracing::{debug, trace};

/// 监听套接字接受的入站连接。
///
/// 句柄由本结构独占，析构时释放。收发不经过就绪标志，调用方自行决定何时读写；
/// 读到 0 字节时返回 [`SocketError::PeerClosed`]，但不影响监听套接字的健康状态。
#[derive(Debug)]
pub struct AcceptedStream {
    handle: Socket,
    peer: SocketAddr,
}

impl AcceptedStream {
    pub(crate) fn new(handle: Socket, peer: SocketAddr) -> Self {
        Self { handle, peer }
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    pub fn handle(&self) -> &Socket {
        &self.handle
    }

    pub fn into_inner(self) -> Socket {
        self.handle
    }

    /// 切换阻塞模式。
    pub fn set_blocking(&self, blocking: bool) -> Result<()> {
        platform::set_blocking(&self.handle, blocking)
            .map_err(|source| SocketError::BlockingMode { blocking, source })
    }

    /// 发送 `buf`，非阻塞且暂不可写时返回 `Ok(0)`。
    pub fn send(&self, buf: &[u8]) -> Result<usize> {
        match self.handle.send(buf) {
            Ok(sent) => {
                trace!(peer = %self.peer, sent, "sent to accepted peer");
                Ok(sent)
            }
            Err(err) if Condition::classify(&err).is_retry_later() => Ok(0),
            Err(err) => Err(SocketError::Send(err)),
        }
    }

    /// 接收到 `buf[offset..]`，并在载荷之后写入终止字节。
    pub fn recv(&self, buf: &mut [u8], offset: usize) -> Result<usize> {
        let window = receive_window(buf, offset)?;
        let result = platform::recv(&self.handle, window);
        match result {
            Ok(0) => {
                debug!(peer = %self.peer, "accepted peer closed");
                Err(SocketError::PeerClosed)
            }
            Ok(received) => {
                terminate(buf, offset + received);
                trace!(peer = %self.peer, received, "received from accepted peer");
                Ok(received)
            }
            Err(err) if Condition::classify(&err).is_retry_later() => Ok(0),
            Err(err) => Err(SocketError::Recv(err)),
        }
    }

    /// 关闭双向数据流，句柄在析构时释放。
    pub fn shutdown(&self) -> Result<()> {
        self.handle
            .shutdown(Shutdown::Both)
            .map_err(SocketError::Shutdown)
    }
}
