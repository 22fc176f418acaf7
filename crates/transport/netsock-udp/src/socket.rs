use std::io;
use std::net::SocketAddr;

use netsock::payload::{receive_window, reset, terminate};
use netsock::socket::sealed::CoreAccess;
use netsock::{
    ConnectionState, EndpointResolver, Protocol, Result, SocketCore, SocketError,
    TransportSocket, UDP_MAX_DATAGRAM, platform,
};
use tracing::{debug, trace};

use crate::config::UdpSocketConfig;

/// 无连接的数据报套接字。
///
/// # 教案级注释
///
/// ## 意图（Why）
/// - 数据报没有建连步骤，也没有就绪门控：每次收发都直接触碰句柄；
/// - UDP 投递本身是尽力而为，本层不做重试。
///
/// ## 契约（What）
/// - 句柄创建成功即为 `Good`；
/// - [`UdpSocket::send`] / [`UdpSocket::recv`] 的任何失败都不会改变健康状态；
/// - 接收成功时在载荷之后写入终止字节，失败时把缓冲区重置为空字符串；
/// - 单个数据报的载荷上限为 [`UDP_MAX_DATAGRAM`]。
#[derive(Debug)]
pub struct UdpSocket {
    core: SocketCore,
}

impl UdpSocket {
    /// 解析端点、创建句柄并应用阻塞模式。
    pub fn open(config: &UdpSocketConfig) -> Result<Self> {
        let resolver = EndpointResolver::new(config.role());
        let mut core = SocketCore::open(
            &resolver,
            config.host(),
            config.port(),
            Protocol::Udp,
            config.blocking(),
        )?;
        core.set_blocking(config.blocking())?;
        if config.reuse_address() {
            core.handle()?
                .set_reuse_address(true)
                .map_err(SocketError::Configure)?;
        }
        core.set_state(ConnectionState::Good);
        Ok(Self { core })
    }

    /// 向 `dest` 发送一个数据报。
    pub fn send(&self, buf: &[u8], dest: SocketAddr) -> Result<usize> {
        if buf.len() > UDP_MAX_DATAGRAM {
            return Err(SocketError::Send(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "数据报长度 {} 超过上限 {UDP_MAX_DATAGRAM}",
                    buf.len()
                ),
            )));
        }
        match self.core.handle()?.send_to(buf, &dest.into()) {
            Ok(sent) => {
                trace!(endpoint = %self.core.endpoint(), %dest, sent, "udp send");
                Ok(sent)
            }
            Err(err) => {
                debug!(endpoint = %self.core.endpoint(), %dest, error = %err, "udp send failed");
                Err(SocketError::Send(err))
            }
        }
    }

    /// 接收一个数据报，返回载荷长度与来源地址。
    pub fn recv(&self, buf: &mut [u8]) -> Result<(usize, SocketAddr)> {
        let result = match self.core.handle() {
            Ok(handle) => receive_window(buf, 0)
                .and_then(|window| platform::recv_from(handle, window).map_err(SocketError::Recv)),
            Err(err) => Err(err),
        };
        match result {
            Ok((0, source)) => {
                reset(buf);
                trace!(endpoint = %self.core.endpoint(), %source, "empty datagram");
                Err(SocketError::EmptyDatagram)
            }
            Ok((received, source)) => {
                terminate(buf, received);
                trace!(endpoint = %self.core.endpoint(), %source, received, "udp recv");
                Ok((received, source))
            }
            Err(err) => {
                reset(buf);
                trace!(endpoint = %self.core.endpoint(), error = %err, "udp recv failed");
                Err(err)
            }
        }
    }
}

impl CoreAccess for UdpSocket {
    fn core(&self) -> &SocketCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut SocketCore {
        &mut self.core
    }
}

impl TransportSocket for UdpSocket {}
