use std::net::SocketAddr;
use std::time::Duration;

use netsock::payload::{receive_window, terminate};
use netsock::socket::sealed::CoreAccess;
use netsock::{
    Condition, ConnectionState, EndpointResolver, MAX_BACKLOG, Protocol, Result,
    SocketCore, SocketError, TransportSocket, platform,
};
use tracing::{debug, trace, warn};

use crate::config::TcpSocketConfig;
use crate::connect::{self, ConnectStatus};
use crate::peer::AcceptedStream;
use crate::readiness::Readiness;

/// 面向连接的流式套接字：主动建连、被动监听与就绪门控的收发。
///
/// # 教案级注释
///
/// ## 意图（Why）
/// - 在单线程、轮询驱动的宿主中，以“探测 → 收发”的固定节奏使用套接字，
///   避免在未就绪的句柄上阻塞；
/// - 同一类型既可作为客户端（建连）也可作为服务端（监听 + 接受）。
///
/// ## 契约（What）
/// - 构造成功后状态为 `Bad`，直到建连或监听成功才变为 `Good`；
/// - [`TcpSocket::send`] / [`TcpSocket::recv`] 仅在最近一次 [`TcpSocket::update`]
///   报告对应方向就绪时才触碰句柄，且无论结果如何都会消费该标志；
/// - 读到 0 字节视为对端关闭：状态置为 `Bad` 并返回 [`SocketError::PeerClosed`]；
/// - 非阻塞下的“稍后再试”不算错误，返回 `Ok(0)`。
///
/// ## 逻辑（How）
/// - 句柄、端点与健康标志由 [`SocketCore`] 持有；
/// - 就绪探测调用 [`platform::wait_ready`]，结果写入 [`Readiness`]；
/// - 构造期的自动建连失败不会让构造失败，错误保存在 [`TcpSocket::connect_error`] 中。
///
/// ## 注意事项（Trade-offs）
/// - 接受得到的 [`AcceptedStream`] 不经过就绪门控，调用方需要自行安排读写时机。
#[derive(Debug)]
pub struct TcpSocket {
    core: SocketCore,
    readiness: Readiness,
    wait: Duration,
    connect_error: Option<SocketError>,
}

impl TcpSocket {
    /// 解析端点、创建句柄、应用阻塞模式与套接字选项，并按需自动建连。
    pub fn open(config: &TcpSocketConfig) -> Result<Self> {
        let resolver = EndpointResolver::new(config.role());
        let mut core = SocketCore::open(
            &resolver,
            config.host(),
            config.port(),
            Protocol::Tcp,
            config.blocking(),
        )?;
        core.set_blocking(config.blocking())?;
        config
            .apply(core.handle()?)
            .map_err(SocketError::Configure)?;

        let mut socket = Self {
            core,
            readiness: Readiness::default(),
            wait: config.wait(),
            connect_error: None,
        };
        if config.auto_connect() {
            if let Err(err) = socket.auto_connect(config.retries()) {
                socket.connect_error = Some(err);
            }
        }
        Ok(socket)
    }

    /// 向构造时解析出的端点发起一次建连。
    pub fn connect(&mut self) -> Result<ConnectStatus> {
        let peer = self.core.endpoint().address();
        self.connect_to(peer)
    }

    /// 向 `peer` 发起一次建连；成功（含“已连接”）时状态置为 `Good`。
    pub fn connect_to(&mut self, peer: SocketAddr) -> Result<ConnectStatus> {
        let status = ConnectStatus::from_io(self.core.handle()?.connect(&peer.into()));
        match &status {
            ConnectStatus::Connected => {
                self.core.set_state(ConnectionState::Good);
                debug!(%peer, "tcp socket connected");
            }
            ConnectStatus::InProgress(condition) => {
                trace!(%peer, ?condition, "connect in progress");
            }
            ConnectStatus::Failed(err) => {
                self.core.set_state(ConnectionState::Bad);
                debug!(%peer, error = %err, "connect attempt failed");
            }
        }
        Ok(status)
    }

    /// 有界重试地建连，返回消耗的尝试次数。
    ///
    /// “进行中”与“已在进行中”立即重试且不计入 `retries`；其余失败最多重试
    /// `retries` 次，耗尽后返回 [`SocketError::Connect`]。
    pub fn auto_connect(&mut self, retries: u32) -> Result<u32> {
        let peer = self.core.endpoint().address();
        debug!(%peer, retries, "auto-connecting");
        let result = connect::drive(peer, retries, || self.connect_to(peer));
        match &result {
            Ok(_) => self.connect_error = None,
            Err(err) => warn!(%peer, retries, error = %err, "auto-connect gave up"),
        }
        result
    }

    /// 进入监听状态；`backlog < 1` 时使用平台最大值。
    pub fn listen(&mut self, backlog: i32) -> Result<()> {
        let backlog = if backlog < 1 { MAX_BACKLOG } else { backlog };
        let result = self.core.handle()?.listen(backlog);
        match result {
            Ok(()) => {
                self.core.set_state(ConnectionState::Good);
                debug!(endpoint = %self.core.endpoint(), backlog, "tcp socket listening");
                Ok(())
            }
            Err(source) => {
                self.core.set_state(ConnectionState::Bad);
                warn!(endpoint = %self.core.endpoint(), backlog, error = %source, "listen failed");
                Err(SocketError::Listen { backlog, source })
            }
        }
    }

    /// 接受一个入站连接；非阻塞且没有待处理连接时返回 `Ok(None)`。
    pub fn accept(&mut self) -> Result<Option<AcceptedStream>> {
        let result = self.core.handle()?.accept();
        match result {
            Ok((handle, addr)) => {
                let peer = platform::to_socket_addr(&addr).map_err(SocketError::Accept)?;
                debug!(endpoint = %self.core.endpoint(), %peer, "accepted connection");
                Ok(Some(AcceptedStream::new(handle, peer)))
            }
            Err(err) if Condition::classify(&err).is_retry_later() => {
                trace!(endpoint = %self.core.endpoint(), "no pending connection");
                Ok(None)
            }
            Err(err) => {
                self.core.set_state(ConnectionState::Bad);
                warn!(endpoint = %self.core.endpoint(), error = %err, "accept failed");
                Err(SocketError::Accept(err))
            }
        }
    }

    /// 在可写标志置位时发送 `buf`；否则不触碰句柄并返回 `Ok(0)`。
    pub fn send(&mut self, buf: &[u8]) -> Result<usize> {
        if !self.readiness.take_send() {
            trace!(endpoint = %self.core.endpoint(), "send skipped, socket not writable");
            return Ok(0);
        }
        match self.core.handle()?.send(buf) {
            Ok(sent) => {
                trace!(endpoint = %self.core.endpoint(), sent, "tcp send");
                Ok(sent)
            }
            Err(err) if Condition::classify(&err).is_retry_later() => Ok(0),
            Err(err) => {
                debug!(endpoint = %self.core.endpoint(), error = %err, "tcp send failed");
                Err(SocketError::Send(err))
            }
        }
    }

    /// 在可读标志置位时接收到 `buf[offset..]`，并在载荷之后写入终止字节。
    ///
    /// 缓冲区必须至少能容纳一个载荷字节与终止字节，否则返回
    /// [`SocketError::BufferTooSmall`] 且不消费可读标志。
    pub fn recv(&mut self, buf: &mut [u8], offset: usize) -> Result<usize> {
        if !self.readiness.can_read() {
            trace!(endpoint = %self.core.endpoint(), "recv skipped, socket not readable");
            return Ok(0);
        }
        let window = receive_window(buf, offset)?;
        self.readiness.take_read();
        let result = platform::recv(self.core.handle()?, window);
        match result {
            Ok(0) => {
                self.core.set_state(ConnectionState::Bad);
                warn!(endpoint = %self.core.endpoint(), "peer closed connection");
                Err(SocketError::PeerClosed)
            }
            Ok(received) => {
                terminate(buf, offset + received);
                trace!(endpoint = %self.core.endpoint(), received, "tcp recv");
                Ok(received)
            }
            Err(err) if Condition::classify(&err).is_retry_later() => Ok(0),
            Err(err) => {
                debug!(endpoint = %self.core.endpoint(), error = %err, "tcp recv failed");
                Err(SocketError::Recv(err))
            }
        }
    }

    /// 经由已接受的连接发送，不检查也不消费就绪标志。
    pub fn send_on(&self, peer: &AcceptedStream, buf: &[u8]) -> Result<usize> {
        peer.send(buf)
    }

    /// 经由已接受的连接接收，不检查也不消费就绪标志。
    pub fn recv_on(&self, peer: &AcceptedStream, buf: &mut [u8], offset: usize) -> Result<usize> {
        peer.recv(buf, offset)
    }

    /// 在有界时长内探测可读/可写，并以结果覆盖就绪标志。
    ///
    /// 探测失败时两个标志清零、状态置为 `Bad` 并返回 [`SocketError::Poll`]。
    pub fn update(&mut self) -> Result<Readiness> {
        let handle = match self.core.handle() {
            Ok(handle) => handle,
            Err(err) => {
                self.readiness.clear();
                return Err(err);
            }
        };
        match platform::wait_ready(handle, self.wait) {
            Ok(events) => {
                self.readiness.observe(events);
                trace!(
                    endpoint = %self.core.endpoint(),
                    readable = events.readable,
                    writable = events.writable,
                    "readiness updated"
                );
                Ok(self.readiness)
            }
            Err(source) => {
                self.readiness.clear();
                self.core.set_state(ConnectionState::Bad);
                warn!(endpoint = %self.core.endpoint(), error = %source, "readiness poll failed");
                Err(SocketError::Poll(source))
            }
        }
    }

    pub fn can_read(&self) -> bool {
        self.readiness.can_read()
    }

    pub fn can_send(&self) -> bool {
        self.readiness.can_send()
    }

    pub fn readiness(&self) -> Readiness {
        self.readiness
    }

    /// 就绪探测的等待时长。
    pub fn wait(&self) -> Duration {
        self.wait
    }

    pub fn set_wait(&mut self, wait: Duration) {
        self.wait = wait;
    }

    /// 构造期自动建连最终失败时保存的错误。
    pub fn connect_error(&self) -> Option<&SocketError> {
        self.connect_error.as_ref()
    }
}

impl CoreAccess for TcpSocket {
    fn core(&self) -> &SocketCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut SocketCore {
        &mut self.core
    }

    fn before_close(&mut self) {
        self.readiness.clear();
    }
}

impl TransportSocket for TcpSocket {}
