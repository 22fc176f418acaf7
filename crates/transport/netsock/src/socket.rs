use std::net::{Shutdown, SocketAddr};

use tracing::{debug, warn};

use crate::endpoint::{Endpoint, EndpointResolver, Protocol};
use crate::error::{Result, SocketError};
use crate::platform;

/// 套接字健康标志。
///
/// 新建套接字处于 `Bad`，只有在建连/监听等步骤成功后才由具体套接字提升为
/// `Good`；任何致命错误都会把它打回 `Bad`。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Good,
    #[default]
    Bad,
}

impl ConnectionState {
    pub fn is_good(self) -> bool {
        matches!(self, Self::Good)
    }
}

/// 关闭方式。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CloseMode {
    /// 立即释放句柄；重复调用为空操作。
    #[default]
    Immediate,
    /// 仅关闭双向数据流，保留句柄，调用方稍后再以 `Immediate` 释放。
    Graceful,
}

/// TCP/UDP 套接字共享的句柄、端点与健康状态。
///
/// # 教案级注释
///
/// ## 意图（Why）
/// - 以组合代替继承：两种具体套接字各自持有一个 `SocketCore`，共享同一套
///   绑定、关闭与阻塞模式语义。
///
/// ## 契约（What）
/// - 句柄由本结构独占，`close(Immediate)` 或析构后失效；
/// - 端点在构造时解析，生命周期内不可变；
/// - `state` 只能经由所属套接字的方法修改；外部代码拿不到 `&mut SocketCore`。
///
/// ## 逻辑（How）
/// - 句柄存放在 `Option` 中，`take` 即释放，因此关闭天然幂等；
/// - `Drop` 在所有退出路径上释放仍持有的句柄。
#[derive(Debug)]
pub struct SocketCore {
    handle: Option<socket2::Socket>,
    endpoint: Endpoint,
    state: ConnectionState,
    blocking: bool,
}

impl SocketCore {
    /// 解析端点并创建句柄，初始状态恒为 `Bad`。
    ///
    /// `blocking` 仅被记录，由具体套接字在构造时调用 [`SocketCore::set_blocking`] 落地。
    pub fn open(
        resolver: &EndpointResolver,
        host: Option<&str>,
        service: &str,
        protocol: Protocol,
        blocking: bool,
    ) -> Result<Self> {
        let (endpoint, handle) = resolver.open(host, service, protocol)?;
        debug!(%endpoint, blocking, "socket created");
        Ok(Self {
            handle: Some(handle),
            endpoint,
            state: ConnectionState::Bad,
            blocking,
        })
    }

    /// 原始句柄；已关闭时返回 [`SocketError::Closed`]。
    pub fn handle(&self) -> Result<&socket2::Socket> {
        self.handle.as_ref().ok_or(SocketError::Closed)
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// 由所属套接字在状态迁移时调用。
    #[doc(hidden)]
    pub fn set_state(&mut self, state: ConnectionState) {
        self.state = state;
    }

    pub fn is_blocking(&self) -> bool {
        self.blocking
    }

    pub fn is_closed(&self) -> bool {
        self.handle.is_none()
    }

    /// 将句柄绑定到本地地址；失败时状态置为 `Bad`。
    pub fn bind(&mut self, addr: SocketAddr) -> Result<()> {
        let result = self.handle()?.bind(&addr.into());
        match result {
            Ok(()) => {
                debug!(endpoint = %self.endpoint, local = %addr, "socket bound");
                Ok(())
            }
            Err(source) => {
                self.state = ConnectionState::Bad;
                warn!(endpoint = %self.endpoint, local = %addr, error = %source, "bind failed");
                Err(SocketError::Bind { addr, source })
            }
        }
    }

    /// 切换阻塞模式；失败时立即关闭套接字。
    pub fn set_blocking(&mut self, blocking: bool) -> Result<()> {
        self.blocking = blocking;
        let result = platform::set_blocking(self.handle()?, blocking);
        match result {
            Ok(()) => {
                debug!(endpoint = %self.endpoint, blocking, "blocking mode set");
                Ok(())
            }
            Err(source) => {
                warn!(endpoint = %self.endpoint, blocking, error = %source, "failed to set blocking mode, closing");
                self.release();
                Err(SocketError::BlockingMode { blocking, source })
            }
        }
    }

    /// 关闭套接字，状态总是置为 `Bad`。
    pub fn close(&mut self, mode: CloseMode) -> Result<()> {
        self.state = ConnectionState::Bad;
        match mode {
            CloseMode::Immediate => {
                self.release();
                Ok(())
            }
            CloseMode::Graceful => {
                let handle = self.handle()?;
                handle.shutdown(Shutdown::Both).map_err(|source| {
                    debug!(endpoint = %self.endpoint, error = %source, "shutdown failed");
                    SocketError::Shutdown(source)
                })?;
                debug!(endpoint = %self.endpoint, "socket traffic shut down");
                Ok(())
            }
        }
    }

    /// 句柄当前绑定的本地地址。
    pub fn local_addr(&self) -> Result<SocketAddr> {
        let handle = self.handle()?;
        let addr = handle
            .local_addr()
            .and_then(|addr| platform::to_socket_addr(&addr))
            .map_err(SocketError::Configure)?;
        Ok(addr)
    }

    fn release(&mut self) {
        if let Some(handle) = self.handle.take() {
            drop(handle);
            debug!(endpoint = %self.endpoint, "socket handle released");
        }
    }
}

impl Drop for SocketCore {
    fn drop(&mut self) {
        self.release();
    }
}

/// 具体套接字接入 [`TransportSocket`] 的内部通道。
///
/// 仅供 `netsock-tcp` 与 `netsock-udp` 实现；调用方只通过 [`TransportSocket`]
/// 操作套接字，不会直接触碰 [`SocketCore`] 的句柄与健康标志。
#[doc(hidden)]
pub mod sealed {
    use super::SocketCore;

    pub trait CoreAccess {
        fn core(&self) -> &SocketCore;

        fn core_mut(&mut self) -> &mut SocketCore;

        /// 关闭前清理具体套接字自身的派生状态（例如就绪标志）。
        fn before_close(&mut self) {}
    }
}

/// TCP 与 UDP 套接字共享的能力集合：绑定、关闭、阻塞模式与健康状态。
///
/// 实现者通过 `sealed::CoreAccess` 提供 [`SocketCore`]，其余方法均委托给它。
/// `close` 总是先调用 `before_close`，因此不存在绕过派生状态清理的关闭路径。
pub trait TransportSocket: sealed::CoreAccess {
    /// 绑定到给定本地地址。
    fn bind(&mut self, addr: SocketAddr) -> Result<()> {
        self.core_mut().bind(addr)
    }

    /// 绑定到构造时解析出的端点地址。
    fn bind_endpoint(&mut self) -> Result<()> {
        let addr = self.core().endpoint().address();
        self.core_mut().bind(addr)
    }

    fn close(&mut self, mode: CloseMode) -> Result<()> {
        self.before_close();
        self.core_mut().close(mode)
    }

    fn set_blocking(&mut self, blocking: bool) -> Result<()> {
        self.core_mut().set_blocking(blocking)
    }

    fn state(&self) -> ConnectionState {
        self.core().state()
    }

    fn endpoint(&self) -> &Endpoint {
        self.core().endpoint()
    }

    fn local_addr(&self) -> Result<SocketAddr> {
        self.core().local_addr()
    }

    fn is_closed(&self) -> bool {
        self.core().is_closed()
    }

    fn is_blocking(&self) -> bool {
        self.core().is_blocking()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    fn udp_core() -> SocketCore {
        SocketCore::open(
            &EndpointResolver::default(),
            Some("127.0.0.1"),
            "0",
            Protocol::Udp,
            true,
        )
        .expect("回环端点必须可用")
    }

    #[test]
    fn fresh_core_starts_bad_with_live_handle() {
        let core = udp_core();
        assert_eq!(core.state(), ConnectionState::Bad);
        assert!(!core.is_closed());
        assert!(core.handle().is_ok());
    }

    #[test]
    #[traced_test]
    fn immediate_close_is_idempotent() {
        let mut core = udp_core();
        core.set_state(ConnectionState::Good);
        core.close(CloseMode::Immediate).expect("首次关闭");
        core.close(CloseMode::Immediate).expect("再次关闭为空操作");
        assert!(core.is_closed());
        assert_eq!(core.state(), ConnectionState::Bad);
        assert!(matches!(core.handle(), Err(SocketError::Closed)));
        assert!(logs_contain("socket handle released"));
    }

    #[test]
    fn graceful_close_keeps_handle() {
        let mut core = udp_core();
        core.bind("127.0.0.1:0".parse().unwrap()).expect("绑定");
        // 未连接的数据报套接字 shutdown 可能返回 ENOTCONN，这里只关心句柄是否保留。
        let _ = core.close(CloseMode::Graceful);
        assert!(!core.is_closed());
        assert_eq!(core.state(), ConnectionState::Bad);
    }

    #[test]
    fn bind_failure_marks_bad() {
        let first = {
            let mut core = udp_core();
            core.bind("127.0.0.1:0".parse().unwrap()).expect("绑定");
            core
        };
        let taken = first.local_addr().expect("读取本地地址");

        let mut second = udp_core();
        second.set_state(ConnectionState::Good);
        let err = second.bind(taken).expect_err("端口已被占用");
        assert!(matches!(err, SocketError::Bind { .. }));
        assert_eq!(second.state(), ConnectionState::Bad);
    }

    struct HookedSocket {
        core: SocketCore,
        hook_calls: u32,
    }

    impl sealed::CoreAccess for HookedSocket {
        fn core(&self) -> &SocketCore {
            &self.core
        }

        fn core_mut(&mut self) -> &mut SocketCore {
            &mut self.core
        }

        fn before_close(&mut self) {
            self.hook_calls += 1;
        }
    }

    impl TransportSocket for HookedSocket {}

    #[test]
    fn trait_close_always_runs_hook() {
        let mut socket = HookedSocket {
            core: udp_core(),
            hook_calls: 0,
        };
        socket.bind_endpoint().expect("绑定");
        let _ = socket.close(CloseMode::Graceful);
        socket.close(CloseMode::Immediate).expect("释放");
        assert_eq!(socket.hook_calls, 2);
        assert!(socket.is_closed());
        assert_eq!(socket.state(), ConnectionState::Bad);
    }

    #[test]
    fn blocking_mode_is_recorded() {
        let mut core = udp_core();
        core.set_blocking(false).expect("切换为非阻塞");
        assert!(!core.is_blocking());
    }
}
