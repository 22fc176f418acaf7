use std::io;
use std::time::Duration;

use netsock::Role;
use serde::Deserialize;
use socket2::Socket;

/// 就绪探测的默认等待秒数。
pub const DEFAULT_WAIT_SEC: u64 = 2;

/// TCP 套接字的构造参数与套接字级选项。
///
/// # 教案级注释
///
/// ## 意图（Why）
/// - 把构造期的全部决策（端点、阻塞模式、自动建连、重试预算、探测超时）集中在一处，
///   既可以用 Builder 方式在代码中组装，也可以通过 `serde` 从配置文件加载；
/// - 同时承载内核选项（`SO_LINGER`、`SO_REUSEADDR`），在建连或绑定之前统一落地。
///
/// ## 契约（What）
/// - 缺省值：`host = None`、阻塞、`auto_connect = true`、`retries = 0`、等待 2 秒 0 微秒；
/// - `retries = 0` 表示只尝试一次，不重试；
/// - `linger_sec = Some(n)` 使关闭阶段在 `n` 秒后仍未发送完成时以 RST 释放资源；
/// - **前置条件**：`port` 必须是十进制端口号字符串。
///
/// ## 注意事项（Trade-offs）
/// - `SO_LINGER` 在 Linux 上精度为秒，因此这里直接以秒为单位配置。
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TcpSocketConfig {
    host: Option<String>,
    port: String,
    role: Role,
    blocking: bool,
    auto_connect: bool,
    retries: u32,
    wait_sec: u64,
    wait_usec: u32,
    linger_sec: Option<u64>,
    reuse_address: bool,
}

impl Default for TcpSocketConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: "0".to_owned(),
            role: Role::Client,
            blocking: true,
            auto_connect: true,
            retries: 0,
            wait_sec: DEFAULT_WAIT_SEC,
            wait_usec: 0,
            linger_sec: None,
            reuse_address: false,
        }
    }
}

impl TcpSocketConfig {
    /// 以端口创建配置，其余字段取缺省值。
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            ..Self::default()
        }
    }

    /// 被动端（服务端）配置：不自动建连，缺省主机解析为任意地址。
    pub fn server(port: impl Into<String>) -> Self {
        Self::new(port).with_role(Role::Host).with_auto_connect(false)
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    pub fn with_blocking(mut self, blocking: bool) -> Self {
        self.blocking = blocking;
        self
    }

    pub fn with_auto_connect(mut self, auto_connect: bool) -> Self {
        self.auto_connect = auto_connect;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// 设置就绪探测的等待时长（秒 + 微秒）。
    pub fn with_wait(mut self, sec: u64, usec: u32) -> Self {
        self.wait_sec = sec;
        self.wait_usec = usec;
        self
    }

    pub fn with_linger(mut self, linger_sec: Option<u64>) -> Self {
        self.linger_sec = linger_sec;
        self
    }

    pub fn with_reuse_address(mut self, reuse_address: bool) -> Self {
        self.reuse_address = reuse_address;
        self
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn blocking(&self) -> bool {
        self.blocking
    }

    pub fn auto_connect(&self) -> bool {
        self.auto_connect
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// 就绪探测的有界等待时长。
    pub fn wait(&self) -> Duration {
        Duration::from_secs(self.wait_sec) + Duration::from_micros(u64::from(self.wait_usec))
    }

    pub fn linger(&self) -> Option<Duration> {
        self.linger_sec.map(Duration::from_secs)
    }

    pub fn reuse_address(&self) -> bool {
        self.reuse_address
    }

    pub(crate) fn apply(&self, socket: &Socket) -> io::Result<()> {
        if self.reuse_address {
            socket.set_reuse_address(true)?;
        }
        if let Some(linger) = self.linger() {
            socket.set_linger(Some(linger))?;
        }
        Ok(())
    }
}
