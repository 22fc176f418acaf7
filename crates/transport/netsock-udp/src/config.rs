use netsock::Role;
use serde::Deserialize;

/// UDP 套接字的构造参数。
///
/// 缺省为客户端角色、阻塞模式；接收方通常选择 [`Role::Host`] 并在构造后调用
/// `bind_endpoint` 绑定到全部网卡。
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct UdpSocketConfig {
    host: Option<String>,
    port: String,
    role: Role,
    blocking: bool,
    reuse_address: bool,
}

impl Default for UdpSocketConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: "0".to_owned(),
            role: Role::Client,
            blocking: true,
            reuse_address: false,
        }
    }
}

impl UdpSocketConfig {
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            ..Self::default()
        }
    }

    /// 接收方配置：缺省主机解析为任意地址。
    pub fn receiver(port: impl Into<String>) -> Self {
        Self::new(port).with_role(Role::Host)
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

    pub fn reuse_address(&self) -> bool {
        self.reuse_address
    }
}
