#![deny(unsafe_code)]
#![allow(clippy::result_large_err)]
#![doc = r#"
# netsock

## 设计动机（Why）
- **定位**：为 TCP/UDP 套接字提供统一的对象模型，屏蔽 POSIX 与 WinSock 在
  句柄创建、阻塞模式、错误码与多路等待上的差异。
- **架构角色**：本 crate 是共享基础层，`netsock-tcp` 与 `netsock-udp` 在其上
  实现各自的状态机。

## 核心契约（What）
- [`EndpointResolver`] 把 `(host, service, protocol)` 解析为 [`Endpoint`] 并在同一步
  内创建匹配的原始句柄；[`create_address`] 直接由数值 IP 构造地址；
- [`SocketCore`] 独占句柄与端点，维护 [`ConnectionState`]；[`TransportSocket`]
  是两种具体套接字共享的能力集合（绑定、关闭、阻塞模式、健康状态）；
- [`SocketError`] 为统一错误类型，[`Condition`] 为归一化后的平台错误条件；
- [`network`] 提供由宿主显式调用的一次性网络栈初始化/清理；
- [`platform`] 提供对单个句柄读写兴趣的有界等待等底层原语。

## 实现策略（How）
- 句柄由 `socket2` 创建与操作；就绪等待在 POSIX 上使用 `nix` 的 `select`，
  在 Windows 上使用 `windows-sys` 的 WinSock `select`；
- 所有操作都以 `Result` 返回，并在致命错误时把健康标志置为 `Bad`，不会 panic；
- 生命周期事件通过 `tracing` 输出结构化日志，本 crate 不安装任何订阅者。
"#]

pub mod endpoint;
pub mod error;
pub mod network;
pub mod payload;
pub mod platform;
pub mod socket;

pub use endpoint::{Endpoint, EndpointResolver, Protocol, Role, create_address};
pub use error::{Condition, OperationKind, Result, SocketError};
pub use payload::{DEFAULT_BUFFER_SIZE, TERMINATOR, UDP_MAX_DATAGRAM};
pub use platform::{MAX_BACKLOG, ReadyEvents};
pub use socket::{CloseMode, ConnectionState, SocketCore, TransportSocket};
