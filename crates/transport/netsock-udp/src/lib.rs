#![deny(unsafe_code)]
#![allow(clippy::result_large_err)]
//! 基于 `netsock` 共享基础层的 UDP 数据报套接字。
//!
//! - [`UdpSocketConfig`]：构造参数，可由 `serde` 加载；
//! - [`UdpSocket`]：`send` 向显式目的地址发送一个数据报，`recv` 接收一个数据报并
//!   报告来源地址。收发失败只以错误返回，不影响健康状态。

mod config;
mod socket;

pub use config::UdpSocketConfig;
pub use netsock::{CloseMode, ConnectionState, TransportSocket};
pub use socket::UdpSocket;
