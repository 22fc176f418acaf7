//! 进程级网络栈生命周期。
//!
//! WinSock 要求在任何套接字调用之前执行 `WSAStartup`，并在退出前配对调用
//! `WSACleanup`。这里把它表达为由宿主程序显式调用的一次性初始化/清理；
//! 套接字构造从不隐式触发。POSIX 平台上两者只维护状态标志。

use parking_lot::Mutex;
use tracing::debug;

use crate::error::{Result, SocketError};

static STACK: Mutex<bool> = parking_lot::const_mutex(false);

/// 初始化网络栈；重复调用为空操作。
pub fn startup() -> Result<()> {
    let mut initialized = STACK.lock();
    if *initialized {
        debug!("network stack already initialized");
        return Ok(());
    }
    sys::startup()?;
    *initialized = true;
    debug!("network stack initialized");
    Ok(())
}

/// 清理网络栈；未初始化时返回错误。
pub fn cleanup() -> Result<()> {
    let mut initialized = STACK.lock();
    if !*initialized {
        return Err(SocketError::NetworkStack {
            action: "清理",
            reason: "network stack was not initialized".to_owned(),
        });
    }
    sys::cleanup()?;
    *initialized = false;
    debug!("network stack cleaned up");
    Ok(())
}

/// 网络栈当前是否处于已初始化状态。
pub fn is_initialized() -> bool {
    *STACK.lock()
}

#[cfg(unix)]
mod sys {
    use crate::error::Result;

    pub(super) fn startup() -> Result<()> {
        Ok(())
    }

    pub(super) fn cleanup() -> Result<()> {
        Ok(())
    }
}

#[cfg(windows)]
#[allow(unsafe_code)]
mod sys {
    use std::io;
    use std::mem;

    use windows_sys::Win32::Networking::WinSock::{self, WSADATA};

    use crate::error::{Result, SocketError};

    const VERSION_2_2: u16 = 0x0202;

    pub(super) fn startup() -> Result<()> {
        // SAFETY: `WSADATA` 为纯数据结构，全零是合法初值；指针在调用期间有效。
        let code = unsafe {
            let mut data: WSADATA = mem::zeroed();
            WinSock::WSAStartup(VERSION_2_2, &mut data)
        };
        if code != 0 {
            return Err(SocketError::NetworkStack {
                action: "初始化",
                reason: io::Error::from_raw_os_error(code).to_string(),
            });
        }
        Ok(())
    }

    pub(super) fn cleanup() -> Result<()> {
        // SAFETY: 仅在 `startup` 成功后调用。
        let code = unsafe { WinSock::WSACleanup() };
        if code != 0 {
            return Err(SocketError::NetworkStack {
                action: "清理",
                reason: io::Error::last_os_error().to_string(),
            });
        }
        Ok(())
    }
}
