//! 接收缓冲区约定：载荷之后紧跟一个终止字节。

use crate::error::{Result, SocketError};

/// 写在载荷末尾之后的终止字节。
pub const TERMINATOR: u8 = 0;
/// 常用的接收缓冲区大小。
pub const DEFAULT_BUFFER_SIZE: usize = 512;
/// 单个数据报允许的最大载荷。
pub const UDP_MAX_DATAGRAM: usize = 63_999;

/// 返回从 `offset` 开始、为终止字节预留最后一字节后的可写窗口。
///
/// 窗口至少要能容纳一个载荷字节，否则返回 [`SocketError::BufferTooSmall`]；
/// 空窗口会让 0 字节读取与“对端关闭”无法区分。
pub fn receive_window(buf: &mut [u8], offset: usize) -> Result<&mut [u8]> {
    let required = offset.saturating_add(2);
    if buf.len() < required {
        return Err(SocketError::BufferTooSmall {
            required,
            actual: buf.len(),
        });
    }
    let end = buf.len() - 1;
    Ok(&mut buf[offset..end])
}

/// 在 `end` 处写入终止字节。
pub fn terminate(buf: &mut [u8], end: usize) {
    if let Some(slot) = buf.get_mut(end) {
        *slot = TERMINATOR;
    }
}

/// 将缓冲区重置为空字符串。
pub fn reset(buf: &mut [u8]) {
    terminate(buf, 0);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_reserves_terminator_slot() {
        let mut buf = [0xAAu8; 8];
        let window = receive_window(&mut buf, 3).expect("窗口足够");
        assert_eq!(window.len(), 4);
    }

    #[test]
    fn window_requires_one_payload_byte() {
        let mut buf = [0u8; 4];
        let err = receive_window(&mut buf, 3).expect_err("没有载荷空间");
        assert!(matches!(
            err,
            SocketError::BufferTooSmall {
                required: 5,
                actual: 4
            }
        ));
    }

    #[test]
    fn terminate_and_reset_write_marker() {
        let mut buf = [b'x'; 4];
        terminate(&mut buf, 2);
        assert_eq!(buf, [b'x', b'x', TERMINATOR, b'x']);
        reset(&mut buf);
        assert_eq!(buf[0], TERMINATOR);
        reset(&mut []);
    }
}
