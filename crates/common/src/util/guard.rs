//! 作用域重入保护
//!
//! 以 RAII 方式实现的重入标志：进入时置位，guard 被 drop 时复位，
//! 因此提前返回或 panic 展开时标志同样会被清除。

use std::cell::Cell;

/// 单个调用栈内的重入标志
///
/// 只在请求上下文内部使用，不跨线程共享（`Cell` 使其 `!Sync`）。
#[derive(Debug, Default)]
pub struct ReentrancyFlag {
    active: Cell<bool>,
}

impl ReentrancyFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// 尝试进入受保护区域
    ///
    /// 已经处于受保护区域内时返回 `None`，调用方应当走非递归的回退路径。
    pub fn enter(&self) -> Option<ReentrancyGuard<'_>> {
        if self.active.replace(true) {
            return None;
        }
        Some(ReentrancyGuard { flag: self })
    }

    pub fn is_active(&self) -> bool {
        self.active.get()
    }
}

/// `ReentrancyFlag::enter` 返回的守卫，drop 时复位标志
#[derive(Debug)]
pub struct ReentrancyGuard<'a> {
    flag: &'a ReentrancyFlag,
}

impl Drop for ReentrancyGuard<'_> {
    fn drop(&mut self) {
        self.flag.active.set(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_enter_is_rejected() {
        let flag = ReentrancyFlag::new();
        let outer = flag.enter();
        assert!(outer.is_some());
        assert!(flag.is_active());
        assert!(flag.enter().is_none());
        drop(outer);
        assert!(!flag.is_active());
        assert!(flag.enter().is_some());
    }

    #[test]
    fn test_flag_resets_after_panic() {
        let flag = ReentrancyFlag::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = flag.enter();
            panic!("guarded code failed");
        }));
        assert!(result.is_err());
        assert!(!flag.is_active());
    }

    #[test]
    fn test_flag_resets_on_early_return() {
        fn guarded(flag: &ReentrancyFlag, bail: bool) -> Option<u8> {
            let _guard = flag.enter()?;
            if bail {
                return None;
            }
            Some(1)
        }

        let flag = ReentrancyFlag::new();
        assert_eq!(guarded(&flag, true), None);
        assert!(!flag.is_active());
        assert_eq!(guarded(&flag, false), Some(1));
    }
}
