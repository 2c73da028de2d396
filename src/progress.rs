//! 进度汇报
//!
//! 遍历图片的步骤都接收一个 [`ProgressSink`]，每处理完一项调用一次 `advance`

use indicatif::ProgressBar;

use crate::utils::pb_style;

pub trait ProgressSink: Sync {
    /// 开始一个新的步骤，`total` 为需要处理的项目数量
    fn begin(&self, _stage: &str, _total: usize) {}

    /// 完成一项
    fn advance(&self) {}

    /// 当前步骤结束
    fn finish(&self, _message: &str) {}
}

/// 不输出任何进度
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {}

/// 使用 indicatif 进度条输出到终端
pub struct BarProgress {
    pb: ProgressBar,
}

impl BarProgress {
    pub fn new() -> Self {
        Self { pb: ProgressBar::no_length().with_style(pb_style()) }
    }
}

impl Default for BarProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for BarProgress {
    fn begin(&self, stage: &str, total: usize) {
        self.pb.reset();
        self.pb.set_length(total as u64);
        self.pb.set_prefix(stage.to_owned());
        self.pb.set_message("");
    }

    fn advance(&self) {
        self.pb.inc(1);
    }

    fn finish(&self, message: &str) {
        self.pb.set_message(message.to_owned());
    }
}

impl Drop for BarProgress {
    fn drop(&mut self) {
        self.pb.finish();
    }
}

/// 根据是否输出详细信息选择进度汇报方式
pub fn progress_sink(verbose: bool) -> Box<dyn ProgressSink> {
    if verbose { Box::new(BarProgress::new()) } else { Box::new(NoProgress) }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::ProgressSink;

    /// 记录调用次数，供测试使用
    #[derive(Default)]
    pub struct CountingProgress {
        pub advanced: AtomicUsize,
        pub stages: Mutex<Vec<(String, usize)>>,
    }

    impl CountingProgress {
        pub fn advanced(&self) -> usize {
            self.advanced.load(Ordering::SeqCst)
        }

        pub fn stages(&self) -> Vec<(String, usize)> {
            self.stages.lock().unwrap().clone()
        }
    }

    impl ProgressSink for CountingProgress {
        fn begin(&self, stage: &str, total: usize) {
            self.stages.lock().unwrap().push((stage.to_owned(), total));
        }

        fn advance(&self) {
            self.advanced.fetch_add(1, Ordering::SeqCst);
        }
    }
}
