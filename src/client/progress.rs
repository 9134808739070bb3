use crate::beans::InstallProgress;
use log::debug;
use std::collections::HashMap;
use std::sync::Mutex;

/// 安装进度回调
pub type InstallProgressHandler<'a> = dyn Fn(InstallProgress) + Send + Sync + 'a;

/// 把多个文件(可能并发)的上传进度合并成一个 0-100 的百分比。
///
/// 每个文件的进度取历史最大值, 不会倒退。会话安装时上传只占总进度的一半,
/// 另一半属于写入会话与提交。更新与回调在同一把锁内完成, 保证事件顺序。
pub struct ProgressAggregator<'h> {
    progress: Mutex<HashMap<String, f64>>,
    file_count: usize,
    scale: f64,
    handler: Option<&'h InstallProgressHandler<'h>>,
}

impl<'h> ProgressAggregator<'h> {
    pub fn new(
        file_count: usize,
        halve_upload: bool,
        handler: Option<&'h InstallProgressHandler<'h>>,
    ) -> Self {
        Self {
            progress: Mutex::new(HashMap::new()),
            file_count,
            scale: if halve_upload { 0.5 } else { 1.0 },
            handler,
        }
    }

    /// 更新某个文件的进度并发出合并后的 `Uploading` 事件
    ///
    /// # 返回值
    /// 合并后的百分比
    pub fn update(&self, key: &str, percentage: f64) -> f64 {
        let mut progress = self.progress.lock().unwrap_or_else(|e| e.into_inner());
        let entry = progress.entry(key.to_string()).or_insert(0.0);
        let percentage = percentage.clamp(0.0, 100.0);
        if percentage > *entry {
            *entry = percentage;
        }
        let aggregate = self.aggregate(&progress);
        let finished = progress.values().filter(|p| **p >= 100.0).count();
        debug!(
            "Upload progress {:.1}% ({}/{} finished)",
            aggregate, finished, self.file_count
        );
        if let Some(handler) = self.handler {
            handler(InstallProgress::uploading(finished, self.file_count, aggregate));
        }
        aggregate
    }

    pub fn current(&self) -> f64 {
        let progress = self.progress.lock().unwrap_or_else(|e| e.into_inner());
        self.aggregate(&progress)
    }

    fn aggregate(&self, progress: &HashMap<String, f64>) -> f64 {
        if self.file_count == 0 {
            return 0.0;
        }
        progress.values().sum::<f64>() / self.file_count as f64 * self.scale
    }
}
