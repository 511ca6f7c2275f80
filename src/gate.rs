// gate.rs — 运行间隔控制
// 用一个持久化的时间戳保证两次更换壁纸之间至少间隔固定时长

use crate::error::StateError;
use chrono::{DateTime, TimeDelta, Utc};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// 两次更换之间的默认最小间隔（小时）
pub const DEFAULT_INTERVAL_HOURS: i64 = 24;

/// 持久化的运行状态
///
/// 没有记录等价于"可以运行"（首次运行）。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunState {
    pub last_success: Option<DateTime<Utc>>,
}

/// 时间戳文件，内容只有一个十进制 Unix 时间戳
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 读取状态；文件不存在时返回空状态而不是错误
    pub fn load(&self) -> Result<RunState, StateError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(RunState::default()),
            Err(source) => {
                return Err(StateError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let first_line = content.lines().next().unwrap_or("").trim();
        let last_success = first_line
            .parse::<i64>()
            .ok()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .ok_or_else(|| StateError::Parse {
                path: self.path.clone(),
                content: first_line.to_string(),
            })?;

        Ok(RunState {
            last_success: Some(last_success),
        })
    }

    /// 覆盖写入新的时间戳
    pub fn save(&self, at: DateTime<Utc>) -> Result<(), StateError> {
        fs::write(&self.path, at.timestamp().to_string()).map_err(|source| StateError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

/// 是否允许本次更换
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    Eligible,
    Cooling { remaining: TimeDelta },
}

/// 运行闸门
///
/// 构造时接收已经读好的 `RunState`，运行期间只通过 `commit` 修改。
#[derive(Debug)]
pub struct RunGate {
    store: StateStore,
    state: RunState,
    interval: TimeDelta,
}

impl RunGate {
    pub fn new(store: StateStore, state: RunState, interval: TimeDelta) -> Self {
        Self {
            store,
            state,
            interval,
        }
    }

    /// 从状态文件构造闸门；读不出来时记录警告，按首次运行处理
    pub fn load_or_default(store: StateStore, interval: TimeDelta) -> Self {
        let state = store.load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "ignoring unreadable run state");
            RunState::default()
        });
        Self::new(store, state, interval)
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// 根据上次成功时间判断现在能否运行
    pub fn check_eligibility(&self, now: DateTime<Utc>) -> Eligibility {
        let Some(last) = self.state.last_success else {
            tracing::info!("first run detected, proceeding with wallpaper change");
            return Eligibility::Eligible;
        };

        let elapsed = now - last;
        tracing::debug!(elapsed = %format_duration(elapsed), "time since last wallpaper change");

        if elapsed >= self.interval {
            return Eligibility::Eligible;
        }

        // 时钟回拨时 elapsed 为负，剩余时间最多一个完整间隔
        let remaining = (self.interval - elapsed).min(self.interval);
        Eligibility::Cooling { remaining }
    }

    /// 记录一次成功的更换
    pub fn commit(&mut self, now: DateTime<Utc>) -> Result<(), StateError> {
        self.store.save(now)?;
        self.state.last_success = Some(now);
        Ok(())
    }
}

/// 把时长格式化为 `3h 05m` 这样的文本
pub fn format_duration(duration: TimeDelta) -> String {
    let minutes = duration.num_minutes().max(0);
    format!("{}h {:02}m", minutes / 60, minutes % 60)
}
