// pipeline.rs — 更换壁纸的完整流程
// 闸门 → 查询信息流 → 挑选 → 下载 → 压缩 → 设置壁纸 → 记录时间戳
//
// 每个阶段返回 StageResult：成功、带回退值的可恢复失败、致命失败。
// 压缩和时间戳读写属于可恢复阶段，其余阶段失败会终止本次运行。

use crate::download::{self, DownloadedArtifact};
use crate::error::{PipelineError, RecoverableError};
use crate::gate::{Eligibility, RunGate, RunState, StateStore};
use crate::normalize::{self, SizeConstraint};
use crate::selector;
use crate::setter::WallpaperApplier;
use crate::source::{Candidate, FeedQuery, WallpaperSource};
use chrono::{DateTime, Local, TimeDelta, Utc};
use std::fmt;
use std::path::{Path, PathBuf};

/// 运行模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// 受闸门约束的常规运行
    Gated,
    /// 测试模式：跳过间隔检查
    Forced,
}

/// 流程的静态参数
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub query: FeedQuery,
    pub download_dir: PathBuf,
    pub constraint: SizeConstraint,
    pub interval: TimeDelta,
    pub mode: RunMode,
    /// 测试模式下成功后是否仍然写入时间戳
    pub commit_forced_runs: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Gate,
    Query,
    Select,
    Fetch,
    Normalize,
    Apply,
    Commit,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Gate => "gate",
            Stage::Query => "query",
            Stage::Select => "select",
            Stage::Fetch => "fetch",
            Stage::Normalize => "normalize",
            Stage::Apply => "apply",
            Stage::Commit => "commit",
        };
        f.write_str(name)
    }
}

/// 单个阶段的结果
#[derive(Debug)]
pub enum StageResult<T> {
    Success(T),
    /// 阶段失败，但有可以继续使用的回退值
    Recovered { value: T, cause: RecoverableError },
    Fatal(PipelineError),
}

impl<T> StageResult<T> {
    /// 可恢复的失败记录为警告并返回回退值，致命失败转为 Err
    pub fn resolve(self, stage: Stage) -> Result<T, PipelineError> {
        match self {
            StageResult::Success(value) => Ok(value),
            StageResult::Recovered { value, cause } => {
                tracing::warn!(%stage, error = %cause, "stage failed, continuing with fallback");
                Ok(value)
            }
            StageResult::Fatal(err) => {
                tracing::error!(%stage, error = %err, "stage failed, aborting run");
                Err(err)
            }
        }
    }
}

impl<T, E: Into<PipelineError>> From<Result<T, E>> for StageResult<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => StageResult::Success(value),
            Err(err) => StageResult::Fatal(err.into()),
        }
    }
}

/// 一次成功更换的摘要
#[derive(Debug, Clone)]
pub struct ChangeReport {
    pub candidate: Candidate,
    pub artifact: DownloadedArtifact,
    /// 实际交给系统的路径（压缩产物或原文件）
    pub applied: PathBuf,
    /// 时间戳是否已写入
    pub committed: bool,
}

/// 一次运行的最终结果；跳过不是错误
#[derive(Debug, Clone)]
pub enum RunOutcome {
    Skipped { remaining: TimeDelta },
    Changed(ChangeReport),
}

type Clock<'a> = Box<dyn Fn() -> DateTime<Utc> + Send + Sync + 'a>;

pub struct Pipeline<'a> {
    source: &'a dyn WallpaperSource,
    applier: &'a dyn WallpaperApplier,
    store: StateStore,
    settings: PipelineSettings,
    clock: Clock<'a>,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        source: &'a dyn WallpaperSource,
        applier: &'a dyn WallpaperApplier,
        store: StateStore,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            source,
            applier,
            store,
            settings,
            clock: Box::new(Utc::now),
        }
    }

    /// 替换时间来源
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'a) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub async fn run(&self) -> Result<RunOutcome, PipelineError> {
        let now = (self.clock)();
        let mut gate = self.gate_stage().resolve(Stage::Gate)?;

        match self.settings.mode {
            RunMode::Gated => {
                if let Eligibility::Cooling { remaining } = gate.check_eligibility(now) {
                    tracing::info!(
                        remaining = %crate::gate::format_duration(remaining),
                        "wallpaper change skipped"
                    );
                    return Ok(RunOutcome::Skipped { remaining });
                }
            }
            RunMode::Forced => tracing::info!("test mode: bypassing interval check"),
        }

        tracing::info!(category = %self.settings.query.category, "fetching wallpaper feed");
        let candidates = self.query_stage().await.resolve(Stage::Query)?;
        let candidate = self.select_stage(&candidates).resolve(Stage::Select)?;
        tracing::info!(title = %candidate.title, score = candidate.score, "found wallpaper");

        let date = now.with_timezone(&Local).date_naive();
        let artifact = StageResult::from(
            download::download(self.source, &candidate, &self.settings.download_dir, date).await,
        )
        .resolve(Stage::Fetch)?;

        let applied = self.normalize_stage(&artifact.path).resolve(Stage::Normalize)?;
        self.apply_stage(&applied).resolve(Stage::Apply)?;
        let committed = self.commit_stage(&mut gate).resolve(Stage::Commit)?;

        Ok(RunOutcome::Changed(ChangeReport {
            candidate,
            artifact,
            applied,
            committed,
        }))
    }

    /// 读取持久化状态；读失败时当作首次运行
    pub fn gate_stage(&self) -> StageResult<RunGate> {
        let interval = self.settings.interval;
        if self.settings.mode == RunMode::Forced {
            return StageResult::Success(RunGate::new(
                self.store.clone(),
                RunState::default(),
                interval,
            ));
        }

        match self.store.load() {
            Ok(state) => StageResult::Success(RunGate::new(self.store.clone(), state, interval)),
            Err(err) => StageResult::Recovered {
                value: RunGate::new(self.store.clone(), RunState::default(), interval),
                cause: err.into(),
            },
        }
    }

    pub async fn query_stage(&self) -> StageResult<Vec<Candidate>> {
        self.source.top(&self.settings.query).await.into()
    }

    pub fn select_stage(&self, candidates: &[Candidate]) -> StageResult<Candidate> {
        match selector::select(candidates) {
            Some(candidate) => StageResult::Success(candidate.clone()),
            None => StageResult::Fatal(PipelineError::NoCandidate),
        }
    }

    /// 压缩失败时回退到原始文件
    pub fn normalize_stage(&self, path: &Path) -> StageResult<PathBuf> {
        match normalize::normalize(path, self.settings.constraint) {
            Ok(output) => StageResult::Success(output),
            Err(err) => StageResult::Recovered {
                value: path.to_path_buf(),
                cause: err.into(),
            },
        }
    }

    pub fn apply_stage(&self, path: &Path) -> StageResult<()> {
        self.applier.apply(path).into()
    }

    /// 写入时间戳；返回值表示是否真的写入了
    pub fn commit_stage(&self, gate: &mut RunGate) -> StageResult<bool> {
        if self.settings.mode == RunMode::Forced && !self.settings.commit_forced_runs {
            tracing::info!("test mode: leaving run state untouched");
            return StageResult::Success(false);
        }

        match gate.commit((self.clock)()) {
            Ok(()) => StageResult::Success(true),
            Err(err) => StageResult::Recovered {
                value: false,
                cause: err.into(),
            },
        }
    }
}
