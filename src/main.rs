// main.rs — 程序入口
// 负责初始化日志和异步运行时、解析命令行参数、分发子命令

mod cli;
mod config;
mod download;
mod error;
mod gate;
mod normalize;
mod pipeline;
mod selector;
mod setter;
mod source;

// 初始化多语言支持，嵌入 locales 目录下的所有翻译
rust_i18n::i18n!("locales");

use chrono::Utc;
use clap::{CommandFactory, Parser}; // CommandFactory 用于生成补全脚本
use clap_complete::generate;
use cli::{Cli, Commands, ConfigAction};
use config::AppConfig;
use gate::{Eligibility, RunGate, format_duration};
use pipeline::{Pipeline, PipelineSettings, RunMode, RunOutcome};
use rust_i18n::t;
use setter::SystemApplier;
use source::reddit::RedditClient;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// `#[tokio::main]` 宏将 async main 转换为同步 main + tokio 运行时
#[tokio::main]
async fn main() -> ExitCode {
    // 日志输出到 stderr，级别由 REDPAPER_LOG 控制
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("REDPAPER_LOG")
                .unwrap_or_else(|_| EnvFilter::new("redpaper=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // 自动检测系统语言并设置
    let locale = std::env::var("LANG").unwrap_or_else(|_| "en".to_string());
    if locale.starts_with("zh") {
        rust_i18n::set_locale("zh-CN");
    } else {
        rust_i18n::set_locale("en");
    }

    let cli = Cli::parse();
    let mut config = AppConfig::new();

    ExitCode::from(exit_status(dispatch(&cli, &mut config).await))
}

/// 成功（包括跳过）返回 0，其余打印原因并返回 1
fn exit_status(result: Result<(), Box<dyn std::error::Error>>) -> u8 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("{}", t!("error_run_failed", reason => e));
            1
        }
    }
}

/// 只有会写下载目录或数据目录的命令才需要先创建目录
fn needs_storage(command: Option<&Commands>) -> bool {
    matches!(command, None | Some(Commands::Run) | Some(Commands::Compress { .. }))
}

async fn dispatch(cli: &Cli, config: &mut AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    if needs_storage(cli.command.as_ref()) {
        config.ensure_dirs()?;
    }

    match &cli.command {
        None | Some(Commands::Run) => handle_run(config, cli.test).await,
        Some(Commands::Status) => handle_status(config),
        Some(Commands::Compress { path }) => handle_compress(config, path.as_deref()),
        Some(Commands::Config { action }) => handle_config(config, action),
        Some(Commands::Completions { shell }) => {
            generate(
                *shell,
                &mut Cli::command(),
                "redpaper",
                &mut std::io::stdout(),
            );
            Ok(())
        }
    }
}

/// 处理 run：按间隔规则完整执行一次更换流程
async fn handle_run(config: &AppConfig, forced: bool) -> Result<(), Box<dyn std::error::Error>> {
    let client = RedditClient::new(&config.feed.user_agent, config.request_timeout())?;
    let applier = SystemApplier;

    let settings = PipelineSettings {
        query: config.feed_query(),
        download_dir: config.download_dir.clone(),
        constraint: config.size_constraint(),
        interval: config.interval(),
        mode: if forced { RunMode::Forced } else { RunMode::Gated },
        commit_forced_runs: config.schedule.commit_forced_runs,
    };

    if forced {
        println!("{}", t!("test_mode"));
    }
    println!("{}", t!("search_start", subreddit => config.feed.subreddit));

    let pipeline = Pipeline::new(&client, &applier, config.state_store(), settings);
    match pipeline.run().await? {
        RunOutcome::Skipped { remaining } => {
            println!("{}", t!("run_skipped", remaining => format_duration(remaining)));
        }
        RunOutcome::Changed(report) => {
            println!(
                "{}",
                t!("found_wallpaper", title => report.candidate.title, score => report.candidate.score)
            );
            println!(
                "{}",
                t!(
                    "save_path",
                    path => report.artifact.path.display(),
                    bytes => report.artifact.size
                )
            );
            if report.applied != report.artifact.path {
                println!("{}", t!("compressed_path", path => report.applied.display()));
            }
            if !report.committed {
                println!("{}", t!("state_not_saved"));
            }
            println!("{}", t!("run_changed"));
        }
    }
    Ok(())
}

/// 处理 status：只读地显示闸门状态
fn handle_status(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    // 与常规运行一致：状态文件损坏时按首次运行显示
    let gate = RunGate::load_or_default(config.state_store(), config.interval());

    match gate.state().last_success {
        Some(last) => println!("{}", t!("status_last_run", time => last.to_rfc3339())),
        None => println!("{}", t!("status_never_run")),
    }
    match gate.check_eligibility(Utc::now()) {
        Eligibility::Eligible => println!("{}", t!("status_eligible")),
        Eligibility::Cooling { remaining } => {
            println!("{}", t!("status_cooling", remaining => format_duration(remaining)))
        }
    }
    Ok(())
}

/// 处理 compress：对单个文件或整个下载目录执行压缩
fn handle_compress(config: &AppConfig, path: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let targets = match path {
        Some(p) => vec![PathBuf::from(shellexpand::tilde(p).into_owned())],
        None => normalize::batch_targets(&config.download_dir)?,
    };

    if targets.is_empty() {
        println!("{}", t!("compress_nothing", path => config.download_dir.display()));
        return Ok(());
    }

    let constraint = config.size_constraint();
    let mut failures = 0;
    for target in &targets {
        let name = target.display();
        match normalize::normalize(target, constraint) {
            Ok(output) if output == *target => println!("{}", t!("compress_unchanged", path => name)),
            Ok(output) => println!(
                "{}",
                t!("compress_done", path => name, output => output.display())
            ),
            Err(e) => {
                failures += 1;
                println!("{}", t!("compress_failed", path => name, reason => e));
            }
        }
    }

    // 只处理一个文件时，失败即整体失败
    if path.is_some() && failures > 0 {
        return Err(t!("error_compress_failed").into());
    }
    Ok(())
}

/// 处理 config 子命令：查看或修改配置
fn handle_config(
    config: &mut AppConfig,
    action: &ConfigAction,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Show => {
            let store = config.state_store();
            println!("{}", t!("config_title"));
            println!("{}", t!("config_path", path => config.config_path.display()));
            println!("{}", t!("config_download_dir", path => config.download_dir.display()));
            println!("{}", t!("config_state_file", path => store.path().display()));
            println!("{}", t!("config_subreddit", subreddit => config.feed.subreddit));
            println!(
                "{}",
                t!("config_feed", window => config.feed.time_window, limit => config.feed.limit)
            );
            println!(
                "{}",
                t!(
                    "config_normalize",
                    max_bytes => config.normalize.max_bytes,
                    quality => config.normalize.quality
                )
            );
            println!(
                "{}",
                t!("config_interval", hours => config.schedule.interval_hours)
            );
        }
        ConfigAction::Schema => {
            println!("{}", AppConfig::get_schema());
        }
        ConfigAction::Dump => {
            println!("{}", config.to_toml());
        }
        ConfigAction::Set { key, value } => {
            config
                .set(key, value)
                .map_err(|reason| t!("config_error_set", reason => reason).to_string())?;
            config.save()?;
            println!("{}", t!("config_updated", key => key, value => value));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::{FeedConfig, NormalizeConfig, ScheduleConfig};

    fn config_in(home: &std::path::Path) -> AppConfig {
        AppConfig {
            download_dir: home.join("Pictures").join("redpaper"),
            data_dir: home.join("data"),
            config_path: home.join(".config").join("redpaper").join("config.toml"),
            feed: FeedConfig::default(),
            normalize: NormalizeConfig::default(),
            schedule: ScheduleConfig::default(),
        }
    }

    #[test]
    fn status_tolerates_corrupt_state() -> Result<(), Box<dyn std::error::Error>> {
        let home = tempfile::tempdir()?;
        let config = config_in(home.path());
        std::fs::create_dir_all(&config.data_dir)?;
        std::fs::write(config.state_store().path(), "garbage")?;

        assert!(handle_status(&config).is_ok());
        Ok(())
    }

    #[test]
    fn status_without_data_dir_succeeds() -> Result<(), Box<dyn std::error::Error>> {
        let home = tempfile::tempdir()?;
        let config = config_in(home.path());

        assert!(handle_status(&config).is_ok());
        assert!(!config.data_dir.exists());
        Ok(())
    }

    #[test]
    fn success_maps_to_zero_and_errors_to_failure() {
        assert_eq!(exit_status(Ok(())), 0);
        assert_eq!(exit_status(Err("no suitable wallpaper found".into())), 1);
    }

    #[test]
    fn only_storage_commands_bootstrap_dirs() {
        assert!(needs_storage(None));
        assert!(needs_storage(Some(&Commands::Run)));
        assert!(needs_storage(Some(&Commands::Compress { path: None })));
        assert!(!needs_storage(Some(&Commands::Status)));
        assert!(!needs_storage(Some(&Commands::Config {
            action: ConfigAction::Dump
        })));
        assert!(!needs_storage(Some(&Commands::Completions {
            shell: clap_complete::Shell::Bash
        })));
    }

    #[tokio::test]
    async fn config_schema_does_not_create_dirs() -> Result<(), Box<dyn std::error::Error>> {
        let home = tempfile::tempdir()?;
        let mut config = config_in(home.path());
        let cli = Cli::try_parse_from(["redpaper", "config", "schema"])?;

        dispatch(&cli, &mut config).await?;

        assert!(!config.download_dir.exists());
        assert!(!config.data_dir.exists());
        Ok(())
    }
}
