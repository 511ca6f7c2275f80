// cli.rs — 命令行接口定义模块
// 使用 clap 的 derive 模式定义所有子命令和参数

use clap::{Parser, Subcommand}; // Parser: 解析命令行参数的 trait; Subcommand: 定义子命令的 trait
use clap_complete::Shell; // Shell 枚举：Bash, Zsh, Fish, Elvish, PowerShell

/// 每日壁纸更换工具
///
/// 从 Reddit 热门帖子中挑选图片，必要时压缩到系统允许的大小，
/// 然后设置为桌面壁纸。两次更换之间至少间隔 24 小时。
#[derive(Parser)]
#[command(name = "redpaper")]
#[command(version)] // 自动从 Cargo.toml 读取 version 字段
#[command(about = "Daily wallpaper changer: picks a top image from Reddit and sets it as the desktop background")]
pub struct Cli {
    /// 测试模式：跳过 24 小时间隔检查，立即更换
    #[arg(long, global = true)]
    pub test: bool,

    /// 不带子命令时等同于 `run`
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 按间隔规则更换壁纸（默认行为）
    ///
    /// 用法示例:
    ///   redpaper run
    ///   redpaper --test
    Run,

    /// 查看距离下次可以更换还有多久
    Status,

    /// 压缩超过体积上限的图片
    ///
    /// 用法示例:
    ///   redpaper compress
    ///   redpaper compress ~/Pictures/big.png
    Compress {
        /// 要处理的图片；不指定则处理下载目录中的所有图片
        path: Option<String>,
    },

    /// 配置管理操作
    ///
    /// 用法示例:
    ///   redpaper config show
    ///   redpaper config set subreddit earthporn
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// 生成 shell 补全脚本（支持 bash, zsh, fish, elvish, powershell）
    ///
    /// 用法示例：
    ///   redpaper completions zsh > ~/.zsh/completions/_redpaper
    Completions {
        /// 目标 shell 类型
        shell: Shell,
    },
}

/// 配置管理操作
#[derive(Subcommand)]
pub enum ConfigAction {
    /// 查看当前所有配置简报
    Show,
    /// 生成配置文件对应的 JSON Schema
    Schema,
    /// 以 TOML 格式打印当前完整配置内容
    Dump,
    /// 设置配置项的值 (支持: subreddit, window, limit, quality, interval)
    Set {
        /// 要设置的键
        key: String,
        /// 要设置的值
        value: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_invocation_is_a_gated_run() -> Result<(), clap::Error> {
        let cli = Cli::try_parse_from(["redpaper"])?;
        assert!(!cli.test);
        assert!(cli.command.is_none());
        Ok(())
    }

    #[test]
    fn test_flag_works_before_and_after_subcommand() -> Result<(), clap::Error> {
        assert!(Cli::try_parse_from(["redpaper", "--test"])?.test);
        let cli = Cli::try_parse_from(["redpaper", "run", "--test"])?;
        assert!(cli.test);
        assert!(matches!(cli.command, Some(Commands::Run)));
        Ok(())
    }

    #[test]
    fn config_set_takes_key_and_value() -> Result<(), clap::Error> {
        let cli = Cli::try_parse_from(["redpaper", "config", "set", "limit", "20"])?;
        match cli.command {
            Some(Commands::Config {
                action: ConfigAction::Set { key, value },
            }) => {
                assert_eq!(key, "limit");
                assert_eq!(value, "20");
            }
            _ => panic!("expected config set"),
        }
        Ok(())
    }

    #[test]
    fn command_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
