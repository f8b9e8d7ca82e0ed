// ==========================================
// 托盘结构情景测算 - 命令行入口
// ==========================================
// 用法:
//   pallet-mix-modeller <command> [args] [--remote]
// 命令:
//   scopes                      列出费率口径
//   evaluate [scope]            按已保存托盘量评估情景 (--cross-check 与远程核对)
//   optimise [scope]            约束优化托盘结构并保存结果 (Ctrl-C 取消)
//   allocate                    Q1 分摊报告与派生费率表
//   streams                     Q2 收入流表与 Q3 集中度
//   import-inputs <file>        导入 field,value 文件到 Q1 输入 (--streams 导入 Q2/Q3)
//   import-rates <file>         导入费率目录 JSON 到本地库
//   config                      打印配置快照
// 输出: 结果以 JSON 写 stdout, 日志写 stderr
// ==========================================

use anyhow::{bail, Context};
use pallet_mix_modeller::api::{InputsTarget, RatesSource};
use pallet_mix_modeller::app::{get_default_db_path, AppState};
use pallet_mix_modeller::engine::{CancellationFlag, WatchProgress};
use pallet_mix_modeller::logging;
use pallet_mix_modeller::perf::PerfGuard;
use serde::Serialize;
use serde_json::json;

/// 解析后的命令行
struct CliArgs {
    command: String,
    positional: Vec<String>,
    remote: bool,
    cross_check: bool,
    streams: bool,
}

fn parse_args() -> anyhow::Result<CliArgs> {
    let mut args = std::env::args().skip(1);
    let command = match args.next() {
        Some(c) => c,
        None => bail!("缺少命令 (scopes / evaluate / optimise / allocate / streams / import-inputs / import-rates / config)"),
    };

    let mut cli = CliArgs {
        command,
        positional: Vec::new(),
        remote: false,
        cross_check: false,
        streams: false,
    };
    for arg in args {
        match arg.as_str() {
            "--remote" => cli.remote = true,
            "--cross-check" => cli.cross_check = true,
            "--streams" => cli.streams = true,
            other if other.starts_with("--") => bail!("未知参数: {}", other),
            _ => cli.positional.push(arg),
        }
    }
    Ok(cli)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let cli = parse_args()?;
    let db_path = get_default_db_path();
    tracing::info!(version = pallet_mix_modeller::VERSION, db_path = %db_path, "{}", pallet_mix_modeller::APP_NAME);

    let state = AppState::new(db_path).map_err(anyhow::Error::msg)?;

    // 费率来源: 默认本地库, --remote 时走 HTTP 服务
    let http_client = if cli.remote || cli.cross_check {
        Some(state.http_rates_client()?)
    } else {
        None
    };
    let source: &dyn RatesSource = match (&http_client, cli.remote) {
        (Some(client), true) => client as &dyn RatesSource,
        _ => state.rate_scopes.as_ref(),
    };

    match cli.command.as_str() {
        "scopes" => {
            let scopes = source.list_scopes().await?;
            print_json(&scopes)?;
        }

        "evaluate" => {
            let _perf = PerfGuard::new("evaluate");
            let mut store = state.scenario_store(cli.positional.first().map(String::as_str))?;
            store.fetch_rates(source).await?;
            let result = store.run_scenario()?.clone();

            match (&http_client, cli.cross_check) {
                (Some(client), true) => {
                    let report = store.cross_check(client).await?;
                    print_json(&json!({ "result": result, "cross_check": report }))?;
                }
                _ => print_json(&result)?,
            }
        }

        "optimise" => {
            let mut store = state.scenario_store(cli.positional.first().map(String::as_str))?;
            store.fetch_rates(source).await?;
            let before = store.run_scenario()?.totals;

            let cancel = CancellationFlag::new();
            let ctrl_c_flag = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("收到中断信号，取消优化");
                    ctrl_c_flag.cancel();
                }
            });

            let (progress, mut receiver) = WatchProgress::channel();
            let watcher = tokio::spawn(async move {
                while receiver.changed().await.is_ok() {
                    let fraction = *receiver.borrow();
                    tracing::info!(progress_pct = %format!("{:.1}", fraction * 100.0), "优化进度");
                }
            });

            let outcome = store.optimise_inputs(&state.optimiser, &progress, &cancel).await;
            drop(progress);
            let _ = watcher.await;
            let outcome = outcome?;

            state.snapshots.save_scenario_volumes(&store.state().inputs)?;
            let after = store
                .state()
                .results
                .as_ref()
                .map(|r| r.totals)
                .context("优化后缺少情景结果")?;

            print_json(&json!({
                "outcome": outcome,
                "before": before,
                "after": after,
            }))?;
        }

        "allocate" => {
            let report = state.workbook_api.allocation_report()?;
            let rates = report.rate_table().ok();
            print_json(&json!({ "report": report, "derived_rates": rates }))?;
        }

        "streams" => {
            let table = state.workbook_api.stream_table()?;
            print_json(&table)?;
        }

        "import-inputs" => {
            let file = cli.positional.first().context("缺少文件路径")?;
            let target = if cli.streams {
                InputsTarget::MultiStream
            } else {
                InputsTarget::Allocation
            };
            let summary = state.workbook_api.import_inputs(file, target)?;
            print_json(&json!({
                "fields_set": summary.fields_set,
                "fields_cleared": summary.fields_cleared,
            }))?;
        }

        "import-rates" => {
            let file = cli.positional.first().context("缺少文件路径")?;
            let raw = std::fs::read_to_string(file).with_context(|| format!("无法读取 {}", file))?;
            let count = state.rate_scopes.import_catalog_json(&raw)?;
            print_json(&json!({ "imported_scopes": count }))?;
        }

        "config" => {
            let snapshot = state
                .config
                .get_config_snapshot()
                .map_err(|e| anyhow::anyhow!("配置快照读取失败: {}", e))?;
            println!("{}", snapshot);
        }

        other => bail!("未知命令: {}", other),
    }

    Ok(())
}
