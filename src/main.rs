//! # 剪贴板 AI 过滤器 — 命令行入口
//!
//! 本文件仅负责参数解析、状态加载与事件循环。
//! 业务逻辑分布在各子模块中，详见 `lib.rs` 架构文档。

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use cbfilter::clipboard::{ClipboardProvider, SystemClipboard};
use cbfilter::config::FileConfigStore;
use cbfilter::error::AppError;
use cbfilter::filter::{FilterEvent, FilterRunner, InvocationSnapshot};
use cbfilter::setup::{self, SetupRequest};
use cbfilter::state::AppState;
use cbfilter::template::TemplateRegistry;
use cbfilter::transport::HttpTransport;
use cbfilter::{input, storage};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;

#[derive(Debug, Parser)]
#[command(name = "cbfilter", version, about = "把 AI 过滤器应用到剪贴板内容")]
struct Cli {
    /// provider 描述文件目录
    #[arg(long, global = true)]
    apidef: Option<PathBuf>,

    /// 用户配置目录
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// 列出与当前剪贴板内容匹配的过滤器
    List {
        /// 列出全部过滤器
        #[arg(long)]
        all: bool,
    },
    /// 执行过滤器（按标题或序号）
    Run {
        filter: String,
        /// 完成后不模拟粘贴
        #[arg(long)]
        no_paste: bool,
    },
    /// 列出 provider 提供的远端模型
    Models {
        #[arg(long)]
        provider: Option<String>,
        #[arg(long)]
        server_url: Option<String>,
        #[arg(long)]
        api_key: Option<String>,
    },
    /// 首次设置：拉取模型并恢复默认过滤器
    Setup {
        #[arg(long)]
        provider: String,
        #[arg(long)]
        server_url: Option<String>,
        #[arg(long, default_value = "")]
        api_key: String,
        #[arg(long)]
        language: Option<String>,
    },
    /// 列出已加载的 provider 与模板
    Providers,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Err(err) = execute(cli) {
        log::error!("❌ {}", err);
        std::process::exit(1);
    }
}

fn execute(cli: Cli) -> Result<(), AppError> {
    let mut state = load_state(&cli)?;

    match cli.command {
        Command::List { all } => list_filters(&state, all),
        Command::Run { filter, no_paste } => {
            let index = state
                .find_filter(&filter)
                .ok_or_else(|| AppError::Config(format!("未找到过滤器 '{}'", filter)))?;
            let snapshot = state
                .snapshot(index)
                .map_err(|e| AppError::Filter(e.to_string()))?;
            run_filter(snapshot, !no_paste)
        }
        Command::Models {
            provider,
            server_url,
            api_key,
        } => list_models(&state, provider, server_url, api_key),
        Command::Setup {
            provider,
            server_url,
            api_key,
            language,
        } => {
            let server_url = match server_url {
                Some(url) => url,
                None => state
                    .registry()
                    .find_provider_by_id(&provider)
                    .map(|p| p.default_endpoint.clone())
                    .unwrap_or_default(),
            };
            let request = SetupRequest {
                provider_id: provider,
                server_url,
                api_key,
                language,
                hotkey: None,
            };
            setup::run_initial_setup(&mut state, &request, &HttpTransport::default())?;
            list_filters(&state, true)
        }
        Command::Providers => {
            for provider in state.registry().providers() {
                println!("{}  {}", provider.id, provider.default_endpoint);
                for template in &provider.templates {
                    println!("    {}  {}", template.id, template.endpoint);
                }
            }
            Ok(())
        }
    }
}

fn load_state(cli: &Cli) -> Result<AppState, AppError> {
    let apidef = storage::get_apidef_dir(cli.apidef.as_deref())?;
    let registry = TemplateRegistry::load(&apidef).unwrap_or_else(|err| {
        log::warn!("📂 {}，将不使用任何 provider", err);
        TemplateRegistry::default()
    });

    let config_path = storage::get_config_path(cli.config_dir.as_deref())?;
    let default_path = storage::get_default_config_path()
        .inspect_err(|e| log::warn!("📂 无法定位默认配置: {}", e))
        .ok();
    let store = FileConfigStore::new(config_path, default_path);

    Ok(AppState::load(registry, Box::new(store)))
}

fn list_filters(state: &AppState, all: bool) -> Result<(), AppError> {
    let indices: Vec<usize> = if all {
        (0..state.filters().len()).collect()
    } else {
        state.compatible_filters(SystemClipboard::new().detect_type())
    };

    for index in indices {
        let filter = &state.filters()[index];
        let model = state
            .models()
            .get(filter.model_index)
            .map(|m| m.name.as_str())
            .unwrap_or("-");
        println!(
            "[{}] {}  ({} → {}, {})",
            index, filter.title, filter.input, filter.output, model
        );
    }
    println!("热键: {}", state.config().hotkey.display());
    Ok(())
}

fn list_models(
    state: &AppState,
    provider: Option<String>,
    server_url: Option<String>,
    api_key: Option<String>,
) -> Result<(), AppError> {
    let configured = state.models().first();
    let provider_id = provider
        .or_else(|| configured.map(|m| m.provider_id.clone()))
        .unwrap_or_default();
    let provider = state
        .registry()
        .resolve_provider(&provider_id)
        .ok_or_else(|| AppError::Config("没有可用的 provider".to_string()))?;

    let server_url = server_url
        .or_else(|| configured.map(|m| m.server_url.clone()))
        .unwrap_or_else(|| provider.default_endpoint.clone());
    let api_key = api_key
        .or_else(|| configured.map(|m| m.api_key.clone()))
        .unwrap_or_default();

    let models = setup::fetch_models(provider, &server_url, &api_key, &HttpTransport::default())?;
    for model in models {
        println!("{}", model);
    }
    Ok(())
}

/// 发起调用并在事件循环中等待结束。
fn run_filter(snapshot: InvocationSnapshot, paste: bool) -> Result<(), AppError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_time()
        .build()?;
    runtime.block_on(drive(snapshot, paste))
}

async fn drive(snapshot: InvocationSnapshot, paste: bool) -> Result<(), AppError> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let runner = FilterRunner::new(
        Arc::new(SystemClipboard::new()),
        Arc::new(HttpTransport::default()),
        tx,
    );
    runner
        .trigger(snapshot)
        .map_err(|e| AppError::Filter(e.to_string()))?;

    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    ticker.tick().await;

    loop {
        tokio::select! {
            event = rx.recv() => {
                let Some(event) = event else {
                    return Err(AppError::Filter("工作线程未返回结果".to_string()));
                };
                match event {
                    FilterEvent::Started { title } => {
                        log::info!("🚀 开始执行过滤器: {}", title);
                    }
                    FilterEvent::AlreadyRunning { title, elapsed } => {
                        log::info!("⏳ '{}' 正在执行，已耗时 {} 秒", title, elapsed.as_secs());
                    }
                    FilterEvent::Completed { title, output } => {
                        log::info!("✅ 过滤器 '{}' 完成，结果类型: {}", title, output);
                        if paste {
                            tokio::task::spawn_blocking(|| input::paste_clipboard(input::PASTE_DELAY))
                                .await
                                .map_err(|e| AppError::Input(e.to_string()))??;
                        }
                        return Ok(());
                    }
                    FilterEvent::Failed { title, reason } => {
                        return Err(AppError::Filter(format!("{}: {}", title, reason)));
                    }
                }
            }
            _ = ticker.tick() => {
                if let Some(progress) = runner.progress() {
                    log::info!("⏳ '{}' 已耗时 {} 秒", progress.title, progress.elapsed.as_secs());
                }
            }
        }
    }
}
