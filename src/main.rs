use anyhow::Result;
use clap::Parser;
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use std::sync::Arc;
mod config;
mod error;
mod events;
mod geometry;
mod services;
mod utils;

use config::Config;
use services::{create_window_source, Recommender, TracingSurface};

/// Ёмкость очереди сырых событий между источником и движком
const EVENT_QUEUE_CAPACITY: usize = 256;

#[derive(Parser, Debug)]
#[command(name = "window-haze")]
#[command(about = "Затемняет экран вокруг окон, с которыми вы сейчас работаете")]
struct Args {
    /// Путь к файлу конфигурации
    #[arg(short, long, default_value = "haze.toml")]
    config: String,

    /// Эмулируемый рабочий стол вместо X11
    #[arg(long)]
    dry_run: bool,

    /// Уровень логирования (по умолчанию из конфигурации)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Загрузка конфигурации
    let config = Arc::new(Config::load(&args.config)?);

    // Инициализация системы логирования
    let level = args.log_level.as_deref().unwrap_or(&config.logging.level);
    init_tracing(level)?;

    info!("Запуск Window Haze v{}", env!("CARGO_PKG_VERSION"));
    info!("Конфигурация загружена из: {}", args.config);

    if args.dry_run {
        warn!("Режим сухого запуска - окна эмулируются");
    }

    // Источник окон и движок; начальное состояние строится до запуска источника
    let (source, event_source) = create_window_source(config.clone(), args.dry_run)?;
    let mut recommender = Recommender::new(config.clone(), source, TracingSurface::factory())?;
    recommender.start();

    info!("Все компоненты инициализированы");

    let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);

    let source_handle = tokio::spawn(async move {
        if let Err(e) = event_source.run(events_tx).await {
            error!("Ошибка в источнике событий окон: {}", e);
        }
    });
    let mut engine_handle = tokio::spawn(async move {
        if let Err(e) = recommender.run(events_rx).await {
            error!("Ошибка в Recommender: {}", e);
        }
    });

    info!("Все сервисы запущены");

    // Ожидание сигнала завершения или остановки движка
    tokio::select! {
        result = signal::ctrl_c() => match result {
            Ok(()) => info!("Получен сигнал завершения (Ctrl+C)"),
            Err(err) => error!("Ошибка при ожидании сигнала завершения: {}", err),
        },
        _ = &mut engine_handle => {
            warn!("Recommender завершился раньше сигнала");
        }
    }

    info!("Завершение работы...");

    // Закрытие источника закрывает канал, и движок останавливает оверлеи
    source_handle.abort();

    let shutdown_timeout = tokio::time::Duration::from_secs(5);
    let shutdown_result = tokio::time::timeout(shutdown_timeout, async {
        let _ = source_handle.await;
        if !engine_handle.is_finished() {
            let _ = engine_handle.await;
        }
    }).await;

    match shutdown_result {
        Ok(_) => info!("Все сервисы завершили работу корректно"),
        Err(_) => warn!("Таймаут при завершении сервисов"),
    }

    info!("Window Haze завершил работу");
    Ok(())
}

fn init_tracing(level: &str) -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().compact())
        .init();

    Ok(())
}
