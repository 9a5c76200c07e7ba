//! # Device Monitor
//!
//! Lê o log serial de um dispositivo embarcado, imprime cada linha
//! colorida por categoria e plota a memória livre/total em tempo real.
//!
//! ## Uso
//! ```bash
//! device_monitor                          # porta do config.toml
//! device_monitor /dev/ttyUSB0 --baud 921600
//! device_monitor --filter mem --suppress loop
//! device_monitor --no-chart               # só terminal (Ctrl-C para sair)
//! device_monitor --list-ports
//! ```
//!
//! ## Atalhos (janela do gráfico)
//! - `Q` / `Esc`: Sair

mod console;
mod dashboard;
mod serial_thread;

use clap::Parser;
use console::ConsoleSink;
use dashboard::MemoryDashboard;
use monitor_core::buffer::TelemetryBuffer;
use monitor_core::config::{AppConfig, IngestionConfig};
use monitor_core::ingest::Disconnect;
use monitor_core::serial::{self, SerialLink};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "device_monitor", about = "Monitor serial com gráfico de memória", version)]
struct Cli {
    /// Porta serial (padrão: config.toml ou padrão da plataforma)
    #[arg(value_name = "PORT")]
    port: Option<String>,

    /// Baud rate
    #[arg(long)]
    baud: Option<u32>,

    /// Só exibe linhas que contêm esta palavra (sem diferenciar maiúsculas)
    #[arg(long)]
    filter: Option<String>,

    /// Oculta linhas que contêm esta palavra (sem diferenciar maiúsculas)
    #[arg(long)]
    suppress: Option<String>,

    /// Número de amostras mantidas no gráfico
    #[arg(long, value_name = "N")]
    max_points: Option<usize>,

    /// Arquivo de configuração (padrão: config.toml ao lado do executável)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Só terminal, sem janela de gráfico
    #[arg(long)]
    no_chart: bool,

    /// Lista as portas seriais e sai
    #[arg(long)]
    list_ports: bool,
}

impl Cli {
    /// Argumentos da linha de comando têm prioridade sobre o arquivo.
    fn apply(&self, config: &mut AppConfig) {
        if let Some(port) = &self.port {
            config.serial.port = port.clone();
        }
        if let Some(baud) = self.baud {
            config.serial.baud = baud;
        }
        if let Some(filter) = &self.filter {
            config.filters.filter = filter.clone();
        }
        if let Some(suppress) = &self.suppress {
            config.filters.suppress = suppress.clone();
        }
        if let Some(max_points) = self.max_points {
            config.telemetry.max_points = max_points;
        }
        if self.no_chart {
            config.chart.enabled = false;
        }
    }
}

fn main() -> ExitCode {
    // ── Logging ──
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    if cli.list_ports {
        return list_ports();
    }

    // ── Config ──
    let config_path = cli.config.clone().unwrap_or_else(AppConfig::default_path);
    let mut config = AppConfig::load(&config_path);

    // Salva config padrão se não existir
    if cli.config.is_none() && !config_path.exists() {
        if let Err(e) = config.save(&config_path) {
            warn!("Não foi possível salvar config padrão: {e}");
        }
    }

    cli.apply(&mut config);

    let errors = config.validate();
    if !errors.is_empty() {
        for e in &errors {
            console::alert(&format!("Configuração inválida: {e}"));
        }
        return ExitCode::from(2);
    }

    let ingestion = config.ingestion();
    print_banner(&ingestion);

    // ── Conexão ──
    let link = match SerialLink::open(&ingestion) {
        Ok(link) => link,
        Err(e) => {
            console::alert(&e.to_string());
            return ExitCode::FAILURE;
        }
    };

    let buffer = Arc::new(TelemetryBuffer::new(config.telemetry.max_points));
    let port = ingestion.port().to_string();

    let handle = match serial_thread::spawn_ingest_thread(
        link,
        ingestion,
        Arc::clone(&buffer),
        ConsoleSink,
    ) {
        Ok(handle) => handle,
        Err(e) => {
            console::alert(&e.to_string());
            return ExitCode::FAILURE;
        }
    };

    // ── Renderização ──
    let mut exit = ExitCode::SUCCESS;
    if config.chart.enabled {
        console::notice("Abrindo janela do gráfico... (feche a janela para sair)");
        let refresh = Duration::from_millis(config.chart.refresh_ms);
        if let Err(e) = run_chart(buffer, port, refresh) {
            error!("Falha na janela do gráfico: {e}");
            exit = ExitCode::FAILURE;
        }
        handle.stop();
    } else {
        let stop = handle.stop_flag();
        if let Err(e) = ctrlc::set_handler(move || {
            info!("Sinal de parada recebido");
            stop.store(true, Ordering::Relaxed);
        }) {
            warn!("Falha ao registrar handler de Ctrl-C: {e}");
        }
    }

    // Sem gráfico, só retorna após Ctrl-C ou desconexão
    if let Some(message) = handle.join().as_ref().and_then(disconnect_notice) {
        console::alert(&message);
    }
    console::notice("Saindo...");

    exit
}

/// Mensagem ao operador quando a conexão terminou sem pedido de parada.
fn disconnect_notice(outcome: &Disconnect) -> Option<String> {
    match outcome {
        Disconnect::Cancelled => None,
        Disconnect::EndOfStream => Some("Porta fechada pelo dispositivo (fim dos dados).".into()),
        Disconnect::DeviceLost(e) => Some(format!("Dispositivo desconectado: {e}")),
    }
}

fn run_chart(buffer: Arc<TelemetryBuffer>, port: String, refresh: Duration) -> eframe::Result<()> {
    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_title("Device Memory Monitor")
            .with_inner_size([1000.0, 600.0])
            .with_min_inner_size([640.0, 400.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Device Memory Monitor",
        options,
        Box::new(move |_cc| Ok(Box::new(MemoryDashboard::new(buffer, port, refresh)))),
    )
}

fn print_banner(config: &IngestionConfig) {
    console::notice(&format!(
        "--- Abrindo {} a {} baud ---",
        config.port(),
        config.baud()
    ));
    for warning in config.warnings() {
        warn!("{warning}");
        console::notice(&format!("Aviso: {warning}"));
    }
    if let Some(filter) = config.filter() {
        console::notice(&format!("Exibindo apenas linhas com: '{filter}'"));
    }
    if let Some(suppress) = config.suppress() {
        console::notice(&format!("Ocultando linhas com: '{suppress}'"));
    }
}

fn list_ports() -> ExitCode {
    match serial::list_ports() {
        Ok(ports) if ports.is_empty() => {
            console::notice("Nenhuma porta serial encontrada");
            ExitCode::SUCCESS
        }
        Ok(ports) => {
            for port in ports {
                println!("{port}");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            console::alert(&format!("Erro ao listar portas: {e}"));
            ExitCode::FAILURE
        }
    }
}
