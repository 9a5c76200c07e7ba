//! # Monitor Core
//!
//! Pipeline de ingestão de logs seriais de um dispositivo embarcado:
//! classificação de linhas, extração de amostras de memória, troca do
//! timestamp do dispositivo pelo relógio do host e buffer circular
//! compartilhado com o gráfico.
//!
//! ## Módulos
//! - [`classify`] – Categoria de apresentação por palavra-chave
//! - [`extract`] – `Free:`/`Total:` das linhas `[MEM]`
//! - [`timestamp`] – `[<millis>]` → `[HH:MM:SS]`
//! - [`buffer`] – Janela FIFO thread-safe das últimas amostras
//! - [`ingest`] – Loop de leitura da serial
//! - [`serial`] – Abertura da porta e listagem de portas
//! - [`config`] – Configuração TOML e da sessão
//! - [`types`] – `Sample` e `Category`

pub mod types;
pub mod classify;
pub mod extract;
pub mod timestamp;
pub mod buffer;
pub mod ingest;
pub mod serial;
pub mod config;

// Re-exports convenientes
pub use buffer::{MAX_POINTS, TelemetryBuffer};
pub use config::{AppConfig, IngestionConfig};
pub use ingest::{Disconnect, Ingestor, LineSink};
pub use serial::{IngestError, SerialLink};
pub use types::{Category, Sample};
