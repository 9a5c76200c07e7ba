//! Configuração via TOML + configuração imutável da sessão de ingestão.

use crate::buffer::MAX_POINTS;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Baud rate padrão do firmware.
pub const DEFAULT_BAUD: u32 = 115_200;

/// Erros ao salvar/carregar configuração.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Erro ao ler {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Erro ao parsear {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Erro ao serializar configuração: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Erro ao gravar {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Porta padrão por plataforma.
pub fn default_port() -> String {
    if cfg!(windows) {
        "COM8".into()
    } else if cfg!(target_os = "macos") {
        "/dev/tty.usbmodem14101".into()
    } else {
        "/dev/ttyACM0".into()
    }
}

/// Seção `[serial]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Nome da porta (ex: "/dev/ttyACM0", "COM8")
    pub port: String,
    pub baud: u32,
    /// Timeout de leitura (ms). Limita o tempo para observar o pedido de parada.
    pub read_timeout_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            baud: DEFAULT_BAUD,
            read_timeout_ms: 100,
        }
    }
}

/// Seção `[filters]`. String vazia = desativado.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Só exibe linhas que contêm esta palavra (sem diferenciar maiúsculas)
    pub filter: String,
    /// Oculta linhas que contêm esta palavra (sem diferenciar maiúsculas)
    pub suppress: String,
}

/// Seção `[telemetry]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Tamanho da janela de amostras
    pub max_points: usize,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            max_points: MAX_POINTS,
        }
    }
}

/// Seção `[chart]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    pub enabled: bool,
    /// Intervalo entre redesenhos (ms)
    pub refresh_ms: u64,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            refresh_ms: 1000,
        }
    }
}

/// Configuração raiz do aplicativo.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub serial: SerialConfig,
    pub filters: FilterConfig,
    pub telemetry: TelemetryConfig,
    pub chart: ChartConfig,
}

impl AppConfig {
    /// Carrega configuração de um arquivo TOML.
    ///
    /// Arquivo ausente ou inválido resulta na configuração padrão.
    pub fn load(path: &Path) -> Self {
        if path.exists() {
            match Self::try_load(path) {
                Ok(config) => {
                    info!("Configuração carregada de {}", path.display());
                    return config;
                }
                Err(e) => warn!("{e}"),
            }
        }

        info!("Usando configuração padrão");
        AppConfig::default()
    }

    /// Como [`AppConfig::load`], mas propaga o erro.
    pub fn try_load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Salva configuração em arquivo TOML.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Configuração salva em {}", path.display());
        Ok(())
    }

    /// Retorna o caminho padrão do config.toml (ao lado do executável).
    pub fn default_path() -> PathBuf {
        let exe_dir = std::env::current_exe()
            .map(|p| p.parent().unwrap_or(Path::new(".")).to_path_buf())
            .unwrap_or_else(|_| PathBuf::from("."));
        exe_dir.join("config.toml")
    }

    /// Valida a configuração e retorna lista de erros.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.serial.port.trim().is_empty() {
            errors.push("Porta serial não pode ser vazia".into());
        }
        if self.serial.baud == 0 {
            errors.push("Baud rate não pode ser 0".into());
        }
        if !(1..=1000).contains(&self.serial.read_timeout_ms) {
            errors.push(format!(
                "Timeout de leitura inválido: {} ms (1–1000)",
                self.serial.read_timeout_ms
            ));
        }
        if self.telemetry.max_points == 0 {
            errors.push("max_points não pode ser 0".into());
        }
        if self.chart.refresh_ms < 100 {
            errors.push(format!(
                "Intervalo do gráfico inválido: {} ms (mínimo 100)",
                self.chart.refresh_ms
            ));
        }

        errors
    }

    /// Configuração imutável da sessão de ingestão.
    pub fn ingestion(&self) -> IngestionConfig {
        IngestionConfig::new(
            self.serial.port.clone(),
            self.serial.baud,
            &self.filters.filter,
            &self.filters.suppress,
        )
        .with_read_timeout(Duration::from_millis(self.serial.read_timeout_ms))
    }
}

// ──────────────────────────────────────────────
// Sessão de ingestão
// ──────────────────────────────────────────────

/// Parâmetros de uma sessão de ingestão. Imutável depois de construída.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestionConfig {
    port: String,
    baud: u32,
    filter: Option<String>,
    suppress: Option<String>,
    read_timeout: Duration,
}

impl IngestionConfig {
    /// Palavras-chave são normalizadas para minúsculas; vazias viram `None`.
    pub fn new(port: impl Into<String>, baud: u32, filter: &str, suppress: &str) -> Self {
        Self {
            port: port.into(),
            baud,
            filter: normalize_keyword(filter),
            suppress: normalize_keyword(suppress),
            read_timeout: Duration::from_millis(100),
        }
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    pub fn baud(&self) -> u32 {
        self.baud
    }

    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    pub fn suppress(&self) -> Option<&str> {
        self.suppress.as_deref()
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// `true` se a linha deve ir para a saída de exibição.
    ///
    /// `lower` precisa estar em minúsculas.
    pub fn accepts(&self, lower: &str) -> bool {
        if let Some(filter) = &self.filter {
            if !lower.contains(filter.as_str()) {
                return false;
            }
        }
        if let Some(suppress) = &self.suppress {
            if lower.contains(suppress.as_str()) {
                return false;
            }
        }
        true
    }

    /// Avisos de configuração a exibir antes do streaming.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if let (Some(filter), Some(suppress)) = (&self.filter, &self.suppress) {
            if filter == suppress {
                warnings.push(format!(
                    "Filter e suppress usam a mesma palavra ('{filter}'): nenhuma linha será exibida"
                ));
            }
        }
        warnings
    }
}

fn normalize_keyword(keyword: &str) -> Option<String> {
    let keyword = keyword.trim();
    (!keyword.is_empty()).then(|| keyword.to_lowercase())
}
