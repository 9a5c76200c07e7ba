//! Tipos compartilhados entre ingestão, buffer e renderização.

use chrono::{DateTime, Local, SubsecRound};

/// Bytes por kilobyte usados na conversão das amostras.
pub const BYTES_PER_KB: f64 = 1024.0;

// ──────────────────────────────────────────────
// Amostra de memória
// ──────────────────────────────────────────────

/// Um ponto de telemetria: horário do host + memória livre/total (KB).
///
/// `free_kb <= total_kb` é o esperado, mas não é garantido: o firmware pode
/// emitir dados inconsistentes e o buffer guarda o que foi extraído.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Horário do host, resolução de segundos
    pub timestamp: DateTime<Local>,
    /// Memória livre (KB)
    pub free_kb: f64,
    /// Memória total (KB)
    pub total_kb: f64,
}

impl Sample {
    /// Cria uma amostra a partir de valores em bytes.
    ///
    /// A divisão por 1024 é racional (sem truncamento) e o horário é
    /// arredondado para o segundo.
    pub fn from_bytes(timestamp: DateTime<Local>, free_bytes: u64, total_bytes: u64) -> Self {
        Self {
            timestamp: timestamp.trunc_subsecs(0),
            free_kb: free_bytes as f64 / BYTES_PER_KB,
            total_kb: total_bytes as f64 / BYTES_PER_KB,
        }
    }

    /// Memória em uso (KB). Satura em zero se `free_kb > total_kb`.
    pub fn used_kb(&self) -> f64 {
        (self.total_kb - self.free_kb).max(0.0)
    }
}

// ──────────────────────────────────────────────
// Categoria de linha
// ──────────────────────────────────────────────

/// Tag de apresentação atribuída a cada linha do log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Error,
    Memory,
    Graphics,
    Parsing,
    Activity,
    Timing,
    Settings,
    Boot,
    Reader,
    Display,
    Footnote,
    Default,
}

impl Category {
    /// Nome curto e estável, usado nos campos de log.
    pub fn label(self) -> &'static str {
        match self {
            Category::Error => "error",
            Category::Memory => "memory",
            Category::Graphics => "graphics",
            Category::Parsing => "parsing",
            Category::Activity => "activity",
            Category::Timing => "timing",
            Category::Settings => "settings",
            Category::Boot => "boot",
            Category::Reader => "reader",
            Category::Display => "display",
            Category::Footnote => "footnote",
            Category::Default => "default",
        }
    }
}
