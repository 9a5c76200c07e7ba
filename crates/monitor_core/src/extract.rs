//! Extração de métricas de memória das linhas `[MEM]`.
//!
//! Formato emitido pelo firmware:
//!
//! ```text
//! [MEM] Free: 196344 bytes, Total: 226412 bytes, Min Free: 112620 bytes
//! ```
//!
//! O formato não tem colunas fixas, então qualquer texto entre os dois
//! campos é aceito.

use regex::Regex;
use std::sync::LazyLock;

static MEMORY_FIELDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Free:\s*(\d+).*Total:\s*(\d+)").expect("regex de memória inválida")
});

/// Extrai `(free_bytes, total_bytes)` de uma linha de memória.
///
/// Retorna `None` se algum campo estiver ausente ou não couber em `u64`.
pub fn extract_memory(line: &str) -> Option<(u64, u64)> {
    let caps = MEMORY_FIELDS.captures(line)?;
    let free = caps.get(1)?.as_str().parse::<u64>().ok()?;
    let total = caps.get(2)?.as_str().parse::<u64>().ok()?;
    Some((free, total))
}
