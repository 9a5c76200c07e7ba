//! Troca do contador do dispositivo (`[<millis>]`) pelo relógio do host.
//!
//! O relógio do dispositivo não é sincronizado e reinicia a cada boot.

use chrono::NaiveTime;
use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

static DEVICE_STAMP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[\d+\]").expect("regex de timestamp inválida"));

/// Formato do horário do host nas linhas reescritas.
pub const HOST_TIME_FORMAT: &str = "%H:%M:%S";

/// Substitui o prefixo `[<dígitos>]` por `[HH:MM:SS]`.
///
/// Linhas sem o prefixo na posição 0 são devolvidas sem alocação.
pub fn rewrite_timestamp(line: &str, host_time: NaiveTime) -> Cow<'_, str> {
    match DEVICE_STAMP.find(line) {
        Some(m) => {
            let stamp = host_time.format(HOST_TIME_FORMAT);
            Cow::Owned(format!("[{stamp}]{}", &line[m.end()..]))
        }
        None => Cow::Borrowed(line),
    }
}
