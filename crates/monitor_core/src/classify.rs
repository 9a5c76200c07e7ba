//! Classificação de linhas do log por palavra-chave.
//!
//! A tabela é estática e ordenada: a primeira categoria com alguma
//! palavra-chave contida na linha (em maiúsculas) vence.

use crate::types::Category;

/// Marcador que identifica linhas de uso de memória.
pub const MEMORY_TAG: &str = "[MEM]";

/// Tabela de precedência `(categoria, palavras-chave)`.
///
/// Palavras-chave devem estar em maiúsculas.
pub const CATEGORY_KEYWORDS: &[(Category, &[&str])] = &[
    (
        Category::Error,
        &["ERROR", "[ERR]", "[SCT]", "FAILED", "WARNING"],
    ),
    (Category::Memory, &[MEMORY_TAG, "FREE:"]),
    (
        Category::Graphics,
        &[
            "[GFX]",
            "[ERS]",
            "DISPLAY",
            "RAM WRITE",
            "RAM COMPLETE",
            "REFRESH",
            "POWERING ON",
            "FRAME BUFFER",
            "LUT",
        ],
    ),
    (
        Category::Parsing,
        &[
            "[EBP]",
            "[BMC]",
            "[ZIP]",
            "[PARSER]",
            "[EHP]",
            "LOADING EPUB",
            "CACHE",
            "DECOMPRESSED",
            "PARSING",
        ],
    ),
    (
        Category::Activity,
        &["[ACT]", "ENTERING ACTIVITY", "EXITING ACTIVITY"],
    ),
    (
        Category::Timing,
        &["RENDERED PAGE", "[LOOP]", "DURATION", "WAIT COMPLETE"],
    ),
    (
        Category::Settings,
        &["[CPS]", "SETTINGS", "[CLEAR_CACHE]", "[CHAP]", "[OPDS]", "[COF]"],
    ),
    (
        Category::Boot,
        &[
            "ESP-ROM",
            "BUILD:",
            "RST:",
            "BOOT:",
            "SPIWP:",
            "MODE:",
            "LOAD:",
            "ENTRY",
            "[SD]",
            "STARTING CROSSPOINT",
            "VERSION",
        ],
    ),
    (Category::Reader, &["[RBS]"]),
    (
        Category::Display,
        &[
            "[KRS]",
            "EINKDISPLAY:",
            "STATIC FRAME",
            "INITIALIZING",
            "SPI INITIALIZED",
            "GPIO PINS",
            "RESETTING",
            "SSD1677",
            "E-INK",
        ],
    ),
    (Category::Footnote, &["[FNS]", "FOOTNOTE"]),
];

/// Retorna a categoria de apresentação de uma linha.
///
/// Total e determinística: linhas sem correspondência caem em
/// [`Category::Default`].
pub fn classify(line: &str) -> Category {
    let upper = line.to_uppercase();
    CATEGORY_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|kw| upper.contains(kw)))
        .map(|(category, _)| *category)
        .unwrap_or(Category::Default)
}

/// `true` se a linha carrega o marcador de amostra de memória.
pub fn is_memory_line(line: &str) -> bool {
    line.contains(MEMORY_TAG)
}
