//! Saída colorida no terminal, uma cor por categoria.

use crossterm::style::{Color, Stylize};
use monitor_core::ingest::LineSink;
use monitor_core::types::Category;
use std::io::Write;

/// Cor de terminal de cada categoria.
pub fn category_color(category: Category) -> Color {
    match category {
        Category::Error => Color::Red,
        Category::Memory => Color::DarkCyan,
        Category::Graphics => Color::DarkMagenta,
        Category::Parsing => Color::DarkGreen,
        Category::Activity => Color::DarkYellow,
        Category::Timing => Color::DarkBlue,
        Category::Settings => Color::Yellow,
        Category::Boot => Color::DarkGrey,
        Category::Reader => Color::Cyan,
        Category::Display => Color::Magenta,
        Category::Footnote => Color::Green,
        Category::Default => Color::White,
    }
}

/// Imprime avisos do operador (banner, filtros) em amarelo.
pub fn notice(text: &str) {
    println!("{}", text.with(Color::Yellow));
}

/// Imprime erros em vermelho no stderr.
pub fn alert(text: &str) {
    eprintln!("{}", text.with(Color::Red));
}

/// Sink que escreve cada linha aceita no stdout.
pub struct ConsoleSink;

impl LineSink for ConsoleSink {
    fn emit(&mut self, category: Category, line: &str) {
        let mut out = std::io::stdout().lock();
        // stdout fechado (pipe) não derruba a ingestão
        let _ = writeln!(out, "{}", line.with(category_color(category)));
    }
}
