//! Janela do gráfico de memória – App eframe/egui.
//!
//! Lê o buffer com `snapshot()` na cadência própria (padrão 1 s),
//! desacoplada da taxa de ingestão.

use egui::{Color32, RichText};
use egui_plot::{Corner, Legend, Line, LineStyle, Plot, PlotPoints, Points};
use monitor_core::buffer::TelemetryBuffer;
use monitor_core::timestamp::HOST_TIME_FORMAT;
use monitor_core::types::Sample;
use std::sync::Arc;
use std::time::{Duration, Instant};

const FREE_COLOR: Color32 = Color32::from_rgb(0, 170, 85);
const TOTAL_COLOR: Color32 = Color32::from_rgb(220, 50, 50);

/// Estado da janela.
pub struct MemoryDashboard {
    buffer: Arc<TelemetryBuffer>,
    port: String,
    refresh: Duration,

    // Última cópia do buffer
    samples: Vec<Sample>,
    last_poll: Option<Instant>,
}

impl MemoryDashboard {
    pub fn new(buffer: Arc<TelemetryBuffer>, port: String, refresh: Duration) -> Self {
        Self {
            buffer,
            port,
            refresh,
            samples: Vec::new(),
            last_poll: None,
        }
    }

    /// Tira uma cópia do buffer se o intervalo venceu.
    fn poll_buffer(&mut self, now: Instant) {
        if self
            .last_poll
            .is_some_and(|t| now.saturating_duration_since(t) < self.refresh)
        {
            return;
        }
        self.last_poll = Some(now);

        let snapshot = self.buffer.snapshot();
        // Buffer vazio: mantém o desenho anterior
        if !snapshot.is_empty() {
            self.samples = snapshot;
        }
    }

    fn status_text(&self) -> String {
        match self.samples.last() {
            Some(last) => format!(
                "● {} | {}/{} amostras | Livre {:.1} KB / Em uso {:.1} KB / Total {:.1} KB | {}",
                self.port,
                self.samples.len(),
                self.buffer.capacity(),
                last.free_kb,
                last.used_kb(),
                last.total_kb,
                last.timestamp.format(HOST_TIME_FORMAT),
            ),
            None => format!("○ Aguardando linhas [MEM] em {}...", self.port),
        }
    }

    fn render_status(&self, ui: &mut egui::Ui) {
        ui.label(RichText::new(self.status_text()).monospace());
    }

    fn render_plot(&self, ui: &mut egui::Ui) {
        let Some(first) = self.samples.first() else {
            return;
        };
        let origin = first.timestamp;
        let seconds = |s: &Sample| (s.timestamp - origin).num_seconds() as f64;

        let total: Vec<[f64; 2]> = self.samples.iter().map(|s| [seconds(s), s.total_kb]).collect();
        let free: Vec<[f64; 2]> = self.samples.iter().map(|s| [seconds(s), s.free_kb]).collect();

        let total_line = Line::new(PlotPoints::from(total))
            .name("Total RAM (KB)")
            .color(TOTAL_COLOR)
            .style(LineStyle::dashed_loose())
            .width(1.5);
        let free_line = Line::new(PlotPoints::from(free.clone()))
            .name("Free RAM (KB)")
            .color(FREE_COLOR)
            .width(2.0)
            .fill(0.0);
        let free_markers = Points::new(PlotPoints::from(free))
            .name("Free RAM (KB)")
            .color(FREE_COLOR)
            .radius(3.0);

        Plot::new("memory_plot")
            .legend(Legend::default().position(Corner::LeftTop))
            .x_axis_label("Tempo (s)")
            .y_axis_label("Memória (KB)")
            .include_y(0.0)
            .allow_drag(false)
            .allow_zoom(false)
            .allow_scroll(false)
            .allow_boxed_zoom(false)
            .show(ui, |plot_ui| {
                plot_ui.line(total_line);
                plot_ui.line(free_line);
                plot_ui.points(free_markers);
            });
    }
}

impl eframe::App for MemoryDashboard {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_buffer(Instant::now());
        ctx.request_repaint_after(self.refresh);

        let quit = ctx.input(|i: &egui::InputState| {
            i.key_pressed(egui::Key::Q) || i.key_pressed(egui::Key::Escape)
        });
        if quit {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }

        egui::CentralPanel::default().show(ctx, |ui: &mut egui::Ui| {
            ui.vertical_centered(|ui: &mut egui::Ui| {
                ui.label(RichText::new("Device Memory Monitor").size(20.0).strong());
                self.render_status(ui);
            });
            ui.add_space(6.0);
            self.render_plot(ui);
        });
    }
}
