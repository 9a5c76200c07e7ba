//! Loop de ingestão: lê linhas da serial, reescreve timestamp, extrai
//! amostras de memória e encaminha as linhas aceitas para exibição.
//!
//! Estados: `Connecting` ([`SerialLink::open`](crate::serial::SerialLink::open))
//! → `Streaming` ([`Ingestor::run`]) → `Disconnected` (valor [`Disconnect`]).

use crate::buffer::TelemetryBuffer;
use crate::classify::{classify, is_memory_line};
use crate::config::IngestionConfig;
use crate::extract::extract_memory;
use crate::timestamp::rewrite_timestamp;
use crate::types::{Category, Sample};
use chrono::{DateTime, Local};
use std::fmt;
use std::io::{self, BufRead, BufReader, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, trace, warn};

/// Tamanho máximo de uma linha; acima disso ela é processada em pedaços.
pub const MAX_LINE_BYTES: usize = 4096;

/// Destino das linhas aceitas (terminal, UI, testes…).
pub trait LineSink {
    fn emit(&mut self, category: Category, line: &str);
}

impl<F: FnMut(Category, &str)> LineSink for F {
    fn emit(&mut self, category: Category, line: &str) {
        self(category, line)
    }
}

/// Motivo do fim do streaming (estado terminal).
#[derive(Debug)]
pub enum Disconnect {
    /// Parada pedida pelo flag de cancelamento
    Cancelled,
    /// A fonte retornou fim de dados
    EndOfStream,
    /// Erro de I/O no meio do streaming (ex: cabo desconectado)
    DeviceLost(io::Error),
}

impl fmt::Display for Disconnect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Disconnect::Cancelled => write!(f, "parada solicitada"),
            Disconnect::EndOfStream => write!(f, "fim dos dados"),
            Disconnect::DeviceLost(e) => write!(f, "dispositivo desconectado ({e})"),
        }
    }
}

/// Produtor único do [`TelemetryBuffer`].
pub struct Ingestor<S> {
    config: IngestionConfig,
    buffer: Arc<TelemetryBuffer>,
    sink: S,
    stop: Arc<AtomicBool>,
}

impl<S: LineSink> Ingestor<S> {
    pub fn new(config: IngestionConfig, buffer: Arc<TelemetryBuffer>, sink: S) -> Self {
        Self {
            config,
            buffer,
            sink,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag de parada cooperativa, verificado a cada ciclo de leitura.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Faz o streaming até desconexão, fim dos dados ou pedido de parada.
    ///
    /// Consome a fonte: o handle é liberado em qualquer saída, inclusive
    /// em panic.
    pub fn run<R: Read>(&mut self, source: R) -> Disconnect {
        info!("Streaming de {} iniciado", self.config.port());

        let mut reader = BufReader::new(source);
        let outcome = self.stream(&mut reader);
        drop(reader);

        match &outcome {
            Disconnect::DeviceLost(e) => warn!("Dispositivo desconectado: {e}"),
            other => info!("Streaming encerrado: {other}"),
        }
        outcome
    }

    fn stream<R: Read>(&mut self, reader: &mut BufReader<R>) -> Disconnect {
        let mut pending: Vec<u8> = Vec::with_capacity(256);

        loop {
            if self.stop.load(Ordering::Relaxed) {
                return Disconnect::Cancelled;
            }

            let limit = (MAX_LINE_BYTES - pending.len()) as u64;
            match reader.by_ref().take(limit).read_until(b'\n', &mut pending) {
                Ok(0) => {
                    if !pending.is_empty() {
                        self.process_line(&pending, Local::now());
                    }
                    return Disconnect::EndOfStream;
                }
                Ok(_) => {
                    if pending.ends_with(b"\n") || pending.len() >= MAX_LINE_BYTES {
                        self.process_line(&pending, Local::now());
                        pending.clear();
                    }
                }
                // Sem dados neste ciclo; fragmento parcial continua em `pending`
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::TimedOut
                            | io::ErrorKind::WouldBlock
                            | io::ErrorKind::Interrupted
                    ) => {}
                Err(e) => return Disconnect::DeviceLost(e),
            }
        }
    }

    /// Processa uma linha crua. Retorna `true` se ela foi exibida.
    ///
    /// A amostra de memória é registrada independentemente de
    /// filter/suppress.
    pub fn process_line(&mut self, raw: &[u8], now: DateTime<Local>) -> bool {
        let decoded = String::from_utf8_lossy(raw);
        let trimmed = decoded.trim_end();
        if trimmed.is_empty() {
            return false;
        }

        let line = rewrite_timestamp(trimmed, now.time());

        if is_memory_line(&line) {
            match extract_memory(&line) {
                Some((free, total)) => {
                    let sample = Sample::from_bytes(now, free, total);
                    trace!("Amostra: {:.2} KB livres / {:.2} KB", sample.free_kb, sample.total_kb);
                    self.buffer.append(sample);
                }
                None => debug!("Linha de memória sem campos válidos: {line}"),
            }
        }

        if !self.config.accepts(&line.to_lowercase()) {
            return false;
        }

        let category = classify(&line);
        trace!(category = category.label(), "Linha exibida");
        self.sink.emit(category, &line);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::VecDeque;
    use std::io::Cursor;
    use std::panic::{AssertUnwindSafe, catch_unwind};

    type Emitted = Vec<(Category, String)>;

    fn collector(out: &mut Emitted) -> impl FnMut(Category, &str) + '_ {
        move |category, line| out.push((category, line.to_string()))
    }

    fn ten_fifteen() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 1, 10, 15, 0).unwrap()
    }

    /// Leitor roteirizado que simula a porta serial.
    enum Step {
        Data(&'static [u8]),
        Timeout,
        Fail(io::ErrorKind),
    }

    struct Scripted {
        steps: VecDeque<Step>,
        dropped: Arc<AtomicBool>,
        stop_when_drained: Option<Arc<AtomicBool>>,
    }

    impl Scripted {
        fn new(steps: Vec<Step>) -> (Self, Arc<AtomicBool>) {
            let dropped = Arc::new(AtomicBool::new(false));
            let reader = Self {
                steps: steps.into(),
                dropped: Arc::clone(&dropped),
                stop_when_drained: None,
            };
            (reader, dropped)
        }
    }

    impl Read for Scripted {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.steps.pop_front() {
                Some(Step::Data(d)) => {
                    let n = d.len().min(buf.len());
                    buf[..n].copy_from_slice(&d[..n]);
                    if n < d.len() {
                        self.steps.push_front(Step::Data(&d[n..]));
                    }
                    Ok(n)
                }
                Some(Step::Timeout) => Err(io::ErrorKind::TimedOut.into()),
                Some(Step::Fail(kind)) => Err(kind.into()),
                None => match &self.stop_when_drained {
                    Some(stop) => {
                        stop.store(true, Ordering::Relaxed);
                        Err(io::ErrorKind::TimedOut.into())
                    }
                    None => Ok(0),
                },
            }
        }
    }

    impl Drop for Scripted {
        fn drop(&mut self) {
            self.dropped.store(true, Ordering::SeqCst);
        }
    }

    #[test]
    fn filter_match_records_sample_and_emits() {
        let buffer = Arc::new(TelemetryBuffer::default());
        let mut out = Emitted::new();
        let config = IngestionConfig::new("test", 115_200, "MEM", "DEBUG");
        let mut ingestor = Ingestor::new(config, Arc::clone(&buffer), collector(&mut out));

        let shown = ingestor.process_line(b"[MEM] Free: 500 bytes, Total: 1000 bytes", ten_fifteen());
        let hidden = ingestor.process_line(b"[DEBUG] something", ten_fifteen());
        drop(ingestor);

        assert!(shown);
        assert!(!hidden);
        assert_eq!(
            out,
            vec![(Category::Memory, "[MEM] Free: 500 bytes, Total: 1000 bytes".to_string())]
        );
        let samples = buffer.snapshot();
        assert_eq!(samples.len(), 1);
        assert!((samples[0].free_kb - 500.0 / 1024.0).abs() < 1e-9);
        assert!((samples[0].total_kb - 1000.0 / 1024.0).abs() < 1e-9);
        assert_eq!(samples[0].timestamp, ten_fifteen());
    }

    #[test]
    fn suppressed_memory_line_still_records_sample() {
        let buffer = Arc::new(TelemetryBuffer::default());
        let mut out = Emitted::new();
        let config = IngestionConfig::new("test", 115_200, "gfx", "");
        let mut ingestor = Ingestor::new(config, Arc::clone(&buffer), collector(&mut out));

        let line = b"[00:01:02] [MEM] Free: 196344 bytes, Total: 226412 bytes, Min Free: 112620 bytes";
        assert!(!ingestor.process_line(line, ten_fifteen()));
        drop(ingestor);

        assert!(out.is_empty());
        let samples = buffer.snapshot();
        assert_eq!(samples.len(), 1);
        assert!((samples[0].free_kb - 191.74).abs() < 0.01);
        assert!((samples[0].total_kb - 221.11).abs() < 0.01);
    }

    #[test]
    fn malformed_memory_line_is_displayed_without_sample() {
        let buffer = Arc::new(TelemetryBuffer::default());
        let mut out = Emitted::new();
        let config = IngestionConfig::new("test", 115_200, "", "");
        let mut ingestor = Ingestor::new(config, Arc::clone(&buffer), collector(&mut out));

        assert!(ingestor.process_line(b"[7] [MEM] Free: ??? bytes", ten_fifteen()));
        drop(ingestor);

        assert!(buffer.is_empty());
        assert_eq!(out, vec![(Category::Memory, "[10:15:00] [MEM] Free: ??? bytes".to_string())]);
    }

    #[test]
    fn free_label_without_memory_tag_is_not_sampled() {
        let buffer = Arc::new(TelemetryBuffer::default());
        let mut out = Emitted::new();
        let config = IngestionConfig::new("test", 115_200, "", "");
        let mut ingestor = Ingestor::new(config, Arc::clone(&buffer), collector(&mut out));

        ingestor.process_line(b"[HEAP] Free: 10 bytes, Total: 20 bytes", ten_fifteen());
        drop(ingestor);

        assert!(buffer.is_empty());
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn run_decodes_trims_and_rewrites() {
        let buffer = Arc::new(TelemetryBuffer::default());
        let mut out = Emitted::new();
        let config = IngestionConfig::new("test", 115_200, "", "");
        let mut ingestor = Ingestor::new(config, Arc::clone(&buffer), collector(&mut out));

        let input: &[u8] = b"[12] [ACT] Entering activity: Home\r\n\
            \r\n   \n\
            [13] bad \xff\xfe bytes\n\
            [14] [MEM] Free: 2048 bytes, Total: 4096 bytes\n\
            tail without newline";
        let outcome = ingestor.run(Cursor::new(input));
        drop(ingestor);

        assert!(matches!(outcome, Disconnect::EndOfStream));
        assert_eq!(out.len(), 4);
        assert_eq!(out[0].0, Category::Activity);
        assert!(out[0].1.ends_with("] [ACT] Entering activity: Home"));
        assert!(!out[0].1.starts_with("[12]"));
        assert!(out[1].1.contains("bad \u{fffd}\u{fffd} bytes"));
        assert_eq!(out[2].0, Category::Memory);
        assert_eq!(out[3], (Category::Default, "tail without newline".to_string()));

        let samples = buffer.snapshot();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].free_kb, 2.0);
        assert_eq!(samples[0].total_kb, 4.0);
    }

    #[test]
    fn samples_keep_ingestion_order() {
        let buffer = Arc::new(TelemetryBuffer::default());
        let mut out = Emitted::new();
        let config = IngestionConfig::new("test", 115_200, "", "");
        let mut ingestor = Ingestor::new(config, Arc::clone(&buffer), collector(&mut out));

        let input: &[u8] = b"[1] [MEM] Free: 1024 bytes, Total: 8192 bytes\n\
            [2] [MEM] Free: 3072 bytes, Total: 8192 bytes\n\
            [3] [ACT] idle\n\
            [4] [MEM] Free: 2048 bytes, Total: 8192 bytes\n\
            [5] [MEM] Free: 4096 bytes, Total: 8192 bytes\n";
        let outcome = ingestor.run(Cursor::new(input));
        drop(ingestor);

        assert!(matches!(outcome, Disconnect::EndOfStream));
        let samples = buffer.snapshot();
        let free: Vec<f64> = samples.iter().map(|s| s.free_kb).collect();
        assert_eq!(free, vec![1.0, 3.0, 2.0, 4.0]);
        assert!(samples.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[test]
    fn partial_line_survives_timeout_and_device_loss_ends_stream() {
        let buffer = Arc::new(TelemetryBuffer::default());
        let mut out = Emitted::new();
        let config = IngestionConfig::new("test", 115_200, "", "");
        let mut ingestor = Ingestor::new(config, Arc::clone(&buffer), collector(&mut out));

        let (reader, dropped) = Scripted::new(vec![
            Step::Timeout,
            Step::Data(b"no stamp par"),
            Step::Timeout,
            Step::Data(b"tial\n"),
            Step::Timeout,
            Step::Fail(io::ErrorKind::BrokenPipe),
            Step::Data(b"never read\n"),
        ]);
        let outcome = ingestor.run(reader);
        drop(ingestor);

        assert!(matches!(
            outcome,
            Disconnect::DeviceLost(ref e) if e.kind() == io::ErrorKind::BrokenPipe
        ));
        assert!(dropped.load(Ordering::SeqCst), "handle não foi liberado");
        assert_eq!(out, vec![(Category::Default, "no stamp partial".to_string())]);
    }

    #[test]
    fn stop_flag_cancels_within_one_cycle() {
        let buffer = Arc::new(TelemetryBuffer::default());
        let mut out = Emitted::new();
        let config = IngestionConfig::new("test", 115_200, "", "");
        let mut ingestor = Ingestor::new(config, buffer, collector(&mut out));

        let (mut reader, dropped) = Scripted::new(vec![Step::Data(b"one\n"), Step::Timeout]);
        reader.stop_when_drained = Some(ingestor.stop_flag());
        let outcome = ingestor.run(reader);
        drop(ingestor);

        assert!(matches!(outcome, Disconnect::Cancelled));
        assert!(dropped.load(Ordering::SeqCst));
        assert_eq!(out, vec![(Category::Default, "one".to_string())]);
    }

    #[test]
    fn preset_stop_flag_reads_nothing() {
        let buffer = Arc::new(TelemetryBuffer::default());
        let mut out = Emitted::new();
        let config = IngestionConfig::new("test", 115_200, "", "");
        let mut ingestor = Ingestor::new(config, buffer, collector(&mut out));
        ingestor.stop_flag().store(true, Ordering::Relaxed);

        let outcome = ingestor.run(Cursor::new(b"ignored\n".to_vec()));
        drop(ingestor);

        assert!(matches!(outcome, Disconnect::Cancelled));
        assert!(out.is_empty());
    }

    #[test]
    fn overlong_line_is_split() {
        let buffer = Arc::new(TelemetryBuffer::default());
        let mut out = Emitted::new();
        let config = IngestionConfig::new("test", 115_200, "", "");
        let mut ingestor = Ingestor::new(config, buffer, collector(&mut out));

        let input = vec![b'x'; MAX_LINE_BYTES + 100];
        let outcome = ingestor.run(Cursor::new(input));
        drop(ingestor);

        assert!(matches!(outcome, Disconnect::EndOfStream));
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].1.len(), MAX_LINE_BYTES);
        assert_eq!(out[1].1.len(), 100);
    }

    #[test]
    fn handle_released_when_sink_panics() {
        let buffer = Arc::new(TelemetryBuffer::default());
        let config = IngestionConfig::new("test", 115_200, "", "");
        let mut ingestor = Ingestor::new(config, buffer, |_: Category, line: &str| {
            if !line.is_empty() {
                panic!("sink quebrado: {line}");
            }
        });

        let (reader, dropped) = Scripted::new(vec![Step::Data(b"boom\n")]);
        let result = catch_unwind(AssertUnwindSafe(|| ingestor.run(reader)));

        assert!(result.is_err());
        assert!(dropped.load(Ordering::SeqCst), "handle vazou no panic");
    }

    #[test]
    fn disconnect_display() {
        assert_eq!(Disconnect::Cancelled.to_string(), "parada solicitada");
        let lost = Disconnect::DeviceLost(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged"));
        assert!(lost.to_string().contains("unplugged"));
    }
}
