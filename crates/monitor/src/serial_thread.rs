//! Thread de ingestão que lê a serial e alimenta o buffer de telemetria.

use monitor_core::buffer::TelemetryBuffer;
use monitor_core::config::IngestionConfig;
use monitor_core::ingest::{Disconnect, Ingestor, LineSink};
use monitor_core::serial::IngestError;
use std::io::Read;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use tracing::error;

/// Handle da thread de ingestão em execução.
pub struct IngestHandle {
    stop: Arc<AtomicBool>,
    thread: JoinHandle<Disconnect>,
}

impl IngestHandle {
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Pede a parada; a thread sai em até um timeout de leitura.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    /// Aguarda o fim da thread. `None` se ela terminou em panic.
    pub fn join(self) -> Option<Disconnect> {
        match self.thread.join() {
            Ok(outcome) => Some(outcome),
            Err(_) => {
                error!("Thread de ingestão terminou com panic");
                None
            }
        }
    }
}

/// Inicia a thread de ingestão com uma porta já aberta.
pub fn spawn_ingest_thread<R, S>(
    link: R,
    config: IngestionConfig,
    buffer: Arc<TelemetryBuffer>,
    sink: S,
) -> Result<IngestHandle, IngestError>
where
    R: Read + Send + 'static,
    S: LineSink + Send + 'static,
{
    let mut ingestor = Ingestor::new(config, buffer, sink);
    let stop = ingestor.stop_flag();

    let thread = std::thread::Builder::new()
        .name("serial-ingest".into())
        .spawn(move || ingestor.run(link))?;

    Ok(IngestHandle { stop, thread })
}
