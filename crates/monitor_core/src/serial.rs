//! Conexão com a porta serial do dispositivo.

use crate::config::IngestionConfig;
use serialport::SerialPort;
use std::io::{self, Read};
use tracing::{debug, info, warn};

/// Erros fatais da sessão de ingestão.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Erro ao abrir porta {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: serialport::Error,
    },

    #[error("Falha ao criar thread de ingestão: {0}")]
    Spawn(#[from] io::Error),
}

/// Handle exclusivo da porta serial aberta.
///
/// Fechado uma única vez, no `Drop`.
pub struct SerialLink {
    port: Box<dyn SerialPort>,
    name: String,
}

impl SerialLink {
    /// Abre a porta com o baud e timeout configurados.
    ///
    /// DTR e RTS são desligados logo após abrir para não resetar o
    /// dispositivo. Sem retry: quem chama decide se tenta de novo.
    pub fn open(config: &IngestionConfig) -> Result<Self, IngestError> {
        info!("Conectando a {} @ {} baud", config.port(), config.baud());

        let mut port = serialport::new(config.port(), config.baud())
            .timeout(config.read_timeout())
            .open()
            .map_err(|source| IngestError::Open {
                port: config.port().to_string(),
                source,
            })?;

        if let Err(e) = port.write_data_terminal_ready(false) {
            warn!("Não foi possível desligar DTR em {}: {e}", config.port());
        }
        if let Err(e) = port.write_request_to_send(false) {
            warn!("Não foi possível desligar RTS em {}: {e}", config.port());
        }

        Ok(Self {
            port,
            name: config.port().to_string(),
        })
    }
}

impl Read for SerialLink {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.port.read(buf)
    }
}

impl Drop for SerialLink {
    fn drop(&mut self) {
        debug!("Porta {} liberada", self.name);
    }
}

/// Nomes das portas seriais disponíveis no sistema.
pub fn list_ports() -> Result<Vec<String>, serialport::Error> {
    Ok(serialport::available_ports()?
        .into_iter()
        .map(|p| p.port_name)
        .collect())
}
