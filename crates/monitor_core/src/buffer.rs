//! Buffer circular de amostras compartilhado entre ingestão e gráfico.
//!
//! Um único escritor (thread de ingestão) e leitores que tiram cópias
//! independentes. O lock cobre apenas o `push` ou a cópia.

use crate::types::Sample;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Capacidade padrão (últimos 50 pontos).
pub const MAX_POINTS: usize = 50;

/// Janela FIFO de tamanho fixo com as amostras mais recentes.
#[derive(Debug)]
pub struct TelemetryBuffer {
    samples: Mutex<VecDeque<Sample>>,
    capacity: usize,
}

impl Default for TelemetryBuffer {
    fn default() -> Self {
        Self::new(MAX_POINTS)
    }
}

impl TelemetryBuffer {
    /// Cria um buffer vazio. Capacidade 0 é tratada como 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Adiciona ao fim, descartando a amostra mais antiga se cheio.
    pub fn append(&self, sample: Sample) {
        let mut samples = self.lock();
        if samples.len() >= self.capacity {
            samples.pop_front();
        }
        samples.push_back(sample);
    }

    /// Cópia independente do conteúdo atual, da mais antiga à mais recente.
    pub fn snapshot(&self) -> Vec<Sample> {
        self.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // push/pop nunca deixam o deque pela metade: lock envenenado é reaproveitado.
    fn lock(&self) -> MutexGuard<'_, VecDeque<Sample>> {
        self.samples.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
