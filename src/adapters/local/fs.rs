use crate::config::RecorderConfig;
use crate::error::PortError;
use crate::ports::delivery::{DeliveryPort, DeliveryRequest, ProgressFn};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tracing::info;

/// Delivers artifacts into a local directory, with a JSON metadata sidecar
/// next to each one.
#[derive(Debug, Clone)]
pub struct FsDelivery {
    destination: PathBuf,
    chunk_bytes: usize,
}

impl FsDelivery {
    pub fn new(config: &RecorderConfig) -> Self {
        Self::with_chunk_size(config.delivery_dir.clone(), config.delivery_chunk_bytes)
    }

    pub fn with_chunk_size(destination: PathBuf, chunk_bytes: usize) -> Self {
        Self {
            destination,
            chunk_bytes: chunk_bytes.max(1),
        }
    }
}

#[async_trait]
impl DeliveryPort for FsDelivery {
    async fn deliver(
        &self,
        request: &DeliveryRequest,
        progress: ProgressFn<'_>,
    ) -> Result<String, PortError> {
        let file_name = request
            .path
            .file_name()
            .ok_or_else(|| format!("{} has no file name", request.path.display()))?;
        tokio::fs::create_dir_all(&self.destination).await?;
        let target = self.destination.join(file_name);

        let mut source = File::open(&request.path).await?;
        let mut writer = BufWriter::new(File::create(&target).await?);
        let mut buffer = vec![0u8; self.chunk_bytes];
        let mut sent = 0u64;
        loop {
            let read = fill_chunk(&mut source, &mut buffer).await?;
            if read == 0 {
                break;
            }
            writer.write_all(&buffer[..read]).await?;
            sent += read as u64;
            progress(sent);
        }
        writer.flush().await?;

        let sidecar = target.with_extension("json");
        tokio::fs::write(&sidecar, serde_json::to_vec_pretty(&request.metadata)?).await?;

        info!(target = %target.display(), bytes = sent, "artifact delivered");
        Ok(target.display().to_string())
    }
}

/// Read until `buffer` is full or the file ends.
async fn fill_chunk(source: &mut File, buffer: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buffer.len() {
        match source.read(&mut buffer[filled..]).await? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}
