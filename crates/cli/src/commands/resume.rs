//! Resume downloads from the storage bucket.

use std::path::Path;

use jack_machine_portal::backend::DataService;
use tracing::info;

use super::connect;

/// Save the object at `key` to `output`, or to the key's file name.
///
/// # Errors
///
/// Returns an error if the object cannot be fetched or the file written.
pub async fn fetch(key: &str, output: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let (config, client) = connect()?;

    let target = output.map_or_else(|| default_output(key), str::to_string);
    if target.is_empty() {
        return Err(format!("Cannot derive a file name from key: {key}").into());
    }

    let bytes = client.download(&config.resume_bucket, key).await?;
    tokio::fs::write(Path::new(&target), &bytes).await?;

    info!(key, path = %target, bytes = bytes.len(), "Resume saved");
    Ok(())
}

fn default_output(key: &str) -> String {
    key.rsplit('/').next().unwrap_or_default().to_string()
}
