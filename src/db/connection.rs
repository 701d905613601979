use crate::config::StorageConfig;
use crate::storage::{Backend, BucketStore, LocalStore, MemoryStore};
use std::time::Duration;

pub fn init_storage(config: &StorageConfig) -> Result<Backend, reqwest::Error> {
    let backend = match config {
        StorageConfig::Local { dir } => Backend::Local(LocalStore::new(dir)),
        StorageConfig::Supabase {
            url,
            api_key,
            bucket,
        } => {
            let client = reqwest::Client::builder()
                .connect_timeout(Duration::from_secs(10))
                .pool_idle_timeout(Duration::from_secs(90))
                .build()?;
            Backend::Bucket(BucketStore::new(client, url, api_key, bucket))
        }
        StorageConfig::Memory => Backend::Memory(MemoryStore::default()),
    };

    info!("storage backend: {}", backend.kind());
    Ok(backend)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_init_storage() {
        let local = init_storage(&StorageConfig::Local {
            dir: PathBuf::from("polls"),
        })
        .unwrap();
        assert_eq!(local.kind(), "local");

        let bucket = init_storage(&StorageConfig::Supabase {
            url: "https://example.supabase.co".to_owned(),
            api_key: "anon".to_owned(),
            bucket: "electronic-voting-system".to_owned(),
        })
        .unwrap();
        assert_eq!(bucket.kind(), "supabase");

        assert_eq!(init_storage(&StorageConfig::Memory).unwrap().kind(), "memory");
    }
}
