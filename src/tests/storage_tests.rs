#[cfg(test)]
mod tests {
    use crate::config::AppConfig;
    use crate::storage::{generate_key, StorageError, StorageService};
    use bytes::Bytes;

    fn storage() -> StorageService {
        StorageService::in_memory("uploads")
    }

    #[tokio::test]
    async fn test_upload_download_head() {
        let s = storage();
        let stored = s.upload("docs/readme.txt", Bytes::from_static(b"hello"), Some("text/plain")).await.unwrap();
        assert_eq!(stored.key, "docs/readme.txt");
        assert_eq!(stored.size, 5);

        assert_eq!(s.download("docs/readme.txt").await.unwrap(), Bytes::from_static(b"hello"));
        let head = s.head("/docs/readme.txt").await.unwrap();
        assert_eq!(head.size, 5);
        assert!(s.exists("docs/readme.txt").await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_object() {
        let s = storage();
        assert!(matches!(s.download("nope.bin").await, Err(StorageError::NotFound(_))));
        assert!(matches!(s.head("nope.bin").await, Err(StorageError::NotFound(_))));
        assert!(!s.exists("nope.bin").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let s = storage();
        s.upload("a.txt", Bytes::from_static(b"a"), None).await.unwrap();
        s.delete("a.txt").await.unwrap();
        s.delete("a.txt").await.unwrap();
        assert!(!s.exists("a.txt").await.unwrap());
    }

    #[tokio::test]
    async fn test_list_by_prefix_sorted() {
        let s = storage();
        for key in ["img/b.png", "img/a.png", "img/sub/c.png", "doc/x.pdf"] {
            s.upload(key, Bytes::from_static(b"."), None).await.unwrap();
        }

        let keys: Vec<String> = s.list(Some("img/")).await.unwrap().into_iter().map(|o| o.key).collect();
        assert_eq!(keys, vec!["img/a.png", "img/b.png", "img/sub/c.png"]);
        assert_eq!(s.list(None).await.unwrap().len(), 4);
        assert!(s.list(Some("video")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_key_is_rejected() {
        let s = storage();
        assert!(matches!(s.upload("", Bytes::new(), None).await, Err(StorageError::InvalidKey(_))));
        assert!(matches!(s.download("/").await, Err(StorageError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn test_presign_unsupported_in_memory() {
        let s = storage();
        assert!(matches!(s.presigned_download_url("a", None).await, Err(StorageError::PresignUnsupported)));
        assert!(matches!(s.presigned_upload_url("a", None).await, Err(StorageError::PresignUnsupported)));
    }

    #[tokio::test]
    async fn test_s3_presigned_urls() {
        let mut cfg = AppConfig::default().storage;
        cfg.enabled = true;
        cfg.bucket = "media".into();
        cfg.endpoint = Some("http://localhost:9000".into());
        cfg.access_key_id = Some("minio".into());
        cfg.secret_access_key = Some("minio-secret".into());
        let s = StorageService::from_config(&cfg).unwrap();

        let url = s.presigned_download_url("avatars/1.png", Some(std::time::Duration::from_secs(120))).await.unwrap();
        assert!(url.starts_with("http://localhost:9000/media/avatars/1.png?"));
        assert!(url.contains("X-Amz-Expires=120"));
        assert!(url.contains("X-Amz-Signature="));

        let url = s.presigned_upload_url("avatars/1.png", None).await.unwrap();
        assert!(url.contains("X-Amz-Expires=3600"));

        assert_eq!(s.public_url("avatars/1.png").as_deref(), Some("http://localhost:9000/media/avatars/1.png"));
    }

    #[test]
    fn test_public_url() {
        assert_eq!(storage().public_url("a.png"), None);
        let s = storage().with_public_base("https://cdn.example.com/");
        assert_eq!(s.public_url("/a.png").as_deref(), Some("https://cdn.example.com/a.png"));
        assert_eq!(s.bucket(), "uploads");
    }

    #[tokio::test]
    async fn test_ping() {
        storage().ping().await.unwrap();
    }

    #[test]
    fn test_generate_key() {
        let key = generate_key("avatars", "My Photo (1).PNG");
        let (folder, rest) = key.split_once('/').unwrap();
        assert_eq!(folder, "avatars");
        let (id, name) = rest.split_at(36);
        assert!(uuid::Uuid::parse_str(id).is_ok());
        assert_eq!(name, "-My-Photo--1-.PNG");

        assert!(generate_key("/x/", "../../etc/passwd").starts_with("x/"));
        assert!(generate_key("x", "../../etc/passwd").ends_with("-passwd"));
        assert!(generate_key("", "...").ends_with("-file"));
        assert!(!generate_key("", "a.txt").contains('/'));
        assert_ne!(generate_key("x", "a"), generate_key("x", "a"));
    }

    #[tokio::test]
    async fn test_state_accessors() {
        let state = crate::tests::test_state(AppConfig::default()).await;
        assert!(matches!(state.storage(), Err(crate::error::AppError::ServiceUnavailable(_))));
        assert!(matches!(state.cache(), Err(crate::error::AppError::ServiceUnavailable(_))));

        let state = state.with_storage(storage());
        let s = state.storage().unwrap();
        s.upload("k", Bytes::from_static(b"v"), None).await.unwrap();
        assert!(s.exists("k").await.unwrap());
    }
}
