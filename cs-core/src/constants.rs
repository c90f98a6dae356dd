//! Application-wide constants.

/// Application name.
pub const APP_NAME: &str = "chatstack";

/// Application version.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Directory name used under the platform data/config directories.
pub const APP_DIR_NAME: &str = "chatstack";

/// Object-store administrator login the image ships with.
pub const DEFAULT_OBJECT_STORE_USER: &str = "minioadmin";

/// Object-store administrator password the image ships with.
pub const DEFAULT_OBJECT_STORE_PASSWORD: &str = "minioadmin";

/// Length of the generated database password written by `init`.
pub const GENERATED_PASSWORD_LEN: usize = 24;

/// Port the database image listens on inside the stack network.
pub const DATABASE_PORT: u16 = 5432;

/// Keys in the environment file shared by all containers.
pub mod env_keys {
    pub const POSTGRES_USER: &str = "POSTGRES_USER";
    pub const POSTGRES_PASSWORD: &str = "POSTGRES_PASSWORD";
    pub const POSTGRES_DB: &str = "POSTGRES_DB";
    pub const DATABASE_URL: &str = "DATABASE_URL";

    pub const MINIO_ROOT_USER: &str = "MINIO_ROOT_USER";
    pub const MINIO_ROOT_PASSWORD: &str = "MINIO_ROOT_PASSWORD";
    pub const STORAGE_ENDPOINT: &str = "STORAGE_ENDPOINT";
    pub const STORAGE_BUCKET: &str = "STORAGE_BUCKET";
    pub const STORAGE_PUBLIC_URL: &str = "STORAGE_PUBLIC_URL";

    pub const IDP_ENDPOINT: &str = "IDP_ENDPOINT";
    pub const IDP_CLIENT_ID: &str = "IDP_CLIENT_ID";
    pub const IDP_CLIENT_SECRET: &str = "IDP_CLIENT_SECRET";
    pub const IDP_ORGANIZATION: &str = "IDP_ORGANIZATION";
    pub const IDP_APPLICATION: &str = "IDP_APPLICATION";

    /// Keys that must be non-empty before sign-in can work.
    pub const IDENTITY_CREDENTIALS: &[&str] = &[IDP_CLIENT_ID, IDP_CLIENT_SECRET];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_credentials() {
        assert_eq!(env_keys::IDENTITY_CREDENTIALS.len(), 2);
        assert!(env_keys::IDENTITY_CREDENTIALS.contains(&"IDP_CLIENT_SECRET"));
    }
}
