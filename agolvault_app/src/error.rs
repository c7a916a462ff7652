#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("portal error: {0}")]
    Portal(#[from] agolvault_portal::PortalError),

    #[error("geodatabase error: {0}")]
    Gdb(#[from] agolvault_gdb::GdbError),

    #[error("filesystem error: {0}")]
    Io(#[from] std::io::Error),

    #[error("listing decode error: {0}")]
    ListingDecode(#[from] serde_json::Error),

    #[error("item title '{0}' sanitizes to an empty identifier")]
    UnusableTitle(String),
}
