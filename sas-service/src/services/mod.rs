pub mod auth;
pub mod resolver;
pub mod sas;
pub mod storage;

pub use auth::TokenVerifier;
pub use resolver::{DispositionMode, Resolver, ResourceKind, ResourceLocator};
pub use sas::SasSigner;
pub use storage::{AzureBlobStore, BlobStore};
