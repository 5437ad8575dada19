//! Encrypted record storage.
//!
//! - record types and the per-operation collection (`record`, `records`)
//! - the `vault.bin` blob codec (`codec`) and legacy-key migration (`migrate`)
//! - `VaultStore`, which unlocks, loads, saves and audits (`store`)

pub mod codec;
pub mod migrate;
pub mod record;
pub mod records;
pub mod store;

pub use migrate::MigrationReport;
pub use record::{
    credential_id, CardSecret, CredentialRecord, CredentialSecret, PaymentCardRecord, RecordKind,
    RecordSummary, VaultRecord,
};
pub use records::RecordSet;
pub use store::{LockoutStatus, StoreOptions, VaultPaths, VaultStore};
