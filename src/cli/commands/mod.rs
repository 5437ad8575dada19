//! One module per `shopvault` subcommand.

pub mod audit_cmd;
pub mod card;
pub mod completions;
pub mod cred;
pub mod generate;
pub mod init;
pub mod lock;
pub mod migrate;
pub mod passwd;
pub mod status;
pub mod version;
