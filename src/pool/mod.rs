pub mod credentials;
pub mod coordinator;

pub use credentials::{Credential, CredentialPool};
pub use coordinator::{FailoverCoordinator, FailoverError, LastError};
