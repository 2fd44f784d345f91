//! Business services containing domain logic and use cases.

pub mod config_source;
pub mod policy;
pub mod token;

// Re-export commonly used types
pub use config_source::{ConfigChange, ConfigSource};
pub use policy::PolicyManager;
pub use token::{
    Clock, JwkSet, KeyGenerator, KeyStore, KeyStoreStatus, ManualClock, RotationOutcome,
    RsaKeyGenerator, Signer, SigningAlgorithm, SystemClock, TokenManager, TokenService,
    TokenSettings,
};
