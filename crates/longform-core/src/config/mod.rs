//! Ambient configuration: operational defaults and provider credentials.
//!
//! Kept separate from `domain::BatchInput`, which is per-job data rather
//! than ambient config. `PipelineSettings` loads the way the teacher loads
//! its top-level config: built-in defaults, overridable by environment
//! variables under the `LONGFORM_` prefix.

mod credentials;
mod settings;

pub use credentials::ProviderCredentials;
pub use settings::PipelineSettings;
