//! Provider credentials, loaded strictly from the §6 environment-variable
//! ABI. Variable names must not be renamed; external callers depend on them.

use crate::safety::mask_optional_secret;

/// Credentials for every external provider the pipeline may call.
///
/// `Debug` is hand-implemented to redact secret material so this struct
/// can be logged at `debug` level during startup.
#[derive(Clone, Default)]
pub struct ProviderCredentials {
    /// `TEXT_LLM_API_KEY`
    pub text_llm_api_key: Option<String>,
    /// `IMAGE_LLM_API_KEY`
    pub image_llm_api_key: Option<String>,
    /// `SERP_IMAGES_PRIMARY_KEY`
    pub serp_images_primary_key: Option<String>,
    /// `SERP_SECONDARY_LOGIN`
    pub serp_secondary_login: Option<String>,
    /// `SERP_SECONDARY_PASSWORD`
    pub serp_secondary_password: Option<String>,
}

impl std::fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderCredentials")
            .field("text_llm_api_key", &mask_optional_secret(&self.text_llm_api_key))
            .field(
                "image_llm_api_key",
                &mask_optional_secret(&self.image_llm_api_key),
            )
            .field(
                "serp_images_primary_key",
                &mask_optional_secret(&self.serp_images_primary_key),
            )
            .field(
                "serp_secondary_login",
                &mask_optional_secret(&self.serp_secondary_login),
            )
            .field(
                "serp_secondary_password",
                &mask_optional_secret(&self.serp_secondary_password),
            )
            .finish()
    }
}

impl ProviderCredentials {
    /// Load every credential from its documented environment variable.
    /// Missing variables leave the corresponding field `None`; each
    /// adapter's `is_configured()` decides whether that's fatal.
    pub fn from_env() -> Self {
        Self {
            text_llm_api_key: read_var("TEXT_LLM_API_KEY"),
            image_llm_api_key: read_var("IMAGE_LLM_API_KEY"),
            serp_images_primary_key: read_var("SERP_IMAGES_PRIMARY_KEY"),
            serp_secondary_login: read_var("SERP_SECONDARY_LOGIN"),
            serp_secondary_password: read_var("SERP_SECONDARY_PASSWORD"),
        }
    }

    /// The `base64(login:password)` Basic-auth credential for the
    /// SERP-secondary task-poll provider.
    pub fn serp_secondary_basic_auth(&self) -> Option<String> {
        let login = self.serp_secondary_login.as_deref()?;
        let password = self.serp_secondary_password.as_deref()?;
        Some(base64_basic_auth(login, password))
    }
}

fn read_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn base64_basic_auth(login: &str, password: &str) -> String {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.encode(format!("{login}:{password}"))
}
