//! Secret resolution for outbound transports and the AI content generator.
//!
//! # Contract
//! - Config YAML stores only **env var NAMES** (e.g. `"ENGAGE_SMTP_API_KEY"`).
//! - Callers invoke [`resolve_transport_secrets`] once per process and pass the
//!   result into transport/content-generator constructors; never scatter
//!   `std::env::var` calls elsewhere.
//! - `Debug` on [`TransportSecrets`] redacts every value.
//! - Error messages reference the env var **name**, never the value.
//!
//! None of these secrets are required at load time: a tenant whose channel is
//! disabled has no business demanding credentials for it. Each dispatcher
//! checks its own field is `Some` immediately before opening a transport
//! session and fails the item (`error=auth`, per the error taxonomy) if not.

use serde_json::Value;

#[derive(Clone)]
pub struct TransportSecrets {
    pub smtp_api_key: Option<String>,
    pub telephony_api_key: Option<String>,
    pub linkedin_api_key: Option<String>,
    pub content_gen_api_key: Option<String>,
}

impl std::fmt::Debug for TransportSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportSecrets")
            .field("smtp_api_key", &self.smtp_api_key.as_ref().map(|_| "<REDACTED>"))
            .field(
                "telephony_api_key",
                &self.telephony_api_key.as_ref().map(|_| "<REDACTED>"),
            )
            .field(
                "linkedin_api_key",
                &self.linkedin_api_key.as_ref().map(|_| "<REDACTED>"),
            )
            .field(
                "content_gen_api_key",
                &self.content_gen_api_key.as_ref().map(|_| "<REDACTED>"),
            )
            .finish()
    }
}

fn read_str_at(config: &Value, pointer: &str) -> Option<String> {
    let s = config.pointer(pointer)?.as_str()?;
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn resolve_env(var_name: &str) -> Option<String> {
    match std::env::var(var_name) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

/// Resolve transport/AI secrets from the environment using env-var names
/// stored at well-known config pointers (falling back to default names).
pub fn resolve_transport_secrets(config_json: &Value) -> TransportSecrets {
    let smtp_var = read_str_at(config_json, "/transports/smtp/api_key_env")
        .unwrap_or_else(|| "ENGAGE_SMTP_API_KEY".to_string());
    let telephony_var = read_str_at(config_json, "/transports/telephony/api_key_env")
        .unwrap_or_else(|| "ENGAGE_TELEPHONY_API_KEY".to_string());
    let linkedin_var = read_str_at(config_json, "/transports/linkedin/api_key_env")
        .unwrap_or_else(|| "ENGAGE_LINKEDIN_API_KEY".to_string());
    let content_gen_var = read_str_at(config_json, "/content_generator/api_key_env")
        .unwrap_or_else(|| "ENGAGE_CONTENT_GEN_API_KEY".to_string());

    TransportSecrets {
        smtp_api_key: resolve_env(&smtp_var),
        telephony_api_key: resolve_env(&telephony_var),
        linkedin_api_key: resolve_env(&linkedin_var),
        content_gen_api_key: resolve_env(&content_gen_var),
    }
}
