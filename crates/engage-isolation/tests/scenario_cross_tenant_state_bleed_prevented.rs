//! Cross-tenant isolation integration test.
//!
//! GREEN when:
//! - TenantStore<T> with two tenants returns None for an unrelated tenant/channel.
//! - ChannelIsolation::from_config_json rejects config where the credential
//!   env var does not contain the tenant token.
//! - TenantStore mutations on one tenant do not affect another.

use engage_isolation::{ChannelIsolation, TenantSlug, TenantStore};
use engage_schemas::Channel;
use serde_json::json;

#[test]
fn tenant_store_isolates_state_per_tenant_channel() {
    let acme = TenantSlug::new("ACME");
    let globex = TenantSlug::new("GLOBEX");

    let mut store: TenantStore<i64> = TenantStore::new();
    store.insert(acme.clone(), Channel::Email, 100);
    store.insert(globex.clone(), Channel::Email, 200);

    assert_eq!(store.get(&acme, Channel::Email), Some(&100));
    assert_eq!(store.get(&globex, Channel::Email), Some(&200));

    // Same tenant, different channel is a distinct slot (no bleed).
    assert_eq!(store.get(&acme, Channel::Call), None);

    let unknown = TenantSlug::new("UNKNOWN");
    assert_eq!(store.get(&unknown, Channel::Email), None);
}

#[test]
fn tenant_store_mutation_does_not_bleed() {
    let acme = TenantSlug::new("ACME");
    let globex = TenantSlug::new("GLOBEX");

    let mut store: TenantStore<Vec<String>> = TenantStore::new();
    store.insert(acme.clone(), Channel::Email, vec!["acme_item_1".to_string()]);
    store.insert(globex.clone(), Channel::Email, vec!["globex_item_1".to_string()]);

    if let Some(acme_state) = store.get_mut(&acme, Channel::Email) {
        acme_state.push("acme_item_2".to_string());
    }

    assert_eq!(store.get(&acme, Channel::Email).unwrap().len(), 2);
    assert_eq!(store.get(&globex, Channel::Email).unwrap().len(), 1);
    assert_eq!(store.get(&globex, Channel::Email).unwrap()[0], "globex_item_1");
}

#[test]
fn isolation_rejects_shared_key_names() {
    let slug = TenantSlug::new("ACME");
    let config_shared_keys = json!({
        "companies": {
            "ACME": {
                "transports": {
                    "email": { "api_key_env": "ENGAGE_SMTP_API_KEY_GENERIC" }
                }
            }
        }
    });

    let result = ChannelIsolation::from_config_json(&config_shared_keys, &slug, Channel::Email);
    assert!(
        result.is_err(),
        "should reject config where credential env var does not contain tenant token"
    );
    let err_msg = result.unwrap_err().to_string();
    assert!(
        err_msg.contains("must include tenant token"),
        "error should mention tenant token requirement, got: {err_msg}"
    );
}

#[test]
fn isolation_accepts_properly_scoped_keys() {
    let slug = TenantSlug::new("ACME");
    let config = json!({
        "companies": {
            "ACME": {
                "transports": {
                    "email": { "api_key_env": "ENGAGE_SMTP_API_KEY_ACME" }
                }
            }
        }
    });

    let isolation = ChannelIsolation::from_config_json(&config, &slug, Channel::Email).unwrap();
    assert_eq!(isolation.api_key_env, "ENGAGE_SMTP_API_KEY_ACME");
    assert_eq!(isolation.channel, Channel::Email);
}

#[test]
fn globex_rejects_acme_keys() {
    let slug = TenantSlug::new("GLOBEX");
    let config = json!({
        "companies": {
            "GLOBEX": {
                "transports": {
                    "email": { "api_key_env": "ENGAGE_SMTP_API_KEY_ACME" }
                }
            }
        }
    });

    let result = ChannelIsolation::from_config_json(&config, &slug, Channel::Email);
    assert!(result.is_err(), "GLOBEX should reject ACME-scoped credential");
}

#[test]
fn missing_channel_config_rejected() {
    let slug = TenantSlug::new("ACME");
    let config = json!({ "companies": { "ACME": { "transports": {} } } });

    let result = ChannelIsolation::from_config_json(&config, &slug, Channel::Email);
    assert!(result.is_err(), "config missing transport entry should be rejected");
}
