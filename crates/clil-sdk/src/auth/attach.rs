//! Bearer credential attachment

use super::types::CredentialPair;
use crate::request::{OutboundCall, AUTHORIZATION};

/// Return a copy of `call` carrying the access token of `credentials`
///
/// Calls addressed to the credential exchange endpoints and calls made while
/// signed out are returned unchanged.
pub fn attach_credentials(call: &OutboundCall, credentials: Option<&CredentialPair>) -> OutboundCall {
    match credentials {
        Some(pair) if call.is_credentialed() => with_bearer(call, &pair.access_token),
        _ => call.clone(),
    }
}

/// Return a copy of `call` with the given bearer token
pub fn with_bearer(call: &OutboundCall, access_token: &str) -> OutboundCall {
    call.clone()
        .with_header(AUTHORIZATION, format!("Bearer {access_token}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Method;

    #[test]
    fn test_attaches_to_api_calls() {
        let call = OutboundCall::api(Method::GET, "/materials");
        let pair = CredentialPair::new("a1", None);

        let attached = attach_credentials(&call, Some(&pair));
        assert_eq!(attached.header(AUTHORIZATION), Some("Bearer a1"));
        assert_eq!(call.header(AUTHORIZATION), None);
    }

    #[test]
    fn test_signed_out_leaves_call_unchanged() {
        let call = OutboundCall::api(Method::GET, "/materials");
        let attached = attach_credentials(&call, None);
        assert!(attached.headers.is_empty());
    }

    #[test]
    fn test_auth_exchanges_never_carry_a_bearer() {
        let call = OutboundCall::auth(Method::POST, "/auth/refresh");
        let pair = CredentialPair::new("a1", Some("r1".into()));
        assert_eq!(attach_credentials(&call, Some(&pair)).header(AUTHORIZATION), None);
    }

    #[test]
    fn test_replacing_bearer() {
        let call = with_bearer(&OutboundCall::api(Method::GET, "/models"), "old");
        let replayed = with_bearer(&call, "new");
        assert_eq!(replayed.header(AUTHORIZATION), Some("Bearer new"));
    }
}
