//! Provider token signing for Ringline Server
//!
//! APNs accepts a JWT signed with the team's ES256 key in place of a client
//! certificate. The token carries the key id in its header and the team id
//! plus issue time as claims.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use ring::{
    rand::SystemRandom,
    signature::{EcdsaKeyPair, ECDSA_P256_SHA256_FIXED_SIGNING},
};
use serde_json::json;
use std::io::BufReader;

/// Extract the PKCS#8 DER body of a PEM private key.
pub fn pkcs8_from_pem(pem: &str) -> anyhow::Result<Vec<u8>> {
    let mut reader = BufReader::new(pem.as_bytes());
    let key = rustls_pemfile::pkcs8_private_keys(&mut reader)
        .next()
        .ok_or_else(|| anyhow::anyhow!("no PKCS#8 private key found in PEM"))??;
    Ok(key.secret_pkcs8_der().to_vec())
}

/// Build a signed provider authentication token.
pub fn sign_provider_token(
    key_id: &str,
    team_id: &str,
    private_key_pem: &str,
    issued_at: i64,
) -> anyhow::Result<String> {
    let der = pkcs8_from_pem(private_key_pem)?;
    let rng = SystemRandom::new();
    let key_pair = EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, &der, &rng)
        .map_err(|e| anyhow::anyhow!("invalid ES256 signing key: {}", e))?;

    let header = json!({ "alg": "ES256", "kid": key_id });
    let claims = json!({ "iss": team_id, "iat": issued_at });

    let signing_input = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(header.to_string()),
        URL_SAFE_NO_PAD.encode(claims.to_string())
    );

    let signature = key_pair
        .sign(&rng, signing_input.as_bytes())
        .map_err(|_| anyhow::anyhow!("failed to sign provider token"))?;

    Ok(format!("{}.{}", signing_input, URL_SAFE_NO_PAD.encode(signature.as_ref())))
}
