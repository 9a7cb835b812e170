use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::service::gateway::PaymentMethodHandle;

/// Key the backend uses to deduplicate subscription creation. Stable for one
/// (session, intent, payment method) triple, so a retried request cannot charge twice.
pub fn idempotency_key(session_id: Uuid, client_secret: &str, payment_method: &PaymentMethodHandle) -> String {
    let mut hasher = Sha256::new();
    hasher.update(session_id.as_bytes());
    hasher.update(b"|");
    hasher.update(client_secret.as_bytes());
    hasher.update(b"|");
    hasher.update(payment_method.as_str().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Short human-readable reference for out-of-band payments, derived from the intent.
pub fn payment_reference(client_secret: &str) -> String {
    let digest = format!("{:X}", Sha256::digest(client_secret.as_bytes()));
    format!("VX-{}-{}", &digest[..4], &digest[4..10])
}

pub fn support_reference(session_id: Uuid) -> String {
    let simple = session_id.simple().to_string().to_uppercase();
    format!("CHK-{}", &simple[..12])
}
