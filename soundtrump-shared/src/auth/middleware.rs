/// Request authentication context
///
/// The API's auth layer validates the Bearer token and inserts an
/// `AuthContext` into request extensions; handlers extract it with Axum's
/// `Extension` extractor.
///
/// # Example
///
/// ```
/// use soundtrump_shared::auth::middleware::AuthContext;
/// use soundtrump_shared::models::profile::UserRole;
/// use uuid::Uuid;
///
/// let auth = AuthContext::new(Uuid::new_v4(), UserRole::User);
/// assert!(!auth.is_admin());
/// ```

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::profile::UserRole;

/// Authentication context added to request extensions
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AuthContext {
    /// Authenticated user ID
    pub user_id: Uuid,

    /// Role carried by the token
    pub role: UserRole,
}

impl AuthContext {
    /// Creates auth context from validated claims
    pub fn new(user_id: Uuid, role: UserRole) -> Self {
        Self { user_id, role }
    }

    /// True if the caller may perform admin operations
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}
