//! Admin session context injected into the chat controller.

use std::sync::Arc;

use crate::{error::Error, models::UserId};

/// Callback invoked when the backend rejects the session's credentials.
pub type UnauthorizedHook = Arc<dyn Fn(&Error) + Send + Sync>;

/// Identity of the acting admin plus the unauthorized callback.
#[derive(Clone)]
pub struct Session {
    admin_id: UserId,
    on_unauthorized: Option<UnauthorizedHook>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("admin_id", &self.admin_id)
            .field("on_unauthorized", &self.on_unauthorized.as_ref().map(|_| "..."))
            .finish()
    }
}

impl Session {
    /// Create a session for the given admin.
    pub fn new(admin_id: impl Into<UserId>) -> Self {
        Self {
            admin_id: admin_id.into(),
            on_unauthorized: None,
        }
    }

    /// Set the callback run on 401/403. It should clear stored credentials;
    /// the caller is expected to route back to login afterwards.
    pub fn on_unauthorized<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Error) + Send + Sync + 'static,
    {
        self.on_unauthorized = Some(Arc::new(hook));
        self
    }

    /// Admin account id.
    pub fn admin_id(&self) -> &UserId {
        &self.admin_id
    }

    pub(crate) fn notify_unauthorized(&self, error: &Error) {
        if let Some(hook) = &self.on_unauthorized {
            hook(error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_hook_receives_error() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let session = Session::new(1).on_unauthorized(move |e| {
            assert!(e.is_auth_error());
            seen.fetch_add(1, Ordering::SeqCst);
        });

        session.notify_unauthorized(&Error::api(401, "expired"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // No hook, no panic.
        Session::new(2).notify_unauthorized(&Error::AuthRequired);
    }
}
