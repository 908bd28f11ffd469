use crate::database::RoleStore;
use crate::error::{Error, Result};
use crate::models::identity::Identity;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use utoipa::ToSchema;

/// Resolves whether an identity holds the HR role by looking up its marker.
///
/// Lookups fail closed: a store error or a timeout resolves to "not HR".
#[derive(Clone)]
pub struct RoleResolver {
    store: Arc<dyn RoleStore>,
    timeout: Duration,
}

impl RoleResolver {
    pub fn new(store: Arc<dyn RoleStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    pub async fn is_hr(&self, identity: &Identity) -> bool {
        match tokio::time::timeout(self.timeout, self.store.hr_marker(&identity.uid)).await {
            Ok(Ok(marker)) => marker.is_some(),
            Ok(Err(e)) => {
                tracing::warn!(uid = %identity.uid, error = %e, "HR role lookup failed; denying");
                false
            }
            Err(_) => {
                tracing::warn!(
                    uid = %identity.uid,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "HR role lookup timed out; denying"
                );
                false
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RoleState {
    Unknown,
    Hr,
    NotHr,
}

/// Per-session HR role, resolved at most once.
///
/// Starts out `Unknown`; privileged checks await the lookup instead of acting on
/// the unresolved value.
#[derive(Debug, Default)]
pub struct SessionRole {
    resolved: OnceCell<bool>,
}

impl SessionRole {
    pub fn state(&self) -> RoleState {
        match self.resolved.get() {
            None => RoleState::Unknown,
            Some(true) => RoleState::Hr,
            Some(false) => RoleState::NotHr,
        }
    }

    pub async fn is_hr(&self, resolver: &RoleResolver, identity: &Identity) -> bool {
        *self
            .resolved
            .get_or_init(|| resolver.is_hr(identity))
            .await
    }
}

/// Explicit caller context handed to every workflow operation.
#[derive(Debug, Clone, Default)]
pub struct Caller {
    identity: Option<Identity>,
    role: Arc<SessionRole>,
}

impl Caller {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(identity: Identity) -> Self {
        Self {
            identity: Some(identity),
            role: Arc::new(SessionRole::default()),
        }
    }

    pub fn require_identity(&self) -> Result<&Identity> {
        self.identity.as_ref().ok_or_else(|| {
            Error::Unauthenticated("You must be logged in to perform this action.".to_string())
        })
    }

    pub fn role_state(&self) -> RoleState {
        self.role.state()
    }

    /// `false` for anonymous callers without touching the role store.
    pub async fn is_hr(&self, resolver: &RoleResolver) -> bool {
        match &self.identity {
            Some(identity) => self.role.is_hr(resolver, identity).await,
            None => false,
        }
    }

    pub async fn require_hr(&self, resolver: &RoleResolver) -> Result<&Identity> {
        let identity = self.require_identity()?;
        if !self.role.is_hr(resolver, identity).await {
            return Err(Error::Forbidden(
                "You do not have permission to perform this action.".to_string(),
            ));
        }
        Ok(identity)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Portal {
    #[default]
    Applicant,
    Hr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Landing {
    HrConsole,
    Dashboard,
}

impl Landing {
    pub const fn path(self) -> &'static str {
        match self {
            Landing::HrConsole => "/admin",
            Landing::Dashboard => "/dashboard",
        }
    }
}

impl RoleResolver {
    /// Where a freshly signed-in caller should land.
    ///
    /// HR identities always land on the HR console. Asking for the HR portal
    /// without holding the role is refused rather than downgraded.
    pub async fn landing(&self, caller: &Caller, requested: Portal) -> Result<Landing> {
        caller.require_identity()?;
        if caller.is_hr(self).await {
            return Ok(Landing::HrConsole);
        }
        match requested {
            Portal::Hr => Err(Error::Forbidden(
                "You do not have HR permissions.".to_string(),
            )),
            Portal::Applicant => Ok(Landing::Dashboard),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::MemoryRoleStore;
    use crate::database::MockRoleStore;
    use crate::models::role_marker::HrRoleMarker;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn resolver_with(store: impl RoleStore + 'static) -> RoleResolver {
        RoleResolver::new(Arc::new(store), Duration::from_millis(50))
    }

    #[tokio::test]
    async fn marker_presence_grants_hr() {
        let roles = MemoryRoleStore::seeded(["hr-uid"]).await;
        let resolver = resolver_with(roles);
        assert!(resolver.is_hr(&Identity::new("hr-uid")).await);
        assert!(!resolver.is_hr(&Identity::new("applicant")).await);
    }

    #[tokio::test]
    async fn lookup_failure_fails_closed() {
        let mut store = MockRoleStore::new();
        store
            .expect_hr_marker()
            .returning(|_| Err(Error::StoreUnavailable("connection refused".into())));
        let resolver = resolver_with(store);
        assert!(!resolver.is_hr(&Identity::new("hr-uid")).await);
    }

    struct SlowRoleStore;

    #[async_trait::async_trait]
    impl RoleStore for SlowRoleStore {
        async fn hr_marker(&self, uid: &str) -> Result<Option<HrRoleMarker>> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Some(HrRoleMarker {
                uid: uid.to_string(),
                created_at: None,
            }))
        }
    }

    #[tokio::test]
    async fn lookup_timeout_fails_closed() {
        let resolver = resolver_with(SlowRoleStore);
        assert!(!resolver.is_hr(&Identity::new("hr-uid")).await);
    }

    #[tokio::test]
    async fn session_role_is_unknown_until_resolved_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut store = MockRoleStore::new();
        store.expect_hr_marker().returning(move |uid| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Some(HrRoleMarker {
                uid: uid.to_string(),
                created_at: None,
            }))
        });
        let resolver = resolver_with(store);
        let caller = Caller::authenticated(Identity::new("hr-uid"));

        assert_eq!(caller.role_state(), RoleState::Unknown);
        assert!(caller.require_hr(&resolver).await.is_ok());
        assert_eq!(caller.role_state(), RoleState::Hr);
        assert!(caller.is_hr(&resolver).await);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn require_hr_distinguishes_anonymous_from_forbidden() {
        let resolver = resolver_with(MemoryRoleStore::new());
        let err = Caller::anonymous().require_hr(&resolver).await.unwrap_err();
        assert!(matches!(err, Error::Unauthenticated(_)));

        let caller = Caller::authenticated(Identity::new("applicant"));
        let err = caller.require_hr(&resolver).await.unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
        assert_eq!(caller.role_state(), RoleState::NotHr);
    }

    #[tokio::test]
    async fn landing_routes_by_role() {
        let resolver = resolver_with(MemoryRoleStore::seeded(["hr-uid"]).await);

        let hr = Caller::authenticated(Identity::new("hr-uid"));
        assert_eq!(
            resolver.landing(&hr, Portal::Applicant).await.unwrap(),
            Landing::HrConsole
        );

        let applicant = Caller::authenticated(Identity::new("applicant"));
        assert_eq!(
            resolver.landing(&applicant, Portal::Applicant).await.unwrap(),
            Landing::Dashboard
        );
        let err = resolver.landing(&applicant, Portal::Hr).await.unwrap_err();
        assert!(matches!(err, Error::Forbidden(msg) if msg.contains("HR permissions")));
    }
}
