use shared::{
    domain::{Profile, ProfileId},
    protocol::CreateProfileInput,
};
use tracing::{error, info};

use crate::{error::StoreResult, ProfileStore};

pub const DEFAULT_ORGANIZATION: &str = "AWS";

/// Identity handed over by the sign-in flow.
#[derive(Debug, Clone, Default)]
pub struct SignedInUser {
    pub username: String,
    pub login_id: Option<String>,
    pub name: Option<String>,
    pub organization: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileView {
    pub username: String,
    pub display_name: String,
    pub email: Option<String>,
    pub organization: String,
    pub total_points: i64,
}

/// Returns the profile keyed by the user's username, creating it with zero
/// points on first sign-in.
pub async fn ensure_profile(
    store: &dyn ProfileStore,
    user: &SignedInUser,
    default_organization: &str,
) -> StoreResult<Profile> {
    let id = ProfileId::new(user.username.clone());
    let existing = store.get_profile(&id).await.map_err(|err| {
        error!(username = %user.username, "profile: error fetching profile: {err}");
        err
    })?;
    if let Some(profile) = existing {
        return Ok(profile);
    }

    let input = CreateProfileInput {
        id,
        user_id: user.username.clone(),
        name: user.name.clone().or_else(|| user.login_id.clone()),
        organization: user
            .organization
            .clone()
            .unwrap_or_else(|| default_organization.to_string()),
        point: 0,
    };
    let created = store.create_profile(input).await.map_err(|err| {
        error!(username = %user.username, "profile: error creating profile: {err}");
        err
    })?;
    info!(username = %user.username, "profile: new profile created");
    Ok(created)
}

/// Profile page data. Organization falls back from the stored profile to the
/// sign-in attribute to `default_organization`.
pub async fn load_profile_view(
    store: &dyn ProfileStore,
    username: &str,
    email: Option<&str>,
    organization_attribute: Option<&str>,
    default_organization: &str,
) -> StoreResult<ProfileView> {
    let profile = store.get_profile(&ProfileId::new(username)).await?;
    let stored_org = profile
        .as_ref()
        .and_then(|profile| profile.organization.as_deref())
        .filter(|org| !org.is_empty());
    let organization = stored_org
        .or(organization_attribute.filter(|org| !org.is_empty()))
        .unwrap_or(default_organization)
        .to_string();

    Ok(ProfileView {
        username: username.to_string(),
        display_name: display_name(email.unwrap_or(username)).to_string(),
        email: email.map(str::to_string),
        organization,
        total_points: profile.and_then(|profile| profile.point).unwrap_or(0),
    })
}

/// Profiles ordered by points, highest first.
pub async fn leaderboard(store: &dyn ProfileStore) -> StoreResult<Vec<Profile>> {
    let mut profiles = store.list_profiles().await?;
    profiles.sort_by(|a, b| {
        b.point
            .unwrap_or(0)
            .cmp(&a.point.unwrap_or(0))
            .then_with(|| a.id.cmp(&b.id))
    });
    Ok(profiles)
}

/// Local part of an e-mail style login id.
pub fn display_name(login_id: &str) -> &str {
    login_id.split('@').next().unwrap_or(login_id)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use shared::error::GraphqlError;

    use super::*;
    use crate::StoreError;

    #[derive(Default)]
    struct MemoryProfiles {
        profiles: Mutex<Vec<Profile>>,
        creates: Mutex<u32>,
        fail_get: bool,
    }

    impl MemoryProfiles {
        fn with(profiles: Vec<Profile>) -> Self {
            Self {
                profiles: Mutex::new(profiles),
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl ProfileStore for MemoryProfiles {
        async fn get_profile(&self, id: &ProfileId) -> StoreResult<Option<Profile>> {
            if self.fail_get {
                return Err(StoreError::from_graphql(vec![GraphqlError::new("down")]));
            }
            let profiles = self.profiles.lock().expect("lock");
            Ok(profiles.iter().find(|p| &p.id == id).cloned())
        }

        async fn list_profiles(&self) -> StoreResult<Vec<Profile>> {
            Ok(self.profiles.lock().expect("lock").clone())
        }

        async fn create_profile(&self, input: CreateProfileInput) -> StoreResult<Profile> {
            *self.creates.lock().expect("lock") += 1;
            let profile = Profile {
                id: input.id,
                user_id: Some(input.user_id),
                name: input.name,
                organization: Some(input.organization),
                point: Some(input.point),
            };
            self.profiles.lock().expect("lock").push(profile.clone());
            Ok(profile)
        }
    }

    fn profile(id: &str, organization: Option<&str>, point: Option<i64>) -> Profile {
        Profile {
            id: ProfileId::new(id),
            user_id: Some(id.to_string()),
            name: None,
            organization: organization.map(str::to_string),
            point,
        }
    }

    fn alice() -> SignedInUser {
        SignedInUser {
            username: "alice".into(),
            login_id: Some("alice@example.com".into()),
            ..SignedInUser::default()
        }
    }

    #[tokio::test]
    async fn creates_profile_with_zero_points_on_first_sign_in() {
        let store = MemoryProfiles::default();
        let created = ensure_profile(&store, &alice(), DEFAULT_ORGANIZATION)
            .await
            .expect("ensure");

        assert_eq!(created.id, ProfileId::new("alice"));
        assert_eq!(created.point, Some(0));
        assert_eq!(created.organization.as_deref(), Some("AWS"));
        assert_eq!(created.name.as_deref(), Some("alice@example.com"));
        assert_eq!(*store.creates.lock().expect("lock"), 1);
    }

    #[tokio::test]
    async fn keeps_existing_profile_untouched() {
        let store = MemoryProfiles::with(vec![profile("alice", Some("Acme"), Some(40))]);
        let existing = ensure_profile(&store, &alice(), DEFAULT_ORGANIZATION)
            .await
            .expect("ensure");

        assert_eq!(existing.point, Some(40));
        assert_eq!(*store.creates.lock().expect("lock"), 0);
    }

    #[tokio::test]
    async fn lookup_failure_does_not_create_a_profile() {
        let store = MemoryProfiles {
            fail_get: true,
            ..MemoryProfiles::default()
        };
        ensure_profile(&store, &alice(), DEFAULT_ORGANIZATION)
            .await
            .expect_err("must fail");
        assert_eq!(*store.creates.lock().expect("lock"), 0);
    }

    #[tokio::test]
    async fn profile_view_prefers_stored_organization_then_attribute() {
        let store = MemoryProfiles::with(vec![
            profile("alice", Some("Acme"), Some(12)),
            profile("bob", Some(""), None),
        ]);

        let view = load_profile_view(
            &store,
            "alice",
            Some("alice@example.com"),
            Some("Other"),
            DEFAULT_ORGANIZATION,
        )
        .await
        .expect("view");
        assert_eq!(view.organization, "Acme");
        assert_eq!(view.total_points, 12);
        assert_eq!(view.display_name, "alice");

        let view = load_profile_view(&store, "bob", None, Some("Attr Org"), DEFAULT_ORGANIZATION)
            .await
            .expect("view");
        assert_eq!(view.organization, "Attr Org");
        assert_eq!(view.total_points, 0);

        let view = load_profile_view(&store, "carol", None, None, DEFAULT_ORGANIZATION)
            .await
            .expect("view");
        assert_eq!(view.organization, "AWS");
    }

    #[tokio::test]
    async fn leaderboard_orders_by_points_descending() {
        let store = MemoryProfiles::with(vec![
            profile("a", None, Some(5)),
            profile("b", None, None),
            profile("c", None, Some(30)),
        ]);
        let ids: Vec<String> = leaderboard(&store)
            .await
            .expect("leaderboard")
            .into_iter()
            .map(|p| p.id.0)
            .collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn display_name_strips_mail_domain() {
        assert_eq!(display_name("alice@example.com"), "alice");
        assert_eq!(display_name("plain"), "plain");
    }
}
