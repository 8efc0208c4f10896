//! Sign-in resolution: maps a provider identity onto the local user table.

use chrono::Utc;
use uuid::Uuid;

use crate::auth::provider::ProviderProfile;
use crate::models::user::{NewUser, ProfileUpdate, User};
use crate::store::{Store, StoreError};

/// Group assigned at creation. Sign-ins never change it afterwards.
pub const DEFAULT_GROUP: &str = "user";

/// Find-or-create-or-update for a freshly authenticated provider identity.
///
/// Returns the row as read back from the store, so the caller always sees
/// the durable state, id included.
pub fn resolve_sign_in(store: &Store, profile: &ProviderProfile) -> Result<User, StoreError> {
    resolve_sign_in_at(store, profile, Utc::now().timestamp_millis())
}

pub fn resolve_sign_in_at(
    store: &Store,
    profile: &ProviderProfile,
    now_ms: i64,
) -> Result<User, StoreError> {
    if let Some(existing) = store.find_user_by_provider(&profile.provider, &profile.subject_id)? {
        return refresh_profile(store, &existing.id, profile, now_ms);
    }

    let user = NewUser {
        id: Uuid::new_v4().to_string(),
        provider: profile.provider.clone(),
        provider_id: profile.subject_id.clone(),
        name: profile.name.clone(),
        avatar: profile.avatar_url.clone(),
        group: DEFAULT_GROUP.to_string(),
        member_since: now_ms,
        last_login: now_ms,
    };

    match store.insert_user(&user) {
        Ok(()) => {
            tracing::info!(user_id = %user.id, provider = %user.provider, "registered user");
            store.find_user(&user.id)?.ok_or(StoreError::InsertReadback)
        }
        // Lost a first-sign-in race; the winner's row is the durable one.
        Err(StoreError::DuplicateIdentity) => {
            let existing = store
                .find_user_by_provider(&profile.provider, &profile.subject_id)?
                .ok_or(StoreError::InsertReadback)?;
            refresh_profile(store, &existing.id, profile, now_ms)
        }
        Err(e) => Err(e),
    }
}

fn refresh_profile(
    store: &Store,
    id: &str,
    profile: &ProviderProfile,
    now_ms: i64,
) -> Result<User, StoreError> {
    store.update_user_profile(
        id,
        &ProfileUpdate {
            name: profile.name.clone(),
            avatar: profile.avatar_url.clone(),
            last_login: now_ms,
        },
    )?;
    store.find_user(id)?.ok_or(StoreError::InsertReadback)
}
