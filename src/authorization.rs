use crate::{
    auth::AuthIdentity,
    error::{AppError, AppResult},
    models::{ContentItem, UserProfile},
};

/// Roles that may remove any record, compared after lower-casing.
pub const PRIVILEGED_ROLES: [&str; 2] = ["admin", "moderator"];

fn is_owner(item: &ContentItem, identity: &AuthIdentity, profile: &UserProfile) -> bool {
    let author = item.author();
    if author.is_empty() {
        return false;
    }
    author == identity.user_id || (!profile.name.is_empty() && author == profile.name)
}

/// may_mutate
///
/// Decides whether the verified caller may delete `item`.
///
/// Allowed when the caller authored the item (by user id or display name) or holds a
/// privileged role. A profile that belongs to someone other than the verified caller
/// grants nothing.
pub fn may_mutate(item: &ContentItem, identity: &AuthIdentity, profile: &UserProfile) -> bool {
    if !profile.id.is_empty() && profile.id != identity.user_id {
        return false;
    }

    is_owner(item, identity, profile)
        || PRIVILEGED_ROLES.iter().any(|role| profile.has_role(role))
}

/// `may_mutate` as a `Result`, denial mapped to `Unauthorized` (403).
pub fn authorize(
    item: &ContentItem,
    identity: &AuthIdentity,
    profile: &UserProfile,
) -> AppResult<()> {
    if may_mutate(item, identity, profile) {
        Ok(())
    } else {
        tracing::warn!(
            user_id = %identity.user_id,
            kind = item.kind().label(),
            id = item.id(),
            "mutation denied"
        );
        Err(AppError::Unauthorized(format!(
            "not allowed to modify {} {}",
            item.kind().label(),
            item.id()
        )))
    }
}
