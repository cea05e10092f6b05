use crate::{
    auth::BearerToken,
    identity::{IdentityError, IdentityState},
    models::{ContentItem, EnrichedItem, UserProfile},
};

/// Enricher
///
/// Pairs content records with their authors' profiles. A listing costs at most one
/// identity round trip, however many records it holds.
#[derive(Clone)]
pub struct Enricher {
    identity: IdentityState,
}

impl Enricher {
    pub fn new(identity: IdentityState) -> Self {
        Self { identity }
    }

    /// enrich
    ///
    /// Collects the authors in item order (duplicates kept), resolves them with a single
    /// batch call and pairs every item with the profile whose `id` equals its author.
    /// Authors the identity service did not return get the empty profile.
    ///
    /// Output order and length equal the input. Fails only if the batch call fails.
    pub async fn enrich(
        &self,
        token: &BearerToken,
        items: Vec<ContentItem>,
    ) -> Result<Vec<EnrichedItem>, IdentityError> {
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let authors: Vec<String> = items.iter().map(|item| item.author().to_string()).collect();
        let profiles = self.identity.get_profiles(token, &authors).await?;

        Ok(items
            .into_iter()
            .map(|content| {
                let user = profiles
                    .iter()
                    .find(|profile| profile.id == content.author())
                    .cloned()
                    .unwrap_or_default();
                EnrichedItem { content, user }
            })
            .collect())
    }

    /// Single-record variant backed by `get_profile`. An unknown author yields the
    /// empty profile instead of an error.
    pub async fn enrich_one(
        &self,
        token: &BearerToken,
        content: ContentItem,
    ) -> Result<EnrichedItem, IdentityError> {
        let user = match self.identity.get_profile(token, content.author()).await {
            Ok(profile) => profile,
            Err(IdentityError::UnknownUser(author)) => {
                tracing::debug!(%author, "author has no profile");
                UserProfile::default()
            }
            Err(err) => return Err(err),
        };

        Ok(EnrichedItem { content, user })
    }
}
