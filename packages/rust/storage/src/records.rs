//! Conversions between domain types and stored entities.
//!
//! Keeps the entity field layout in one place so the compiler and the crawl
//! engine write records the same way.

use civicore_shared::{Candidate, CivicoreError, Election, NewsArticle, Result, article_key};

use crate::entity::{Entity, FieldValue, KIND_CANDIDATE, KIND_ELECTION, KIND_NEWS_ARTICLE};

/// Build the stored form of an election. Key = election name.
pub fn election_to_entity(election: &Election) -> Entity {
    Entity::new(KIND_ELECTION, &election.name)
        .with_field("query_id", FieldValue::Str(election.query_id.clone()))
        .with_field("date", FieldValue::Timestamp(election.date))
        .with_field("state", FieldValue::Str(election.state.clone()))
        .with_field("offices", FieldValue::StrList(election.offices.clone()))
        .with_field(
            "candidate_ids",
            FieldValue::StrList(election.candidate_ids.clone()),
        )
        .with_field(
            "incumbents",
            FieldValue::BoolList(election.incumbents.clone()),
        )
}

/// Reconstruct an election from its stored form.
pub fn election_from_entity(entity: &Entity) -> Result<Election> {
    let field_str = |name: &str| -> Result<String> {
        entity
            .field(name)
            .and_then(|f| f.as_str())
            .map(str::to_string)
            .ok_or_else(|| missing(entity, name))
    };

    let date = entity
        .field("date")
        .and_then(|f| f.as_timestamp())
        .ok_or_else(|| missing(entity, "date"))?;
    let offices = entity
        .field("offices")
        .and_then(|f| f.as_str_list())
        .ok_or_else(|| missing(entity, "offices"))?
        .to_vec();
    let candidate_ids = entity
        .field("candidate_ids")
        .and_then(|f| f.as_str_list())
        .ok_or_else(|| missing(entity, "candidate_ids"))?
        .to_vec();
    let incumbents = entity
        .field("incumbents")
        .and_then(|f| f.as_bool_list())
        .ok_or_else(|| missing(entity, "incumbents"))?
        .to_vec();

    let election = Election {
        name: entity.key.clone(),
        query_id: field_str("query_id")?,
        date,
        state: field_str("state")?,
        offices,
        candidate_ids,
        incumbents,
    };

    if !election.sequences_aligned() {
        return Err(CivicoreError::validation(format!(
            "election '{}' has misaligned contest sequences",
            election.name
        )));
    }
    Ok(election)
}

/// Build the stored form of a candidate. Key = deterministic candidate id.
pub fn candidate_to_entity(candidate: &Candidate) -> Entity {
    Entity::new(KIND_CANDIDATE, &candidate.id)
        .with_field("name", FieldValue::Str(candidate.name.clone()))
        .with_field(
            "party_affiliation",
            FieldValue::Str(candidate.party_affiliation.clone()),
        )
        .with_field("incumbent", FieldValue::Bool(candidate.incumbent))
}

/// Build the stored form of a processed news article.
///
/// Key = hash of the canonical URL; `content` and `abbreviated_content` go in
/// as long text, bypassing secondary indexes.
pub fn article_to_entity(candidate_id: &str, article: &NewsArticle) -> Entity {
    Entity::new(KIND_NEWS_ARTICLE, article_key(&article.url))
        .with_field(
            "candidate_id",
            FieldValue::KeyRef {
                kind: KIND_CANDIDATE.into(),
                key: candidate_id.into(),
            },
        )
        .with_field("title", FieldValue::Str(article.title.clone()))
        .with_field("url", FieldValue::Str(article.url.clone()))
        .with_field("content", FieldValue::LongText(article.content.clone()))
        .with_field(
            "abbreviated_content",
            FieldValue::LongText(article.abbreviated_content.clone().unwrap_or_default()),
        )
}

fn missing(entity: &Entity, name: &str) -> CivicoreError {
    CivicoreError::validation(format!(
        "{} '{}' is missing field '{name}'",
        entity.kind, entity.key
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use civicore_shared::candidate_id;

    fn sample_election() -> Election {
        let date = Utc.with_ymd_and_hms(2013, 6, 6, 4, 0, 0).unwrap();
        let mut election = Election::new("State Primary", "4000", date, "NY");
        election.push_contest_entry("Governor", candidate_id("Andrew Cuomo", "Democratic"), false);
        election
    }

    #[test]
    fn election_roundtrip() {
        let election = sample_election();
        let entity = election_to_entity(&election);
        assert_eq!(entity.kind, KIND_ELECTION);
        assert_eq!(entity.key, "State Primary");

        let restored = election_from_entity(&entity).expect("roundtrip");
        assert_eq!(restored, election);
    }

    #[test]
    fn misaligned_sequences_are_rejected() {
        let mut entity = election_to_entity(&sample_election());
        entity.fields.insert(
            "candidate_ids".to_string(),
            FieldValue::StrList(vec!["a".into(), "b".into()]),
        );
        let err = election_from_entity(&entity).unwrap_err();
        assert!(err.to_string().contains("misaligned"));
    }

    #[test]
    fn article_body_is_long_text() {
        let mut article = NewsArticle::new("headline", "https://example.com/story", "full body");
        article.abbreviated_content = Some("full body".into());

        let entity = article_to_entity("cand-1", &article);
        assert_eq!(entity.key, article_key("https://example.com/story"));
        assert!(!entity.field("content").unwrap().indexable());
        assert!(!entity.field("abbreviated_content").unwrap().indexable());
        assert_eq!(
            entity.field("candidate_id").unwrap().as_key_ref(),
            Some((KIND_CANDIDATE, "cand-1"))
        );
    }
}
